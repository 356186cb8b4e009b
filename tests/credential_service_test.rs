//! Tests for CredentialService and the credentials.json format

use std::fs;
use std::sync::Arc;

use rstest::rstest;
use tempfile::TempDir;

use ttyf::application::services::CredentialService;
use ttyf::application::store::CredentialStore;
use ttyf::application::ApplicationError;
use ttyf::domain::DomainError;
use ttyf::infrastructure::traits::RealFileSystem;

fn service(temp: &TempDir) -> CredentialService {
    CredentialService::new(CredentialStore::new(
        Arc::new(RealFileSystem),
        temp.path().join("credentials.json"),
    ))
}

#[test]
fn given_no_file_when_load_then_none() {
    let temp = TempDir::new().unwrap();
    let service = service(&temp);

    assert_eq!(service.load().unwrap(), None);
    assert!(!service.has_credentials());
}

#[test]
fn given_valid_input_when_save_then_persists_email_and_phone() {
    let temp = TempDir::new().unwrap();
    let service = service(&temp);

    let saved = service.save(" jane@example.com ", "4165551234").unwrap();

    assert_eq!(saved.email, "jane@example.com");
    assert!(service.has_credentials());
    assert_eq!(service.load().unwrap(), Some(saved));
    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(service.path()).unwrap()).unwrap();
    assert_eq!(json["email"], "jane@example.com");
    assert_eq!(json["phone"], "4165551234");
}

#[test]
fn given_existing_credentials_when_save_then_replaces_them() {
    let temp = TempDir::new().unwrap();
    let service = service(&temp);
    service.save("old@example.com", "4165550000").unwrap();

    service.save("new@example.com", "6045551111").unwrap();

    let loaded = service.load().unwrap().unwrap();
    assert_eq!(loaded.email, "new@example.com");
    assert_eq!(loaded.masked_phone(), "••••••1111");
}

#[rstest]
#[case("not-an-email", "4165551234")]
#[case("jane@example", "4165551234")]
fn given_invalid_email_when_save_then_rejected_and_nothing_written(
    #[case] email: &str,
    #[case] phone: &str,
) {
    let temp = TempDir::new().unwrap();
    let service = service(&temp);

    let err = service.save(email, phone).unwrap_err();

    assert!(matches!(
        err,
        ApplicationError::Domain(DomainError::InvalidEmail(_))
    ));
    assert!(!service.path().exists());
}

#[rstest]
#[case("416-555-1234")]
#[case("123456789")]
#[case("14165551234")]
fn given_invalid_phone_when_save_then_rejected(#[case] phone: &str) {
    let temp = TempDir::new().unwrap();

    let err = service(&temp).save("jane@example.com", phone).unwrap_err();

    assert!(matches!(
        err,
        ApplicationError::Domain(DomainError::InvalidPhone(_))
    ));
}

#[test]
fn given_file_missing_phone_when_load_then_none() {
    let temp = TempDir::new().unwrap();
    let service = service(&temp);
    fs::write(service.path(), r#"{"email": "jane@example.com"}"#).unwrap();

    assert_eq!(service.load().unwrap(), None);
    assert!(!service.has_credentials());
}

#[test]
fn given_corrupt_file_when_load_then_corrupt_file_error() {
    let temp = TempDir::new().unwrap();
    let service = service(&temp);
    fs::write(service.path(), "{ not json").unwrap();

    let err = service.load().unwrap_err();

    assert!(matches!(err, ApplicationError::CorruptFile(_)));
    assert!(!service.has_credentials());
}
