//! Tests for command dispatch with scripted terminal input

use std::fs;

use clap::Parser;
use tempfile::TempDir;

use ttyf::cli::args::Cli;
use ttyf::cli::commands::execute_command;
use ttyf::exitcode;
use ttyf::util::testing::{
    init_test_setup, FakeListener, FakePlaidApi, RecordingBrowser, TestHarness,
};

fn run(harness: &TestHarness, args: &[&str]) -> Result<(), i32> {
    let cli = Cli::try_parse_from(std::iter::once("ttyf").chain(args.iter().copied())).unwrap();
    execute_command(&cli, &harness.container).map_err(|e| e.exit_code())
}

fn credentials_json(temp: &TempDir) -> serde_json::Value {
    serde_json::from_str(&fs::read_to_string(temp.path().join("credentials.json")).unwrap())
        .unwrap()
}

// ============================================================
// user
// ============================================================

#[test]
fn given_invalid_then_valid_input_when_user_setup_then_reprompts_and_saves() {
    init_test_setup();
    let temp = TempDir::new().unwrap();
    let harness = TestHarness::new(
        temp.path(),
        &["nope", "jane@example.com", "416-555-1234", "4165551234"],
    );

    run(&harness, &["user", "--setup"]).unwrap();

    let prompts = harness.prompter.prompts();
    assert_eq!(prompts.len(), 4);
    assert!(prompts[0].contains("email"));
    assert!(prompts[3].contains("10 digits"));
    let json = credentials_json(&temp);
    assert_eq!(json["email"], "jane@example.com");
    assert_eq!(json["phone"], "4165551234");
}

#[test]
fn given_setup_and_show_when_user_then_setup_runs() {
    let temp = TempDir::new().unwrap();
    let harness = TestHarness::new(temp.path(), &["jane@example.com", "4165551234"]);

    run(&harness, &["user", "--setup", "--show"]).unwrap();

    assert_eq!(harness.prompter.prompts().len(), 2);
    let json = credentials_json(&temp);
    assert_eq!(json["email"], "jane@example.com");
    assert_eq!(json["phone"], "4165551234");
}

#[test]
fn given_closed_input_when_user_setup_then_io_error() {
    let temp = TempDir::new().unwrap();
    let harness = TestHarness::new(temp.path(), &[]);

    let code = run(&harness, &["user", "--setup"]).unwrap_err();

    assert_eq!(code, exitcode::IOERR);
    assert!(!temp.path().join("credentials.json").exists());
}

#[test]
fn given_no_credentials_when_user_show_then_succeeds() {
    let temp = TempDir::new().unwrap();
    let harness = TestHarness::new(temp.path(), &[]);

    assert!(run(&harness, &["user"]).is_ok());
    assert!(run(&harness, &["user", "--show"]).is_ok());
}

#[test]
fn given_corrupt_credentials_when_user_show_then_data_error() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("credentials.json"), "{oops").unwrap();
    let harness = TestHarness::new(temp.path(), &[]);

    assert_eq!(run(&harness, &["user"]).unwrap_err(), exitcode::DATAERR);
}

// ============================================================
// add / list / remove
// ============================================================

#[test]
fn given_no_credentials_when_add_then_sets_up_and_connects() {
    let temp = TempDir::new().unwrap();
    let harness = TestHarness::new(temp.path(), &["jane@example.com", "4165551234"]);

    run(&harness, &["add", "my-bank"]).unwrap();

    assert_eq!(credentials_json(&temp)["email"], "jane@example.com");
    let connections = harness.container.connection_service().list().unwrap();
    assert_eq!(connections.len(), 1);
    assert_eq!(connections[0].name, "my-bank");
    assert_eq!(harness.browser.opened().len(), 1);
}

#[test]
fn given_existing_name_when_add_declined_then_keeps_connection() {
    let temp = TempDir::new().unwrap();
    let harness = TestHarness::new(temp.path(), &["jane@example.com", "4165551234", "n"]);
    run(&harness, &["add", "my-bank"]).unwrap();
    let before = harness.container.connection_service().list().unwrap();

    run(&harness, &["add", "my-bank"]).unwrap();

    assert_eq!(harness.container.connection_service().list().unwrap(), before);
    assert_eq!(harness.plaid.calls().len(), 3);
}

#[test]
fn given_existing_name_when_add_confirmed_then_replaces_connection_and_token() {
    init_test_setup();
    let temp = TempDir::new().unwrap();
    let harness = TestHarness::with(
        temp.path(),
        FakePlaidApi::new("item-1", "access-sandbox-1").with_next_item("item-2", "access-sandbox-2"),
        RecordingBrowser::default(),
        FakeListener::authorized(),
        &["jane@example.com", "4165551234", "y"],
    );
    run(&harness, &["add", "my-bank"]).unwrap();

    run(&harness, &["add", "my-bank"]).unwrap();

    let connections = harness.container.connection_service().list().unwrap();
    assert_eq!(connections.len(), 1);
    assert_eq!(connections[0].name, "my-bank");
    assert_eq!(connections[0].id, "item-2");
    let secrets = harness.secrets.snapshot();
    assert!(!secrets.contains_key("access_token:item-1"));
    assert_eq!(secrets["access_token:item-2"], "access-sandbox-2");
    let calls = harness.plaid.calls();
    assert_eq!(calls.len(), 6);
    assert_eq!(calls.iter().filter(|c| *c == "create_link_token").count(), 2);
    assert_eq!(
        calls.iter().filter(|c| c.starts_with("exchange_public_token")).count(),
        2
    );
    assert_eq!(harness.browser.opened().len(), 2);
}

#[test]
fn given_existing_name_without_token_when_add_confirmed_then_noinput_and_kept() {
    let temp = TempDir::new().unwrap();
    let record = r#"[{"id": "item-9", "name": "my-bank", "date_added": "2024-01-02 03:04:05"}]"#;
    fs::write(temp.path().join("connections.json"), record).unwrap();
    fs::write(
        temp.path().join("credentials.json"),
        r#"{"email": "jane@example.com", "phone": "4165551234"}"#,
    )
    .unwrap();
    let harness = TestHarness::new(temp.path(), &["y"]);

    let code = run(&harness, &["add", "my-bank"]).unwrap_err();

    assert_eq!(code, exitcode::NOINPUT);
    let connections = harness.container.connection_service().list().unwrap();
    assert_eq!(connections.len(), 1);
    assert_eq!(connections[0].id, "item-9");
    assert!(harness.plaid.calls().is_empty());
}

#[test]
fn given_no_connections_when_list_then_succeeds() {
    let temp = TempDir::new().unwrap();
    let harness = TestHarness::new(temp.path(), &[]);

    assert!(run(&harness, &["list"]).is_ok());
}

#[test]
fn given_connection_when_remove_with_yes_then_removed_without_prompt() {
    let temp = TempDir::new().unwrap();
    let harness = TestHarness::new(temp.path(), &["jane@example.com", "4165551234"]);
    run(&harness, &["add", "my-bank"]).unwrap();
    let prompts_before = harness.prompter.prompts().len();

    run(&harness, &["remove", "my-bank", "--yes"]).unwrap();

    assert!(harness.container.connection_service().list().unwrap().is_empty());
    assert_eq!(harness.prompter.prompts().len(), prompts_before);
}

#[test]
fn given_connection_when_remove_declined_then_kept() {
    let temp = TempDir::new().unwrap();
    let harness = TestHarness::new(temp.path(), &["jane@example.com", "4165551234", ""]);
    run(&harness, &["add", "my-bank"]).unwrap();

    run(&harness, &["remove", "my-bank"]).unwrap();

    assert_eq!(harness.container.connection_service().list().unwrap().len(), 1);
    assert!(harness.prompter.prompts().last().unwrap().contains("Are you sure"));
}

#[test]
fn given_unknown_connection_when_remove_then_noinput() {
    let temp = TempDir::new().unwrap();
    let harness = TestHarness::new(temp.path(), &[]);

    assert_eq!(run(&harness, &["remove", "ghost", "-y"]).unwrap_err(), exitcode::NOINPUT);
}
