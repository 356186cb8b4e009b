//! User credential service

use std::path::Path;

use tracing::debug;

use crate::application::store::CredentialStore;
use crate::application::ApplicationResult;
use crate::domain::UserCredentials;

/// Service for the email/phone identity sent to Plaid.
pub struct CredentialService {
    store: CredentialStore,
}

impl CredentialService {
    pub fn new(store: CredentialStore) -> Self {
        Self { store }
    }

    pub fn path(&self) -> &Path {
        self.store.path()
    }

    /// Stored credentials, `None` if never set up.
    pub fn load(&self) -> ApplicationResult<Option<UserCredentials>> {
        self.store.load()
    }

    /// True only if both email and phone are stored and readable.
    pub fn has_credentials(&self) -> bool {
        matches!(self.store.load(), Ok(Some(_)))
    }

    /// Validate and persist credentials, replacing any previous ones.
    pub fn save(&self, email: &str, phone: &str) -> ApplicationResult<UserCredentials> {
        let credentials = UserCredentials::new(email, phone)?;
        self.store.save(&credentials)?;
        debug!("credentials saved for {}", credentials.email);
        Ok(credentials)
    }
}
