//! Service container for dependency injection
//!
//! Wires up all services with their dependencies.

use std::sync::Arc;

use crate::application::services::{ConnectionService, CredentialService};
use crate::application::store::{ConnectionStore, CredentialStore};
use crate::application::ApplicationError;
use crate::config::Settings;
use crate::infrastructure::browser::{BrowserLauncher, SystemBrowser};
use crate::infrastructure::callback::{AuthorizationListener, LocalCallbackListener};
use crate::infrastructure::plaid::{HttpPlaidApi, PlaidApi};
use crate::infrastructure::secrets::{FileSecretStore, SecretStore};
use crate::infrastructure::traits::{
    FileSystem, Prompter, RealCommandRunner, RealFileSystem, TerminalPrompter,
};
use crate::infrastructure::InfraResult;

/// Container holding shared dependencies; services are built on demand.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Filesystem abstraction
    pub fs: Arc<dyn FileSystem>,

    pub secrets: Arc<dyn SecretStore>,
    pub plaid: Arc<dyn PlaidApi>,
    pub browser: Arc<dyn BrowserLauncher>,
    pub listener: Arc<dyn AuthorizationListener>,
    pub prompter: Arc<dyn Prompter>,
}

impl ServiceContainer {
    /// Create a new service container with real implementations.
    pub fn new(settings: Settings) -> InfraResult<Self> {
        let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
        let secrets = Arc::new(FileSecretStore::new(Arc::clone(&fs), settings.secrets_path()));
        let plaid = HttpPlaidApi::new(&settings.plaid)
            .map_err(|e| ApplicationError::plaid("initialize HTTP client", e))?;
        let browser = SystemBrowser::new(Arc::new(RealCommandRunner), settings.browser.clone());
        let listener = LocalCallbackListener::new(settings.callback.host.clone(), settings.callback.port);

        Ok(Self::with_deps(
            settings,
            fs,
            secrets,
            Arc::new(plaid),
            Arc::new(browser),
            Arc::new(listener),
            Arc::new(TerminalPrompter),
        ))
    }

    /// Create a service container with custom dependencies (for testing).
    pub fn with_deps(
        settings: Settings,
        fs: Arc<dyn FileSystem>,
        secrets: Arc<dyn SecretStore>,
        plaid: Arc<dyn PlaidApi>,
        browser: Arc<dyn BrowserLauncher>,
        listener: Arc<dyn AuthorizationListener>,
        prompter: Arc<dyn Prompter>,
    ) -> Self {
        Self {
            settings: Arc::new(settings),
            fs,
            secrets,
            plaid,
            browser,
            listener,
            prompter,
        }
    }

    pub fn connection_service(&self) -> ConnectionService {
        ConnectionService::new(
            ConnectionStore::new(Arc::clone(&self.fs), self.settings.connections_path()),
            Arc::clone(&self.settings),
            Arc::clone(&self.secrets),
            Arc::clone(&self.plaid),
            Arc::clone(&self.browser),
            Arc::clone(&self.listener),
        )
    }

    pub fn credential_service(&self) -> CredentialService {
        CredentialService::new(CredentialStore::new(
            Arc::clone(&self.fs),
            self.settings.credentials_path(),
        ))
    }
}
