//! Connection management service
//!
//! Adds connections through Plaid's hosted Link flow, lists and removes them.
//! Access tokens live in the secret store keyed by Plaid item id; the
//! connection list only carries id, name and date.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Local;
use tracing::{debug, info, instrument, warn};

use crate::application::store::ConnectionStore;
use crate::application::{ApplicationError, ApplicationResult, IoResultExt};
use crate::config::Settings;
use crate::domain::{validate_connection_name, Connection, DomainError, UserCredentials};
use crate::infrastructure::browser::BrowserLauncher;
use crate::infrastructure::callback::AuthorizationListener;
use crate::infrastructure::plaid::{LinkTokenRequest, PlaidApi};
use crate::infrastructure::secrets::{access_token_key, link_token_key, SecretStore};

/// Number of progress steps reported while adding a connection.
pub const LINK_STEPS: u64 = 6;

/// Progress of the hosted Link flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    LinkTokenCreated,
    BrowserOpened { url: String },
    /// The browser could not be launched; the user has to open `url` manually.
    BrowserUnavailable { url: String, reason: String },
    WaitingForAuthorization,
    /// The redirect reached the callback server.
    AuthorizationReceived,
    /// Plaid handed out the public token for the finished session.
    PublicTokenReceived,
    TokenExchanged,
    ConnectionSaved { name: String },
}

impl LinkEvent {
    /// Steps completed once this event is reported.
    pub fn completed_steps(&self) -> u64 {
        match self {
            LinkEvent::LinkTokenCreated => 1,
            LinkEvent::BrowserOpened { .. } | LinkEvent::BrowserUnavailable { .. } => 2,
            LinkEvent::WaitingForAuthorization | LinkEvent::AuthorizationReceived => 3,
            LinkEvent::PublicTokenReceived => 4,
            LinkEvent::TokenExchanged => 5,
            LinkEvent::ConnectionSaved { .. } => 6,
        }
    }
}

/// Receives Link flow progress.
pub trait LinkProgress {
    fn report(&self, event: LinkEvent);
}

/// Ignores all progress.
pub struct NoProgress;

impl LinkProgress for NoProgress {
    fn report(&self, _event: LinkEvent) {}
}

/// A connection together with its access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaidConnection {
    pub name: String,
    pub item_id: String,
    pub access_token: String,
}

/// Service for adding, listing and removing connections.
pub struct ConnectionService {
    store: ConnectionStore,
    settings: Arc<Settings>,
    secrets: Arc<dyn SecretStore>,
    plaid: Arc<dyn PlaidApi>,
    browser: Arc<dyn BrowserLauncher>,
    listener: Arc<dyn AuthorizationListener>,
}

impl ConnectionService {
    pub fn new(
        store: ConnectionStore,
        settings: Arc<Settings>,
        secrets: Arc<dyn SecretStore>,
        plaid: Arc<dyn PlaidApi>,
        browser: Arc<dyn BrowserLauncher>,
        listener: Arc<dyn AuthorizationListener>,
    ) -> Self {
        Self {
            store,
            settings,
            secrets,
            plaid,
            browser,
            listener,
        }
    }

    /// All connections in insertion order.
    pub fn list(&self) -> ApplicationResult<Vec<Connection>> {
        Ok(self.store.load()?.into_vec())
    }

    pub fn find(&self, name: &str) -> ApplicationResult<Option<Connection>> {
        Ok(self.store.load()?.find(name).cloned())
    }

    /// Connect a new institution through hosted Link.
    ///
    /// The callback server is bound before the link token is created so the
    /// redirect cannot arrive before anyone listens. It stops when this returns.
    #[instrument(skip(self, credentials, progress))]
    pub fn add(
        &self,
        name: &str,
        credentials: &UserCredentials,
        progress: &dyn LinkProgress,
    ) -> ApplicationResult<Connection> {
        let name = validate_connection_name(name)?;
        if self.store.load()?.find(&name).is_some() {
            return Err(DomainError::ConnectionExists(name).into());
        }

        let callback = &self.settings.callback;
        let pending = self.listener.listen().with_context(format!(
            "start callback server on {}:{}",
            callback.host, callback.port
        ))?;

        let request = self.link_token_request(credentials);
        let session = self
            .plaid
            .create_link_token(&request)
            .map_err(|e| ApplicationError::plaid("failed to create link token", e))?;
        self.secrets
            .set(&link_token_key(&credentials.email), &session.link_token)
            .with_context("store link token")?;
        progress.report(LinkEvent::LinkTokenCreated);

        match self.browser.open(&session.hosted_link_url) {
            Ok(()) => progress.report(LinkEvent::BrowserOpened {
                url: session.hosted_link_url.clone(),
            }),
            Err(e) => {
                warn!("cannot open browser: {}", e);
                progress.report(LinkEvent::BrowserUnavailable {
                    url: session.hosted_link_url.clone(),
                    reason: e.to_string(),
                });
            }
        }

        progress.report(LinkEvent::WaitingForAuthorization);
        if !pending.wait(callback.timeout()) {
            return Err(ApplicationError::AuthorizationTimedOut {
                seconds: callback.timeout_secs,
            });
        }
        progress.report(LinkEvent::AuthorizationReceived);

        let public_token = self
            .plaid
            .get_public_token(&session.link_token)
            .map_err(|e| ApplicationError::plaid("failed to fetch link session", e))?
            .ok_or(ApplicationError::MissingPublicToken)?;
        progress.report(LinkEvent::PublicTokenReceived);

        let item = self
            .plaid
            .exchange_public_token(&public_token)
            .map_err(|e| ApplicationError::plaid("failed to exchange token", e))?;
        progress.report(LinkEvent::TokenExchanged);

        let connection = self.save(&name, &item.item_id, &item.access_token)?;
        info!("added connection {} (item {})", connection.name, connection.id);
        progress.report(LinkEvent::ConnectionSaved {
            name: connection.name.clone(),
        });
        Ok(connection)
    }

    fn link_token_request(&self, credentials: &UserCredentials) -> LinkTokenRequest {
        let plaid = &self.settings.plaid;
        LinkTokenRequest {
            client_user_id: credentials.email.clone(),
            email: credentials.email.clone(),
            phone: credentials.phone.clone(),
            client_name: plaid.client_name.clone(),
            products: plaid.products.clone(),
            country_codes: plaid.country_codes.clone(),
            language: plaid.language.clone(),
            webhook: self.settings.callback.webhook_url(),
            completion_redirect_uri: self.settings.callback.redirect_uri(),
        }
    }

    /// Store the access token and append the connection record.
    fn save(&self, name: &str, item_id: &str, access_token: &str) -> ApplicationResult<Connection> {
        let connection = Connection::new(item_id, name, Local::now().naive_local())?;

        // reload: the flow may have run for minutes
        let mut registry = self.store.load()?;
        registry.insert(connection.clone())?;

        self.secrets
            .set(&access_token_key(item_id), access_token)
            .with_context("store access token")?;
        if let Err(e) = self.store.save(&registry) {
            if let Err(rollback) = self.secrets.delete(&access_token_key(item_id)) {
                warn!("could not roll back access token for {}: {}", item_id, rollback);
            }
            return Err(e);
        }
        Ok(connection)
    }

    /// Remove a connection and its access token.
    ///
    /// A missing access token is an error and leaves the record in place.
    #[instrument(skip(self))]
    pub fn remove(&self, name: &str) -> ApplicationResult<Connection> {
        let mut registry = self.store.load()?;
        let connection = registry
            .find(name)
            .cloned()
            .ok_or_else(|| DomainError::ConnectionNotFound(name.trim().to_string()))?;

        let deleted = self
            .secrets
            .delete(&access_token_key(&connection.id))
            .with_context("delete access token")?;
        if !deleted {
            return Err(ApplicationError::AccessTokenMissing {
                item_id: connection.id,
            });
        }

        registry.remove(&connection.name)?;
        self.store.save(&registry)?;
        debug!("removed connection {} (item {})", connection.name, connection.id);
        Ok(connection)
    }

    /// Every connection with its access token, keyed by name.
    ///
    /// Fails if any access token is missing.
    pub fn access_tokens(&self) -> ApplicationResult<BTreeMap<String, PlaidConnection>> {
        let mut result = BTreeMap::new();
        for connection in self.store.load()?.into_vec() {
            let access_token = self
                .secrets
                .get(&access_token_key(&connection.id))
                .with_context("read access token")?
                .ok_or_else(|| ApplicationError::AccessTokenMissing {
                    item_id: connection.id.clone(),
                })?;
            result.insert(
                connection.name.clone(),
                PlaidConnection {
                    name: connection.name,
                    item_id: connection.id,
                    access_token,
                },
            );
        }
        Ok(result)
    }
}
