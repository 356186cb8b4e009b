//! Plaid REST client (blocking).
//!
//! Only the three endpoints the hosted Link flow needs are covered:
//! `/link/token/create`, `/link/token/get` and `/item/public_token/exchange`.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::config::PlaidConfig;
use crate::domain::{ExchangedItem, LinkSession};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Error, Debug)]
pub enum PlaidApiError {
    #[error("Plaid client id and secret must be set (PLAID_CLIENT_ID and SANDBOX_PLAID_SECRET_KEY / PROD_PLAID_SECRET_KEY)")]
    MissingCredentials,

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Plaid returned {status}: {code}: {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    #[error("unexpected response: {0}")]
    InvalidResponse(String),
}

/// Parameters for creating a hosted Link token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkTokenRequest {
    pub client_user_id: String,
    pub email: String,
    pub phone: String,
    pub client_name: String,
    pub products: Vec<String>,
    pub country_codes: Vec<String>,
    pub language: String,
    pub webhook: String,
    pub completion_redirect_uri: String,
}

/// Client side of the Plaid API.
pub trait PlaidApi: Send + Sync {
    fn create_link_token(&self, request: &LinkTokenRequest) -> Result<LinkSession, PlaidApiError>;

    /// Public token of the most recent item added through `link_token`, if any.
    fn get_public_token(&self, link_token: &str) -> Result<Option<String>, PlaidApiError>;

    fn exchange_public_token(&self, public_token: &str) -> Result<ExchangedItem, PlaidApiError>;
}

// ------------------------------------------------------------
// Wire types
// ------------------------------------------------------------

#[derive(Serialize)]
struct Authed<'a, T: Serialize> {
    client_id: &'a str,
    secret: &'a str,
    #[serde(flatten)]
    body: T,
}

#[derive(Serialize)]
struct LinkTokenCreateBody<'a> {
    client_name: &'a str,
    language: &'a str,
    country_codes: &'a [String],
    products: &'a [String],
    user: LinkUser<'a>,
    webhook: &'a str,
    hosted_link: HostedLink<'a>,
}

#[derive(Serialize)]
struct LinkUser<'a> {
    client_user_id: &'a str,
    email_address: &'a str,
    phone_number: String,
}

#[derive(Serialize)]
struct HostedLink<'a> {
    completion_redirect_uri: &'a str,
}

#[derive(Deserialize)]
struct LinkTokenCreateResponse {
    link_token: String,
    hosted_link_url: Option<String>,
}

#[derive(Serialize)]
struct LinkTokenGetBody<'a> {
    link_token: &'a str,
}

#[derive(Debug, Deserialize, Default)]
pub(crate) struct LinkTokenGetResponse {
    #[serde(default)]
    link_sessions: Vec<LinkSessionRecord>,
}

#[derive(Debug, Deserialize, Default)]
struct LinkSessionRecord {
    #[serde(default)]
    results: Option<LinkSessionResults>,
}

#[derive(Debug, Deserialize, Default)]
struct LinkSessionResults {
    #[serde(default)]
    item_add_results: Vec<ItemAddResult>,
}

#[derive(Debug, Deserialize, Default)]
struct ItemAddResult {
    public_token: Option<String>,
}

impl LinkTokenGetResponse {
    /// Public token of the last item added in the last session.
    pub(crate) fn latest_public_token(&self) -> Option<String> {
        self.link_sessions
            .last()?
            .results
            .as_ref()?
            .item_add_results
            .last()?
            .public_token
            .clone()
            .filter(|t| !t.is_empty())
    }
}

#[derive(Serialize)]
struct ExchangeBody<'a> {
    public_token: &'a str,
}

#[derive(Deserialize)]
struct ExchangeResponse {
    access_token: String,
    item_id: String,
}

#[derive(Deserialize, Default)]
struct PlaidErrorBody {
    error_code: Option<String>,
    error_message: Option<String>,
}

/// Canadian 10-digit numbers in E.164 form.
fn e164(phone: &str) -> String {
    format!("+1{phone}")
}

// ------------------------------------------------------------
// HTTP implementation
// ------------------------------------------------------------

/// Plaid client using blocking reqwest.
pub struct HttpPlaidApi {
    client: reqwest::blocking::Client,
    base_url: String,
    client_id: Option<String>,
    secret: Option<String>,
}

impl HttpPlaidApi {
    pub fn new(config: &PlaidConfig) -> Result<Self, PlaidApiError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url(),
            client_id: config.client_id.clone().filter(|s| !s.is_empty()),
            secret: config.secret.clone().filter(|s| !s.is_empty()),
        })
    }

    fn post<B: Serialize, R: DeserializeOwned>(&self, path: &str, body: B) -> Result<R, PlaidApiError> {
        let (client_id, secret) = match (&self.client_id, &self.secret) {
            (Some(id), Some(secret)) => (id.as_str(), secret.as_str()),
            _ => return Err(PlaidApiError::MissingCredentials),
        };
        let url = format!("{}{}", self.base_url.trim_end_matches('/'), path);
        debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .json(&Authed {
                client_id,
                secret,
                body,
            })
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body: PlaidErrorBody = response.json().unwrap_or_default();
            return Err(PlaidApiError::Api {
                status: status.as_u16(),
                code: body.error_code.unwrap_or_else(|| "UNKNOWN".to_string()),
                message: body
                    .error_message
                    .unwrap_or_else(|| status.canonical_reason().unwrap_or("").to_string()),
            });
        }

        response
            .json()
            .map_err(|e| PlaidApiError::InvalidResponse(format!("{path}: {e}")))
    }
}

impl PlaidApi for HttpPlaidApi {
    #[instrument(skip(self, request), fields(user = %request.client_user_id))]
    fn create_link_token(&self, request: &LinkTokenRequest) -> Result<LinkSession, PlaidApiError> {
        let body = LinkTokenCreateBody {
            client_name: &request.client_name,
            language: &request.language,
            country_codes: &request.country_codes,
            products: &request.products,
            user: LinkUser {
                client_user_id: &request.client_user_id,
                email_address: &request.email,
                phone_number: e164(&request.phone),
            },
            webhook: &request.webhook,
            hosted_link: HostedLink {
                completion_redirect_uri: &request.completion_redirect_uri,
            },
        };
        let response: LinkTokenCreateResponse = self.post("/link/token/create", body)?;
        let hosted_link_url = response.hosted_link_url.ok_or_else(|| {
            PlaidApiError::InvalidResponse("link token created without hosted_link_url".into())
        })?;
        Ok(LinkSession {
            link_token: response.link_token,
            hosted_link_url,
        })
    }

    #[instrument(skip_all)]
    fn get_public_token(&self, link_token: &str) -> Result<Option<String>, PlaidApiError> {
        let response: LinkTokenGetResponse =
            self.post("/link/token/get", LinkTokenGetBody { link_token })?;
        Ok(response.latest_public_token())
    }

    #[instrument(skip_all)]
    fn exchange_public_token(&self, public_token: &str) -> Result<ExchangedItem, PlaidApiError> {
        let response: ExchangeResponse =
            self.post("/item/public_token/exchange", ExchangeBody { public_token })?;
        Ok(ExchangedItem {
            access_token: response.access_token,
            item_id: response.item_id,
        })
    }
}
