//! Domain entities: core data structures

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use chrono::NaiveDateTime;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// Format used for `date_added` in the connections file.
pub const DATE_ADDED_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A named link to a financial institution, backed by a Plaid item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    /// Plaid item id
    pub id: String,
    /// User-chosen name, unique among connections
    pub name: String,
    /// Local time the connection was added, `YYYY-MM-DD HH:MM:SS`
    pub date_added: String,
}

impl Connection {
    pub fn new(id: impl Into<String>, name: &str, added: NaiveDateTime) -> Result<Self, DomainError> {
        Ok(Self {
            id: id.into(),
            name: validate_connection_name(name)?,
            date_added: added.format(DATE_ADDED_FORMAT).to_string(),
        })
    }
}

/// Trim a connection name and reject empty ones.
pub fn validate_connection_name(name: &str) -> Result<String, DomainError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(DomainError::InvalidConnectionName(name.to_string()));
    }
    Ok(trimmed.to_string())
}

/// Ordered collection of connections with unique names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionRegistry {
    connections: Vec<Connection>,
}

impl ConnectionRegistry {
    pub fn new(connections: Vec<Connection>) -> Self {
        Self { connections }
    }

    pub fn find(&self, name: &str) -> Option<&Connection> {
        let name = name.trim();
        self.connections.iter().find(|c| c.name == name)
    }

    /// Append a connection, rejecting a duplicate name.
    pub fn insert(&mut self, connection: Connection) -> Result<(), DomainError> {
        if self.find(&connection.name).is_some() {
            return Err(DomainError::ConnectionExists(connection.name));
        }
        self.connections.push(connection);
        Ok(())
    }

    /// Remove the connection with the given name and return it.
    pub fn remove(&mut self, name: &str) -> Result<Connection, DomainError> {
        let name = name.trim();
        let idx = self
            .connections
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| DomainError::ConnectionNotFound(name.to_string()))?;
        Ok(self.connections.remove(idx))
    }

    pub fn as_slice(&self) -> &[Connection] {
        &self.connections
    }

    pub fn into_vec(self) -> Vec<Connection> {
        self.connections
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }
}

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^@]+@[^@]+\.[^@]+").expect("valid email regex"))
}

fn phone_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[0-9]{10}$").expect("valid phone regex"))
}

/// Validate an email address (loose check: `x@y.z`).
pub fn validate_email(email: &str) -> Result<String, DomainError> {
    let email = email.trim();
    if email_regex().is_match(email) {
        Ok(email.to_string())
    } else {
        Err(DomainError::InvalidEmail(email.to_string()))
    }
}

/// Validate a Canadian phone number: exactly 10 digits, no separators.
pub fn validate_phone(phone: &str) -> Result<String, DomainError> {
    let phone = phone.trim();
    if phone_regex().is_match(phone) {
        Ok(phone.to_string())
    } else {
        Err(DomainError::InvalidPhone(phone.to_string()))
    }
}

/// User identity sent to Plaid when creating a link token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCredentials {
    pub email: String,
    pub phone: String,
}

impl UserCredentials {
    /// Build validated credentials.
    pub fn new(email: &str, phone: &str) -> Result<Self, DomainError> {
        Ok(Self {
            email: validate_email(email)?,
            phone: validate_phone(phone)?,
        })
    }

    /// Phone with all but the last four characters replaced by `•`.
    pub fn masked_phone(&self) -> String {
        mask_phone(&self.phone)
    }
}

pub fn mask_phone(phone: &str) -> String {
    let chars: Vec<char> = phone.chars().collect();
    if chars.len() < 4 {
        return phone.to_string();
    }
    let visible: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{}", "•".repeat(chars.len() - 4), visible)
}

/// Plaid deployment the client talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaidEnvironment {
    #[default]
    Sandbox,
    Production,
}

impl PlaidEnvironment {
    pub fn base_url(&self) -> &'static str {
        match self {
            PlaidEnvironment::Sandbox => "https://sandbox.plaid.com",
            PlaidEnvironment::Production => "https://production.plaid.com",
        }
    }

    /// Map the legacy `ENV` variable: `prod` selects production, anything else sandbox.
    pub fn from_legacy_env(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("prod") {
            PlaidEnvironment::Production
        } else {
            PlaidEnvironment::Sandbox
        }
    }
}

impl fmt::Display for PlaidEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaidEnvironment::Sandbox => write!(f, "sandbox"),
            PlaidEnvironment::Production => write!(f, "production"),
        }
    }
}

impl FromStr for PlaidEnvironment {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sandbox" | "dev" => Ok(PlaidEnvironment::Sandbox),
            "production" | "prod" => Ok(PlaidEnvironment::Production),
            other => Err(DomainError::UnknownEnvironment(other.to_string())),
        }
    }
}

/// Hosted Link session returned by link token creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkSession {
    pub link_token: String,
    pub hosted_link_url: String,
}

/// Result of exchanging a public token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangedItem {
    pub access_token: String,
    pub item_id: String,
}

/// Expand `~` and environment variables; unexpandable input is returned as is.
pub fn expand_env_vars(path: &str) -> String {
    shellexpand::full(path)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| path.to_string())
}
