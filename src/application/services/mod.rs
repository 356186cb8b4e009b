//! Application services
//!
//! Concrete service implementations that orchestrate domain logic.
//! Services depend on I/O boundary traits (FileSystem, SecretStore, PlaidApi, etc.)
//! but are themselves concrete structs, not traits.

mod connection;
mod credential;

pub use connection::{
    ConnectionService, LinkEvent, LinkProgress, NoProgress, PlaidConnection, LINK_STEPS,
};
pub use credential::CredentialService;
