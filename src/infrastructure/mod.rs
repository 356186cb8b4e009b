//! Infrastructure layer: I/O implementations and DI container
//!
//! This layer implements I/O boundary traits and wires up services.

pub mod browser;
pub mod callback;
pub mod di;
pub mod error;
pub mod http;
pub mod plaid;
pub mod secrets;
pub mod traits;

pub use error::{InfraError, InfraResult};
