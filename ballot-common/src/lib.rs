//! Shared building blocks for the ballot workspace: logging, configuration
//! and the recipient list.

pub mod config;
pub mod error;
pub mod logging;
pub mod recipient;

pub use error::{ConfigError, InputError};
pub use recipient::Recipient;
pub use tracing;
