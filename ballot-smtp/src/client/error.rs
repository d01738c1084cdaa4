//! Error types for the SMTP client.

use std::io;

use thiserror::Error;

/// Errors that can occur when using the SMTP client.
#[derive(Error, Debug)]
pub enum ClientError {
    /// IO error occurred during network operations.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Failed to parse an SMTP response from the server.
    #[error("Failed to parse SMTP response: {0}")]
    ParseError(String),

    /// The server answered a command with a code other than the one expected.
    #[error("{command} rejected: {code} {message}")]
    Rejected {
        command: &'static str,
        code: u16,
        message: String,
    },

    /// The server offers no authentication mechanism this client speaks.
    #[error("Server does not offer AUTH PLAIN or AUTH LOGIN")]
    NoAuthMechanism,

    /// TLS/SSL error occurred.
    #[error("TLS error: {0}")]
    TlsError(String),

    /// Invalid message contents.
    #[error("Invalid message: {0}")]
    BuilderError(String),

    /// No response within the configured timeout.
    #[error("Timed out waiting for {0}")]
    Timeout(&'static str),

    /// Connection was closed unexpectedly.
    #[error("Connection closed unexpectedly")]
    ConnectionClosed,

    /// UTF-8 decoding error.
    #[error("UTF-8 error: {0}")]
    Utf8Error(#[from] std::str::Utf8Error),
}

impl ClientError {
    /// The server refused a command with a 4xx code.
    #[must_use]
    pub const fn is_temporary(&self) -> bool {
        matches!(self, Self::Rejected { code, .. } if *code >= 400 && *code < 500)
    }

    /// The server refused a command with a 5xx code.
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        matches!(self, Self::Rejected { code, .. } if *code >= 500 && *code < 600)
    }
}

/// Specialized `Result` type for SMTP client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
