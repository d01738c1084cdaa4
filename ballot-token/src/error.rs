//! Error types for the ballot-token crate.

use thiserror::Error;

/// The operator supplied a salt that is not 16 hex-encoded bytes.
#[derive(Debug, Error, PartialEq)]
pub enum SaltError {
    /// The string is not 32 characters long.
    #[error("Salt must be {expected} hex characters, got {actual}")]
    WrongLength { expected: usize, actual: usize },

    /// The string contains something other than hex digits.
    #[error("Salt is not valid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),
}

/// Token derivation was given input it cannot work with.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("Cannot derive a token for an empty address")]
    EmptyAddress,

    #[error("Salt must be {expected} bytes, got {actual}")]
    SaltLength { expected: usize, actual: usize },

    #[error("Token must be {expected} hex characters: {reason}")]
    Malformed { expected: usize, reason: String },
}
