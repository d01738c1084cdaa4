//! Error types for the ballot-common crate.

use std::{io, path::PathBuf};

use thiserror::Error;

/// Errors raised while reading the membership list.
#[derive(Debug, Error)]
pub enum InputError {
    /// The membership file could not be opened.
    #[error("Failed to open membership list {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The CSV data is malformed or lacks the name/email columns.
    #[error("Malformed membership list: {0}")]
    Csv(#[from] csv::Error),

    /// A row carries no address.
    #[error("Row {row} has an empty email address")]
    EmptyAddress { row: u64 },

    /// An address appears more than once.
    #[error("Row {row} repeats address {address}")]
    DuplicateAddress { row: u64, address: String },
}

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required configuration field is missing.
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// A configuration value is invalid.
    #[error("Invalid configuration for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}
