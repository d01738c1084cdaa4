//! Error types for the ballot-ledger crate.

use std::{io, path::PathBuf};

use thiserror::Error;

/// Checkpoint store failures.
#[derive(Debug, Error)]
pub enum CheckpointError {
    /// The checkpoint exists but cannot be read. Treating it as empty would
    /// resend to everyone already notified, so the run must stop.
    #[error("Checkpoint {path} is unreadable: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    /// The address could not be made durable.
    #[error("Failed to record {address} in the checkpoint: {source}")]
    Write {
        address: String,
        #[source]
        source: io::Error,
    },

    /// The address cannot be represented as a single line.
    #[error("Address {0:?} cannot be stored in a line-delimited checkpoint")]
    Unstorable(String),

    /// Rewriting the normalised checkpoint failed.
    #[error("Failed to compact checkpoint {path}: {source}")]
    Compact {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Internal error (lock poisoning, injected failures).
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Token ledger failures.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The ledger exists but cannot be read.
    #[error("Ledger {path} is unreadable: {reason}")]
    Unreadable { path: PathBuf, reason: String },

    /// The entry could not be made durable.
    #[error("Failed to append to the ledger: {0}")]
    Write(#[from] io::Error),

    /// Internal error (lock poisoning, injected failures).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl<T> From<std::sync::PoisonError<T>> for CheckpointError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        Self::Internal(format!("Lock poisoned: {e}"))
    }
}

impl<T> From<std::sync::PoisonError<T>> for LedgerError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        Self::Internal(format!("Lock poisoned: {e}"))
    }
}
