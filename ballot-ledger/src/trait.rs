use std::collections::HashSet;

use async_trait::async_trait;

use crate::error::{CheckpointError, LedgerError};

/// Record of addresses whose token email has been sent.
///
/// The set only grows within a campaign and never holds an address twice.
#[async_trait]
pub trait CheckpointStore: Send + Sync + std::fmt::Debug {
    /// Read the addresses recorded so far.
    ///
    /// A store that does not exist yet is an empty set, not an error.
    ///
    /// # Errors
    /// [`CheckpointError::Corrupt`] if the store exists but cannot be read.
    async fn load(&mut self) -> Result<HashSet<String>, CheckpointError>;

    /// Durably record `address`. Recording the same address again is a no-op.
    ///
    /// # Errors
    /// If the record cannot be made durable.
    async fn mark_sent(&mut self, address: &str) -> Result<(), CheckpointError>;
}

/// Append-only list of issued tokens.
#[async_trait]
pub trait Ledger: Send + Sync + std::fmt::Debug {
    /// Read the tokens recorded so far, in the order they were appended.
    ///
    /// # Errors
    /// [`LedgerError::Unreadable`] if the ledger exists but cannot be read.
    async fn load(&mut self) -> Result<Vec<String>, LedgerError>;

    /// Durably append one token.
    ///
    /// # Errors
    /// If the entry cannot be made durable.
    async fn append(&mut self, token: &str) -> Result<(), LedgerError>;
}
