use std::{
    collections::HashSet,
    sync::{Arc, RwLock},
};

use async_trait::async_trait;

use crate::{
    error::{CheckpointError, LedgerError},
    r#trait::{CheckpointStore, Ledger},
};

#[derive(Debug, Default)]
struct CheckpointState {
    addresses: Vec<String>,
    writes: usize,
    fail_after: Option<usize>,
}

/// In-memory checkpoint.
///
/// Clones share state, so a test can hand one clone to the dispatcher and
/// inspect the other afterwards. `fail_after(n)` makes every write after the
/// first `n` fail, which stands in for a crash between ledger append and
/// checkpoint mark.
#[derive(Debug, Clone, Default)]
pub struct MemoryCheckpoint {
    state: Arc<RwLock<CheckpointState>>,
}

impl MemoryCheckpoint {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A checkpoint left behind by an earlier run.
    #[must_use]
    pub fn with_addresses<I, S>(addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            state: Arc::new(RwLock::new(CheckpointState {
                addresses: addresses.into_iter().map(Into::into).collect(),
                ..CheckpointState::default()
            })),
        }
    }

    #[must_use]
    pub fn fail_after(self, writes: usize) -> Self {
        self.state
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .fail_after = Some(writes);
        self
    }

    /// Recorded addresses in the order they were first marked.
    #[must_use]
    pub fn addresses(&self) -> Vec<String> {
        self.state
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .addresses
            .clone()
    }

    /// Number of successful `mark_sent` calls, including no-op repeats.
    #[must_use]
    pub fn writes(&self) -> usize {
        self.state
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .writes
    }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpoint {
    async fn load(&mut self) -> Result<HashSet<String>, CheckpointError> {
        Ok(self.state.read()?.addresses.iter().cloned().collect())
    }

    async fn mark_sent(&mut self, address: &str) -> Result<(), CheckpointError> {
        let mut state = self.state.write()?;

        if state.fail_after.is_some_and(|limit| state.writes >= limit) {
            return Err(CheckpointError::Internal(format!(
                "Injected failure recording {address}"
            )));
        }

        state.writes += 1;
        if !state.addresses.iter().any(|a| a == address) {
            state.addresses.push(address.to_string());
        }

        Ok(())
    }
}

#[derive(Debug, Default)]
struct LedgerState {
    tokens: Vec<String>,
    fail_after: Option<usize>,
}

/// In-memory ledger with the same sharing and failure injection as
/// [`MemoryCheckpoint`].
#[derive(Debug, Clone, Default)]
pub struct MemoryLedger {
    state: Arc<RwLock<LedgerState>>,
}

impl MemoryLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            state: Arc::new(RwLock::new(LedgerState {
                tokens: tokens.into_iter().map(Into::into).collect(),
                fail_after: None,
            })),
        }
    }

    #[must_use]
    pub fn fail_after(self, appends: usize) -> Self {
        self.state
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .fail_after = Some(appends);
        self
    }

    #[must_use]
    pub fn tokens(&self) -> Vec<String> {
        self.state
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .tokens
            .clone()
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn load(&mut self) -> Result<Vec<String>, LedgerError> {
        Ok(self.state.read()?.tokens.clone())
    }

    async fn append(&mut self, token: &str) -> Result<(), LedgerError> {
        let mut state = self.state.write()?;

        if state.fail_after.is_some_and(|limit| state.tokens.len() >= limit) {
            return Err(LedgerError::Internal(format!("Injected failure appending {token}")));
        }

        state.tokens.push(token.to_string());
        Ok(())
    }
}
