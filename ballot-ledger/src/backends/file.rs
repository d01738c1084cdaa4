use std::{
    collections::HashSet,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use ballot_common::internal;
use ballot_token::Token;
use tracing::{debug, warn};

use crate::{
    error::{CheckpointError, LedgerError},
    fs,
    r#trait::{CheckpointStore, Ledger},
};

/// Checkpoint kept as a text file, one address per line, no header.
///
/// Each `mark_sent` appends one line and syncs it before returning. Loading
/// normalises the file: blank lines and duplicate addresses are dropped, a
/// final address without a newline is kept, and if anything changed the file
/// is rewritten atomically (temp file, then rename) with the clean set in its
/// original order. Loading never removes an address.
#[derive(Debug, Clone)]
pub struct FileCheckpoint {
    path: PathBuf,
    known: Option<HashSet<String>>,
}

impl FileCheckpoint {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            known: None,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn corrupt(&self, reason: impl ToString) -> CheckpointError {
        CheckpointError::Corrupt {
            path: self.path.clone(),
            reason: reason.to_string(),
        }
    }
}

#[async_trait]
impl CheckpointStore for FileCheckpoint {
    #[tracing::instrument(level = "debug", skip(self), fields(path = %self.path.display()))]
    async fn load(&mut self) -> Result<HashSet<String>, CheckpointError> {
        let Some(bytes) = fs::read_existing(&self.path)
            .await
            .map_err(|e| self.corrupt(e))?
        else {
            internal!(level = DEBUG, "No checkpoint yet, starting a new campaign");
            self.known = Some(HashSet::new());
            return Ok(HashSet::new());
        };

        let text = String::from_utf8(bytes).map_err(|e| self.corrupt(e))?;
        let lines = fs::split_lines(&text);

        let mut known = HashSet::with_capacity(lines.complete.len());
        let mut ordered = Vec::with_capacity(lines.complete.len());
        let mut dirty = false;

        if lines.unterminated.is_some() {
            debug!("Final checkpoint line has no newline, terminating it");
            dirty = true;
        }

        for address in lines.complete.into_iter().chain(lines.unterminated) {
            if address.is_empty() || !known.insert(address.to_string()) {
                dirty = true;
                continue;
            }
            ordered.push(address);
        }

        if dirty {
            fs::replace_lines(&self.path, &ordered)
                .await
                .map_err(|source| CheckpointError::Compact {
                    path: self.path.clone(),
                    source,
                })?;
            internal!(
                level = INFO,
                "Compacted checkpoint to {} unique addresses",
                ordered.len()
            );
        }

        self.known = Some(known.clone());
        Ok(known)
    }

    async fn mark_sent(&mut self, address: &str) -> Result<(), CheckpointError> {
        if address.is_empty() || address.contains(['\n', '\r']) || address.trim() != address {
            return Err(CheckpointError::Unstorable(address.to_string()));
        }

        if self.known.is_none() {
            self.load().await?;
        }

        if self
            .known
            .as_ref()
            .is_some_and(|known| known.contains(address))
        {
            return Ok(());
        }

        fs::append_line(&self.path, address)
            .await
            .map_err(|source| CheckpointError::Write {
                address: address.to_string(),
                source,
            })?;

        self.known
            .get_or_insert_with(HashSet::new)
            .insert(address.to_string());

        Ok(())
    }
}

/// Token ledger kept as a text file, one token per line.
///
/// Entries are only ever appended. A final line without a newline is
/// terminated on load if it is a whole token, so the next append does not
/// get glued onto it; anything else there is a crash mid-append and is cut
/// off.
#[derive(Debug, Clone)]
pub struct FileLedger {
    path: PathBuf,
    checked: bool,
}

impl FileLedger {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            checked: false,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn unreadable(&self, reason: impl ToString) -> LedgerError {
        LedgerError::Unreadable {
            path: self.path.clone(),
            reason: reason.to_string(),
        }
    }
}

#[async_trait]
impl Ledger for FileLedger {
    #[tracing::instrument(level = "debug", skip(self), fields(path = %self.path.display()))]
    async fn load(&mut self) -> Result<Vec<String>, LedgerError> {
        let Some(bytes) = fs::read_existing(&self.path)
            .await
            .map_err(|e| self.unreadable(e))?
        else {
            self.checked = true;
            return Ok(Vec::new());
        };

        let text = String::from_utf8(bytes).map_err(|e| self.unreadable(e))?;
        let lines = fs::split_lines(&text);
        let mut tokens: Vec<String> = lines
            .complete
            .iter()
            .filter(|line| !line.is_empty())
            .map(ToString::to_string)
            .collect();

        if let Some(last) = lines.unterminated {
            if last.parse::<Token>().is_ok() {
                debug!("Final ledger line has no newline, terminating it");
                tokens.push(last.to_string());
            } else {
                warn!(
                    fragment = last,
                    "Cutting incomplete final ledger line left by an interrupted run"
                );
            }
            fs::replace_lines(&self.path, &tokens).await?;
        }

        self.checked = true;
        Ok(tokens)
    }

    async fn append(&mut self, token: &str) -> Result<(), LedgerError> {
        if !self.checked {
            self.load().await?;
        }

        fs::append_line(&self.path, token).await?;
        Ok(())
    }
}
