//! Durable campaign state.
//!
//! Two single-writer stores back a distribution run:
//!
//! - a [`CheckpointStore`] holding the addresses already sent, which is the
//!   only resume mechanism
//! - a [`Ledger`] holding the issued tokens in processing order
//!
//! Both have a file backend for real campaigns and a memory backend for tests.

pub mod backends;
mod error;
mod fs;
mod r#trait;

pub use backends::{FileCheckpoint, FileLedger, MemoryCheckpoint, MemoryLedger};
pub use error::{CheckpointError, LedgerError};
pub use r#trait::{CheckpointStore, Ledger};
