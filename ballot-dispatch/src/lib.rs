//! The distribution run.
//!
//! [`Dispatcher`] walks a shuffled membership list, skips everyone already in
//! the checkpoint and, for each remaining member, derives the token, mails it,
//! appends it to the ledger and marks the address as sent, in that order.
//! A crash can therefore leave at most one token in the ledger whose address
//! is not checkpointed; the next run reconciles it without resending.

mod dispatcher;
mod error;
mod pacer;
mod report;
mod state;

pub use dispatcher::{Dispatcher, MessageSettings};
pub use error::DispatchError;
pub use pacer::Pacer;
pub use report::RunReport;
pub use state::RecipientState;
