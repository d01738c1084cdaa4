use ballot_ledger::{CheckpointError, LedgerError};
use ballot_smtp::DeliveryError;
use ballot_token::{SaltError, TokenError};
use thiserror::Error;

/// Why a distribution run stopped.
///
/// Whatever the variant, every recipient processed before the failure is
/// both in the ledger and in the checkpoint.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Salt(#[from] SaltError),

    #[error("Invalid recipient {address:?}: {source}")]
    InvalidInput {
        address: String,
        #[source]
        source: TokenError,
    },

    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("Delivery to {address} failed: {source}")]
    Delivery {
        address: String,
        #[source]
        source: DeliveryError,
    },
}

impl DispatchError {
    /// Failed before anything was sent in this run.
    #[must_use]
    pub const fn is_preflight(&self) -> bool {
        matches!(self, Self::Salt(_) | Self::InvalidInput { .. })
            || matches!(self, Self::Checkpoint(CheckpointError::Corrupt { .. }))
    }

    #[must_use]
    pub const fn is_delivery(&self) -> bool {
        matches!(self, Self::Delivery { .. })
    }
}
