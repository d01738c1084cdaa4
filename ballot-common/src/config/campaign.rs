//! Campaign state locations and pacing.

use std::{path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Iterations below this make offline guessing of tokens cheap.
pub const MIN_ITERATIONS: u32 = 10_000;

/// Where a campaign keeps its state, and how fast it sends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignConfig {
    /// Addresses already sent, one per line.
    ///
    /// Default: `sent.txt`
    #[serde(default = "defaults::checkpoint")]
    pub checkpoint: PathBuf,

    /// Issued tokens, one per line.
    ///
    /// Default: `tokens.txt`
    #[serde(default = "defaults::ledger")]
    pub ledger: PathBuf,

    /// Pause between two sends.
    ///
    /// Default: 2000 milliseconds
    #[serde(default = "defaults::send_interval_ms")]
    pub send_interval_ms: u64,

    /// PBKDF2 work factor for token derivation.
    ///
    /// Default: 100000
    #[serde(default = "defaults::iterations")]
    pub iterations: u32,
}

impl Default for CampaignConfig {
    fn default() -> Self {
        Self {
            checkpoint: defaults::checkpoint(),
            ledger: defaults::ledger(),
            send_interval_ms: defaults::send_interval_ms(),
            iterations: defaults::iterations(),
        }
    }
}

impl CampaignConfig {
    pub const fn send_interval(&self) -> Duration {
        Duration::from_millis(self.send_interval_ms)
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.iterations < MIN_ITERATIONS {
            return Err(ConfigError::Invalid {
                field: "campaign.iterations",
                reason: format!("must be at least {MIN_ITERATIONS}"),
            });
        }

        if self.checkpoint == self.ledger {
            return Err(ConfigError::Invalid {
                field: "campaign.ledger",
                reason: "must differ from campaign.checkpoint".to_string(),
            });
        }

        Ok(())
    }
}

mod defaults {
    use std::path::PathBuf;

    pub fn checkpoint() -> PathBuf {
        PathBuf::from("sent.txt")
    }

    pub fn ledger() -> PathBuf {
        PathBuf::from("tokens.txt")
    }

    pub const fn send_interval_ms() -> u64 {
        2000
    }

    pub const fn iterations() -> u32 {
        100_000
    }
}
