//! Configuration types for a ballot campaign.
//!
//! The configuration is read from a RON file by the `ballot` binary:
//!
//! ```ron
//! Ballot (
//!     smtp: (
//!         host: "smtp.example.org",
//!         port: 465,
//!         tls: Implicit,
//!         sender_address: "returning-officer@example.org",
//!         sender_name: "Returning Officer",
//!     ),
//!     template: (
//!         directory: "templates",
//!         name: "token.html",
//!         subject: "Your voting token",
//!     ),
//!     campaign: (
//!         checkpoint: "sent.txt",
//!         ledger: "tokens.txt",
//!     ),
//! )
//! ```
//!
//! ## Modules
//!
//! - [`smtp`]: server, credentials, sender identity and timeouts
//! - [`campaign`]: checkpoint/ledger locations, pacing and work factor
//! - [`template`]: which template to render and the subject line

pub mod campaign;
pub mod smtp;
pub mod template;

use serde::{Deserialize, Serialize};

pub use campaign::CampaignConfig;
pub use smtp::{ClientTimeouts, SmtpConfig, TlsMode};
pub use template::TemplateConfig;

use crate::error::ConfigError;

/// Complete configuration for one campaign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename = "Ballot")]
pub struct Config {
    pub smtp: SmtpConfig,
    pub template: TemplateConfig,
    #[serde(default)]
    pub campaign: CampaignConfig,
}

impl Config {
    /// Check every section for values that would only fail mid-run.
    ///
    /// # Errors
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.smtp.validate()?;
        self.template.validate()?;
        self.campaign.validate()
    }
}
