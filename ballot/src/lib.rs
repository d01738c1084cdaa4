//! Library side of the `ballot` binary: locating and loading the
//! configuration, and wiring it into the distribution pipeline.

pub mod commands;
pub mod config;

pub use commands::{
    CampaignOverrides, build_mailer, campaign_salt, check_smtp, generate, send,
};
pub use config::{CONFIG_ENV, PASSWORD_ENV, find_config_file, load_config};
