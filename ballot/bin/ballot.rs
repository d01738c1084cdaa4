//! Distribute voting tokens by email.
//!
//! ```text
//! ballot generate --file members.csv --salt 000102030405060708090a0b0c0d0e0f
//! ballot check-smtp
//! ballot send --file members.csv
//! ```

use std::path::PathBuf;

use anyhow::Context;
use ballot::{CONFIG_ENV, CampaignOverrides, PASSWORD_ENV};
use ballot_common::logging;
use ballot_token::{DEFAULT_ITERATIONS, SaltProvider};
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "ballot")]
#[command(about = "Distribute unlinkable voting tokens by email", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (otherwise `BALLOT_CONFIG`, ./ballot.config.ron,
    /// /etc/ballot/ballot.config.ron)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the tokens for a membership list without sending anything
    Generate {
        /// Membership CSV with name and email columns
        #[arg(short, long)]
        file: PathBuf,

        /// 32 hex characters; a random salt is generated when omitted
        #[arg(short, long)]
        salt: Option<String>,

        /// PBKDF2 iterations
        #[arg(long, default_value_t = DEFAULT_ITERATIONS)]
        iterations: u32,
    },
    /// Connect and authenticate with the configured SMTP server
    CheckSmtp,
    /// Send every member their token, resuming an interrupted run
    Send {
        /// Membership CSV with name and email columns
        #[arg(short, long)]
        file: PathBuf,

        /// 32 hex characters; required once the campaign has started, and
        /// must match earlier runs
        #[arg(short, long)]
        salt: Option<String>,

        /// Checkpoint file, overriding `campaign.checkpoint`
        #[arg(long)]
        checkpoint: Option<PathBuf>,

        /// Ledger file, overriding `campaign.ledger`
        #[arg(long)]
        ledger: Option<PathBuf>,

        /// Pause between sends, overriding `campaign.send_interval_ms`
        #[arg(long)]
        interval_ms: Option<u64>,
    },
}

fn salt(explicit: Option<&str>) -> anyhow::Result<ballot_token::Salt> {
    let salt = SaltProvider.obtain(explicit)?;
    eprintln!("Salt: {salt}");
    Ok(salt)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let cli = Cli::parse();
    let config = || -> anyhow::Result<ballot_common::config::Config> {
        let path = ballot::find_config_file(cli.config.as_deref(), std::env::var(CONFIG_ENV).ok())?;
        ballot::load_config(&path)
    };

    match &cli.command {
        Commands::Generate {
            file,
            salt: explicit,
            iterations,
        } => {
            let salt = salt(explicit.as_deref())?;
            for token in ballot::generate(file, &salt, *iterations)? {
                println!("{token}");
            }
        }
        Commands::CheckSmtp => {
            let config = config()?;
            let mut mailer = ballot::build_mailer(&config, std::env::var(PASSWORD_ENV).ok())?;
            ballot::check_smtp(&mut mailer)
                .await
                .with_context(|| format!("SMTP check against {} failed", config.smtp.address()))?;
            println!("OK");
        }
        Commands::Send {
            file,
            salt: explicit,
            checkpoint,
            ledger,
            interval_ms,
        } => {
            let mut config = config()?;
            CampaignOverrides {
                checkpoint: checkpoint.clone(),
                ledger: ledger.clone(),
                interval_ms: *interval_ms,
            }
            .apply(&mut config.campaign);

            let salt = ballot::campaign_salt(&config.campaign, explicit.as_deref())?;
            eprintln!("Salt: {salt}");

            let mailer = ballot::build_mailer(&config, std::env::var(PASSWORD_ENV).ok())?;
            let report = ballot::send(&config, file, salt, mailer).await?;

            tracing::info!(%report, "Campaign run complete");
            println!("{report}");
        }
    }

    Ok(())
}
