//! The three things an operator does with `ballot`.

use std::{
    io::ErrorKind,
    num::NonZeroU32,
    path::{Path, PathBuf},
};

use anyhow::Context;
use ballot_common::{
    config::{CampaignConfig, Config, TlsMode},
    internal, recipient,
};
use ballot_dispatch::{Dispatcher, MessageSettings, Pacer, RunReport};
use ballot_ledger::{FileCheckpoint, FileLedger};
use ballot_smtp::{Mailer, TemplatedMailer, Templates};
use ballot_token::{RecipientShuffler, Salt, SaltProvider, TokenDeriver};

/// Command-line replacements for the `campaign` section.
#[derive(Debug, Clone, Default)]
pub struct CampaignOverrides {
    pub checkpoint: Option<PathBuf>,
    pub ledger: Option<PathBuf>,
    pub interval_ms: Option<u64>,
}

impl CampaignOverrides {
    pub fn apply(self, campaign: &mut CampaignConfig) {
        if let Some(checkpoint) = self.checkpoint {
            campaign.checkpoint = checkpoint;
        }
        if let Some(ledger) = self.ledger {
            campaign.ledger = ledger;
        }
        if let Some(interval_ms) = self.interval_ms {
            campaign.send_interval_ms = interval_ms;
        }
    }
}

fn deriver(iterations: u32) -> anyhow::Result<TokenDeriver> {
    NonZeroU32::new(iterations)
        .map(TokenDeriver::new)
        .context("Iterations must be greater than zero")
}

/// Derive tokens for everyone in `members`, in shuffled order, without
/// sending anything or touching campaign state.
///
/// # Errors
/// If the membership list is invalid.
pub fn generate(members: &Path, salt: &Salt, iterations: u32) -> anyhow::Result<Vec<String>> {
    let deriver = deriver(iterations)?;
    let recipients = recipient::load(members)?;

    RecipientShuffler::new()
        .shuffle(recipients)
        .iter()
        .map(|r| {
            deriver
                .derive(&r.address, salt)
                .map(|token| token.to_string())
                .with_context(|| format!("Cannot derive a token for {:?}", r.address))
        })
        .collect()
}

/// The SMTP password from `BALLOT_SMTP_PASSWORD` or the file. Only a plain
/// connection to a local relay may go without one.
fn password(config: &Config, from_env: Option<String>) -> anyhow::Result<Option<String>> {
    match config.smtp.resolve_password(from_env) {
        Ok(password) => Ok(Some(password)),
        Err(_) if config.smtp.tls == TlsMode::Plain => Ok(None),
        Err(e) => Err(e).context("Set the SMTP password in the config or the environment"),
    }
}

/// Construct the mailer, failing early if the template is unusable.
///
/// # Errors
/// If no password is available for a TLS server, or the template is missing
/// or does not compile.
pub fn build_mailer(
    config: &Config,
    password_env: Option<String>,
) -> anyhow::Result<TemplatedMailer> {
    let password = password(config, password_env)?;

    let templates = Templates::from_directory(&config.template.directory);
    templates.check(&config.template.name)?;

    Ok(TemplatedMailer::new(config.smtp.clone(), password, templates))
}

/// Connect and authenticate, then disconnect.
///
/// # Errors
/// If the server cannot be reached or refuses the credentials.
pub async fn check_smtp(mailer: &mut TemplatedMailer) -> anyhow::Result<()> {
    mailer.open().await?;
    mailer.close().await?;
    internal!(level = INFO, "SMTP connection and authentication succeeded");
    Ok(())
}

/// The salt for a `send` run.
///
/// A random salt is only handed out while the campaign has no checkpoint or
/// ledger entries. After that every run must reuse the salt of the first,
/// or the remaining members get tokens the ledger cannot be reconciled with.
///
/// # Errors
/// If `explicit_hex` is malformed, or it is missing and the campaign has
/// already started.
pub fn campaign_salt(
    campaign: &CampaignConfig,
    explicit_hex: Option<&str>,
) -> anyhow::Result<Salt> {
    if explicit_hex.is_none() {
        for path in [&campaign.checkpoint, &campaign.ledger] {
            if has_entries(path)? {
                anyhow::bail!(
                    "{} already records progress for this campaign; pass the salt of the earlier runs with --salt",
                    path.display()
                );
            }
        }
    }

    Ok(SaltProvider.obtain(explicit_hex)?)
}

fn has_entries(path: &Path) -> anyhow::Result<bool> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(bytes.iter().any(|b| !b.is_ascii_whitespace())),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e).with_context(|| format!("Cannot read {}", path.display())),
    }
}

/// Run the distribution for `members` using the campaign files named in
/// `config`.
///
/// # Errors
/// If the membership list is invalid, the checkpoint is unreadable, or any
/// send, ledger or checkpoint write fails.
pub async fn send<M: Mailer>(
    config: &Config,
    members: &Path,
    salt: Salt,
    mailer: M,
) -> anyhow::Result<RunReport> {
    let campaign = &config.campaign;
    let recipients = recipient::load(members)?;

    let settings = MessageSettings {
        template: config.template.name.clone(),
        subject: config.template.subject.clone(),
        sender: config.smtp.sender_name.clone(),
    };

    let mut dispatcher = Dispatcher::new(
        FileCheckpoint::new(&campaign.checkpoint),
        FileLedger::new(&campaign.ledger),
        mailer,
        salt,
        settings,
    )
    .with_deriver(deriver(campaign.iterations)?)
    .with_pacer(Pacer::new(campaign.send_interval()));

    let report = dispatcher.run(recipients).await?;
    Ok(report)
}
