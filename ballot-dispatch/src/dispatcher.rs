use std::collections::{HashMap, HashSet};

use ballot_common::{Recipient, internal};
use ballot_ledger::{CheckpointStore, Ledger};
use ballot_smtp::{MailContext, Mailer};
use ballot_token::{RecipientShuffler, Salt, TokenDeriver, TokenError};
use tracing::{debug, info, warn};

use crate::{DispatchError, Pacer, RecipientState, RunReport};

/// What every token email looks like.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageSettings {
    pub template: String,
    pub subject: String,
    /// Shown to the recipient as `{{ sender }}`.
    pub sender: String,
}

/// Drives one distribution run over explicit checkpoint, ledger and mailer
/// collaborators.
///
/// ```no_run
/// # use ballot_dispatch::{Dispatcher, MessageSettings, Pacer};
/// # use ballot_ledger::{FileCheckpoint, FileLedger};
/// # use ballot_smtp::{Mailer};
/// # use ballot_token::Salt;
/// # async fn example(mailer: impl Mailer, salt: Salt, settings: MessageSettings) -> Result<(), Box<dyn std::error::Error>> {
/// let mut dispatcher = Dispatcher::new(
///     FileCheckpoint::new("sent.txt"),
///     FileLedger::new("tokens.txt"),
///     mailer,
///     salt,
///     settings,
/// )
/// .with_pacer(Pacer::new(std::time::Duration::from_secs(2)));
///
/// let report = dispatcher.run(ballot_common::recipient::load("members.csv".as_ref())?).await?;
/// println!("{report}");
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Dispatcher<C, L, M> {
    checkpoint: C,
    ledger: L,
    mailer: M,
    salt: Salt,
    deriver: TokenDeriver,
    shuffler: RecipientShuffler,
    pacer: Pacer,
    message: MessageSettings,
    states: HashMap<String, RecipientState>,
}

impl<C, L, M> Dispatcher<C, L, M>
where
    C: CheckpointStore,
    L: Ledger,
    M: Mailer,
{
    /// A dispatcher with the default work factor, an OS-seeded shuffle and
    /// no pause between sends.
    pub fn new(checkpoint: C, ledger: L, mailer: M, salt: Salt, message: MessageSettings) -> Self {
        Self {
            checkpoint,
            ledger,
            mailer,
            salt,
            deriver: TokenDeriver::default(),
            shuffler: RecipientShuffler::new(),
            pacer: Pacer::unthrottled(),
            message,
            states: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_deriver(mut self, deriver: TokenDeriver) -> Self {
        self.deriver = deriver;
        self
    }

    #[must_use]
    pub fn with_shuffler(mut self, shuffler: RecipientShuffler) -> Self {
        self.shuffler = shuffler;
        self
    }

    #[must_use]
    pub fn with_pacer(mut self, pacer: Pacer) -> Self {
        self.pacer = pacer;
        self
    }

    /// State of `address` in the current or most recent run.
    #[must_use]
    pub fn state(&self, address: &str) -> Option<RecipientState> {
        self.states.get(address).copied()
    }

    pub const fn mailer(&self) -> &M {
        &self.mailer
    }

    pub fn into_parts(self) -> (C, L, M) {
        (self.checkpoint, self.ledger, self.mailer)
    }

    /// Process every recipient not yet checkpointed.
    ///
    /// The mailer is closed when the run ends, successfully or not.
    ///
    /// # Errors
    /// Stops at the first failure. Input and checkpoint errors are raised
    /// before anything is sent; a delivery error leaves the failing recipient
    /// pending for the next run.
    pub async fn run(&mut self, recipients: Vec<Recipient>) -> Result<RunReport, DispatchError> {
        let result = self.dispatch(recipients).await;

        if let Err(e) = self.mailer.close().await {
            warn!("Failed to close the mail session cleanly: {e}");
        }

        result
    }

    #[tracing::instrument(level = "info", skip_all, fields(recipients = recipients.len()))]
    async fn dispatch(&mut self, recipients: Vec<Recipient>) -> Result<RunReport, DispatchError> {
        self.states.clear();
        let mut report = RunReport {
            total: recipients.len(),
            ..RunReport::default()
        };

        // Loading may normalise the files on disk, so bad input must be
        // refused first.
        validate(&recipients)?;

        let sent = self.checkpoint.load().await?;
        let ledgered = self.ledger.load().await?;
        let mut unreconciled = ledgered.len().saturating_sub(sent.len());
        if ledgered.len() < sent.len() {
            warn!(
                ledger = ledgered.len(),
                checkpoint = sent.len(),
                "Ledger holds fewer tokens than the checkpoint holds addresses"
            );
        }
        let ledgered: HashSet<String> = ledgered.into_iter().collect();

        let shuffled = self.shuffler.shuffle(recipients);
        let pending = self.pending(shuffled, &sent, &mut report);
        info!(
            pending = pending.len(),
            skipped = report.skipped,
            "Starting distribution"
        );

        for (index, recipient) in pending.iter().enumerate() {
            let token = self
                .deriver
                .derive(&recipient.address, &self.salt)
                .map_err(|source| invalid(&recipient.address, source))?
                .to_string();

            if unreconciled > 0 && ledgered.contains(&token) {
                self.advance(&recipient.address, RecipientState::Recorded);
                self.checkpoint.mark_sent(&recipient.address).await?;
                self.advance(&recipient.address, RecipientState::Checkpointed);

                unreconciled -= 1;
                report.reconciled += 1;
                internal!(
                    level = INFO,
                    "Token already issued before an interruption, checkpointing without resending"
                );
                continue;
            }

            self.pacer.ready().await;

            self.advance(&recipient.address, RecipientState::Sending);
            let context = MailContext {
                name: recipient.name.clone(),
                token: token.clone(),
                sender: self.message.sender.clone(),
            };
            self.mailer
                .send(
                    &self.message.template,
                    &context,
                    &recipient.address,
                    &self.message.subject,
                )
                .await
                .map_err(|source| DispatchError::Delivery {
                    address: recipient.address.clone(),
                    source,
                })?;

            self.ledger.append(&token).await?;
            self.advance(&recipient.address, RecipientState::Recorded);

            self.checkpoint.mark_sent(&recipient.address).await?;
            self.advance(&recipient.address, RecipientState::Checkpointed);

            report.sent += 1;
            internal!(level = INFO, "Sent {}/{}", index + 1, pending.len());
        }

        info!(%report, "Distribution finished");
        Ok(report)
    }

    /// Split the shuffled list into work for this run.
    fn pending(
        &mut self,
        shuffled: Vec<Recipient>,
        sent: &HashSet<String>,
        report: &mut RunReport,
    ) -> Vec<Recipient> {
        let mut seen = HashSet::new();
        let mut pending = Vec::with_capacity(shuffled.len());

        for recipient in shuffled {
            if !seen.insert(recipient.address.clone()) {
                debug!(address = %recipient.address, "Skipping duplicate entry");
                report.duplicates += 1;
                continue;
            }

            if sent.contains(&recipient.address) {
                self.states
                    .insert(recipient.address.clone(), RecipientState::Checkpointed);
                report.skipped += 1;
                continue;
            }

            self.states
                .insert(recipient.address.clone(), RecipientState::Pending);
            pending.push(recipient);
        }

        pending
    }

    fn advance(&mut self, address: &str, to: RecipientState) {
        if let Some(state) = self.states.get_mut(address) {
            debug_assert!(state.can_become(to), "{state} -> {to}");
            debug!(%address, from = %state, %to, "Recipient state changed");
            *state = to;
        }
    }
}

fn validate(recipients: &[Recipient]) -> Result<(), DispatchError> {
    match recipients.iter().find(|r| r.address.trim().is_empty()) {
        Some(recipient) => Err(invalid(&recipient.address, TokenError::EmptyAddress)),
        None => Ok(()),
    }
}

fn invalid(address: &str, source: TokenError) -> DispatchError {
    DispatchError::InvalidInput {
        address: address.to_string(),
        source,
    }
}
