#![allow(dead_code, clippy::unwrap_used)]

use std::{
    num::NonZeroU32,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use ballot_common::Recipient;
use ballot_dispatch::MessageSettings;
use ballot_smtp::{DeliveryError, MailContext, Mailer, client::ClientError};
use ballot_token::{Salt, TokenDeriver};
use rand::{SeedableRng, rngs::StdRng};

pub const SALT: &str = "000102030405060708090a0b0c0d0e0f";

/// Tokens for the fixed salt at 1000 iterations.
pub const ANN_TOKEN: &str = "e11660feeecc0a3e";
pub const BO_TOKEN: &str = "5bf24566b79d900a";

pub fn salt() -> Salt {
    Salt::from_hex(SALT).unwrap()
}

pub fn fast_deriver() -> TokenDeriver {
    TokenDeriver::new(NonZeroU32::new(1000).unwrap())
}

pub fn shuffler(seed: u64) -> ballot_token::RecipientShuffler {
    ballot_token::RecipientShuffler::with_rng(StdRng::seed_from_u64(seed))
}

pub fn settings() -> MessageSettings {
    MessageSettings {
        template: "token.html".to_string(),
        subject: "Your voting token".to_string(),
        sender: "Returning Officer".to_string(),
    }
}

pub fn ann_and_bo() -> Vec<Recipient> {
    vec![
        Recipient::new("Ann", "ann@x.org"),
        Recipient::new("Bo", "bo@x.org"),
    ]
}

pub fn members(count: usize) -> Vec<Recipient> {
    (0..count)
        .map(|i| Recipient::new(format!("Member {i}"), format!("m{i}@example.org")))
        .collect()
}

#[derive(Debug, Clone)]
pub struct Delivered {
    pub template: String,
    pub context: MailContext,
    pub recipient: String,
    pub subject: String,
}

#[derive(Debug, Default)]
struct Log {
    delivered: Vec<Delivered>,
    attempts: usize,
    closes: usize,
}

/// Records every message instead of sending it.
#[derive(Debug, Clone, Default)]
pub struct RecordingMailer {
    log: Arc<Mutex<Log>>,
    fail_on_attempt: Option<usize>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject the `nth` send (1-indexed).
    pub fn failing_on(nth: usize) -> Self {
        Self {
            fail_on_attempt: Some(nth),
            ..Self::default()
        }
    }

    pub fn delivered(&self) -> Vec<Delivered> {
        self.log.lock().unwrap().delivered.clone()
    }

    pub fn recipients(&self) -> Vec<String> {
        self.delivered().into_iter().map(|d| d.recipient).collect()
    }

    pub fn closes(&self) -> usize {
        self.log.lock().unwrap().closes
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(
        &mut self,
        template: &str,
        context: &MailContext,
        recipient: &str,
        subject: &str,
    ) -> Result<(), DeliveryError> {
        let mut log = self.log.lock().unwrap();
        log.attempts += 1;

        if self.fail_on_attempt == Some(log.attempts) {
            return Err(DeliveryError::Rejected {
                recipient: recipient.to_string(),
                source: ClientError::Rejected {
                    command: "RCPT TO",
                    code: 550,
                    message: "5.1.1 Mailbox unavailable".to_string(),
                },
            });
        }

        log.delivered.push(Delivered {
            template: template.to_string(),
            context: context.clone(),
            recipient: recipient.to_string(),
            subject: subject.to_string(),
        });
        Ok(())
    }

    async fn close(&mut self) -> Result<(), DeliveryError> {
        self.log.lock().unwrap().closes += 1;
        Ok(())
    }
}
