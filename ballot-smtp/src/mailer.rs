//! Sending rendered token emails.

use async_trait::async_trait;
use ballot_common::{
    config::{SmtpConfig, TlsMode},
    internal,
};
use serde::Serialize;

use crate::{
    client::{ClientError, MessageBuilder, SmtpClient},
    error::DeliveryError,
    template::Templates,
};

/// Values available to the email template.
#[derive(Clone, Serialize)]
pub struct MailContext {
    pub name: String,
    pub token: String,
    pub sender: String,
}

impl std::fmt::Debug for MailContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailContext")
            .field("name", &self.name)
            .field("token", &"****")
            .field("sender", &self.sender)
            .finish()
    }
}

/// Something that can deliver one templated email.
#[async_trait]
pub trait Mailer: Send + std::fmt::Debug {
    /// Deliver `template` rendered with `context` to `recipient`.
    ///
    /// Returns once the server has accepted the message.
    ///
    /// # Errors
    /// If the message cannot be rendered or the server does not accept it.
    async fn send(
        &mut self,
        template: &str,
        context: &MailContext,
        recipient: &str,
        subject: &str,
    ) -> Result<(), DeliveryError>;

    /// End the session, if one is open.
    ///
    /// # Errors
    /// If the server does not acknowledge the end of the session.
    async fn close(&mut self) -> Result<(), DeliveryError> {
        Ok(())
    }
}

/// Renders templates and submits them over one SMTP session.
///
/// The session is opened on first use (or by [`TemplatedMailer::open`]) and
/// reused for every message until [`Mailer::close`]. After any failure the
/// session is dropped, as its state is unknown.
pub struct TemplatedMailer {
    config: SmtpConfig,
    password: Option<String>,
    templates: Templates,
    session: Option<SmtpClient>,
}

impl std::fmt::Debug for TemplatedMailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplatedMailer")
            .field("server", &self.config.address())
            .field("templates", &self.templates.directory())
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

impl TemplatedMailer {
    /// Without a password the session is not authenticated, which only
    /// suits local relays.
    pub const fn new(config: SmtpConfig, password: Option<String>, templates: Templates) -> Self {
        Self {
            config,
            password,
            templates,
            session: None,
        }
    }

    #[must_use]
    pub const fn templates(&self) -> &Templates {
        &self.templates
    }

    /// Connect, negotiate TLS and authenticate, unless already connected.
    ///
    /// # Errors
    /// [`DeliveryError::Connection`] or [`DeliveryError::Authentication`].
    pub async fn open(&mut self) -> Result<(), DeliveryError> {
        if self.session.is_none() {
            self.session = Some(self.handshake().await?);
        }
        Ok(())
    }

    #[tracing::instrument(level = "debug", skip(self), fields(server = %self.config.address()))]
    async fn handshake(&self) -> Result<SmtpClient, DeliveryError> {
        let config = &self.config;
        let helo = config.helo_domain();

        let mut client = SmtpClient::connect(config)
            .await
            .map_err(DeliveryError::Connection)?;
        client
            .read_greeting()
            .await
            .map_err(DeliveryError::Connection)?;
        client.ehlo(helo).await.map_err(DeliveryError::Connection)?;

        if config.tls == TlsMode::StartTls {
            if !client.capabilities().is_some_and(|c| c.supports("STARTTLS")) {
                return Err(DeliveryError::Connection(ClientError::TlsError(
                    "Server does not offer STARTTLS".to_string(),
                )));
            }
            client.starttls().await.map_err(DeliveryError::Connection)?;
            client.ehlo(helo).await.map_err(DeliveryError::Connection)?;
        }

        if let Some(password) = &self.password {
            client
                .authenticate(config.username(), password)
                .await
                .map_err(|e| match e {
                    ClientError::Rejected { .. } | ClientError::NoAuthMechanism => {
                        DeliveryError::Authentication(e)
                    }
                    other => DeliveryError::Connection(other),
                })?;
            internal!(level = INFO, "Authenticated as {}", config.username());
        }

        Ok(client)
    }

    async fn submit(&mut self, recipient: &str, message: &str) -> Result<(), DeliveryError> {
        self.open().await?;

        let sender = self.config.sender_address.clone();
        let Some(client) = self.session.as_mut() else {
            return Err(DeliveryError::Connection(ClientError::ConnectionClosed));
        };

        let outcome = async {
            client.mail_from(&sender).await?;
            client.rcpt_to(recipient).await?;
            client.data().await?;
            client.send_data(message).await
        }
        .await;

        outcome.map(|_| ()).map_err(|e| match e {
            ClientError::Rejected { .. } => DeliveryError::Rejected {
                recipient: recipient.to_string(),
                source: e,
            },
            other => DeliveryError::Connection(other),
        })
    }
}

#[async_trait]
impl Mailer for TemplatedMailer {
    async fn send(
        &mut self,
        template: &str,
        context: &MailContext,
        recipient: &str,
        subject: &str,
    ) -> Result<(), DeliveryError> {
        let html = self.templates.render(template, context)?;
        let message = MessageBuilder::new()
            .from(&self.config.sender_name, &self.config.sender_address)
            .to(recipient)
            .subject(subject)
            .html_body(html)
            .build()
            .map_err(DeliveryError::Message)?;

        let result = self.submit(recipient, &message).await;
        if result.is_err() {
            self.session = None;
        }
        result
    }

    async fn close(&mut self) -> Result<(), DeliveryError> {
        if let Some(mut client) = self.session.take() {
            client.quit().await.map_err(DeliveryError::Connection)?;
        }
        Ok(())
    }
}
