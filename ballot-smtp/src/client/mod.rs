//! Minimal SMTP submission client.
//!
//! Supports:
//!
//! - Plain TCP, implicit TLS and STARTTLS connections
//! - `AUTH PLAIN` and `AUTH LOGIN`
//! - Per-command timeouts
//! - MIME message construction for HTML bodies
//!
//! ```no_run
//! use ballot_common::config::SmtpConfig;
//! use ballot_smtp::client::{MessageBuilder, SmtpClient};
//!
//! # async fn example(config: &SmtpConfig) -> Result<(), Box<dyn std::error::Error>> {
//! let mut client = SmtpClient::connect(config).await?;
//! client.read_greeting().await?;
//! client.ehlo("client.example.com").await?;
//! client.authenticate("user", "secret").await?;
//!
//! let message = MessageBuilder::new()
//!     .from("Returning Officer", "ro@example.com")
//!     .to("ann@example.com")
//!     .subject("Your voting token")
//!     .html_body("<p>Hello</p>")
//!     .build()?;
//!
//! client.mail_from("ro@example.com").await?;
//! client.rcpt_to("ann@example.com").await?;
//! client.data().await?;
//! client.send_data(&message).await?;
//! client.quit().await?;
//! # Ok(())
//! # }
//! ```

mod error;
mod message;
mod response;
mod smtp_client;

pub use error::{ClientError, Result};
pub use message::MessageBuilder;
pub use response::{Response, ResponseLine};
pub use smtp_client::{AuthMechanism, SmtpClient};
