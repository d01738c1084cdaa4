//! Outbound mail for ballot.
//!
//! [`client::SmtpClient`] speaks SMTP submission over plain TCP, implicit TLS
//! or STARTTLS. [`TemplatedMailer`] sits on top of it, rendering a template
//! per recipient and delivering it over a single authenticated session.

pub mod client;
mod error;
pub mod mailer;
pub mod template;

pub use error::DeliveryError;
pub use mailer::{MailContext, Mailer, TemplatedMailer};
pub use template::{TemplateError, Templates};
