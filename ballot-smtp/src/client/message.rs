//! MIME message construction for single-part HTML mail.

use std::fmt::Write;

use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::{DateTime, Utc};

use super::error::{ClientError, Result};

/// RFC 5322 hard limit, excluding CRLF.
const MAX_LINE_LENGTH: usize = 998;

/// Base64 bodies are wrapped at this width.
const BASE64_LINE_LENGTH: usize = 76;

/// Builds an HTML message with the headers a mail client expects.
///
/// `Date` and `Message-ID` are generated at build time unless set explicitly.
///
/// ```
/// use ballot_smtp::client::MessageBuilder;
///
/// let message = MessageBuilder::new()
///     .from("Returning Officer", "ro@example.com")
///     .to("ann@example.com")
///     .subject("Your voting token")
///     .html_body("<p>Hello Ann</p>")
///     .build()
///     .unwrap();
///
/// assert!(message.contains("From: \"Returning Officer\" <ro@example.com>\r\n"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct MessageBuilder {
    from: Option<(String, String)>,
    to: Vec<String>,
    subject: Option<String>,
    date: Option<DateTime<Utc>>,
    message_id: Option<String>,
    headers: Vec<(String, String)>,
    html: Option<String>,
}

impl MessageBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sender display name and address.
    #[must_use]
    pub fn from(mut self, name: impl Into<String>, address: impl Into<String>) -> Self {
        self.from = Some((name.into(), address.into()));
        self
    }

    #[must_use]
    pub fn to(mut self, address: impl Into<String>) -> Self {
        self.to.push(address.into());
        self
    }

    #[must_use]
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    #[must_use]
    pub const fn date(mut self, date: DateTime<Utc>) -> Self {
        self.date = Some(date);
        self
    }

    /// Message-ID without the angle brackets.
    #[must_use]
    pub fn message_id(mut self, id: impl Into<String>) -> Self {
        self.message_id = Some(id.into());
        self
    }

    /// Additional header, emitted after the standard ones in insertion order.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn html_body(mut self, html: impl Into<String>) -> Self {
        self.html = Some(html.into());
        self
    }

    /// Render the message with CRLF line endings.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::BuilderError` if the sender or recipients are
    /// missing, or a header value contains a line break.
    pub fn build(self) -> Result<String> {
        let (name, address) = self
            .from
            .ok_or_else(|| ClientError::BuilderError("Missing sender".to_string()))?;
        if self.to.is_empty() {
            return Err(ClientError::BuilderError("Missing recipient".to_string()));
        }

        let date = self.date.unwrap_or_else(Utc::now);
        let domain = address.rsplit_once('@').map_or("localhost", |(_, d)| d);
        let message_id = self
            .message_id
            .unwrap_or_else(|| format!("{}@{domain}", ulid::Ulid::new()));

        let mut headers = vec![
            ("From".to_string(), format!("{} <{address}>", display_name(&name))),
            ("To".to_string(), self.to.join(", ")),
            (
                "Subject".to_string(),
                encode_word(self.subject.as_deref().unwrap_or_default()),
            ),
            ("Date".to_string(), date.to_rfc2822()),
            ("Message-ID".to_string(), format!("<{message_id}>")),
            ("MIME-Version".to_string(), "1.0".to_string()),
        ];
        headers.extend(self.headers);

        let html = self.html.unwrap_or_default();
        let (encoding, body) = encode_body(&html);
        headers.push((
            "Content-Type".to_string(),
            "text/html; charset=utf-8".to_string(),
        ));
        headers.push(("Content-Transfer-Encoding".to_string(), encoding.to_string()));

        let mut message = String::with_capacity(body.len() + 512);
        for (name, value) in &headers {
            if value.contains(['\r', '\n']) {
                return Err(ClientError::BuilderError(format!(
                    "Header {name} contains a line break"
                )));
            }
            let _ = write!(message, "{name}: {value}\r\n");
        }
        message.push_str("\r\n");
        message.push_str(&body);

        Ok(message)
    }
}

/// `"Name"` with quotes and backslashes escaped, or an encoded word when the
/// name is not ASCII.
fn display_name(name: &str) -> String {
    if name.is_ascii() {
        let escaped = name.replace('\\', "\\\\").replace('"', "\\\"");
        format!("\"{escaped}\"")
    } else {
        encode_word(name)
    }
}

/// RFC 2047 `B` encoding for non-ASCII header text.
fn encode_word(text: &str) -> String {
    if text.is_ascii() {
        text.to_string()
    } else {
        format!("=?utf-8?b?{}?=", STANDARD.encode(text))
    }
}

/// Pick the lightest transfer encoding that keeps the body intact.
fn encode_body(html: &str) -> (&'static str, String) {
    if html.is_ascii() && html.lines().all(|line| line.len() <= MAX_LINE_LENGTH) {
        let mut body = String::with_capacity(html.len() + 64);
        for line in html.lines() {
            body.push_str(line);
            body.push_str("\r\n");
        }
        return ("7bit", body);
    }

    let encoded = STANDARD.encode(html);
    let mut body = String::with_capacity(encoded.len() + encoded.len() / BASE64_LINE_LENGTH * 2 + 2);
    for chunk in encoded.as_bytes().chunks(BASE64_LINE_LENGTH) {
        body.push_str(&String::from_utf8_lossy(chunk));
        body.push_str("\r\n");
    }
    ("base64", body)
}
