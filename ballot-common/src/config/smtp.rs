//! SMTP submission settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// How the connection to the submission server is secured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TlsMode {
    /// TLS from the first byte (SMTPS, usually port 465).
    #[default]
    Implicit,

    /// Plain connection upgraded with STARTTLS (usually port 587).
    StartTls,

    /// No TLS at all.
    ///
    /// **WARNING**: credentials travel in clear text. Only for local relays
    /// and tests.
    Plain,
}

/// Client-side timeouts for the submission session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientTimeouts {
    /// Timeout for establishing the TCP (and TLS) connection.
    ///
    /// Default: 30 seconds
    #[serde(default = "defaults::connect_secs")]
    pub connect_secs: u64,

    /// Timeout for each command/response exchange.
    ///
    /// Default: 60 seconds
    #[serde(default = "defaults::command_secs")]
    pub command_secs: u64,

    /// Timeout for the message transfer and final dot.
    ///
    /// Default: 120 seconds
    #[serde(default = "defaults::data_secs")]
    pub data_secs: u64,
}

impl Default for ClientTimeouts {
    fn default() -> Self {
        Self {
            connect_secs: defaults::connect_secs(),
            command_secs: defaults::command_secs(),
            data_secs: defaults::data_secs(),
        }
    }
}

impl ClientTimeouts {
    pub const fn connect(&self) -> Duration {
        Duration::from_secs(self.connect_secs)
    }

    pub const fn command(&self) -> Duration {
        Duration::from_secs(self.command_secs)
    }

    pub const fn data(&self) -> Duration {
        Duration::from_secs(self.data_secs)
    }
}

/// Submission server, credentials and sender identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmtpConfig {
    pub host: String,

    #[serde(default = "defaults::port")]
    pub port: u16,

    #[serde(default)]
    pub tls: TlsMode,

    /// Login name; the sender address is used when omitted.
    #[serde(default)]
    pub username: Option<String>,

    /// Prefer `BALLOT_SMTP_PASSWORD` over storing this in the file.
    #[serde(default)]
    pub password: Option<String>,

    pub sender_address: String,

    pub sender_name: String,

    /// Name announced in EHLO. Defaults to the sender address domain.
    #[serde(default)]
    pub helo_domain: Option<String>,

    /// **SECURITY WARNING**: disables certificate validation.
    #[serde(default)]
    pub accept_invalid_certs: bool,

    #[serde(default)]
    pub timeouts: ClientTimeouts,
}

impl SmtpConfig {
    /// `host:port` as passed to the TCP connector.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    #[must_use]
    pub fn username(&self) -> &str {
        self.username.as_deref().unwrap_or(&self.sender_address)
    }

    #[must_use]
    pub fn helo_domain(&self) -> &str {
        self.helo_domain.as_deref().unwrap_or_else(|| {
            self.sender_address
                .rsplit_once('@')
                .map_or("localhost", |(_, domain)| domain)
        })
    }

    /// Pick the password, letting the environment override the file.
    ///
    /// # Errors
    /// Returns [`ConfigError::MissingField`] when neither source has one.
    pub fn resolve_password(&self, from_env: Option<String>) -> Result<String, ConfigError> {
        from_env
            .filter(|p| !p.is_empty())
            .or_else(|| self.password.clone())
            .ok_or(ConfigError::MissingField("smtp.password"))
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::MissingField("smtp.host"));
        }

        if self.port == 0 {
            return Err(ConfigError::Invalid {
                field: "smtp.port",
                reason: "must be between 1-65535".to_string(),
            });
        }

        if !self.sender_address.contains('@') {
            return Err(ConfigError::Invalid {
                field: "smtp.sender_address",
                reason: format!("'{}' is not an email address", self.sender_address),
            });
        }

        Ok(())
    }
}

mod defaults {
    pub const fn port() -> u16 {
        465
    }

    pub const fn connect_secs() -> u64 {
        30
    }

    pub const fn command_secs() -> u64 {
        60
    }

    pub const fn data_secs() -> u64 {
        120
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn config() -> SmtpConfig {
        SmtpConfig {
            host: "smtp.example.org".to_string(),
            port: 465,
            tls: TlsMode::Implicit,
            username: None,
            password: Some("from-file".to_string()),
            sender_address: "ro@example.org".to_string(),
            sender_name: "Returning Officer".to_string(),
            helo_domain: None,
            accept_invalid_certs: false,
            timeouts: ClientTimeouts::default(),
        }
    }

    #[test]
    fn test_username_defaults_to_sender() {
        assert_eq!(config().username(), "ro@example.org");
    }

    #[test]
    fn test_helo_domain_from_sender() {
        assert_eq!(config().helo_domain(), "example.org");
    }

    #[test]
    fn test_env_password_takes_precedence() {
        let config = config();
        assert_eq!(
            config.resolve_password(Some("from-env".to_string())).unwrap(),
            "from-env"
        );
        assert_eq!(config.resolve_password(None).unwrap(), "from-file");
        assert_eq!(
            config.resolve_password(Some(String::new())).unwrap(),
            "from-file"
        );
    }

    #[test]
    fn test_missing_password() {
        let mut config = config();
        config.password = None;
        assert!(matches!(
            config.resolve_password(None),
            Err(ConfigError::MissingField("smtp.password"))
        ));
    }

    #[test]
    fn test_rejects_port_zero() {
        let mut config = config();
        config.port = 0;
        assert!(config.validate().is_err());
    }
}
