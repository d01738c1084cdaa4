use thiserror::Error;

use crate::{client::ClientError, template::TemplateError};

/// Failure to hand a token email to the submission server.
///
/// A distribution run stops on the first delivery error; the variants only
/// tell the operator what to fix before re-running.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// Could not open or keep the session (TCP, TLS, greeting, EHLO).
    #[error("Connection to submission server failed: {0}")]
    Connection(#[source] ClientError),

    /// The server refused the credentials or offers no usable mechanism.
    #[error("Authentication failed: {0}")]
    Authentication(#[source] ClientError),

    /// The server refused the envelope or the message for this recipient.
    #[error("Message to {recipient} rejected: {source}")]
    Rejected {
        recipient: String,
        #[source]
        source: ClientError,
    },

    /// The message could not be produced.
    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("Failed to build message: {0}")]
    Message(#[source] ClientError),
}

impl DeliveryError {
    #[must_use]
    pub const fn is_authentication(&self) -> bool {
        matches!(self, Self::Authentication(_))
    }

    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }

    /// The server answered with a 4xx code, so a later re-run may succeed
    /// without any change.
    #[must_use]
    pub const fn is_temporary(&self) -> bool {
        match self {
            Self::Connection(e) | Self::Authentication(e) | Self::Rejected { source: e, .. } => {
                e.is_temporary()
            }
            Self::Template(_) | Self::Message(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        let err = DeliveryError::Rejected {
            recipient: "ann@x.org".to_string(),
            source: ClientError::Rejected {
                command: "RCPT TO",
                code: 451,
                message: "Try later".to_string(),
            },
        };

        assert!(err.is_rejection());
        assert!(err.is_temporary());
        assert!(!err.is_authentication());
        assert_eq!(
            err.to_string(),
            "Message to ann@x.org rejected: RCPT TO rejected: 451 Try later"
        );
    }

    #[test]
    fn test_connection_closed_is_not_temporary() {
        let err = DeliveryError::Connection(ClientError::ConnectionClosed);
        assert!(!err.is_temporary());
    }
}
