//! SMTP submission client over plain TCP, implicit TLS or STARTTLS.

use std::{future::Future, sync::Arc, time::Duration};

use ballot_common::{
    config::{ClientTimeouts, SmtpConfig, TlsMode},
    incoming, outgoing,
};
use base64::{Engine, engine::general_purpose::STANDARD};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
};
use tokio_rustls::{
    TlsConnector,
    rustls::{
        ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme,
        client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier},
        pki_types::{CertificateDer, ServerName, UnixTime},
    },
};

use super::{
    error::{ClientError, Result},
    response::Response,
};

const BUFFER_SIZE: usize = 4096;

/// Upper bound on a single reply; anything larger is not a submission server.
const MAX_BUFFER_SIZE: usize = 64 * 1024;

/// Supported `AUTH` mechanisms, in order of preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMechanism {
    Plain,
    Login,
}

impl AuthMechanism {
    /// Pick a mechanism from those advertised in EHLO.
    ///
    /// Servers that advertise nothing get `PLAIN`, which is what most
    /// submission servers accept after TLS.
    #[must_use]
    pub fn negotiate(advertised: &[String]) -> Option<Self> {
        if advertised.is_empty() || advertised.iter().any(|m| m == "PLAIN") {
            Some(Self::Plain)
        } else if advertised.iter().any(|m| m == "LOGIN") {
            Some(Self::Login)
        } else {
            None
        }
    }
}

enum ClientConnection {
    Plain(TcpStream),
    Tls(Box<tokio_rustls::client::TlsStream<TcpStream>>),
}

impl ClientConnection {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        match self {
            Self::Plain(stream) => stream.write_all(data).await?,
            Self::Tls(stream) => {
                stream.write_all(data).await?;
                stream.flush().await?;
            }
        }
        Ok(())
    }

    async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let n = match self {
            Self::Plain(stream) => stream.read(buf).await?,
            Self::Tls(stream) => stream.read(buf).await?,
        };
        if n == 0 {
            return Err(ClientError::ConnectionClosed);
        }
        Ok(n)
    }

    async fn into_tls(self, domain: &str, accept_invalid_certs: bool) -> Result<Self> {
        match self {
            Self::Plain(stream) => {
                let server_name = ServerName::try_from(domain.to_string())
                    .map_err(|e| ClientError::TlsError(format!("Invalid domain: {e}")))?;

                let stream = connector(accept_invalid_certs)?
                    .connect(server_name, stream)
                    .await
                    .map_err(|e| ClientError::TlsError(e.to_string()))?;

                Ok(Self::Tls(Box::new(stream)))
            }
            Self::Tls(_) => Err(ClientError::TlsError(
                "Connection is already TLS".to_string(),
            )),
        }
    }
}

fn connector(accept_invalid_certs: bool) -> Result<TlsConnector> {
    let mut roots = RootCertStore::empty();

    let certs = rustls_native_certs::load_native_certs();
    for cert in certs.certs {
        roots
            .add(cert)
            .map_err(|e| ClientError::TlsError(format!("Failed to add certificate: {e}")))?;
    }
    if !certs.errors.is_empty() {
        tracing::warn!(errors = ?certs.errors, "Some system certificates could not be loaded");
    }

    let mut config = ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();

    if accept_invalid_certs {
        config
            .dangerous()
            .set_certificate_verifier(Arc::new(NoVerifier));
    }

    Ok(TlsConnector::from(Arc::new(config)))
}

/// Accepts any certificate. Only reachable through `accept_invalid_certs`.
#[derive(Debug)]
struct NoVerifier;

impl ServerCertVerifier for NoVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, tokio_rustls::rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, tokio_rustls::rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, tokio_rustls::rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        vec![
            SignatureScheme::RSA_PKCS1_SHA256,
            SignatureScheme::RSA_PSS_SHA256,
            SignatureScheme::ECDSA_NISTP256_SHA256,
            SignatureScheme::ED25519,
        ]
    }
}

async fn within<T>(
    limit: Duration,
    stage: &'static str,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| ClientError::Timeout(stage))?
}

/// One SMTP session.
///
/// Every method that expects a particular reply class returns
/// [`ClientError::Rejected`] when the server answers otherwise, so callers can
/// chain commands with `?`.
pub struct SmtpClient {
    connection: Option<ClientConnection>,
    buffer: Vec<u8>,
    buffer_pos: usize,
    server_domain: String,
    accept_invalid_certs: bool,
    timeouts: ClientTimeouts,
    capabilities: Option<Response>,
}

impl std::fmt::Debug for SmtpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpClient")
            .field("server_domain", &self.server_domain)
            .field("tls", &self.is_tls())
            .field("open", &self.connection.is_some())
            .finish_non_exhaustive()
    }
}

impl SmtpClient {
    /// Open a connection to the configured server.
    ///
    /// With [`TlsMode::Implicit`] the TLS handshake happens here; with
    /// [`TlsMode::StartTls`] the caller upgrades after EHLO.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection or TLS handshake fails or times out.
    pub async fn connect(config: &SmtpConfig) -> Result<Self> {
        let address = config.address();
        let timeouts = config.timeouts;

        let connection = within(timeouts.connect(), "connection", async {
            let stream = TcpStream::connect(&address).await?;
            let connection = ClientConnection::Plain(stream);

            if config.tls == TlsMode::Implicit {
                connection
                    .into_tls(&config.host, config.accept_invalid_certs)
                    .await
            } else {
                Ok(connection)
            }
        })
        .await?;

        tracing::debug!(%address, tls = ?config.tls, "Connected to submission server");

        Ok(Self {
            connection: Some(connection),
            buffer: vec![0u8; BUFFER_SIZE],
            buffer_pos: 0,
            server_domain: config.host.clone(),
            accept_invalid_certs: config.accept_invalid_certs,
            timeouts,
            capabilities: None,
        })
    }

    #[must_use]
    pub const fn is_tls(&self) -> bool {
        matches!(self.connection, Some(ClientConnection::Tls(_)))
    }

    /// Read the `220` greeting.
    ///
    /// # Errors
    ///
    /// Returns an error if reading fails or the server refuses the session.
    pub async fn read_greeting(&mut self) -> Result<Response> {
        let limit = self.timeouts.command();
        let response = within(limit, "greeting", self.read_response()).await?;
        expect("greeting", response, |r| r.code == 220)
    }

    /// Send a command line and read the reply, whatever its code.
    ///
    /// # Errors
    ///
    /// Returns an error if sending or reading fails.
    pub async fn command(&mut self, command: &str) -> Result<Response> {
        outgoing!("{command}");
        self.exchange(command, "reply").await
    }

    async fn exchange(&mut self, line: &str, stage: &'static str) -> Result<Response> {
        let limit = self.timeouts.command();
        within(limit, stage, async {
            self.send_line(line).await?;
            self.read_response().await
        })
        .await
    }

    async fn send_line(&mut self, line: &str) -> Result<()> {
        self.connection
            .as_mut()
            .ok_or(ClientError::ConnectionClosed)?
            .send(format!("{line}\r\n").as_bytes())
            .await
    }

    /// Send EHLO and remember the advertised extensions.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails or is rejected.
    pub async fn ehlo(&mut self, domain: &str) -> Result<Response> {
        let response = self.command(&format!("EHLO {domain}")).await?;
        let response = expect("EHLO", response, Response::is_success)?;
        self.capabilities = Some(response.clone());
        Ok(response)
    }

    /// Extensions from the most recent EHLO, if any.
    #[must_use]
    pub const fn capabilities(&self) -> Option<&Response> {
        self.capabilities.as_ref()
    }

    /// Send STARTTLS and upgrade the connection.
    ///
    /// The caller must send EHLO again afterwards.
    ///
    /// # Errors
    ///
    /// Returns an error if the server refuses or the handshake fails.
    pub async fn starttls(&mut self) -> Result<Response> {
        let response = self.command("STARTTLS").await?;
        let response = expect("STARTTLS", response, |r| r.code == 220)?;

        let connection = self
            .connection
            .take()
            .ok_or(ClientError::ConnectionClosed)?;
        let limit = self.timeouts.connect();
        let upgraded = within(
            limit,
            "TLS handshake",
            connection.into_tls(&self.server_domain, self.accept_invalid_certs),
        )
        .await?;

        self.connection = Some(upgraded);
        self.buffer_pos = 0;
        self.capabilities = None;

        Ok(response)
    }

    /// Authenticate with the best mechanism the server advertised.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NoAuthMechanism`] if no shared mechanism exists,
    /// or [`ClientError::Rejected`] if the credentials are refused.
    pub async fn authenticate(&mut self, username: &str, password: &str) -> Result<Response> {
        let advertised = self
            .capabilities
            .as_ref()
            .map(Response::auth_mechanisms)
            .unwrap_or_default();

        match AuthMechanism::negotiate(&advertised) {
            Some(AuthMechanism::Plain) => self.auth_plain(username, password).await,
            Some(AuthMechanism::Login) => self.auth_login(username, password).await,
            None => Err(ClientError::NoAuthMechanism),
        }
    }

    /// `AUTH PLAIN` with an initial response.
    ///
    /// # Errors
    ///
    /// Returns an error if the exchange fails or the server refuses it.
    pub async fn auth_plain(&mut self, username: &str, password: &str) -> Result<Response> {
        let credentials = STANDARD.encode(format!("\0{username}\0{password}"));

        outgoing!("AUTH PLAIN ****");
        let response = self
            .exchange(&format!("AUTH PLAIN {credentials}"), "AUTH")
            .await?;
        expect("AUTH", response, |r| r.code == 235)
    }

    /// `AUTH LOGIN`, username and password as separate challenges.
    ///
    /// # Errors
    ///
    /// Returns an error if the exchange fails or the server refuses it.
    pub async fn auth_login(&mut self, username: &str, password: &str) -> Result<Response> {
        let response = self.command("AUTH LOGIN").await?;
        expect("AUTH", response, Response::is_auth_challenge)?;

        outgoing!("<username>");
        let response = self.exchange(&STANDARD.encode(username), "AUTH").await?;
        expect("AUTH", response, Response::is_auth_challenge)?;

        outgoing!("<password>");
        let response = self.exchange(&STANDARD.encode(password), "AUTH").await?;
        expect("AUTH", response, |r| r.code == 235)
    }

    /// # Errors
    ///
    /// Returns an error if the command fails or is rejected.
    pub async fn mail_from(&mut self, from: &str) -> Result<Response> {
        let response = self.command(&format!("MAIL FROM:<{from}>")).await?;
        expect("MAIL FROM", response, Response::is_success)
    }

    /// # Errors
    ///
    /// Returns an error if the command fails or is rejected.
    pub async fn rcpt_to(&mut self, to: &str) -> Result<Response> {
        let response = self.command(&format!("RCPT TO:<{to}>")).await?;
        expect("RCPT TO", response, Response::is_success)
    }

    /// # Errors
    ///
    /// Returns an error if the command fails or the server does not answer 354.
    pub async fn data(&mut self) -> Result<Response> {
        let response = self.command("DATA").await?;
        expect("DATA", response, |r| r.code == 354)
    }

    /// Transmit the message, dot-stuffed and CRLF-terminated, followed by the
    /// end-of-data marker.
    ///
    /// # Errors
    ///
    /// Returns an error if sending fails or the server does not accept the
    /// message.
    pub async fn send_data(&mut self, message: &str) -> Result<Response> {
        let payload = dot_stuff(message);
        let limit = self.timeouts.data();

        outgoing!("<{} bytes of message data>", payload.len());
        let response = within(limit, "end of data", async {
            self.connection
                .as_mut()
                .ok_or(ClientError::ConnectionClosed)?
                .send(payload.as_bytes())
                .await?;
            self.read_response().await
        })
        .await?;

        expect("message", response, Response::is_success)
    }

    /// Send QUIT and drop the connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn quit(&mut self) -> Result<Response> {
        let response = self.command("QUIT").await;
        self.connection = None;
        response
    }

    async fn read_response(&mut self) -> Result<Response> {
        loop {
            if let Some((response, consumed)) =
                Response::parse_response(&self.buffer[..self.buffer_pos])?
            {
                self.buffer.copy_within(consumed..self.buffer_pos, 0);
                self.buffer_pos -= consumed;

                incoming!("{} {}", response.code, response.message());
                return Ok(response);
            }

            if self.buffer_pos >= self.buffer.len() {
                let new_size = self.buffer.len() * 2;
                if new_size > MAX_BUFFER_SIZE {
                    return Err(ClientError::ParseError(format!(
                        "Response too large (exceeds {MAX_BUFFER_SIZE} bytes)"
                    )));
                }
                self.buffer.resize(new_size, 0);
            }

            let n = self
                .connection
                .as_mut()
                .ok_or(ClientError::ConnectionClosed)?
                .read(&mut self.buffer[self.buffer_pos..])
                .await?;
            self.buffer_pos += n;
        }
    }
}

fn expect(
    command: &'static str,
    response: Response,
    accept: impl FnOnce(&Response) -> bool,
) -> Result<Response> {
    if accept(&response) {
        Ok(response)
    } else {
        Err(ClientError::Rejected {
            command,
            code: response.code,
            message: response.message(),
        })
    }
}

/// Normalise line endings to CRLF, double leading dots and append the
/// `.` terminator.
fn dot_stuff(message: &str) -> String {
    let mut out = String::with_capacity(message.len() + 16);

    for line in message.lines() {
        if line.starts_with('.') {
            out.push('.');
        }
        out.push_str(line);
        out.push_str("\r\n");
    }
    out.push_str(".\r\n");

    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_dot_stuffing() {
        assert_eq!(
            dot_stuff("Subject: x\n\n.hidden\r\nlast"),
            "Subject: x\r\n\r\n..hidden\r\nlast\r\n.\r\n"
        );
    }

    #[test]
    fn test_dot_stuffing_empty_body() {
        assert_eq!(dot_stuff(""), ".\r\n");
    }

    #[test]
    fn test_negotiate_prefers_plain() {
        let advertised = vec!["LOGIN".to_string(), "PLAIN".to_string()];
        assert_eq!(
            AuthMechanism::negotiate(&advertised),
            Some(AuthMechanism::Plain)
        );
    }

    #[test]
    fn test_negotiate_login_only() {
        assert_eq!(
            AuthMechanism::negotiate(&["LOGIN".to_string()]),
            Some(AuthMechanism::Login)
        );
    }

    #[test]
    fn test_negotiate_unsupported() {
        assert_eq!(AuthMechanism::negotiate(&["XOAUTH2".to_string()]), None);
    }

    #[test]
    fn test_rejection_classification() {
        let err = expect("RCPT TO", Response::new(550, vec!["no".to_string()]), |r| {
            r.is_success()
        })
        .unwrap_err();

        assert!(err.is_permanent());
        assert!(!err.is_temporary());
        assert_eq!(err.to_string(), "RCPT TO rejected: 550 no");
    }
}
