//! Scriptable SMTP submission server for client and mailer tests.
#![allow(dead_code)] // Not every test binary uses every knob.

use std::{
    fmt::Write,
    net::SocketAddr,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use base64::{Engine, engine::general_purpose::STANDARD};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::{TcpListener, TcpStream},
    sync::RwLock,
    time::timeout,
};

/// What the server saw, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SmtpCommand {
    Ehlo(String),
    Auth {
        mechanism: String,
        username: String,
        password: String,
    },
    MailFrom(String),
    RcptTo(String),
    Data,
    /// Message lines between DATA and the final dot, CRLF preserved.
    MessageContent(String),
    Quit,
    StartTls,
    Other(String),
}

#[derive(Debug, Clone)]
struct Reply {
    code: u16,
    message: String,
}

impl Reply {
    fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    fn to_bytes(&self) -> Vec<u8> {
        format!("{} {}\r\n", self.code, self.message).into_bytes()
    }
}

#[derive(Debug, Clone)]
struct MockServerConfig {
    greeting: Reply,
    capabilities: Vec<String>,
    auth: Reply,
    mail_from: Reply,
    rcpt_to: Reply,
    /// `(nth message, reply)`; other messages get `data_end`.
    data_end_override: Option<(usize, Reply)>,
    data_end: Reply,
    response_delay: Option<Duration>,
    drop_after_commands: Option<usize>,
}

impl Default for MockServerConfig {
    fn default() -> Self {
        Self {
            greeting: Reply::new(220, "mock.test ESMTP ready"),
            capabilities: vec![
                "mock.test".to_string(),
                "SIZE 10000000".to_string(),
                "AUTH PLAIN LOGIN".to_string(),
            ],
            auth: Reply::new(235, "2.7.0 Authentication successful"),
            mail_from: Reply::new(250, "2.1.0 OK"),
            rcpt_to: Reply::new(250, "2.1.5 OK"),
            data_end_override: None,
            data_end: Reply::new(250, "2.0.0 Queued"),
            response_delay: None,
            drop_after_commands: None,
        }
    }
}

#[derive(Debug, Default)]
struct Shared {
    commands: RwLock<Vec<SmtpCommand>>,
    connections: AtomicUsize,
    messages: AtomicUsize,
}

pub struct MockSmtpServer {
    addr: SocketAddr,
    shared: Arc<Shared>,
    shutdown: Arc<AtomicBool>,
}

impl MockSmtpServer {
    #[must_use]
    pub fn builder() -> MockSmtpServerBuilder {
        MockSmtpServerBuilder {
            config: MockServerConfig::default(),
        }
    }

    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub async fn commands(&self) -> Vec<SmtpCommand> {
        self.shared.commands.read().await.clone()
    }

    /// Message bodies accepted so far.
    pub async fn messages(&self) -> Vec<String> {
        self.commands()
            .await
            .into_iter()
            .filter_map(|c| match c {
                SmtpCommand::MessageContent(body) => Some(body),
                _ => None,
            })
            .collect()
    }

    #[must_use]
    pub fn connections(&self) -> usize {
        self.shared.connections.load(Ordering::Relaxed)
    }

    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    async fn record(shared: &Shared, command: SmtpCommand) {
        shared.commands.write().await.push(command);
    }

    #[allow(clippy::too_many_lines)]
    async fn handle_client(
        mut stream: TcpStream,
        config: Arc<MockServerConfig>,
        shared: Arc<Shared>,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let (reader, mut writer) = stream.split();
        let mut reader = BufReader::new(reader);
        let mut line = String::new();
        let mut handled = 0;

        writer.write_all(&config.greeting.to_bytes()).await?;
        if config.greeting.code != 220 {
            return Ok(());
        }

        loop {
            if config.drop_after_commands.is_some_and(|n| handled >= n) {
                return Ok(());
            }

            line.clear();
            let Ok(read) = timeout(Duration::from_secs(10), reader.read_line(&mut line)).await
            else {
                return Ok(());
            };
            if read? == 0 {
                return Ok(());
            }
            handled += 1;

            let cmd_line = line.trim_end().to_string();
            let (verb, arg) = cmd_line
                .split_once(' ')
                .map_or((cmd_line.as_str(), ""), |(v, a)| (v, a));

            if let Some(delay) = config.response_delay {
                tokio::time::sleep(delay).await;
            }

            let reply = match verb.to_ascii_uppercase().as_str() {
                "EHLO" => {
                    Self::record(&shared, SmtpCommand::Ehlo(arg.to_string())).await;
                    let mut reply = String::new();
                    let last = config.capabilities.len().saturating_sub(1);
                    for (i, cap) in config.capabilities.iter().enumerate() {
                        let sep = if i == last { ' ' } else { '-' };
                        let _ = write!(reply, "250{sep}{cap}\r\n");
                    }
                    reply.into_bytes()
                }
                "AUTH" => {
                    let (mechanism, initial) =
                        arg.split_once(' ').map_or((arg, None), |(m, i)| (m, Some(i)));
                    let mechanism = mechanism.to_ascii_uppercase();

                    let (username, password) = if mechanism == "PLAIN" {
                        let decoded = String::from_utf8(STANDARD.decode(initial.unwrap_or(""))?)?;
                        let mut parts = decoded.split('\0').skip(1);
                        (
                            parts.next().unwrap_or_default().to_string(),
                            parts.next().unwrap_or_default().to_string(),
                        )
                    } else {
                        let mut answers = Vec::new();
                        for prompt in ["VXNlcm5hbWU6", "UGFzc3dvcmQ6"] {
                            writer.write_all(format!("334 {prompt}\r\n").as_bytes()).await?;
                            line.clear();
                            reader.read_line(&mut line).await?;
                            answers.push(String::from_utf8(STANDARD.decode(line.trim_end())?)?);
                        }
                        (answers.remove(0), answers.remove(0))
                    };

                    Self::record(
                        &shared,
                        SmtpCommand::Auth {
                            mechanism,
                            username,
                            password,
                        },
                    )
                    .await;
                    config.auth.to_bytes()
                }
                "MAIL" => {
                    Self::record(&shared, SmtpCommand::MailFrom(arg.to_string())).await;
                    config.mail_from.to_bytes()
                }
                "RCPT" => {
                    Self::record(&shared, SmtpCommand::RcptTo(arg.to_string())).await;
                    config.rcpt_to.to_bytes()
                }
                "DATA" => {
                    Self::record(&shared, SmtpCommand::Data).await;
                    writer
                        .write_all(&Reply::new(354, "End data with <CR><LF>.<CR><LF>").to_bytes())
                        .await?;

                    let mut content = String::new();
                    loop {
                        line.clear();
                        if reader.read_line(&mut line).await? == 0 {
                            return Ok(());
                        }
                        if line == ".\r\n" {
                            break;
                        }
                        content.push_str(&line);
                    }
                    Self::record(&shared, SmtpCommand::MessageContent(content)).await;

                    let nth = shared.messages.fetch_add(1, Ordering::Relaxed);
                    match &config.data_end_override {
                        Some((n, reply)) if *n == nth => reply.to_bytes(),
                        _ => config.data_end.to_bytes(),
                    }
                }
                "STARTTLS" => {
                    Self::record(&shared, SmtpCommand::StartTls).await;
                    Reply::new(454, "TLS not available").to_bytes()
                }
                "QUIT" => {
                    Self::record(&shared, SmtpCommand::Quit).await;
                    writer.write_all(&Reply::new(221, "Bye").to_bytes()).await?;
                    return Ok(());
                }
                _ => {
                    Self::record(&shared, SmtpCommand::Other(cmd_line.clone())).await;
                    Reply::new(500, "Unknown command").to_bytes()
                }
            };

            writer.write_all(&reply).await?;
            writer.flush().await?;
        }
    }
}

pub struct MockSmtpServerBuilder {
    config: MockServerConfig,
}

impl MockSmtpServerBuilder {
    #[must_use]
    pub fn with_greeting(mut self, code: u16, message: impl Into<String>) -> Self {
        self.config.greeting = Reply::new(code, message);
        self
    }

    /// Lines after the first of the EHLO reply.
    #[must_use]
    pub fn with_capabilities(mut self, capabilities: &[&str]) -> Self {
        self.config.capabilities.truncate(1);
        self.config
            .capabilities
            .extend(capabilities.iter().map(ToString::to_string));
        self
    }

    #[must_use]
    pub fn with_auth_response(mut self, code: u16, message: impl Into<String>) -> Self {
        self.config.auth = Reply::new(code, message);
        self
    }

    #[must_use]
    pub fn with_mail_from_response(mut self, code: u16, message: impl Into<String>) -> Self {
        self.config.mail_from = Reply::new(code, message);
        self
    }

    #[must_use]
    pub fn with_rcpt_to_response(mut self, code: u16, message: impl Into<String>) -> Self {
        self.config.rcpt_to = Reply::new(code, message);
        self
    }

    /// Reply to the `nth` message (0-indexed) with a different code.
    #[must_use]
    pub fn with_data_end_response_for(
        mut self,
        nth: usize,
        code: u16,
        message: impl Into<String>,
    ) -> Self {
        self.config.data_end_override = Some((nth, Reply::new(code, message)));
        self
    }

    #[must_use]
    pub const fn with_response_delay(mut self, delay: Duration) -> Self {
        self.config.response_delay = Some(delay);
        self
    }

    /// Close the connection without a reply once `count` commands were handled.
    #[must_use]
    pub const fn with_network_error_after_commands(mut self, count: usize) -> Self {
        self.config.drop_after_commands = Some(count);
        self
    }

    /// Bind to a random local port and start accepting connections.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot be bound.
    pub async fn build(self) -> Result<MockSmtpServer, std::io::Error> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let config = Arc::new(self.config);
        let shared = Arc::new(Shared::default());
        let shutdown = Arc::new(AtomicBool::new(false));

        let accept_shared = Arc::clone(&shared);
        let accept_shutdown = Arc::clone(&shutdown);
        tokio::spawn(async move {
            while !accept_shutdown.load(Ordering::Relaxed) {
                let Ok(Ok((stream, _))) =
                    timeout(Duration::from_millis(100), listener.accept()).await
                else {
                    continue;
                };

                accept_shared.connections.fetch_add(1, Ordering::Relaxed);
                let config = Arc::clone(&config);
                let shared = Arc::clone(&accept_shared);
                tokio::spawn(async move {
                    if let Err(e) = MockSmtpServer::handle_client(stream, config, shared).await {
                        eprintln!("Mock server client error: {e}");
                    }
                });
            }
        });

        Ok(MockSmtpServer {
            addr,
            shared,
            shutdown,
        })
    }
}
