#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::{path::PathBuf, time::Duration};

use ballot_common::config::{Config, TlsMode};
use pretty_assertions::assert_eq;

const MINIMAL: &str = r#"
Ballot (
    smtp: (
        host: "smtp.example.org",
        sender_address: "ro@example.org",
        sender_name: "Returning Officer",
    ),
    template: (
        name: "token.html.j2",
        subject: "Your voting token",
    ),
)
"#;

#[test]
fn test_minimal_config_uses_defaults() {
    let config: Config = ron::from_str(MINIMAL).unwrap();

    assert_eq!(config.smtp.port, 465);
    assert_eq!(config.smtp.tls, TlsMode::Implicit);
    assert_eq!(config.template.directory, PathBuf::from("templates"));
    assert_eq!(config.campaign.checkpoint, PathBuf::from("sent.txt"));
    assert_eq!(config.campaign.ledger, PathBuf::from("tokens.txt"));
    assert_eq!(config.campaign.iterations, 100_000);
    assert_eq!(config.campaign.send_interval(), Duration::from_secs(2));
    assert!(config.validate().is_ok());
}

#[test]
fn test_full_config() {
    let config: Config = ron::from_str(
        r#"
Ballot (
    smtp: (
        host: "relay.local",
        port: 2525,
        tls: Plain,
        username: Some("ballot"),
        password: Some("hunter2"),
        sender_address: "ro@example.org",
        sender_name: "Returning Officer",
        helo_domain: Some("ballot.example.org"),
        timeouts: (command_secs: 5),
    ),
    template: (
        directory: "/srv/ballot/templates",
        name: "token.html.j2",
        subject: "Your voting token",
    ),
    campaign: (
        checkpoint: "/srv/ballot/sent.txt",
        ledger: "/srv/ballot/tokens.txt",
        send_interval_ms: 500,
        iterations: 200000,
    ),
)
"#,
    )
    .unwrap();

    assert_eq!(config.smtp.address(), "relay.local:2525");
    assert_eq!(config.smtp.tls, TlsMode::Plain);
    assert_eq!(config.smtp.username(), "ballot");
    assert_eq!(config.smtp.helo_domain(), "ballot.example.org");
    assert_eq!(config.smtp.timeouts.command(), Duration::from_secs(5));
    assert_eq!(config.smtp.timeouts.connect(), Duration::from_secs(30));
    assert_eq!(config.campaign.send_interval(), Duration::from_millis(500));
    assert!(config.validate().is_ok());
}

#[test]
fn test_invalid_sender_is_rejected() {
    let config: Config = ron::from_str(&MINIMAL.replace("ro@example.org", "nobody")).unwrap();
    let err = config.validate().unwrap_err();

    assert!(err.to_string().contains("smtp.sender_address"));
}
