use std::path::{Path, PathBuf};

use anyhow::Context;
use ballot_common::config::Config;

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "BALLOT_CONFIG";

/// Environment variable holding the SMTP password; wins over the file.
pub const PASSWORD_ENV: &str = "BALLOT_SMTP_PASSWORD";

/// Find the configuration file using the following precedence:
/// 1. `--config` on the command line
/// 2. `BALLOT_CONFIG` environment variable
/// 3. ./ballot.config.ron (current working directory)
/// 4. /etc/ballot/ballot.config.ron (system-wide config)
///
/// # Errors
/// If an explicitly named file does not exist, or none of the defaults do.
pub fn find_config_file(
    explicit: Option<&Path>,
    from_env: Option<String>,
) -> anyhow::Result<PathBuf> {
    if let Some(path) = explicit {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
        anyhow::bail!("--config points to non-existent file: {}", path.display());
    }

    if let Some(env_path) = from_env {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        }
        anyhow::bail!(
            "{CONFIG_ENV} points to non-existent file: {}",
            path.display()
        );
    }

    let default_paths = [
        PathBuf::from("./ballot.config.ron"),
        PathBuf::from("/etc/ballot/ballot.config.ron"),
    ];

    if let Some(path) = default_paths.iter().find(|p| p.exists()) {
        return Ok(path.clone());
    }

    let paths_tried = default_paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    anyhow::bail!(
        "No configuration file found. Tried:\n  - {CONFIG_ENV} environment variable\n{paths_tried}"
    )
}

/// Read, parse and validate a RON configuration file.
///
/// # Errors
/// If the file cannot be read, is not valid RON or fails validation.
pub fn load_config(path: &Path) -> anyhow::Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config from {}", path.display()))?;

    let config: Config = ron::from_str(&content)
        .with_context(|| format!("Failed to parse config {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("Invalid config {}", path.display()))?;

    Ok(config)
}
