use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Which template renders the token email, and its subject line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateConfig {
    #[serde(default = "default_directory")]
    pub directory: PathBuf,
    pub name: String,
    pub subject: String,
}

fn default_directory() -> PathBuf {
    PathBuf::from("templates")
}

impl TemplateConfig {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::MissingField("template.name"));
        }

        if self.subject.trim().is_empty() {
            return Err(ConfigError::MissingField("template.subject"));
        }

        Ok(())
    }
}
