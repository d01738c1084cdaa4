//! Jinja-style templates for the token email.

use std::path::{Path, PathBuf};

use minijinja::{Environment, ErrorKind};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Template {name} not found in {}", directory.display())]
    NotFound { name: String, directory: PathBuf },

    #[error("Failed to render template {name}: {source}")]
    Render {
        name: String,
        #[source]
        source: minijinja::Error,
    },
}

/// Templates loaded lazily from one directory.
///
/// Files ending in `.html` are auto-escaped, so a recipient
/// name cannot inject markup.
#[derive(Debug)]
pub struct Templates {
    directory: PathBuf,
    env: Environment<'static>,
}

impl Templates {
    pub fn from_directory(directory: impl Into<PathBuf>) -> Self {
        let directory = directory.into();
        let mut env = Environment::new();
        env.set_loader(minijinja::path_loader(&directory));

        Self { directory, env }
    }

    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Load and compile `name` without rendering it.
    ///
    /// # Errors
    /// If the template does not exist or does not compile.
    pub fn check(&self, name: &str) -> Result<(), TemplateError> {
        self.env
            .get_template(name)
            .map(|_| ())
            .map_err(|e| self.error(name, e))
    }

    /// # Errors
    /// If the template is missing, does not compile or fails to render.
    pub fn render(&self, name: &str, context: impl Serialize) -> Result<String, TemplateError> {
        self.env
            .get_template(name)
            .and_then(|template| template.render(context))
            .map_err(|e| self.error(name, e))
    }

    fn error(&self, name: &str, source: minijinja::Error) -> TemplateError {
        if source.kind() == ErrorKind::TemplateNotFound {
            TemplateError::NotFound {
                name: name.to_string(),
                directory: self.directory.clone(),
            }
        } else {
            TemplateError::Render {
                name: name.to_string(),
                source,
            }
        }
    }
}
