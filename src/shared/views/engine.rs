//! HTML view rendering using Jinja2 syntax.
//!
//! Templates are compiled into the binary from `templates/views/` so the server does not
//! depend on its working directory.

use minijinja::Environment;
use serde::Serialize;
use thiserror::Error;

/// Embedded view templates as `(name, source)` pairs
const TEMPLATES: &[(&str, &str)] = &[
    ("layout.html", include_str!("../../../templates/views/layout.html")),
    ("index.html", include_str!("../../../templates/views/index.html")),
    ("files.html", include_str!("../../../templates/views/files.html")),
    ("new.html", include_str!("../../../templates/views/new.html")),
    ("import.html", include_str!("../../../templates/views/import.html")),
    ("player.html", include_str!("../../../templates/views/player.html")),
];

/// Errors that can occur during view operations
#[derive(Debug, Error)]
pub enum ViewError {
    #[error("View '{0}' not found")]
    NotFound(String),

    #[error("Failed to render view: {0}")]
    RenderError(String),
}

/// Compiled view templates, shared by all handlers
pub struct Views {
    env: Environment<'static>,
}

impl Views {
    pub fn new() -> Result<Self, ViewError> {
        let mut env = Environment::new();

        for &(name, source) in TEMPLATES {
            env.add_template(name, source)
                .map_err(|e| ViewError::RenderError(format!("{}: {}", name, e)))?;
            tracing::debug!("Loaded view: {}", name);
        }

        Ok(Self { env })
    }

    /// Render a view with any serializable context
    pub fn render<S: Serialize>(&self, name: &str, ctx: S) -> Result<String, ViewError> {
        let template = self
            .env
            .get_template(name)
            .map_err(|_| ViewError::NotFound(name.to_string()))?;

        template
            .render(ctx)
            .map_err(|e| ViewError::RenderError(e.to_string()))
    }
}
