//! Error types for wikitex library.

use std::io;
use thiserror::Error;

/// Result type alias for wikitex operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur during export and PDF conversion.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Error writing or reading the package archive.
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// Malformed JSON input (wiki tree or options file).
    #[error("Invalid JSON input: {0}")]
    Json(#[from] serde_json::Error),

    /// An event arrived in a state that does not accept it.
    #[error("Unexpected {event} event while {state}")]
    UnexpectedEvent {
        /// Name of the offending event
        event: &'static str,
        /// Description of the listener state
        state: String,
    },

    /// A reference string could not be resolved to an entity.
    #[error("Cannot resolve reference: {0}")]
    InvalidReference(String),

    /// A block template failed to execute.
    #[error("Template '{template}' failed: {message}")]
    Template {
        /// Key of the failing template
        template: String,
        /// Root cause
        message: String,
    },

    /// Remote resource could not be fetched.
    #[error("Failed to fetch {url}: {message}")]
    Fetch {
        /// The requested URL
        url: String,
        /// Root cause
        message: String,
    },

    /// URL could not be parsed or joined.
    #[error("Malformed URL: {0}")]
    Url(#[from] url::ParseError),

    /// A local compiler process could not be started.
    #[error("Failed to run '{command}': {source}")]
    Spawn {
        /// The command line
        command: String,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The container runtime refused an operation.
    #[error("Container runtime error: {0}")]
    Container(String),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Build a template error from any displayable cause.
    pub fn template(template: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Error::Template {
            template: template.into(),
            message: message.to_string(),
        }
    }

    /// The innermost cause of this error, rendered as text.
    pub fn root_cause(&self) -> String {
        let mut current: &dyn std::error::Error = self;
        while let Some(source) = current.source() {
            current = source;
        }
        current.to_string()
    }
}
