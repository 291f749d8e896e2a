use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while loading sources and synthesizing schemas
#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to read {}: {source}", path.display())]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error in {}: {message}", file.display())]
    ParseError { file: PathBuf, message: String },

    #[error("Invalid package pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// A named type whose declaration is not part of the loaded model
    #[error("Unresolved type: {0}")]
    UnresolvedType(String),
}

impl Error {
    pub fn parse(file: impl Into<PathBuf>, err: &syn::Error) -> Self {
        Error::ParseError {
            file: file.into(),
            message: err.to_string(),
        }
    }
}
