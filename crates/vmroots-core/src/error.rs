//! Error types for vmroots-core

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CoreError>;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("IO error on {path}: {source}")]
    PathIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid guest id: {0}")]
    InvalidGuestId(String),
}

impl CoreError {
    /// Attach the offending path to an I/O error
    pub fn at(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CoreError::PathIo {
            path: path.into(),
            source,
        }
    }
}
