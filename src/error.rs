//! Errors raised while opening, reading or writing the product document.

use std::path::{Path, PathBuf};

/// Things that can go wrong with the product document or a product body.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Reading, writing or renaming the document at `path` failed.
    Io {
        /// File the operation was touching.
        path: PathBuf,
        /// What the OS reported.
        message: String,
    },
    /// JSON that is not a product: a document that is not an array of
    /// objects, or a request body that is not an object.
    Malformed(String),
    /// Bad store configuration (empty path, zero flush interval).
    Config(String),
}

impl Error {
    pub(crate) fn io(path: &Path, err: std::io::Error) -> Self {
        Error::Io {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }

    /// The file involved, for I/O failures.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Error::Io { path, .. } => Some(path),
            _ => None,
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io { path, message } => write!(f, "{}: {message}", path.display()),
            Error::Malformed(msg) => write!(f, "malformed products: {msg}"),
            Error::Config(msg) => write!(f, "config error: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Malformed(err.to_string())
    }
}

/// Result alias using our [`Error`] type.
pub type Result<T> = std::result::Result<T, Error>;
