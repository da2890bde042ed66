//! Error types for ferry-endpoint.

use std::io;

use thiserror::Error;

use crate::data::Protocol;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{protocol} requires a {expected} credential")]
    AuthenticationRequired {
        protocol: Protocol,
        expected: &'static str,
    },

    #[error("{0} session used before initialize")]
    NotInitialized(Protocol),

    #[error("invalid URI: {0}")]
    InvalidUri(String),

    #[error("unsupported URI scheme: {0}")]
    UnsupportedScheme(String),

    #[error("cannot open {path} for reading: {reason}")]
    TapConstruction { path: String, reason: String },

    #[error("cannot open {path} for writing: {reason}")]
    DrainConstruction { path: String, reason: String },

    #[error("write to {path} failed: {reason}")]
    SliceWrite { path: String, reason: String },

    #[error("{0} endpoints are read-only")]
    ReadOnly(Protocol),

    #[error("{protocol} does not support {operation}")]
    Unsupported {
        protocol:  Protocol,
        operation: &'static str,
    },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("remote API error ({status}): {message}")]
    Remote { status: u16, message: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    pub(crate) fn tap(path: impl Into<String>, reason: impl ToString) -> Self {
        Error::TapConstruction {
            path:   path.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn drain(path: impl Into<String>, reason: impl ToString) -> Self {
        Error::DrainConstruction {
            path:   path.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn write(path: impl Into<String>, reason: impl ToString) -> Self {
        Error::SliceWrite {
            path:   path.into(),
            reason: reason.to_string(),
        }
    }

    /// True for per-file setup failures that a multi-file transfer can skip.
    pub fn is_construction(&self) -> bool {
        matches!(
            self,
            Error::TapConstruction { .. } | Error::DrainConstruction { .. }
        )
    }
}

#[cfg(feature = "reqwest")]
impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => Error::Remote {
                status:  status.as_u16(),
                message: e.to_string(),
            },
            None => Error::Network(e.to_string()),
        }
    }
}

impl From<url::ParseError> for Error {
    fn from(e: url::ParseError) -> Self { Error::InvalidUri(e.to_string()) }
}

pub type Result<T> = std::result::Result<T, Error>;
