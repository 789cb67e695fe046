use std::io;
use std::path::PathBuf;

use drive_core::DriveError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("remote path doesn't exist: {0}")]
    NotFound(String),
    #[error("transport error: {0}")]
    Transport(#[from] DriveError),
    #[error("cannot create or modify the root: {0:?}")]
    CannotModifyRoot(String),
    #[error("cannot open local content source {path:?}: {source}")]
    MissingSource {
        path: Option<PathBuf>,
        #[source]
        source: io::Error,
    },
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid timestamp from store: {0}")]
    Time(#[from] time::error::Parse),
    #[error("cannot format timestamp: {0}")]
    TimeFormat(#[from] time::error::Format),
}

impl RemoteError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RemoteError::NotFound(_))
    }

    /// True for rate limiting and transient store failures. Nothing here
    /// retries; callers decide whether to.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RemoteError::Transport(err) if err.is_retryable())
    }

    /// 404 from a get-by-id becomes `NotFound`; everything else stays a transport error.
    pub(crate) fn from_lookup(err: DriveError, what: &str) -> Self {
        if err.is_not_found() {
            RemoteError::NotFound(what.to_string())
        } else {
            RemoteError::Transport(err)
        }
    }
}
