use std::path::PathBuf;
use std::time::Duration;

/// Errors raised while building, storing or sending a segment.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Session {0} does not exist.")]
    SessionNotFound(u32),

    #[error("segment has no payload; set one before sending")]
    MissingPayload,

    #[error("could not connect to {target}: {source}")]
    ConnectionFailure {
        target: String,
        #[source]
        source: std::io::Error,
    },

    #[error("connecting to {target} timed out after {timeout:?}")]
    ConnectTimeout { target: String, timeout: Duration },

    #[error("sending segment timed out after {timeout:?}")]
    SendTimeout { timeout: Duration },

    #[error("session store {path} unavailable: {source}")]
    StoreUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("session store {path} is corrupt: {source}")]
    StoreCorrupt {
        path: PathBuf,
        #[source]
        source: bincode::error::DecodeError,
    },

    #[error("could not encode sessions: {0}")]
    StoreEncode(#[from] bincode::error::EncodeError),

    #[error("invalid value {value:?} for {field}")]
    InvalidFieldValue { field: &'static str, value: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
