use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("authentication failed ({status}): {body}")]
    Authentication { status: u16, body: String },

    #[error("device returned {status} for {endpoint}: {body}")]
    Device {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("unexpected response from {endpoint}: {body}")]
    UnexpectedResponse { endpoint: String, body: String },

    /// The device accepted the request but affected no record.
    #[error("{0}")]
    EmptyResult(String),

    #[error("invalid argument: {0}")]
    Validation(String),

    #[error("failed to read image {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl DeviceError {
    /// True when the device was never reached.
    pub fn is_transport(&self) -> bool {
        matches!(self, DeviceError::Transport(_))
    }

    /// Raised locally, before any request went out.
    pub fn is_local(&self) -> bool {
        matches!(self, DeviceError::Validation(_) | DeviceError::Io { .. })
    }
}

pub type Result<T> = std::result::Result<T, DeviceError>;
