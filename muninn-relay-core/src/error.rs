use thiserror::Error;

/// Errors that can occur while configuring or activating the receiver.
///
/// Per-frame and per-dispatch failures are not represented here: they are
/// logged and do not abort a capture (see [`crate::controller`]).
#[derive(Error, Debug)]
pub enum ReceiverError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Capture source error: {0}")]
    Capture(String),

    #[error("Unsupported datalink type: {0}")]
    InvalidDatalink(String),
}

pub type Result<T> = std::result::Result<T, ReceiverError>;

impl From<pcap::Error> for ReceiverError {
    fn from(e: pcap::Error) -> Self {
        ReceiverError::Capture(e.to_string())
    }
}

impl From<nix::errno::Errno> for ReceiverError {
    fn from(e: nix::errno::Errno) -> Self {
        ReceiverError::Capture(e.to_string())
    }
}
