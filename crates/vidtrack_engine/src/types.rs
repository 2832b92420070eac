use std::fmt;
use std::time::Duration;

use vidtrack_core::{ChannelStatus, LocalId, ProgressNotification, RemoteId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    Channel(ChannelEvent),
    UploadCompleted {
        local_id: LocalId,
        result: Result<UploadReceipt, UploadError>,
    },
}

/// Observer stream for the notification channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    StatusChanged(ChannelStatus),
    ReconnectScheduled { attempt: u32, delay: Duration },
    Notification(ProgressNotification),
    Error(ChannelError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    pub remote_id: RemoteId,
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct UploadError {
    pub kind: UploadFailureKind,
    pub message: String,
}

impl UploadError {
    pub(crate) fn new(kind: UploadFailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadFailureKind {
    InvalidEndpoint,
    InvalidFile,
    Io,
    HttpStatus(u16),
    Timeout,
    Network,
    Malformed,
}

impl fmt::Display for UploadFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadFailureKind::InvalidEndpoint => write!(f, "invalid upload endpoint"),
            UploadFailureKind::InvalidFile => write!(f, "invalid file"),
            UploadFailureKind::Io => write!(f, "could not read file"),
            UploadFailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            UploadFailureKind::Timeout => write!(f, "timeout"),
            UploadFailureKind::Network => write!(f, "network error"),
            UploadFailureKind::Malformed => write!(f, "malformed response"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChannelError {
    #[error("invalid channel address: {0}")]
    InvalidAddress(String),
    #[error("connect failed: {0}")]
    Connect(String),
    #[error("connect timed out after {0:?}")]
    Timeout(Duration),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("closed by server")]
    ClosedByPeer,
}
