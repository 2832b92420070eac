use crate::RemoteId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NotificationStatus {
    #[default]
    Running,
    Completed,
    Error,
}

impl NotificationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationStatus::Running => "running",
            NotificationStatus::Completed => "completed",
            NotificationStatus::Error => "error",
        }
    }
}

/// A decoded progress frame for one server-side process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressNotification {
    pub remote_id: RemoteId,
    pub percent: u8,
    pub status: NotificationStatus,
    pub result_url: Option<String>,
    pub message: Option<String>,
}

impl ProgressNotification {
    pub fn running(remote_id: impl Into<RemoteId>, percent: u8) -> Self {
        Self {
            remote_id: remote_id.into(),
            percent: percent.min(100),
            status: NotificationStatus::Running,
            result_url: None,
            message: None,
        }
    }

    pub fn completed(remote_id: impl Into<RemoteId>, result_url: Option<String>) -> Self {
        Self {
            remote_id: remote_id.into(),
            percent: 100,
            status: NotificationStatus::Completed,
            result_url,
            message: None,
        }
    }

    pub fn error(remote_id: impl Into<RemoteId>, message: Option<String>) -> Self {
        Self {
            remote_id: remote_id.into(),
            percent: 0,
            status: NotificationStatus::Error,
            result_url: None,
            message,
        }
    }
}

/// Round a raw wire progress value into 0..=100. Non-finite input reads as 0.
pub fn clamp_percent(raw: f64) -> u8 {
    if !raw.is_finite() {
        return 0;
    }
    raw.round().clamp(0.0, 100.0) as u8
}
