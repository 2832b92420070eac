use serde::Deserialize;
use vidtrack_core::{clamp_percent, NotificationStatus, ProgressNotification, RemoteId};

/// A text frame read off the notification channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Progress(ProgressNotification),
    /// Valid JSON without a `process_id` (echo, keepalive).
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("frame is not JSON: {0}")]
    NotJson(String),
    #[error("progress frame does not match schema: {0}")]
    Schema(String),
}

#[derive(Debug, Deserialize)]
struct WireFrame {
    process_id: String,
    #[serde(default)]
    progress: Option<f64>,
    #[serde(default)]
    status: Option<WireStatus>,
    #[serde(default)]
    download_url: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
enum WireStatus {
    Running,
    Completed,
    Error,
}

/// Decode `{process_id, progress, status, download_url?, message?}`.
///
/// A missing `status` reads as running and a missing `progress` as 0.
pub fn decode_frame(text: &str) -> Result<Frame, FrameError> {
    let value: serde_json::Value =
        serde_json::from_str(text).map_err(|err| FrameError::NotJson(err.to_string()))?;

    match value.get("process_id") {
        None | Some(serde_json::Value::Null) => return Ok(Frame::Other),
        Some(serde_json::Value::String(id)) if id.is_empty() => return Ok(Frame::Other),
        Some(serde_json::Value::String(_)) => {}
        Some(other) => {
            return Err(FrameError::Schema(format!(
                "process_id must be a string, got {other}"
            )))
        }
    }

    let wire: WireFrame =
        serde_json::from_value(value).map_err(|err| FrameError::Schema(err.to_string()))?;
    let status = match wire.status.unwrap_or(WireStatus::Running) {
        WireStatus::Running => NotificationStatus::Running,
        WireStatus::Completed => NotificationStatus::Completed,
        WireStatus::Error => NotificationStatus::Error,
    };

    Ok(Frame::Progress(ProgressNotification {
        remote_id: RemoteId::from(wire.process_id),
        percent: clamp_percent(wire.progress.unwrap_or(0.0)),
        status,
        result_url: wire.download_url.filter(|url| !url.is_empty()),
        message: wire.message,
    }))
}
