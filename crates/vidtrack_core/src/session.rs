use std::collections::VecDeque;
use std::fmt;
use std::path::PathBuf;

use engine_logging::{engine_debug, engine_info};

use crate::{CoreError, NotificationStatus, ProgressNotification};

/// Client-side correlation token, assigned when a file is selected.
pub type LocalId = u64;

/// How many retired server identifiers are remembered for explicit rejection.
pub const RETIRED_CAPACITY: usize = 16;

/// Server-assigned identifier for a submission (`process_id` on the wire).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RemoteId(String);

impl RemoteId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RemoteId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for RemoteId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for RemoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The payload reference for a submission. Only name, size and media type
/// matter to the tracker; `source` is handed through to the uploader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub name: String,
    pub size: u64,
    pub mime_type: String,
    pub source: PathBuf,
}

impl SelectedFile {
    pub fn new(
        name: impl Into<String>,
        size: u64,
        mime_type: impl Into<String>,
        source: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            size,
            mime_type: mime_type.into(),
            source: source.into(),
        }
    }

    pub fn is_video(&self) -> bool {
        self.mime_type
            .trim()
            .to_ascii_lowercase()
            .starts_with("video/")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Selected,
    Uploading,
    AwaitingProgress,
    Processing(u8),
    Completed(String),
    Failed(String),
}

static IDLE: Phase = Phase::Idle;

impl Phase {
    /// Completed and Failed never transition again except through reset or a
    /// new submission.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Completed(_) | Phase::Failed(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Selected => "selected",
            Phase::Uploading => "uploading",
            Phase::AwaitingProgress => "awaiting-progress",
            Phase::Processing(_) => "processing",
            Phase::Completed(_) => "completed",
            Phase::Failed(_) => "failed",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Processing(percent) => write!(f, "processing({percent}%)"),
            Phase::Completed(url) => write!(f, "completed({url})"),
            Phase::Failed(reason) => write!(f, "failed({reason})"),
            other => f.write_str(other.label()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    local_id: LocalId,
    remote_id: Option<RemoteId>,
    phase: Phase,
    file: SelectedFile,
}

impl Submission {
    pub fn local_id(&self) -> LocalId {
        self.local_id
    }

    pub fn remote_id(&self) -> Option<&RemoteId> {
        self.remote_id.as_ref()
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn file(&self) -> &SelectedFile {
        &self.file
    }
}

/// Outcome of matching a notification against the tracked submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accepted(Phase),
    Ignored(IgnoreReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Identifier does not belong to the tracked submission.
    StaleOrForeign,
    /// Identifier belonged to a submission that has since been replaced.
    Retired,
    /// The tracked submission already finished.
    Terminal,
    /// Running progress lower than what is already shown.
    Regressed,
}

impl fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            IgnoreReason::StaleOrForeign => "stale-or-foreign",
            IgnoreReason::Retired => "retired",
            IgnoreReason::Terminal => "terminal",
            IgnoreReason::Regressed => "regressed",
        };
        f.write_str(text)
    }
}

/// Owns the single active submission and decides which notifications apply
/// to it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionTracker {
    active: Option<Submission>,
    retired: VecDeque<RemoteId>,
    next_local_id: LocalId,
}

impl SessionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> Option<&Submission> {
        self.active.as_ref()
    }

    pub fn phase(&self) -> &Phase {
        self.active.as_ref().map_or(&IDLE, |submission| &submission.phase)
    }

    pub fn remote_id(&self) -> Option<&RemoteId> {
        self.active.as_ref().and_then(Submission::remote_id)
    }

    pub fn is_active(&self, local_id: LocalId) -> bool {
        self.active
            .as_ref()
            .is_some_and(|submission| submission.local_id == local_id)
    }

    pub fn is_retired(&self, remote_id: &RemoteId) -> bool {
        self.retired.contains(remote_id)
    }

    /// Replace whatever is tracked with a fresh submission in `Selected`.
    pub fn start_new_submission(&mut self, file: SelectedFile) -> Result<LocalId, CoreError> {
        if !file.is_video() {
            return Err(CoreError::Validation {
                name: file.name,
                mime_type: file.mime_type,
            });
        }

        if let Some(previous) = self.active.take() {
            engine_info!(
                "Retiring submission local_id={} phase={}",
                previous.local_id,
                previous.phase
            );
            if let Some(remote_id) = previous.remote_id {
                self.retire(remote_id);
            }
        }

        self.next_local_id += 1;
        let local_id = self.next_local_id;
        self.active = Some(Submission {
            local_id,
            remote_id: None,
            phase: Phase::Selected,
            file,
        });
        Ok(local_id)
    }

    /// `Selected` -> `Uploading`. Returns what the uploader needs.
    pub fn begin_upload(&mut self) -> Result<(LocalId, SelectedFile), CoreError> {
        let submission = self.expect_phase("begin_upload", |phase| *phase == Phase::Selected)?;
        submission.phase = Phase::Uploading;
        Ok((submission.local_id, submission.file.clone()))
    }

    /// `Uploading` -> `AwaitingProgress`, binding the server identifier.
    pub fn bind_remote_id(&mut self, remote_id: RemoteId) -> Result<Phase, CoreError> {
        let submission = self.expect_phase("bind_remote_id", |phase| *phase == Phase::Uploading)?;
        engine_info!(
            "Bound remote_id={} to local_id={}",
            remote_id,
            submission.local_id
        );
        submission.remote_id = Some(remote_id);
        submission.phase = Phase::AwaitingProgress;
        Ok(submission.phase.clone())
    }

    /// `Uploading` -> `Selected` so the same file can be retried.
    pub fn upload_failed(&mut self) -> Result<Phase, CoreError> {
        let submission = self.expect_phase("upload_failed", |phase| *phase == Phase::Uploading)?;
        submission.phase = Phase::Selected;
        Ok(submission.phase.clone())
    }

    pub fn apply_notification(
        &mut self,
        notification: &ProgressNotification,
    ) -> Result<Verdict, CoreError> {
        let Some(submission) = self
            .active
            .as_mut()
            .filter(|submission| submission.remote_id.as_ref() == Some(&notification.remote_id))
        else {
            let reason = if self.retired.contains(&notification.remote_id) {
                IgnoreReason::Retired
            } else {
                IgnoreReason::StaleOrForeign
            };
            return Ok(Verdict::Ignored(reason));
        };

        if submission.phase.is_terminal() {
            return Ok(Verdict::Ignored(IgnoreReason::Terminal));
        }

        let next = match notification.status {
            NotificationStatus::Running => {
                if let Phase::Processing(current) = submission.phase {
                    if notification.percent < current {
                        return Ok(Verdict::Ignored(IgnoreReason::Regressed));
                    }
                }
                Phase::Processing(notification.percent)
            }
            NotificationStatus::Completed => match &notification.result_url {
                Some(url) => Phase::Completed(url.clone()),
                None => {
                    return Err(CoreError::Malformed {
                        remote_id: notification.remote_id.to_string(),
                        status: notification.status.as_str(),
                        field: "download_url",
                    });
                }
            },
            NotificationStatus::Error => Phase::Failed(
                notification
                    .message
                    .clone()
                    .filter(|message| !message.trim().is_empty())
                    .unwrap_or_else(|| "unknown".to_string()),
            ),
        };

        submission.phase = next.clone();
        Ok(Verdict::Accepted(next))
    }

    /// Back to `Idle`; no identifier is tracked or remembered afterwards.
    pub fn reset(&mut self) {
        if let Some(previous) = self.active.take() {
            engine_debug!("Reset from phase={}", previous.phase);
        }
        self.retired.clear();
    }

    /// Remember an identifier whose notifications must be rejected.
    pub fn retire(&mut self, remote_id: RemoteId) {
        if self.retired.contains(&remote_id) {
            return;
        }
        if self.retired.len() == RETIRED_CAPACITY {
            self.retired.pop_front();
        }
        self.retired.push_back(remote_id);
    }

    fn expect_phase(
        &mut self,
        operation: &'static str,
        allowed: impl Fn(&Phase) -> bool,
    ) -> Result<&mut Submission, CoreError> {
        match self.active.as_mut() {
            Some(submission) if allowed(&submission.phase) => Ok(submission),
            Some(submission) => Err(CoreError::State {
                operation,
                phase: submission.phase.to_string(),
            }),
            None => Err(CoreError::State {
                operation,
                phase: Phase::Idle.to_string(),
            }),
        }
    }
}
