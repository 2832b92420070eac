#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// User picked (or dropped) a file.
    FileSelected(crate::SelectedFile),
    /// User clicked Upload.
    UploadClicked,
    /// Upload endpoint answered with a process id.
    UploadAccepted {
        local_id: crate::LocalId,
        remote_id: crate::RemoteId,
    },
    /// Upload request failed (status, network or decode).
    UploadRejected {
        local_id: crate::LocalId,
        reason: String,
    },
    /// Decoded progress frame from the notification channel.
    Notification(crate::ProgressNotification),
    /// Channel lifecycle transition.
    ChannelStatusChanged(crate::ChannelStatus),
    /// Channel dropped or failed to connect; a reconnect is already scheduled.
    ChannelFailed { reason: String },
    /// User clicked "start new upload".
    NewUploadClicked,
    /// Fallback for placeholder wiring.
    NoOp,
}
