use crate::view_model::AppViewModel;
use crate::{ChannelStatus, SessionTracker};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppState {
    tracker: SessionTracker,
    channel: ChannelStatus,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> AppViewModel {
        AppViewModel {
            phase: self.tracker.phase().clone(),
            channel: self.channel,
            file_name: self
                .tracker
                .active()
                .map(|submission| submission.file().name.clone()),
            remote_id: self.tracker.remote_id().cloned(),
            dirty: self.dirty,
        }
    }

    pub fn tracker(&self) -> &SessionTracker {
        &self.tracker
    }

    pub fn channel(&self) -> ChannelStatus {
        self.channel
    }

    /// Returns whether anything changed since the last call, and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn tracker_mut(&mut self) -> &mut SessionTracker {
        &mut self.tracker
    }

    pub(crate) fn set_channel(&mut self, status: ChannelStatus) {
        if self.channel != status {
            self.channel = status;
            self.dirty = true;
        }
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }
}
