//! Vidtrack core: pure submission/channel state machines and view-model helpers.
mod channel;
mod effect;
mod error;
mod msg;
mod notification;
mod reconcile;
mod session;
mod state;
mod update;
mod view_model;

pub use channel::{
    ChannelAction, ChannelState, ChannelStatus, ReconnectPolicy, DEFAULT_RECONNECT_DELAY,
};
pub use effect::{Effect, Severity, Toast};
pub use error::CoreError;
pub use msg::Msg;
pub use notification::{clamp_percent, NotificationStatus, ProgressNotification};
pub use reconcile::reconcile;
pub use session::{
    IgnoreReason, LocalId, Phase, RemoteId, SelectedFile, SessionTracker, Submission, Verdict,
    RETIRED_CAPACITY,
};
pub use state::AppState;
pub use update::update;
pub use view_model::{format_file_size, project, AppViewModel, ScreenView, Section, UiEffect};
