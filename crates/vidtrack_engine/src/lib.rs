//! Vidtrack engine: upload client, notification channel and effect execution.
mod channel;
mod engine;
mod frame;
mod sink;
mod types;
mod upload;

pub use channel::{
    channel_address, time_based_client_id, ChannelSettings, ClientIdSource, Connection,
    NotificationChannel, Sleeper, TokioSleeper, Transport, TungsteniteTransport,
    OUTBOUND_CAPACITY,
};
pub use engine::{EngineConfig, EngineHandle};
pub use frame::{decode_frame, Frame, FrameError};
pub use sink::{ChannelEventSink, EventSink};
pub use types::{
    ChannelError, ChannelEvent, EngineEvent, UploadError, UploadFailureKind, UploadReceipt,
};
pub use upload::{ReqwestUploader, UploadSettings, Uploader};
