use std::time::Duration;

use engine_logging::{engine_debug, engine_info, engine_warn};
use vidtrack_core::{Effect, Msg};
use vidtrack_engine::{ChannelEvent, EngineEvent, EngineHandle};

use super::ui::render::Renderer;

/// Executes core effects against the engine and the renderer, and turns
/// engine events back into messages.
pub struct EffectRunner {
    engine: EngineHandle,
}

impl EffectRunner {
    pub fn new(engine: EngineHandle) -> Self {
        Self { engine }
    }

    pub fn run(&self, effects: Vec<Effect>, renderer: &mut impl Renderer) {
        for effect in effects {
            match effect {
                Effect::StartUpload { local_id, file } => {
                    engine_info!(
                        "StartUpload local_id={} name={} size={} mime={}",
                        local_id,
                        file.name,
                        file.size,
                        file.mime_type
                    );
                    self.engine.upload(local_id, file);
                }
                Effect::Ui(ui) => renderer.apply(&ui),
                Effect::Toast(toast) => renderer.toast(&toast),
            }
        }
    }

    /// Wait up to `timeout` for the next engine event that maps to a message.
    pub fn next_msg(&self, timeout: Duration) -> Option<Msg> {
        let event = self.engine.recv_timeout(timeout)?;
        translate(event)
    }

    pub fn shutdown(&self) {
        self.engine.close_channel();
    }
}

pub(crate) fn translate(event: EngineEvent) -> Option<Msg> {
    match event {
        EngineEvent::UploadCompleted { local_id, result } => match result {
            Ok(receipt) => {
                if let Some(message) = &receipt.message {
                    engine_debug!("Upload {} server message: {}", local_id, message);
                }
                Some(Msg::UploadAccepted {
                    local_id,
                    remote_id: receipt.remote_id,
                })
            }
            Err(err) => {
                engine_warn!("Upload {} failed: {}", local_id, err);
                Some(Msg::UploadRejected {
                    local_id,
                    reason: err.to_string(),
                })
            }
        },
        EngineEvent::Channel(ChannelEvent::StatusChanged(status)) => {
            Some(Msg::ChannelStatusChanged(status))
        }
        EngineEvent::Channel(ChannelEvent::Notification(notification)) => {
            Some(Msg::Notification(notification))
        }
        EngineEvent::Channel(ChannelEvent::Error(err)) => Some(Msg::ChannelFailed {
            reason: err.to_string(),
        }),
        EngineEvent::Channel(ChannelEvent::ReconnectScheduled { attempt, delay }) => {
            engine_debug!("Reconnect attempt {} in {:?}", attempt, delay);
            None
        }
    }
}
