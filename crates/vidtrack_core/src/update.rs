use engine_logging::{engine_debug, engine_error, engine_info, engine_warn};

use crate::reconcile::reconcile;
use crate::{
    project, AppState, ChannelStatus, CoreError, Effect, Msg, Phase, Toast, UiEffect,
};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::FileSelected(file) => match state.tracker_mut().start_new_submission(file) {
            Ok(local_id) => {
                engine_info!("Selected new submission local_id={}", local_id);
                state.mark_dirty();
                vec![Effect::Ui(current_view(&state))]
            }
            Err(err) => {
                engine_warn!("Rejected file selection: {}", err);
                vec![Effect::Toast(Toast::error(
                    "Please select a valid video file.",
                ))]
            }
        },
        Msg::UploadClicked => match state.tracker_mut().begin_upload() {
            Ok((local_id, file)) => {
                engine_info!(
                    "Uploading local_id={} name={} size={}",
                    local_id,
                    file.name,
                    file.size
                );
                state.mark_dirty();
                vec![
                    Effect::Ui(UiEffect::ShowUploading),
                    Effect::StartUpload { local_id, file },
                ]
            }
            Err(_) if *state.tracker().phase() == Phase::Idle => {
                vec![Effect::Toast(Toast::error("No file selected."))]
            }
            Err(err) => {
                log_state_error(&err);
                Vec::new()
            }
        },
        Msg::UploadAccepted {
            local_id,
            remote_id,
        } => {
            if !state.tracker().is_active(local_id) {
                engine_debug!(
                    "Discarding late upload result local_id={} remote_id={}",
                    local_id,
                    remote_id
                );
                state.tracker_mut().retire(remote_id);
                return (state, Vec::new());
            }
            match state.tracker_mut().bind_remote_id(remote_id) {
                Ok(phase) => {
                    state.mark_dirty();
                    vec![
                        Effect::Ui(project(&phase, None)),
                        Effect::Toast(Toast::info("File uploaded. Processing started.")),
                    ]
                }
                Err(err) => {
                    log_state_error(&err);
                    Vec::new()
                }
            }
        }
        Msg::UploadRejected { local_id, reason } => {
            if !state.tracker().is_active(local_id) {
                engine_debug!(
                    "Discarding late upload failure local_id={}: {}",
                    local_id,
                    reason
                );
                return (state, Vec::new());
            }
            match state.tracker_mut().upload_failed() {
                Ok(_) => {
                    engine_warn!("Upload failed local_id={}: {}", local_id, reason);
                    state.mark_dirty();
                    vec![
                        Effect::Ui(current_view(&state)),
                        Effect::Toast(Toast::error(format!("Error: {reason}"))),
                    ]
                }
                Err(err) => {
                    log_state_error(&err);
                    Vec::new()
                }
            }
        }
        Msg::Notification(notification) => {
            let effects = reconcile(state.tracker_mut(), &notification);
            if !effects.is_empty() {
                state.mark_dirty();
            }
            effects
        }
        Msg::ChannelStatusChanged(status) => {
            state.set_channel(status);
            Vec::new()
        }
        Msg::ChannelFailed { reason } => {
            // Only a drop from a live channel is news; failed retries are logged.
            if state.channel() == ChannelStatus::Open {
                vec![Effect::Toast(Toast::error(format!(
                    "Connection lost ({reason}). Reconnecting..."
                )))]
            } else {
                engine_debug!("Channel still down: {}", reason);
                Vec::new()
            }
        }
        Msg::NewUploadClicked => {
            state.tracker_mut().reset();
            state.mark_dirty();
            vec![Effect::Ui(UiEffect::ShowIdle)]
        }
        Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

fn current_view(state: &AppState) -> UiEffect {
    let tracker = state.tracker();
    project(
        tracker.phase(),
        tracker.active().map(|submission| submission.file()),
    )
}

fn log_state_error(err: &CoreError) {
    engine_error!("Ignoring out-of-order command: {}", err);
}
