use engine_logging::{engine_debug, engine_info, engine_warn};

use crate::{project, Effect, Phase, ProgressNotification, SessionTracker, Toast, Verdict};

/// Apply one notification to the tracker and derive what to show.
///
/// Relevance is decided entirely by [`SessionTracker::apply_notification`];
/// an ignored or malformed notification yields no effects.
pub fn reconcile(tracker: &mut SessionTracker, notification: &ProgressNotification) -> Vec<Effect> {
    let phase = match tracker.apply_notification(notification) {
        Ok(Verdict::Accepted(phase)) => phase,
        Ok(Verdict::Ignored(reason)) => {
            engine_debug!(
                "Ignored {} notification for {}: {}",
                notification.status.as_str(),
                notification.remote_id,
                reason
            );
            return Vec::new();
        }
        Err(err) => {
            engine_warn!("Dropping malformed notification: {}", err);
            return Vec::new();
        }
    };

    let file = tracker.active().map(|submission| submission.file());
    let mut effects = vec![Effect::Ui(project(&phase, file))];
    match &phase {
        Phase::Completed(url) => {
            engine_info!("Processing finished for {}: {}", notification.remote_id, url);
            effects.push(Effect::Toast(Toast::info(
                "Processing completed successfully!",
            )));
        }
        Phase::Failed(reason) => {
            engine_warn!("Processing failed for {}: {}", notification.remote_id, reason);
            effects.push(Effect::Toast(Toast::error(format!(
                "Processing error: {reason}"
            ))));
        }
        _ => {}
    }
    effects
}
