use std::io;
use std::process::ExitCode;
use std::time::Instant;

use anyhow::Context;
use engine_logging::{engine_debug, engine_info, engine_warn, LogDestination};
use log::LevelFilter;
use vidtrack_core::{update, AppState, AppViewModel, ChannelStatus, Msg, Phase};
use vidtrack_engine::EngineHandle;

use super::cli::Cli;
use super::config::load_config;
use super::effects::EffectRunner;
use super::files::selected_file;
use super::ui::constants::EVENT_POLL_INTERVAL;
use super::ui::render::{Renderer, TerminalRenderer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Success,
    Failure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    /// Keep pumping engine events.
    Wait,
    /// Click Upload.
    Upload,
    Exit(Outcome),
}

/// What the command line driver does next, given the current view. The
/// upload starts once the notification channel is open, so no progress
/// frame for the new process can be missed.
fn next_step(view: &AppViewModel, upload_requested: bool) -> Step {
    match &view.phase {
        Phase::Idle => Step::Exit(Outcome::Failure),
        Phase::Selected if upload_requested => Step::Exit(Outcome::Failure),
        Phase::Selected if view.channel == ChannelStatus::Open => Step::Upload,
        Phase::Selected => Step::Wait,
        Phase::Uploading | Phase::AwaitingProgress | Phase::Processing(_) => Step::Wait,
        Phase::Completed(_) => Step::Exit(Outcome::Success),
        Phase::Failed(_) => Step::Exit(Outcome::Failure),
    }
}

struct Dispatcher<R: Renderer> {
    state: AppState,
    runner: EffectRunner,
    renderer: R,
}

impl<R: Renderer> Dispatcher<R> {
    fn dispatch(&mut self, msg: Msg) {
        engine_debug!("Dispatch {:?}", msg);
        let state = std::mem::take(&mut self.state);
        let (mut state, effects) = update(state, msg);
        if state.consume_dirty() {
            self.renderer.channel(state.channel());
        }
        self.state = state;
        self.runner.run(effects, &mut self.renderer);
    }

    fn pump(&mut self) {
        if let Some(msg) = self.runner.next_msg(EVENT_POLL_INTERVAL) {
            self.dispatch(msg);
        }
        self.renderer.tick(Instant::now());
    }
}

pub fn run_app(cli: Cli) -> anyhow::Result<ExitCode> {
    let mut config = load_config(cli.config.as_deref())?;
    if let Some(server) = &cli.server {
        config.server = server.to_string();
    }

    let (destination, level) = if cli.verbose {
        (LogDestination::Both, LevelFilter::Debug)
    } else {
        (config.log.into(), config.log_level.into())
    };
    engine_logging::initialize(destination, level, config.log_file.as_deref());
    engine_info!("vidtrack starting against {}", config.server);

    let server = config.server_url()?;
    let engine_config = config.engine_config()?;
    let file = selected_file(&cli.video, cli.mime.as_deref())
        .with_context(|| format!("cannot read {}", cli.video.display()))?;

    let engine = EngineHandle::new(engine_config).context("cannot start engine runtime")?;
    let mut dispatcher = Dispatcher {
        state: AppState::new(),
        runner: EffectRunner::new(engine),
        renderer: TerminalRenderer::new(io::stdout(), server),
    };
    dispatcher.dispatch(Msg::FileSelected(file));

    let mut upload_requested = false;
    let outcome = loop {
        match next_step(&dispatcher.state.view(), upload_requested) {
            Step::Wait => dispatcher.pump(),
            Step::Upload => {
                upload_requested = true;
                dispatcher.dispatch(Msg::UploadClicked);
            }
            Step::Exit(outcome) => break outcome,
        }
    };

    dispatcher.runner.shutdown();
    match outcome {
        Outcome::Success => {
            engine_info!("Processing completed");
            Ok(ExitCode::SUCCESS)
        }
        Outcome::Failure => {
            engine_warn!(
                "Exiting in phase {}",
                dispatcher.state.view().phase.label()
            );
            Ok(ExitCode::FAILURE)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use vidtrack_core::RemoteId;

    fn view(phase: Phase, channel: ChannelStatus) -> AppViewModel {
        AppViewModel {
            phase,
            channel,
            file_name: Some("demo.mp4".to_string()),
            remote_id: None,
            dirty: false,
        }
    }

    #[test]
    fn upload_waits_for_open_channel() {
        assert_eq!(
            next_step(&view(Phase::Selected, ChannelStatus::Connecting), false),
            Step::Wait
        );
        assert_eq!(
            next_step(&view(Phase::Selected, ChannelStatus::Open), false),
            Step::Upload
        );
    }

    #[test]
    fn rejected_upload_ends_the_run() {
        assert_eq!(
            next_step(&view(Phase::Selected, ChannelStatus::Open), true),
            Step::Exit(Outcome::Failure)
        );
    }

    #[test]
    fn in_flight_phases_keep_waiting_through_reconnects() {
        let mut awaiting = view(Phase::AwaitingProgress, ChannelStatus::Reconnecting);
        awaiting.remote_id = Some(RemoteId::from("abc123"));
        assert_eq!(next_step(&awaiting, true), Step::Wait);
        assert_eq!(
            next_step(&view(Phase::Processing(42), ChannelStatus::Open), true),
            Step::Wait
        );
        assert_eq!(
            next_step(&view(Phase::Uploading, ChannelStatus::Closed), true),
            Step::Wait
        );
    }

    #[test]
    fn terminal_phases_map_to_exit_codes() {
        assert_eq!(
            next_step(
                &view(Phase::Completed("/media/out.mp4".to_string()), ChannelStatus::Open),
                true
            ),
            Step::Exit(Outcome::Success)
        );
        assert_eq!(
            next_step(&view(Phase::Failed("boom".to_string()), ChannelStatus::Open), true),
            Step::Exit(Outcome::Failure)
        );
        assert_eq!(
            next_step(&view(Phase::Idle, ChannelStatus::Open), false),
            Step::Exit(Outcome::Failure)
        );
    }
}
