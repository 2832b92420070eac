use std::io::Write;
use std::time::Instant;

use chrono::Local;
use engine_logging::engine_warn;
use url::Url;
use vidtrack_core::{ChannelStatus, ScreenView, Section, Severity, Toast, UiEffect};

use super::constants::{PROGRESS_BAR_WIDTH, TOAST_DURATION};

pub trait Renderer {
    fn apply(&mut self, effect: &UiEffect);
    fn toast(&mut self, toast: &Toast);
    fn channel(&mut self, status: ChannelStatus);
    /// Expire toasts whose display time has passed.
    fn tick(&mut self, now: Instant);
}

struct ActiveToast {
    toast: Toast,
    shown_at: String,
    expires_at: Instant,
}

/// Line-oriented renderer. The status line is the screen plus the newest
/// live toast, and is written only when its text changes.
pub struct TerminalRenderer<W: Write> {
    out: W,
    server: Url,
    screen: ScreenView,
    last_line: Option<String>,
    channel: ChannelStatus,
    toasts: Vec<ActiveToast>,
}

impl<W: Write> TerminalRenderer<W> {
    pub fn new(out: W, server: Url) -> Self {
        Self {
            out,
            server,
            screen: ScreenView::default(),
            last_line: None,
            channel: ChannelStatus::Closed,
            toasts: Vec::new(),
        }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }

    fn status_line(&self) -> String {
        let screen = render_screen(&self.screen, &self.server);
        match self.toasts.last() {
            Some(active) => format!(
                "{screen}  [{}] {}: {}",
                active.shown_at,
                severity_label(active.toast.severity),
                active.toast.message
            ),
            None => screen,
        }
    }

    fn redraw(&mut self) {
        let line = self.status_line();
        if self.last_line.as_deref() != Some(line.as_str()) {
            self.write_line(&line);
            self.last_line = Some(line);
        }
    }

    fn write_line(&mut self, line: &str) {
        if let Err(err) = writeln!(self.out, "{line}") {
            engine_warn!("Terminal write failed: {}", err);
        }
    }
}

impl<W: Write> Renderer for TerminalRenderer<W> {
    fn apply(&mut self, effect: &UiEffect) {
        self.screen.apply(effect);
        self.redraw();
    }

    fn toast(&mut self, toast: &Toast) {
        self.toasts.push(ActiveToast {
            toast: toast.clone(),
            shown_at: Local::now().format("%H:%M:%S").to_string(),
            expires_at: Instant::now() + TOAST_DURATION,
        });
        self.redraw();
    }

    fn channel(&mut self, status: ChannelStatus) {
        if self.channel == status {
            return;
        }
        self.channel = status;
        self.write_line(&format!("channel: {status}"));
    }

    fn tick(&mut self, now: Instant) {
        let before = self.toasts.len();
        self.toasts.retain(|active| active.expires_at > now);
        if self.toasts.len() != before {
            self.redraw();
        }
    }
}

fn severity_label(severity: Severity) -> &'static str {
    match severity {
        Severity::Info => "info",
        Severity::Error => "error",
    }
}

pub fn render_screen(screen: &ScreenView, server: &Url) -> String {
    let file = match (&screen.file_name, &screen.file_size) {
        (Some(name), Some(size)) => format!("{name} ({size})"),
        (Some(name), None) => name.clone(),
        _ => String::new(),
    };
    match screen.section {
        Section::Upload => "Select a video file to upload.".to_string(),
        Section::Selected => format!("Selected: {file}"),
        Section::Processing => format!(
            "Processing {file} {} {}%",
            progress_bar(screen.percent),
            screen.percent
        ),
        Section::Result => {
            let url = screen
                .result_url
                .as_deref()
                .map(|url| resolve_result_url(server, url))
                .unwrap_or_default();
            format!("Done: {url}")
        }
        Section::Error => format!(
            "Failed: {}",
            screen.error.as_deref().unwrap_or("unknown error")
        ),
    }
}

fn progress_bar(percent: u8) -> String {
    let filled = usize::from(percent.min(100)) * PROGRESS_BAR_WIDTH / 100;
    format!(
        "[{}{}]",
        "#".repeat(filled),
        "-".repeat(PROGRESS_BAR_WIDTH - filled)
    )
}

/// Server-relative result paths are resolved against the server base.
pub fn resolve_result_url(server: &Url, url: &str) -> String {
    match server.join(url) {
        Ok(resolved) => resolved.to_string(),
        Err(_) => url.to_string(),
    }
}
