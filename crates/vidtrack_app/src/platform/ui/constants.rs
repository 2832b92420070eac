use std::time::Duration;

pub const PROGRESS_BAR_WIDTH: usize = 30;
pub const TOAST_DURATION: Duration = Duration::from_secs(5);
pub const EVENT_POLL_INTERVAL: Duration = Duration::from_millis(75);
