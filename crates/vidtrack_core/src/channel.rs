//! Lifecycle of the notification channel, independent of any submission.
//!
//! The machine only decides *what* should happen next (connect now, retry
//! after a delay, nothing); the engine owns sockets and timers and reports
//! back. This keeps reconnect behaviour testable without real time.
use std::fmt;
use std::time::Duration;

/// Interval observed between reconnect attempts.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelStatus {
    Connecting,
    Open,
    #[default]
    Closed,
    Reconnecting,
}

impl fmt::Display for ChannelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ChannelStatus::Connecting => "connecting",
            ChannelStatus::Open => "open",
            ChannelStatus::Closed => "closed",
            ChannelStatus::Reconnecting => "reconnecting",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectPolicy {
    Fixed(Duration),
    Exponential { base: Duration, max: Duration },
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        ReconnectPolicy::Fixed(DEFAULT_RECONNECT_DELAY)
    }
}

impl ReconnectPolicy {
    /// Delay before reconnect attempt number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match *self {
            ReconnectPolicy::Fixed(delay) => delay,
            ReconnectPolicy::Exponential { base, max } => {
                let shift = attempt.saturating_sub(1).min(31);
                base.checked_mul(1_u32 << shift)
                    .map_or(max, |delay| delay.min(max))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelAction {
    /// Start a connection attempt with a freshly generated client id.
    Connect,
    /// Arm a single timer; report back through [`ChannelState::on_reconnect_due`].
    ScheduleReconnect { attempt: u32, delay: Duration },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelState {
    status: ChannelStatus,
    attempt: u32,
    reconnect_pending: bool,
    shut_down: bool,
    policy: ReconnectPolicy,
}

impl Default for ChannelState {
    fn default() -> Self {
        Self::new(ReconnectPolicy::default())
    }
}

impl ChannelState {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            status: ChannelStatus::Closed,
            attempt: 0,
            reconnect_pending: false,
            shut_down: false,
            policy,
        }
    }

    pub fn status(&self) -> ChannelStatus {
        self.status
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn reconnect_pending(&self) -> bool {
        self.reconnect_pending
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    /// Begin connecting. Never starts a second attempt while one is
    /// `Connecting` or `Open`.
    pub fn open(&mut self) -> Option<ChannelAction> {
        if matches!(self.status, ChannelStatus::Connecting | ChannelStatus::Open) {
            return None;
        }
        self.shut_down = false;
        self.reconnect_pending = false;
        self.status = ChannelStatus::Connecting;
        Some(ChannelAction::Connect)
    }

    /// The handshake finished. Returns false if the attempt was no longer
    /// wanted (explicit close raced the connect).
    pub fn on_open(&mut self) -> bool {
        if self.shut_down || self.status != ChannelStatus::Connecting {
            return false;
        }
        self.status = ChannelStatus::Open;
        self.attempt = 0;
        true
    }

    /// The socket closed or a connect attempt failed.
    pub fn on_closed(&mut self) -> Option<ChannelAction> {
        if self.shut_down {
            self.status = ChannelStatus::Closed;
            return None;
        }
        if self.reconnect_pending {
            return None;
        }
        self.attempt = self.attempt.saturating_add(1);
        self.status = ChannelStatus::Reconnecting;
        self.reconnect_pending = true;
        Some(ChannelAction::ScheduleReconnect {
            attempt: self.attempt,
            delay: self.policy.delay_for(self.attempt),
        })
    }

    /// The reconnect timer fired.
    pub fn on_reconnect_due(&mut self) -> Option<ChannelAction> {
        if self.shut_down || !self.reconnect_pending {
            return None;
        }
        self.reconnect_pending = false;
        self.status = ChannelStatus::Connecting;
        Some(ChannelAction::Connect)
    }

    /// Explicit, terminal close. Suppresses any pending or future reconnect.
    pub fn close(&mut self) {
        self.shut_down = true;
        self.reconnect_pending = false;
        self.status = ChannelStatus::Closed;
    }
}
