//! Connect/reconnect/heartbeat state machine (spec §4.4). Kept separate
//! from the actual socket so the backoff/grace/timeout arithmetic is
//! unit-testable without a live TCP peer; `host::mod` drives the socket
//! and calls into this machine to decide when to (re)connect.

use std::time::{Duration, Instant};

const BACKOFF_BASE: Duration = Duration::from_millis(800);
const BACKOFF_FACTOR: u32 = 2;
const MAX_AUTO_RETRIES: u32 = 5;
const GRACE_PERIOD: Duration = Duration::from_secs(8);
const DELAYED_AFTER: Duration = Duration::from_secs(15);
const TIMEOUT_AFTER: Duration = Duration::from_secs(45);
const FORCED_DISCONNECT_TIMEOUTS: u32 = 10;
const FORCED_RECONNECT_WAIT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatStatus {
    Ok,
    Delayed,
    Timeout,
}

pub struct Supervisor {
    state: ConnectionState,
    retry_count: u32,
    user_initiated: bool,
    next_attempt_at: Option<Instant>,
    grace_until: Option<Instant>,
    last_heartbeat: Option<Instant>,
    consecutive_timeouts: u32,
}

impl Supervisor {
    pub fn new() -> Self {
        Self {
            state: ConnectionState::Disconnected,
            retry_count: 0,
            user_initiated: false,
            next_attempt_at: None,
            grace_until: None,
            last_heartbeat: None,
            consecutive_timeouts: 0,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Requests a connect attempt. `user_initiated = true` gets unbounded
    /// retries on failure; automatic (heartbeat-driven) reconnects are
    /// bounded at 5 (spec §4.4).
    pub fn request_connect(&mut self, user_initiated: bool) {
        self.state = ConnectionState::Connecting;
        self.retry_count = 0;
        self.user_initiated = user_initiated;
        self.next_attempt_at = None; // attempt immediately
    }

    /// True once the scheduled backoff delay (if any) has elapsed.
    pub fn should_attempt_now(&self, now: Instant) -> bool {
        self.state == ConnectionState::Connecting
            && self.next_attempt_at.map(|t| now >= t).unwrap_or(true)
    }

    /// Records a failed connect attempt. Returns `true` if another retry
    /// is scheduled, `false` if retries are exhausted (state becomes
    /// `Disconnected`).
    pub fn on_connect_failure(&mut self, now: Instant) -> bool {
        if !self.user_initiated && self.retry_count >= MAX_AUTO_RETRIES {
            self.state = ConnectionState::Disconnected;
            return false;
        }
        let delay = BACKOFF_BASE * BACKOFF_FACTOR.pow(self.retry_count);
        self.next_attempt_at = Some(now + delay);
        self.retry_count += 1;
        true
    }

    pub fn on_connect_success(&mut self, now: Instant) {
        self.state = ConnectionState::Connected;
        self.retry_count = 0;
        self.grace_until = Some(now + GRACE_PERIOD);
        self.last_heartbeat = Some(now);
        self.consecutive_timeouts = 0;
    }

    pub fn note_heartbeat(&mut self, now: Instant) {
        self.last_heartbeat = Some(now);
        self.consecutive_timeouts = 0;
    }

    /// Evaluated on a 1 s tick while connected (spec §4.4 watchdog).
    /// During the grace window, timeouts never increment the consecutive
    /// counter.
    pub fn tick_heartbeat(&mut self, now: Instant) -> HeartbeatStatus {
        let Some(last) = self.last_heartbeat else {
            return HeartbeatStatus::Ok;
        };
        let elapsed = now.saturating_duration_since(last);
        let in_grace = self.grace_until.map(|g| now < g).unwrap_or(false);

        if elapsed >= TIMEOUT_AFTER {
            if !in_grace {
                self.consecutive_timeouts += 1;
            }
            HeartbeatStatus::Timeout
        } else if elapsed >= DELAYED_AFTER {
            HeartbeatStatus::Delayed
        } else {
            HeartbeatStatus::Ok
        }
    }

    pub fn should_force_disconnect(&self) -> bool {
        self.state == ConnectionState::Connected
            && self.consecutive_timeouts >= FORCED_DISCONNECT_TIMEOUTS
    }

    /// Forces a disconnect and schedules reconnect after a fixed 2 s
    /// wait (spec §4.4). Calibration/preprocessing/history/alarm state is
    /// preserved by the caller — the supervisor only tracks connection
    /// and heartbeat state.
    pub fn force_disconnect(&mut self, now: Instant) {
        self.state = ConnectionState::Connecting;
        self.retry_count = 0;
        self.user_initiated = false;
        self.next_attempt_at = Some(now + FORCED_RECONNECT_WAIT);
        self.grace_until = None;
        self.last_heartbeat = None;
        self.consecutive_timeouts = 0;
    }
}

impl Default for Supervisor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn automatic_retries_are_bounded_at_five() {
        let mut sup = Supervisor::new();
        sup.request_connect(false);
        let t0 = Instant::now();
        for _ in 0..MAX_AUTO_RETRIES {
            assert!(sup.on_connect_failure(t0));
        }
        assert!(!sup.on_connect_failure(t0));
        assert_eq!(sup.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn user_initiated_retries_are_unbounded() {
        let mut sup = Supervisor::new();
        sup.request_connect(true);
        let t0 = Instant::now();
        for _ in 0..50 {
            assert!(sup.on_connect_failure(t0));
        }
        assert_eq!(sup.state(), ConnectionState::Connecting);
    }

    #[test]
    fn backoff_grows_by_factor_two() {
        let mut sup = Supervisor::new();
        sup.request_connect(false);
        let t0 = Instant::now();
        sup.on_connect_failure(t0);
        let first_deadline = sup.next_attempt_at.unwrap();
        sup.on_connect_failure(t0);
        let second_deadline = sup.next_attempt_at.unwrap();
        assert!(second_deadline - t0 > first_deadline - t0);
    }

    #[test]
    fn grace_window_suppresses_timeout_counting() {
        let mut sup = Supervisor::new();
        let t0 = Instant::now();
        sup.on_connect_success(t0);
        let during_grace = t0 + Duration::from_secs(7);
        assert_eq!(sup.tick_heartbeat(during_grace), HeartbeatStatus::Ok);
        assert_eq!(sup.consecutive_timeouts, 0);
    }

    #[test]
    fn ten_consecutive_timeouts_force_disconnect() {
        let mut sup = Supervisor::new();
        let t0 = Instant::now();
        sup.on_connect_success(t0 - GRACE_PERIOD - Duration::from_secs(1)); // grace already elapsed
        let mut now = t0;
        for _ in 0..FORCED_DISCONNECT_TIMEOUTS {
            now += TIMEOUT_AFTER;
            sup.tick_heartbeat(now);
        }
        assert!(sup.should_force_disconnect());
    }

    #[test]
    fn heartbeat_resets_timeout_counter() {
        let mut sup = Supervisor::new();
        let t0 = Instant::now();
        sup.on_connect_success(t0 - GRACE_PERIOD - Duration::from_secs(1));
        sup.tick_heartbeat(t0 + TIMEOUT_AFTER);
        sup.note_heartbeat(t0 + TIMEOUT_AFTER + Duration::from_millis(1));
        assert!(!sup.should_force_disconnect());
    }
}
