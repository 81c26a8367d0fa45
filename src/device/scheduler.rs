//! The four periodic stream timers (spec §4.2). Each starts the first
//! time its subscriber set becomes non-empty and stops (is dropped) when
//! it becomes empty again — no dangling timers.

use std::time::{Duration, Instant};

const SPECTRUM_PERIOD: Duration = Duration::from_millis(50);
const SENSOR_PERIOD: Duration = Duration::from_secs(5);
const DEVICE_STATUS_PERIOD: Duration = Duration::from_secs(5);
const HEARTBEAT_PERIOD: Duration = Duration::from_secs(3);

#[derive(Default)]
pub struct Scheduler {
    spectrum_due: Option<Instant>,
    sensor_due: Option<Instant>,
    device_status_due: Option<Instant>,
    heartbeat_due: Option<Instant>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` exactly when this tick should fire: fires
    /// immediately the moment the subscriber set stops being empty, then
    /// every `period` thereafter; resets (stops) when empty.
    fn poll(due: &mut Option<Instant>, has_subscribers: bool, period: Duration, now: Instant) -> bool {
        if !has_subscribers {
            *due = None;
            return false;
        }
        match *due {
            None => {
                *due = Some(now + period);
                true
            }
            Some(deadline) if now >= deadline => {
                *due = Some(now + period);
                true
            }
            Some(_) => false,
        }
    }

    pub fn spectrum_due(&mut self, has_subscribers: bool, now: Instant) -> bool {
        Self::poll(&mut self.spectrum_due, has_subscribers, SPECTRUM_PERIOD, now)
    }

    pub fn sensor_due(&mut self, has_subscribers: bool, now: Instant) -> bool {
        Self::poll(&mut self.sensor_due, has_subscribers, SENSOR_PERIOD, now)
    }

    pub fn device_status_due(&mut self, has_subscribers: bool, now: Instant) -> bool {
        Self::poll(
            &mut self.device_status_due,
            has_subscribers,
            DEVICE_STATUS_PERIOD,
            now,
        )
    }

    pub fn heartbeat_due(&mut self, has_subscribers: bool, now: Instant) -> bool {
        Self::poll(&mut self.heartbeat_due, has_subscribers, HEARTBEAT_PERIOD, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_on_first_subscriber_and_stops_when_empty() {
        let mut sched = Scheduler::new();
        let t0 = Instant::now();
        assert!(sched.spectrum_due(true, t0));
        assert!(!sched.spectrum_due(true, t0)); // already fired this period
        assert!(!sched.spectrum_due(false, t0)); // unsubscribed: stops
        assert!(sched.spectrum_due(true, t0)); // resubscribe fires immediately again
    }

    #[test]
    fn fires_again_after_period_elapses() {
        let mut sched = Scheduler::new();
        let t0 = Instant::now();
        assert!(sched.heartbeat_due(true, t0));
        assert!(!sched.heartbeat_due(true, t0 + Duration::from_secs(1)));
        assert!(sched.heartbeat_due(true, t0 + Duration::from_secs(4)));
    }
}
