//! Fabricates dark/white calibration references from the current
//! spectrum row, 5 s after the request, without blocking the listener
//! (spec §4.3). Modeled as a small scheduled-task queue drained by the
//! main loop, rather than a spawned thread per request — the delay is
//! cancellable-by-disconnect (spec §5): if the requester is gone by the
//! fire time, the response is dropped silently.

use std::time::{Duration, Instant};

use crate::device::client_table::ClientId;

const CALIBRATION_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationKind {
    Dark,
    White,
}

pub struct PendingCalibration {
    pub client_id: ClientId,
    pub kind: CalibrationKind,
    pub fire_at: Instant,
    pub row: Vec<f32>,
}

#[derive(Default)]
pub struct CalibrationResponder {
    pending: Vec<PendingCalibration>,
}

impl CalibrationResponder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, client_id: ClientId, kind: CalibrationKind, row: Vec<f32>) {
        self.pending.push(PendingCalibration {
            client_id,
            kind,
            fire_at: Instant::now() + CALIBRATION_DELAY,
            row,
        });
    }

    /// Drains and returns every task whose delay has elapsed. The caller
    /// is responsible for checking the peer is still alive before
    /// sending (spec §5 gate-on-peer-state).
    pub fn due(&mut self, now: Instant) -> Vec<PendingCalibration> {
        let (due, pending): (Vec<_>, Vec<_>) =
            self.pending.drain(..).partition(|p| now >= p.fire_at);
        self.pending = pending;
        due
    }
}

/// `values[i] = row[i] * 0.05` (spec §4.3 `REQ_DARK`).
pub fn dark_values(row: &[f32]) -> Vec<f32> {
    row.iter().map(|v| v * 0.05).collect()
}

/// Constant vector equal to `0.95 * max(row)` (or `1.0` if the row's max
/// is `0`) (spec §4.3 `REQ_WHITE`).
pub fn white_values(row: &[f32]) -> Vec<f32> {
    let max = row.iter().cloned().fold(f32::MIN, f32::max);
    let level = if max == 0.0 { 1.0 } else { 0.95 * max };
    vec![level; row.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dark_is_five_percent() {
        let row = vec![10.0, 20.0, 0.0];
        assert_eq!(dark_values(&row), vec![0.5, 1.0, 0.0]);
    }

    #[test]
    fn white_is_constant_ninety_five_percent_of_max() {
        let row = vec![1.0, 2.0, 4.0];
        assert_eq!(white_values(&row), vec![3.8, 3.8, 3.8]);
    }

    #[test]
    fn white_falls_back_to_one_when_row_is_all_zero() {
        let row = vec![0.0, 0.0];
        assert_eq!(white_values(&row), vec![1.0, 1.0]);
    }

    #[test]
    fn due_only_returns_elapsed_tasks() {
        let mut responder = CalibrationResponder::new();
        responder.schedule(1, CalibrationKind::Dark, vec![1.0]);
        assert!(responder.due(Instant::now()).is_empty());
        let later = Instant::now() + CALIBRATION_DELAY + Duration::from_millis(1);
        assert_eq!(responder.due(later).len(), 1);
    }
}
