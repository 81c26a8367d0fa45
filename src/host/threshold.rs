//! Per-property alarm lifecycle over `[min,max]` bands (spec §3
//! `AlarmState`, §4.10). Keys are matched case-insensitively, mirroring
//! `original_source/upper_computer/Database.cpp`'s `normalizeKeyFn`.

use std::collections::HashMap;

use crate::config::{AppConfig, ThresholdBand};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmEvent {
    Raised,
    Cleared,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AlarmState {
    pub detect_count: u64,
    pub abnormal_count: u64,
    pub currently_abnormal: bool,
}

#[derive(Debug, Default)]
pub struct ThresholdEngine {
    states: HashMap<String, AlarmState>,
}

fn normalize_key(property: &str) -> String {
    property.to_lowercase()
}

impl ThresholdEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state_for(&self, property: &str) -> AlarmState {
        self.states
            .get(&normalize_key(property))
            .copied()
            .unwrap_or_default()
    }

    /// Records one prediction value for `property` against `config`'s
    /// band and returns an edge event if the abnormal/normal transition
    /// just happened (spec §4.10).
    pub fn record(
        &mut self,
        property: &str,
        value: f32,
        config: &AppConfig,
    ) -> (ThresholdBand, Option<AlarmEvent>) {
        let band = config.threshold_for(property);
        let key = normalize_key(property);
        let state = self.states.entry(key).or_default();

        state.detect_count += 1;
        let is_abnormal = value < band.min || value > band.max;
        if is_abnormal {
            state.abnormal_count += 1;
        }

        let event = if is_abnormal && !state.currently_abnormal {
            Some(AlarmEvent::Raised)
        } else if !is_abnormal && state.currently_abnormal {
            Some(AlarmEvent::Cleared)
        } else {
            None
        };
        state.currently_abnormal = is_abnormal;

        (band, event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ThresholdBand;

    fn config_with_band(key: &str, min: f32, max: f32) -> AppConfig {
        let mut cfg = AppConfig::default();
        cfg.thresholds.insert(key.to_string(), ThresholdBand { min, max });
        cfg
    }

    #[test]
    fn scenario_six_alarm_edges_and_counts() {
        let config = config_with_band("A", 0.0, 1.0);
        let mut engine = ThresholdEngine::new();

        let (_, e1) = engine.record("A", 0.5, &config);
        assert_eq!(e1, None);
        let (_, e2) = engine.record("A", 1.5, &config);
        assert_eq!(e2, Some(AlarmEvent::Raised));
        let (_, e3) = engine.record("A", 1.4, &config);
        assert_eq!(e3, None);
        let (_, e4) = engine.record("A", 0.9, &config);
        assert_eq!(e4, Some(AlarmEvent::Cleared));

        let state = engine.state_for("A");
        assert_eq!(state.detect_count, 4);
        assert_eq!(state.abnormal_count, 2);
    }

    #[test]
    fn abnormal_count_never_exceeds_detect_count() {
        let config = config_with_band("x", -1.0, 1.0);
        let mut engine = ThresholdEngine::new();
        for v in [0.0, 5.0, -5.0, 0.5, 2.0] {
            engine.record("x", v, &config);
        }
        let state = engine.state_for("x");
        assert!(state.abnormal_count <= state.detect_count);
    }

    #[test]
    fn keys_are_matched_case_insensitively() {
        let config = config_with_band("Moisture", 0.0, 1.0);
        let mut engine = ThresholdEngine::new();
        engine.record("moisture", 2.0, &config);
        let state = engine.state_for("MOISTURE");
        assert_eq!(state.detect_count, 1);
        assert_eq!(state.abnormal_count, 1);
    }
}
