//! Ring buffer of recent predictions (spec §3, §4.8: "History buffers:
//! ring of last H=10 predictions; full history rings per property on
//! demand").

use std::collections::VecDeque;

use crate::host::predictor::PredictionResult;

const CAPACITY: usize = 10;

#[derive(Debug, Default)]
pub struct History {
    entries: VecDeque<PredictionResult>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, result: PredictionResult) {
        if self.entries.len() == CAPACITY {
            self.entries.pop_front();
        }
        self.entries.push_back(result);
    }

    pub fn recent(&self) -> impl Iterator<Item = &PredictionResult> {
        self.entries.iter()
    }

    /// The full recorded history of one property's values, oldest first.
    pub fn property_series(&self, property: &str) -> Vec<f32> {
        self.entries
            .iter()
            .filter_map(|r| r.values.get(property).copied())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn result(ts: &str, value: f32) -> PredictionResult {
        PredictionResult {
            timestamp: ts.to_string(),
            values: HashMap::from([("A".to_string(), value)]),
        }
    }

    #[test]
    fn evicts_oldest_past_capacity() {
        let mut history = History::new();
        for i in 0..(CAPACITY + 3) {
            history.push(result(&i.to_string(), i as f32));
        }
        assert_eq!(history.len(), CAPACITY);
        let series = history.property_series("A");
        assert_eq!(series.first(), Some(&3.0));
        assert_eq!(series.last(), Some(&((CAPACITY + 2) as f32)));
    }

    #[test]
    fn property_series_is_chronological() {
        let mut history = History::new();
        history.push(result("t1", 1.0));
        history.push(result("t2", 2.0));
        assert_eq!(history.property_series("A"), vec![1.0, 2.0]);
    }
}
