//! Dark/white calibration pair and the correction it applies to a raw
//! spectrum (spec §3 `CalibrationPair`, §4.5).

#[derive(Debug, Clone, Default)]
pub struct CalibrationPair {
    dark: Vec<f32>,
    white: Vec<f32>,
}

impl CalibrationPair {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_dark(&mut self, values: Vec<f32>) {
        self.dark = values;
    }

    pub fn set_white(&mut self, values: Vec<f32>) {
        self.white = values;
    }

    pub fn has_dark(&self) -> bool {
        !self.dark.is_empty()
    }

    pub fn has_white(&self) -> bool {
        !self.white.is_empty()
    }

    fn ready_for(&self, len: usize) -> bool {
        self.has_dark()
            && self.has_white()
            && self.dark.len() == len
            && self.white.len() == len
    }

    /// `corrected[i] = (raw[i] - dark[i]) / (white[i] - dark[i])`, `0/0 ->
    /// 0`. Returns `raw` unchanged (cloned) if dark/white are missing or
    /// mismatched in length — this is not an error (spec §4.5).
    pub fn apply(&self, raw: &[f32]) -> Vec<f32> {
        if !self.ready_for(raw.len()) {
            return raw.to_vec();
        }
        raw.iter()
            .zip(self.dark.iter())
            .zip(self.white.iter())
            .map(|((r, d), w)| {
                let denom = w - d;
                if denom == 0.0 {
                    0.0
                } else {
                    (r - d) / denom
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_calibration_passes_through() {
        let pair = CalibrationPair::new();
        assert_eq!(pair.apply(&[1.0, 2.0, 3.0]), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn identity_with_dark_zero_white_one() {
        let mut pair = CalibrationPair::new();
        pair.set_dark(vec![0.0, 0.0, 0.0]);
        pair.set_white(vec![1.0, 1.0, 1.0]);
        let raw = vec![0.2, 0.5, 0.9];
        assert_eq!(pair.apply(&raw), raw);
    }

    #[test]
    fn zero_over_zero_is_zero() {
        let mut pair = CalibrationPair::new();
        pair.set_dark(vec![1.0]);
        pair.set_white(vec![1.0]);
        assert_eq!(pair.apply(&[1.0]), vec![0.0]);
    }

    #[test]
    fn mismatched_length_passes_through() {
        let mut pair = CalibrationPair::new();
        pair.set_dark(vec![1.0, 2.0]);
        pair.set_white(vec![3.0, 4.0]);
        let raw = vec![1.0, 2.0, 3.0];
        assert_eq!(pair.apply(&raw), raw);
    }
}
