//! Speed buckets for dwell-time accounting.
//!
//! Ten 10 km/h wide buckets cover `[0, 100)`, one overflow bucket covers
//! everything from 110 km/h upwards. Speeds in `[100, 110)` belong to no bucket,
//! so time spent there is not accounted.

pub const BUCKET_WIDTH_KMH: f64 = 10.0;
pub const REGULAR_BUCKETS: usize = 10;
pub const OVERFLOW_THRESHOLD_KMH: f64 = 110.0;
pub const OVERFLOW_LABEL: &str = "100+km/h";

const BUCKET_COUNT: usize = REGULAR_BUCKETS + 1;
const OVERFLOW_INDEX: usize = REGULAR_BUCKETS;

/// Returns the bucket a speed falls into, `None` for the gap and invalid speeds
pub fn bucket_index(speed_kmh: f64) -> Option<usize> {
    if !speed_kmh.is_finite() || speed_kmh < 0.0 {
        return None;
    }
    if speed_kmh >= OVERFLOW_THRESHOLD_KMH {
        return Some(OVERFLOW_INDEX);
    }
    let index = (speed_kmh / BUCKET_WIDTH_KMH).floor() as usize;
    (index < REGULAR_BUCKETS).then_some(index)
}

pub fn bucket_label(index: usize) -> String {
    if index >= OVERFLOW_INDEX {
        return OVERFLOW_LABEL.to_string();
    }
    let lo = index * BUCKET_WIDTH_KMH as usize;
    format!("{}-{}km/h", lo, lo + BUCKET_WIDTH_KMH as usize)
}

/// Accumulated dwell time per bucket in milliseconds
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpeedBuckets {
    dwell_ms: [i64; BUCKET_COUNT],
}

impl SpeedBuckets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn credit(&mut self, index: usize, elapsed_ms: i64) {
        if let Some(slot) = self.dwell_ms.get_mut(index) {
            *slot += elapsed_ms.max(0);
        }
    }

    pub fn dwell_ms(&self, index: usize) -> i64 {
        self.dwell_ms.get(index).copied().unwrap_or(0)
    }

    pub fn total_ms(&self) -> i64 {
        self.dwell_ms.iter().sum()
    }

    /// Labelled dwell times in ascending speed order
    pub fn iter(&self) -> impl Iterator<Item = (String, i64)> + '_ {
        self.dwell_ms
            .iter()
            .enumerate()
            .map(|(i, ms)| (bucket_label(i), *ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn speeds_map_to_ten_wide_buckets() {
        assert_eq!(bucket_index(0.0), Some(0));
        assert_eq!(bucket_index(9.99), Some(0));
        assert_eq!(bucket_index(10.0), Some(1));
        assert_eq!(bucket_index(99.9), Some(9));
        assert_eq!(bucket_index(110.0), Some(10));
        assert_eq!(bucket_index(250.0), Some(10));
    }

    #[test]
    fn hundred_to_hundred_ten_is_not_bucketed() {
        assert_eq!(bucket_index(100.0), None);
        assert_eq!(bucket_index(109.9), None);
        assert_eq!(bucket_index(f64::NAN), None);
        assert_eq!(bucket_index(-1.0), None);
    }

    #[test]
    fn labels_follow_bucket_bounds() {
        assert_eq!(bucket_label(0), "0-10km/h");
        assert_eq!(bucket_label(9), "90-100km/h");
        assert_eq!(bucket_label(10), "100+km/h");

        let labels: Vec<String> = SpeedBuckets::new().iter().map(|(l, _)| l).collect();
        assert_eq!(labels.len(), 11);
        assert_eq!(labels[3], "30-40km/h");
    }

    #[test]
    fn credit_accumulates_and_clear_resets() {
        let mut buckets = SpeedBuckets::new();
        buckets.credit(2, 1000);
        buckets.credit(2, 500);
        buckets.credit(10, 250);
        buckets.credit(42, 1000);

        assert_eq!(buckets.dwell_ms(2), 1500);
        assert_eq!(buckets.total_ms(), 1750);
    }
}
