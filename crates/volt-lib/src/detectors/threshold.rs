use crate::signal::SeriesStore;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Default lower bound for threshold-breach events.
pub const DEFAULT_THRESHOLD: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdEvent {
    pub index: usize,
    pub timestamp: NaiveDateTime,
    pub value: f64,
}

/// Every sample whose value is strictly below `threshold`, in time order.
pub fn below_threshold(store: &SeriesStore, threshold: f64) -> Vec<ThresholdEvent> {
    store
        .samples()
        .iter()
        .enumerate()
        .filter(|(_, s)| s.value < threshold)
        .map(|(index, s)| ThresholdEvent {
            index,
            timestamp: s.timestamp,
            value: s.value,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::store_from_values;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    #[test]
    fn comparison_is_strict() {
        let store = store_from_values(&[25.0, 20.0, 19.99, 21.0, 5.0]);
        let events = below_threshold(&store, DEFAULT_THRESHOLD);
        let idx: Vec<usize> = events.iter().map(|e| e.index).collect();
        assert_eq!(idx, vec![2, 4]);
        assert_eq!(events[0].value, 19.99);
    }

    #[test]
    fn nothing_below_yields_empty() {
        let store = store_from_values(&[20.0, 30.0, 40.0]);
        assert!(below_threshold(&store, 20.0).is_empty());
    }

    #[test]
    fn empty_series_yields_empty() {
        assert!(below_threshold(&SeriesStore::default(), 20.0).is_empty());
    }

    #[test]
    fn output_is_the_filtered_subsequence() {
        let mut rng = StdRng::seed_from_u64(11);
        let values: Vec<f64> = (0..200).map(|_| rng.gen_range(0.0..40.0)).collect();
        let store = store_from_values(&values);
        let got: Vec<f64> = below_threshold(&store, 17.5)
            .iter()
            .map(|e| e.value)
            .collect();
        let expected: Vec<f64> = values.iter().copied().filter(|v| *v < 17.5).collect();
        assert_eq!(got, expected);
    }
}
