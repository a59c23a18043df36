use crate::{
    error::{FeatureError, FeatureResult},
    signal::SeriesStore,
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Default trailing window for the smoothed trend line.
pub const DEFAULT_WINDOW: usize = 5;

/// One entry of the moving-average line; `value` is `None` until a full window is available.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AveragePoint {
    pub timestamp: NaiveDateTime,
    pub value: Option<f64>,
}

/// Trailing arithmetic mean over `window` samples, one entry per input sample.
///
/// Entry `i` averages values `[i + 1 - window, i]`; the first `window - 1`
/// entries are absent. Each window is summed on its own, so a large sample
/// leaving the window cannot skew later means.
pub fn moving_average(store: &SeriesStore, window: usize) -> FeatureResult<Vec<AveragePoint>> {
    if window == 0 {
        return Err(FeatureError::config("window", "must be at least 1"));
    }
    let data = store.samples();
    let mut out = Vec::with_capacity(data.len());
    for (i, sample) in data.iter().enumerate() {
        let value = if i + 1 < window {
            None
        } else {
            let sum: f64 = data[i + 1 - window..=i].iter().map(|s| s.value).sum();
            Some(sum / window as f64)
        };
        out.push(AveragePoint {
            timestamp: sample.timestamp,
            value,
        });
    }
    Ok(out)
}
