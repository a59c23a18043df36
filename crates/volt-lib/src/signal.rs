use crate::error::{FeatureError, FeatureResult};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One observation of the signal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: NaiveDateTime,
    pub value: f64,
}

impl Sample {
    pub fn new(timestamp: NaiveDateTime, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// Validated, time-sorted series shared by every analyzer.
///
/// Timestamps are strictly increasing and every value is finite. The store is
/// never mutated after construction; derived series live in their own vectors.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SeriesStore {
    samples: Vec<Sample>,
}

impl SeriesStore {
    /// Build a store from samples that must already be in ascending time order.
    pub fn new(samples: Vec<Sample>) -> FeatureResult<Self> {
        validate(&samples)?;
        Ok(Self { samples })
    }

    /// Build a store after sorting the samples by timestamp.
    ///
    /// Duplicate timestamps are still rejected.
    pub fn sorted(mut samples: Vec<Sample>) -> FeatureResult<Self> {
        samples.sort_by_key(|s| s.timestamp);
        Self::new(samples)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Sample> {
        self.samples.get(index)
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn first(&self) -> Option<&Sample> {
        self.samples.first()
    }

    pub fn last(&self) -> Option<&Sample> {
        self.samples.last()
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().map(|s| s.value)
    }

    pub fn timestamps(&self) -> impl Iterator<Item = NaiveDateTime> + '_ {
        self.samples.iter().map(|s| s.timestamp)
    }
}

impl TryFrom<Vec<Sample>> for SeriesStore {
    type Error = FeatureError;

    fn try_from(samples: Vec<Sample>) -> FeatureResult<Self> {
        Self::new(samples)
    }
}

fn validate(samples: &[Sample]) -> FeatureResult<()> {
    if let Some((idx, s)) = samples
        .iter()
        .enumerate()
        .find(|(_, s)| !s.value.is_finite())
    {
        return Err(FeatureError::validation(format!(
            "sample {} at {} has non-finite value {}",
            idx, s.timestamp, s.value
        )));
    }
    for (idx, w) in samples.windows(2).enumerate() {
        if w[1].timestamp == w[0].timestamp {
            return Err(FeatureError::validation(format!(
                "duplicate timestamp {} at samples {} and {}",
                w[1].timestamp,
                idx,
                idx + 1
            )));
        }
        if w[1].timestamp < w[0].timestamp {
            return Err(FeatureError::validation(format!(
                "samples not in ascending time order: {} (sample {}) precedes {} (sample {})",
                w[0].timestamp,
                idx,
                w[1].timestamp,
                idx + 1
            )));
        }
    }
    Ok(())
}

/// Test helper: a store with one sample per minute starting at a fixed instant.
#[cfg(test)]
pub(crate) fn store_from_values(values: &[f64]) -> SeriesStore {
    let samples = values
        .iter()
        .enumerate()
        .map(|(i, &v)| Sample::new(minute(i), v))
        .collect();
    SeriesStore::new(samples).expect("valid test series")
}

#[cfg(test)]
pub(crate) fn minute(i: usize) -> NaiveDateTime {
    use chrono::{Duration, NaiveDate};
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .expect("fixed start")
        + Duration::minutes(i as i64)
}
