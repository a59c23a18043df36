use crate::signal::SeriesStore;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Which sample an accelerating step is attributed to.
///
/// With first differences `d[i] = v[i+1] - v[i]`, a steepening is found at
/// difference `i` when `d[i] < d[i-1] < 0`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "kebab-case")]
pub enum Attribution {
    /// Sample `i + 2`, one past the end of the steepened step. Candidates that
    /// would land past the last sample are dropped.
    #[default]
    Lagged,
    /// Sample `i + 1`, the end of the steepened step.
    StepEnd,
}

impl Attribution {
    fn offset(self) -> usize {
        match self {
            Attribution::Lagged => 2,
            Attribution::StepEnd => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccelerationEvent {
    pub index: usize,
    pub timestamp: NaiveDateTime,
}

/// Positions where a downward slope gets steeper, using [`Attribution::Lagged`].
pub fn find_accelerating_downslopes(store: &SeriesStore) -> Vec<AccelerationEvent> {
    find_accelerating_downslopes_with(store, Attribution::default())
}

/// Positions where a downward slope gets steeper.
///
/// Each qualifying difference yields its own event: a run of `k` steepening
/// negative steps produces up to `k - 1` consecutive events.
pub fn find_accelerating_downslopes_with(
    store: &SeriesStore,
    attribution: Attribution,
) -> Vec<AccelerationEvent> {
    let data = store.samples();
    if data.len() < 3 {
        return Vec::new();
    }
    let diffs: Vec<f64> = data.windows(2).map(|w| w[1].value - w[0].value).collect();
    let offset = attribution.offset();
    let mut events = Vec::new();
    for i in 1..diffs.len() {
        if !(diffs[i] < diffs[i - 1] && diffs[i - 1] < 0.0) {
            continue;
        }
        if let Some(sample) = data.get(i + offset) {
            events.push(AccelerationEvent {
                index: i + offset,
                timestamp: sample.timestamp,
            });
        }
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::{minute, store_from_values};

    fn indices(events: &[AccelerationEvent]) -> Vec<usize> {
        events.iter().map(|e| e.index).collect()
    }

    #[test]
    fn accelerating_run_lagged() {
        let store = store_from_values(&[10.0, 9.0, 7.0, 4.0, 0.0]);
        let events = find_accelerating_downslopes(&store);
        assert_eq!(indices(&events), vec![3, 4]);
        assert_eq!(events[0].timestamp, minute(3));
        assert_eq!(events[1].timestamp, minute(4));
    }

    #[test]
    fn accelerating_run_step_end() {
        let store = store_from_values(&[10.0, 9.0, 7.0, 4.0, 0.0]);
        let events = find_accelerating_downslopes_with(&store, Attribution::StepEnd);
        assert_eq!(indices(&events), vec![2, 3, 4]);
    }

    #[test]
    fn increasing_and_constant_series_have_no_events() {
        for values in [
            vec![1.0, 2.0, 4.0, 8.0, 16.0],
            vec![3.0; 8],
            vec![1.0, 2.0, 3.0, 4.0, 5.0],
        ] {
            let store = store_from_values(&values);
            assert!(find_accelerating_downslopes(&store).is_empty());
            assert!(find_accelerating_downslopes_with(&store, Attribution::StepEnd).is_empty());
        }
    }

    #[test]
    fn constant_downslope_does_not_accelerate() {
        let store = store_from_values(&[10.0, 8.0, 6.0, 4.0, 2.0]);
        assert!(find_accelerating_downslopes(&store).is_empty());
    }

    #[test]
    fn first_difference_must_be_negative() {
        // d = [+1, -3, -4]: only the -3 -> -4 step qualifies.
        let store = store_from_values(&[0.0, 1.0, -2.0, -6.0, -6.0]);
        assert_eq!(indices(&find_accelerating_downslopes(&store)), vec![4]);
    }

    #[test]
    fn short_series_have_no_events() {
        for values in [&[][..], &[1.0][..], &[3.0, 2.0][..], &[3.0, 2.0, 0.0][..]] {
            let store = store_from_values(values);
            assert!(find_accelerating_downslopes(&store).is_empty());
        }
        let store = store_from_values(&[3.0, 2.0, 0.0]);
        assert_eq!(
            indices(&find_accelerating_downslopes_with(&store, Attribution::StepEnd)),
            vec![2]
        );
    }

    #[test]
    fn attribution_parses_from_kebab_case() {
        let parsed: Attribution = serde_json::from_str("\"step-end\"").unwrap();
        assert_eq!(parsed, Attribution::StepEnd);
    }

    #[cfg(feature = "clap")]
    #[test]
    fn flag_names_match_config_names() {
        use clap::ValueEnum;
        for variant in Attribution::value_variants() {
            let flag = variant
                .to_possible_value()
                .map(|v| v.get_name().to_owned())
                .unwrap();
            let config = serde_json::to_string(variant).unwrap();
            assert_eq!(format!("\"{}\"", flag), config);
            assert_eq!(Attribution::from_str(&flag, false), Ok(*variant));
        }
    }
}
