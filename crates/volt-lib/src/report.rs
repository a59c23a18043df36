use crate::{
    detectors::{
        acceleration::{find_accelerating_downslopes_with, AccelerationEvent, Attribution},
        extrema::{find_extrema, ExtremumPoint},
        threshold::{below_threshold, ThresholdEvent, DEFAULT_THRESHOLD},
    },
    error::{FeatureError, FeatureResult},
    metrics::trend::{moving_average, AveragePoint, DEFAULT_WINDOW},
    signal::SeriesStore,
};
use anyhow::Context;
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Parameters for a feature extraction run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FeatureConfig {
    /// Trailing moving-average window (samples).
    pub window: usize,
    /// Values strictly below this bound are reported.
    pub threshold: f64,
    /// Sample an accelerating downslope is attributed to.
    pub attribution: Attribution,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
            threshold: DEFAULT_THRESHOLD,
            attribution: Attribution::default(),
        }
    }
}

impl FeatureConfig {
    pub fn validate(&self) -> FeatureResult<()> {
        self.validate_window()?;
        self.validate_threshold()
    }

    pub fn validate_window(&self) -> FeatureResult<()> {
        if self.window == 0 {
            return Err(FeatureError::config("window", "must be at least 1"));
        }
        Ok(())
    }

    pub fn validate_threshold(&self) -> FeatureResult<()> {
        if !self.threshold.is_finite() {
            return Err(FeatureError::config(
                "threshold",
                format!("must be finite, got {}", self.threshold),
            ));
        }
        Ok(())
    }

    /// Parse a TOML document; missing keys fall back to the defaults.
    pub fn from_toml_str(text: &str) -> anyhow::Result<Self> {
        let cfg: FeatureConfig = toml::from_str(text).context("parsing feature config")?;
        cfg.validate()?;
        Ok(cfg)
    }
}

/// Load a [`FeatureConfig`] from a TOML file.
pub fn read_config(path: &Path) -> anyhow::Result<FeatureConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    FeatureConfig::from_toml_str(&text)
        .with_context(|| format!("invalid feature config {}", path.display()))
}

/// Every derived feature of one series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureReport {
    pub config: FeatureConfig,
    pub sample_count: usize,
    pub moving_average: Vec<AveragePoint>,
    pub peaks: Vec<ExtremumPoint>,
    pub lows: Vec<ExtremumPoint>,
    pub below_threshold: Vec<ThresholdEvent>,
    pub accelerations: Vec<AccelerationEvent>,
}

impl FeatureReport {
    /// Run every analyzer against `store`. Any failure aborts the whole build.
    pub fn build(store: &SeriesStore, cfg: &FeatureConfig) -> FeatureResult<Self> {
        cfg.validate()?;
        let moving_average = moving_average(store, cfg.window)?;
        let (peaks, lows) = find_extrema(store);
        let below_threshold = below_threshold(store, cfg.threshold);
        let accelerations = find_accelerating_downslopes_with(store, cfg.attribution);
        debug!(
            "features for {} samples: {} peaks, {} lows, {} below {}, {} accelerations",
            store.len(),
            peaks.len(),
            lows.len(),
            below_threshold.len(),
            cfg.threshold,
            accelerations.len()
        );
        Ok(Self {
            config: *cfg,
            sample_count: store.len(),
            moving_average,
            peaks,
            lows,
            below_threshold,
            accelerations,
        })
    }

    pub fn build_default(store: &SeriesStore) -> FeatureResult<Self> {
        Self::build(store, &FeatureConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::store_from_values;
    use std::io::Write;

    #[test]
    fn empty_series_gives_empty_report() {
        let report = FeatureReport::build_default(&SeriesStore::default()).unwrap();
        assert_eq!(report.sample_count, 0);
        assert!(report.moving_average.is_empty());
        assert!(report.peaks.is_empty());
        assert!(report.lows.is_empty());
        assert!(report.below_threshold.is_empty());
        assert!(report.accelerations.is_empty());
    }

    #[test]
    fn collects_every_analyzer() {
        let store = store_from_values(&[30.0, 35.0, 28.0, 24.0, 15.0, 2.0, 12.0, 25.0]);
        let report = FeatureReport::build_default(&store).unwrap();
        assert_eq!(report.moving_average.len(), 8);
        assert_eq!(report.peaks.iter().map(|p| p.index).collect::<Vec<_>>(), vec![1]);
        assert_eq!(report.lows.iter().map(|p| p.index).collect::<Vec<_>>(), vec![5]);
        assert_eq!(
            report.below_threshold.iter().map(|e| e.index).collect::<Vec<_>>(),
            vec![4, 5, 6]
        );
        // d = [5, -7, -4, -9, -13, 10, 13]; steepening at i = 3 and i = 4.
        assert_eq!(
            report.accelerations.iter().map(|e| e.index).collect::<Vec<_>>(),
            vec![5, 6]
        );
    }

    #[test]
    fn rebuilding_is_deterministic() {
        let store = store_from_values(&[21.0, 19.0, 25.0, 18.0, 14.0, 7.0, 30.0, 22.0]);
        let cfg = FeatureConfig {
            window: 3,
            ..FeatureConfig::default()
        };
        let a = FeatureReport::build(&store, &cfg).unwrap();
        let b = FeatureReport::build(&store, &cfg).unwrap();
        assert_eq!(a, b);
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[test]
    fn bad_window_fails_whole_build() {
        let store = store_from_values(&[1.0, 2.0, 3.0]);
        let cfg = FeatureConfig {
            window: 0,
            ..FeatureConfig::default()
        };
        let err = FeatureReport::build(&store, &cfg).unwrap_err();
        assert!(matches!(err, FeatureError::Config { field: "window", .. }));
    }

    #[test]
    fn nan_threshold_is_rejected() {
        let cfg = FeatureConfig {
            threshold: f64::NAN,
            ..FeatureConfig::default()
        };
        assert!(matches!(
            FeatureReport::build(&SeriesStore::default(), &cfg),
            Err(FeatureError::Config { field: "threshold", .. })
        ));
    }

    #[test]
    fn field_checks_are_independent() {
        let cfg = FeatureConfig {
            window: 0,
            ..FeatureConfig::default()
        };
        assert!(cfg.validate_threshold().is_ok());
        assert!(cfg.validate_window().is_err());

        let cfg = FeatureConfig {
            threshold: f64::INFINITY,
            ..FeatureConfig::default()
        };
        assert!(cfg.validate_window().is_ok());
        assert!(cfg.validate_threshold().is_err());
    }

    #[test]
    fn toml_config_fills_defaults() {
        let cfg = FeatureConfig::from_toml_str("threshold = 12.5\n").unwrap();
        assert_eq!(cfg.window, DEFAULT_WINDOW);
        assert_eq!(cfg.threshold, 12.5);
        assert_eq!(cfg.attribution, Attribution::Lagged);

        let cfg = FeatureConfig::from_toml_str("window = 3\nattribution = \"step-end\"\n").unwrap();
        assert_eq!(cfg.window, 3);
        assert_eq!(cfg.attribution, Attribution::StepEnd);
    }

    #[test]
    fn toml_config_rejects_zero_window() {
        assert!(FeatureConfig::from_toml_str("window = 0\n").is_err());
        assert!(FeatureConfig::from_toml_str("windw = 4\n").is_err());
    }

    #[test]
    fn reads_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "window = 7").unwrap();
        let cfg = read_config(file.path()).unwrap();
        assert_eq!(cfg.window, 7);
        assert_eq!(cfg.threshold, DEFAULT_THRESHOLD);
    }
}
