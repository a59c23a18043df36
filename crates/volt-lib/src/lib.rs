pub mod detectors;
pub mod error;
pub mod io;
pub mod metrics;
pub mod plot;
pub mod report;
pub mod signal;

pub use detectors::*;
pub use error::{FeatureError, FeatureResult};
pub use metrics::*;
pub use report::{FeatureConfig, FeatureReport};
pub use signal::*;
