use thiserror::Error;

/// Errors raised by the feature-extraction core.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FeatureError {
    /// Malformed or unsorted input at store construction.
    #[error("validation error: {0}")]
    Validation(String),

    /// Invalid analysis parameter.
    #[error("invalid configuration: {field}: {reason}")]
    Config { field: &'static str, reason: String },
}

impl FeatureError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn config(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Config {
            field,
            reason: reason.into(),
        }
    }
}

pub type FeatureResult<T> = Result<T, FeatureError>;
