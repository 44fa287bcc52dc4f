use thiserror::Error;

pub type Result<T> = std::result::Result<T, OutbreakError>;

/// Errors raised before any numerical loop starts.
///
/// Non-convergence is never an error: it travels in the outcome types
/// (`RunStatus`, `StepSizeOutcome`, `CalibrationResult`) so callers still get the
/// best-effort numbers.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum OutbreakError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid observations: {0}")]
    InvalidObservations(String),

    #[error("Malformed sample at day {day}: {reason}")]
    MalformedSample { day: f64, reason: String },

    #[error("Least-squares fit is degenerate: {0}")]
    DegenerateFit(String),
}

impl OutbreakError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    pub fn observations(message: impl Into<String>) -> Self {
        Self::InvalidObservations(message.into())
    }
}

/// Fails with `InvalidConfig` unless `value` is finite and strictly positive.
pub(crate) fn ensure_positive(name: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(OutbreakError::config(format!(
            "{name} must be positive and finite, got {value}"
        )));
    }
    Ok(())
}

/// Fails with `InvalidConfig` unless `value` is finite and not negative.
pub(crate) fn ensure_non_negative(name: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(OutbreakError::config(format!(
            "{name} must be non-negative and finite, got {value}"
        )));
    }
    Ok(())
}
