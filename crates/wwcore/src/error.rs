//! Error taxonomy for the acoustic core (see spec §7).

use thiserror::Error;

/// Raised when the reactance root-finder in [`crate::playing_range`] fails
/// to bracket or converge near a seed frequency.
///
/// Recovered locally by the [`crate::tuner::Tuner`] (predicted frequency
/// becomes `None`) and by [`crate::objective`] evaluators (a fixed penalty
/// is substituted for the affected fingering) rather than propagated as a
/// `CoreError` — it only becomes one if it escapes all the way to a
/// boundary call that has nowhere else to recover it.
#[derive(Debug, Error, Clone, Copy, PartialEq)]
#[error("no playing range found near seed frequency {seed_hz} Hz")]
pub struct NoPlayingRange {
    pub seed_hz: f64,
}

/// Top-level error type returned from validation and from the optimizer's
/// boundary-facing entry points.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Instrument, tuning, or fingering failed validation.
    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },

    /// Physical parameters (temperature, pressure, humidity, CO2) are
    /// outside the supported range.
    #[error("invalid physical input: {field} = {value}")]
    InvalidPhysicalInput { field: &'static str, value: f64 },

    /// A reactance root-finder could not locate a playing range. Only
    /// reaches `CoreError` when no local recovery point exists.
    #[error(transparent)]
    NoPlayingRange(#[from] NoPlayingRange),

    /// Optimizer was cancelled, or exhausted its penalty-substitution
    /// budget on an unrecoverable evaluation failure.
    #[error("optimizer aborted: {reason}")]
    OptimizerAborted { reason: String },

    /// A NaN propagated all the way to a top-level scalar result.
    #[error("arithmetic failure: NaN propagated to a top-level result")]
    ArithmeticFailure,
}

pub type CoreResult<T> = Result<T, CoreError>;
