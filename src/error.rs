//! Error types for the value assessment engine

use thiserror::Error;

/// Errors raised by the computation engine.
///
/// Structural problems are detected before any arithmetic runs, so a profile
/// is either produced whole or one of these is returned.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValueError {
    /// Horizon with `year_end` before `year_start`
    #[error("invalid horizon: year_end {year_end} is before year_start {year_start}")]
    InvalidHorizon { year_start: i32, year_end: i32 },

    /// More than one distribution row for the same CAPEX category
    #[error("capex category '{category}' has {rows} distribution rows, expected exactly one")]
    DuplicateDistribution { category: String, rows: usize },

    /// Distribution percentages that do not add up to 100
    #[error("distribution for '{category}' sums to {sum}%, expected 100%")]
    DistributionSum { category: String, sum: f64 },

    /// A percentage outside [0, 100]
    #[error("{field} percentage {value} is outside [0, 100]")]
    PercentageOutOfRange { field: String, value: f64 },

    /// Malformed learning curve breakpoints
    #[error("invalid learning curve: {detail}")]
    InvalidLearningCurve { detail: String },

    /// Advance payment percentages exceeding the billed amount
    #[error("payment terms bill {total}% in advance, at most 100% allowed")]
    PaymentTermsExceeded { total: f64 },

    /// The same year listed twice in a yearly table
    #[error("year {year} appears more than once in {table}")]
    DuplicateYear { table: String, year: i32 },

    /// Negative sales quantity
    #[error("negative quantity {quantity} in year {year}")]
    NegativeQuantity { year: i32, quantity: f64 },

    /// A series whose length does not match the horizon
    #[error("{series} has {actual} values, horizon has {expected} years")]
    LengthMismatch {
        series: String,
        expected: usize,
        actual: usize,
    },

    /// Ledgers on different horizons cannot be summed
    #[error("cannot aggregate ledgers on different horizons ({left} vs {right})")]
    HorizonMismatch { left: String, right: String },

    /// Nothing to aggregate
    #[error("aggregation requires at least one child summary")]
    EmptyAggregation,

    /// Currency conversion of a structure it cannot interpret
    #[error("cannot convert values of shape {shape}")]
    UnsupportedShape { shape: String },
}

impl ValueError {
    /// True for errors caused by malformed or contradictory configuration
    pub fn is_configuration(&self) -> bool {
        !matches!(
            self,
            ValueError::UnsupportedShape { .. }
                | ValueError::HorizonMismatch { .. }
                | ValueError::EmptyAggregation
        )
    }
}

/// Result alias used throughout the engine
pub type ValueResult<T> = Result<T, ValueError>;

/// Check that a percentage lies in [0, 100]
pub(crate) fn check_percentage(field: &str, value: f64) -> ValueResult<()> {
    if !(0.0..=100.0).contains(&value) {
        return Err(ValueError::PercentageOutOfRange {
            field: field.to_string(),
            value,
        });
    }
    Ok(())
}
