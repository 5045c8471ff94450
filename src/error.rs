//! Validation errors for pair symbols and pair configuration.

/// Errors returned when building domain values from untrusted input.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ValidationError {
    /// Symbol is not of the form `BASE/QUOTE`.
    #[error("invalid pair symbol {0:?}: expected BASE/QUOTE")]
    InvalidSymbol(String),
    /// A numeric field is NaN or infinite.
    #[error("{field} must be finite, got {value}")]
    NotFinite { field: &'static str, value: f64 },
    /// A numeric field is negative.
    #[error("{field} must be >= 0, got {value}")]
    Negative { field: &'static str, value: f64 },
    /// A percentage is outside its allowed range.
    #[error("{field} must be in (0, 100), got {value}")]
    PercentOutOfRange { field: &'static str, value: f64 },
}
