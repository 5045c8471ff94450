//! Per-pair rebalancing configuration.

use crate::PairSymbol;
use crate::error::ValidationError;

/// How the target allocation is expressed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "UPPERCASE"))]
pub enum ConditionType {
    /// Target is a fixed quote-currency value of the base holding.
    #[default]
    Fixed,
}

/// How the trigger threshold is expressed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "UPPERCASE"))]
pub enum MinDiffType {
    /// Threshold is a fixed quote-currency deviation.
    #[default]
    Fixed,
}

/// Rebalancing rules for one trading pair. Immutable during a cycle.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PairConfig {
    pub symbol: PairSymbol,
    /// Target quote-currency value of the base holding
    pub condition_value: f64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub condition_type: ConditionType,
    /// Deviation (quote currency) that must be exceeded to act
    pub min_diff_value: f64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub min_diff_type: MinDiffType,
    /// Re-price step (percent of price) after a post-only rejection
    #[cfg_attr(
        feature = "serde",
        serde(default = "default_post_only_tick_percentage")
    )]
    pub post_only_tick_percentage: f64,
}

pub(crate) fn default_post_only_tick_percentage() -> f64 {
    0.1
}

impl PairConfig {
    /// FIXED/FIXED pair config with the default re-price step.
    pub fn fixed(symbol: PairSymbol, condition_value: f64, min_diff_value: f64) -> Self {
        Self {
            symbol,
            condition_value,
            condition_type: ConditionType::Fixed,
            min_diff_value,
            min_diff_type: MinDiffType::Fixed,
            post_only_tick_percentage: default_post_only_tick_percentage(),
        }
    }

    /// Override the post-only re-price step.
    pub fn with_tick_percentage(mut self, pct: f64) -> Self {
        self.post_only_tick_percentage = pct;
        self
    }

    /// Validate numeric invariants.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (field, value) in [
            ("condition_value", self.condition_value),
            ("min_diff_value", self.min_diff_value),
            ("post_only_tick_percentage", self.post_only_tick_percentage),
        ] {
            if !value.is_finite() {
                return Err(ValidationError::NotFinite { field, value });
            }
            if value < 0.0 {
                return Err(ValidationError::Negative { field, value });
            }
        }
        let pct = self.post_only_tick_percentage;
        if pct <= 0.0 || pct >= 100.0 {
            return Err(ValidationError::PercentOutOfRange {
                field: "post_only_tick_percentage",
                value: pct,
            });
        }
        Ok(())
    }
}
