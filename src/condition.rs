//! Condition evaluation: has the allocation drifted far enough to act?

use crate::{BalanceSnapshot, MinDiffType, PairConfig};

/// Outcome of evaluating one pair against its target.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Evaluation {
    /// Quote-currency value of the base holding at the current price
    pub value_diff: f64,
    /// Absolute deviation from the target value
    pub total_diff_value: f64,
    pub should_execute: bool,
}

/// Evaluate the drift of the base holding against `pair.condition_value`.
///
/// The threshold is strict: a deviation exactly equal to `min_diff_value`
/// does not trigger.
///
/// ```
/// use pairbalance::{evaluate, BalanceSnapshot, CurrencyBalance, PairConfig};
///
/// let symbol = "ETH/USDT".parse().unwrap();
/// let balance = BalanceSnapshot::new(
///     "ETH/USDT".parse().unwrap(),
///     CurrencyBalance::new(1.0, 0.0),
///     CurrencyBalance::new(1000.0, 0.0),
/// );
/// let pair = PairConfig::fixed(symbol, 2000.0, 2.0);
///
/// let eval = evaluate(&balance, &pair, 1400.0);
/// assert_eq!(eval.value_diff, 1400.0);
/// assert_eq!(eval.total_diff_value, 600.0);
/// assert!(eval.should_execute);
/// ```
pub fn evaluate(balance: &BalanceSnapshot, pair: &PairConfig, price: f64) -> Evaluation {
    let value_diff = balance.base_value(price);
    let total_diff_value = (value_diff - pair.condition_value).abs();

    let should_execute = match pair.min_diff_type {
        MinDiffType::Fixed => total_diff_value > pair.min_diff_value,
    };

    Evaluation {
        value_diff,
        total_diff_value,
        should_execute,
    }
}

/// Shorthand for `evaluate(..).should_execute`.
pub fn should_execute(balance: &BalanceSnapshot, pair: &PairConfig, price: f64) -> bool {
    evaluate(balance, pair, price).should_execute
}
