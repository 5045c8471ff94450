//! Order sizing: side and quantity that restore the target allocation.

use crate::{BalanceSnapshot, ConditionType, PairConfig, Side};

/// Side and base-currency quantity of a corrective order.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OrderSizing {
    pub side: Side,
    pub amount: f64,
    /// Signed quote-currency excess of the holding over the target
    pub value_diff: f64,
}

/// Size the order that brings the base holding back to
/// `pair.condition_value` worth of quote currency at `price`.
///
/// Holding above target sells the excess, below target buys the shortfall.
/// The amount is not yet rounded to venue precision.
///
/// ```
/// use pairbalance::{size_order, BalanceSnapshot, CurrencyBalance, PairConfig, Side};
///
/// let balance = BalanceSnapshot::new(
///     "ETH/USDT".parse().unwrap(),
///     CurrencyBalance::new(1.0, 0.0),
///     CurrencyBalance::new(1000.0, 0.0),
/// );
/// let pair = PairConfig::fixed("ETH/USDT".parse().unwrap(), 2000.0, 2.0);
///
/// let sizing = size_order(&balance, &pair, 1400.0);
/// assert_eq!(sizing.side, Side::Buy);
/// assert!((sizing.amount - 600.0 / 1400.0).abs() < 1e-12);
/// ```
pub fn size_order(balance: &BalanceSnapshot, pair: &PairConfig, price: f64) -> OrderSizing {
    let total_base_in_quote = balance.base_value(price);

    match pair.condition_type {
        ConditionType::Fixed => {
            let value_diff = total_base_in_quote - pair.condition_value;
            let amount = if price > 0.0 {
                value_diff.abs() / price
            } else {
                0.0
            };
            let side = if value_diff > 0.0 { Side::Sell } else { Side::Buy };
            OrderSizing {
                side,
                amount,
                value_diff,
            }
        }
    }
}

/// Next limit price after a post-only rejection at `price`.
///
/// A rejected maker order was priced through the book, so a buy steps down
/// and a sell steps up by `pct` percent of the price.
///
/// ```
/// use pairbalance::Side;
/// use pairbalance::sizing::reprice_after_rejection;
///
/// assert_eq!(reprice_after_rejection(Side::Buy, 1000.0, 0.1), 999.0);
/// assert_eq!(reprice_after_rejection(Side::Sell, 1000.0, 0.1), 1001.0);
/// ```
pub fn reprice_after_rejection(side: Side, price: f64, pct: f64) -> f64 {
    let step = price * pct / 100.0;
    match side {
        Side::Buy => price - step,
        Side::Sell => price + step,
    }
}

/// True if `next` is a strictly better maker price than `prev` for `side`
/// (lower for buys, higher for sells).
pub fn improves(side: Side, prev: f64, next: f64) -> bool {
    match side {
        Side::Buy => next < prev,
        Side::Sell => next > prev,
    }
}
