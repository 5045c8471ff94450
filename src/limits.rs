//! Venue order limits and the pre-placement guard rails.

use std::fmt;

/// Minimums a venue enforces on new orders. `None` means "no limit".
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MarketLimits {
    /// Minimum order quantity in base currency
    pub amount_min: Option<f64>,
    /// Minimum limit price
    pub price_min: Option<f64>,
    /// Minimum notional (amount * price) in quote currency
    pub cost_min: Option<f64>,
}

/// Which venue minimum an order would violate.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LimitBreach {
    AmountBelowMin { amount: f64, min: f64 },
    PriceBelowMin { price: f64, min: f64 },
    CostBelowMin { cost: f64, min: f64 },
}

impl MarketLimits {
    /// Check an already-normalized order against the limits.
    ///
    /// Checks run amount, then price, then cost; the first violation wins.
    /// A breach is not an error: the caller skips placement for this cycle.
    pub fn check(&self, amount: f64, price: f64) -> Option<LimitBreach> {
        if let Some(min) = self.amount_min {
            if amount < min {
                return Some(LimitBreach::AmountBelowMin { amount, min });
            }
        }
        if let Some(min) = self.price_min {
            if price < min {
                return Some(LimitBreach::PriceBelowMin { price, min });
            }
        }
        if let Some(min) = self.cost_min {
            let cost = amount * price;
            if cost < min {
                return Some(LimitBreach::CostBelowMin { cost, min });
            }
        }
        None
    }
}

impl fmt::Display for LimitBreach {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LimitBreach::AmountBelowMin { amount, min } => {
                write!(f, "limits.amount.min: {min}, amount: {amount}")
            }
            LimitBreach::PriceBelowMin { price, min } => {
                write!(f, "limits.price.min: {min}, price: {price}")
            }
            LimitBreach::CostBelowMin { cost, min } => {
                write!(f, "limits.cost.min: {min}, cost: {cost}")
            }
        }
    }
}
