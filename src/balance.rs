//! Per-pair balance snapshot.

use crate::PairSymbol;

/// Free, locked and total holdings of one currency.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CurrencyBalance {
    pub free: f64,
    /// Locked in open orders
    pub used: f64,
    pub total: f64,
}

impl CurrencyBalance {
    /// Build from free and locked amounts; `total = free + used`.
    pub fn new(free: f64, used: f64) -> Self {
        Self {
            free,
            used,
            total: free + used,
        }
    }
}

/// Balances for exactly the base and quote currency of the active pair.
///
/// Every other currency in the account is left out on purpose: decisions for
/// one pair never depend on account-wide state.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BalanceSnapshot {
    pub symbol: PairSymbol,
    pub base: CurrencyBalance,
    pub quote: CurrencyBalance,
}

impl BalanceSnapshot {
    pub fn new(symbol: PairSymbol, base: CurrencyBalance, quote: CurrencyBalance) -> Self {
        Self {
            symbol,
            base,
            quote,
        }
    }

    /// Total base-currency holding (free + locked).
    pub fn total_base(&self) -> f64 {
        self.base.total
    }

    /// Total quote-currency holding (free + locked).
    pub fn total_quote(&self) -> f64 {
        self.quote.total
    }

    /// Quote-currency value of the base holding at `price`.
    pub fn base_value(&self, price: f64) -> f64 {
        self.base.total * price
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_is_free_plus_used() {
        let b = CurrencyBalance::new(0.75, 0.25);
        assert_eq!(b.total, 1.0);
    }

    #[test]
    fn base_value() {
        let snap = BalanceSnapshot::new(
            "ETH/USDT".parse().unwrap(),
            CurrencyBalance::new(1.0, 0.0),
            CurrencyBalance::new(1000.0, 0.0),
        );
        assert_eq!(snap.base_value(1400.0), 1400.0);
        assert_eq!(snap.total_quote(), 1000.0);
    }
}
