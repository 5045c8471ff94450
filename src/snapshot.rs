//! Order book snapshots for re-pricing.

use crate::Side;

/// Aggregated quantity at a single price.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LevelSnapshot {
    pub price: f64,
    pub size: f64,
}

/// A snapshot of the venue order book at a point in time.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BookSnapshot {
    /// Bid levels (highest price first)
    pub bids: Vec<LevelSnapshot>,
    /// Ask levels (lowest price first)
    pub asks: Vec<LevelSnapshot>,
}

impl BookSnapshot {
    /// Build from `[price, size]` pairs as venues usually publish them.
    pub fn from_pairs(bids: &[[f64; 2]], asks: &[[f64; 2]]) -> Self {
        let level = |&[price, size]: &[f64; 2]| LevelSnapshot { price, size };
        Self {
            bids: bids.iter().map(level).collect(),
            asks: asks.iter().map(level).collect(),
        }
    }

    /// Returns the best bid price, if any.
    pub fn best_bid(&self) -> Option<f64> {
        self.bids.first().map(|l| l.price)
    }

    /// Returns the best ask price, if any.
    pub fn best_ask(&self) -> Option<f64> {
        self.asks.first().map(|l| l.price)
    }

    /// Returns the spread (best ask - best bid), if both exist.
    pub fn spread(&self) -> Option<f64> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some(ask - bid),
            _ => None,
        }
    }

    /// Top of the book on the side where an order of `side` rests as a maker.
    ///
    /// Buys join the best bid, sells join the best ask; a post-only order at
    /// this price cannot take liquidity.
    pub fn maker_price(&self, side: Side) -> Option<f64> {
        match side {
            Side::Buy => self.best_bid(),
            Side::Sell => self.best_ask(),
        }
    }

    /// True if a limit order of `side` at `price` would execute on arrival.
    pub fn crosses(&self, side: Side, price: f64) -> bool {
        match side {
            Side::Buy => self.best_ask().is_some_and(|ask| price >= ask),
            Side::Sell => self.best_bid().is_some_and(|bid| price <= bid),
        }
    }
}
