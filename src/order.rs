//! Venue order representation and lifecycle

use std::fmt;

use chrono::{DateTime, Utc};

use crate::Side;

/// Status of a venue order in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum OrderStatus {
    /// Resting on the venue book, possibly partially filled
    Open,
    /// Fully executed
    Closed,
    /// Removed by the venue or by request
    Canceled,
}

impl OrderStatus {
    /// Returns true if the order can still fill or be cancelled.
    #[inline]
    pub fn is_open(self) -> bool {
        self == OrderStatus::Open
    }

    /// Returns true if the order is terminal (no further state changes).
    #[inline]
    pub fn is_terminal(self) -> bool {
        !self.is_open()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Open => "open",
            OrderStatus::Closed => "closed",
            OrderStatus::Canceled => "canceled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trading fee charged on an order.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Fee {
    /// Fee amount, denominated in `currency`
    pub cost: f64,
    pub currency: String,
}

/// An order as reported by the venue.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Order {
    /// Venue-assigned identifier
    pub id: String,
    pub side: Side,
    /// Requested quantity in base currency
    pub amount: f64,
    /// Limit price in quote currency
    pub price: f64,
    pub status: OrderStatus,
    pub fee: Option<Fee>,
    /// Quantity executed so far
    pub filled: f64,
    pub datetime: Option<DateTime<Utc>>,
    /// Whether the order was submitted maker-only
    pub post_only: bool,
}

impl Order {
    /// Quantity still working on the book.
    pub fn remaining(&self) -> f64 {
        (self.amount - self.filled).max(0.0)
    }

    /// True if some but not all of the order has executed.
    pub fn is_partially_filled(&self) -> bool {
        self.filled > 0.0 && self.filled < self.amount
    }

    /// A post-only order that the venue cancelled instead of letting it take.
    pub fn is_post_only_rejection(&self) -> bool {
        self.status == OrderStatus::Canceled && self.post_only
    }

    /// Amount net of fees.
    ///
    /// Buys that report a fee have it deducted (the fee is charged in the
    /// received base currency); every other order keeps its full amount.
    pub fn net_amount(&self) -> f64 {
        match (&self.side, &self.fee) {
            (Side::Buy, Some(fee)) if fee.cost != 0.0 => self.amount - fee.cost,
            _ => self.amount,
        }
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:.8} @ {:.2} [{}] id={}",
            self.side, self.amount, self.price, self.status, self.id
        )?;
        if let Some(ts) = self.datetime {
            write!(f, " {}", ts.to_rfc3339())?;
        }
        Ok(())
    }
}
