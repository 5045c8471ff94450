//! The stick: persisted record of a pair's single tracked order.

use crate::{Order, OrderStatus, Side};

/// Persisted per-pair order tracking record.
///
/// All fields `None` means no order is tracked. A non-`None`
/// `order_status` refers to an order that exists on the venue under
/// `order_id`; reconciliation keeps that true across restarts.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StickState {
    pub amount: Option<f64>,
    /// Amount net of fees (differs from `amount` for buys)
    pub actual_amount: Option<f64>,
    pub price: Option<f64>,
    pub order_id: Option<String>,
    pub order_side: Option<Side>,
    pub order_status: Option<OrderStatus>,
}

impl StickState {
    /// The empty stick: nothing tracked.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Stick to persist after an order-affecting action.
    ///
    /// A closed order needs no further tracking and maps to the empty stick;
    /// anything else is copied from the order.
    pub fn from_order(order: &Order) -> Self {
        if order.status == OrderStatus::Closed {
            return Self::empty();
        }
        Self {
            amount: Some(order.amount),
            actual_amount: Some(order.net_amount()),
            price: Some(order.price),
            order_id: Some(order.id.clone()),
            order_side: Some(order.side),
            order_status: Some(order.status),
        }
    }

    /// True if no order status is recorded, as in the empty stick.
    ///
    /// A stick left by a `canceled` placement is not empty, but it tracks
    /// nothing either: only [`is_open`](Self::is_open) sticks are reconciled
    /// or cancelled, and the next placement overwrites the stale fields.
    pub fn is_empty(&self) -> bool {
        self.order_status.is_none()
    }

    /// True if the tracked order was last seen open.
    pub fn is_open(&self) -> bool {
        self.order_status == Some(OrderStatus::Open)
    }

    /// The tracked open order id, if any.
    pub fn open_order_id(&self) -> Option<&str> {
        if self.is_open() {
            self.order_id.as_deref()
        } else {
            None
        }
    }
}
