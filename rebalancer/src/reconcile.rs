//! Reconciliation: bring the stored stick in line with the venue's view of
//! the tracked order before anything else happens in a cycle.

use log::{info, warn};
use pairbalance::{OrderStatus, PairSymbol, StickState};
use pairbalance_broker::Broker;

use crate::error::Result;
use crate::execution::{clear, commit};
use crate::gateway::Venue;
use crate::store::StickStore;

/// What reconciliation found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileAction {
    /// No open order tracked.
    Idle,
    /// Tracked order still open, nothing filled.
    StillOpen,
    /// Tracked order still open with a partial fill.
    PartiallyFilled,
    /// Tracked order filled; stick cleared.
    Completed,
    /// Tracked order cancelled on the venue; stick cleared.
    Canceled,
    /// Stick claimed an open order without an id; stick cleared.
    Untracked,
}

/// The stick to carry into the rest of the cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled {
    pub stick: StickState,
    /// Price of a partially filled open order. Informational only.
    pub reference_price: Option<f64>,
    pub action: ReconcileAction,
}

/// Reconcile `stick` (as read from `store`) against the venue.
pub fn reconcile<B: Broker, S: StickStore>(
    venue: &mut Venue<B>,
    store: &mut S,
    symbol: &PairSymbol,
    stick: StickState,
) -> Result<Reconciled> {
    if !stick.is_open() {
        return Ok(Reconciled {
            stick,
            reference_price: None,
            action: ReconcileAction::Idle,
        });
    }

    let Some(id) = stick.order_id.clone() else {
        warn!("{symbol}: stick marked open without an order id, clearing");
        return Ok(Reconciled {
            stick: clear(store, symbol)?,
            reference_price: None,
            action: ReconcileAction::Untracked,
        });
    };

    let order = venue.fetch_order(&id)?;
    let reconciled = match order.status {
        OrderStatus::Open if order.is_partially_filled() => {
            info!(
                "{symbol}: order {id} partially filled {}/{} at {}",
                order.filled, order.amount, order.price
            );
            Reconciled {
                stick,
                reference_price: Some(order.price),
                action: ReconcileAction::PartiallyFilled,
            }
        }
        OrderStatus::Open => Reconciled {
            stick,
            reference_price: None,
            action: ReconcileAction::StillOpen,
        },
        OrderStatus::Closed => {
            info!(
                "{symbol}: order {id} completed, {} {} net {}",
                order.side,
                order.amount,
                order.net_amount()
            );
            Reconciled {
                stick: commit(store, symbol, &order)?,
                reference_price: None,
                action: ReconcileAction::Completed,
            }
        }
        OrderStatus::Canceled => {
            info!("{symbol}: order {id} was cancelled on the venue");
            Reconciled {
                stick: clear(store, symbol)?,
                reference_price: None,
                action: ReconcileAction::Canceled,
            }
        }
    };
    Ok(reconciled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use pairbalance::{Fee, Order, Side};
    use pairbalance_broker::mock::{MockBroker, MockMarket};

    fn eth() -> PairSymbol {
        "ETH/USDT".parse().unwrap()
    }

    fn tracked(id: &str, status: OrderStatus) -> StickState {
        StickState {
            amount: Some(0.5),
            actual_amount: Some(0.5),
            price: Some(1400.0),
            order_id: Some(id.into()),
            order_side: Some(Side::Buy),
            order_status: Some(status),
        }
    }

    fn venue_with_order(status: OrderStatus, filled: f64) -> Venue<MockBroker> {
        let broker = MockBroker::builder()
            .with_market(&eth(), MockMarket::new(1400.0))
            .build();
        broker.insert_order(Order {
            id: "42".into(),
            side: Side::Buy,
            amount: 0.5,
            price: 1400.0,
            status,
            fee: Some(Fee {
                cost: 0.001,
                currency: "ETH".into(),
            }),
            filled,
            datetime: None,
            post_only: true,
        });
        let mut venue = Venue::new(broker);
        venue.connect().unwrap();
        venue.set_active_symbol(&eth()).unwrap();
        venue
    }

    #[test]
    fn idle_stick_is_not_fetched() {
        let mut venue = venue_with_order(OrderStatus::Open, 0.0);
        let mut store = MemoryStore::new();
        let stick = tracked("42", OrderStatus::Canceled);
        let r = reconcile(&mut venue, &mut store, &eth(), stick.clone()).unwrap();
        assert_eq!(r.action, ReconcileAction::Idle);
        assert_eq!(r.stick, stick);
        assert_eq!(store.writes(), 0);
    }

    #[test]
    fn partial_fill_sets_reference_price() {
        let mut venue = venue_with_order(OrderStatus::Open, 0.2);
        let mut store = MemoryStore::new();
        let stick = tracked("42", OrderStatus::Open);
        let r = reconcile(&mut venue, &mut store, &eth(), stick.clone()).unwrap();
        assert_eq!(r.action, ReconcileAction::PartiallyFilled);
        assert_eq!(r.reference_price, Some(1400.0));
        assert_eq!(r.stick, stick);
        assert_eq!(store.writes(), 0);
    }

    #[test]
    fn closed_order_clears_via_commit() {
        let mut venue = venue_with_order(OrderStatus::Closed, 0.5);
        let mut store = MemoryStore::new().with_stick(&eth(), tracked("42", OrderStatus::Open));
        let r = reconcile(&mut venue, &mut store, &eth(), tracked("42", OrderStatus::Open)).unwrap();
        assert_eq!(r.action, ReconcileAction::Completed);
        assert!(r.stick.is_empty());
        assert!(store.get(&eth()).is_empty());
    }

    #[test]
    fn venue_cancel_clears_regardless_of_fields() {
        let mut venue = venue_with_order(OrderStatus::Canceled, 0.0);
        let mut store = MemoryStore::new();
        let mut stick = tracked("42", OrderStatus::Open);
        stick.order_side = Some(Side::Sell);
        stick.price = Some(99.0);
        let r = reconcile(&mut venue, &mut store, &eth(), stick).unwrap();
        assert_eq!(r.action, ReconcileAction::Canceled);
        assert_eq!(r.stick, StickState::empty());
        assert_eq!(store.get(&eth()), StickState::empty());
    }

    #[test]
    fn unknown_order_is_fatal() {
        let mut venue = venue_with_order(OrderStatus::Open, 0.0);
        let mut store = MemoryStore::new();
        let r = reconcile(&mut venue, &mut store, &eth(), tracked("nope", OrderStatus::Open));
        assert!(r.is_err());
        assert_eq!(store.writes(), 0);
    }

    #[test]
    fn open_without_id_is_cleared() {
        let mut venue = venue_with_order(OrderStatus::Open, 0.0);
        let mut store = MemoryStore::new();
        let mut stick = tracked("42", OrderStatus::Open);
        stick.order_id = None;
        let r = reconcile(&mut venue, &mut store, &eth(), stick).unwrap();
        assert_eq!(r.action, ReconcileAction::Untracked);
        assert!(r.stick.is_empty());
    }
}
