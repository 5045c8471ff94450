//! Exchange gateway trait and implementations for pairbalance.
//!
//! Provides a generic `Broker` trait that abstracts over spot venues.
//! Implementations:
//!
//! - **Mock** ([`mock::MockBroker`]): scriptable in-memory venue for tests
//! - **Binance** (feature `binance`): Binance spot REST API
//!
//! All calls are blocking and meant to be issued sequentially by a single
//! engine: the venue connection and its rate budget are shared.

pub mod error;
pub mod mock;

#[cfg(feature = "binance")]
pub mod binance;

pub use error::{BrokerError, ErrorClass};

use pairbalance::{
    BalanceSnapshot, BookSnapshot, MarketLimits, Order, PairSymbol, Precision, Side,
};

/// A venue connection scoped to one active trading pair at a time.
pub trait Broker {
    /// Connect and load market metadata.
    fn connect(&mut self) -> Result<(), BrokerError>;

    /// Select the pair that every following call refers to.
    fn set_active_symbol(&mut self, symbol: &PairSymbol) -> Result<(), BrokerError>;

    /// Balances of the active pair's base and quote currency only.
    fn fetch_balance(&self) -> Result<BalanceSnapshot, BrokerError>;

    /// Last traded price of the active pair.
    fn last_price(&self) -> Result<f64, BrokerError>;

    /// Current order book of the active pair.
    fn order_book(&self) -> Result<BookSnapshot, BrokerError>;

    /// Venue minimums for the active pair.
    fn market_limits(&self) -> Result<MarketLimits, BrokerError>;

    /// Round a price (nearest tick) or amount (truncate to step) to venue precision.
    fn normalize(&self, value: f64, kind: Precision) -> Result<f64, BrokerError>;

    /// Place a limit order. A post-only order that would have taken comes
    /// back with status `canceled` and `post_only == true`.
    fn create_order(
        &self,
        side: Side,
        amount: f64,
        price: f64,
        post_only: bool,
    ) -> Result<Order, BrokerError>;

    /// Current state of an order on the active pair.
    fn fetch_order(&self, id: &str) -> Result<Order, BrokerError>;

    /// Cancel an open order on the active pair.
    fn cancel_order(&self, id: &str) -> Result<(), BrokerError>;
}
