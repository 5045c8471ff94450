//! # pairbalance
//!
//! Decision core of a per-pair spot rebalancing agent.
//!
//! For each configured pair the agent keeps the quote-currency value of the
//! base holding near a fixed target. This crate holds the deterministic part
//! of that loop: domain types, the threshold check, order sizing, venue
//! guard rails, and the rule that maps a venue order onto the persisted
//! per-pair "stick". I/O lives in `pairbalance-broker` (venues) and
//! `pairbalance-rebalancer` (engine, store, scheduler).
//!
//! ## Quick Start
//!
//! ```
//! use pairbalance::{
//!     evaluate, size_order, BalanceSnapshot, CurrencyBalance, MarketLimits, PairConfig, Side,
//! };
//!
//! let pair = PairConfig::fixed("ETH/USDT".parse().unwrap(), 2000.0, 2.0);
//! let balance = BalanceSnapshot::new(
//!     pair.symbol.clone(),
//!     CurrencyBalance::new(1.0, 0.0),     // 1 ETH
//!     CurrencyBalance::new(1000.0, 0.0),  // 1000 USDT
//! );
//!
//! // 1 ETH at 1400 is worth 1400, 600 short of the 2000 target
//! let eval = evaluate(&balance, &pair, 1400.0);
//! assert!(eval.should_execute);
//!
//! let sizing = size_order(&balance, &pair, 1400.0);
//! assert_eq!(sizing.side, Side::Buy);
//!
//! let limits = MarketLimits { amount_min: Some(0.001), price_min: None, cost_min: Some(10.0) };
//! assert!(limits.check(sizing.amount, 1400.0).is_none());
//! ```
//!
//! ## Stick lifecycle
//!
//! ```
//! use pairbalance::{Order, OrderStatus, Side, StickState};
//!
//! let mut order = Order {
//!     id: "7".into(),
//!     side: Side::Sell,
//!     amount: 0.25,
//!     price: 1500.0,
//!     status: OrderStatus::Open,
//!     fee: None,
//!     filled: 0.0,
//!     datetime: None,
//!     post_only: true,
//! };
//!
//! // Open orders are tracked...
//! assert!(StickState::from_order(&order).is_open());
//!
//! // ...closed ones clear the stick.
//! order.status = OrderStatus::Closed;
//! assert!(StickState::from_order(&order).is_empty());
//! ```

mod balance;
pub mod condition;
mod error;
mod limits;
mod order;
mod pair;
pub mod precision;
mod side;
pub mod sizing;
mod snapshot;
mod stick;
mod types;

// Re-export public API
pub use balance::{BalanceSnapshot, CurrencyBalance};
pub use condition::{Evaluation, evaluate, should_execute};
pub use error::ValidationError;
pub use limits::{LimitBreach, MarketLimits};
pub use order::{Fee, Order, OrderStatus};
pub use pair::{ConditionType, MinDiffType, PairConfig};
pub use side::Side;
pub use sizing::{OrderSizing, improves, reprice_after_rejection, size_order};
pub use snapshot::{BookSnapshot, LevelSnapshot};
pub use stick::StickState;
pub use types::{PairSymbol, Precision};
