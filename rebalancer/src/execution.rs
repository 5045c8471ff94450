//! Execution state machine: size, guard, place, re-price on post-only rejection.
//!
//! ```text
//! SIZING -> PLACING -> ACCEPTED
//!              ^    \
//!              |     -> REJECTED (post-only) -> re-price
//!              +---------------------------------+
//! ```
//!
//! Two re-pricing strategies exist. The threshold path re-sizes against the
//! top of the live book on the order's own (maker) side; the standalone
//! [`place`] helper steps the price a fixed percentage away from the book.
//! Both loops are bounded by `max_retries` and give up with
//! [`ExecutionOutcome::Abandoned`].
//!
//! Stored sticks change only through [`commit`] (the stick implied by an
//! order) and [`clear`] (the empty stick a closed order implies).

use std::fmt;

use log::{info, warn};
use pairbalance::{
    BalanceSnapshot, LimitBreach, Order, PairConfig, PairSymbol, Precision, Side, StickState,
    improves, reprice_after_rejection, size_order,
};
use pairbalance_broker::Broker;
use serde::Serialize;

use crate::error::Result;
use crate::gateway::Venue;
use crate::store::StickStore;

/// Why post-only re-pricing stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AbandonReason {
    /// Rejected more times than allowed
    RetryLimit,
    /// The book had no level on the order's side to re-price to
    EmptyBook,
    /// Re-pricing could not move the price on the tick grid
    NoImprovement,
}

impl fmt::Display for AbandonReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbandonReason::RetryLimit => f.write_str("retry limit reached"),
            AbandonReason::EmptyBook => f.write_str("empty book"),
            AbandonReason::NoImprovement => f.write_str("price cannot improve"),
        }
    }
}

/// Result of one execution attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    /// The venue accepted the order; `stick` is what was persisted.
    Placed {
        order: Order,
        stick: StickState,
        /// Post-only rejections before acceptance
        rejections: u32,
    },
    /// A venue minimum would be violated. Nothing was placed.
    Halted(LimitBreach),
    /// Post-only re-pricing gave up. Nothing is tracked.
    Abandoned {
        side: Side,
        reason: AbandonReason,
        attempts: u32,
    },
}

/// Per-cycle inputs of the threshold path.
#[derive(Debug, Clone, Copy)]
pub struct ExecutionContext<'a> {
    pub pair: &'a PairConfig,
    pub balance: &'a BalanceSnapshot,
    pub post_only: bool,
    pub max_retries: u32,
}

/// Persist the stick implied by `order`.
pub fn commit<S: StickStore>(
    store: &mut S,
    symbol: &PairSymbol,
    order: &Order,
) -> Result<StickState> {
    write_stick(store, symbol, StickState::from_order(order))
}

/// Persist the empty stick, the same value a closed order commits.
pub fn clear<S: StickStore>(store: &mut S, symbol: &PairSymbol) -> Result<StickState> {
    write_stick(store, symbol, StickState::empty())
}

// The only store write in the crate.
fn write_stick<S: StickStore>(
    store: &mut S,
    symbol: &PairSymbol,
    stick: StickState,
) -> Result<StickState> {
    store.write(symbol, &stick)?;
    Ok(stick)
}

/// Size and place the corrective order at `price`, re-pricing at the top of
/// the book after each post-only rejection.
///
/// Sizing is redone at every new price against the cycle's balance snapshot,
/// and the guard rails are re-checked before every placement.
pub fn execute<B: Broker, S: StickStore>(
    venue: &mut Venue<B>,
    store: &mut S,
    ctx: ExecutionContext<'_>,
    price: f64,
) -> Result<ExecutionOutcome> {
    let symbol = &ctx.pair.symbol;
    let limits = venue.market_limits()?;
    let mut price = price;
    let mut rejections = 0;

    loop {
        let sizing = size_order(ctx.balance, ctx.pair, price);
        info!(
            "{symbol}: total base {} ({} in quote), side {}, amount {}",
            ctx.balance.total_base(),
            ctx.balance.base_value(price),
            sizing.side,
            sizing.amount
        );

        let price_n = venue.normalize(price, Precision::Price)?;
        let amount = venue.normalize(sizing.amount, Precision::Amount)?;
        info!("{symbol}: price {price_n}, amount {amount}");

        if let Some(breach) = limits.check(amount, price_n) {
            info!("{symbol}: Halt execution: {breach}");
            return Ok(ExecutionOutcome::Halted(breach));
        }

        let order = venue.create_order(sizing.side, amount, price_n, ctx.post_only)?;

        if !order.is_post_only_rejection() {
            info!("{symbol}: {} - {order}", sizing.side);
            let stick = commit(store, symbol, &order)?;
            return Ok(ExecutionOutcome::Placed {
                order,
                stick,
                rejections,
            });
        }

        info!(
            "{symbol}: {} canceled (Taker): {:.8} at {:.2}",
            sizing.side, amount, price_n
        );
        if rejections >= ctx.max_retries {
            warn!(
                "{symbol}: {} still rejected after {rejections} re-prices, giving up this cycle",
                sizing.side
            );
            return Ok(ExecutionOutcome::Abandoned {
                side: sizing.side,
                reason: AbandonReason::RetryLimit,
                attempts: rejections,
            });
        }
        rejections += 1;

        let book = venue.order_book()?;
        match book.maker_price(sizing.side) {
            Some(top) => price = top,
            None => {
                warn!("{symbol}: no {} side in the book to re-price to", sizing.side);
                return Ok(ExecutionOutcome::Abandoned {
                    side: sizing.side,
                    reason: AbandonReason::EmptyBook,
                    attempts: rejections,
                });
            }
        }
    }
}

/// Parameters of a standalone limit order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaceRequest {
    pub side: Side,
    pub amount: f64,
    pub price: f64,
    /// Re-price step, percent of price
    pub tick_percentage: f64,
    pub post_only: bool,
    pub max_retries: u32,
}

/// Place a limit order outside the threshold path.
///
/// After a post-only rejection a buy is retried `tick_percentage` percent
/// lower and a sell that much higher, so the price moves strictly away from
/// the book on every retry. Stops when the tick grid swallows the step.
pub fn place<B: Broker, S: StickStore>(
    venue: &mut Venue<B>,
    store: &mut S,
    symbol: &PairSymbol,
    req: PlaceRequest,
) -> Result<ExecutionOutcome> {
    let side = req.side;
    let amount = venue.normalize(req.amount, Precision::Amount)?;
    let mut price = venue.normalize(req.price, Precision::Price)?;
    let mut rejections = 0;

    loop {
        let order = venue.create_order(side, amount, price, req.post_only)?;

        if !order.is_post_only_rejection() {
            info!("{symbol}: {side} - {order}");
            let stick = commit(store, symbol, &order)?;
            return Ok(ExecutionOutcome::Placed {
                order,
                stick,
                rejections,
            });
        }

        info!("{symbol}: {side} canceled (Taker): {amount:.8} at {price:.2}");
        if rejections >= req.max_retries {
            warn!("{symbol}: {side} still rejected after {rejections} re-prices, giving up");
            return Ok(ExecutionOutcome::Abandoned {
                side,
                reason: AbandonReason::RetryLimit,
                attempts: rejections,
            });
        }
        rejections += 1;

        let next = venue.normalize(
            reprice_after_rejection(side, price, req.tick_percentage),
            Precision::Price,
        )?;
        if !improves(side, price, next) {
            warn!("{symbol}: re-price from {price} does not move on the tick grid, giving up");
            return Ok(ExecutionOutcome::Abandoned {
                side,
                reason: AbandonReason::NoImprovement,
                attempts: rejections,
            });
        }
        price = next;
    }
}

/// Buy helper: see [`place`].
pub fn buy<B: Broker, S: StickStore>(
    venue: &mut Venue<B>,
    store: &mut S,
    symbol: &PairSymbol,
    req: PlaceRequest,
) -> Result<ExecutionOutcome> {
    place(venue, store, symbol, PlaceRequest { side: Side::Buy, ..req })
}

/// Sell helper: see [`place`].
pub fn sell<B: Broker, S: StickStore>(
    venue: &mut Venue<B>,
    store: &mut S,
    symbol: &PairSymbol,
    req: PlaceRequest,
) -> Result<ExecutionOutcome> {
    place(venue, store, symbol, PlaceRequest { side: Side::Sell, ..req })
}
