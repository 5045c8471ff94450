//! One rebalancing cycle for one pair.
//!
//! reconcile -> evaluate -> (cancel stale order) -> execute. The stick is
//! threaded through the cycle as a value; the store is the only place it
//! lives between cycles.

use log::info;
use pairbalance::{BalanceSnapshot, Evaluation, PairConfig, PairSymbol, Side, StickState, evaluate};
use pairbalance_broker::Broker;

use crate::error::Result;
use crate::execution::{self, ExecutionContext, ExecutionOutcome, PlaceRequest};
use crate::gateway::Venue;
use crate::notify::{Notice, Notifier};
use crate::reconcile::{self, ReconcileAction, Reconciled};
use crate::store::StickStore;

/// Engine-wide execution settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    pub post_only: bool,
    pub max_post_only_retries: u32,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            post_only: true,
            max_post_only_retries: 10,
        }
    }
}

/// What one cycle did for one pair.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub symbol: PairSymbol,
    pub reconcile: ReconcileAction,
    pub reference_price: Option<f64>,
    pub price: f64,
    pub evaluation: Evaluation,
    /// Id of the stale order cancelled before re-sizing
    pub cancelled: Option<String>,
    /// `None` when the threshold was not exceeded
    pub outcome: Option<ExecutionOutcome>,
}

/// Read-only view of a pair.
#[derive(Debug, Clone, PartialEq)]
pub struct PairStatus {
    pub balance: BalanceSnapshot,
    pub price: f64,
    pub evaluation: Evaluation,
    pub stick: StickState,
}

/// The rebalancing engine: a venue, a stick store and a notification sink.
pub struct Engine<B, S, N> {
    venue: Venue<B>,
    store: S,
    notifier: N,
    options: EngineOptions,
}

impl<B: Broker, S: StickStore, N: Notifier> Engine<B, S, N> {
    pub fn new(venue: Venue<B>, store: S, notifier: N, options: EngineOptions) -> Self {
        Self {
            venue,
            store,
            notifier,
            options,
        }
    }

    pub fn connect(&mut self) -> Result<()> {
        self.venue.connect()
    }

    pub fn broker(&self) -> &B {
        self.venue.broker()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn notify(&mut self, notice: Notice) {
        self.notifier.notify(&notice);
    }

    /// Run one full cycle for `pair`.
    pub fn run_pair(&mut self, pair: &PairConfig) -> Result<CycleReport> {
        let symbol = &pair.symbol;
        let reconciled = self.reconcile_pair(pair)?;
        let stick = reconciled.stick;

        let balance = self.venue.fetch_balance()?;
        let price = self.venue.last_price()?;
        let evaluation = evaluate(&balance, pair, price);
        info!(
            "{symbol}: value {} vs target {}, diff {} (min {}), shouldExecute: {}",
            evaluation.value_diff,
            pair.condition_value,
            evaluation.total_diff_value,
            pair.min_diff_value,
            evaluation.should_execute
        );

        let mut report = CycleReport {
            symbol: symbol.clone(),
            reconcile: reconciled.action,
            reference_price: reconciled.reference_price,
            price,
            evaluation,
            cancelled: None,
            outcome: None,
        };
        if !evaluation.should_execute {
            return Ok(report);
        }

        if let Some(id) = stick.open_order_id() {
            self.cancel_tracked(symbol, id)?;
            report.cancelled = Some(id.to_string());
        }

        let ctx = ExecutionContext {
            pair,
            balance: &balance,
            post_only: self.options.post_only,
            max_retries: self.options.max_post_only_retries,
        };
        let outcome = execution::execute(&mut self.venue, &mut self.store, ctx, price)?;
        self.announce(symbol, &outcome);
        report.outcome = Some(outcome);
        Ok(report)
    }

    /// Select the pair and reconcile its stored stick.
    pub fn reconcile_pair(&mut self, pair: &PairConfig) -> Result<Reconciled> {
        self.venue.set_active_symbol(&pair.symbol)?;
        let stick = self.store.read(&pair.symbol)?;
        reconcile::reconcile(&mut self.venue, &mut self.store, &pair.symbol, stick)
    }

    /// Balance, price, evaluation and stored stick, without side effects.
    pub fn status(&mut self, pair: &PairConfig) -> Result<PairStatus> {
        self.venue.set_active_symbol(&pair.symbol)?;
        let stick = self.store.read(&pair.symbol)?;
        let balance = self.venue.fetch_balance()?;
        let price = self.venue.last_price()?;
        Ok(PairStatus {
            evaluation: evaluate(&balance, pair, price),
            balance,
            price,
            stick,
        })
    }

    /// Place a standalone order with percentage re-pricing.
    ///
    /// The pair is reconciled first; an order it still tracks as open is
    /// cancelled so the new order is the only one live.
    pub fn place(
        &mut self,
        pair: &PairConfig,
        side: Side,
        amount: f64,
        price: f64,
    ) -> Result<ExecutionOutcome> {
        let reconciled = self.reconcile_pair(pair)?;
        if let Some(id) = reconciled.stick.open_order_id() {
            self.cancel_tracked(&pair.symbol, id)?;
        }
        let req = PlaceRequest {
            side,
            amount,
            price,
            tick_percentage: pair.post_only_tick_percentage,
            post_only: self.options.post_only,
            max_retries: self.options.max_post_only_retries,
        };
        let outcome = match side {
            Side::Buy => execution::buy(&mut self.venue, &mut self.store, &pair.symbol, req)?,
            Side::Sell => execution::sell(&mut self.venue, &mut self.store, &pair.symbol, req)?,
        };
        self.announce(&pair.symbol, &outcome);
        Ok(outcome)
    }

    fn cancel_tracked(&mut self, symbol: &PairSymbol, id: &str) -> Result<()> {
        info!("{symbol}: cancelling order {id} before placing a new one");
        self.venue.cancel_order(id)?;
        execution::clear(&mut self.store, symbol)?;
        self.notifier.notify(&Notice::Canceled {
            symbol: symbol.clone(),
            order_id: id.to_string(),
        });
        Ok(())
    }

    fn announce(&mut self, symbol: &PairSymbol, outcome: &ExecutionOutcome) {
        let notice = match outcome {
            ExecutionOutcome::Placed { order, .. } => Notice::Executed {
                symbol: symbol.clone(),
                order: order.clone(),
            },
            ExecutionOutcome::Halted(breach) => Notice::Halted {
                symbol: symbol.clone(),
                breach: *breach,
            },
            ExecutionOutcome::Abandoned {
                side,
                reason,
                attempts,
            } => Notice::Abandoned {
                symbol: symbol.clone(),
                side: *side,
                reason: *reason,
                attempts: *attempts,
            },
        };
        self.notifier.notify(&notice);
    }
}
