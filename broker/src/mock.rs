//! Mock broker for testing: implements the `Broker` trait with scriptable venue state.
//!
//! Use this in integration tests to simulate venue responses without network calls.
//! Post-only orders priced through the book come back `canceled` the way a
//! maker-only venue rejects them.
//!
//! ```
//! use pairbalance::{BookSnapshot, Side};
//! use pairbalance_broker::Broker;
//! use pairbalance_broker::mock::{MockBroker, MockMarket};
//!
//! let eth = "ETH/USDT".parse().unwrap();
//! let mut broker = MockBroker::builder()
//!     .with_market(
//!         &eth,
//!         MockMarket::new(1400.0)
//!             .with_book(BookSnapshot::from_pairs(&[[1399.5, 1.0]], &[[1400.5, 1.0]])),
//!     )
//!     .with_balance("ETH", 1.0, 0.0)
//!     .with_balance("USDT", 1000.0, 0.0)
//!     .build();
//!
//! broker.connect().unwrap();
//! broker.set_active_symbol(&eth).unwrap();
//! let order = broker.create_order(Side::Buy, 0.1, 1401.0, true).unwrap();
//! assert!(order.is_post_only_rejection());
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use pairbalance::precision::{Rounding, round_to_step};
use pairbalance::{
    BalanceSnapshot, BookSnapshot, CurrencyBalance, Fee, MarketLimits, Order, OrderStatus,
    PairSymbol, Precision, Side,
};

use crate::Broker;
use crate::error::BrokerError;

/// How the mock venue handles accepted (non-rejected) orders.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FillMode {
    /// Orders rest on the book unfilled.
    Resting,
    /// Orders are immediately fully filled at the limit price.
    ImmediateFull,
    /// Orders are partially filled (the given fraction, e.g., 0.5 = 50%).
    ImmediatePartial(f64),
}

/// Gateway operations, used to inject failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MockOp {
    SetActiveSymbol,
    FetchBalance,
    LastPrice,
    OrderBook,
    MarketLimits,
    Normalize,
    CreateOrder,
    FetchOrder,
    CancelOrder,
}

impl fmt::Display for MockOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Market data the mock serves for one pair.
#[derive(Clone, Debug)]
pub struct MockMarket {
    pub last_price: f64,
    pub book: BookSnapshot,
    pub limits: MarketLimits,
    pub price_step: f64,
    pub amount_step: f64,
}

impl MockMarket {
    /// Market at `last_price` with an empty book, no limits, 0.01 tick and
    /// 0.0001 step.
    pub fn new(last_price: f64) -> Self {
        Self {
            last_price,
            book: BookSnapshot::default(),
            limits: MarketLimits::default(),
            price_step: 0.01,
            amount_step: 0.0001,
        }
    }

    pub fn with_book(mut self, book: BookSnapshot) -> Self {
        self.book = book;
        self
    }

    pub fn with_limits(mut self, limits: MarketLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_steps(mut self, price_step: f64, amount_step: f64) -> Self {
        self.price_step = price_step;
        self.amount_step = amount_step;
        self
    }
}

/// A recorded order submission for assertion in tests.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordedOrder {
    pub symbol: PairSymbol,
    pub side: Side,
    pub amount: f64,
    pub price: f64,
    pub post_only: bool,
}

/// Builder for `MockBroker`.
pub struct MockBrokerBuilder {
    fill_mode: FillMode,
    fee_rate: f64,
    markets: HashMap<PairSymbol, MockMarket>,
    balances: HashMap<String, CurrencyBalance>,
}

impl MockBrokerBuilder {
    pub fn fill_mode(mut self, mode: FillMode) -> Self {
        self.fill_mode = mode;
        self
    }

    /// Fee charged on filled quantity (buys pay in base, sells in quote).
    pub fn fee_rate(mut self, rate: f64) -> Self {
        self.fee_rate = rate;
        self
    }

    pub fn with_market(mut self, symbol: &PairSymbol, market: MockMarket) -> Self {
        self.markets.insert(symbol.clone(), market);
        self
    }

    pub fn with_balance(mut self, currency: &str, free: f64, used: f64) -> Self {
        self.balances
            .insert(currency.to_string(), CurrencyBalance::new(free, used));
        self
    }

    pub fn build(self) -> MockBroker {
        MockBroker {
            connected: false,
            active: None,
            state: Mutex::new(MockState {
                fill_mode: self.fill_mode,
                fee_rate: self.fee_rate,
                markets: self.markets,
                balances: self.balances,
                orders: HashMap::new(),
                submitted: Vec::new(),
                cancelled: Vec::new(),
                next_order_id: 1,
                fail_on: None,
            }),
        }
    }
}

struct MockState {
    fill_mode: FillMode,
    fee_rate: f64,
    markets: HashMap<PairSymbol, MockMarket>,
    balances: HashMap<String, CurrencyBalance>,
    orders: HashMap<String, Order>,
    submitted: Vec<RecordedOrder>,
    cancelled: Vec<String>,
    next_order_id: u64,
    /// Operation to fail and how many more times
    fail_on: Option<(MockOp, u32)>,
}

/// A scriptable in-memory venue.
pub struct MockBroker {
    connected: bool,
    active: Option<PairSymbol>,
    state: Mutex<MockState>,
}

impl MockBroker {
    pub fn builder() -> MockBrokerBuilder {
        MockBrokerBuilder {
            fill_mode: FillMode::Resting,
            fee_rate: 0.0,
            markets: HashMap::new(),
            balances: HashMap::new(),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        // A panicking test thread must not hide the venue state from the next assertion.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Get all orders that were submitted (for assertion in tests).
    pub fn submitted_orders(&self) -> Vec<RecordedOrder> {
        self.state().submitted.clone()
    }

    /// Ids passed to `cancel_order`, in call order.
    pub fn cancelled_orders(&self) -> Vec<String> {
        self.state().cancelled.clone()
    }

    /// Make every following call of `op` fail with a connection error.
    pub fn fail_on(&self, op: MockOp) {
        self.fail_times(op, u32::MAX);
    }

    /// Make the next `times` calls of `op` fail with a connection error.
    pub fn fail_times(&self, op: MockOp, times: u32) {
        self.state().fail_on = Some((op, times));
    }

    pub fn clear_failure(&self) {
        self.state().fail_on = None;
    }

    /// Overwrite a currency balance (simulating settlement of a fill).
    pub fn set_balance(&self, currency: &str, free: f64, used: f64) {
        self.state()
            .balances
            .insert(currency.to_string(), CurrencyBalance::new(free, used));
    }

    /// Seed an order as if it had been placed in an earlier session.
    pub fn insert_order(&self, order: Order) {
        self.state().orders.insert(order.id.clone(), order);
    }

    /// Move a known order to a new status (simulating venue-side fills or cancels).
    pub fn set_order_status(&self, id: &str, status: OrderStatus, filled: f64) {
        if let Some(o) = self.state().orders.get_mut(id) {
            o.status = status;
            o.filled = filled;
        }
    }

    /// Current venue-side view of an order.
    pub fn order(&self, id: &str) -> Option<Order> {
        self.state().orders.get(id).cloned()
    }

    fn check(&self, op: MockOp) -> Result<(), BrokerError> {
        if !self.connected {
            return Err(BrokerError::NotConnected);
        }
        let mut state = self.state();
        match state.fail_on {
            Some((failing, remaining)) if failing == op && remaining > 0 => {
                state.fail_on = Some((failing, remaining - 1));
                Err(BrokerError::Connection(format!("mock: injected {op} failure")))
            }
            _ => Ok(()),
        }
    }

    fn active(&self) -> Result<&PairSymbol, BrokerError> {
        self.active.as_ref().ok_or(BrokerError::NoActiveSymbol)
    }

    fn market(&self) -> Result<MockMarket, BrokerError> {
        let symbol = self.active()?;
        self.state()
            .markets
            .get(symbol)
            .cloned()
            .ok_or_else(|| BrokerError::InvalidSymbol(symbol.to_string()))
    }
}

impl Broker for MockBroker {
    fn connect(&mut self) -> Result<(), BrokerError> {
        self.connected = true;
        Ok(())
    }

    fn set_active_symbol(&mut self, symbol: &PairSymbol) -> Result<(), BrokerError> {
        self.check(MockOp::SetActiveSymbol)?;
        if !self.state().markets.contains_key(symbol) {
            return Err(BrokerError::InvalidSymbol(symbol.to_string()));
        }
        self.active = Some(symbol.clone());
        Ok(())
    }

    fn fetch_balance(&self) -> Result<BalanceSnapshot, BrokerError> {
        self.check(MockOp::FetchBalance)?;
        let symbol = self.active()?;
        let state = self.state();
        let get = |c: &str| state.balances.get(c).copied().unwrap_or_default();
        Ok(BalanceSnapshot::new(
            symbol.clone(),
            get(symbol.base()),
            get(symbol.quote()),
        ))
    }

    fn last_price(&self) -> Result<f64, BrokerError> {
        self.check(MockOp::LastPrice)?;
        Ok(self.market()?.last_price)
    }

    fn order_book(&self) -> Result<BookSnapshot, BrokerError> {
        self.check(MockOp::OrderBook)?;
        Ok(self.market()?.book)
    }

    fn market_limits(&self) -> Result<MarketLimits, BrokerError> {
        self.check(MockOp::MarketLimits)?;
        Ok(self.market()?.limits)
    }

    fn normalize(&self, value: f64, kind: Precision) -> Result<f64, BrokerError> {
        self.check(MockOp::Normalize)?;
        let market = self.market()?;
        Ok(match kind {
            Precision::Price => round_to_step(value, market.price_step, Rounding::Nearest),
            Precision::Amount => round_to_step(value, market.amount_step, Rounding::Down),
        })
    }

    fn create_order(
        &self,
        side: Side,
        amount: f64,
        price: f64,
        post_only: bool,
    ) -> Result<Order, BrokerError> {
        self.check(MockOp::CreateOrder)?;
        let symbol = self.active()?.clone();
        let market = self.market()?;
        let mut state = self.state();

        state.submitted.push(RecordedOrder {
            symbol: symbol.clone(),
            side,
            amount,
            price,
            post_only,
        });

        let id = state.next_order_id.to_string();
        state.next_order_id += 1;

        let (status, filled) = if post_only && market.book.crosses(side, price) {
            (OrderStatus::Canceled, 0.0)
        } else {
            match state.fill_mode {
                FillMode::Resting => (OrderStatus::Open, 0.0),
                FillMode::ImmediateFull => (OrderStatus::Closed, amount),
                FillMode::ImmediatePartial(frac) => (OrderStatus::Open, amount * frac),
            }
        };

        let fee = (state.fee_rate > 0.0 && filled > 0.0).then(|| match side {
            Side::Buy => Fee {
                cost: filled * state.fee_rate,
                currency: symbol.base().to_string(),
            },
            Side::Sell => Fee {
                cost: filled * price * state.fee_rate,
                currency: symbol.quote().to_string(),
            },
        });

        let order = Order {
            id: id.clone(),
            side,
            amount,
            price,
            status,
            fee,
            filled,
            datetime: Some(Utc::now()),
            post_only,
        };
        state.orders.insert(id, order.clone());
        Ok(order)
    }

    fn fetch_order(&self, id: &str) -> Result<Order, BrokerError> {
        self.check(MockOp::FetchOrder)?;
        self.active()?;
        self.state()
            .orders
            .get(id)
            .cloned()
            .ok_or_else(|| BrokerError::OrderNotFound(id.to_string()))
    }

    fn cancel_order(&self, id: &str) -> Result<(), BrokerError> {
        self.check(MockOp::CancelOrder)?;
        self.active()?;
        let mut state = self.state();
        state.cancelled.push(id.to_string());
        let order = state
            .orders
            .get_mut(id)
            .ok_or_else(|| BrokerError::OrderNotFound(id.to_string()))?;
        if order.status.is_terminal() {
            return Err(BrokerError::Order(format!(
                "order {id} is already {}",
                order.status
            )));
        }
        order.status = OrderStatus::Canceled;
        Ok(())
    }
}
