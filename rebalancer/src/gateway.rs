//! Tagged venue operations and the logging / retrying broker wrapper.
//!
//! Every call the engine makes goes through [`Venue`], which logs
//! `Calling: <op> (<args>)` and attaches the operation to any failure so the
//! fatal-error boundary can report exactly what was being attempted.

use std::fmt;
use std::thread;
use std::time::Duration;

use log::{info, warn};
use pairbalance::{
    BalanceSnapshot, BookSnapshot, MarketLimits, Order, PairSymbol, Precision, Side,
};
use pairbalance_broker::{Broker, BrokerError};

use crate::error::{Error, Result};

/// A venue operation with its arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayOp {
    Connect,
    SetActiveSymbol {
        symbol: PairSymbol,
    },
    FetchBalance,
    GetLastPrice,
    GetOrderBook,
    GetMarketLimits,
    Normalize {
        value: f64,
        kind: Precision,
    },
    CreateOrder {
        side: Side,
        amount: f64,
        price: f64,
        post_only: bool,
    },
    FetchOrder {
        id: String,
    },
    CancelOrder {
        id: String,
    },
}

impl GatewayOp {
    /// Log label of the operation.
    pub fn label(&self) -> &'static str {
        match self {
            GatewayOp::Connect => "connect",
            GatewayOp::SetActiveSymbol { .. } => "setActiveSymbol",
            GatewayOp::FetchBalance => "fetchBalance",
            GatewayOp::GetLastPrice => "getLastPrice",
            GatewayOp::GetOrderBook => "getOrderBook",
            GatewayOp::GetMarketLimits => "getMarketLimits",
            GatewayOp::Normalize { .. } => "decimalToPrecision",
            GatewayOp::CreateOrder { .. } => "createOrder",
            GatewayOp::FetchOrder { .. } => "fetchOrder",
            GatewayOp::CancelOrder { .. } => "cancelOrder",
        }
    }

    /// Comma-separated arguments, as logged.
    pub fn args(&self) -> String {
        match self {
            GatewayOp::SetActiveSymbol { symbol } => symbol.to_string(),
            GatewayOp::Normalize { value, kind } => format!("{value},{kind}"),
            GatewayOp::CreateOrder {
                side,
                amount,
                price,
                post_only,
            } => format!("{side},{amount},{price},postOnly={post_only}"),
            GatewayOp::FetchOrder { id } | GatewayOp::CancelOrder { id } => id.clone(),
            GatewayOp::Connect
            | GatewayOp::FetchBalance
            | GatewayOp::GetLastPrice
            | GatewayOp::GetOrderBook
            | GatewayOp::GetMarketLimits => String::new(),
        }
    }
}

impl fmt::Display for GatewayOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.label(), self.args())
    }
}

/// Linear backoff retry for failed venue calls. Disabled by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RetryPolicy {
    pub retries: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(retries: u32, backoff: Duration) -> Self {
        Self { retries, backoff }
    }

    /// Wait before retry number `attempt` (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        self.backoff * attempt
    }
}

/// A broker plus the operation tagging, logging and retry policy.
pub struct Venue<B> {
    broker: B,
    retry: RetryPolicy,
}

impl<B: Broker> Venue<B> {
    pub fn new(broker: B) -> Self {
        Self {
            broker,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn broker(&self) -> &B {
        &self.broker
    }

    fn call<T>(
        &mut self,
        op: GatewayOp,
        mut f: impl FnMut(&mut B) -> std::result::Result<T, BrokerError>,
    ) -> Result<T> {
        info!("Calling: {op}");
        let mut attempt = 0;
        loop {
            match f(&mut self.broker) {
                Ok(v) => return Ok(v),
                Err(e) if attempt < self.retry.retries && e.is_retryable() => {
                    attempt += 1;
                    let delay = self.retry.delay(attempt);
                    warn!(
                        "{}: {op} | {e}; retrying in {}s ({attempt}. attempt)",
                        e.class(),
                        delay.as_secs_f64()
                    );
                    thread::sleep(delay);
                }
                Err(source) => {
                    if attempt > 0 {
                        warn!("Max retry reached ({attempt} retries): {op}");
                    }
                    return Err(Error::Gateway { op, source });
                }
            }
        }
    }

    pub fn connect(&mut self) -> Result<()> {
        self.call(GatewayOp::Connect, |b| b.connect())
    }

    pub fn set_active_symbol(&mut self, symbol: &PairSymbol) -> Result<()> {
        let op = GatewayOp::SetActiveSymbol {
            symbol: symbol.clone(),
        };
        self.call(op, |b| b.set_active_symbol(symbol))
    }

    pub fn fetch_balance(&mut self) -> Result<BalanceSnapshot> {
        self.call(GatewayOp::FetchBalance, |b| b.fetch_balance())
    }

    pub fn last_price(&mut self) -> Result<f64> {
        self.call(GatewayOp::GetLastPrice, |b| b.last_price())
    }

    pub fn order_book(&mut self) -> Result<BookSnapshot> {
        self.call(GatewayOp::GetOrderBook, |b| b.order_book())
    }

    pub fn market_limits(&mut self) -> Result<MarketLimits> {
        self.call(GatewayOp::GetMarketLimits, |b| b.market_limits())
    }

    pub fn normalize(&mut self, value: f64, kind: Precision) -> Result<f64> {
        self.call(GatewayOp::Normalize { value, kind }, |b| b.normalize(value, kind))
    }

    pub fn create_order(
        &mut self,
        side: Side,
        amount: f64,
        price: f64,
        post_only: bool,
    ) -> Result<Order> {
        let op = GatewayOp::CreateOrder {
            side,
            amount,
            price,
            post_only,
        };
        self.call(op, |b| b.create_order(side, amount, price, post_only))
    }

    pub fn fetch_order(&mut self, id: &str) -> Result<Order> {
        let op = GatewayOp::FetchOrder { id: id.to_string() };
        self.call(op, |b| b.fetch_order(id))
    }

    pub fn cancel_order(&mut self, id: &str) -> Result<()> {
        let op = GatewayOp::CancelOrder { id: id.to_string() };
        self.call(op, |b| b.cancel_order(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pairbalance_broker::mock::{MockBroker, MockMarket, MockOp};

    fn eth() -> PairSymbol {
        "ETH/USDT".parse().unwrap()
    }

    fn venue() -> Venue<MockBroker> {
        let broker = MockBroker::builder()
            .with_market(&eth(), MockMarket::new(1400.0))
            .build();
        let mut venue = Venue::new(broker);
        venue.connect().unwrap();
        venue.set_active_symbol(&eth()).unwrap();
        venue
    }

    #[test]
    fn op_display_has_label_and_args() {
        let op = GatewayOp::CreateOrder {
            side: Side::Buy,
            amount: 0.4285,
            price: 1400.0,
            post_only: true,
        };
        assert_eq!(op.to_string(), "createOrder (buy,0.4285,1400,postOnly=true)");
        assert_eq!(GatewayOp::FetchBalance.to_string(), "fetchBalance ()");
    }

    #[test]
    fn failure_carries_operation() {
        let mut venue = venue();
        venue.broker().fail_on(MockOp::FetchOrder);
        let err = venue.fetch_order("42").unwrap_err();
        match err {
            Error::Gateway { op, source } => {
                assert_eq!(op, GatewayOp::FetchOrder { id: "42".into() });
                assert!(matches!(source, BrokerError::Connection(_)));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn error_message_names_class_and_op() {
        let mut venue = venue();
        venue.broker().fail_on(MockOp::LastPrice);
        let msg = venue.last_price().unwrap_err().to_string();
        assert!(msg.starts_with("NetworkError: getLastPrice ()"), "{msg}");
    }

    #[test]
    fn retry_recovers_from_transient_failures() {
        let mut venue = venue().with_retry(RetryPolicy::new(2, Duration::ZERO));
        venue.broker().fail_times(MockOp::OrderBook, 2);
        assert!(venue.order_book().is_ok());
    }

    #[test]
    fn retry_gives_up_after_budget() {
        let mut venue = venue().with_retry(RetryPolicy::new(2, Duration::ZERO));
        venue.broker().fail_on(MockOp::OrderBook);
        assert!(venue.order_book().is_err());
    }

    #[test]
    fn unexpected_errors_are_not_retried() {
        let broker = MockBroker::builder().build();
        // Not connected: an Unexpected-class failure
        let mut venue =
            Venue::new(broker).with_retry(RetryPolicy::new(5, Duration::from_secs(60)));
        assert!(venue.fetch_balance().is_err());
    }

    #[test]
    fn backoff_is_linear() {
        let p = RetryPolicy::new(3, Duration::from_millis(1000));
        assert_eq!(p.delay(1), Duration::from_secs(1));
        assert_eq!(p.delay(3), Duration::from_secs(3));
    }
}
