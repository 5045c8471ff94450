//! Binance-specific API response types and their mapping onto pairbalance types.

use chrono::DateTime;
use pairbalance::{BookSnapshot, Fee, LevelSnapshot, MarketLimits, Order, OrderStatus, Side};
use serde::Deserialize;

use crate::error::BrokerError;

/// Binance account balance entry.
#[derive(Debug, Deserialize)]
pub struct BalanceInfo {
    pub asset: String,
    pub free: String,
    pub locked: String,
}

/// Binance account info response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInfo {
    pub balances: Vec<BalanceInfo>,
    #[serde(default)]
    pub can_trade: bool,
}

/// Latest price (GET /api/v3/ticker/price).
#[derive(Debug, Deserialize)]
pub struct TickerPrice {
    pub symbol: String,
    pub price: String,
}

/// Order book depth (GET /api/v3/depth). Levels are `[price, qty]` strings.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Depth {
    pub last_update_id: u64,
    pub bids: Vec<[String; 2]>,
    pub asks: Vec<[String; 2]>,
}

/// Exchange metadata (GET /api/v3/exchangeInfo).
#[derive(Debug, Deserialize)]
pub struct ExchangeInfo {
    pub symbols: Vec<SymbolInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolInfo {
    pub symbol: String,
    pub status: String,
    pub base_asset: String,
    pub quote_asset: String,
    #[serde(default)]
    pub filters: Vec<SymbolFilter>,
}

/// The trading rule filters the agent cares about. Everything else is `Other`.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(tag = "filterType")]
pub enum SymbolFilter {
    #[serde(rename = "PRICE_FILTER")]
    Price {
        #[serde(rename = "minPrice")]
        min_price: String,
        #[serde(rename = "tickSize")]
        tick_size: String,
    },
    #[serde(rename = "LOT_SIZE")]
    LotSize {
        #[serde(rename = "minQty")]
        min_qty: String,
        #[serde(rename = "stepSize")]
        step_size: String,
    },
    #[serde(rename = "NOTIONAL")]
    Notional {
        #[serde(rename = "minNotional")]
        min_notional: String,
    },
    #[serde(rename = "MIN_NOTIONAL")]
    MinNotional {
        #[serde(rename = "minNotional")]
        min_notional: String,
    },
    #[serde(other)]
    Other,
}

/// Precision grid and minimums for one symbol, distilled from its filters.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SymbolRules {
    pub tick_size: f64,
    pub step_size: f64,
    pub limits: MarketLimits,
}

impl SymbolRules {
    /// Binance publishes "0" for a disabled bound; those become `None`.
    pub fn from_filters(filters: &[SymbolFilter]) -> Result<Self, BrokerError> {
        let mut rules = SymbolRules::default();
        for filter in filters {
            match filter {
                SymbolFilter::Price {
                    min_price,
                    tick_size,
                } => {
                    rules.limits.price_min = positive(parse_decimal(min_price, "minPrice")?);
                    rules.tick_size = parse_decimal(tick_size, "tickSize")?;
                }
                SymbolFilter::LotSize { min_qty, step_size } => {
                    rules.limits.amount_min = positive(parse_decimal(min_qty, "minQty")?);
                    rules.step_size = parse_decimal(step_size, "stepSize")?;
                }
                SymbolFilter::Notional { min_notional } | SymbolFilter::MinNotional { min_notional } => {
                    rules.limits.cost_min = positive(parse_decimal(min_notional, "minNotional")?);
                }
                SymbolFilter::Other => {}
            }
        }
        Ok(rules)
    }
}

fn positive(v: f64) -> Option<f64> {
    (v > 0.0).then_some(v)
}

/// One execution of an order.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fill {
    pub price: String,
    pub qty: String,
    pub commission: String,
    pub commission_asset: String,
}

/// Account trade (GET /api/v3/myTrades), used to recover fees of a queried order.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountTrade {
    pub id: u64,
    pub order_id: u64,
    pub price: String,
    pub qty: String,
    pub commission: String,
    pub commission_asset: String,
}

/// Binance order response (POST, GET and DELETE /api/v3/order).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub symbol: String,
    pub order_id: u64,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub orig_qty: String,
    pub status: String,
    pub executed_qty: String,
    #[serde(default)]
    pub cummulative_quote_qty: String,
    #[serde(default)]
    pub side: String,
    #[serde(rename = "type", default)]
    pub order_type: String,
    /// Present on queries
    #[serde(default)]
    pub time: Option<i64>,
    /// Present on submissions
    #[serde(default)]
    pub transact_time: Option<i64>,
    #[serde(default)]
    pub fills: Vec<Fill>,
}

impl OrderResponse {
    /// Convert to a pairbalance order. Fees are taken from `fills`; pass the
    /// symbol's base asset so base-denominated commissions are preferred.
    pub fn to_order(&self, base_asset: &str) -> Result<Order, BrokerError> {
        let side = match self.side.as_str() {
            "BUY" => Side::Buy,
            "SELL" => Side::Sell,
            other => return Err(BrokerError::Parse(format!("unknown order side {other:?}"))),
        };
        let commissions: Vec<(f64, &str)> = self
            .fills
            .iter()
            .map(|f| Ok((parse_decimal(&f.commission, "commission")?, f.commission_asset.as_str())))
            .collect::<Result<_, BrokerError>>()?;

        Ok(Order {
            id: self.order_id.to_string(),
            side,
            amount: parse_decimal(&self.orig_qty, "origQty")?,
            price: parse_decimal(&self.price, "price")?,
            status: map_status(&self.status)?,
            fee: fee_from_commissions(&commissions, base_asset),
            filled: parse_decimal(&self.executed_qty, "executedQty")?,
            datetime: self
                .transact_time
                .or(self.time)
                .and_then(DateTime::from_timestamp_millis),
            post_only: self.order_type == "LIMIT_MAKER",
        })
    }
}

/// Sum commissions, preferring those charged in the base asset.
pub fn fee_from_commissions(commissions: &[(f64, &str)], base_asset: &str) -> Option<Fee> {
    let currency = commissions
        .iter()
        .find(|(_, asset)| *asset == base_asset)
        .or_else(|| commissions.first())
        .map(|(_, asset)| *asset)?;
    let cost = commissions
        .iter()
        .filter(|(_, asset)| *asset == currency)
        .map(|(c, _)| c)
        .sum();
    Some(Fee {
        cost,
        currency: currency.to_string(),
    })
}

/// Map a Binance order status string.
pub fn map_status(status: &str) -> Result<OrderStatus, BrokerError> {
    match status {
        "NEW" | "PARTIALLY_FILLED" | "PENDING_NEW" => Ok(OrderStatus::Open),
        "FILLED" => Ok(OrderStatus::Closed),
        "CANCELED" | "PENDING_CANCEL" | "REJECTED" | "EXPIRED" | "EXPIRED_IN_MATCH" => {
            Ok(OrderStatus::Canceled)
        }
        other => Err(BrokerError::Parse(format!("unknown order status {other:?}"))),
    }
}

/// Convert depth levels, best first.
pub fn book_from_depth(depth: &Depth) -> Result<BookSnapshot, BrokerError> {
    let levels = |side: &[[String; 2]]| -> Result<Vec<LevelSnapshot>, BrokerError> {
        side.iter()
            .map(|[p, q]| {
                Ok(LevelSnapshot {
                    price: parse_decimal(p, "price")?,
                    size: parse_decimal(q, "qty")?,
                })
            })
            .collect()
    };
    Ok(BookSnapshot {
        bids: levels(&depth.bids)?,
        asks: levels(&depth.asks)?,
    })
}

/// Error payload returned with non-2xx responses.
#[derive(Debug, Deserialize)]
pub struct ApiError {
    pub code: i64,
    pub msg: String,
}

impl ApiError {
    /// NEW_ORDER_REJECTED because a LIMIT_MAKER order would have taken.
    pub fn is_post_only_rejection(&self) -> bool {
        self.code == -2010 && self.msg.contains("immediately match")
    }
}

/// Parse a Binance decimal string. Empty strings read as zero.
pub fn parse_decimal(s: &str, field: &str) -> Result<f64, BrokerError> {
    if s.is_empty() {
        return Ok(0.0);
    }
    s.parse()
        .map_err(|_| BrokerError::Parse(format!("{field}: not a number: {s:?}")))
}
