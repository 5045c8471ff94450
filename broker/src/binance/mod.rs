//! Binance spot broker implementation.

pub mod auth;
pub mod client;
pub mod types;

use log::{debug, info};
use pairbalance::precision::{Rounding, decimals_of, round_to_step};
use pairbalance::{
    BalanceSnapshot, BookSnapshot, CurrencyBalance, MarketLimits, Order, OrderStatus, PairSymbol,
    Precision, Side,
};
use zeroize::Zeroizing;

use crate::Broker;
use crate::error::BrokerError;
use client::{BinanceClient, Failure, NewOrder};
use types::{SymbolRules, book_from_depth, fee_from_commissions, parse_decimal};

/// The pair every call is scoped to, with its trading rules.
struct ActiveMarket {
    symbol: PairSymbol,
    venue_symbol: String,
    rules: SymbolRules,
}

/// Binance spot broker implementing the generic Broker trait.
///
/// Uses REST API for all operations. Blocking (sync) via reqwest::blocking.
/// Trading rules are loaded from `exchangeInfo` whenever the active symbol
/// changes.
pub struct BinanceBroker {
    api_key: String,
    secret_key: Zeroizing<String>,
    testnet: bool,
    client: Option<BinanceClient>,
    active: Option<ActiveMarket>,
}

impl BinanceBroker {
    /// Create a new Binance broker handle (not yet connected).
    pub fn new(api_key: &str, secret_key: &str, testnet: bool) -> Self {
        Self {
            api_key: api_key.to_string(),
            secret_key: Zeroizing::new(secret_key.to_string()),
            testnet,
            client: None,
            active: None,
        }
    }

    fn require_client(&self) -> Result<&BinanceClient, BrokerError> {
        self.client.as_ref().ok_or(BrokerError::NotConnected)
    }

    fn require_active(&self) -> Result<(&BinanceClient, &ActiveMarket), BrokerError> {
        let client = self.require_client()?;
        let active = self.active.as_ref().ok_or(BrokerError::NoActiveSymbol)?;
        Ok((client, active))
    }

    fn parse_order_id(id: &str) -> Result<u64, BrokerError> {
        id.parse()
            .map_err(|_| BrokerError::OrderNotFound(format!("{id} (not a Binance order id)")))
    }
}

fn format_decimal(value: f64, step: f64) -> String {
    format!("{:.*}", decimals_of(step) as usize, value)
}

impl Broker for BinanceBroker {
    fn connect(&mut self) -> Result<(), BrokerError> {
        let client = BinanceClient::new(&self.api_key, &self.secret_key, self.testnet);
        client.ping()?;
        info!(
            "Connected to Binance{}",
            if self.testnet { " testnet" } else { "" }
        );
        self.client = Some(client);
        Ok(())
    }

    fn set_active_symbol(&mut self, symbol: &PairSymbol) -> Result<(), BrokerError> {
        if self.active.as_ref().is_some_and(|a| &a.symbol == symbol) {
            return Ok(());
        }
        let client = self.require_client()?;
        let venue_symbol = symbol.joined();
        let info = client.exchange_info(&venue_symbol)?;
        let market = info
            .symbols
            .iter()
            .find(|s| s.symbol == venue_symbol)
            .ok_or_else(|| BrokerError::InvalidSymbol(symbol.to_string()))?;
        let rules = SymbolRules::from_filters(&market.filters)?;
        debug!("{symbol} rules: {rules:?}");
        self.active = Some(ActiveMarket {
            symbol: symbol.clone(),
            venue_symbol,
            rules,
        });
        Ok(())
    }

    fn fetch_balance(&self) -> Result<BalanceSnapshot, BrokerError> {
        let (client, active) = self.require_active()?;
        let info = client.account_info()?;
        let balance_of = |asset: &str| -> Result<CurrencyBalance, BrokerError> {
            match info.balances.iter().find(|b| b.asset == asset) {
                Some(b) => Ok(CurrencyBalance::new(
                    parse_decimal(&b.free, "free")?,
                    parse_decimal(&b.locked, "locked")?,
                )),
                None => Ok(CurrencyBalance::default()),
            }
        };
        Ok(BalanceSnapshot::new(
            active.symbol.clone(),
            balance_of(active.symbol.base())?,
            balance_of(active.symbol.quote())?,
        ))
    }

    fn last_price(&self) -> Result<f64, BrokerError> {
        let (client, active) = self.require_active()?;
        let ticker = client.ticker_price(&active.venue_symbol)?;
        parse_decimal(&ticker.price, "price")
    }

    fn order_book(&self) -> Result<BookSnapshot, BrokerError> {
        let (client, active) = self.require_active()?;
        book_from_depth(&client.depth(&active.venue_symbol)?)
    }

    fn market_limits(&self) -> Result<MarketLimits, BrokerError> {
        let (_, active) = self.require_active()?;
        Ok(active.rules.limits)
    }

    fn normalize(&self, value: f64, kind: Precision) -> Result<f64, BrokerError> {
        let (_, active) = self.require_active()?;
        Ok(match kind {
            Precision::Price => round_to_step(value, active.rules.tick_size, Rounding::Nearest),
            Precision::Amount => round_to_step(value, active.rules.step_size, Rounding::Down),
        })
    }

    fn create_order(
        &self,
        side: Side,
        amount: f64,
        price: f64,
        post_only: bool,
    ) -> Result<Order, BrokerError> {
        let (client, active) = self.require_active()?;
        let quantity = format_decimal(amount, active.rules.step_size);
        let price_str = format_decimal(price, active.rules.tick_size);
        let request = NewOrder {
            symbol: &active.venue_symbol,
            side: match side {
                Side::Buy => "BUY",
                Side::Sell => "SELL",
            },
            quantity: &quantity,
            price: &price_str,
            post_only,
        };

        match client.submit_order(&request) {
            Ok(resp) => resp.to_order(active.symbol.base()),
            // LIMIT_MAKER orders that would take are refused outright; report
            // them the way a venue that cancels them would.
            Err(Failure::Api(e)) if post_only && e.is_post_only_rejection() => {
                debug!("LIMIT_MAKER rejected: {}", e.msg);
                Ok(Order {
                    id: String::new(),
                    side,
                    amount,
                    price,
                    status: OrderStatus::Canceled,
                    fee: None,
                    filled: 0.0,
                    datetime: None,
                    post_only: true,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    fn fetch_order(&self, id: &str) -> Result<Order, BrokerError> {
        let (client, active) = self.require_active()?;
        let order_id = Self::parse_order_id(id)?;
        let resp = client.order_status(&active.venue_symbol, order_id)?;
        let mut order = resp.to_order(active.symbol.base())?;
        // Order queries carry no fills; fees live on the account trades.
        if order.filled > 0.0 {
            let trades = client.order_trades(&active.venue_symbol, order_id)?;
            let commissions = trades
                .iter()
                .map(|t| {
                    Ok((
                        parse_decimal(&t.commission, "commission")?,
                        t.commission_asset.as_str(),
                    ))
                })
                .collect::<Result<Vec<_>, BrokerError>>()?;
            order.fee = fee_from_commissions(&commissions, active.symbol.base());
        }
        Ok(order)
    }

    fn cancel_order(&self, id: &str) -> Result<(), BrokerError> {
        let (client, active) = self.require_active()?;
        client.cancel_order(&active.venue_symbol, Self::parse_order_id(id)?)
    }
}
