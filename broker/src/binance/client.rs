//! Binance REST API client.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use log::debug;
use reqwest::Method;
use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use serde::de::DeserializeOwned;
use zeroize::Zeroizing;

use super::auth;
use super::types::{
    AccountInfo, AccountTrade, ApiError, Depth, ExchangeInfo, OrderResponse, TickerPrice,
};
use crate::error::BrokerError;

const MAINNET_URL: &str = "https://api.binance.com";
const TESTNET_URL: &str = "https://testnet.binance.vision";
const RECV_WINDOW_MS: u64 = 5000;
const DEPTH_LIMIT: u32 = 20;

/// Blocking Binance REST client.
pub struct BinanceClient {
    client: Client,
    api_key: String,
    secret_key: Zeroizing<String>,
    base_url: String,
}

/// Parameters of a new limit order, already formatted to venue precision.
#[derive(Debug)]
pub struct NewOrder<'a> {
    pub symbol: &'a str,
    pub side: &'a str,
    pub quantity: &'a str,
    pub price: &'a str,
    pub post_only: bool,
}

impl NewOrder<'_> {
    /// Post-only orders are LIMIT_MAKER; everything else rests GTC.
    pub fn query(&self) -> String {
        let mut query = format!(
            "symbol={}&side={}&quantity={}&price={}&newOrderRespType=FULL",
            self.symbol, self.side, self.quantity, self.price
        );
        if self.post_only {
            query.push_str("&type=LIMIT_MAKER");
        } else {
            query.push_str("&type=LIMIT&timeInForce=GTC");
        }
        query
    }
}

/// A request the venue refused, with its error payload when one was sent.
pub(crate) enum Failure {
    Api(ApiError),
    Broker(BrokerError),
}

impl From<Failure> for BrokerError {
    fn from(f: Failure) -> Self {
        match f {
            Failure::Api(e) => BrokerError::Exchange {
                code: e.code,
                message: e.msg,
            },
            Failure::Broker(e) => e,
        }
    }
}

impl BinanceClient {
    /// Create a new Binance client.
    pub fn new(api_key: &str, secret_key: &str, testnet: bool) -> Self {
        let base_url = if testnet { TESTNET_URL } else { MAINNET_URL };
        Self::with_base_url(api_key, secret_key, base_url)
    }

    pub fn with_base_url(api_key: &str, secret_key: &str, base_url: &str) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
            api_key: api_key.to_string(),
            secret_key: Zeroizing::new(secret_key.to_string()),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Test connectivity (GET /api/v3/ping).
    pub fn ping(&self) -> Result<(), BrokerError> {
        self.public::<serde_json::Value>("/api/v3/ping", "")?;
        Ok(())
    }

    /// Trading rules for one symbol (GET /api/v3/exchangeInfo).
    pub fn exchange_info(&self, symbol: &str) -> Result<ExchangeInfo, BrokerError> {
        self.public("/api/v3/exchangeInfo", &format!("symbol={symbol}"))
    }

    /// Latest price (GET /api/v3/ticker/price).
    pub fn ticker_price(&self, symbol: &str) -> Result<TickerPrice, BrokerError> {
        self.public("/api/v3/ticker/price", &format!("symbol={symbol}"))
    }

    /// Order book (GET /api/v3/depth).
    pub fn depth(&self, symbol: &str) -> Result<Depth, BrokerError> {
        self.public(
            "/api/v3/depth",
            &format!("symbol={symbol}&limit={DEPTH_LIMIT}"),
        )
    }

    /// Get account information (GET /api/v3/account).
    pub fn account_info(&self) -> Result<AccountInfo, BrokerError> {
        self.signed(Method::GET, "/api/v3/account", "")
            .map_err(Into::into)
    }

    /// Submit a new order (POST /api/v3/order).
    ///
    /// The raw API error is handed back so callers can recognise a
    /// LIMIT_MAKER rejection.
    pub(crate) fn submit_order(&self, order: &NewOrder<'_>) -> Result<OrderResponse, Failure> {
        let query = order.query();
        debug!("Submitting Binance order: {query}");
        self.signed(Method::POST, "/api/v3/order", &query)
    }

    /// Get order status (GET /api/v3/order).
    pub fn order_status(&self, symbol: &str, order_id: u64) -> Result<OrderResponse, BrokerError> {
        self.signed(
            Method::GET,
            "/api/v3/order",
            &format!("symbol={symbol}&orderId={order_id}"),
        )
        .map_err(Into::into)
    }

    /// Trades of one order (GET /api/v3/myTrades).
    pub fn order_trades(
        &self,
        symbol: &str,
        order_id: u64,
    ) -> Result<Vec<AccountTrade>, BrokerError> {
        self.signed(
            Method::GET,
            "/api/v3/myTrades",
            &format!("symbol={symbol}&orderId={order_id}"),
        )
        .map_err(Into::into)
    }

    /// Cancel an order (DELETE /api/v3/order).
    pub fn cancel_order(&self, symbol: &str, order_id: u64) -> Result<(), BrokerError> {
        self.signed::<serde_json::Value>(
            Method::DELETE,
            "/api/v3/order",
            &format!("symbol={symbol}&orderId={order_id}"),
        )?;
        Ok(())
    }

    fn public<T: DeserializeOwned>(&self, path: &str, query: &str) -> Result<T, BrokerError> {
        let mut url = format!("{}{path}", self.base_url);
        if !query.is_empty() {
            url.push('?');
            url.push_str(query);
        }
        let resp = self
            .client
            .get(&url)
            .send()
            .map_err(|e| BrokerError::Connection(format!("{path} request failed: {e}")))?;
        decode(path, resp).map_err(Into::into)
    }

    fn signed<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &str,
    ) -> Result<T, Failure> {
        let timestamp = current_timestamp_ms();
        let mut query = query.to_string();
        if !query.is_empty() {
            query.push('&');
        }
        query.push_str(&format!("recvWindow={RECV_WINDOW_MS}&timestamp={timestamp}"));
        let signature = auth::sign(&query, &self.secret_key).map_err(Failure::Broker)?;
        let signed_query = format!("{query}&signature={signature}");
        let url = format!("{}{path}", self.base_url);

        let request = if method == Method::POST {
            self.client
                .post(&url)
                .header("Content-Type", "application/x-www-form-urlencoded")
                .body(signed_query)
        } else {
            self.client
                .request(method, format!("{url}?{signed_query}"))
        };

        let resp = request
            .header("X-MBX-APIKEY", &self.api_key)
            .send()
            .map_err(|e| {
                Failure::Broker(BrokerError::Connection(format!(
                    "{path} request failed: {e}"
                )))
            })?;
        decode(path, resp)
    }
}

fn decode<T: DeserializeOwned>(path: &str, resp: Response) -> Result<T, Failure> {
    let status = resp.status();
    if status == StatusCode::TOO_MANY_REQUESTS || status.as_u16() == 418 {
        return Err(Failure::Broker(BrokerError::RateLimit));
    }
    let body = resp.text().map_err(|e| {
        Failure::Broker(BrokerError::Connection(format!("{path} body: {e}")))
    })?;
    if !status.is_success() {
        return Err(match serde_json::from_str::<ApiError>(&body) {
            Ok(api) => Failure::Api(api),
            Err(_) => Failure::Broker(BrokerError::Connection(format!(
                "{path} returned {status}: {body}"
            ))),
        });
    }
    serde_json::from_str(&body).map_err(|e| {
        Failure::Broker(BrokerError::Parse(format!("failed to parse {path}: {e}")))
    })
}

/// Current timestamp in milliseconds.
fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_only_is_limit_maker() {
        let order = NewOrder {
            symbol: "ETHUSDT",
            side: "BUY",
            quantity: "0.4285",
            price: "1400.00",
            post_only: true,
        };
        let q = order.query();
        assert!(q.contains("type=LIMIT_MAKER"));
        assert!(!q.contains("timeInForce"));
        assert!(q.contains("newOrderRespType=FULL"));
    }

    #[test]
    fn plain_limit_is_gtc() {
        let order = NewOrder {
            symbol: "ETHUSDT",
            side: "SELL",
            quantity: "1",
            price: "1400.5",
            post_only: false,
        };
        assert!(order.query().ends_with("type=LIMIT&timeInForce=GTC"));
    }

    #[test]
    fn testnet_url() {
        let c = BinanceClient::new("k", "s", true);
        assert_eq!(c.base_url, TESTNET_URL);
        let c = BinanceClient::with_base_url("k", "s", "http://localhost:9/");
        assert_eq!(c.base_url, "http://localhost:9");
    }
}
