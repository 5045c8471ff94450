//! Operator notifications: what happened, as free text.

use std::fmt;
use std::time::Duration;

use log::{info, warn};
use pairbalance::{LimitBreach, Order, PairSymbol, Side};
use serde::Serialize;

use crate::execution::AbandonReason;

/// Something the operator should hear about.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Notice {
    Started {
        pairs: Vec<PairSymbol>,
    },
    /// An order was placed and is now tracked (or already filled).
    Executed {
        symbol: PairSymbol,
        order: Order,
    },
    /// A stale tracked order was cancelled before re-sizing.
    Canceled {
        symbol: PairSymbol,
        order_id: String,
    },
    /// The corrective order fell below a venue minimum.
    Halted {
        symbol: PairSymbol,
        breach: LimitBreach,
    },
    /// Post-only re-pricing gave up for this cycle.
    Abandoned {
        symbol: PairSymbol,
        side: Side,
        reason: AbandonReason,
        attempts: u32,
    },
    /// Fatal error; the agent stops.
    Failed {
        message: String,
    },
}

impl Notice {
    /// Event name used in the audit journal.
    pub fn event(&self) -> &'static str {
        match self {
            Notice::Started { .. } => "started",
            Notice::Executed { .. } => "executed",
            Notice::Canceled { .. } => "canceled",
            Notice::Halted { .. } => "halted",
            Notice::Abandoned { .. } => "abandoned",
            Notice::Failed { .. } => "failed",
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::Started { pairs } => {
                write!(f, "Rebalancer started for ")?;
                for (i, p) in pairs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{p}")?;
                }
                Ok(())
            }
            Notice::Executed { symbol, order } => write!(f, "{symbol}: {order}"),
            Notice::Canceled { symbol, order_id } => {
                write!(f, "{symbol}: cancelled stale order {order_id}")
            }
            Notice::Halted { symbol, breach } => write!(f, "{symbol}: halt execution, {breach}"),
            Notice::Abandoned {
                symbol,
                side,
                reason,
                attempts,
            } => write!(
                f,
                "{symbol}: gave up {side} after {attempts} post-only rejections ({reason})"
            ),
            Notice::Failed { message } => write!(f, "Rebalancer stopped: {message}"),
        }
    }
}

/// A notification sink. Delivery problems are the sink's own business and
/// never interrupt trading.
pub trait Notifier {
    fn notify(&mut self, notice: &Notice);
}

/// Collects notices. Used by tests.
impl Notifier for Vec<Notice> {
    fn notify(&mut self, notice: &Notice) {
        self.push(notice.clone());
    }
}

/// Writes notices to the log at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&mut self, notice: &Notice) {
        info!("{notice}");
    }
}

/// Fan-out to several sinks.
#[derive(Default)]
pub struct Notifiers {
    sinks: Vec<Box<dyn Notifier>>,
}

impl Notifiers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: impl Notifier + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl Notifier for Notifiers {
    fn notify(&mut self, notice: &Notice) {
        for sink in &mut self.sinks {
            sink.notify(notice);
        }
    }
}

const TELEGRAM_API: &str = "https://api.telegram.org";

/// Telegram Bot API `sendMessage` sink.
pub struct TelegramNotifier {
    client: reqwest::blocking::Client,
    base_url: String,
    bot_token: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(bot_token: &str, chat_id: &str) -> Self {
        Self {
            client: reqwest::blocking::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
            base_url: TELEGRAM_API.to_string(),
            bot_token: bot_token.to_string(),
            chat_id: chat_id.to_string(),
        }
    }

    fn send(&self, text: &str) -> Result<(), reqwest::Error> {
        let url = format!("{}/bot{}/sendMessage", self.base_url, self.bot_token);
        self.client
            .post(&url)
            .form(&[("chat_id", self.chat_id.as_str()), ("text", text)])
            .send()?
            .error_for_status()?;
        Ok(())
    }
}

impl Notifier for TelegramNotifier {
    fn notify(&mut self, notice: &Notice) {
        if let Err(e) = self.send(&notice.to_string()) {
            // The token is part of the URL; keep it out of the log.
            warn!("Failed to send Telegram message: {}", e.without_url());
        }
    }
}
