//! Broker error types.

use std::fmt;

/// Errors that can occur during broker operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BrokerError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("rate limit exceeded")]
    RateLimit,

    #[error("order error: {0}")]
    Order(String),

    /// The venue answered with an error payload.
    #[error("exchange error {code}: {message}")]
    Exchange { code: i64, message: String },

    #[error("not connected")]
    NotConnected,

    #[error("no active symbol selected")]
    NoActiveSymbol,

    #[error("invalid symbol: {0}")]
    InvalidSymbol(String),

    #[error("order not found: {0}")]
    OrderNotFound(String),

    #[error("authentication error: {0}")]
    Auth(String),

    #[error("unexpected response: {0}")]
    Parse(String),

    #[error("{0}")]
    Other(String),
}

/// Coarse failure class used by the fatal-error policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Transport-level failure (timeouts, refused connections, throttling)
    Network,
    /// The venue understood and refused the request
    Exchange,
    /// Anything else
    Unexpected,
}

impl BrokerError {
    /// Classify this error.
    pub fn class(&self) -> ErrorClass {
        match self {
            BrokerError::Connection(_) | BrokerError::RateLimit => ErrorClass::Network,
            BrokerError::Order(_)
            | BrokerError::Exchange { .. }
            | BrokerError::InvalidSymbol(_)
            | BrokerError::OrderNotFound(_)
            | BrokerError::Auth(_) => ErrorClass::Exchange,
            BrokerError::NotConnected
            | BrokerError::NoActiveSymbol
            | BrokerError::Parse(_)
            | BrokerError::Other(_) => ErrorClass::Unexpected,
        }
    }

    /// True for failures a later attempt could plausibly clear.
    pub fn is_retryable(&self) -> bool {
        matches!(self.class(), ErrorClass::Network | ErrorClass::Exchange)
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorClass::Network => write!(f, "NetworkError"),
            ErrorClass::Exchange => write!(f, "ExchangeError"),
            ErrorClass::Unexpected => write!(f, "UnexpectedError"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        assert_eq!(
            BrokerError::Connection("timeout".into()).class(),
            ErrorClass::Network
        );
        assert_eq!(BrokerError::RateLimit.class(), ErrorClass::Network);
        assert_eq!(
            BrokerError::Exchange {
                code: -2010,
                message: "insufficient balance".into()
            }
            .class(),
            ErrorClass::Exchange
        );
        assert_eq!(
            BrokerError::Parse("bad json".into()).class(),
            ErrorClass::Unexpected
        );
    }

    #[test]
    fn retryable_excludes_unexpected() {
        assert!(BrokerError::RateLimit.is_retryable());
        assert!(BrokerError::Order("rejected".into()).is_retryable());
        assert!(!BrokerError::NoActiveSymbol.is_retryable());
    }

    #[test]
    fn display() {
        let e = BrokerError::Exchange {
            code: -1013,
            message: "Filter failure: LOT_SIZE".into(),
        };
        assert_eq!(e.to_string(), "exchange error -1013: Filter failure: LOT_SIZE");
        assert_eq!(ErrorClass::Network.to_string(), "NetworkError");
    }
}
