//! Core types: PairSymbol, Precision

use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// A trading pair `BASE/QUOTE`, e.g. `ETH/USDT`.
///
/// Allocation targets are expressed as the quote-currency value of the base
/// holding, so both halves are kept separately.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "String", into = "String"))]
pub struct PairSymbol {
    base: String,
    quote: String,
}

impl PairSymbol {
    /// Build a symbol from its two currencies.
    pub fn new(base: &str, quote: &str) -> Result<Self, ValidationError> {
        let base = base.trim();
        let quote = quote.trim();
        if base.is_empty() || quote.is_empty() || base.contains('/') || quote.contains('/') {
            return Err(ValidationError::InvalidSymbol(format!("{base}/{quote}")));
        }
        Ok(Self {
            base: base.to_ascii_uppercase(),
            quote: quote.to_ascii_uppercase(),
        })
    }

    /// Base currency (`ETH` in `ETH/USDT`).
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Quote currency (`USDT` in `ETH/USDT`).
    pub fn quote(&self) -> &str {
        &self.quote
    }

    /// Symbol with the separator removed (`ETHUSDT`).
    ///
    /// This is both the persisted record key and the spelling most spot
    /// venues use on the wire.
    pub fn joined(&self) -> String {
        format!("{}{}", self.base, self.quote)
    }
}

impl FromStr for PairSymbol {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('/') {
            Some((base, quote)) => Self::new(base, quote),
            None => Err(ValidationError::InvalidSymbol(s.to_string())),
        }
    }
}

impl TryFrom<String> for PairSymbol {
    type Error = ValidationError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<PairSymbol> for String {
    fn from(symbol: PairSymbol) -> Self {
        symbol.to_string()
    }
}

impl fmt::Display for PairSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

/// Which venue precision rule to apply when normalizing a value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Precision {
    /// Order quantity: truncated to the venue step.
    Amount,
    /// Limit price: rounded to the nearest venue tick.
    Price,
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Precision::Amount => f.write_str("amount"),
            Precision::Price => f.write_str("price"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_symbol() {
        let s: PairSymbol = "ETH/USDT".parse().unwrap();
        assert_eq!(s.base(), "ETH");
        assert_eq!(s.quote(), "USDT");
        assert_eq!(s.to_string(), "ETH/USDT");
    }

    #[test]
    fn parse_normalizes_case_and_whitespace() {
        let s: PairSymbol = " eth / usdt ".parse().unwrap();
        assert_eq!(s.to_string(), "ETH/USDT");
    }

    #[test]
    fn joined_drops_separator() {
        let s: PairSymbol = "BTC/EUR".parse().unwrap();
        assert_eq!(s.joined(), "BTCEUR");
    }

    #[test]
    fn rejects_malformed() {
        assert!("ETHUSDT".parse::<PairSymbol>().is_err());
        assert!("/USDT".parse::<PairSymbol>().is_err());
        assert!("ETH/".parse::<PairSymbol>().is_err());
        assert!("A/B/C".parse::<PairSymbol>().is_err());
    }

    #[test]
    fn precision_display() {
        assert_eq!(Precision::Amount.to_string(), "amount");
        assert_eq!(Precision::Price.to_string(), "price");
    }
}
