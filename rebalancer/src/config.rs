//! TOML configuration loading and validation.

use std::path::{Path, PathBuf};
use std::time::Duration;

use pairbalance::PairConfig;
use rustc_hash::FxHashSet;
use serde::Deserialize;

use crate::error::{Error, Result};

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub exchange: ExchangeConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    pub telegram: Option<TelegramConfig>,
    pub pairs: Vec<PairConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeConfig {
    pub id: ExchangeId,
    /// Falls back to `BINANCE_API_KEY`
    #[serde(default)]
    pub api_key: String,
    /// Falls back to `BINANCE_SECRET_KEY`
    #[serde(default)]
    pub secret_key: String,
    #[serde(default = "default_true")]
    pub testnet: bool,
    #[serde(default = "default_true")]
    pub post_only: bool,
    /// Retries per venue call before the failure is fatal. 0 disables retrying.
    #[serde(default)]
    pub request_retries: u32,
    #[serde(default = "default_backoff")]
    pub retry_backoff_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExchangeId {
    Binance,
}

fn default_true() -> bool {
    true
}
fn default_backoff() -> u64 {
    1000
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_pair_delay")]
    pub pair_delay_secs: u64,
    #[serde(default = "default_round_delay")]
    pub round_delay_secs: u64,
}

fn default_pair_delay() -> u64 {
    8
}
fn default_round_delay() -> u64 {
    600
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            pair_delay_secs: default_pair_delay(),
            round_delay_secs: default_round_delay(),
        }
    }
}

impl ScheduleConfig {
    pub fn pair_delay(&self) -> Duration {
        Duration::from_secs(self.pair_delay_secs)
    }

    pub fn round_delay(&self) -> Duration {
        Duration::from_secs(self.round_delay_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionConfig {
    /// Re-price attempts after post-only rejections before the pair is
    /// abandoned for the cycle.
    #[serde(default = "default_max_retries")]
    pub max_post_only_retries: u32,
}

fn default_max_retries() -> u32 {
    10
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            max_post_only_retries: default_max_retries(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_dir")]
    pub dir: PathBuf,
}

fn default_store_dir() -> PathBuf {
    PathBuf::from("./db")
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dir: default_store_dir(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_dir")]
    pub dir: String,
    #[serde(default = "default_audit_file")]
    pub audit_file: String,
}

fn default_log_dir() -> String {
    "./logs".into()
}
fn default_audit_file() -> String {
    "audit.jsonl".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: default_log_dir(),
            audit_file: default_audit_file(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
}

impl Config {
    /// Load config from a TOML file, filling credentials from the environment.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::ConfigRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let mut config = Self::parse(&contents)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Parse and validate a TOML document.
    pub fn parse(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Fill empty credentials from `BINANCE_API_KEY` / `BINANCE_SECRET_KEY`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.exchange.api_key.is_empty() {
            if let Some(key) = lookup("BINANCE_API_KEY") {
                self.exchange.api_key = key;
            }
        }
        if self.exchange.secret_key.is_empty() {
            if let Some(key) = lookup("BINANCE_SECRET_KEY") {
                self.exchange.secret_key = key;
            }
        }
    }

    /// Validate config invariants.
    fn validate(&self) -> Result<()> {
        if self.pairs.is_empty() {
            return Err(Error::Config("at least one [[pairs]] entry is required".into()));
        }
        let mut seen = FxHashSet::default();
        for pair in &self.pairs {
            pair.validate()?;
            if !seen.insert(pair.symbol.joined()) {
                return Err(Error::Config(format!("duplicate pair {}", pair.symbol)));
            }
        }
        if self.exchange.request_retries > 0 && self.exchange.retry_backoff_ms == 0 {
            return Err(Error::Config(
                "retry_backoff_ms must be > 0 when request_retries is set".into(),
            ));
        }
        Ok(())
    }

    /// Full path to the audit log file.
    pub fn audit_path(&self) -> PathBuf {
        Path::new(&self.logging.dir).join(&self.logging.audit_file)
    }

    /// The pair with the given symbol (`ETH/USDT` or `ETHUSDT`).
    pub fn pair(&self, symbol: &str) -> Option<&PairConfig> {
        let wanted = symbol.replace('/', "").to_uppercase();
        self.pairs.iter().find(|p| p.symbol.joined() == wanted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pairbalance::ValidationError;

    fn example_toml() -> &'static str {
        r#"
[exchange]
id = "binance"
api_key = "key"
secret_key = "secret"

[schedule]
pair_delay_secs = 8
round_delay_secs = 600

[store]
dir = "./db"

[[pairs]]
symbol = "ETH/USDT"
condition_value = 30.0
condition_type = "FIXED"
min_diff_value = 2.0
min_diff_type = "FIXED"
post_only_tick_percentage = 0.1

[[pairs]]
symbol = "BTC/USDT"
condition_value = 50.0
min_diff_value = 5.0
"#
    }

    #[test]
    fn parse_example_config() {
        let config = Config::parse(example_toml()).unwrap();
        assert_eq!(config.exchange.id, ExchangeId::Binance);
        assert!(config.exchange.testnet);
        assert!(config.exchange.post_only);
        assert_eq!(config.exchange.request_retries, 0);
        assert_eq!(config.schedule.pair_delay(), Duration::from_secs(8));
        assert_eq!(config.execution.max_post_only_retries, 10);
        assert_eq!(config.pairs.len(), 2);
        assert_eq!(config.pairs[1].post_only_tick_percentage, 0.1);
        assert!(config.telegram.is_none());
    }

    #[test]
    fn rejects_no_pairs() {
        let toml = "pairs = []\n\n[exchange]\nid = \"binance\"\n";
        assert!(matches!(Config::parse(toml), Err(Error::Config(_))));
    }

    #[test]
    fn rejects_duplicate_pairs() {
        let toml = example_toml().replace("BTC/USDT", "ETH/USDT");
        assert!(matches!(Config::parse(&toml), Err(Error::Config(_))));
    }

    #[test]
    fn rejects_bad_tick_percentage() {
        let toml = example_toml().replace(
            "post_only_tick_percentage = 0.1",
            "post_only_tick_percentage = 100.0",
        );
        assert!(matches!(
            Config::parse(&toml),
            Err(Error::Pair(ValidationError::PercentOutOfRange { .. }))
        ));
    }

    #[test]
    fn rejects_unknown_condition_type() {
        let toml = example_toml().replace(
            "condition_type = \"FIXED\"",
            "condition_type = \"PERCENTAGE\"",
        );
        assert!(matches!(Config::parse(&toml), Err(Error::ConfigParse(_))));
    }

    #[test]
    fn env_fills_missing_credentials_only() {
        let toml = example_toml().replace("api_key = \"key\"\n", "");
        let mut config = Config::parse(&toml).unwrap();
        config.apply_env(|k| Some(format!("env-{k}")));
        assert_eq!(config.exchange.api_key, "env-BINANCE_API_KEY");
        assert_eq!(config.exchange.secret_key, "secret");
    }

    #[test]
    fn lookup_pair_by_either_spelling() {
        let config = Config::parse(example_toml()).unwrap();
        assert!(config.pair("ETHUSDT").is_some());
        assert!(config.pair("btc/usdt").is_some());
        assert!(config.pair("SOL/USDT").is_none());
    }

    #[test]
    fn audit_path() {
        let config = Config::parse(example_toml()).unwrap();
        assert_eq!(config.audit_path(), PathBuf::from("./logs/audit.jsonl"));
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, Error::ConfigRead { .. }));
    }
}
