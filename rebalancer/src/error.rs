//! Error types for the rebalancer.

use std::path::PathBuf;

use pairbalance::ValidationError;
use pairbalance_broker::BrokerError;

use crate::gateway::GatewayOp;

/// All errors that can occur during rebalancer operation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("failed to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("invalid pair: {0}")]
    Pair(#[from] ValidationError),

    /// A venue call failed. Carries the operation and its arguments.
    #[error("{}: {op} | {source}", .source.class())]
    Gateway {
        op: GatewayOp,
        #[source]
        source: BrokerError,
    },

    #[error("failed to read stick {path}: {source}")]
    StoreRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write stick {path}: {source}")]
    StoreWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("corrupt stick {path}: {source}")]
    StoreParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("audit log error: {0}")]
    Audit(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
