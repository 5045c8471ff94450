//! pairbalance-rebalancer: periodic per-pair rebalancing agent.
//!
//! Keeps the quote value of each configured pair's base holding near a
//! fixed target. Every cycle reconciles the pair's tracked order against the
//! venue, evaluates the drift, and when it exceeds the threshold places one
//! post-only limit order, re-pricing on rejection.

pub mod audit;
pub mod config;
pub mod engine;
pub mod error;
pub mod execution;
pub mod gateway;
pub mod notify;
pub mod reconcile;
pub mod scheduler;
pub mod store;
