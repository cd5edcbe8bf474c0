//! DeFi Portfolio Optimizer
//!
//! Rebalances a lending portfolio across Solana DeFi protocols:
//! - Fetches market and wallet data from the data API
//! - Builds a yield-maximizing target and, optionally, asks an LLM risk
//!   manager for a risk-adjusted one
//! - Blends the two targets and checks them against risk guards
//! - Turns the result into an ordered, deterministic execution plan
//!
//! The rebalancing core in [`portfolio`] is pure and synchronous; everything
//! that touches the network lives in [`tools`], [`llm`], [`pipeline`] and
//! [`server`].

pub mod agents;
pub mod config;
pub mod guards;
pub mod llm;
pub mod market;
pub mod pipeline;
pub mod portfolio;
pub mod server;
pub mod tools;
pub mod wallet;

mod error;
#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use config::{Config, RiskTolerance};
pub use error::{Error, Result};
pub use pipeline::{OptimizationReport, Optimizer};
pub use portfolio::{ExecutionPlan, Position, PositionSet, Trade, TradeAction, Urgency};
pub use wallet::WalletSnapshot;
