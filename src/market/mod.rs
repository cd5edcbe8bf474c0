//! Lending market data and yield analysis

mod analysis;
mod strategy;

pub use analysis::{ProtocolStats, ReserveYield, YieldAnalysis, YieldTrend};
pub use strategy::YieldStrategy;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::Result;

/// One lending reserve of a token within a protocol market
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LendingReserve {
    pub protocol_name: String,
    pub market_name: String,
    pub total_supply: Decimal,
    pub total_borrows: Decimal,
    /// Current supply APY, in percent
    pub supply_rate: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supply_rate_7d: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supply_rate_30d: Option<Decimal>,
}

impl LendingReserve {
    /// Borrowed fraction of supply, 0 when nothing is supplied
    pub fn utilization(&self) -> Decimal {
        if self.total_supply.is_zero() {
            return Decimal::ZERO;
        }
        self.total_borrows / self.total_supply
    }
}

/// Market data for one token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketData {
    pub name: String,
    pub symbol: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_price_sf: Option<Decimal>,
    #[serde(default)]
    pub mint: String,
    #[serde(default)]
    pub lending_reserves: Vec<LendingReserve>,
}

impl MarketData {
    /// Parse the `current_markets` payload (a JSON array of tokens)
    pub fn parse_list(value: serde_json::Value) -> Result<Vec<MarketData>> {
        Ok(serde_json::from_value(value)?)
    }
}
