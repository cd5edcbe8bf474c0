//! Trade instructions produced by the diff engine

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use super::position::{ObligationType, Position, PositionKey};

/// Opaque per-protocol execution hints attached to trades
pub type ProtocolSettings = BTreeMap<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeAction {
    Add,
    Increase,
    Decrease,
    Remove,
}

impl TradeAction {
    pub fn name(&self) -> &'static str {
        match self {
            TradeAction::Add => "add",
            TradeAction::Increase => "increase",
            TradeAction::Decrease => "decrease",
            TradeAction::Remove => "remove",
        }
    }

    /// Releases liquidity (withdraw side)
    pub fn is_withdrawal(&self) -> bool {
        matches!(self, TradeAction::Decrease | TradeAction::Remove)
    }

    /// Opens or closes a position entirely, as opposed to resizing it
    pub fn is_full_position_change(&self) -> bool {
        matches!(self, TradeAction::Add | TradeAction::Remove)
    }
}

impl fmt::Display for TradeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single rebalancing instruction. `amount` is always a magnitude.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub action: TradeAction,
    pub symbol: String,
    #[serde(rename = "protocol_name")]
    pub protocol: String,
    #[serde(rename = "market_name")]
    pub market: String,
    pub obligation_type: ObligationType,
    pub amount: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol_settings: Option<ProtocolSettings>,
}

impl Trade {
    pub(crate) fn for_position(action: TradeAction, position: &Position, amount: Decimal) -> Self {
        Self {
            action,
            symbol: position.symbol.clone(),
            protocol: position.protocol.clone(),
            market: position.market.clone(),
            obligation_type: position.obligation_type.clone(),
            amount,
            protocol_settings: None,
        }
    }

    pub fn key(&self) -> PositionKey {
        PositionKey {
            symbol: self.symbol.clone(),
            protocol: self.protocol.clone(),
            market: self.market.clone(),
            obligation_type: self.obligation_type.clone(),
        }
    }

    pub fn with_protocol_settings(mut self, settings: ProtocolSettings) -> Self {
        self.protocol_settings = Some(settings);
        self
    }
}
