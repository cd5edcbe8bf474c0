//! Execution plan assembly: diff, sequence, classify

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::diff::compute_trades;
use super::position::{Balance, PositionSet};
use super::sequencer::order_trades;
use super::trade::{ProtocolSettings, Trade};
use super::urgency::{classify_urgency, timeline_for, Urgency};
use crate::config::RebalanceSettings;
use crate::wallet::WalletSnapshot;

/// Per-protocol execution hints, keyed by protocol name (case-insensitive)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProtocolSettingsTable(BTreeMap<String, ProtocolSettings>);

impl ProtocolSettingsTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_protocol(mut self, protocol: &str, settings: ProtocolSettings) -> Self {
        self.0.insert(protocol.to_ascii_lowercase(), settings);
        self
    }

    pub fn lookup(&self, protocol: &str) -> Option<&ProtocolSettings> {
        self.0.get(&protocol.to_ascii_lowercase()).or_else(|| {
            self.0
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(protocol))
                .map(|(_, settings)| settings)
        })
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Attach the matching settings to each trade, if any
    pub fn apply(&self, trades: Vec<Trade>) -> Vec<Trade> {
        trades
            .into_iter()
            .map(|trade| match self.lookup(&trade.protocol) {
                Some(settings) => {
                    let settings = settings.clone();
                    trade.with_protocol_settings(settings)
                }
                None => trade,
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStrategy {
    #[default]
    Batch,
}

/// Ordered trades plus execution metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionPlan {
    pub trades: Vec<Trade>,
    pub unallocated_balance: BTreeMap<String, Decimal>,
    pub execution_strategy: ExecutionStrategy,
    pub batch_size: usize,
    pub urgency: Urgency,
    pub timeline: String,
}

impl ExecutionPlan {
    /// Build the plan that moves `wallet` to `target`.
    ///
    /// `yield_change` is the expected yield improvement in percentage points.
    pub fn build(
        wallet: &WalletSnapshot,
        target: &PositionSet,
        yield_change: Decimal,
        settings: &RebalanceSettings,
        protocol_settings: &ProtocolSettingsTable,
    ) -> Self {
        let trades = compute_trades(wallet.positions(), target, settings.dust_threshold);
        let trades = protocol_settings.apply(order_trades(trades));
        let urgency = classify_urgency(yield_change, &trades);

        tracing::debug!(
            trades = trades.len(),
            urgency = %urgency,
            %yield_change,
            "Built execution plan"
        );

        Self {
            batch_size: trades.len().min(settings.max_batch_size),
            unallocated_balance: sum_balances(wallet.balances()),
            execution_strategy: ExecutionStrategy::Batch,
            timeline: timeline_for(urgency).to_string(),
            urgency,
            trades,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }
}

/// Sum balances per symbol
pub fn sum_balances(balances: &[Balance]) -> BTreeMap<String, Decimal> {
    let mut totals = BTreeMap::new();
    for balance in balances {
        *totals
            .entry(balance.symbol.clone())
            .or_insert(Decimal::ZERO) += balance.amount;
    }
    totals
}
