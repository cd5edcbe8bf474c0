//! Allocation breakdown of a wallet snapshot

use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

use super::WalletSnapshot;
use crate::portfolio::ObligationType;

const PERCENT_SCALE: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AllocationKind {
    Position,
    Balance,
}

/// Share of the portfolio held in one position or balance
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Allocation {
    #[serde(rename = "type")]
    pub kind: AllocationKind,
    pub symbol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub obligation_type: Option<ObligationType>,
    pub amount: Decimal,
    pub percentage: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WalletSummary {
    pub total_value: Decimal,
    pub allocated_percentage: Decimal,
    pub unallocated_percentage: Decimal,
    pub protocol_allocations: BTreeMap<String, Decimal>,
    pub detailed_allocations: Vec<Allocation>,
}

impl WalletSummary {
    pub fn from_snapshot(wallet: &WalletSnapshot) -> Self {
        let total_value = wallet.total_value();
        let allocations = allocation_percentages(wallet, total_value);

        let mut allocated = Decimal::ZERO;
        let mut unallocated = Decimal::ZERO;
        let mut protocol_allocations = BTreeMap::new();

        for allocation in &allocations {
            match allocation.kind {
                AllocationKind::Position => {
                    allocated += allocation.percentage;
                    if let Some(protocol) = &allocation.protocol_name {
                        *protocol_allocations
                            .entry(protocol.clone())
                            .or_insert(Decimal::ZERO) += allocation.percentage;
                    }
                }
                AllocationKind::Balance => unallocated += allocation.percentage,
            }
        }

        Self {
            total_value,
            allocated_percentage: allocated.round_dp(PERCENT_SCALE),
            unallocated_percentage: unallocated.round_dp(PERCENT_SCALE),
            protocol_allocations,
            detailed_allocations: allocations,
        }
    }
}

/// Percentage of `total_value` held by each entry, largest first.
/// An empty portfolio has no allocations.
fn allocation_percentages(wallet: &WalletSnapshot, total_value: Decimal) -> Vec<Allocation> {
    if total_value.is_zero() {
        return Vec::new();
    }

    let percent = |amount: Decimal| {
        (amount / total_value * Decimal::ONE_HUNDRED).round_dp(PERCENT_SCALE)
    };

    let positions = wallet.positions().iter().map(|p| Allocation {
        kind: AllocationKind::Position,
        symbol: p.symbol.clone(),
        protocol_name: Some(p.protocol.clone()),
        market_name: Some(p.market.clone()),
        obligation_type: Some(p.obligation_type.clone()),
        amount: p.amount,
        percentage: percent(p.amount),
    });
    let balances = wallet.balances().iter().map(|b| Allocation {
        kind: AllocationKind::Balance,
        symbol: b.symbol.clone(),
        protocol_name: None,
        market_name: None,
        obligation_type: None,
        amount: b.amount,
        percentage: percent(b.amount),
    });

    let mut allocations: Vec<Allocation> = positions.chain(balances).collect();
    allocations.sort_by(|a, b| b.percentage.cmp(&a.percentage));
    allocations
}
