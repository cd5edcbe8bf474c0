//! Yield-maximizing target allocation

use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashSet;

use super::analysis::{ReserveYield, YieldAnalysis};
use crate::portfolio::{ObligationType, Position};
use crate::wallet::WalletSnapshot;

const AMOUNT_SCALE: u32 = 4;
const YIELD_SCALE: u32 = 2;

/// Equal split of the whole portfolio across the best supply rates
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YieldStrategy {
    pub total_portfolio_value: Decimal,
    pub ideal_positions: Vec<Position>,
    /// Amount-weighted supply rate of `ideal_positions`, percent
    pub expected_avg_yield: Decimal,
    /// Percentage points gained over the wallet's current positions
    pub yield_increase: Decimal,
}

impl YieldStrategy {
    pub fn generate(analysis: &YieldAnalysis, wallet: &WalletSnapshot, slots: usize) -> Self {
        let total_portfolio_value = wallet.total_value();
        let ideal_positions = if total_portfolio_value > Decimal::ZERO {
            allocate(&analysis.best_yields, total_portfolio_value, slots)
        } else {
            Vec::new()
        };

        let expected_avg_yield =
            weighted_yield(ideal_positions.iter(), analysis).round_dp(YIELD_SCALE);
        let current_yield = weighted_yield(wallet.positions().iter(), analysis);
        let yield_increase = (expected_avg_yield - current_yield).round_dp(YIELD_SCALE);

        tracing::debug!(
            %total_portfolio_value,
            positions = ideal_positions.len(),
            %expected_avg_yield,
            %yield_increase,
            "Generated yield strategy"
        );

        Self {
            total_portfolio_value,
            ideal_positions,
            expected_avg_yield,
            yield_increase,
        }
    }
}

/// One pick per protocol market: the blender merges on `(protocol, market)`,
/// so only the best token of each market is taken.
fn allocate(best: &[ReserveYield], total: Decimal, slots: usize) -> Vec<Position> {
    let mut seen = HashSet::new();
    let picks: Vec<&ReserveYield> = best
        .iter()
        .filter(|&r| seen.insert((r.protocol.as_str(), r.market.as_str())))
        .take(slots)
        .collect();

    if picks.is_empty() {
        return Vec::new();
    }

    let share = (total / Decimal::from(picks.len())).round_dp(AMOUNT_SCALE);
    picks
        .into_iter()
        .map(|r| Position::new(&r.token, &r.protocol, &r.market, ObligationType::Supply, share))
        .collect()
}

/// Amount-weighted supply rate. Positions in unknown markets count as 0%.
fn weighted_yield<'a>(
    positions: impl Iterator<Item = &'a Position> + Clone,
    analysis: &YieldAnalysis,
) -> Decimal {
    let total: Decimal = positions.clone().map(|p| p.amount).sum();
    if total.is_zero() {
        return Decimal::ZERO;
    }

    let weighted: Decimal = positions
        .filter_map(|p| {
            analysis
                .rate_for(&p.symbol, &p.protocol, &p.market)
                .map(|rate| p.amount * rate)
        })
        .sum();
    weighted / total
}
