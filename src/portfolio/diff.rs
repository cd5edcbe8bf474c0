//! Current-vs-target position diffing
//!
//! Two threshold policies exist and callers pick one per call site:
//! - [`compute_trades`] uses an absolute dust threshold and emits
//!   add/increase/decrease/remove trades. Used for wallet-level execution plans.
//! - [`compute_adjustments`] uses a relative threshold and emits
//!   add/adjust/remove changes. Used for strategy-level comparisons.

use rust_decimal::Decimal;
use serde::Serialize;

use super::position::{ObligationType, Position, PositionSet};
use super::trade::{Trade, TradeAction};

/// Default absolute dust threshold
pub const DEFAULT_DUST_THRESHOLD: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Default relative threshold for strategy-level adjustments (5%)
pub const DEFAULT_RELATIVE_THRESHOLD: Decimal = Decimal::from_parts(5, 0, 0, false, 2);

/// Compute the trades needed to move `current` to `target`.
///
/// Deltas with magnitude at or below `dust_threshold` are treated as already
/// satisfied. A negative threshold behaves like zero. Trades are emitted in
/// target order followed by removals in current order; use
/// [`order_trades`](super::order_trades) for execution order.
pub fn compute_trades(
    current: &PositionSet,
    target: &PositionSet,
    dust_threshold: Decimal,
) -> Vec<Trade> {
    let dust = dust_threshold.max(Decimal::ZERO);
    let mut trades = Vec::new();

    for wanted in target {
        match current.get(&wanted.key()) {
            None => trades.push(Trade::for_position(TradeAction::Add, wanted, wanted.amount)),
            Some(held) => {
                let delta = wanted.amount - held.amount;
                if delta.abs() <= dust {
                    continue;
                }
                if delta > Decimal::ZERO {
                    trades.push(Trade::for_position(TradeAction::Increase, wanted, delta));
                } else {
                    trades.push(Trade::for_position(TradeAction::Decrease, wanted, delta.abs()));
                }
            }
        }
    }

    for held in current {
        if !target.contains_key(&held.key()) {
            trades.push(Trade::for_position(TradeAction::Remove, held, held.amount));
        }
    }

    tracing::debug!(
        current = current.len(),
        target = target.len(),
        trades = trades.len(),
        "Computed position diff"
    );

    trades
}

/// Strategy-level change between two allocations
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum StrategyChange {
    Add {
        #[serde(flatten)]
        position: Position,
    },
    Remove {
        #[serde(flatten)]
        position: Position,
    },
    Adjust {
        symbol: String,
        #[serde(rename = "protocol_name")]
        protocol: String,
        #[serde(rename = "market_name")]
        market: String,
        obligation_type: ObligationType,
        current_amount: Decimal,
        target_amount: Decimal,
        /// Signed: positive means the target is larger
        difference: Decimal,
    },
}

/// Compare two allocations using a relative threshold.
///
/// A shared key becomes an `Adjust` only when `|delta| / current` exceeds
/// `relative_threshold`. When the current amount is zero, or the ratio is too
/// large to represent, any non-zero delta counts as an adjustment.
pub fn compute_adjustments(
    current: &PositionSet,
    target: &PositionSet,
    relative_threshold: Decimal,
) -> Vec<StrategyChange> {
    let mut changes = Vec::new();

    for wanted in target {
        match current.get(&wanted.key()) {
            None => changes.push(StrategyChange::Add {
                position: wanted.clone(),
            }),
            Some(held) => {
                let difference = wanted.amount - held.amount;
                if difference.is_zero() {
                    continue;
                }
                // Overflow means the change dwarfs the current amount
                let significant = difference
                    .abs()
                    .checked_div(held.amount)
                    .map_or(true, |ratio| ratio > relative_threshold);
                if significant {
                    changes.push(StrategyChange::Adjust {
                        symbol: wanted.symbol.clone(),
                        protocol: wanted.protocol.clone(),
                        market: wanted.market.clone(),
                        obligation_type: wanted.obligation_type.clone(),
                        current_amount: held.amount,
                        target_amount: wanted.amount,
                        difference,
                    });
                }
            }
        }
    }

    for held in current {
        if !target.contains_key(&held.key()) {
            changes.push(StrategyChange::Remove {
                position: held.clone(),
            });
        }
    }

    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn supply(symbol: &str, protocol: &str, market: &str, amount: Decimal) -> Position {
        Position::new(symbol, protocol, market, ObligationType::Supply, amount)
    }

    fn set(positions: Vec<Position>) -> PositionSet {
        PositionSet::new(positions).unwrap()
    }

    #[test]
    fn default_thresholds() {
        assert_eq!(DEFAULT_DUST_THRESHOLD, dec!(0.01));
        assert_eq!(DEFAULT_RELATIVE_THRESHOLD, dec!(0.05));
    }

    #[test]
    fn increase_when_target_is_larger() {
        let current = set(vec![supply("USDC", "Kamino", "Main", dec!(100))]);
        let target = set(vec![supply("USDC", "Kamino", "Main", dec!(200))]);

        let trades = compute_trades(&current, &target, dec!(0.01));

        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].action, TradeAction::Increase);
        assert_eq!(trades[0].symbol, "USDC");
        assert_eq!(trades[0].protocol, "Kamino");
        assert_eq!(trades[0].market, "Main");
        assert_eq!(trades[0].obligation_type, ObligationType::Supply);
        assert_eq!(trades[0].amount, dec!(100));
    }

    #[test]
    fn remove_when_target_is_empty() {
        let current = set(vec![supply("USDC", "Drift", "Perp", dec!(50))]);

        let trades = compute_trades(&current, &PositionSet::empty(), DEFAULT_DUST_THRESHOLD);

        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].action, TradeAction::Remove);
        assert_eq!(trades[0].protocol, "Drift");
        assert_eq!(trades[0].market, "Perp");
        assert_eq!(trades[0].amount, dec!(50));
    }

    #[test]
    fn empty_current_adds_every_target() {
        let target = set(vec![
            supply("USDC", "Kamino", "Main", dec!(10)),
            supply("SOL", "Marginfi", "Global", dec!(0)),
        ]);

        let trades = compute_trades(&PositionSet::empty(), &target, DEFAULT_DUST_THRESHOLD);

        assert_eq!(trades.len(), 2);
        assert!(trades.iter().all(|t| t.action == TradeAction::Add));
        // zero-amount targets pass through unfiltered
        assert_eq!(trades[1].amount, dec!(0));
    }

    #[test]
    fn identical_sets_produce_no_trades() {
        let positions = set(vec![
            supply("USDC", "Kamino", "Main", dec!(100)),
            supply("USDT", "Solend", "Main", dec!(42.5)),
            Position::new("SOL", "Kamino", "Main", ObligationType::Borrow, dec!(3)),
        ]);

        for threshold in [dec!(0), dec!(0.01), dec!(10)] {
            assert!(compute_trades(&positions, &positions, threshold).is_empty());
        }
    }

    #[test]
    fn dust_deltas_are_suppressed() {
        let current = set(vec![
            supply("USDC", "Kamino", "Main", dec!(100)),
            supply("USDT", "Kamino", "Main", dec!(100)),
        ]);
        let target = set(vec![
            supply("USDC", "Kamino", "Main", dec!(100.01)),
            supply("USDT", "Kamino", "Main", dec!(99.98)),
        ]);

        let trades = compute_trades(&current, &target, dec!(0.01));

        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].symbol, "USDT");
        assert_eq!(trades[0].action, TradeAction::Decrease);
        assert_eq!(trades[0].amount, dec!(0.02));
    }

    #[test]
    fn negative_threshold_behaves_like_zero() {
        let current = set(vec![supply("USDC", "Kamino", "Main", dec!(100))]);
        let target = set(vec![supply("USDC", "Kamino", "Main", dec!(100))]);
        assert!(compute_trades(&current, &target, dec!(-1)).is_empty());
    }

    #[test]
    fn every_key_is_covered_exactly_once() {
        let current = set(vec![
            supply("USDC", "Kamino", "Main", dec!(100)),
            supply("USDC", "Drift", "Perp", dec!(50)),
            supply("SOL", "Marginfi", "Global", dec!(5)),
        ]);
        let target = set(vec![
            supply("USDC", "Kamino", "Main", dec!(80)),
            supply("USDC", "Solend", "Main", dec!(70)),
            supply("SOL", "Marginfi", "Global", dec!(5)),
        ]);

        let trades = compute_trades(&current, &target, DEFAULT_DUST_THRESHOLD);

        let adds: Vec<_> = trades.iter().filter(|t| t.action == TradeAction::Add).collect();
        let removes: Vec<_> = trades
            .iter()
            .filter(|t| t.action == TradeAction::Remove)
            .collect();
        assert_eq!(adds.len(), 1);
        assert_eq!(adds[0].protocol, "Solend");
        assert_eq!(removes.len(), 1);
        assert_eq!(removes[0].protocol, "Drift");
        assert_eq!(trades.len(), 3);
        assert_eq!(trades[0].action, TradeAction::Decrease);
        assert_eq!(trades[0].amount, dec!(20));
    }

    #[test]
    fn obligation_type_is_part_of_identity() {
        let current = set(vec![supply("USDC", "Kamino", "Main", dec!(100))]);
        let target = set(vec![Position::new(
            "USDC",
            "Kamino",
            "Main",
            ObligationType::Borrow,
            dec!(100),
        )]);

        let trades = compute_trades(&current, &target, DEFAULT_DUST_THRESHOLD);
        let actions: Vec<_> = trades.iter().map(|t| t.action).collect();
        assert_eq!(actions, vec![TradeAction::Add, TradeAction::Remove]);
    }

    #[test]
    fn relative_mode_skips_small_changes() {
        let current = set(vec![
            supply("USDC", "Kamino", "Main", dec!(100)),
            supply("USDT", "Kamino", "Main", dec!(100)),
        ]);
        let target = set(vec![
            supply("USDC", "Kamino", "Main", dec!(104)),
            supply("USDT", "Kamino", "Main", dec!(90)),
        ]);

        let changes = compute_adjustments(&current, &target, DEFAULT_RELATIVE_THRESHOLD);

        assert_eq!(changes.len(), 1);
        match &changes[0] {
            StrategyChange::Adjust {
                symbol,
                current_amount,
                target_amount,
                difference,
                ..
            } => {
                assert_eq!(symbol, "USDT");
                assert_eq!(*current_amount, dec!(100));
                assert_eq!(*target_amount, dec!(90));
                assert_eq!(*difference, dec!(-10));
            }
            other => panic!("expected adjust, got {:?}", other),
        }
    }

    #[test]
    fn relative_mode_boundary_is_exclusive() {
        let current = set(vec![supply("USDC", "Kamino", "Main", dec!(100))]);
        let target = set(vec![supply("USDC", "Kamino", "Main", dec!(105))]);
        assert!(compute_adjustments(&current, &target, dec!(0.05)).is_empty());
    }

    #[test]
    fn relative_mode_handles_zero_current_amount() {
        let current = set(vec![supply("USDC", "Kamino", "Main", dec!(0))]);
        let grown = set(vec![supply("USDC", "Kamino", "Main", dec!(1))]);
        let unchanged = set(vec![supply("USDC", "Kamino", "Main", dec!(0))]);

        assert_eq!(
            compute_adjustments(&current, &grown, DEFAULT_RELATIVE_THRESHOLD).len(),
            1
        );
        assert!(compute_adjustments(&current, &unchanged, DEFAULT_RELATIVE_THRESHOLD).is_empty());
    }

    #[test]
    fn relative_mode_handles_ratio_overflow() {
        let current = set(vec![supply(
            "USDC",
            "Kamino",
            "Main",
            dec!(0.0000000000000000000000000001),
        )]);
        let target = set(vec![supply("USDC", "Kamino", "Main", dec!(1000000000))]);

        let changes = compute_adjustments(&current, &target, DEFAULT_RELATIVE_THRESHOLD);

        assert_eq!(changes.len(), 1);
        assert!(matches!(
            &changes[0],
            StrategyChange::Adjust { target_amount, .. } if *target_amount == dec!(1000000000)
        ));
    }

    #[test]
    fn relative_mode_reports_adds_and_removes() {
        let current = set(vec![supply("USDC", "Drift", "Perp", dec!(50))]);
        let target = set(vec![supply("USDC", "Kamino", "Main", dec!(50))]);

        let changes = compute_adjustments(&current, &target, DEFAULT_RELATIVE_THRESHOLD);

        assert!(matches!(changes[0], StrategyChange::Add { .. }));
        assert!(matches!(changes[1], StrategyChange::Remove { .. }));

        let value = serde_json::to_value(&changes[0]).unwrap();
        assert_eq!(value["action"], "add");
        assert_eq!(value["protocol_name"], "Kamino");
    }
}
