//! Urgency and execution-window classification

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::trade::Trade;

/// Yield improvement (percentage points) considered significant
pub const SIGNIFICANT_YIELD_CHANGE: Decimal = Decimal::ONE;

/// Number of full position changes considered significant
pub const SIGNIFICANT_TRADE_COUNT: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    None,
    Low,
    Medium,
    High,
}

impl Urgency {
    pub fn name(&self) -> &'static str {
        match self {
            Urgency::None => "none",
            Urgency::Low => "low",
            Urgency::Medium => "medium",
            Urgency::High => "high",
        }
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Classify how quickly a set of trades should execute.
///
/// Only adds and removes count as significant trades; resizes do not.
pub fn classify_urgency(yield_change: Decimal, trades: &[Trade]) -> Urgency {
    if trades.is_empty() {
        return Urgency::None;
    }

    let significant_trades = trades
        .iter()
        .filter(|t| t.action.is_full_position_change())
        .count();
    let many_trades = significant_trades >= SIGNIFICANT_TRADE_COUNT;
    let significant_yield = yield_change >= SIGNIFICANT_YIELD_CHANGE;

    if significant_yield && many_trades {
        Urgency::High
    } else if significant_yield || many_trades {
        Urgency::Medium
    } else {
        Urgency::Low
    }
}

/// Recommended execution window for an urgency level
pub fn timeline_for(urgency: Urgency) -> &'static str {
    match urgency {
        Urgency::High => "execute immediately to capture yield opportunity",
        Urgency::Medium => "execute within 24–48 hours",
        Urgency::Low => "execute during regular rebalancing schedule",
        Urgency::None => "no trades required at this time",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::portfolio::position::{ObligationType, Position};
    use crate::portfolio::trade::TradeAction;
    use rust_decimal_macros::dec;

    fn trade(action: TradeAction) -> Trade {
        let position = Position::new("USDC", "Kamino", "Main", ObligationType::Supply, dec!(1));
        Trade::for_position(action, &position, dec!(1))
    }

    #[test]
    fn high_when_yield_and_trades_are_significant() {
        let trades = vec![trade(TradeAction::Add), trade(TradeAction::Remove)];
        assert_eq!(classify_urgency(dec!(1.5), &trades), Urgency::High);
    }

    #[test]
    fn low_for_small_resize() {
        let trades = vec![trade(TradeAction::Increase)];
        assert_eq!(classify_urgency(dec!(0.5), &trades), Urgency::Low);
    }

    #[test]
    fn none_without_trades() {
        assert_eq!(classify_urgency(dec!(0.0), &[]), Urgency::None);
        assert_eq!(classify_urgency(dec!(5.0), &[]), Urgency::None);
    }

    #[test]
    fn medium_when_only_one_signal_fires() {
        let resize = vec![trade(TradeAction::Decrease)];
        assert_eq!(classify_urgency(dec!(1.0), &resize), Urgency::Medium);

        let swaps = vec![
            trade(TradeAction::Add),
            trade(TradeAction::Add),
            trade(TradeAction::Increase),
        ];
        assert_eq!(classify_urgency(dec!(0.2), &swaps), Urgency::Medium);
    }

    #[test]
    fn resizes_do_not_count_as_significant() {
        let trades = vec![
            trade(TradeAction::Increase),
            trade(TradeAction::Decrease),
            trade(TradeAction::Add),
        ];
        assert_eq!(classify_urgency(dec!(2), &trades), Urgency::Medium);
    }

    #[test]
    fn timelines_are_fixed_per_level() {
        assert_eq!(
            timeline_for(Urgency::High),
            "execute immediately to capture yield opportunity"
        );
        assert_eq!(timeline_for(Urgency::Medium), "execute within 24–48 hours");
        assert_eq!(
            timeline_for(Urgency::Low),
            "execute during regular rebalancing schedule"
        );
        assert_eq!(timeline_for(Urgency::None), "no trades required at this time");
    }
}
