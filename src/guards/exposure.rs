//! Protocol exposure guard
//!
//! Flags protocols that hold more of the target allocation than the risk
//! tolerance allows.

use rust_decimal::Decimal;
use std::collections::BTreeMap;

use super::{AllocationContext, AllocationGuard, GuardFinding};
use crate::config::RiskTolerance;

pub struct ProtocolExposureGuard {
    /// Maximum fraction per protocol (0.4 = 40%)
    max_exposure: Decimal,
    tolerance: RiskTolerance,
}

impl ProtocolExposureGuard {
    pub fn new(max_exposure: Decimal, tolerance: RiskTolerance) -> Self {
        Self {
            max_exposure,
            tolerance,
        }
    }
}

impl AllocationGuard for ProtocolExposureGuard {
    fn name(&self) -> &'static str {
        "protocol_exposure"
    }

    fn check(&self, context: &AllocationContext<'_>) -> Vec<GuardFinding> {
        let total: Decimal = context.target.iter().map(|p| p.amount).sum();
        if total.is_zero() {
            return Vec::new();
        }

        let mut by_protocol: BTreeMap<&str, Decimal> = BTreeMap::new();
        for position in context.target {
            *by_protocol.entry(&position.protocol).or_default() += position.amount;
        }

        by_protocol
            .into_iter()
            .filter_map(|(protocol, amount)| {
                let share = amount / total;
                if share <= self.max_exposure {
                    return None;
                }
                Some(self.finding(format!(
                    "{} holds {}% of the target allocation, above the {}% limit for {} risk",
                    protocol,
                    (share * Decimal::ONE_HUNDRED).round_dp(2).normalize(),
                    (self.max_exposure * Decimal::ONE_HUNDRED).normalize(),
                    self.tolerance
                )))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::YieldAnalysis;
    use crate::portfolio::{ObligationType, Position};
    use rust_decimal_macros::dec;

    fn supply(protocol: &str, market: &str, amount: Decimal) -> Position {
        Position::new("USDC", protocol, market, ObligationType::Supply, amount)
    }

    fn check(guard: &ProtocolExposureGuard, target: &[Position]) -> Vec<GuardFinding> {
        let analysis = YieldAnalysis::analyze(&[]);
        guard.check(&AllocationContext {
            target,
            analysis: &analysis,
        })
    }

    #[test]
    fn flags_concentrated_protocol() {
        let guard = ProtocolExposureGuard::new(dec!(0.4), RiskTolerance::Medium);
        let target = vec![
            supply("Kamino", "Main", dec!(300)),
            supply("Kamino", "JLP", dec!(200)),
            supply("Solend", "Main", dec!(250)),
            supply("Drift", "Perp", dec!(250)),
        ];

        let findings = check(&guard, &target);
        assert_eq!(findings.len(), 1);
        assert_eq!(
            findings[0].message,
            "Kamino holds 50% of the target allocation, above the 40% limit for medium risk"
        );
    }

    #[test]
    fn share_at_limit_passes() {
        let guard = ProtocolExposureGuard::new(dec!(0.5), RiskTolerance::High);
        let target = vec![
            supply("Kamino", "Main", dec!(100)),
            supply("Solend", "Main", dec!(100)),
        ];
        assert!(check(&guard, &target).is_empty());
    }

    #[test]
    fn zero_total_passes() {
        let guard = ProtocolExposureGuard::new(dec!(0.2), RiskTolerance::Low);
        assert!(check(&guard, &[supply("Kamino", "Main", dec!(0))]).is_empty());
    }
}
