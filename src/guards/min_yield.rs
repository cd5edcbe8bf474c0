//! Minimum yield guard
//!
//! Supply positions must sit in a market paying at least the configured rate.
//! Markets missing from the analysis cannot be verified and are flagged too.
//! Borrow positions are not checked.

use rust_decimal::Decimal;

use super::{AllocationContext, AllocationGuard, GuardFinding};
use crate::portfolio::ObligationType;

pub struct MinYieldGuard {
    /// Percent
    min_yield: Decimal,
}

impl MinYieldGuard {
    pub fn new(min_yield: Decimal) -> Self {
        Self { min_yield }
    }
}

impl AllocationGuard for MinYieldGuard {
    fn name(&self) -> &'static str {
        "min_yield"
    }

    fn check(&self, context: &AllocationContext<'_>) -> Vec<GuardFinding> {
        context
            .target
            .iter()
            .filter(|p| p.obligation_type != ObligationType::Borrow)
            .filter_map(|p| {
                match context.analysis.rate_for(&p.symbol, &p.protocol, &p.market) {
                    Some(rate) if rate >= self.min_yield => None,
                    Some(rate) => Some(self.finding(format!(
                        "{} on {} {} yields {}%, below the {}% minimum",
                        p.symbol,
                        p.protocol,
                        p.market,
                        rate.normalize(),
                        self.min_yield.normalize()
                    ))),
                    None => Some(self.finding(format!(
                        "{} on {} {} has no market data; yield cannot be verified",
                        p.symbol, p.protocol, p.market
                    ))),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::{fixtures::markets_json, MarketData, YieldAnalysis};
    use crate::portfolio::Position;
    use rust_decimal_macros::dec;

    fn analysis() -> YieldAnalysis {
        YieldAnalysis::analyze(&MarketData::parse_list(markets_json()).unwrap())
    }

    #[test]
    fn flags_low_and_unknown_markets() {
        let guard = MinYieldGuard::new(dec!(4.0));
        let analysis = analysis();
        let target = vec![
            Position::new("USDC", "Kamino", "Main", ObligationType::Supply, dec!(10)),
            Position::new("SOL", "Drift", "Perp", ObligationType::Supply, dec!(10)),
            Position::new("BONK", "Kamino", "Main", ObligationType::Supply, dec!(10)),
        ];

        let findings = guard.check(&AllocationContext {
            target: &target,
            analysis: &analysis,
        });
        let messages: Vec<_> = findings.iter().map(|f| f.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "SOL on Drift Perp yields 3%, below the 4% minimum",
                "BONK on Kamino Main has no market data; yield cannot be verified",
            ]
        );
    }

    #[test]
    fn borrows_are_not_checked() {
        let guard = MinYieldGuard::new(dec!(4.0));
        let analysis = analysis();
        let target = vec![Position::new(
            "SOL",
            "Drift",
            "Perp",
            ObligationType::Borrow,
            dec!(10),
        )];
        assert!(guard
            .check(&AllocationContext {
                target: &target,
                analysis: &analysis,
            })
            .is_empty());
    }
}
