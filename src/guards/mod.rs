//! Allocation guards and audit trail
//!
//! Every target allocation passes through the guard pipeline before it is
//! turned into an execution plan. Guards never drop or rewrite positions;
//! they report findings, which end up in the optimization report.

mod audit_log;
mod exposure;
mod max_positions;
mod min_yield;

use serde::Serialize;
use std::fmt;

pub use audit_log::{AuditEntry, AuditLog};
pub use exposure::ProtocolExposureGuard;
pub use max_positions::MaxPositionsGuard;
pub use min_yield::MinYieldGuard;

use crate::config::Config;
use crate::market::YieldAnalysis;
use crate::portfolio::Position;

/// What a guard looks at
pub struct AllocationContext<'a> {
    pub target: &'a [Position],
    pub analysis: &'a YieldAnalysis,
}

/// A rule violation in a target allocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GuardFinding {
    pub guard: &'static str,
    pub message: String,
}

impl fmt::Display for GuardFinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.guard, self.message)
    }
}

pub trait AllocationGuard: Send + Sync {
    fn name(&self) -> &'static str;

    fn check(&self, context: &AllocationContext<'_>) -> Vec<GuardFinding>;

    fn finding(&self, message: String) -> GuardFinding {
        GuardFinding {
            guard: self.name(),
            message,
        }
    }
}

/// Ordered set of guards run against each target
pub struct GuardPipeline {
    guards: Vec<Box<dyn AllocationGuard>>,
}

impl GuardPipeline {
    pub fn new(guards: Vec<Box<dyn AllocationGuard>>) -> Self {
        Self { guards }
    }

    /// Exposure, position count and minimum yield rules from `config`
    pub fn from_config(config: &Config) -> Self {
        Self::new(vec![
            Box::new(ProtocolExposureGuard::new(
                config.risk.max_exposure(),
                config.risk.tolerance,
            )),
            Box::new(MaxPositionsGuard::new(
                config.rules.max_positions,
                config.rules.large_position_usd,
            )),
            Box::new(MinYieldGuard::new(config.rules.min_yield)),
        ])
    }

    pub fn run(&self, context: &AllocationContext<'_>) -> Vec<GuardFinding> {
        let findings: Vec<GuardFinding> = self
            .guards
            .iter()
            .flat_map(|guard| guard.check(context))
            .collect();

        for finding in &findings {
            tracing::warn!(guard = finding.guard, "{}", finding.message);
        }
        tracing::debug!(
            guards = self.guards.len(),
            findings = findings.len(),
            "Guard checks complete"
        );
        findings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::MarketData;
    use crate::portfolio::ObligationType;
    use rust_decimal_macros::dec;

    #[test]
    fn default_pipeline_reports_each_rule() {
        let markets = MarketData::parse_list(crate::market::fixtures::markets_json()).unwrap();
        let analysis = YieldAnalysis::analyze(&markets);
        // all on Drift (100% exposure), one market below 4% and one unknown
        let target = vec![
            Position::new("SOL", "Drift", "Perp", ObligationType::Supply, dec!(50)),
            Position::new("USDC", "Drift", "Nowhere", ObligationType::Supply, dec!(50)),
        ];

        let findings = GuardPipeline::from_config(&Config::default()).run(&AllocationContext {
            target: &target,
            analysis: &analysis,
        });

        let guards: Vec<_> = findings.iter().map(|f| f.guard).collect();
        assert_eq!(
            guards,
            vec!["protocol_exposure", "min_yield", "min_yield"]
        );
    }

    #[test]
    fn empty_target_passes() {
        let analysis = YieldAnalysis::analyze(&[]);
        let findings = GuardPipeline::from_config(&Config::default()).run(&AllocationContext {
            target: &[],
            analysis: &analysis,
        });
        assert!(findings.is_empty());
    }
}
