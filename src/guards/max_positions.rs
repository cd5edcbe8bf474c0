//! Caps the number of large positions in a target allocation

use rust_decimal::Decimal;

use super::{AllocationContext, AllocationGuard, GuardFinding};

pub struct MaxPositionsGuard {
    max_positions: usize,
    /// Positions above this amount count toward the cap
    large_position_usd: Decimal,
}

impl MaxPositionsGuard {
    pub fn new(max_positions: usize, large_position_usd: Decimal) -> Self {
        Self {
            max_positions,
            large_position_usd,
        }
    }
}

impl AllocationGuard for MaxPositionsGuard {
    fn name(&self) -> &'static str {
        "max_positions"
    }

    fn check(&self, context: &AllocationContext<'_>) -> Vec<GuardFinding> {
        let large = context
            .target
            .iter()
            .filter(|p| p.amount > self.large_position_usd)
            .count();

        if large <= self.max_positions {
            return Vec::new();
        }
        vec![self.finding(format!(
            "{} positions exceed ${}, more than the maximum of {}",
            large,
            self.large_position_usd.normalize(),
            self.max_positions
        ))]
    }
}
