//! Blending of yield-oriented and risk-oriented target allocations

use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;

use super::position::{ObligationType, Position};
use crate::{Error, Result};

pub const MIN_RISK_SCORE: f64 = 0.0;
pub const MAX_RISK_SCORE: f64 = 10.0;

/// Decimal places kept on blended amounts
const BLEND_SCALE: u32 = 4;

/// Contribution of each allocation to the blended target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BlendWeights {
    pub yield_weight: Decimal,
    pub risk_weight: Decimal,
}

impl BlendWeights {
    /// Pick weights for a risk score on the 0-10 scale
    pub fn for_risk_score(risk_score: f64) -> Result<Self> {
        if !(MIN_RISK_SCORE..=MAX_RISK_SCORE).contains(&risk_score) {
            return Err(Error::InvalidRiskScore(risk_score));
        }

        let (yield_weight, risk_weight) = if risk_score < 3.0 {
            (Decimal::new(8, 1), Decimal::new(2, 1))
        } else if risk_score < 6.0 {
            (Decimal::new(5, 1), Decimal::new(5, 1))
        } else {
            (Decimal::new(2, 1), Decimal::new(8, 1))
        };

        Ok(Self {
            yield_weight,
            risk_weight,
        })
    }
}

struct BlendEntry {
    symbol: String,
    protocol: String,
    market: String,
    obligation_type: ObligationType,
    yield_amount: Decimal,
    risk_amount: Decimal,
    seen_yield: bool,
    seen_risk: bool,
}

impl BlendEntry {
    fn check_consistent(&self, position: &Position) -> Result<()> {
        if self.symbol != position.symbol || self.obligation_type != position.obligation_type {
            return Err(Error::MalformedPosition(format!(
                "conflicting allocations for {}/{}: {} {} vs {} {}",
                self.protocol,
                self.market,
                self.symbol,
                self.obligation_type,
                position.symbol,
                position.obligation_type
            )));
        }
        Ok(())
    }
}

/// Merge two target allocations keyed by (protocol, market).
///
/// A market missing from one side contributes zero from that side. Blended
/// amounts are rounded to 4 decimal places and zero results are dropped.
/// Output follows first appearance: yield-side keys, then risk-only keys.
pub fn blend(
    yield_positions: &[Position],
    risk_positions: &[Position],
    risk_score: f64,
) -> Result<Vec<Position>> {
    let weights = BlendWeights::for_risk_score(risk_score)?;

    let mut order: Vec<(String, String)> = Vec::new();
    let mut entries: HashMap<(String, String), BlendEntry> = HashMap::new();

    for (is_yield_side, positions) in [(true, yield_positions), (false, risk_positions)] {
        for position in positions {
            let key = (position.protocol.clone(), position.market.clone());
            match entries.get_mut(&key) {
                Some(entry) => {
                    entry.check_consistent(position)?;
                    let (seen, slot) = if is_yield_side {
                        (&mut entry.seen_yield, &mut entry.yield_amount)
                    } else {
                        (&mut entry.seen_risk, &mut entry.risk_amount)
                    };
                    if *seen {
                        return Err(Error::MalformedPosition(format!(
                            "market {}/{} listed twice in one allocation",
                            position.protocol, position.market
                        )));
                    }
                    *seen = true;
                    *slot = position.amount;
                }
                None => {
                    let (yield_amount, risk_amount) = if is_yield_side {
                        (position.amount, Decimal::ZERO)
                    } else {
                        (Decimal::ZERO, position.amount)
                    };
                    entries.insert(
                        key.clone(),
                        BlendEntry {
                            symbol: position.symbol.clone(),
                            protocol: position.protocol.clone(),
                            market: position.market.clone(),
                            obligation_type: position.obligation_type.clone(),
                            yield_amount,
                            risk_amount,
                            seen_yield: is_yield_side,
                            seen_risk: !is_yield_side,
                        },
                    );
                    order.push(key);
                }
            }
        }
    }

    let blended = order
        .iter()
        .filter_map(|key| entries.remove(key))
        .filter_map(|entry| {
            let amount = (entry.yield_amount * weights.yield_weight
                + entry.risk_amount * weights.risk_weight)
                .round_dp(BLEND_SCALE);
            if amount.is_zero() {
                return None;
            }
            Some(Position::new(
                entry.symbol,
                entry.protocol,
                entry.market,
                entry.obligation_type,
                amount,
            ))
        })
        .collect::<Vec<_>>();

    tracing::debug!(
        risk_score,
        yield_weight = %weights.yield_weight,
        risk_weight = %weights.risk_weight,
        positions = blended.len(),
        "Blended target allocations"
    );

    Ok(blended)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn supply(protocol: &str, market: &str, amount: Decimal) -> Position {
        Position::new("USDC", protocol, market, ObligationType::Supply, amount)
    }

    #[test]
    fn weights_sum_to_one_in_every_bucket() {
        for score in [0.0, 2.99, 3.0, 4.5, 5.99, 6.0, 10.0] {
            let weights = BlendWeights::for_risk_score(score).unwrap();
            assert_eq!(weights.yield_weight + weights.risk_weight, Decimal::ONE);
        }
    }

    #[test]
    fn bucket_boundaries() {
        assert_eq!(
            BlendWeights::for_risk_score(2.9).unwrap().yield_weight,
            dec!(0.8)
        );
        assert_eq!(
            BlendWeights::for_risk_score(3.0).unwrap().yield_weight,
            dec!(0.5)
        );
        assert_eq!(
            BlendWeights::for_risk_score(6.0).unwrap().yield_weight,
            dec!(0.2)
        );
    }

    #[test]
    fn high_risk_score_favors_risk_allocation() {
        let blended = blend(
            &[supply("ProtoA", "MktX", dec!(50))],
            &[supply("ProtoA", "MktX", dec!(30))],
            7.0,
        )
        .unwrap();

        assert_eq!(blended.len(), 1);
        assert_eq!(blended[0].amount, dec!(34.0));
    }

    #[test]
    fn missing_side_counts_as_zero() {
        let blended = blend(
            &[supply("Kamino", "Main", dec!(100))],
            &[supply("Drift", "Perp", dec!(100))],
            1.0,
        )
        .unwrap();

        assert_eq!(blended.len(), 2);
        assert_eq!(blended[0].protocol, "Kamino");
        assert_eq!(blended[0].amount, dec!(80));
        assert_eq!(blended[1].protocol, "Drift");
        assert_eq!(blended[1].amount, dec!(20));
    }

    #[test]
    fn zero_results_are_dropped() {
        let blended = blend(
            &[supply("Kamino", "Main", dec!(0))],
            &[supply("Kamino", "Main", dec!(0)), supply("Drift", "Perp", dec!(10))],
            4.0,
        )
        .unwrap();

        assert_eq!(blended.len(), 1);
        assert_eq!(blended[0].protocol, "Drift");
        assert_eq!(blended[0].amount, dec!(5));
    }

    #[test]
    fn rounds_to_four_places() {
        let blended = blend(
            &[supply("Kamino", "Main", dec!(3333.333333))],
            &[],
            0.0,
        )
        .unwrap();
        assert_eq!(blended[0].amount, dec!(2666.6667));
    }

    #[test]
    fn rejects_out_of_range_scores() {
        for score in [-0.1, 10.5, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                blend(&[], &[], score),
                Err(Error::InvalidRiskScore(_))
            ));
        }
    }

    #[test]
    fn rejects_conflicting_symbols_for_a_market() {
        let sol = Position::new("SOL", "Kamino", "Main", ObligationType::Supply, dec!(10));
        let result = blend(&[supply("Kamino", "Main", dec!(10))], &[sol], 5.0);
        assert!(matches!(result, Err(Error::MalformedPosition(_))));
    }

    #[test]
    fn rejects_market_listed_twice_on_one_side() {
        let result = blend(
            &[
                supply("Kamino", "Main", dec!(10)),
                supply("Kamino", "Main", dec!(20)),
            ],
            &[],
            5.0,
        );
        assert!(matches!(result, Err(Error::MalformedPosition(_))));
    }

    #[test]
    fn empty_inputs_blend_to_nothing() {
        assert!(blend(&[], &[], 5.0).unwrap().is_empty());
    }
}
