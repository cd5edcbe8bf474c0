//! Yield analysis across lending reserves

use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::{self, Write as _};

use super::MarketData;

/// Number of reserves reported as best yields
pub const BEST_YIELD_COUNT: usize = 5;

const STABLE_TREND_BAND: Decimal = Decimal::from_parts(1, 0, 0, false, 1);
const HIGH_UTILIZATION_PERCENT: Decimal = Decimal::from_parts(80, 0, 0, false, 0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum YieldTrend {
    Up,
    Down,
    Stable,
    Unknown,
}

impl YieldTrend {
    /// Compare the current rate against its 30 day average.
    /// Without both 7d and 30d history the trend is unknown.
    pub fn classify(rate: Decimal, rate_7d: Option<Decimal>, rate_30d: Option<Decimal>) -> Self {
        match (rate_7d, rate_30d) {
            (Some(_), Some(rate_30d)) => {
                if (rate - rate_30d).abs() < STABLE_TREND_BAND {
                    YieldTrend::Stable
                } else if rate > rate_30d {
                    YieldTrend::Up
                } else {
                    YieldTrend::Down
                }
            }
            _ => YieldTrend::Unknown,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            YieldTrend::Up => "up",
            YieldTrend::Down => "down",
            YieldTrend::Stable => "stable",
            YieldTrend::Unknown => "unknown",
        }
    }
}

impl fmt::Display for YieldTrend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A reserve flattened out of its token, with derived metrics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReserveYield {
    pub token: String,
    pub protocol: String,
    pub market: String,
    pub supply_rate: Decimal,
    pub total_supply: Decimal,
    pub total_borrows: Decimal,
    /// Percent, 2 dp
    pub utilization: Decimal,
    pub trend: YieldTrend,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supply_rate_7d: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supply_rate_30d: Option<Decimal>,
}

impl ReserveYield {
    pub fn matches(&self, symbol: &str, protocol: &str, market: &str) -> bool {
        self.token == symbol && self.protocol == protocol && self.market == market
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProtocolStats {
    pub avg_yield: Decimal,
    pub max_yield: Decimal,
    pub min_yield: Decimal,
    pub avg_utilization: Decimal,
    pub market_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YieldAnalysis {
    pub best_yields: Vec<ReserveYield>,
    pub protocol_comparison: BTreeMap<String, ProtocolStats>,
    pub market_insights: Vec<String>,
    #[serde(skip)]
    reserves: Vec<ReserveYield>,
}

impl YieldAnalysis {
    pub fn analyze(markets: &[MarketData]) -> Self {
        let reserves = flatten_reserves(markets);

        let mut best_yields = reserves.clone();
        best_yields.sort_by(|a, b| b.supply_rate.cmp(&a.supply_rate));
        best_yields.truncate(BEST_YIELD_COUNT);

        let protocol_comparison = compare_protocols(&reserves);
        let market_insights = market_insights(&reserves, &protocol_comparison);

        tracing::debug!(
            reserves = reserves.len(),
            protocols = protocol_comparison.len(),
            "Analyzed lending yields"
        );

        Self {
            best_yields,
            protocol_comparison,
            market_insights,
            reserves,
        }
    }

    /// Every reserve in market order
    pub fn reserves(&self) -> &[ReserveYield] {
        &self.reserves
    }

    /// Current supply rate of the given market, if known
    pub fn rate_for(&self, symbol: &str, protocol: &str, market: &str) -> Option<Decimal> {
        self.reserves
            .iter()
            .find(|r| r.matches(symbol, protocol, market))
            .map(|r| r.supply_rate)
    }

    pub fn to_markdown(&self) -> String {
        let mut md = String::from("# DeFi Lending Yield Analysis\n\n");

        md.push_str("## Top Yield Opportunities\n\n");
        md.push_str("| Token | Protocol | Market | Supply Rate | Utilization | Trend |\n");
        md.push_str("| ----- | -------- | ------ | ----------- | ----------- | ----- |\n");
        for r in &self.best_yields {
            let _ = writeln!(
                md,
                "| {} | {} | {} | {}% | {}% | {} |",
                r.token,
                r.protocol,
                r.market,
                r.supply_rate.normalize(),
                r.utilization.normalize(),
                r.trend
            );
        }

        md.push_str("\n## Protocol Comparison\n\n");
        md.push_str("| Protocol | Avg Yield | Max Yield | Min Yield | Avg Utilization | Markets |\n");
        md.push_str("| -------- | --------- | --------- | --------- | --------------- | ------- |\n");
        for (protocol, stats) in &self.protocol_comparison {
            let _ = writeln!(
                md,
                "| {} | {}% | {}% | {}% | {}% | {} |",
                protocol,
                stats.avg_yield.normalize(),
                stats.max_yield.normalize(),
                stats.min_yield.normalize(),
                stats.avg_utilization.normalize(),
                stats.market_count
            );
        }

        md.push_str("\n## Market Insights\n\n");
        for insight in &self.market_insights {
            let _ = writeln!(md, "- {}", insight);
        }
        md
    }
}

fn flatten_reserves(markets: &[MarketData]) -> Vec<ReserveYield> {
    markets
        .iter()
        .flat_map(|token| {
            token.lending_reserves.iter().map(move |reserve| ReserveYield {
                token: token.symbol.clone(),
                protocol: reserve.protocol_name.clone(),
                market: reserve.market_name.clone(),
                supply_rate: reserve.supply_rate,
                total_supply: reserve.total_supply,
                total_borrows: reserve.total_borrows,
                utilization: (reserve.utilization() * Decimal::ONE_HUNDRED).round_dp(2),
                trend: YieldTrend::classify(
                    reserve.supply_rate,
                    reserve.supply_rate_7d,
                    reserve.supply_rate_30d,
                ),
                supply_rate_7d: reserve.supply_rate_7d,
                supply_rate_30d: reserve.supply_rate_30d,
            })
        })
        .collect()
}

fn compare_protocols(reserves: &[ReserveYield]) -> BTreeMap<String, ProtocolStats> {
    let mut grouped: BTreeMap<&str, Vec<&ReserveYield>> = BTreeMap::new();
    for reserve in reserves {
        grouped.entry(&reserve.protocol).or_default().push(reserve);
    }

    grouped
        .into_iter()
        .map(|(protocol, members)| {
            let count = Decimal::from(members.len());
            let yields = members.iter().map(|r| r.supply_rate);
            let total_yield: Decimal = yields.clone().sum();
            let total_utilization: Decimal = members.iter().map(|r| r.utilization).sum();

            let stats = ProtocolStats {
                avg_yield: (total_yield / count).round_dp(2),
                max_yield: yields.clone().max().unwrap_or_default().round_dp(2),
                min_yield: yields.min().unwrap_or_default().round_dp(2),
                avg_utilization: (total_utilization / count).round_dp(2),
                market_count: members.len(),
            };
            (protocol.to_string(), stats)
        })
        .collect()
}

/// First reserve with the highest supply rate among those matching `trend`
fn top_by_trend(reserves: &[ReserveYield], trend: YieldTrend) -> Option<&ReserveYield> {
    reserves
        .iter()
        .filter(|r| r.trend == trend)
        .fold(None, |best: Option<&ReserveYield>, r| match best {
            Some(b) if b.supply_rate >= r.supply_rate => Some(b),
            _ => Some(r),
        })
}

fn market_insights(
    reserves: &[ReserveYield],
    comparison: &BTreeMap<String, ProtocolStats>,
) -> Vec<String> {
    let mut insights = Vec::new();

    let highest = comparison
        .iter()
        .fold(None, |best: Option<(&String, &ProtocolStats)>, entry| match best {
            Some(b) if b.1.avg_yield >= entry.1.avg_yield => Some(b),
            _ => Some(entry),
        });
    if let Some((protocol, stats)) = highest {
        insights.push(format!(
            "{} currently offers the highest average yield at {}%",
            protocol,
            stats.avg_yield.normalize()
        ));
    }

    let busy: Vec<&str> = comparison
        .iter()
        .filter(|(_, stats)| stats.avg_utilization > HIGH_UTILIZATION_PERCENT)
        .map(|(protocol, _)| protocol.as_str())
        .collect();
    if !busy.is_empty() {
        let verb = if busy.len() == 1 { "has" } else { "have" };
        insights.push(format!(
            "{} {} high utilization rates, which may indicate increased borrowing demand and potential for higher rates",
            busy.join(", "),
            verb
        ));
    }

    if let Some(r) = top_by_trend(reserves, YieldTrend::Up) {
        insights.push(format!(
            "{}'s {} has an upward yield trend, currently at {}%",
            r.protocol,
            r.market,
            r.supply_rate.normalize()
        ));
    }
    if let Some(r) = top_by_trend(reserves, YieldTrend::Down) {
        insights.push(format!(
            "{}'s {} has a downward yield trend, currently at {}%",
            r.protocol,
            r.market,
            r.supply_rate.normalize()
        ));
    }

    insights
}
