//! Rebalancing core
//!
//! Pure, deterministic computations over position snapshots:
//! - diff current positions against a target allocation
//! - sequence trades withdraw-before-deposit
//! - classify urgency and execution window
//! - blend yield-oriented and risk-oriented allocations
//!
//! All amounts are `rust_decimal::Decimal`. Nothing here performs I/O.

mod blend;
mod diff;
mod plan;
mod position;
mod sequencer;
mod trade;
mod urgency;

pub use blend::{blend, BlendWeights, MAX_RISK_SCORE, MIN_RISK_SCORE};
pub use diff::{
    compute_adjustments, compute_trades, StrategyChange, DEFAULT_DUST_THRESHOLD,
    DEFAULT_RELATIVE_THRESHOLD,
};
pub use plan::{sum_balances, ExecutionPlan, ExecutionStrategy, ProtocolSettingsTable};
pub use position::{
    AmountField, Balance, BalanceRecord, ObligationType, Position, PositionKey, PositionRecord,
    PositionSet,
};
pub use sequencer::order_trades;
pub use trade::{ProtocolSettings, Trade, TradeAction};
pub use urgency::{
    classify_urgency, timeline_for, Urgency, SIGNIFICANT_TRADE_COUNT, SIGNIFICANT_YIELD_CHANGE,
};
