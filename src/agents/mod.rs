//! LLM-backed agents

mod risk_manager;

pub use risk_manager::{RiskAssessment, RiskManager};
