//! Configuration for the portfolio optimizer
//!
//! `Config` is built once at startup and passed by reference (or `Arc`) to
//! every component. Nothing mutates it after `validate` succeeds.

pub mod endpoints;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub use endpoints::{DataApiConfig, LlmSettings, OPENAI_API_KEY_ENV};

use crate::portfolio::ProtocolSettingsTable;
use crate::tools::ToolId;
use crate::{Error, Result};

/// How much concentration risk the operator accepts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTolerance {
    Low,
    #[default]
    Medium,
    High,
}

impl RiskTolerance {
    pub fn name(&self) -> &'static str {
        match self {
            RiskTolerance::Low => "low",
            RiskTolerance::Medium => "medium",
            RiskTolerance::High => "high",
        }
    }
}

impl fmt::Display for RiskTolerance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RiskTolerance {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(RiskTolerance::Low),
            "medium" => Ok(RiskTolerance::Medium),
            "high" => Ok(RiskTolerance::High),
            other => Err(Error::Config(format!(
                "Risk level must be one of: low, medium, high (got '{}')",
                other
            ))),
        }
    }
}

/// Maximum share of the portfolio a single protocol may hold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskParameters {
    pub max_exposure_low: Decimal,
    pub max_exposure_medium: Decimal,
    pub max_exposure_high: Decimal,
    #[serde(default)]
    pub tolerance: RiskTolerance,
}

impl RiskParameters {
    pub fn max_exposure(&self) -> Decimal {
        self.max_exposure_for(self.tolerance)
    }

    pub fn max_exposure_for(&self, tolerance: RiskTolerance) -> Decimal {
        match tolerance {
            RiskTolerance::Low => self.max_exposure_low,
            RiskTolerance::Medium => self.max_exposure_medium,
            RiskTolerance::High => self.max_exposure_high,
        }
    }
}

impl Default for RiskParameters {
    fn default() -> Self {
        Self {
            max_exposure_low: Decimal::new(2, 1),    // 20% per protocol
            max_exposure_medium: Decimal::new(4, 1), // 40% per protocol
            max_exposure_high: Decimal::new(6, 1),   // 60% per protocol
            tolerance: RiskTolerance::Medium,
        }
    }
}

/// Portfolio construction rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationalRules {
    /// Minimum acceptable supply rate, in percent
    pub min_yield: Decimal,
    /// Maximum number of positions above `large_position_usd`
    pub max_positions: usize,
    pub large_position_usd: Decimal,
    /// Positions at or below this size are never closed
    pub min_position_size: Decimal,
    /// Smallest fraction of the portfolio worth holding as a position
    pub min_position_allocation: Decimal,
}

impl Default for OperationalRules {
    fn default() -> Self {
        Self {
            min_yield: Decimal::new(40, 1),
            max_positions: 5,
            large_position_usd: Decimal::new(1000, 0),
            min_position_size: Decimal::ONE,
            min_position_allocation: Decimal::new(10, 2),
        }
    }
}

/// Knobs for plan construction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebalanceSettings {
    /// Absolute delta below which a wallet-level trade is suppressed
    pub dust_threshold: Decimal,
    /// Relative delta below which a strategy-level change is ignored
    pub strategy_change_threshold: Decimal,
    pub max_batch_size: usize,
    /// Number of top opportunities the yield strategy allocates to
    pub strategy_slots: usize,
}

impl Default for RebalanceSettings {
    fn default() -> Self {
        Self {
            dust_threshold: crate::portfolio::DEFAULT_DUST_THRESHOLD,
            strategy_change_threshold: crate::portfolio::DEFAULT_RELATIVE_THRESHOLD,
            max_batch_size: 5,
            strategy_slots: 3,
        }
    }
}

fn default_tools() -> Vec<String> {
    ToolId::ALL.iter().map(|id| id.name().to_string()).collect()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub risk: RiskParameters,
    #[serde(default)]
    pub rules: OperationalRules,
    #[serde(default)]
    pub rebalance: RebalanceSettings,
    #[serde(default)]
    pub data_api: DataApiConfig,
    /// LLM settings; without them the risk manager is skipped
    #[serde(default)]
    pub llm: Option<LlmSettings>,
    /// Data tools to register, by name
    #[serde(default = "default_tools")]
    pub tools: Vec<String>,
    #[serde(default)]
    pub protocol_settings: ProtocolSettingsTable,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Path to audit log file
    pub audit_log_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            risk: RiskParameters::default(),
            rules: OperationalRules::default(),
            rebalance: RebalanceSettings::default(),
            data_api: DataApiConfig::default(),
            llm: None,
            tools: default_tools(),
            protocol_settings: ProtocolSettingsTable::default(),
            output_dir: default_output_dir(),
            audit_log_path: Some(PathBuf::from("audit.jsonl")),
        }
    }
}

impl Config {
    /// Load from a JSON file, or fall back to defaults. The result is validated.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path).map_err(|e| {
                    Error::Config(format!("Failed to read {}: {}", path.display(), e))
                })?;
                serde_json::from_str(&content).map_err(|e| {
                    Error::Config(format!("Failed to parse {}: {}", path.display(), e))
                })?
            }
            None => Config::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Copy of this config with a different risk tolerance
    pub fn with_tolerance(mut self, tolerance: RiskTolerance) -> Self {
        self.risk.tolerance = tolerance;
        self
    }

    pub fn validate(&self) -> Result<()> {
        let rebalance = &self.rebalance;
        if rebalance.dust_threshold.is_sign_negative() {
            return Err(Error::Config(format!(
                "dust_threshold must not be negative (got {})",
                rebalance.dust_threshold
            )));
        }
        if rebalance.strategy_change_threshold.is_sign_negative() {
            return Err(Error::Config(format!(
                "strategy_change_threshold must not be negative (got {})",
                rebalance.strategy_change_threshold
            )));
        }
        if rebalance.max_batch_size == 0 {
            return Err(Error::Config("max_batch_size must be at least 1".to_string()));
        }
        if rebalance.strategy_slots == 0 {
            return Err(Error::Config("strategy_slots must be at least 1".to_string()));
        }

        for tolerance in [RiskTolerance::Low, RiskTolerance::Medium, RiskTolerance::High] {
            let exposure = self.risk.max_exposure_for(tolerance);
            if exposure <= Decimal::ZERO || exposure > Decimal::ONE {
                return Err(Error::Config(format!(
                    "max exposure for {} risk must be in (0, 1] (got {})",
                    tolerance, exposure
                )));
            }
        }

        for name in &self.tools {
            name.parse::<ToolId>()?;
        }
        Ok(())
    }
}
