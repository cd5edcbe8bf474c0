//! Optimization pipeline
//!
//! Runs one optimization pass for a wallet: fetch market and wallet data,
//! analyze yields, optionally ask the risk manager, blend the two targets,
//! check the result against the guards, and build the execution plan.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::agents::{RiskAssessment, RiskManager};
use crate::config::{Config, LlmSettings, RiskTolerance};
use crate::guards::{AllocationContext, AuditEntry, AuditLog, GuardFinding, GuardPipeline};
use crate::llm::{LlmClient, OpenAiClient};
use crate::market::{YieldAnalysis, YieldStrategy};
use crate::portfolio::{
    blend, compute_adjustments, ExecutionPlan, Position, PositionSet, StrategyChange,
};
use crate::tools::ToolRegistry;
use crate::wallet::{WalletSnapshot, WalletSummary};
use crate::{Error, Result};

/// Everything one optimization pass produced
#[derive(Debug, Clone, Serialize)]
pub struct OptimizationReport {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub risk_tolerance: RiskTolerance,
    pub wallet_summary: WalletSummary,
    pub market_analysis: YieldAnalysis,
    pub yield_strategy: YieldStrategy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_assessment: Option<RiskAssessment>,
    pub target_allocation: Vec<Position>,
    pub guard_findings: Vec<GuardFinding>,
    /// Yield strategy compared against the wallet, ignoring small relative moves
    pub strategy_changes: Vec<StrategyChange>,
    pub execution_plan: ExecutionPlan,
}

/// Target allocation: the yield strategy alone, or blended with the risk
/// manager's proposal when there is one.
pub fn blend_target(
    yield_positions: &[Position],
    assessment: Option<&RiskAssessment>,
) -> Result<Vec<Position>> {
    match assessment {
        Some(assessment) => blend(
            yield_positions,
            &assessment.target_positions,
            assessment.risk_score,
        ),
        None => Ok(yield_positions.to_vec()),
    }
}

pub struct Optimizer {
    config: Arc<Config>,
    tools: ToolRegistry,
    risk_manager: Option<RiskManager>,
    guards: GuardPipeline,
    audit: Option<AuditLog>,
}

impl Optimizer {
    pub fn new(config: Arc<Config>, tools: ToolRegistry) -> Self {
        let guards = GuardPipeline::from_config(&config);
        let audit = config.audit_log_path.as_ref().map(AuditLog::new);
        Self {
            config,
            tools,
            risk_manager: None,
            guards,
            audit,
        }
    }

    /// Build HTTP tools and, when an API key is available, the LLM client
    pub fn from_config(config: Arc<Config>) -> Result<Self> {
        let tools = ToolRegistry::from_config(&config)?;
        let settings = config.llm.clone().or_else(LlmSettings::from_env);
        let mut optimizer = Self::new(config, tools);

        match settings {
            Some(settings) => {
                let client = OpenAiClient::from_settings(&settings)?;
                info!(model = client.model(), "Risk manager enabled");
                optimizer = optimizer.with_llm(Arc::new(client));
            }
            None => warn!("No LLM configured; targets come from the yield strategy alone"),
        }
        Ok(optimizer)
    }

    pub fn with_llm(mut self, client: Arc<dyn LlmClient>) -> Self {
        self.risk_manager = Some(RiskManager::new(client));
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Same tools, LLM and audit log, with guards rebuilt for `tolerance`
    pub fn for_tolerance(&self, tolerance: RiskTolerance) -> Self {
        let config = Arc::new(self.config.as_ref().clone().with_tolerance(tolerance));
        Self {
            guards: GuardPipeline::from_config(&config),
            tools: self.tools.clone(),
            risk_manager: self.risk_manager.clone(),
            audit: self.audit.clone(),
            config,
        }
    }

    pub async fn analyze_markets(&self) -> Result<YieldAnalysis> {
        let markets = self.tools.fetch_markets().await?;
        Ok(YieldAnalysis::analyze(&markets))
    }

    /// Run one optimization pass for `wallet_id`
    pub async fn run(&self, wallet_id: &str) -> Result<OptimizationReport> {
        let run_id = Uuid::new_v4();
        info!(
            %run_id,
            wallet_id,
            risk_tolerance = %self.config.risk.tolerance,
            "Starting optimization"
        );

        match self.optimize(run_id, wallet_id).await {
            Ok(report) => {
                self.audit(AuditEntry::success(
                    run_id,
                    "optimization_complete",
                    json!({
                        "wallet_id": wallet_id,
                        "risk_tolerance": report.risk_tolerance,
                        "risk_score": report.risk_assessment.as_ref().map(|a| a.risk_score),
                        "trades": report.execution_plan.trades,
                        "urgency": report.execution_plan.urgency,
                        "guard_findings": report.guard_findings.len(),
                    }),
                ))
                .await;
                Ok(report)
            }
            Err(e) => {
                self.audit(AuditEntry::failure(run_id, "optimization_failed", &e))
                    .await;
                Err(e)
            }
        }
    }

    async fn optimize(&self, run_id: Uuid, wallet_id: &str) -> Result<OptimizationReport> {
        let config = &self.config;

        let (markets, wallet) = tokio::try_join!(
            self.tools.fetch_markets(),
            self.tools.fetch_wallet(wallet_id)
        )?;

        let analysis = YieldAnalysis::analyze(&markets);
        let strategy =
            YieldStrategy::generate(&analysis, &wallet, config.rebalance.strategy_slots);

        let risk_assessment = match &self.risk_manager {
            Some(manager) => Some(manager.assess(&wallet, &analysis, &strategy, config).await?),
            None => None,
        };

        let target_allocation = blend_target(&strategy.ideal_positions, risk_assessment.as_ref())?;
        let target = PositionSet::new(target_allocation.clone())?;

        let guard_findings = self.guards.run(&AllocationContext {
            target: &target_allocation,
            analysis: &analysis,
        });

        let execution_plan = ExecutionPlan::build(
            &wallet,
            &target,
            strategy.yield_increase,
            &config.rebalance,
            &config.protocol_settings,
        );

        let strategy_changes = compute_adjustments(
            wallet.positions(),
            &PositionSet::new(strategy.ideal_positions.clone())?,
            config.rebalance.strategy_change_threshold,
        );

        info!(
            %run_id,
            trades = execution_plan.trades.len(),
            urgency = %execution_plan.urgency,
            findings = guard_findings.len(),
            "Optimization complete"
        );

        Ok(OptimizationReport {
            run_id,
            generated_at: Utc::now(),
            risk_tolerance: config.risk.tolerance,
            wallet_summary: wallet.summary(),
            market_analysis: analysis,
            yield_strategy: strategy,
            risk_assessment,
            target_allocation,
            guard_findings,
            strategy_changes,
            execution_plan,
        })
    }

    async fn audit(&self, entry: AuditEntry) {
        if let Some(log) = &self.audit {
            log.record(&entry).await;
        }
    }
}

/// Offline planning: target positions read from files instead of agents
pub fn plan_offline(
    config: &Config,
    wallet: &WalletSnapshot,
    yield_target: &[Position],
    risk: Option<&RiskAssessment>,
    yield_change: rust_decimal::Decimal,
) -> Result<ExecutionPlan> {
    let target = PositionSet::new(blend_target(yield_target, risk)?)?;
    Ok(ExecutionPlan::build(
        wallet,
        &target,
        yield_change,
        &config.rebalance,
        &config.protocol_settings,
    ))
}

/// Write `report.json` and the markdown yield analysis into a fresh run
/// directory under `output_dir`. Returns the run directory.
pub fn write_report(report: &OptimizationReport, output_dir: &Path) -> Result<PathBuf> {
    let run_dir = output_dir.join(format!(
        "run_{}_{}",
        report.generated_at.format("%Y%m%d_%H%M%S"),
        report.run_id.simple().to_string().get(..8).unwrap_or_default()
    ));
    std::fs::create_dir_all(&run_dir).map_err(|e| {
        Error::Config(format!(
            "Failed to create output directory {}: {}",
            run_dir.display(),
            e
        ))
    })?;

    std::fs::write(
        run_dir.join("report.json"),
        serde_json::to_string_pretty(report)?,
    )?;
    std::fs::write(
        run_dir.join("yield_analysis.md"),
        report.market_analysis.to_markdown(),
    )?;

    info!(path = %run_dir.display(), "Wrote optimization report");
    Ok(run_dir)
}
