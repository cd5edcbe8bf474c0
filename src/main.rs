//! DeFi Portfolio Optimizer CLI
//!
//! Command-line interface for analyzing lending markets and planning
//! portfolio rebalances.

use clap::{Parser, Subcommand, ValueEnum};
use defi_portfolio_optimizer::agents::RiskAssessment;
use defi_portfolio_optimizer::pipeline::{plan_offline, write_report, Optimizer};
use defi_portfolio_optimizer::server;
use defi_portfolio_optimizer::portfolio::{Position, PositionRecord};
use defi_portfolio_optimizer::wallet::WalletSnapshot;
use defi_portfolio_optimizer::{Config, Error, Result, RiskTolerance};
use rust_decimal::Decimal;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "defi-optimizer")]
#[command(about = "Multi-agent DeFi lending portfolio optimizer")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Markdown,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch market and wallet data and produce a rebalancing plan
    Run {
        /// Risk tolerance (low, medium, high)
        #[arg(short, long)]
        risk: Option<RiskTolerance>,

        /// Wallet to optimize (defaults to WALLET_ID)
        #[arg(short, long)]
        wallet: Option<String>,
    },

    /// Analyze current lending market yields
    Analyze {
        #[arg(short, long, value_enum, default_value = "markdown")]
        format: OutputFormat,
    },

    /// Build an execution plan from files, without fetching or LLM calls
    Plan {
        /// Wallet snapshot JSON (wallet_balances, wallet_positions)
        #[arg(long)]
        wallet: PathBuf,

        /// Target positions JSON array
        #[arg(long)]
        target: PathBuf,

        /// Risk-oriented target positions JSON array, blended with --target
        #[arg(long, requires = "risk_score")]
        risk_target: Option<PathBuf>,

        /// Risk score (0-10) that weights the blend
        #[arg(long, requires = "risk_target")]
        risk_score: Option<f64>,

        /// Expected yield improvement, in percentage points
        #[arg(long, default_value = "0")]
        yield_change: Decimal,
    },

    /// Serve the optimizer over HTTP (GET /analyze/{wallet_id}?risk_level=...)
    Serve {
        /// Address to listen on
        #[arg(long, default_value = "0.0.0.0:5001")]
        addr: SocketAddr,
    },

    /// Show current configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (ignore if not found)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    let registry = tracing_subscriber::registry().with(filter);
    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry.with(fmt::layer().with_writer(std::io::stderr)).init();
    }

    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Run { risk, wallet } => {
            run_optimizer(config, risk, wallet).await?;
        }
        Commands::Analyze { format } => {
            run_analyze(config, format).await?;
        }
        Commands::Plan {
            wallet,
            target,
            risk_target,
            risk_score,
            yield_change,
        } => {
            run_plan(&config, &wallet, &target, risk_target.as_deref(), risk_score, yield_change)?;
        }
        Commands::Serve { addr } => {
            let optimizer = Optimizer::from_config(Arc::new(config))?;
            server::serve(Arc::new(optimizer), addr).await?;
        }
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

async fn run_optimizer(
    config: Config,
    risk: Option<RiskTolerance>,
    wallet: Option<String>,
) -> Result<()> {
    let config = match risk {
        Some(tolerance) => config.with_tolerance(tolerance),
        None => config,
    };
    let wallet_id = wallet
        .or_else(|| config.data_api.wallet_id.clone())
        .ok_or_else(|| {
            Error::InvalidArgument("No wallet given. Pass --wallet or set WALLET_ID.".to_string())
        })?;

    let config = Arc::new(config);
    let optimizer = Optimizer::from_config(config.clone())?;
    let report = optimizer.run(&wallet_id).await?;
    let run_dir = write_report(&report, &config.output_dir)?;

    for finding in &report.guard_findings {
        tracing::warn!("{}", finding);
    }
    tracing::info!(
        trades = report.execution_plan.trades.len(),
        urgency = %report.execution_plan.urgency,
        timeline = %report.execution_plan.timeline,
        report = %run_dir.display(),
        "Rebalancing plan ready"
    );

    println!("{}", serde_json::to_string_pretty(&report.execution_plan)?);
    Ok(())
}

async fn run_analyze(config: Config, format: OutputFormat) -> Result<()> {
    let optimizer = Optimizer::new(
        Arc::new(config.clone()),
        defi_portfolio_optimizer::tools::ToolRegistry::from_config(&config)?,
    );
    let analysis = optimizer.analyze_markets().await?;

    match format {
        OutputFormat::Markdown => println!("{}", analysis.to_markdown()),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&analysis)?),
    }
    Ok(())
}

fn run_plan(
    config: &Config,
    wallet_path: &Path,
    target_path: &Path,
    risk_target_path: Option<&Path>,
    risk_score: Option<f64>,
    yield_change: Decimal,
) -> Result<()> {
    let wallet = WalletSnapshot::from_json(&read_file(wallet_path)?)?;
    let target = read_positions(target_path)?;

    let risk = match (risk_target_path, risk_score) {
        (Some(path), Some(risk_score)) => Some(RiskAssessment {
            risk_score,
            target_positions: read_positions(path)?,
            notes: String::new(),
        }),
        _ => None,
    };

    let plan = plan_offline(config, &wallet, &target, risk.as_ref(), yield_change)?;
    println!("{}", serde_json::to_string_pretty(&plan)?);
    Ok(())
}

fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| {
        Error::InvalidArgument(format!("Failed to read {}: {}", path.display(), e))
    })
}

fn read_positions(path: &Path) -> Result<Vec<Position>> {
    let records: Vec<PositionRecord> = serde_json::from_str(&read_file(path)?)?;
    records.into_iter().map(Position::try_from).collect()
}
