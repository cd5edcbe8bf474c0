//! Risk manager agent
//!
//! Reviews the wallet, the market analysis and the yield strategy against the
//! configured risk tolerance and proposes a risk-adjusted target allocation
//! together with a risk score on a 0-10 scale.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::{Config, OperationalRules, RiskTolerance};
use crate::llm::{extract_json, ChatMessage, LlmClient, LlmError, Persona};
use crate::market::{YieldAnalysis, YieldStrategy};
use crate::portfolio::{Position, PositionRecord, MAX_RISK_SCORE, MIN_RISK_SCORE};
use crate::wallet::{WalletSnapshot, WalletSummary};
use crate::{Error, Result};

/// The risk manager's verdict
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskAssessment {
    pub risk_score: f64,
    pub target_positions: Vec<Position>,
    pub notes: String,
}

#[derive(Deserialize)]
struct AssessmentRecord {
    risk_score: f64,
    #[serde(default)]
    target_positions: Vec<PositionRecord>,
    #[serde(default)]
    notes: Option<String>,
}

impl RiskAssessment {
    /// Parse a model reply. Code fences around the JSON are accepted.
    pub fn parse(reply: &str) -> Result<Self> {
        let record: AssessmentRecord = serde_json::from_str(extract_json(reply))
            .map_err(|e| LlmError::MalformedResponse(format!("risk assessment: {}", e)))?;

        if !(MIN_RISK_SCORE..=MAX_RISK_SCORE).contains(&record.risk_score) {
            return Err(Error::InvalidRiskScore(record.risk_score));
        }

        let target_positions = record
            .target_positions
            .into_iter()
            .map(Position::try_from)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            risk_score: record.risk_score,
            target_positions,
            notes: record.notes.unwrap_or_default(),
        })
    }
}

#[derive(Clone)]
pub struct RiskManager {
    client: Arc<dyn LlmClient>,
    persona: Persona,
}

impl RiskManager {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self {
            client,
            persona: Persona::new(
                "DeFi Lending Market Risk Manager",
                "Evaluate the risks of Solana DeFi lending markets, current exposure and \
                 market analysis, and propose a risk-adjusted target allocation",
                "You are an expert risk manager with a thorough approach to assessing the \
                 risk of lending markets and asset pools. Your risk scoring accounts for \
                 protocol-specific vulnerabilities, the stated risk tolerance and the \
                 predefined risk parameters.",
            ),
        }
    }

    pub fn persona(&self) -> &Persona {
        &self.persona
    }

    pub async fn assess(
        &self,
        wallet: &WalletSnapshot,
        analysis: &YieldAnalysis,
        strategy: &YieldStrategy,
        config: &Config,
    ) -> Result<RiskAssessment> {
        let messages = [
            ChatMessage::system(self.persona.system_prompt()),
            ChatMessage::user(build_prompt(wallet, analysis, strategy, config)?),
        ];

        let reply = self.client.complete(&messages).await?;
        let assessment = RiskAssessment::parse(&reply)?;

        tracing::info!(
            risk_score = assessment.risk_score,
            positions = assessment.target_positions.len(),
            "Risk assessment complete"
        );
        Ok(assessment)
    }
}

#[derive(Serialize)]
struct PromptContext<'a> {
    wallet: &'a WalletSnapshot,
    wallet_summary: WalletSummary,
    market_analysis: &'a YieldAnalysis,
    risk_tolerance: RiskTolerance,
    max_protocol_exposure: Decimal,
    operational_rules: &'a OperationalRules,
    yield_strategy: &'a YieldStrategy,
}

fn build_prompt(
    wallet: &WalletSnapshot,
    analysis: &YieldAnalysis,
    strategy: &YieldStrategy,
    config: &Config,
) -> Result<String> {
    let context = PromptContext {
        wallet,
        wallet_summary: wallet.summary(),
        market_analysis: analysis,
        risk_tolerance: config.risk.tolerance,
        max_protocol_exposure: config.risk.max_exposure(),
        operational_rules: &config.rules,
        yield_strategy: strategy,
    };

    Ok(format!(
        "Review the current wallet positions and the recommended yield strategy for \
compliance with the user's risk tolerance, the risk parameters and the operational rules.\n\n\
Respond with a single JSON object and nothing else:\n\
{{\n  \"risk_score\": <number from 0 (safest) to 10 (riskiest) for the current portfolio>,\n  \
\"target_positions\": [{{\"symbol\": str, \"protocol_name\": str, \"market_name\": str, \
\"amount\": str, \"obligation_type\": \"Supply\" | \"Borrow\"}}],\n  \
\"notes\": <short explanation>\n}}\n\n\
The target positions must use only markets present in the market analysis and their \
amounts must sum to the total portfolio value.\n\nContext:\n{}",
        serde_json::to_string_pretty(&context)?
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::{fixtures::markets_json, MarketData};
    use crate::portfolio::{Balance, ObligationType};
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use std::sync::Mutex;

    struct ScriptedClient {
        reply: std::result::Result<String, fn() -> LlmError>,
        seen: Mutex<Vec<ChatMessage>>,
    }

    impl ScriptedClient {
        fn replying(reply: &str) -> Self {
            Self {
                reply: Ok(reply.to_string()),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn failing(err: fn() -> LlmError) -> Self {
            Self {
                reply: Err(err),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedClient {
        async fn complete(
            &self,
            messages: &[ChatMessage],
        ) -> std::result::Result<String, LlmError> {
            self.seen.lock().unwrap().extend_from_slice(messages);
            match &self.reply {
                Ok(reply) => Ok(reply.clone()),
                Err(make) => Err(make()),
            }
        }
    }

    fn inputs() -> (WalletSnapshot, YieldAnalysis, YieldStrategy) {
        let wallet = WalletSnapshot::new(vec![Balance::new("USDC", dec!(300))], vec![]).unwrap();
        let analysis = YieldAnalysis::analyze(&MarketData::parse_list(markets_json()).unwrap());
        let strategy = YieldStrategy::generate(&analysis, &wallet, 3);
        (wallet, analysis, strategy)
    }

    const REPLY: &str = r#"```json
{
  "risk_score": 6.5,
  "target_positions": [
    {"symbol": "USDC", "protocol_name": "Solend", "market_name": "Main",
     "amount": "200", "obligation_type": "Supply"},
    {"symbol": "USDT", "protocol_name": "Drift", "market_name": "Main",
     "amount": 100, "obligation_type": "supply"}
  ],
  "notes": "Kamino utilization is high"
}
```"#;

    #[test]
    fn parses_fenced_reply() {
        let assessment = RiskAssessment::parse(REPLY).unwrap();
        assert_eq!(assessment.risk_score, 6.5);
        assert_eq!(assessment.target_positions.len(), 2);
        assert_eq!(assessment.target_positions[1].amount, dec!(100));
        assert_eq!(
            assessment.target_positions[1].obligation_type,
            ObligationType::Supply
        );
        assert_eq!(assessment.notes, "Kamino utilization is high");
    }

    #[test]
    fn out_of_range_score_is_rejected() {
        let reply = r#"{"risk_score": 11, "target_positions": []}"#;
        assert!(matches!(
            RiskAssessment::parse(reply),
            Err(Error::InvalidRiskScore(s)) if s == 11.0
        ));
    }

    #[test]
    fn malformed_target_position_is_rejected() {
        let reply = r#"{"risk_score": 3, "target_positions": [{"symbol": "USDC", "amount": "5"}]}"#;
        assert!(matches!(
            RiskAssessment::parse(reply),
            Err(Error::MalformedPosition(_))
        ));
    }

    #[test]
    fn prose_reply_is_malformed_response() {
        assert!(matches!(
            RiskAssessment::parse("I think the portfolio looks fine."),
            Err(Error::Llm(LlmError::MalformedResponse(_)))
        ));
    }

    #[tokio::test]
    async fn assess_sends_persona_and_context() {
        let client = Arc::new(ScriptedClient::replying(REPLY));
        let manager = RiskManager::new(client.clone());
        let (wallet, analysis, strategy) = inputs();
        let config = Config::default();

        let assessment = manager
            .assess(&wallet, &analysis, &strategy, &config)
            .await
            .unwrap();
        assert_eq!(assessment.risk_score, 6.5);

        let seen = client.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert!(seen[0].content.contains("DeFi Lending Market Risk Manager"));
        assert!(seen[1].content.contains("\"risk_tolerance\": \"medium\""));
        assert!(seen[1].content.contains("yield_strategy"));
    }

    #[tokio::test]
    async fn llm_failures_propagate_typed() {
        let client = Arc::new(ScriptedClient::failing(|| LlmError::RateLimited {
            retry_after: None,
        }));
        let manager = RiskManager::new(client);
        let (wallet, analysis, strategy) = inputs();

        let err = manager
            .assess(&wallet, &analysis, &strategy, &Config::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Llm(LlmError::RateLimited { .. })));
    }
}
