//! Data tools for the optimizer
//!
//! Tools are identified by a closed `ToolId` enum. Configured tool names are
//! resolved when the `ToolRegistry` is built, so a misspelled name fails at
//! startup instead of at the first fetch.

mod market_data;
mod wallet_data;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

pub use market_data::MarketDataTool;
pub use wallet_data::WalletDataTool;

use crate::config::Config;
use crate::market::MarketData;
use crate::wallet::WalletSnapshot;
use crate::{Error, Result};

pub const TOOL_FETCH_MARKET_DATA: &str = "fetch_market_data";
pub const TOOL_FETCH_WALLET_DATA: &str = "fetch_wallet_data";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ToolId {
    FetchMarketData,
    FetchWalletData,
}

impl ToolId {
    pub const ALL: [ToolId; 2] = [ToolId::FetchMarketData, ToolId::FetchWalletData];

    pub fn name(&self) -> &'static str {
        match self {
            ToolId::FetchMarketData => TOOL_FETCH_MARKET_DATA,
            ToolId::FetchWalletData => TOOL_FETCH_WALLET_DATA,
        }
    }
}

impl fmt::Display for ToolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ToolId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            TOOL_FETCH_MARKET_DATA => Ok(ToolId::FetchMarketData),
            TOOL_FETCH_WALLET_DATA => Ok(ToolId::FetchWalletData),
            other => Err(Error::UnknownTool(other.to_string())),
        }
    }
}

/// Arguments for a tool call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolRequest {
    pub wallet_id: Option<String>,
}

impl ToolRequest {
    pub fn for_wallet(wallet_id: impl Into<String>) -> Self {
        Self {
            wallet_id: Some(wallet_id.into()),
        }
    }
}

/// A source of raw JSON data
#[async_trait]
pub trait DataTool: Send + Sync {
    fn id(&self) -> ToolId;

    async fn fetch(&self, request: &ToolRequest) -> Result<Value>;
}

/// Resolved set of data tools
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<ToolId, Arc<dyn DataTool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the HTTP tools named in `config.tools`
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.data_api.timeout())
            .build()?;

        let mut registry = Self::new();
        for name in &config.tools {
            let id: ToolId = name.parse()?;
            let tool: Arc<dyn DataTool> = match id {
                ToolId::FetchMarketData => Arc::new(MarketDataTool::with_client(
                    client.clone(),
                    config.data_api.clone(),
                )),
                ToolId::FetchWalletData => Arc::new(WalletDataTool::with_client(
                    client.clone(),
                    config.data_api.clone(),
                )),
            };
            registry = registry.with_tool(tool);
        }

        tracing::debug!(
            tools = ?registry.tools.keys().map(ToolId::name).collect::<Vec<_>>(),
            "Registered data tools"
        );
        Ok(registry)
    }

    /// Register a tool, replacing any tool with the same id
    pub fn with_tool(mut self, tool: Arc<dyn DataTool>) -> Self {
        self.tools.insert(tool.id(), tool);
        self
    }

    pub fn get(&self, id: ToolId) -> Result<&Arc<dyn DataTool>> {
        self.tools
            .get(&id)
            .ok_or_else(|| Error::ToolUnavailable(id.name().to_string()))
    }

    pub fn contains(&self, id: ToolId) -> bool {
        self.tools.contains_key(&id)
    }

    pub async fn fetch(&self, id: ToolId, request: &ToolRequest) -> Result<Value> {
        self.get(id)?.fetch(request).await
    }

    pub async fn fetch_markets(&self) -> Result<Vec<MarketData>> {
        let value = self
            .fetch(ToolId::FetchMarketData, &ToolRequest::default())
            .await?;
        MarketData::parse_list(value)
    }

    pub async fn fetch_wallet(&self, wallet_id: &str) -> Result<WalletSnapshot> {
        let value = self
            .fetch(ToolId::FetchWalletData, &ToolRequest::for_wallet(wallet_id))
            .await?;
        WalletSnapshot::from_value(value)
    }
}

impl fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.tools.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// GET `url` and decode the JSON body. Non-2xx responses are errors.
pub(crate) async fn get_json(client: &Client, url: url::Url) -> Result<Value> {
    tracing::debug!(%url, "Fetching data");
    let response = client.get(url.clone()).send().await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(Error::DataApi(format!(
            "{} returned {}: {}",
            url,
            status,
            body.chars().take(200).collect::<String>()
        )));
    }

    Ok(response.json().await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StaticTool;
    use serde_json::json;

    #[test]
    fn parses_tool_names() {
        assert_eq!(
            "fetch_market_data".parse::<ToolId>().unwrap(),
            ToolId::FetchMarketData
        );
        assert_eq!(
            "fetch_wallet_data".parse::<ToolId>().unwrap(),
            ToolId::FetchWalletData
        );
        assert!(matches!(
            "send_email".parse::<ToolId>(),
            Err(Error::UnknownTool(name)) if name == "send_email"
        ));
    }

    #[test]
    fn unknown_name_fails_registry_construction() {
        let mut config = Config::default();
        config.tools = vec!["fetch_market_data".into(), "fetch_prices".into()];
        assert!(matches!(
            ToolRegistry::from_config(&config),
            Err(Error::UnknownTool(_))
        ));
    }

    #[test]
    fn registers_configured_tools_only() {
        let mut config = Config::default();
        config.tools = vec!["fetch_market_data".into()];
        let registry = ToolRegistry::from_config(&config).unwrap();
        assert!(registry.contains(ToolId::FetchMarketData));
        assert!(!registry.contains(ToolId::FetchWalletData));
        assert!(matches!(
            registry.get(ToolId::FetchWalletData),
            Err(Error::ToolUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn typed_fetches_parse_payloads() {
        let registry = ToolRegistry::new()
            .with_tool(Arc::new(StaticTool {
                id: ToolId::FetchMarketData,
                payload: crate::market::fixtures::markets_json(),
            }))
            .with_tool(Arc::new(StaticTool {
                id: ToolId::FetchWalletData,
                payload: json!({
                    "wallet_balances": [{"symbol": "USDC", "amount": "10"}],
                    "wallet_positions": []
                }),
            }));

        let markets = registry.fetch_markets().await.unwrap();
        assert_eq!(markets.len(), 3);

        let wallet = registry.fetch_wallet("abc").await.unwrap();
        assert_eq!(wallet.balances().len(), 1);
    }

    #[tokio::test]
    async fn malformed_wallet_payload_is_an_error() {
        let registry = ToolRegistry::new().with_tool(Arc::new(StaticTool {
            id: ToolId::FetchWalletData,
            payload: json!({
                "wallet_positions": [{"symbol": "USDC", "amount": "-1"}]
            }),
        }));
        assert!(registry.fetch_wallet("abc").await.is_err());
    }

    #[test]
    fn missing_tool_fails_fetch() {
        let registry = ToolRegistry::new();
        let result = tokio_test::block_on(registry.fetch_markets());
        assert!(matches!(result, Err(Error::ToolUnavailable(_))));
    }
}
