//! Market data tool
//!
//! Fetches current lending markets from the data API (`GET /current_markets`).

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use super::{get_json, DataTool, ToolId, ToolRequest};
use crate::config::DataApiConfig;
use crate::Result;

pub struct MarketDataTool {
    client: Client,
    api: DataApiConfig,
}

impl MarketDataTool {
    pub fn new(api: DataApiConfig) -> Self {
        Self::with_client(Client::new(), api)
    }

    pub fn with_client(client: Client, api: DataApiConfig) -> Self {
        Self { client, api }
    }
}

#[async_trait]
impl DataTool for MarketDataTool {
    fn id(&self) -> ToolId {
        ToolId::FetchMarketData
    }

    async fn fetch(&self, _request: &ToolRequest) -> Result<Value> {
        let url = self.api.endpoint("current_markets")?;
        let markets = get_json(&self.client, url).await?;
        tracing::info!(
            tokens = markets.as_array().map(Vec::len).unwrap_or(0),
            "Fetched market data"
        );
        Ok(markets)
    }
}
