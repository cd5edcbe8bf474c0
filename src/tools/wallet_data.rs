//! Wallet data tool (`GET /wallet/{wallet_id}`)

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use super::{get_json, DataTool, ToolId, ToolRequest};
use crate::config::DataApiConfig;
use crate::{Error, Result};

pub struct WalletDataTool {
    client: Client,
    api: DataApiConfig,
}

impl WalletDataTool {
    pub fn new(api: DataApiConfig) -> Self {
        Self::with_client(Client::new(), api)
    }

    pub fn with_client(client: Client, api: DataApiConfig) -> Self {
        Self { client, api }
    }

    /// Wallet from the request, else the configured default
    fn wallet_id<'a>(&'a self, request: &'a ToolRequest) -> Result<&'a str> {
        request
            .wallet_id
            .as_deref()
            .or(self.api.wallet_id.as_deref())
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| {
                Error::InvalidArgument(
                    "No wallet id given. Pass one or set WALLET_ID.".to_string(),
                )
            })
    }
}

#[async_trait]
impl DataTool for WalletDataTool {
    fn id(&self) -> ToolId {
        ToolId::FetchWalletData
    }

    async fn fetch(&self, request: &ToolRequest) -> Result<Value> {
        let wallet_id = self.wallet_id(request)?;
        let url = self.api.endpoint(&format!("wallet/{}", wallet_id))?;
        let wallet = get_json(&self.client, url).await?;
        tracing::info!(wallet_id, "Fetched wallet data");
        Ok(wallet)
    }
}
