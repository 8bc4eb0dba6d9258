//! Birdeye API client
//!
//! Provides access to:
//! - Token overview (creation time)
//! - Token swap history, oldest first
//! - Wallet PnL breakdown per token
//! - Wallet transaction history (for interaction analysis)

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::config::BirdeyeConfig;
use crate::error::{Error, Result};
use crate::sources::MarketDataSource;
use crate::types::{PnlBreakdown, Trade, WalletTransaction};

/// Birdeye REST client
pub struct BirdeyeClient {
    /// HTTP client
    client: Client,
    /// API key sent as `x-api-key`
    api_key: String,
    /// Chain sent as `x-chain`
    chain: String,
    /// Base URL without trailing slash
    base_url: String,
}

impl BirdeyeClient {
    /// Create a new Birdeye client. Fails when no API key is configured.
    pub fn new(config: &BirdeyeConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(Error::MissingApiKey("birdeye".to_string()));
        }

        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            chain: config.chain.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Issue a GET and return the status with the raw body
    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<(StatusCode, String)> {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "Birdeye request");

        let response = self
            .client
            .get(&url)
            .query(query)
            .header("x-api-key", &self.api_key)
            .header("x-chain", &self.chain)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        Ok((status, body))
    }

    /// GET that treats any non-success status as an error
    async fn get_ok(&self, path: &str, query: &[(&str, String)]) -> Result<String> {
        let (status, body) = self.get(path, query).await?;
        if !status.is_success() {
            return Err(Error::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }

    /// Cheap reachability probe used by the health command
    pub async fn ping(&self, token: &str) -> Result<()> {
        self.token_creation_time(token).await.map(|_| ())
    }
}

#[async_trait]
impl MarketDataSource for BirdeyeClient {
    fn name(&self) -> &'static str {
        "birdeye"
    }

    async fn token_creation_time(&self, token: &str) -> Result<i64> {
        let body = self
            .get_ok("/defi/token-overview", &[("address", token.to_string())])
            .await?;
        parse_token_creation_time(&body)
    }

    async fn early_trades(&self, token: &str, limit: u32) -> Result<Vec<Trade>> {
        let query = [
            ("address", token.to_string()),
            ("tx_type", "swap".to_string()),
            ("offset", "0".to_string()),
            ("limit", limit.to_string()),
            ("sort_by", "timeUnix".to_string()),
            ("sort_type", "asc".to_string()),
        ];
        let body = self.get_ok("/defi/txs/token", &query).await?;
        parse_items(&body)
    }

    async fn wallet_pnl_breakdown(&self, wallet: &str) -> Result<PnlBreakdown> {
        let query = [
            ("address", wallet.to_string()),
            ("currency", "usd".to_string()),
        ];
        let body = self.get_ok("/wallet/v2/pnl", &query).await?;
        parse_pnl_breakdown(&body)
    }

    async fn wallet_transactions(
        &self,
        wallet: &str,
        limit: u32,
    ) -> Result<Vec<WalletTransaction>> {
        let query = [
            ("address", wallet.to_string()),
            ("limit", limit.to_string()),
        ];
        let (status, body) = self.get("/trader/txs/seek_by_time", &query).await?;

        // No history is an empty list, not a failure
        if !status.is_success() {
            debug!(wallet = %wallet, status = %status, "No transaction history");
            return Ok(Vec::new());
        }

        parse_items(&body)
    }
}

// ============ Birdeye API Response Types ============

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct TokenOverview {
    #[serde(default)]
    created_at: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ItemsPage<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct PnlResponse {
    #[serde(default)]
    tokens: Option<PnlBreakdown>,
    #[serde(default)]
    data: Option<PnlData>,
}

#[derive(Debug, Deserialize)]
struct PnlData {
    #[serde(default)]
    tokens: Option<PnlBreakdown>,
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T> {
    Ok(serde_json::from_str(body)?)
}

/// `data.created_at`, 0 when absent
fn parse_token_creation_time(body: &str) -> Result<i64> {
    let envelope: Envelope<TokenOverview> = decode(body)?;
    Ok(envelope
        .data
        .and_then(|overview| overview.created_at)
        .unwrap_or(0))
}

/// `data.items`, empty when absent
fn parse_items<T: DeserializeOwned>(body: &str) -> Result<Vec<T>> {
    let envelope: Envelope<ItemsPage<T>> = decode(body)?;
    Ok(envelope.data.map(|page| page.items).unwrap_or_default())
}

/// `tokens` at the top level, falling back to `data.tokens`
fn parse_pnl_breakdown(body: &str) -> Result<PnlBreakdown> {
    let response: PnlResponse = decode(body)?;
    Ok(response
        .tokens
        .or_else(|| response.data.and_then(|d| d.tokens))
        .unwrap_or_default())
}
