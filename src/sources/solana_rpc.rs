//! Solana JSON-RPC client for wallet history
//!
//! Wallet creation time is approximated by the block time of the oldest
//! signature for the address, found by paging `getSignaturesForAddress`
//! backwards until an empty page.

use async_trait::async_trait;
use dashmap::DashMap;
use reqwest::Client;
use serde::Deserialize;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::RpcConfig;
use crate::error::{Error, Result};
use crate::sources::WalletHistorySource;

/// Signature entry returned by `getSignaturesForAddress`
#[derive(Debug, Clone, Deserialize)]
pub struct SignatureInfo {
    pub signature: String,
    #[serde(rename = "blockTime", default)]
    pub block_time: Option<i64>,
}

/// Solana RPC client
pub struct SolanaRpcClient {
    client: Client,
    endpoint: String,
    /// Signatures requested per page
    page_limit: usize,
    /// Hard ceiling on pages walked per wallet
    max_pages: u32,
    /// Wallet -> creation time. Only determined (non-zero) times are kept.
    creation_cache: DashMap<String, i64>,
}

impl SolanaRpcClient {
    /// Create a new RPC client
    pub fn new(config: &RpcConfig) -> Result<Self> {
        if config.endpoint.trim().is_empty() {
            return Err(Error::Config("RPC endpoint is empty".to_string()));
        }

        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            page_limit: config.signature_page_limit,
            max_pages: config.max_signature_pages,
            creation_cache: DashMap::new(),
        })
    }

    /// Fetch one page of signatures older than `before`.
    ///
    /// Returns `Ok(None)` when the endpoint answers with a non-success status.
    async fn signatures_page(
        &self,
        address: &str,
        before: Option<String>,
    ) -> Result<Option<Vec<SignatureInfo>>> {
        let mut options = serde_json::json!({ "limit": self.page_limit });
        if let Some(before) = before {
            options["before"] = serde_json::Value::String(before);
        }

        let request = serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "getSignaturesForAddress",
            "params": [address, options]
        });

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            debug!(
                address = %address,
                status = %response.status(),
                "Signature page request rejected"
            );
            return Ok(None);
        }

        let rpc_response: RpcResponse<Vec<SignatureInfo>> = response
            .json()
            .await?;

        if let Some(error) = rpc_response.error {
            return Err(Error::Rpc(format!("RPC error {}: {}", error.code, error.message)));
        }

        Ok(Some(rpc_response.result.unwrap_or_default()))
    }

    /// Probe the endpoint with `getHealth`
    pub async fn health(&self) -> Result<()> {
        let request = serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "getHealth"
        });

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Api {
                status: status.as_u16(),
                body: response.text().await?,
            });
        }

        let rpc_response: RpcResponse<String> = response
            .json()
            .await?;

        match (rpc_response.result, rpc_response.error) {
            (Some(_), None) => Ok(()),
            (_, Some(error)) => Err(Error::Rpc(format!("RPC unhealthy: {}", error.message))),
            (None, None) => Err(Error::Rpc("Empty getHealth response".to_string())),
        }
    }
}

#[async_trait]
impl WalletHistorySource for SolanaRpcClient {
    fn name(&self) -> &'static str {
        "solana-rpc"
    }

    async fn wallet_creation_time(&self, wallet: &str) -> Result<i64> {
        if let Some(cached) = self.creation_cache.get(wallet) {
            return Ok(*cached);
        }

        let client = self;
        let created_at = oldest_block_time(wallet, self.max_pages, move |before| {
            client.signatures_page(wallet, before)
        })
        .await?;

        if created_at > 0 {
            self.creation_cache.insert(wallet.to_string(), created_at);
        }

        Ok(created_at)
    }
}

/// Walk signature pages from newest to oldest and return the block time of
/// the oldest signature seen.
///
/// Terminates on an empty page or a rejected request (which yields 0). A
/// page shorter than the requested limit does not end the walk: some
/// providers cap page sizes below the limit. Hitting `max_pages` without
/// reaching the end is a `PaginationExhausted` error.
pub async fn oldest_block_time<F, Fut>(
    address: &str,
    max_pages: u32,
    mut fetch_page: F,
) -> Result<i64>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Option<Vec<SignatureInfo>>>>,
{
    let mut before: Option<String> = None;
    let mut oldest: Option<SignatureInfo> = None;

    for _ in 0..max_pages {
        let page = match fetch_page(before.clone()).await? {
            Some(page) => page,
            None => return Ok(0),
        };

        match page.into_iter().last() {
            Some(last) => {
                before = Some(last.signature.clone());
                oldest = Some(last);
            }
            None => return Ok(block_time_of(oldest)),
        }
    }

    warn!(address = %address, pages = max_pages, "Signature history exceeds page ceiling");
    Err(Error::PaginationExhausted {
        address: address.to_string(),
        pages: max_pages,
    })
}

fn block_time_of(signature: Option<SignatureInfo>) -> i64 {
    signature.and_then(|sig| sig.block_time).unwrap_or(0)
}

// ============ RPC Response Types ============

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}
