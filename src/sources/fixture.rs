//! Recorded upstream responses for offline replay
//!
//! A fixture is a JSON document with one map per upstream call:
//!
//! ```json
//! {
//!   "token_creation_times": { "<token>": 1689996400 },
//!   "trades": { "<token>": [{ "tradeAction": "buy", "maker": "w1" }] },
//!   "wallet_creation_times": { "w1": 1690000000 },
//!   "pnl": { "w1": { "tok1": { "pnl": { "realized_profit_usd": 100 } } } },
//!   "transactions": { "w1": [{ "receiver": "w2" }] },
//!   "failing_wallets": ["w3"]
//! }
//! ```
//!
//! Anything not recorded answers like an upstream with no data: creation
//! times of 0, empty trade/transaction lists, an empty PnL breakdown.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::error::{Error, Result};
use crate::sources::{MarketDataSource, WalletHistorySource};
use crate::types::{PnlBreakdown, PnlFigures, TokenPnl, Trade, WalletTransaction};

/// Data source backed by recorded responses
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FixtureSource {
    #[serde(default)]
    token_creation_times: HashMap<String, i64>,
    #[serde(default)]
    trades: HashMap<String, Vec<Trade>>,
    #[serde(default)]
    wallet_creation_times: HashMap<String, i64>,
    #[serde(default)]
    pnl: HashMap<String, PnlBreakdown>,
    #[serde(default)]
    transactions: HashMap<String, Vec<WalletTransaction>>,
    /// Wallets whose every per-wallet lookup fails
    #[serde(default)]
    failing_wallets: HashSet<String>,
}

impl FixtureSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a fixture from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::Fixture(format!("Cannot read {}: {}", path.display(), e)))?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|e| Error::Fixture(format!("Invalid fixture: {}", e)))
    }

    pub fn with_token(mut self, token: &str, created_at: i64, trades: Vec<Trade>) -> Self {
        self.token_creation_times.insert(token.to_string(), created_at);
        self.trades.insert(token.to_string(), trades);
        self
    }

    pub fn with_wallet_creation(mut self, wallet: &str, created_at: i64) -> Self {
        self.wallet_creation_times.insert(wallet.to_string(), created_at);
        self
    }

    /// Record realized profit per token for a wallet
    pub fn with_pnl(mut self, wallet: &str, positions: &[(&str, f64)]) -> Self {
        let breakdown = positions
            .iter()
            .map(|(token, profit)| {
                (
                    token.to_string(),
                    TokenPnl {
                        pnl: Some(PnlFigures {
                            realized_profit_usd: *profit,
                        }),
                    },
                )
            })
            .collect();
        self.pnl.insert(wallet.to_string(), breakdown);
        self
    }

    pub fn with_transactions(mut self, wallet: &str, txs: Vec<WalletTransaction>) -> Self {
        self.transactions.insert(wallet.to_string(), txs);
        self
    }

    pub fn failing(mut self, wallet: &str) -> Self {
        self.failing_wallets.insert(wallet.to_string());
        self
    }

    fn check_wallet(&self, wallet: &str) -> Result<()> {
        if self.failing_wallets.contains(wallet) {
            return Err(Error::Rpc(format!("fixture failure for {}", wallet)));
        }
        Ok(())
    }
}

#[async_trait]
impl MarketDataSource for FixtureSource {
    fn name(&self) -> &'static str {
        "fixture"
    }

    async fn token_creation_time(&self, token: &str) -> Result<i64> {
        Ok(self.token_creation_times.get(token).copied().unwrap_or(0))
    }

    async fn early_trades(&self, token: &str, limit: u32) -> Result<Vec<Trade>> {
        Ok(self
            .trades
            .get(token)
            .map(|trades| trades.iter().take(limit as usize).cloned().collect())
            .unwrap_or_default())
    }

    async fn wallet_pnl_breakdown(&self, wallet: &str) -> Result<PnlBreakdown> {
        self.check_wallet(wallet)?;
        Ok(self.pnl.get(wallet).cloned().unwrap_or_default())
    }

    async fn wallet_transactions(
        &self,
        wallet: &str,
        limit: u32,
    ) -> Result<Vec<WalletTransaction>> {
        self.check_wallet(wallet)?;
        Ok(self
            .transactions
            .get(wallet)
            .map(|txs| txs.iter().take(limit as usize).cloned().collect())
            .unwrap_or_default())
    }
}

#[async_trait]
impl WalletHistorySource for FixtureSource {
    fn name(&self) -> &'static str {
        "fixture"
    }

    async fn wallet_creation_time(&self, wallet: &str) -> Result<i64> {
        self.check_wallet(wallet)?;
        Ok(self.wallet_creation_times.get(wallet).copied().unwrap_or(0))
    }
}
