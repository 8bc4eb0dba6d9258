//! Upstream data sources
//!
//! The analysis pipeline only sees the two traits below. Concrete clients:
//! - `BirdeyeClient`: token overview, trades, wallet PnL, wallet transactions
//! - `SolanaRpcClient`: wallet creation time via signature history
//! - `FixtureSource`: recorded responses for offline replay

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{PnlBreakdown, Trade, WalletTransaction};

pub mod birdeye;
pub mod fixture;
pub mod solana_rpc;

pub use birdeye::BirdeyeClient;
pub use fixture::FixtureSource;
pub use solana_rpc::SolanaRpcClient;

/// Token and wallet market data
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Source name for logging
    fn name(&self) -> &'static str;

    /// Token creation time in epoch seconds (0 if unknown)
    async fn token_creation_time(&self, token: &str) -> Result<i64>;

    /// Earliest swaps on the token, ascending by time
    async fn early_trades(&self, token: &str, limit: u32) -> Result<Vec<Trade>>;

    /// Per-token realized PnL for a wallet
    async fn wallet_pnl_breakdown(&self, wallet: &str) -> Result<PnlBreakdown>;

    /// Recent transactions of a wallet
    async fn wallet_transactions(&self, wallet: &str, limit: u32) -> Result<Vec<WalletTransaction>>;
}

/// On-chain wallet history
#[async_trait]
pub trait WalletHistorySource: Send + Sync {
    fn name(&self) -> &'static str;

    /// Block time of the wallet's oldest transaction (0 if unknown)
    async fn wallet_creation_time(&self, wallet: &str) -> Result<i64>;
}
