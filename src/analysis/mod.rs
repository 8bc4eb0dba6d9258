//! Early-buyer analysis pipeline
//!
//! - `trade_filter`: unique early buyers from the first trades
//! - `bundle`: new-wallet classification (bundling signal #1)
//! - `profitability`: net realized PnL per buyer
//! - `interactions`: buyer-to-buyer interaction graph (bundling signal #2)

use std::time::Duration;

pub mod bundle;
pub mod interactions;
pub mod profitability;
pub mod trade_filter;

pub use bundle::{BundleAnalyzer, BundleAnalyzerConfig, WalletAgeClassifier};
pub use interactions::{resolve_counterparty, InteractionConfig, InteractionGraphBuilder};
pub use profitability::{good_buyers, ProfitabilityConfig, ProfitabilityScorer};
pub use trade_filter::extract_early_buyers;

/// Limits for per-wallet upstream lookups
#[derive(Debug, Clone, Copy)]
pub struct FanOut {
    /// Lookups in flight at once
    pub max_concurrent: usize,
    /// A lookup that takes longer is treated as having no data
    pub timeout: Duration,
}

impl Default for FanOut {
    fn default() -> Self {
        Self {
            max_concurrent: 8,
            timeout: Duration::from_secs(60),
        }
    }
}
