//! Buyer profitability scoring
//!
//! Net realized PnL per early buyer, summed across every token position the
//! wallet holds. Buyers with a strictly positive total are "good buyers".

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::analysis::FanOut;
use crate::error::Error;
use crate::sources::MarketDataSource;
use crate::types::{Address, PnlBreakdown, PnlMap};

/// Configuration for PnL lookups
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfitabilityConfig {
    /// Wallets per batch. Batches run one after another.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_batch_size() -> usize {
    50
}

impl Default for ProfitabilityConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
        }
    }
}

pub struct ProfitabilityScorer {
    config: ProfitabilityConfig,
    fan_out: FanOut,
    market: Arc<dyn MarketDataSource>,
}

impl ProfitabilityScorer {
    pub fn new(
        config: ProfitabilityConfig,
        fan_out: FanOut,
        market: Arc<dyn MarketDataSource>,
    ) -> Self {
        Self {
            config,
            fan_out,
            market,
        }
    }

    /// Net realized PnL for each wallet.
    ///
    /// Every input wallet gets an entry. A wallet whose lookup fails or times
    /// out scores 0.0.
    pub async fn get_wallet_pnl(&self, wallets: &[Address]) -> PnlMap {
        let mut pnls = PnlMap::new();
        let batch_size = self.config.batch_size.max(1);

        for (batch_idx, batch) in wallets.chunks(batch_size).enumerate() {
            debug!(batch = batch_idx, wallets = batch.len(), "Fetching PnL batch");

            let market = &self.market;
            let lookup_timeout = self.fan_out.timeout;
            let results: Vec<(Address, f64)> = stream::iter(batch.iter().cloned())
                .map(|wallet| async move {
                    let pnl = wallet_net_pnl(market.as_ref(), &wallet, lookup_timeout).await;
                    (wallet, pnl)
                })
                .buffer_unordered(self.fan_out.max_concurrent.max(1))
                .collect()
                .await;

            pnls.extend(results);
        }

        info!(
            wallets = pnls.len(),
            profitable = pnls.values().filter(|p| **p > 0.0).count(),
            "PnL lookup complete"
        );

        pnls
    }
}

/// Sum of realized profit across every position in a breakdown
pub fn net_realized_pnl(breakdown: &PnlBreakdown) -> f64 {
    breakdown.values().map(|position| position.realized_profit_usd()).sum()
}

/// Wallets with strictly positive net PnL
pub fn good_buyers(pnls: &PnlMap) -> PnlMap {
    pnls.iter()
        .filter(|(_, pnl)| **pnl > 0.0)
        .map(|(wallet, pnl)| (wallet.clone(), *pnl))
        .collect()
}

async fn wallet_net_pnl(
    market: &dyn MarketDataSource,
    wallet: &str,
    lookup_timeout: Duration,
) -> f64 {
    let result = timeout(lookup_timeout, market.wallet_pnl_breakdown(wallet))
        .await
        .unwrap_or_else(|_| Err(Error::Timeout(lookup_timeout.as_millis() as u64)));

    match result {
        Ok(breakdown) => net_realized_pnl(&breakdown),
        Err(e) => {
            warn!(
                wallet = %wallet,
                source = market.name(),
                retryable = e.is_retryable(),
                error = %e,
                "PnL lookup failed"
            );
            0.0
        }
    }
}
