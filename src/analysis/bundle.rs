//! Bundled Buy Analysis - New Wallet Detection
//!
//! Early buyers whose wallets first appeared on-chain shortly after the token
//! was created are a strong sign of a bundled launch: the deployer funds a
//! batch of fresh wallets and buys through them.
//!
//! A wallet is "new" when its first transaction falls within
//! `new_wallet_threshold_secs` after token creation (inclusive on both ends).

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::analysis::FanOut;
use crate::error::Error;
use crate::sources::WalletHistorySource;
use crate::types::{Address, BundleReport, WalletAge};

/// Configuration for new-wallet detection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleAnalyzerConfig {
    /// Max seconds between token creation and wallet creation for a "new" wallet
    #[serde(default = "default_new_wallet_threshold_secs")]
    pub new_wallet_threshold_secs: u64,
}

fn default_new_wallet_threshold_secs() -> u64 {
    3600
}

impl Default for BundleAnalyzerConfig {
    fn default() -> Self {
        Self {
            new_wallet_threshold_secs: default_new_wallet_threshold_secs(),
        }
    }
}

/// Classifies wallet ages against one token's creation time
#[derive(Debug, Clone, Copy)]
pub struct WalletAgeClassifier {
    token_created_at: i64,
    threshold_secs: u64,
}

impl WalletAgeClassifier {
    pub fn new(token_created_at: i64, threshold_secs: u64) -> Self {
        Self {
            token_created_at,
            threshold_secs,
        }
    }

    /// Age of a wallet created at `wallet_created_at` (0 = unknown)
    pub fn age(&self, wallet_created_at: i64) -> WalletAge {
        WalletAge::from_creation_time(wallet_created_at, self.token_created_at)
    }

    /// Age and whether the wallet counts as new
    pub fn classify(&self, wallet_created_at: i64) -> (WalletAge, bool) {
        let age = self.age(wallet_created_at);
        (age, age.is_new(self.threshold_secs))
    }
}

/// New-wallet analyzer over the early buyer set
pub struct BundleAnalyzer {
    config: BundleAnalyzerConfig,
    fan_out: FanOut,
    history: Arc<dyn WalletHistorySource>,
}

impl BundleAnalyzer {
    /// Create a new analyzer
    pub fn new(
        config: BundleAnalyzerConfig,
        fan_out: FanOut,
        history: Arc<dyn WalletHistorySource>,
    ) -> Self {
        Self {
            config,
            fan_out,
            history,
        }
    }

    /// Classify every buyer and summarise how many used new wallets.
    ///
    /// Every buyer appears in `buyer_ages`, including those whose creation
    /// time could not be determined.
    pub async fn analyze_bundle_buys(
        &self,
        buyers: &[Address],
        token_created_at: i64,
    ) -> BundleReport {
        if buyers.is_empty() {
            return BundleReport::default();
        }

        let classifier =
            WalletAgeClassifier::new(token_created_at, self.config.new_wallet_threshold_secs);

        let history = &self.history;
        let lookup_timeout = self.fan_out.timeout;
        let creation_times: Vec<(Address, i64)> = stream::iter(buyers.iter().cloned())
            .map(|buyer| async move {
                let created_at = wallet_created_at(history.as_ref(), &buyer, lookup_timeout).await;
                (buyer, created_at)
            })
            .buffer_unordered(self.fan_out.max_concurrent.max(1))
            .collect()
            .await;

        let mut report = BundleReport::default();
        for (buyer, created_at) in creation_times {
            let (age, is_new) = classifier.classify(created_at);
            if is_new {
                report.num_new_wallets += 1;
            }
            debug!(wallet = %buyer, age = %age, new = is_new, "Classified wallet age");
            report.buyer_ages.insert(buyer, age);
        }

        report.percentage_new = report.num_new_wallets as f64 / buyers.len() as f64 * 100.0;

        info!(
            buyers = buyers.len(),
            new_wallets = report.num_new_wallets,
            percentage_new = %format!("{:.1}%", report.percentage_new),
            "Bundle analysis complete"
        );

        report
    }
}

/// Wallet creation time, 0 when the lookup fails or times out
async fn wallet_created_at(
    history: &dyn WalletHistorySource,
    wallet: &str,
    lookup_timeout: Duration,
) -> i64 {
    let result = timeout(lookup_timeout, history.wallet_creation_time(wallet))
        .await
        .unwrap_or_else(|_| Err(Error::Timeout(lookup_timeout.as_millis() as u64)));

    match result {
        Ok(created_at) => created_at,
        Err(e) => {
            warn!(
                wallet = %wallet,
                source = history.name(),
                retryable = e.is_retryable(),
                error = %e,
                "Wallet creation lookup failed"
            );
            0
        }
    }
}
