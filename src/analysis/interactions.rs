//! Buyer-to-buyer interaction graph
//!
//! Scans each early buyer's recent transactions for counterparties that are
//! themselves early buyers. Edges are unordered pairs weighted by how many
//! times the pair surfaced.
//!
//! An interaction seen from both sides (A's history names B and B's history
//! names A) is counted once per side.

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::analysis::FanOut;
use crate::error::Error;
use crate::sources::MarketDataSource;
use crate::types::{Address, InteractionGraph, WalletTransaction};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionConfig {
    /// Recent transactions fetched per buyer
    #[serde(default = "default_tx_limit")]
    pub tx_limit: u32,
}

fn default_tx_limit() -> u32 {
    100
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            tx_limit: default_tx_limit(),
        }
    }
}

/// Fields tried, in order, to find the other side of a transaction
const COUNTERPARTY_FIELDS: &[fn(&WalletTransaction) -> Option<&str>] =
    &[receiver_field, seller_field, buyer_field];

fn receiver_field(tx: &WalletTransaction) -> Option<&str> {
    tx.receiver.as_deref()
}

fn seller_field(tx: &WalletTransaction) -> Option<&str> {
    tx.seller.as_deref()
}

fn buyer_field(tx: &WalletTransaction) -> Option<&str> {
    tx.buyer.as_deref()
}

/// First non-empty counterparty field
pub fn resolve_counterparty(tx: &WalletTransaction) -> Option<&str> {
    COUNTERPARTY_FIELDS
        .iter()
        .filter_map(|field| field(tx))
        .find(|addr| !addr.is_empty())
}

pub struct InteractionGraphBuilder {
    config: InteractionConfig,
    fan_out: FanOut,
    market: Arc<dyn MarketDataSource>,
}

impl InteractionGraphBuilder {
    pub fn new(
        config: InteractionConfig,
        fan_out: FanOut,
        market: Arc<dyn MarketDataSource>,
    ) -> Self {
        Self {
            config,
            fan_out,
            market,
        }
    }

    /// Build the interaction graph among `buyers`
    pub async fn check_wallet_interactions(&self, buyers: &[Address]) -> InteractionGraph {
        let buyer_set: HashSet<&str> = buyers.iter().map(String::as_str).collect();

        let market = &self.market;
        let tx_limit = self.config.tx_limit;
        let lookup_timeout = self.fan_out.timeout;
        let histories: Vec<(Address, Vec<WalletTransaction>)> =
            stream::iter(buyers.iter().cloned())
                .map(|wallet| async move {
                    let txs =
                        recent_transactions(market.as_ref(), &wallet, tx_limit, lookup_timeout)
                            .await;
                    (wallet, txs)
                })
                .buffer_unordered(self.fan_out.max_concurrent.max(1))
                .collect()
                .await;

        let mut graph = InteractionGraph::new();
        for (wallet, txs) in &histories {
            let mut found = 0usize;
            for counterparty in txs.iter().filter_map(resolve_counterparty) {
                if counterparty == wallet.as_str() || !buyer_set.contains(counterparty) {
                    continue;
                }
                if graph.record(wallet, counterparty) {
                    found += 1;
                }
            }
            if found > 0 {
                debug!(
                    wallet = %wallet,
                    interactions = found,
                    "Buyer interacted with other early buyers"
                );
            }
        }

        info!(
            buyers = buyers.len(),
            pairs = graph.len(),
            interactions = graph.total_interactions(),
            "Interaction scan complete"
        );

        graph
    }
}

/// Recent transactions for a wallet, empty when the lookup fails or times out
async fn recent_transactions(
    market: &dyn MarketDataSource,
    wallet: &str,
    limit: u32,
    lookup_timeout: Duration,
) -> Vec<WalletTransaction> {
    let result = timeout(lookup_timeout, market.wallet_transactions(wallet, limit))
        .await
        .unwrap_or_else(|_| Err(Error::Timeout(lookup_timeout.as_millis() as u64)));

    match result {
        Ok(txs) => txs,
        Err(e) => {
            warn!(
                wallet = %wallet,
                source = market.name(),
                retryable = e.is_retryable(),
                error = %e,
                "Transaction history lookup failed"
            );
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::FixtureSource;

    fn tx(receiver: Option<&str>, seller: Option<&str>, buyer: Option<&str>) -> WalletTransaction {
        WalletTransaction {
            receiver: receiver.map(String::from),
            seller: seller.map(String::from),
            buyer: buyer.map(String::from),
            ..Default::default()
        }
    }

    fn to(receiver: &str) -> WalletTransaction {
        tx(Some(receiver), None, None)
    }

    fn builder(fixture: FixtureSource) -> InteractionGraphBuilder {
        InteractionGraphBuilder::new(
            InteractionConfig::default(),
            FanOut::default(),
            Arc::new(fixture),
        )
    }

    fn wallets(list: &[&str]) -> Vec<Address> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_counterparty_priority() {
        assert_eq!(resolve_counterparty(&tx(Some("r"), Some("s"), Some("b"))), Some("r"));
        assert_eq!(resolve_counterparty(&tx(None, Some("s"), Some("b"))), Some("s"));
        assert_eq!(resolve_counterparty(&tx(Some(""), None, Some("b"))), Some("b"));
        assert_eq!(resolve_counterparty(&tx(None, None, None)), None);
    }

    #[tokio::test]
    async fn test_both_directions_accumulate() {
        let fixture = FixtureSource::new()
            .with_transactions("w1", vec![to("w2")])
            .with_transactions("w2", vec![to("w1")]);

        let graph = builder(fixture).check_wallet_interactions(&wallets(&["w1", "w2"])).await;

        assert_eq!(graph.len(), 1);
        assert_eq!(graph.count("w1", "w2"), 2);
    }

    #[tokio::test]
    async fn test_ignores_self_and_outsiders() {
        let fixture = FixtureSource::new().with_transactions(
            "w1",
            vec![to("w1"), to("outsider"), to("w3"), tx(None, Some("w3"), None)],
        );

        let graph = builder(fixture)
            .check_wallet_interactions(&wallets(&["w1", "w2", "w3"]))
            .await;

        assert_eq!(graph.len(), 1);
        assert_eq!(graph.count("w1", "w3"), 2);
        assert_eq!(graph.count("w1", "outsider"), 0);
        for (pair, _) in graph.iter() {
            assert_ne!(pair.first(), pair.second());
            assert!(!pair.contains("outsider"));
        }
    }

    #[tokio::test]
    async fn test_receiver_shadows_buyer_field() {
        // receiver is an outsider, so the early buyer in `buyer` is never seen
        let fixture = FixtureSource::new()
            .with_transactions("w1", vec![tx(Some("outsider"), None, Some("w2"))]);

        let graph = builder(fixture).check_wallet_interactions(&wallets(&["w1", "w2"])).await;
        assert!(graph.is_empty());
    }

    #[tokio::test]
    async fn test_failed_history_is_empty() {
        let fixture = FixtureSource::new()
            .with_transactions("w1", vec![to("w2")])
            .failing("w2");

        let graph = builder(fixture).check_wallet_interactions(&wallets(&["w1", "w2"])).await;
        assert_eq!(graph.count("w1", "w2"), 1);
    }

    #[tokio::test]
    async fn test_tx_limit_applied() {
        let fixture =
            FixtureSource::new().with_transactions("w1", vec![to("w2"), to("w2"), to("w2")]);
        let builder = InteractionGraphBuilder::new(
            InteractionConfig { tx_limit: 2 },
            FanOut::default(),
            Arc::new(fixture),
        );

        let graph = builder.check_wallet_interactions(&wallets(&["w1", "w2"])).await;
        assert_eq!(graph.count("w1", "w2"), 2);
    }

    #[tokio::test]
    async fn test_no_buyers() {
        let graph = builder(FixtureSource::new()).check_wallet_interactions(&[]).await;
        assert!(graph.is_empty());
    }
}
