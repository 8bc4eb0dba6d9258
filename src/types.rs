//! Shared types for early-buyer analysis
//!
//! Records returned by the data sources (trades, wallet transactions, PnL
//! breakdowns) and the results produced by the analysis pipeline.

use serde::ser::SerializeSeq;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Wallet address. Opaque, compared by exact string match.
pub type Address = String;

/// Net realized PnL in USD per wallet
pub type PnlMap = BTreeMap<Address, f64>;

/// Per-token PnL breakdown for one wallet, keyed by token id
pub type PnlBreakdown = BTreeMap<String, TokenPnl>;

// ============ Upstream records ============

/// Side of an observed swap
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TradeAction {
    Buy,
    Sell,
    Other(String),
}

impl TradeAction {
    /// Parse the upstream action label. Matching is exact: only `buy` is a buy.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("buy") => TradeAction::Buy,
            Some("sell") => TradeAction::Sell,
            Some(other) => TradeAction::Other(other.to_string()),
            None => TradeAction::Other(String::new()),
        }
    }
}

/// One observed swap on the token
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Trade {
    #[serde(rename = "tradeAction", default)]
    pub trade_action: Option<String>,
    #[serde(default)]
    pub maker: Option<String>,
    #[serde(default)]
    pub buyer: Option<String>,
    #[serde(rename = "blockUnixTime", default)]
    pub block_unix_time: Option<i64>,
    #[serde(rename = "txHash", default)]
    pub tx_hash: Option<String>,
}

impl Trade {
    pub fn action(&self) -> TradeAction {
        TradeAction::parse(self.trade_action.as_deref())
    }
}

/// A transaction from a wallet's recent history
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WalletTransaction {
    #[serde(default)]
    pub receiver: Option<String>,
    #[serde(default)]
    pub seller: Option<String>,
    #[serde(default)]
    pub buyer: Option<String>,
    #[serde(rename = "txHash", default)]
    pub tx_hash: Option<String>,
    #[serde(rename = "blockUnixTime", default)]
    pub block_unix_time: Option<i64>,
}

/// PnL entry for a single token position
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenPnl {
    #[serde(default)]
    pub pnl: Option<PnlFigures>,
}

impl TokenPnl {
    /// Realized profit for this position, 0 when the upstream omitted it
    pub fn realized_profit_usd(&self) -> f64 {
        self.pnl.as_ref().map(|p| p.realized_profit_usd).unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PnlFigures {
    #[serde(default)]
    pub realized_profit_usd: f64,
}

// ============ Analysis results ============

/// Wallet age relative to the token creation time.
///
/// `Known(secs)` is `wallet_creation - token_creation` and is negative for
/// wallets that predate the token. `Unknown` covers every case where the
/// creation time could not be determined and is never classified as new.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WalletAge {
    Known(i64),
    Unknown,
}

impl WalletAge {
    /// Compute the age from a wallet creation time (0 = unknown)
    pub fn from_creation_time(wallet_created_at: i64, token_created_at: i64) -> Self {
        if wallet_created_at > 0 {
            WalletAge::Known(wallet_created_at - token_created_at)
        } else {
            WalletAge::Unknown
        }
    }

    /// New iff `0 <= age <= threshold`
    pub fn is_new(&self, threshold_secs: u64) -> bool {
        match self {
            WalletAge::Known(age) => *age >= 0 && (*age as u64) <= threshold_secs,
            WalletAge::Unknown => false,
        }
    }
}

impl fmt::Display for WalletAge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WalletAge::Known(age) => write!(f, "{}s", age),
            WalletAge::Unknown => write!(f, "unknown"),
        }
    }
}

/// New-wallet summary across the early buyers
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BundleReport {
    pub num_new_wallets: usize,
    /// Percentage in [0, 100]; 0 when there were no buyers
    pub percentage_new: f64,
    pub buyer_ages: BTreeMap<Address, WalletAge>,
}

/// Unordered pair of distinct wallets, stored as `(min, max)`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WalletPair {
    a: Address,
    b: Address,
}

impl WalletPair {
    /// Canonical pair for two wallets, `None` for a self-pair
    pub fn new(x: &str, y: &str) -> Option<Self> {
        match x.cmp(y) {
            std::cmp::Ordering::Less => Some(Self {
                a: x.to_string(),
                b: y.to_string(),
            }),
            std::cmp::Ordering::Greater => Some(Self {
                a: y.to_string(),
                b: x.to_string(),
            }),
            std::cmp::Ordering::Equal => None,
        }
    }

    pub fn first(&self) -> &str {
        &self.a
    }

    pub fn second(&self) -> &str {
        &self.b
    }

    pub fn contains(&self, wallet: &str) -> bool {
        self.a == wallet || self.b == wallet
    }
}

/// Undirected weighted graph of interactions between early buyers
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InteractionGraph {
    edges: BTreeMap<WalletPair, u32>,
}

impl InteractionGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one interaction between two wallets. Self-pairs are ignored.
    pub fn record(&mut self, x: &str, y: &str) -> bool {
        match WalletPair::new(x, y) {
            Some(pair) => {
                *self.edges.entry(pair).or_insert(0) += 1;
                true
            }
            None => false,
        }
    }

    /// Interaction count for a pair, in either order
    pub fn count(&self, x: &str, y: &str) -> u32 {
        WalletPair::new(x, y)
            .and_then(|pair| self.edges.get(&pair).copied())
            .unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&WalletPair, &u32)> {
        self.edges.iter()
    }

    /// Sum of all edge weights
    pub fn total_interactions(&self) -> u64 {
        self.edges.values().map(|c| *c as u64).sum()
    }
}

#[derive(Serialize)]
struct InteractionEdge<'a> {
    wallet_a: &'a str,
    wallet_b: &'a str,
    count: u32,
}

impl Serialize for InteractionGraph {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(self.edges.len()))?;
        for (pair, count) in &self.edges {
            seq.serialize_element(&InteractionEdge {
                wallet_a: pair.first(),
                wallet_b: pair.second(),
                count: *count,
            })?;
        }
        seq.end()
    }
}

/// Wall-clock seconds per pipeline stage. Each stage is measured from the
/// end of the previous one.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StageTimings {
    pub total_time_seconds: f64,
    pub token_fetch_time: f64,
    pub trades_fetch_time: f64,
    pub buyers_extraction_time: f64,
    pub bundle_analysis_time: f64,
    pub pnl_fetch_time: f64,
    pub interactions_time: f64,
}

/// Combined result of one strategy run
#[derive(Debug, Clone, Serialize)]
pub struct StrategyReport {
    pub token_address: String,
    /// RFC 3339, UTC
    pub token_creation_time: String,
    pub token_creation_epoch: i64,
    pub early_buyers: Vec<Address>,
    pub bundle_analysis: BundleReport,
    pub buyer_pnls: PnlMap,
    pub good_buyers: PnlMap,
    pub interactions: InteractionGraph,
    pub performance: StageTimings,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trade_action_parse() {
        assert_eq!(TradeAction::parse(Some("buy")), TradeAction::Buy);
        assert_eq!(TradeAction::parse(Some("sell")), TradeAction::Sell);
        assert_eq!(
            TradeAction::parse(Some("BUY")),
            TradeAction::Other("BUY".to_string())
        );
        assert_eq!(TradeAction::parse(None), TradeAction::Other(String::new()));
    }

    #[test]
    fn test_trade_deserialize() {
        let json = r#"{
            "tradeAction": "buy",
            "maker": "addr1",
            "blockUnixTime": 1690000000,
            "txHash": "sig"
        }"#;
        let trade: Trade = serde_json::from_str(json).unwrap();
        assert_eq!(trade.action(), TradeAction::Buy);
        assert_eq!(trade.maker.as_deref(), Some("addr1"));
        assert!(trade.buyer.is_none());
        assert_eq!(trade.block_unix_time, Some(1690000000));
    }

    #[test]
    fn test_wallet_age_boundaries() {
        let token = 1_689_996_400;
        assert!(WalletAge::from_creation_time(1_690_000_000, token).is_new(3600));
        assert!(WalletAge::from_creation_time(token + 1, token).is_new(3600));
        assert!(WalletAge::from_creation_time(token, token).is_new(3600));
        assert!(!WalletAge::from_creation_time(token + 3601, token).is_new(3600));
        assert!(!WalletAge::from_creation_time(token - 1, token).is_new(3600));
        assert_eq!(WalletAge::from_creation_time(0, token), WalletAge::Unknown);
        assert!(!WalletAge::Unknown.is_new(u64::MAX));
    }

    #[test]
    fn test_wallet_age_serialization() {
        assert_eq!(serde_json::to_string(&WalletAge::Known(-5)).unwrap(), "-5");
        assert_eq!(serde_json::to_string(&WalletAge::Unknown).unwrap(), "null");
    }

    #[test]
    fn test_wallet_pair_canonical() {
        let ab = WalletPair::new("alpha", "beta").unwrap();
        let ba = WalletPair::new("beta", "alpha").unwrap();
        assert_eq!(ab, ba);
        assert_eq!(ab.first(), "alpha");
        assert_eq!(ab.second(), "beta");
        assert!(WalletPair::new("alpha", "alpha").is_none());
    }

    #[test]
    fn test_interaction_graph_accumulates_both_directions() {
        let mut graph = InteractionGraph::new();
        assert!(graph.record("w2", "w1"));
        assert!(graph.record("w1", "w2"));
        assert!(!graph.record("w1", "w1"));

        assert_eq!(graph.len(), 1);
        assert_eq!(graph.count("w1", "w2"), 2);
        assert_eq!(graph.count("w2", "w1"), 2);
        assert_eq!(graph.total_interactions(), 2);
    }

    #[test]
    fn test_interaction_graph_serialization() {
        let mut graph = InteractionGraph::new();
        graph.record("zed", "amy");
        let json = serde_json::to_value(&graph).unwrap();
        assert_eq!(
            json,
            serde_json::json!([{"wallet_a": "amy", "wallet_b": "zed", "count": 1}])
        );
    }

    #[test]
    fn test_token_pnl_missing_figures() {
        let entry: TokenPnl = serde_json::from_str("{}").unwrap();
        assert_eq!(entry.realized_profit_usd(), 0.0);
        let entry: TokenPnl =
            serde_json::from_str(r#"{"pnl":{"realized_profit_usd":-12.5}}"#).unwrap();
        assert_eq!(entry.realized_profit_usd(), -12.5);
    }
}
