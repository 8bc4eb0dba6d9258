//! Early buyer extraction
//!
//! Pure function over the trade list; no upstream calls.

use std::collections::HashSet;
use tracing::debug;

use crate::types::{Address, Trade, TradeAction};

/// Fields tried, in order, to find who bought. First non-empty wins.
const BUYER_FIELDS: &[fn(&Trade) -> Option<&str>] = &[maker_field, buyer_field];

fn maker_field(trade: &Trade) -> Option<&str> {
    trade.maker.as_deref()
}

fn buyer_field(trade: &Trade) -> Option<&str> {
    trade.buyer.as_deref()
}

/// Resolve the buyer of a trade via `BUYER_FIELDS`
pub fn resolve_buyer(trade: &Trade) -> Option<&str> {
    BUYER_FIELDS
        .iter()
        .filter_map(|field| field(trade))
        .find(|addr| !addr.is_empty())
}

/// Unique buyers among `trades`, capped at `max_buyers`.
///
/// Trades must be ordered oldest first: scanning stops the moment the cap is
/// reached, so later buyers are never looked at. With an unordered trade
/// list the result depends on whatever order the source returned.
///
/// Buyers are returned in first-seen order.
pub fn extract_early_buyers(trades: &[Trade], max_buyers: usize) -> Vec<Address> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut buyers: Vec<Address> = Vec::new();

    if max_buyers == 0 {
        return buyers;
    }

    for trade in trades {
        if trade.action() != TradeAction::Buy {
            continue;
        }

        if let Some(buyer) = resolve_buyer(trade) {
            if seen.insert(buyer) {
                buyers.push(buyer.to_string());
            }
        }

        if buyers.len() >= max_buyers {
            break;
        }
    }

    debug!(
        trades = trades.len(),
        buyers = buyers.len(),
        cap = max_buyers,
        "Extracted early buyers"
    );

    buyers
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trade(action: &str, maker: Option<&str>, buyer: Option<&str>) -> Trade {
        Trade {
            trade_action: Some(action.to_string()),
            maker: maker.map(String::from),
            buyer: buyer.map(String::from),
            ..Default::default()
        }
    }

    #[test]
    fn test_extract_early_buyers() {
        let trades = vec![
            trade("buy", Some("addr1"), None),
            trade("sell", Some("addr2"), None),
            trade("buy", Some("addr1"), None),
        ];
        assert_eq!(extract_early_buyers(&trades, 1), vec!["addr1"]);
    }

    #[test]
    fn test_skips_non_buys() {
        let trades = vec![
            trade("sell", Some("s1"), None),
            trade("add_liquidity", Some("lp"), None),
            trade("buy", Some("b1"), None),
            trade("Buy", Some("b2"), None),
        ];
        assert_eq!(extract_early_buyers(&trades, 100), vec!["b1"]);
    }

    #[test]
    fn test_buyer_field_fallback() {
        let trades = vec![
            trade("buy", None, Some("from_buyer")),
            trade("buy", Some(""), Some("empty_maker")),
            trade("buy", Some("maker_wins"), Some("ignored")),
            trade("buy", None, None),
            trade("buy", Some(""), Some("")),
        ];
        assert_eq!(
            extract_early_buyers(&trades, 100),
            vec!["from_buyer", "empty_maker", "maker_wins"]
        );
    }

    #[test]
    fn test_dedup_and_cap() {
        let trades: Vec<Trade> = ["a", "b", "a", "c", "b", "d", "e"]
            .iter()
            .map(|w| trade("buy", Some(w), None))
            .collect();

        let buyers = extract_early_buyers(&trades, 3);
        assert_eq!(buyers, vec!["a", "b", "c"]);

        let all = extract_early_buyers(&trades, 100);
        assert_eq!(all, vec!["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn test_cap_zero_and_empty_input() {
        let trades = vec![trade("buy", Some("a"), None)];
        assert!(extract_early_buyers(&trades, 0).is_empty());
        assert!(extract_early_buyers(&[], 10).is_empty());
    }

    #[test]
    fn test_result_bounded_and_unique() {
        let trades: Vec<Trade> = (0..50)
            .map(|i| {
                let action = if i % 3 == 0 { "sell" } else { "buy" };
                trade(action, Some(&format!("w{}", i % 17)), None)
            })
            .collect();
        let sellers_only: HashSet<String> = trades
            .iter()
            .filter(|t| t.action() == TradeAction::Sell)
            .filter_map(|t| t.maker.clone())
            .filter(|w| {
                !trades
                    .iter()
                    .any(|t| t.action() == TradeAction::Buy && t.maker.as_deref() == Some(w))
            })
            .collect();

        for cap in [1, 5, 10, 100] {
            let buyers = extract_early_buyers(&trades, cap);
            assert!(buyers.len() <= cap);
            let unique: HashSet<&String> = buyers.iter().collect();
            assert_eq!(unique.len(), buyers.len());
            assert!(buyers.iter().all(|b| !sellers_only.contains(b)));
        }
    }
}
