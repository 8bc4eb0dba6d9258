//! Strategy runner
//!
//! Runs the analysis stages for one token strictly in sequence:
//! token creation time -> early trades -> early buyers -> bundle analysis ->
//! PnL -> interactions. Each stage's duration is measured from the end of
//! the previous stage.
//!
//! Only the two token-level fetches can fail a run. Per-wallet failures are
//! absorbed by the analyzers.

use chrono::{DateTime, SecondsFormat};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use crate::analysis::{
    extract_early_buyers, good_buyers, BundleAnalyzer, InteractionGraphBuilder, ProfitabilityScorer,
};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::sources::{MarketDataSource, WalletHistorySource};
use crate::types::{StageTimings, StrategyReport};

/// Length in bytes of a decoded Solana address
const ADDRESS_LEN: usize = 32;

/// Runs the full early-buyer analysis for a token
pub struct StrategyRunner {
    market: Arc<dyn MarketDataSource>,
    trade_limit: u32,
    bundle: BundleAnalyzer,
    profitability: ProfitabilityScorer,
    interactions: InteractionGraphBuilder,
}

impl StrategyRunner {
    pub fn new(
        config: &Config,
        market: Arc<dyn MarketDataSource>,
        history: Arc<dyn WalletHistorySource>,
    ) -> Self {
        let fan_out = config.scan.fan_out();
        Self {
            trade_limit: config.scan.trade_limit,
            bundle: BundleAnalyzer::new(config.bundle.clone(), fan_out, history),
            profitability: ProfitabilityScorer::new(config.pnl.clone(), fan_out, market.clone()),
            interactions: InteractionGraphBuilder::new(
                config.interactions.clone(),
                fan_out,
                market.clone(),
            ),
            market,
        }
    }

    /// Analyze the first `max_buyers` unique buyers of `token`
    pub async fn run_strategy(&self, token: &str, max_buyers: usize) -> Result<StrategyReport> {
        validate_token_address(token)?;

        info!(token = %token, max_buyers, source = self.market.name(), "Starting strategy run");

        let start = Instant::now();
        let mut lap = start;
        let mut performance = StageTimings::default();

        let token_created_at = self.market.token_creation_time(token).await?;
        performance.token_fetch_time = split(&mut lap);
        if token_created_at == 0 {
            warn!(
                token = %token,
                "Token creation time unknown - wallet ages are relative to epoch 0"
            );
        }
        info!(token = %token, created_at = token_created_at, "Fetched token creation time");

        let trades = self.market.early_trades(token, self.trade_limit).await?;
        performance.trades_fetch_time = split(&mut lap);
        info!(trades = trades.len(), "Fetched early trades");

        let early_buyers = extract_early_buyers(&trades, max_buyers);
        performance.buyers_extraction_time = split(&mut lap);
        info!(buyers = early_buyers.len(), "Extracted early buyers");

        let bundle_analysis = self
            .bundle
            .analyze_bundle_buys(&early_buyers, token_created_at)
            .await;
        performance.bundle_analysis_time = split(&mut lap);

        let buyer_pnls = self.profitability.get_wallet_pnl(&early_buyers).await;
        let good = good_buyers(&buyer_pnls);
        performance.pnl_fetch_time = split(&mut lap);

        let interactions = self.interactions.check_wallet_interactions(&early_buyers).await;
        performance.interactions_time = split(&mut lap);

        performance.total_time_seconds = start.elapsed().as_secs_f64();

        info!(
            token = %token,
            buyers = early_buyers.len(),
            new_wallets = bundle_analysis.num_new_wallets,
            good_buyers = good.len(),
            interaction_pairs = interactions.len(),
            total_secs = %format!("{:.2}", performance.total_time_seconds),
            "Strategy run complete"
        );

        Ok(StrategyReport {
            token_address: token.to_string(),
            token_creation_time: render_timestamp(token_created_at),
            token_creation_epoch: token_created_at,
            early_buyers,
            bundle_analysis,
            buyer_pnls,
            good_buyers: good,
            interactions,
            performance,
        })
    }
}

/// Reject anything that is not a base58-encoded 32-byte address
pub fn validate_token_address(token: &str) -> Result<()> {
    let bytes = bs58::decode(token)
        .into_vec()
        .map_err(|e| Error::InvalidTokenAddress(format!("{}: {}", token, e)))?;

    if bytes.len() != ADDRESS_LEN {
        return Err(Error::InvalidTokenAddress(format!(
            "{}: decodes to {} bytes, expected {}",
            token,
            bytes.len(),
            ADDRESS_LEN
        )));
    }
    Ok(())
}

/// RFC 3339 UTC rendering of an epoch timestamp
pub fn render_timestamp(epoch_secs: i64) -> String {
    DateTime::from_timestamp(epoch_secs, 0)
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_else(|| epoch_secs.to_string())
}

/// Seconds since `lap`, restarting the lap
fn split(lap: &mut Instant) -> f64 {
    let now = Instant::now();
    let elapsed = now.duration_since(*lap).as_secs_f64();
    *lap = now;
    elapsed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::FixtureSource;
    use crate::types::{Trade, WalletAge, WalletTransaction};
    use async_trait::async_trait;

    const TOKEN: &str = "So11111111111111111111111111111111111111112";
    const TOKEN_CREATED: i64 = 1_689_996_400;

    fn buy(maker: &str) -> Trade {
        Trade {
            trade_action: Some("buy".into()),
            maker: Some(maker.into()),
            ..Default::default()
        }
    }

    fn sell(maker: &str) -> Trade {
        Trade {
            trade_action: Some("sell".into()),
            maker: Some(maker.into()),
            ..Default::default()
        }
    }

    fn to(receiver: &str) -> WalletTransaction {
        WalletTransaction {
            receiver: Some(receiver.into()),
            ..Default::default()
        }
    }

    fn fixture() -> FixtureSource {
        FixtureSource::new()
            .with_token(
                TOKEN,
                TOKEN_CREATED,
                vec![buy("w1"), sell("w9"), buy("w2"), buy("w1"), buy("w3")],
            )
            .with_wallet_creation("w1", TOKEN_CREATED + 600)
            .with_wallet_creation("w2", TOKEN_CREATED - 86_400)
            .with_pnl("w1", &[("tok1", 100.0), ("tok2", -30.0)])
            .with_pnl("w2", &[("tok1", -10.0)])
            .with_transactions("w1", vec![to("w2"), to("w9")])
            .with_transactions("w2", vec![to("w1")])
            .failing("w3")
    }

    fn runner(fixture: FixtureSource) -> StrategyRunner {
        let source = Arc::new(fixture);
        StrategyRunner::new(&Config::default(), source.clone(), source)
    }

    #[tokio::test]
    async fn test_full_run() {
        let report = runner(fixture()).run_strategy(TOKEN, 100).await.unwrap();

        assert_eq!(report.token_address, TOKEN);
        assert_eq!(report.token_creation_epoch, TOKEN_CREATED);
        assert_eq!(report.token_creation_time, "2023-07-22T03:26:40Z");
        assert_eq!(report.early_buyers, vec!["w1", "w2", "w3"]);

        assert_eq!(report.bundle_analysis.num_new_wallets, 1);
        assert!((report.bundle_analysis.percentage_new - 100.0 / 3.0).abs() < 1e-9);
        assert_eq!(report.bundle_analysis.buyer_ages["w1"], WalletAge::Known(600));
        assert_eq!(report.bundle_analysis.buyer_ages["w3"], WalletAge::Unknown);

        assert_eq!(report.buyer_pnls.len(), 3);
        assert!((report.buyer_pnls["w1"] - 70.0).abs() < 1e-9);
        assert_eq!(report.buyer_pnls["w3"], 0.0);
        assert_eq!(report.good_buyers.keys().collect::<Vec<_>>(), vec!["w1"]);

        assert_eq!(report.interactions.len(), 1);
        assert_eq!(report.interactions.count("w1", "w2"), 2);

        let perf = &report.performance;
        let stages = perf.token_fetch_time
            + perf.trades_fetch_time
            + perf.buyers_extraction_time
            + perf.bundle_analysis_time
            + perf.pnl_fetch_time
            + perf.interactions_time;
        assert!(stages <= perf.total_time_seconds + 1e-6);
    }

    #[tokio::test]
    async fn test_buyer_cap() {
        let report = runner(fixture()).run_strategy(TOKEN, 1).await.unwrap();
        assert_eq!(report.early_buyers, vec!["w1"]);
        assert_eq!(report.bundle_analysis.percentage_new, 100.0);
        assert!(report.interactions.is_empty());
    }

    #[tokio::test]
    async fn test_runs_are_idempotent() {
        let runner = runner(fixture());
        let first = runner.run_strategy(TOKEN, 100).await.unwrap();
        let second = runner.run_strategy(TOKEN, 100).await.unwrap();

        assert_eq!(first.early_buyers, second.early_buyers);
        assert_eq!(first.bundle_analysis, second.bundle_analysis);
        assert_eq!(first.buyer_pnls, second.buyer_pnls);
        assert_eq!(first.interactions, second.interactions);
    }

    #[tokio::test]
    async fn test_no_trades() {
        let fixture = FixtureSource::new().with_token(TOKEN, TOKEN_CREATED, vec![]);
        let report = runner(fixture).run_strategy(TOKEN, 100).await.unwrap();

        assert!(report.early_buyers.is_empty());
        assert_eq!(report.bundle_analysis.percentage_new, 0.0);
        assert!(report.buyer_pnls.is_empty());
        assert!(report.interactions.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_token_creation() {
        let report = runner(FixtureSource::new()).run_strategy(TOKEN, 100).await.unwrap();
        assert_eq!(report.token_creation_epoch, 0);
        assert_eq!(report.token_creation_time, "1970-01-01T00:00:00Z");
    }

    #[tokio::test]
    async fn test_invalid_token_aborts() {
        let err = runner(fixture()).run_strategy("not-an-address!", 100).await.unwrap_err();
        assert!(err.is_configuration());

        let err = runner(fixture()).run_strategy("abc", 100).await.unwrap_err();
        assert!(matches!(err, Error::InvalidTokenAddress(_)));
    }

    struct BrokenMarket;

    #[async_trait]
    impl MarketDataSource for BrokenMarket {
        fn name(&self) -> &'static str {
            "broken"
        }

        async fn token_creation_time(&self, _token: &str) -> Result<i64> {
            Ok(TOKEN_CREATED)
        }

        async fn early_trades(&self, _token: &str, _limit: u32) -> Result<Vec<Trade>> {
            Err(Error::Api {
                status: 500,
                body: "upstream down".into(),
            })
        }

        async fn wallet_pnl_breakdown(&self, _wallet: &str) -> Result<crate::types::PnlBreakdown> {
            Ok(Default::default())
        }

        async fn wallet_transactions(
            &self,
            _wallet: &str,
            _limit: u32,
        ) -> Result<Vec<WalletTransaction>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_trade_fetch_failure_aborts() {
        let runner = StrategyRunner::new(
            &Config::default(),
            Arc::new(BrokenMarket),
            Arc::new(FixtureSource::new()),
        );
        let err = runner.run_strategy(TOKEN, 100).await.unwrap_err();
        assert!(matches!(err, Error::Api { status: 500, .. }));
    }

    #[test]
    fn test_validate_token_address() {
        assert!(validate_token_address(TOKEN).is_ok());
        assert!(validate_token_address("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v").is_ok());
        assert!(validate_token_address("").is_err());
        assert!(validate_token_address("0OIl").is_err());
    }

    #[test]
    fn test_render_timestamp() {
        assert_eq!(render_timestamp(0), "1970-01-01T00:00:00Z");
        assert_eq!(render_timestamp(1_690_000_000), "2023-07-22T04:26:40Z");
    }
}
