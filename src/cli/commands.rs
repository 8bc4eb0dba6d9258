//! CLI command implementations

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use crate::config::Config;
use crate::orchestrator::StrategyRunner;
use crate::sources::{
    BirdeyeClient, FixtureSource, MarketDataSource, SolanaRpcClient, WalletHistorySource,
};
use crate::types::StrategyReport;

/// Wrapped SOL mint, used as a known-good token for health probes
const PROBE_TOKEN: &str = "So11111111111111111111111111111111111111112";

/// Good buyers shown in the summary
const SUMMARY_TOP_BUYERS: usize = 10;

/// Analyze a token and emit the report as JSON
pub async fn run(
    config: &Config,
    token: &str,
    max_buyers: Option<usize>,
    output: Option<&Path>,
    fixture: Option<&Path>,
    compact: bool,
) -> Result<()> {
    let (market, history) = match fixture {
        Some(path) => {
            info!(fixture = %path.display(), "Replaying recorded responses");
            let source = Arc::new(FixtureSource::from_file(path)?);
            let market: Arc<dyn MarketDataSource> = source.clone();
            let history: Arc<dyn WalletHistorySource> = source;
            (market, history)
        }
        None => {
            let market: Arc<dyn MarketDataSource> =
                Arc::new(BirdeyeClient::new(&config.birdeye)?);
            let history: Arc<dyn WalletHistorySource> =
                Arc::new(SolanaRpcClient::new(&config.rpc)?);
            (market, history)
        }
    };

    let max_buyers = max_buyers.unwrap_or(config.scan.max_buyers);
    let runner = StrategyRunner::new(config, market, history);
    let report = runner.run_strategy(token, max_buyers).await?;

    print_summary(&report);

    let json = if compact {
        serde_json::to_string(&report)?
    } else {
        serde_json::to_string_pretty(&report)?
    };

    match output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            info!(path = %path.display(), "Report written");
        }
        None => println!("{}", json),
    }

    Ok(())
}

/// Human-readable summary on stderr, keeping stdout for the JSON report
fn print_summary(report: &StrategyReport) {
    let bundle = &report.bundle_analysis;

    eprintln!("\n=== EARLY BUYER ANALYSIS ===\n");
    eprintln!("Token:          {}", report.token_address);
    eprintln!("Created:        {}", report.token_creation_time);
    eprintln!("Early buyers:   {}", report.early_buyers.len());
    eprintln!(
        "New wallets:    {} ({:.1}%)",
        bundle.num_new_wallets, bundle.percentage_new
    );
    eprintln!("Good buyers:    {}", report.good_buyers.len());
    eprintln!(
        "Interactions:   {} pairs, {} total",
        report.interactions.len(),
        report.interactions.total_interactions()
    );

    if !report.good_buyers.is_empty() {
        let mut ranked: Vec<(&String, &f64)> = report.good_buyers.iter().collect();
        ranked.sort_by(|a, b| b.1.total_cmp(a.1).then_with(|| a.0.cmp(b.0)));

        eprintln!("\n=== TOP GOOD BUYERS ===\n");
        for (wallet, pnl) in ranked.into_iter().take(SUMMARY_TOP_BUYERS) {
            let age = bundle
                .buyer_ages
                .get(wallet)
                .map(|a| a.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            eprintln!("  {:<44}  ${:>12.2}  age {}", wallet, pnl, age);
        }
    }

    let perf = &report.performance;
    eprintln!("\n=== TIMINGS ===\n");
    eprintln!("  Token fetch:     {:.3}s", perf.token_fetch_time);
    eprintln!("  Trades fetch:    {:.3}s", perf.trades_fetch_time);
    eprintln!("  Buyer extract:   {:.3}s", perf.buyers_extraction_time);
    eprintln!("  Bundle analysis: {:.3}s", perf.bundle_analysis_time);
    eprintln!("  PnL fetch:       {:.3}s", perf.pnl_fetch_time);
    eprintln!("  Interactions:    {:.3}s", perf.interactions_time);
    eprintln!("  Total:           {:.3}s\n", perf.total_time_seconds);
}

/// Show current configuration (secrets masked)
pub fn show_config(config: &Config) -> Result<()> {
    println!("{}", config.masked_display());
    Ok(())
}

/// Check upstream health
pub async fn health(config: &Config) -> Result<()> {
    println!("\n=== SYSTEM HEALTH CHECK ===\n");

    let mut all_healthy = true;

    print!("Birdeye API... ");
    match check_birdeye(config).await {
        Ok(latency) => println!("OK ({}ms)", latency),
        Err(e) => {
            println!("FAILED: {}", e);
            all_healthy = false;
        }
    }

    print!("RPC Endpoint... ");
    match check_rpc(config).await {
        Ok(latency) => println!("OK ({}ms)", latency),
        Err(e) => {
            println!("FAILED: {}", e);
            all_healthy = false;
        }
    }

    println!();
    if all_healthy {
        println!("All systems healthy!");
    } else {
        warn!("Health check found unhealthy upstreams");
        println!("Some systems are unhealthy. Check the errors above.");
    }

    Ok(())
}

async fn check_birdeye(config: &Config) -> Result<u64> {
    let client = BirdeyeClient::new(&config.birdeye)?;

    let start = Instant::now();
    client.ping(PROBE_TOKEN).await?;
    Ok(start.elapsed().as_millis() as u64)
}

async fn check_rpc(config: &Config) -> Result<u64> {
    let client = SolanaRpcClient::new(&config.rpc)?;

    let start = Instant::now();
    client.health().await?;
    Ok(start.elapsed().as_millis() as u64)
}
