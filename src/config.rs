//! Configuration loading and validation

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

// Re-export analysis configs
pub use crate::analysis::bundle::BundleAnalyzerConfig;
pub use crate::analysis::interactions::InteractionConfig;
pub use crate::analysis::profitability::ProfitabilityConfig;
use crate::analysis::FanOut;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub birdeye: BirdeyeConfig,
    #[serde(default)]
    pub rpc: RpcConfig,
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub bundle: BundleAnalyzerConfig,
    #[serde(default)]
    pub pnl: ProfitabilityConfig,
    #[serde(default)]
    pub interactions: InteractionConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BirdeyeConfig {
    #[serde(default = "default_birdeye_url")]
    pub base_url: String,
    #[serde(default = "default_birdeye_api_key")]
    pub api_key: String,
    #[serde(default = "default_chain")]
    pub chain: String,
    #[serde(default = "default_birdeye_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for BirdeyeConfig {
    fn default() -> Self {
        Self {
            base_url: default_birdeye_url(),
            api_key: default_birdeye_api_key(),
            chain: default_chain(),
            timeout_ms: default_birdeye_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcConfig {
    #[serde(default = "default_rpc_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_rpc_timeout_ms")]
    pub timeout_ms: u64,
    /// Signatures per `getSignaturesForAddress` page (RPC maximum is 1000)
    #[serde(default = "default_signature_page_limit")]
    pub signature_page_limit: usize,
    /// Hard ceiling on pages walked when looking for a wallet's first transaction
    #[serde(default = "default_max_signature_pages")]
    pub max_signature_pages: u32,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            endpoint: default_rpc_endpoint(),
            timeout_ms: default_rpc_timeout_ms(),
            signature_page_limit: default_signature_page_limit(),
            max_signature_pages: default_max_signature_pages(),
        }
    }
}

/// Run-level settings for a scan
#[derive(Debug, Clone, Deserialize)]
pub struct ScanConfig {
    /// Maximum unique early buyers analyzed per token
    #[serde(default = "default_max_buyers")]
    pub max_buyers: usize,
    /// Number of earliest trades fetched
    #[serde(default = "default_trade_limit")]
    pub trade_limit: u32,
    /// Concurrent per-wallet lookups
    #[serde(default = "default_max_concurrent_lookups")]
    pub max_concurrent_lookups: usize,
    /// Timeout for a single per-wallet lookup
    #[serde(default = "default_lookup_timeout_ms")]
    pub lookup_timeout_ms: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_buyers: default_max_buyers(),
            trade_limit: default_trade_limit(),
            max_concurrent_lookups: default_max_concurrent_lookups(),
            lookup_timeout_ms: default_lookup_timeout_ms(),
        }
    }
}

impl ScanConfig {
    /// Fan-out limits shared by the per-wallet analyzers
    pub fn fan_out(&self) -> FanOut {
        FanOut {
            max_concurrent: self.max_concurrent_lookups,
            timeout: Duration::from_millis(self.lookup_timeout_ms),
        }
    }
}

// Default value functions
fn default_birdeye_url() -> String {
    "https://public-api.birdeye.so".into()
}

fn default_birdeye_api_key() -> String {
    std::env::var("BIRDEYE_API_KEY").unwrap_or_default()
}

fn default_chain() -> String {
    "solana".into()
}

fn default_birdeye_timeout_ms() -> u64 {
    10000
}

fn default_rpc_endpoint() -> String {
    std::env::var("SOLANA_RPC_URL").unwrap_or_else(|_| "https://api.mainnet-beta.solana.com".into())
}

fn default_rpc_timeout_ms() -> u64 {
    30000
}

fn default_signature_page_limit() -> usize {
    1000
}

fn default_max_signature_pages() -> u32 {
    50
}

fn default_max_buyers() -> usize {
    100
}

fn default_trade_limit() -> u32 {
    200
}

fn default_max_concurrent_lookups() -> usize {
    8
}

fn default_lookup_timeout_ms() -> u64 {
    60000
}

impl Config {
    /// Load configuration from file and environment variables
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let settings = config::Config::builder()
            // Start with defaults
            .set_default("birdeye.base_url", default_birdeye_url())?
            .set_default("birdeye.chain", default_chain())?
            .set_default("rpc.endpoint", default_rpc_endpoint())?
            .set_default("rpc.timeout_ms", default_rpc_timeout_ms() as i64)?
            // Load from file if exists
            .add_source(config::File::from(path).required(false))
            // Override with environment variables (prefix SCANNER__)
            .add_source(
                config::Environment::with_prefix("SCANNER")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        let config: Config = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        // Validate configuration
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.birdeye.base_url)
            .with_context(|| format!("Invalid birdeye.base_url: {}", self.birdeye.base_url))?;
        url::Url::parse(&self.rpc.endpoint)
            .with_context(|| format!("Invalid rpc.endpoint: {}", mask_url(&self.rpc.endpoint)))?;

        if self.birdeye.chain.is_empty() {
            anyhow::bail!("birdeye.chain must not be empty");
        }

        if self.rpc.signature_page_limit == 0 || self.rpc.signature_page_limit > 1000 {
            anyhow::bail!("rpc.signature_page_limit must be between 1 and 1000");
        }

        if self.rpc.max_signature_pages == 0 {
            anyhow::bail!("rpc.max_signature_pages must be positive");
        }

        if self.scan.trade_limit == 0 {
            anyhow::bail!("scan.trade_limit must be positive");
        }

        if self.scan.max_concurrent_lookups == 0 {
            anyhow::bail!("scan.max_concurrent_lookups must be positive");
        }

        if self.scan.lookup_timeout_ms == 0 {
            anyhow::bail!("scan.lookup_timeout_ms must be positive");
        }

        if self.pnl.batch_size == 0 {
            anyhow::bail!("pnl.batch_size must be positive");
        }

        if self.interactions.tx_limit == 0 {
            anyhow::bail!("interactions.tx_limit must be positive");
        }

        if self.scan.max_buyers as u64 > self.scan.trade_limit as u64 {
            tracing::warn!(
                max_buyers = self.scan.max_buyers,
                trade_limit = self.scan.trade_limit,
                "max_buyers exceeds trade_limit - buyer cap can never be reached"
            );
        }

        Ok(())
    }

    /// Get masked configuration for display (hide secrets)
    pub fn masked_display(&self) -> String {
        format!(
            r#"Configuration:
  Birdeye:
    base_url: {}
    chain: {}
    api_key: {}
    timeout: {}ms
  RPC:
    endpoint: {}
    timeout: {}ms
    signature_page_limit: {}
    max_signature_pages: {}
  Scan:
    max_buyers: {}
    trade_limit: {}
    max_concurrent_lookups: {}
    lookup_timeout: {}ms
  Bundle:
    new_wallet_threshold: {}s
  PnL:
    batch_size: {}
  Interactions:
    tx_limit: {}
"#,
            mask_url(&self.birdeye.base_url),
            self.birdeye.chain,
            if self.birdeye.api_key.is_empty() {
                "(not set)"
            } else {
                "***"
            },
            self.birdeye.timeout_ms,
            mask_url(&self.rpc.endpoint),
            self.rpc.timeout_ms,
            self.rpc.signature_page_limit,
            self.rpc.max_signature_pages,
            self.scan.max_buyers,
            self.scan.trade_limit,
            self.scan.max_concurrent_lookups,
            self.scan.lookup_timeout_ms,
            self.bundle.new_wallet_threshold_secs,
            self.pnl.batch_size,
            self.interactions.tx_limit,
        )
    }
}

/// Mask URL for display (hide API keys in query params)
fn mask_url(url: &str) -> String {
    if let Some(idx) = url.find('?') {
        format!("{}?***", &url[..idx])
    } else {
        url.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.scan.max_buyers, 100);
        assert_eq!(config.scan.trade_limit, 200);
        assert_eq!(config.bundle.new_wallet_threshold_secs, 3600);
        assert_eq!(config.pnl.batch_size, 50);
        assert_eq!(config.interactions.tx_limit, 100);
        assert_eq!(config.rpc.signature_page_limit, 1000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[birdeye]
api_key = "from-file"

[scan]
max_buyers = 25
max_concurrent_lookups = 2

[bundle]
new_wallet_threshold_secs = 600
"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.birdeye.api_key, "from-file");
        assert_eq!(config.birdeye.chain, "solana");
        assert_eq!(config.scan.max_buyers, 25);
        assert_eq!(config.scan.trade_limit, 200);
        assert_eq!(config.scan.fan_out().max_concurrent, 2);
        assert_eq!(config.bundle.new_wallet_threshold_secs, 600);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = Config::load("/nonexistent/scanner.toml").unwrap();
        assert_eq!(config.pnl.batch_size, 50);
    }

    #[test]
    fn test_validation_rejects_zero_limits() {
        let mut config = Config::default();
        config.pnl.batch_size = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.rpc.signature_page_limit = 5000;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.scan.max_concurrent_lookups = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.rpc.endpoint = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_masked_display_hides_secrets() {
        let mut config = Config::default();
        config.birdeye.api_key = "super-secret".to_string();
        config.rpc.endpoint = "https://mainnet.helius-rpc.com/?api-key=abc".to_string();

        let display = config.masked_display();
        assert!(!display.contains("super-secret"));
        assert!(!display.contains("api-key=abc"));
        assert!(display.contains("https://mainnet.helius-rpc.com/?***"));
    }

    #[test]
    fn test_mask_url() {
        assert_eq!(
            mask_url("https://api.example.com?key=secret"),
            "https://api.example.com?***"
        );
        assert_eq!(
            mask_url("https://api.example.com"),
            "https://api.example.com"
        );
    }
}
