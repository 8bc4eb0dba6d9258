//! Early-Buyer Bundle Scanner Library
//!
//! Detects coordinated ("bundled") launches of new Solana tokens by looking at
//! the token's first buyers: new-wallet share, buyer profitability, and
//! buyer-to-buyer interactions.

pub mod analysis;
pub mod cli;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod sources;
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use error::{Error, Result};
pub use orchestrator::StrategyRunner;
pub use types::StrategyReport;
