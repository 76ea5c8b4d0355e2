//! Shared types, error model, and configuration for ReturnScope.
//!
//! This crate is the foundation depended on by all other ReturnScope crates.
//! It provides:
//! - [`ReturnScopeError`] — the unified error type
//! - Domain types ([`DateRange`], [`ReturnRecord`], [`MatchOutcome`], [`EnrichmentResult`])
//! - Configuration ([`AppConfig`], [`CrawlConfig`], [`EnrichConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    ApiConfig, AppConfig, CrawlConfig, EnrichConfig, EnrichSectionConfig, config_dir,
    config_file_path, init_config, load_config, load_config_from,
};
pub use error::{Result, ReturnScopeError};
pub use types::{
    CacheSummary, DateRange, EnrichmentResult, MatchOutcome, MatchedPair, ReturnRecord, RunId,
};
