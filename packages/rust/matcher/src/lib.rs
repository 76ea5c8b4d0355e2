//! Reconciliation matcher: user key parsing and index joining.
//!
//! This crate provides:
//! - [`keys`] — line-based key parsing with format validation
//! - [`reconcile`] — joining validated keys against a [`CrawlIndex`]
//!
//! [`CrawlIndex`]: returnscope_crawler::CrawlIndex

pub mod keys;
pub mod reconcile;

pub use keys::{ParsedKeys, is_valid_key, parse_keys};
pub use reconcile::match_keys;
