//! Paginated crawler for the seller-center returns list API.
//!
//! This crate provides:
//! - [`api`] — wire types for the cursor-paginated list endpoint
//! - [`filter`] — raw-record validation into canonical `{id, key}` form
//! - [`credentials`] — the injected credential-provider boundary
//! - [`index`] — the crawl index and its atomically-swapped store
//! - [`engine`] — the sequential page-by-cursor crawl loop

pub mod api;
pub mod credentials;
pub mod engine;
pub mod filter;
pub mod index;

pub use api::{Cursor, ListPage, ListRequest};
pub use credentials::{
    AuthHeaders, CapturedCredentials, CredentialCapture, CredentialProvider, StaticCredentials,
    acquire,
};
pub use engine::{CrawlObserver, Crawler, SilentObserver};
pub use filter::{FilterOutcome, filter_records};
pub use index::{CrawlIndex, CrawlStore};
