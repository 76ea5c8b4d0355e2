//! Core pipeline orchestration for ReturnScope.
//!
//! Ties the crawler, matcher, and enricher together into end-to-end
//! workflows (`run`, `refresh_cache`, `check_keys`).

pub mod pipeline;

pub use pipeline::{
    ProgressReporter, RunConfig, RunResult, SilentProgress, check_keys, refresh_cache, run,
};
pub use returnscope_enricher::StopFlag;
