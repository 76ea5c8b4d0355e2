//! User key parsing and validation.
//!
//! Input is free text, one return serial number per line. Invalid lines are
//! dropped and counted rather than failing the parse; only a fully-invalid
//! input is an error.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use returnscope_shared::{Result, ReturnScopeError};

/// Valid key format: uppercase alphanumeric, 3 to 20 characters.
static KEY_FORMAT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z0-9]{3,20}$").expect("valid key regex"));

/// Outcome of parsing a key list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedKeys {
    /// Valid keys in input order.
    pub keys: Vec<String>,
    /// Number of non-empty lines dropped for format violations.
    pub dropped: usize,
}

/// Check a single candidate against the key format rule.
pub fn is_valid_key(candidate: &str) -> bool {
    KEY_FORMAT.is_match(candidate)
}

/// Parse user-supplied text into validated keys.
///
/// Lines are trimmed; empty lines are ignored; lines failing the format
/// rule are dropped and counted. Zero surviving keys is a validation error.
pub fn parse_keys(text: &str) -> Result<ParsedKeys> {
    let mut keys = Vec::new();
    let mut dropped = 0;

    for line in text.lines() {
        let candidate = line.trim();
        if candidate.is_empty() {
            continue;
        }
        if is_valid_key(candidate) {
            keys.push(candidate.to_string());
        } else {
            debug!(line = candidate, "dropping invalid key");
            dropped += 1;
        }
    }

    if keys.is_empty() {
        return Err(ReturnScopeError::validation(format!(
            "no valid keys in input ({dropped} invalid line(s) dropped)"
        )));
    }

    Ok(ParsedKeys { keys, dropped })
}
