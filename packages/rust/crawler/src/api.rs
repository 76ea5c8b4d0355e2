//! Wire types for the seller-center returns list API.
//!
//! The upstream endpoint is cursor-paginated and loose about its response
//! shape: the record array shows up either nested under `data.list` or as a
//! top-level `data` array, and pagination metadata may be absent entirely.
//! [`ListPage::parse`] normalizes all of that into one struct.

use serde::Serialize;
use serde_json::Value;

use returnscope_shared::{DateRange, Result, ReturnScopeError};

/// Cursor type tag the upstream expects on every cursor object.
const CURSOR_TYPE: &str = "return_id";

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// Pagination cursor, included only after the first page.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Cursor {
    pub cursor_type: &'static str,
    pub cursor_offset: u64,
}

/// A single list-page request body.
///
/// The `keyword`/status fields are required by the upstream API but unused
/// by this system; they are always sent empty/null.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListRequest {
    pub language: String,
    pub page_number: u32,
    pub page_size: u32,
    pub create_time_range: DateRange,
    pub keyword: String,
    pub return_status: Option<String>,
    pub logistics_status: Option<String>,
    pub negotiation_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<Cursor>,
}

impl ListRequest {
    /// Build the request for one page. The cursor object is attached only
    /// when `cursor_offset` is non-zero.
    pub fn new(
        language: &str,
        page_number: u32,
        page_size: u32,
        range: &DateRange,
        cursor_offset: u64,
    ) -> Self {
        let cursor = (cursor_offset != 0).then_some(Cursor {
            cursor_type: CURSOR_TYPE,
            cursor_offset,
        });

        Self {
            language: language.to_string(),
            page_number,
            page_size,
            create_time_range: *range,
            keyword: String::new(),
            return_status: None,
            logistics_status: None,
            negotiation_status: None,
            cursor,
        }
    }
}

// ---------------------------------------------------------------------------
// Response
// ---------------------------------------------------------------------------

/// One parsed page of the list response.
#[derive(Debug, Clone)]
pub struct ListPage {
    /// Raw records on this page. Empty means end of data.
    pub records: Vec<Value>,
    /// Whether the server reports more pages.
    pub has_more: bool,
    /// Cursor offset for the next request.
    pub cursor_offset: u64,
}

impl ListPage {
    /// Parse a raw response payload.
    ///
    /// An error envelope with `error != 0` is a hard failure for the page.
    /// A payload where neither recognized record-array shape is present
    /// parses as an empty page (end of data), not an error.
    pub fn parse(payload: &Value) -> Result<Self> {
        if let Some(code) = payload.get("error").and_then(Value::as_i64) {
            if code != 0 {
                let msg = payload
                    .get("error_msg")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown upstream error");
                return Err(ReturnScopeError::protocol(format!(
                    "upstream error {code}: {msg}"
                )));
            }
        }

        let data = payload.get("data");

        // Record array: nested `data.list`, or `data` itself as an array.
        let records = match data {
            Some(Value::Object(obj)) => obj
                .get("list")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default(),
            Some(Value::Array(arr)) => arr.clone(),
            _ => Vec::new(),
        };

        // Pagination metadata lives under `data.pageInfo`; absent metadata
        // means there is nothing more to fetch.
        let page_info = data.and_then(|d| d.get("pageInfo"));
        let has_more = page_info
            .and_then(|p| p.get("hasMore"))
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let cursor_offset = page_info
            .and_then(|p| p.get("cursor"))
            .and_then(|c| c.get("cursorOffset"))
            .and_then(Value::as_u64)
            .unwrap_or(0);

        Ok(Self {
            records,
            has_more,
            cursor_offset,
        })
    }
}
