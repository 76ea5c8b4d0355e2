//! Raw-record validation and normalization.
//!
//! The upstream list API returns large, loosely-typed records; only the
//! `(return_id, return_sn)` pair matters downstream. Everything else is
//! dropped here, along with any record missing either field.

use serde_json::Value;

use returnscope_shared::ReturnRecord;

/// Output of one filter pass.
#[derive(Debug, Clone, Default)]
pub struct FilterOutcome {
    /// Records that passed validation, in input order.
    pub records: Vec<ReturnRecord>,
    /// Number of raw records dropped.
    pub dropped: usize,
}

/// Filter raw records into canonical `{id, key}` form.
///
/// A record survives iff it carries a non-empty, non-zero `return_id`
/// (number or string accepted) and a non-empty `return_sn`.
pub fn filter_records(raw: &[Value]) -> FilterOutcome {
    let mut outcome = FilterOutcome::default();

    for record in raw {
        match canonicalize(record) {
            Some(rec) => outcome.records.push(rec),
            None => outcome.dropped += 1,
        }
    }

    outcome
}

fn canonicalize(record: &Value) -> Option<ReturnRecord> {
    let id = match record.get("return_id")? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    if id.is_empty() || id == "0" {
        return None;
    }

    let key = record.get("return_sn")?.as_str()?.trim().to_string();
    if key.is_empty() {
        return None;
    }

    Some(ReturnRecord { id, key })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keeps_only_id_and_key() {
        let raw = vec![json!({
            "return_id": 900100,
            "return_sn": "SN001",
            "status": "PROCESSING",
            "buyer": "someone"
        })];
        let outcome = filter_records(&raw);
        assert_eq!(outcome.dropped, 0);
        assert_eq!(
            outcome.records,
            vec![ReturnRecord {
                id: "900100".into(),
                key: "SN001".into()
            }]
        );
    }

    #[test]
    fn accepts_string_ids() {
        let raw = vec![json!({"return_id": "900200", "return_sn": "SN002"})];
        let outcome = filter_records(&raw);
        assert_eq!(outcome.records[0].id, "900200");
    }

    #[test]
    fn drops_invalid_records() {
        let raw = vec![
            json!({"return_id": 1, "return_sn": "SN001"}),
            json!({"return_id": 0, "return_sn": "SN002"}),       // zero id
            json!({"return_id": "", "return_sn": "SN003"}),      // empty id
            json!({"return_id": 4, "return_sn": ""}),            // empty key
            json!({"return_id": 5}),                              // missing key
            json!({"return_sn": "SN006"}),                        // missing id
            json!({"return_id": 7, "return_sn": "SN007"}),
        ];
        let outcome = filter_records(&raw);
        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.dropped, 5);
        // Dropped-count arithmetic holds
        assert_eq!(raw.len() - outcome.records.len(), outcome.dropped);
    }

    #[test]
    fn preserves_input_order() {
        let raw: Vec<Value> = (1..=4)
            .map(|i| json!({"return_id": i, "return_sn": format!("SN{i:03}")}))
            .collect();
        let outcome = filter_records(&raw);
        let keys: Vec<&str> = outcome.records.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["SN001", "SN002", "SN003", "SN004"]);
    }

    #[test]
    fn trims_whitespace() {
        let raw = vec![json!({"return_id": "  900300 ", "return_sn": " SN009 "})];
        let outcome = filter_records(&raw);
        assert_eq!(outcome.records[0].id, "900300");
        assert_eq!(outcome.records[0].key, "SN009");
    }
}
