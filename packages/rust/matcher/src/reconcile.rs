//! Reconciliation of user keys against the crawl index.

use tracing::info;

use returnscope_crawler::CrawlIndex;
use returnscope_shared::{MatchOutcome, MatchedPair, Result, ReturnScopeError};

/// Join `keys` against the index's key → id lookup.
///
/// Partitions follow input key order. An empty index is a `NoData` error —
/// "crawl first" is distinct from a legitimate zero-overlap outcome on a
/// populated index.
pub fn match_keys(keys: &[String], index: &CrawlIndex) -> Result<MatchOutcome> {
    if index.is_empty() {
        return Err(ReturnScopeError::NoData(
            "crawl index is empty, run a crawl before matching".into(),
        ));
    }

    let mut matched = Vec::new();
    let mut unmatched = Vec::new();

    for key in keys {
        match index.id_for(key) {
            Some(id) => matched.push(MatchedPair {
                key: key.clone(),
                id: id.to_string(),
            }),
            None => unmatched.push(key.clone()),
        }
    }

    let match_rate_percent = rate_percent(matched.len(), keys.len());

    info!(
        total = keys.len(),
        matched = matched.len(),
        unmatched = unmatched.len(),
        rate = match_rate_percent,
        "reconciliation complete"
    );

    Ok(MatchOutcome {
        matched,
        unmatched,
        match_rate_percent,
    })
}

/// `matched / total * 100`, rounded to one decimal place.
fn rate_percent(matched: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (matched as f64 / total as f64 * 1000.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use returnscope_shared::ReturnRecord;

    fn index_with(pairs: &[(&str, &str)]) -> CrawlIndex {
        CrawlIndex::build(
            pairs
                .iter()
                .map(|(id, key)| ReturnRecord {
                    id: (*id).into(),
                    key: (*key).into(),
                })
                .collect(),
        )
    }

    fn keys(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn partitions_in_input_order() {
        let index = index_with(&[("1", "AAA"), ("2", "BBB"), ("3", "CCC")]);
        let outcome = match_keys(&keys(&["CCC", "XXX", "AAA", "YYY"]), &index).unwrap();

        let matched: Vec<&str> = outcome.matched.iter().map(|p| p.key.as_str()).collect();
        assert_eq!(matched, vec!["CCC", "AAA"]);
        assert_eq!(outcome.unmatched, vec!["XXX", "YYY"]);
        assert_eq!(outcome.matched[0].id, "3");
    }

    #[test]
    fn seven_of_ten_is_70_percent() {
        let pairs: Vec<(String, String)> = (0..7)
            .map(|i| (format!("{i}"), format!("KEY{i:02}")))
            .collect();
        let index = index_with(
            &pairs
                .iter()
                .map(|(a, b)| (a.as_str(), b.as_str()))
                .collect::<Vec<_>>(),
        );

        let mut input: Vec<String> = (0..7).map(|i| format!("KEY{i:02}")).collect();
        input.extend((0..3).map(|i| format!("MISS{i}")));

        let outcome = match_keys(&input, &index).unwrap();
        assert_eq!(outcome.matched.len(), 7);
        assert_eq!(outcome.unmatched.len(), 3);
        assert_eq!(outcome.match_rate_percent, 70.0);
    }

    #[test]
    fn rate_rounds_to_one_decimal() {
        // 1/3 → 33.333… → 33.3; 2/3 → 66.666… → 66.7
        assert_eq!(rate_percent(1, 3), 33.3);
        assert_eq!(rate_percent(2, 3), 66.7);
        assert_eq!(rate_percent(0, 5), 0.0);
        assert_eq!(rate_percent(5, 5), 100.0);
    }

    #[test]
    fn empty_index_is_no_data() {
        let err = match_keys(&keys(&["AAA"]), &CrawlIndex::default()).unwrap_err();
        assert!(matches!(err, ReturnScopeError::NoData(_)));
    }

    #[test]
    fn zero_overlap_on_populated_index_is_not_an_error() {
        let index = index_with(&[("1", "AAA")]);
        let outcome = match_keys(&keys(&["ZZZ"]), &index).unwrap();
        assert!(outcome.matched.is_empty());
        assert_eq!(outcome.match_rate_percent, 0.0);
    }
}
