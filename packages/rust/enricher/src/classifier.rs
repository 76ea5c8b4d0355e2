//! Warehouse classification from pickup addresses.
//!
//! A fixed rule table maps location-code substrings to warehouse labels.
//! Rules are consulted in table order and the first match wins.

/// Location-code substring → warehouse label, in match priority order.
const WAREHOUSE_RULES: &[(&str, &str)] = &[
    ("50121", "BI SMR"),
    ("61254", "BI SBY"),
    ("14460", "BI JKT"),
];

/// Label for addresses matching no known location code.
pub const WAREHOUSE_OTHER: &str = "other";

/// Label for missing or empty addresses.
pub const WAREHOUSE_UNKNOWN: &str = "unknown";

/// Map an address to its warehouse label.
pub fn classify(address: Option<&str>) -> &'static str {
    let address = match address {
        Some(a) if !a.trim().is_empty() => a,
        _ => return WAREHOUSE_UNKNOWN,
    };

    for (code, label) in WAREHOUSE_RULES {
        if address.contains(code) {
            return label;
        }
    }

    WAREHOUSE_OTHER
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_location_codes() {
        assert_eq!(classify(Some("Jl. Veteran 50121 Semarang")), "BI SMR");
        assert_eq!(classify(Some("Gudang 61254, Surabaya")), "BI SBY");
        assert_eq!(classify(Some("Blok C 14460 Jakarta Utara")), "BI JKT");
    }

    #[test]
    fn unmatched_address_is_other() {
        assert_eq!(classify(Some("Jl. Sudirman 99999 Bandung")), "other");
    }

    #[test]
    fn missing_or_empty_address_is_unknown() {
        assert_eq!(classify(None), "unknown");
        assert_eq!(classify(Some("")), "unknown");
        assert_eq!(classify(Some("   ")), "unknown");
    }

    #[test]
    fn first_match_wins() {
        // Address containing two codes resolves by table order.
        assert_eq!(classify(Some("50121 via 61254")), "BI SMR");
    }
}
