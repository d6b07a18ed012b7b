//! Resource quantity equality.
//!
//! The API server may hand back `1000m` where a manifest said `1`, so a
//! textual comparison of requests/limits would report changes that never
//! happened. Quantities are compared by value instead.

use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use std::collections::BTreeMap;

/// Suffix scale: either multiply or divide by the factor.
///
/// Sub-unit suffixes divide by an exact power of ten so that `100m` lands
/// on the same `f64` as `0.1`.
enum Scale {
    Mul(f64),
    Div(f64),
}

const SUFFIXES: &[(&str, Scale)] = &[
    ("Ki", Scale::Mul(1024.0)),
    ("Mi", Scale::Mul(1_048_576.0)),
    ("Gi", Scale::Mul(1_073_741_824.0)),
    ("Ti", Scale::Mul(1_099_511_627_776.0)),
    ("Pi", Scale::Mul(1_125_899_906_842_624.0)),
    ("Ei", Scale::Mul(1_152_921_504_606_846_976.0)),
    ("n", Scale::Div(1e9)),
    ("u", Scale::Div(1e6)),
    ("m", Scale::Div(1e3)),
    ("k", Scale::Mul(1e3)),
    ("M", Scale::Mul(1e6)),
    ("G", Scale::Mul(1e9)),
    ("T", Scale::Mul(1e12)),
    ("P", Scale::Mul(1e15)),
    ("E", Scale::Mul(1e18)),
];

/// Parses a Kubernetes quantity string (`500m`, `1.5Gi`, `2e3`) into a number.
///
/// Returns `None` for strings that are not valid quantities.
pub fn parse_quantity(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    // Plain decimals and exponent notation (`1e3`, `1E3`) parse directly.
    if let Ok(value) = raw.parse::<f64>() {
        return value.is_finite().then_some(value);
    }

    for (suffix, scale) in SUFFIXES {
        if let Some(number) = raw.strip_suffix(suffix) {
            if let Ok(value) = number.parse::<f64>() {
                if !value.is_finite() {
                    return None;
                }
                return Some(match scale {
                    Scale::Mul(factor) => value * factor,
                    Scale::Div(factor) => value / factor,
                });
            }
        }
    }

    None
}

/// Compares two optional quantities by value.
///
/// Unparseable quantities fall back to string equality.
pub fn quantities_equal(a: Option<&Quantity>, b: Option<&Quantity>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => match (parse_quantity(&a.0), parse_quantity(&b.0)) {
            (Some(x), Some(y)) => {
                let tolerance = 1e-12 * x.abs().max(y.abs()).max(1.0);
                (x - y).abs() <= tolerance
            }
            _ => a.0 == b.0,
        },
        _ => false,
    }
}

/// Compares the named entries (e.g. `cpu`, `memory`) of two resource lists.
pub fn resource_lists_equal(
    a: Option<&BTreeMap<String, Quantity>>,
    b: Option<&BTreeMap<String, Quantity>>,
    names: &[&str],
) -> bool {
    names.iter().all(|name| {
        quantities_equal(
            a.and_then(|list| list.get(*name)),
            b.and_then(|list| list.get(*name)),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(s: &str) -> Quantity {
        Quantity(s.to_string())
    }

    #[test]
    fn test_parse_quantity_suffixes() {
        assert_eq!(parse_quantity("1"), Some(1.0));
        assert_eq!(parse_quantity("500m"), Some(0.5));
        assert_eq!(parse_quantity("1Ki"), Some(1024.0));
        assert_eq!(parse_quantity("128Mi"), Some(134_217_728.0));
        assert_eq!(parse_quantity("2k"), Some(2000.0));
        assert_eq!(parse_quantity("1e3"), Some(1000.0));
        assert_eq!(parse_quantity("1E"), Some(1e18));
        assert_eq!(parse_quantity("lots"), None);
        assert_eq!(parse_quantity(""), None);
    }

    #[test]
    fn test_equivalent_quantities_are_equal() {
        assert!(quantities_equal(Some(&q("1000m")), Some(&q("1"))));
        assert!(quantities_equal(Some(&q("100m")), Some(&q("0.1"))));
        assert!(quantities_equal(Some(&q("1Gi")), Some(&q("1024Mi"))));
        assert!(!quantities_equal(Some(&q("250m")), Some(&q("500m"))));
        assert!(!quantities_equal(Some(&q("1")), None));
        assert!(quantities_equal(None, None));
    }

    #[test]
    fn test_resource_lists_compare_named_entries_only() {
        let a = BTreeMap::from([
            ("cpu".to_string(), q("1")),
            ("memory".to_string(), q("1Gi")),
            ("ephemeral-storage".to_string(), q("1Gi")),
        ]);
        let b = BTreeMap::from([
            ("cpu".to_string(), q("1000m")),
            ("memory".to_string(), q("1024Mi")),
            ("ephemeral-storage".to_string(), q("2Gi")),
        ]);
        assert!(resource_lists_equal(Some(&a), Some(&b), &["cpu", "memory"]));
        assert!(!resource_lists_equal(Some(&a), Some(&b), &["ephemeral-storage"]));
    }
}
