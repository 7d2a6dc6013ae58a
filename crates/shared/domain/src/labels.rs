//! Label filters as typed on the command line: `"team,ranking,env,prod"`.

use crate::error::DomainError;
use std::collections::BTreeMap;

/// Parses alternating keys and values separated by commas. Empty input is an empty filter.
///
/// # Errors
/// Returns [`DomainError::InvalidLabels`] for an odd number of items.
pub fn parse_labels(input: &str) -> Result<BTreeMap<String, String>, DomainError> {
    if input.trim().is_empty() {
        return Ok(BTreeMap::new());
    }

    let items: Vec<&str> = input.split(',').map(str::trim).collect();
    if items.len() % 2 != 0 {
        return Err(DomainError::InvalidLabels {
            message: "Uneven key-value label pairs were entered".into(),
        });
    }

    Ok(items.chunks_exact(2).map(|pair| (pair[0].to_owned(), pair[1].to_owned())).collect())
}

/// True when `labels` carries every pair of `filter`.
#[must_use]
pub fn matches_labels(labels: &BTreeMap<String, String>, filter: &BTreeMap<String, String>) -> bool {
    filter.iter().all(|(key, value)| labels.get(key) == Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pairs() {
        let labels = parse_labels("team, ranking ,env,prod").unwrap();
        assert_eq!(labels.len(), 2);
        assert_eq!(labels["team"], "ranking");
        assert_eq!(labels["env"], "prod");
        assert!(parse_labels("").unwrap().is_empty());
    }

    #[test]
    fn uneven_pairs_fail_with_message() {
        let err = parse_labels("team,ranking,env").unwrap_err();
        assert_eq!(err.to_string(), "Uneven key-value label pairs were entered");
    }

    #[test]
    fn filter_requires_every_pair() {
        let labels = parse_labels("team,ranking,env,prod").unwrap();
        assert!(matches_labels(&labels, &BTreeMap::new()));
        assert!(matches_labels(&labels, &parse_labels("env,prod").unwrap()));
        assert!(!matches_labels(&labels, &parse_labels("env,dev").unwrap()));
        assert!(!matches_labels(&labels, &parse_labels("env,prod,owner,me").unwrap()));
    }
}
