//! Fuzzy version resolution
//!
//! A request such as `nx1003` resolves to the coarser configured key `nx10`
//! when no `nx1003` entry exists. An exact key always wins; otherwise exactly
//! one configured key may be a prefix of the request.

use super::ProjectKey;
use crate::errors::{BranchError, BranchResult};

/// Resolve `version` against `available` keys
pub fn resolve_version<'a, I>(project: ProjectKey, version: &str, available: I) -> BranchResult<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let available: Vec<&'a str> = available.into_iter().collect();

    if let Some(exact) = available.iter().copied().find(|key| *key == version) {
        return Ok(exact);
    }

    let mut matches: Vec<&'a str> = available
        .iter()
        .copied()
        .filter(|key| version.starts_with(*key))
        .collect();
    matches.sort_unstable();

    match matches.as_slice() {
        [] => {
            let mut available: Vec<String> = available.iter().map(|k| k.to_string()).collect();
            available.sort();
            Err(BranchError::NoMatch {
                project: project.to_string(),
                version: version.to_string(),
                available,
            })
        }
        [single] => Ok(*single),
        _ => Err(BranchError::Ambiguous {
            project: project.to_string(),
            version: version.to_string(),
            matches: matches.iter().map(|k| k.to_string()).collect(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve<'a>(version: &str, available: &[&'a str]) -> BranchResult<&'a str> {
        resolve_version(ProjectKey::Tmg, version, available.iter().copied())
    }

    #[test]
    fn test_exact_match_wins() {
        assert_eq!(resolve("nx10", &["nx10", "nx9", "nx1001"]).unwrap(), "nx10");
        assert_eq!(resolve("nx1001", &["nx10", "nx1001"]).unwrap(), "nx1001");
    }

    #[test]
    fn test_unique_prefix() {
        assert_eq!(resolve("nx1001", &["nx9", "nx10", "nx11"]).unwrap(), "nx10");
    }

    #[test]
    fn test_ambiguous_prefixes() {
        match resolve("nx901", &["nx9", "nx90", "nx10"]) {
            Err(BranchError::Ambiguous { matches, .. }) => {
                assert_eq!(matches, vec!["nx9".to_string(), "nx90".to_string()]);
            }
            other => panic!("expected ambiguity, got {other:?}"),
        }
    }

    #[test]
    fn test_no_match() {
        match resolve("nx10", &["nx9", "nx11"]) {
            Err(BranchError::NoMatch { available, .. }) => {
                assert_eq!(available, vec!["nx11".to_string(), "nx9".to_string()]);
            }
            other => panic!("expected no match, got {other:?}"),
        }
        assert!(resolve("nx10", &[]).is_err());
    }

    #[test]
    fn test_longer_key_is_not_a_prefix() {
        // "nx100" is longer than the request and cannot match it
        assert_eq!(resolve("nx10x", &["nx10", "nx100"]).unwrap(), "nx10");
    }
}
