//! Candidate filtering.
//!
//! Applied last in the completion pipeline: prefix-match against the
//! in-progress fragment, drop flag literals already used on the line, and
//! deduplicate while preserving upstream order. Matching is an exact byte
//! prefix on purpose — fuzzy matching against a token that may be cut off
//! mid-word surfaces spurious hidden matches.

use std::collections::HashSet;

use crate::grammar::FLAG_MARKER;

/// Filter `candidates` by the trailing `partial` fragment and the set of
/// flags already present on the line. Order is preserved; duplicates are
/// removed; flag exclusion applies only to flag-literal candidates.
pub fn filter_candidates<I>(candidates: I, partial: &str, used_flags: &HashSet<String>) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::new();
    for candidate in candidates {
        if !partial.is_empty() && !candidate.starts_with(partial) {
            continue;
        }
        if candidate.starts_with(FLAG_MARKER) && used_flags.contains(&candidate) {
            continue;
        }
        if seen.insert(candidate.clone()) {
            out.push(candidate);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn empty_fragment_keeps_everything_in_order() {
        let out = filter_candidates(strings(&["b", "a", "c"]), "", &HashSet::new());
        assert_eq!(out, strings(&["b", "a", "c"]));
    }

    #[test]
    fn prefix_is_exact_bytes_not_fuzzy() {
        let out = filter_candidates(strings(&["sample", "schema", "sales"]), "sa", &HashSet::new());
        assert_eq!(out, strings(&["sample", "sales"]));
        // "sm" fuzzy-matches "sample" but must not pass a prefix filter.
        let out = filter_candidates(strings(&["sample"]), "sm", &HashSet::new());
        assert!(out.is_empty());
    }

    #[test]
    fn used_flags_are_dropped_but_values_are_not() {
        let used: HashSet<String> = ["--coll".to_string()].into_iter().collect();
        let out = filter_candidates(strings(&["--coll", "--name"]), "", &used);
        assert_eq!(out, strings(&["--name"]));
        // A dynamic value that happens to equal a used flag's text minus the
        // marker is unaffected; only flag literals are excluded.
        let out = filter_candidates(strings(&["coll", "acme"]), "", &used);
        assert_eq!(out, strings(&["coll", "acme"]));
    }

    #[test]
    fn duplicates_collapse_to_first_occurrence() {
        let out = filter_candidates(strings(&["a", "b", "a", "c", "b"]), "", &HashSet::new());
        assert_eq!(out, strings(&["a", "b", "c"]));
    }

    #[test]
    fn prefix_law_holds() {
        let out = filter_candidates(strings(&["alpha", "beta", "alps"]), "al", &HashSet::new());
        assert!(out.iter().all(|candidate| candidate.starts_with("al")));
    }
}
