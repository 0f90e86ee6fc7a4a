//! Two-hop expansion of a one-hop synonym map.

use std::collections::HashSet;

use crate::synonym::map::SynonymMap;

/// Expand every entry of `one_hop` with its neighbors' neighbors.
///
/// For a phrase `P` with neighbors `N(P)` the result is
/// `N(P) ∪ N(q) for q in N(P)`, where `N(q)` is only followed when `q` is a
/// key of `one_hop`. Duplicates are removed. The phrase's own neighbors come
/// first; beyond that the order carries no ranking meaning. `P` itself may
/// appear in the result and is left in place.
///
/// This reads only `one_hop`, so expanding the same input twice gives the
/// same output.
pub fn expand_two_hop(one_hop: &SynonymMap) -> SynonymMap {
    one_hop
        .iter()
        .map(|(phrase, neighbors)| {
            let mut seen: HashSet<&str> = HashSet::new();
            let mut expanded = Vec::new();

            let second_hop = neighbors
                .iter()
                .filter_map(|neighbor| one_hop.get(neighbor))
                .flatten();
            for candidate in neighbors.iter().chain(second_hop) {
                if seen.insert(candidate.as_str()) {
                    expanded.push(candidate.clone());
                }
            }

            (phrase.clone(), expanded)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: &[(&str, &[&str])]) -> SynonymMap {
        entries
            .iter()
            .map(|(phrase, neighbors)| {
                (
                    phrase.to_string(),
                    neighbors.iter().map(|n| n.to_string()).collect(),
                )
            })
            .collect()
    }

    #[test]
    fn test_expands_through_known_neighbors() {
        let one_hop = map(&[
            ("a", &["b", "c"]),
            ("b", &["d", "a"]),
            ("c", &["e", "b"]),
            ("d", &["a"]),
        ]);

        let two_hop = expand_two_hop(&one_hop);

        assert_eq!(two_hop.get("a").unwrap(), ["b", "c", "d", "a", "e"]);
        assert_eq!(two_hop.get("d").unwrap(), ["a", "b", "c"]);
    }

    #[test]
    fn test_unknown_neighbors_are_not_followed() {
        let one_hop = map(&[("a", &["x", "b"]), ("b", &["y"])]);
        let two_hop = expand_two_hop(&one_hop);
        assert_eq!(two_hop.get("a").unwrap(), ["x", "b", "y"]);
        assert_eq!(two_hop.get("b").unwrap(), ["y"]);
    }

    #[test]
    fn test_one_hop_is_subset() {
        let one_hop = map(&[
            ("a", &["b", "c"]),
            ("b", &["c", "a"]),
            ("c", &["a", "b"]),
        ]);
        let two_hop = expand_two_hop(&one_hop);

        for (phrase, neighbors) in one_hop.iter() {
            let expanded = two_hop.get(phrase).unwrap();
            assert!(neighbors.iter().all(|n| expanded.contains(n)));
            assert_eq!(&expanded[..neighbors.len()], neighbors.as_slice());
        }
    }

    #[test]
    fn test_no_duplicates_and_deterministic() {
        let one_hop = map(&[("a", &["b", "b", "c"]), ("b", &["c"]), ("c", &["b"])]);
        let first = expand_two_hop(&one_hop);
        let second = expand_two_hop(&one_hop);

        assert_eq!(first, second);
        assert_eq!(first.get("a").unwrap(), ["b", "c"]);
    }

    #[test]
    fn test_empty_map() {
        assert!(expand_two_hop(&SynonymMap::new()).is_empty());
    }
}
