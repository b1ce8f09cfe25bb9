//! Trigger-word aggregation
//!
//! Words are flattened in selection order, then entry order, then
//! within-entry order. Exact duplicates (case-sensitive) keep their first
//! occurrence. The optional cap applies to the combined list.

use std::collections::HashSet;

/// Flatten per-entry word groups into one de-duplicated list.
///
/// `cap` limits the total number of words kept after de-duplication;
/// `None` keeps everything.
pub fn aggregate_trigger_words<G, W>(groups: G, cap: Option<usize>) -> Vec<String>
where
    G: IntoIterator,
    G::Item: IntoIterator<Item = W>,
    W: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut words = Vec::new();

    for group in groups {
        for word in group {
            if cap.is_some_and(|max| words.len() >= max) {
                return words;
            }
            let word = word.as_ref();
            if seen.insert(word.to_string()) {
                words.push(word.to_string());
            }
        }
    }

    words
}

/// Join words with the given separator.
pub fn join_words<W: AsRef<str>>(words: &[W], separator: &str) -> String {
    words
        .iter()
        .map(|w| w.as_ref())
        .collect::<Vec<_>>()
        .join(separator)
}

/// Normalize a comma-separated prompt: trim every segment and drop empty ones.
pub fn clean_prompt(prompt: &str) -> String {
    prompt
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedupe_keeps_first_occurrence() {
        let groups = vec![vec!["anime girl", "kawaii"], vec!["kawaii", "pastel"]];
        let words = aggregate_trigger_words(groups, None);
        assert_eq!(words, vec!["anime girl", "kawaii", "pastel"]);
    }

    #[test]
    fn test_dedupe_is_case_sensitive() {
        let groups = vec![vec!["Kawaii"], vec!["kawaii"]];
        let words = aggregate_trigger_words(groups, None);
        assert_eq!(words, vec!["Kawaii", "kawaii"]);
    }

    #[test]
    fn test_cap_applies_to_combined_list() {
        let groups = vec![vec!["a", "b"], vec!["c", "d"], vec!["e"]];
        let words = aggregate_trigger_words(groups, Some(3));
        assert_eq!(words, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_cap_counts_unique_words_only() {
        let groups = vec![vec!["a", "a", "b"], vec!["b", "c", "d"]];
        let words = aggregate_trigger_words(groups, Some(3));
        assert_eq!(words, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_zero_cap() {
        let groups = vec![vec!["a"]];
        assert!(aggregate_trigger_words(groups, Some(0)).is_empty());
    }

    #[test]
    fn test_clean_prompt() {
        assert_eq!(clean_prompt(" a cat ,, , red hat,"), "a cat, red hat");
        assert_eq!(clean_prompt(""), "");
    }
}
