//! Line-oriented pattern match counting.
//!
//! The query is lowercased once and compiled as a regular expression;
//! each document is split on `'\n'` and every lowercased line is tested
//! for an unanchored match. The result is the number of matching lines
//! summed over all documents — per line, never per occurrence.
//!
//! Deliberately unoptimized: every request re-scans the whole corpus in
//! O(total characters), with no index, no early termination and no
//! memoization. That linear re-scan is an accepted cost of the design.

use regex::Regex;

use crate::fetch::Document;

/// Compile a user-supplied query into the pattern the counter runs.
///
/// The query is lowercased first, so matching is case-insensitive. By
/// default it is interpreted verbatim as a regular expression — `a.b`
/// matches `axb` — and a malformed pattern (e.g. an unbalanced bracket)
/// is an error for the request, not something to sanitize away. With
/// `literal` set, the query is escaped and matches only as a substring.
pub fn compile_query(query: &str, literal: bool) -> Result<Regex, regex::Error> {
    let lowered = query.to_lowercase();
    let pattern = if literal {
        regex::escape(&lowered)
    } else {
        lowered
    };
    Regex::new(&pattern)
}

/// Count the lines across `documents` whose lowercase form contains a
/// match of `pattern`.
///
/// A document without a trailing newline still contributes its final
/// segment as a line; an empty document contributes nothing. Empty
/// lines never count, so an empty query yields exactly the number of
/// non-empty lines in the corpus.
pub fn count_matches(documents: &[Document], pattern: &Regex) -> u64 {
    let mut count = 0u64;
    for document in documents {
        for line in document.text.split('\n') {
            if line.is_empty() {
                continue;
            }
            let line = line.to_lowercase();
            if pattern.is_match(&line) {
                count += 1;
            }
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(key: &str, text: &str) -> Document {
        Document {
            key: key.to_string(),
            text: text.to_string(),
        }
    }

    fn count(texts: &[&str], query: &str) -> u64 {
        let documents: Vec<Document> = texts
            .iter()
            .enumerate()
            .map(|(i, text)| doc(&format!("doc{i}"), text))
            .collect();
        let pattern = compile_query(query, false).unwrap();
        count_matches(&documents, &pattern)
    }

    #[test]
    fn test_per_line_not_per_occurrence() {
        // "be" appears twice in the first line, but the line counts once.
        assert_eq!(count(&["to be or not to be", "love is a fire"], "be"), 1);
    }

    #[test]
    fn test_case_folding_on_both_sides() {
        assert_eq!(count(&["LOVE", "love is blind"], "love"), 2);
        assert_eq!(count(&["love is blind"], "LOVE"), 1);
    }

    #[test]
    fn test_metacharacter_is_a_pattern_not_a_literal() {
        assert_eq!(count(&["axb"], "a.b"), 1);
        assert_eq!(count(&["a.b"], "a.b"), 1);
        assert_eq!(count(&["ab"], "a.b"), 0);
    }

    #[test]
    fn test_literal_mode_escapes_metacharacters() {
        let documents = vec![doc("d", "axb\na.b")];
        let pattern = compile_query("a.b", true).unwrap();
        assert_eq!(count_matches(&documents, &pattern), 1);
    }

    #[test]
    fn test_empty_query_counts_non_empty_lines() {
        assert_eq!(count(&["one\n\ntwo\n", "three"], ""), 3);
    }

    #[test]
    fn test_no_trailing_newline_still_yields_last_line() {
        assert_eq!(count(&["first\nsecond love"], "love"), 1);
        assert_eq!(count(&["first love\nsecond love"], "love"), 2);
    }

    #[test]
    fn test_empty_document_yields_zero() {
        assert_eq!(count(&[""], "anything"), 0);
        assert_eq!(count(&[""], ""), 0);
    }

    #[test]
    fn test_counts_sum_across_documents() {
        assert_eq!(count(&["love\nhate", "love is love", "war"], "love"), 2);
    }

    #[test]
    fn test_unanchored_match_anywhere_in_line() {
        assert_eq!(count(&["a midsummer night's dream"], "night"), 1);
    }

    #[test]
    fn test_malformed_pattern_is_an_error() {
        assert!(compile_query("[unclosed", false).is_err());
        // The same query is fine once escaped.
        assert!(compile_query("[unclosed", true).is_ok());
    }
}
