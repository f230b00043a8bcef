//! Keyword list normalization
//!
//! Keyword-like lists (keywords, visual keywords, ingredients, allergens) are
//! unordered sets. Source data tolerates duplicates; everything written to the
//! store goes through [`normalize_keywords`] first.

use std::collections::HashSet;

/// Trim entries, drop blanks and remove case-insensitive duplicates.
///
/// The first spelling of a keyword wins and the original order is kept.
pub fn normalize_keywords<I, S>(keywords: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for keyword in keywords {
        let trimmed = keyword.as_ref().trim();
        if trimmed.is_empty() {
            continue;
        }
        if seen.insert(trimmed.to_lowercase()) {
            out.push(trimmed.to_string());
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_removes_case_insensitive_duplicates() {
        let out = normalize_keywords(["Coffee", "coffee", " COFFEE ", "ラテ", "ラテ"]);
        assert_eq!(out, vec!["Coffee".to_string(), "ラテ".to_string()]);
    }

    #[test]
    fn test_normalize_drops_blank_entries() {
        let out = normalize_keywords(["", "   ", "cake"]);
        assert_eq!(out, vec!["cake".to_string()]);
    }

    #[test]
    fn test_normalize_keeps_first_order() {
        let out = normalize_keywords(vec!["b", "a", "B", "c"]);
        assert_eq!(out, vec!["b", "a", "c"]);
    }
}
