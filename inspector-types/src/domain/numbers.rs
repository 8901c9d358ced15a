//! The shared number list.

use std::collections::HashSet;

/// Trims entries, drops blanks and removes duplicates, keeping the first occurrence.
pub fn normalize_numbers<I, S>(numbers: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    numbers
        .into_iter()
        .map(|n| n.as_ref().trim().to_string())
        .filter(|n| !n.is_empty())
        .filter(|n| seen.insert(n.clone()))
        .collect()
}

/// Splits free text (one number per line, or comma separated) into a normalized list.
pub fn parse_number_text(text: &str) -> Vec<String> {
    normalize_numbers(text.split(['\n', '\r', ',']))
}

/// Appends `additions` to `current`, skipping numbers already present.
pub fn merge_numbers(current: &[String], additions: &[String]) -> Vec<String> {
    normalize_numbers(current.iter().chain(additions.iter()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_trims_and_dedupes() {
        let list = normalize_numbers(vec![" 123 ", "456", "", "123", "  "]);
        assert_eq!(list, vec!["123", "456"]);
    }

    #[test]
    fn test_parse_text_accepts_lines_and_commas() {
        let list = parse_number_text("111\r\n222, 333\n\n111");
        assert_eq!(list, vec!["111", "222", "333"]);
    }

    #[test]
    fn test_merge_keeps_existing_order() {
        let current = vec!["1".to_string(), "2".to_string()];
        let merged = merge_numbers(&current, &["3".to_string(), "1".to_string()]);
        assert_eq!(merged, vec!["1", "2", "3"]);
    }
}
