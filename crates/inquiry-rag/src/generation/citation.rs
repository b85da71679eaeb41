//! Citation marker handling

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

/// `[1]`, `[1, 2]`, `[1，2]`, `[1-3]`, `【1】`
static NUMERIC_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s?(?:\[|【)\s*\d+(?:\s*[,，、\-–]\s*\d+)*\s*(?:\]|】)").expect("Invalid regex")
});

/// `[Source: filename, Page 3]` style markers
static SOURCE_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s?\[(?:Source|来源)\s*[:：][^\]]*\]").expect("Invalid regex"));

static SPACE_BEFORE_PUNCT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[ \t]+([.,;:!?。，；：！？])").expect("Invalid regex"));

/// Remove citation markers, tidying the whitespace they leave behind
pub fn strip_citation_markers(text: &str) -> String {
    let without_numeric = NUMERIC_MARKER.replace_all(text, "");
    let without_source = SOURCE_MARKER.replace_all(&without_numeric, "");
    SPACE_BEFORE_PUNCT
        .replace_all(&without_source, "$1")
        .trim()
        .to_string()
}

/// 1-based passage numbers cited in `[n]` / `[n, m]` markers
pub fn cited_indices(text: &str) -> BTreeSet<usize> {
    NUMERIC_MARKER
        .find_iter(text)
        .flat_map(|m| {
            m.as_str()
                .split(|c: char| !c.is_ascii_digit())
                .filter_map(|n| n.parse::<usize>().ok())
                .collect::<Vec<_>>()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_numeric_markers() {
        assert_eq!(
            strip_citation_markers("Lists are mutable [1]. They hold mixed types [1, 2]."),
            "Lists are mutable. They hold mixed types."
        );
        assert_eq!(
            strip_citation_markers("列表是可变的[1，2]。"),
            "列表是可变的。"
        );
    }

    #[test]
    fn test_strip_source_markers() {
        assert_eq!(
            strip_citation_markers("Tuples are immutable [Source: notes.pdf, Page 3]."),
            "Tuples are immutable."
        );
    }

    #[test]
    fn test_plain_brackets_survive() {
        let text = "Index with xs[i] or [a, b] pairs.";
        assert_eq!(strip_citation_markers(text), text);
    }

    #[test]
    fn test_cited_indices() {
        let cited = cited_indices("A [1]. B [2, 3]. C [1].");
        assert_eq!(cited.into_iter().collect::<Vec<_>>(), vec![1, 2, 3]);
    }
}
