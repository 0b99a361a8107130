use std::collections::BTreeSet;

/// Case-insensitive substring search starting at byte `start`; returns the
/// byte offset of the match in `text`.
pub fn index_of_ignore_case(text: &str, search: &str, start: usize) -> Option<usize> {
    if search.is_empty() {
        return Some(start);
    }
    find_ignore_case(text, search, start).map(|(begin, _)| begin)
}

/// Byte range in `text` of the first case-insensitive match of `search` at or
/// after `start`.
///
/// Both sides are folded with full Unicode lowercasing, so the range can be
/// longer or shorter than `search`. Each folded byte remembers the char it
/// came from, and the range always lands on char boundaries.
pub fn find_ignore_case(text: &str, search: &str, start: usize) -> Option<(usize, usize)> {
    let needle = search.to_lowercase();
    if needle.is_empty() {
        return None;
    }
    let haystack = text.get(start..)?;

    let mut folded = String::with_capacity(haystack.len());
    let mut origins = Vec::with_capacity(haystack.len());
    for (index, ch) in haystack.char_indices() {
        folded.extend(ch.to_lowercase());
        origins.resize(folded.len(), (start + index, ch.len_utf8()));
    }

    let found = folded.find(&needle)?;
    let (begin, _) = origins[found];
    let (last, last_len) = origins[found + needle.len() - 1];
    Some((begin, last + last_len))
}

pub fn contains_ignore_case(text: &str, search: &str) -> bool {
    index_of_ignore_case(text, search, 0).is_some()
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Lowercased words with punctuation stripped.
pub fn normalize_words(text: &str) -> Vec<String> {
    let cleaned = text
        .chars()
        .filter(|ch| ch.is_alphanumeric() || ch.is_whitespace())
        .collect::<String>()
        .to_lowercase();
    cleaned.split_whitespace().map(ToString::to_string).collect()
}

pub fn significant_words(text: &str, min_word_len: usize) -> BTreeSet<String> {
    normalize_words(text)
        .into_iter()
        .filter(|word| word.chars().count() >= min_word_len)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Overlap {
    pub shared: usize,
    pub smaller: usize,
}

impl Overlap {
    pub fn ratio(self) -> f64 {
        if self.smaller == 0 {
            0.0
        } else {
            self.shared as f64 / self.smaller as f64
        }
    }
}

/// Shared significant words over the smaller word count of the two texts.
pub fn word_overlap(left: &str, right: &str, min_word_len: usize) -> Overlap {
    let left = significant_words(left, min_word_len);
    let right = significant_words(right, min_word_len);
    Overlap {
        shared: left.intersection(&right).count(),
        smaller: left.len().min(right.len()),
    }
}

/// Byte ranges of whitespace-separated words.
pub fn word_spans(text: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut start = None;
    for (index, ch) in text.char_indices() {
        match (ch.is_whitespace(), start) {
            (true, Some(begin)) => {
                spans.push((begin, index));
                start = None;
            }
            (false, None) => start = Some(index),
            _ => {}
        }
    }
    if let Some(begin) = start {
        spans.push((begin, text.len()));
    }
    spans
}

/// Kebab-case slug from free text: lowercase ASCII letters, digits and dashes.
pub fn kebab_case(text: &str) -> String {
    let mut out = String::new();
    let mut pending_dash = false;
    for ch in text.to_lowercase().chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(ch);
        } else if ch.is_whitespace() || ch == '-' || ch == '_' {
            pending_dash = true;
        }
    }
    out
}

/// Truncates a kebab-case name to `max` bytes without leaving a partial word.
pub fn truncate_kebab(name: &str, max: usize) -> String {
    if name.len() <= max {
        return name.to_string();
    }
    let cut = &name[..max];
    match cut.rfind('-') {
        Some(index) if index > 0 => cut[..index].to_string(),
        _ => cut.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_of_ignore_case_finds_mixed_case() {
        assert_eq!(index_of_ignore_case("How to Start an LLC", "start an", 0), Some(7));
        assert_eq!(index_of_ignore_case("abc", "d", 0), None);
        assert_eq!(index_of_ignore_case("café Café", "café", 1), Some(6));
    }

    #[test]
    fn case_folding_covers_non_ascii_letters() {
        assert_eq!(index_of_ignore_case("Über ÉTATS-UNIS", "états-unis", 0), Some(6));
        assert_eq!(find_ignore_case("Über ÉTATS-UNIS", "états-unis", 0), Some((6, 17)));
        assert_eq!(find_ignore_case("STRASSE Ärger", "ärger", 0), Some((8, 14)));
        assert_eq!(find_ignore_case("abc", "abc", 5), None);
        assert!(contains_ignore_case("Gründung einer GMBH", "gmbh"));
    }

    #[test]
    fn overlap_ignores_short_words_and_punctuation() {
        let overlap = word_overlap("come up with a killer name", "killer name for it", 3);
        assert_eq!(overlap, Overlap { shared: 2, smaller: 3 });
        assert!(overlap.ratio() >= 0.6);

        let strict = word_overlap("come up with a killer name", "killer name for it", 1);
        assert!(strict.ratio() < 0.6);
        assert_eq!(normalize_words("Hello, World!"), vec!["hello", "world"]);
    }

    #[test]
    fn word_spans_cover_words() {
        assert_eq!(word_spans("  a bc  d"), vec![(2, 3), (4, 6), (8, 9)]);
    }

    #[test]
    fn kebab_case_and_truncation() {
        assert_eq!(kebab_case("Minor's Business: A Guide!"), "minors-business-a-guide");
        assert_eq!(kebab_case("  spaced__out  "), "spaced-out");
        assert_eq!(truncate_kebab("alpha-beta-gamma", 12), "alpha-beta");
        assert_eq!(truncate_kebab("short", 12), "short");
    }
}
