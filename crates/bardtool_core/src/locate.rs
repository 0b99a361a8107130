//! Finds where a piece of anchor text lives inside rich-text blocks.

use serde::Serialize;

use crate::bard::{Block, TextRun, text_runs};
use crate::document::Document;
use crate::error::MigrationError;
use crate::text::{find_ignore_case, significant_words, word_overlap, word_spans};

pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.6;
pub const DEFAULT_MIN_WORD_LEN: usize = 3;

/// Extra words a fuzzy window may have beyond the target's word count.
const WINDOW_SLACK: usize = 2;

#[derive(Debug, Clone, PartialEq)]
pub struct MatchOptions {
    pub fuzzy: bool,
    pub fuzzy_threshold: f64,
    /// Words shorter than this are ignored by the fuzzy matcher.
    pub min_word_len: usize,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            fuzzy: true,
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
            min_word_len: DEFAULT_MIN_WORD_LEN,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MatchKind {
    Exact,
    Fuzzy { score: f64 },
}

/// A run of text inside one text node.
///
/// `path` indexes from the block's node list down to the text node;
/// `offset` and `len` are byte positions inside that node's text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Span {
    pub block: usize,
    pub path: Vec<usize>,
    pub offset: usize,
    pub len: usize,
    pub matched: String,
    pub kind: MatchKind,
}

pub fn locate(
    document: &Document,
    target: &str,
    options: &MatchOptions,
) -> Result<Option<Span>, MigrationError> {
    let blocks = document.main_blocks()?;
    Ok(locate_in_blocks(&blocks, target, options))
}

/// Exact (case-insensitive) match first, in document order; then the best
/// fuzzy candidate when enabled. Linked text is never proposed.
///
/// A match never spans two text nodes: a phrase split by a mark change
/// (a bold word inside it, say) is not found exactly, and each node is scored
/// on its own by the fuzzy pass.
///
/// Fuzzy candidates are word windows that start and end on a word the target
/// shares; the highest overlap wins and ties keep the earliest window.
pub fn locate_in_blocks(blocks: &[Block], target: &str, options: &MatchOptions) -> Option<Span> {
    let target = target.trim();
    if target.is_empty() {
        return None;
    }
    if let Some(span) = locate_exact(blocks, target) {
        return Some(span);
    }
    if options.fuzzy {
        return locate_fuzzy(blocks, target, options);
    }
    None
}

fn unlinked_runs(blocks: &[Block]) -> impl Iterator<Item = (usize, Vec<usize>, &TextRun)> {
    blocks
        .iter()
        .enumerate()
        .filter(|(_, block)| block.is_rich_text())
        .flat_map(|(index, block)| {
            text_runs(&block.nodes)
                .into_iter()
                .map(move |(path, run)| (index, path, run))
        })
        .filter(|(_, _, run)| !run.is_linked())
}

fn locate_exact(blocks: &[Block], target: &str) -> Option<Span> {
    for (block, path, run) in unlinked_runs(blocks) {
        if let Some((offset, end)) = find_ignore_case(&run.text, target, 0) {
            return Some(Span {
                block,
                path,
                offset,
                len: end - offset,
                matched: run.text[offset..end].to_string(),
                kind: MatchKind::Exact,
            });
        }
    }
    None
}

fn locate_fuzzy(blocks: &[Block], target: &str, options: &MatchOptions) -> Option<Span> {
    let target_words = significant_words(target, options.min_word_len);
    if target_words.is_empty() {
        return None;
    }
    let required_shared = target_words.len().min(2);
    let max_window = target.split_whitespace().count() + WINDOW_SLACK;

    let mut best: Option<(f64, Span)> = None;
    for (block, path, run) in unlinked_runs(blocks) {
        let words = word_spans(&run.text);
        let shared = words
            .iter()
            .map(|(start, end)| {
                !significant_words(&run.text[*start..*end], options.min_word_len)
                    .is_disjoint(&target_words)
            })
            .collect::<Vec<_>>();
        for first in 0..words.len() {
            if !shared[first] {
                continue;
            }
            for last in first..words.len().min(first + max_window) {
                if !shared[last] {
                    continue;
                }
                let Some((start, end)) = trim_punctuation(&run.text, words[first].0, words[last].1)
                else {
                    continue;
                };
                let candidate = &run.text[start..end];
                let overlap = word_overlap(target, candidate, options.min_word_len);
                if overlap.shared < required_shared {
                    continue;
                }
                let score = overlap.ratio();
                if score < options.fuzzy_threshold {
                    continue;
                }
                if best.as_ref().is_some_and(|(current, _)| score <= *current) {
                    continue;
                }
                best = Some((
                    score,
                    Span {
                        block,
                        path: path.clone(),
                        offset: start,
                        len: end - start,
                        matched: candidate.to_string(),
                        kind: MatchKind::Fuzzy { score },
                    },
                ));
            }
        }
    }
    if let Some((score, span)) = &best {
        log::debug!("fuzzy match {:?} for {:?} (score {score:.2})", span.matched, target);
    }
    best.map(|(_, span)| span)
}

fn trim_punctuation(text: &str, start: usize, end: usize) -> Option<(usize, usize)> {
    let slice = &text[start..end];
    let trimmed_start = slice.trim_start_matches(|ch: char| !ch.is_alphanumeric());
    let start = start + (slice.len() - trimmed_start.len());
    let trimmed = trimmed_start.trim_end_matches(|ch: char| !ch.is_alphanumeric());
    if trimmed.is_empty() {
        return None;
    }
    Some((start, start + trimmed.len()))
}
