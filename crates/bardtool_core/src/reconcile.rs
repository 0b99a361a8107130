use serde::Serialize;

use crate::bard::{Block, Node, is_separator, separator};
use crate::document::Document;
use crate::error::MigrationError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub blocks_before: usize,
    pub blocks_after: usize,
    pub merged: usize,
    pub separators_changed: usize,
}

/// Merges every run of adjacent rich-text blocks into its first block.
///
/// One separator goes at each seam unless either side already is one. Other
/// blocks pass through and end the current run.
pub fn reconcile(blocks: Vec<Block>) -> Vec<Block> {
    let mut out: Vec<Block> = Vec::with_capacity(blocks.len());
    for block in blocks {
        let Some(current) = out.last_mut().filter(|last| last.is_rich_text()) else {
            out.push(block);
            continue;
        };
        if !block.is_rich_text() {
            out.push(block);
            continue;
        }
        log::debug!(
            "merging rich_text block {:?} into {:?}",
            block.id().unwrap_or_default(),
            current.id().unwrap_or_default()
        );
        let needs_seam = match (current.nodes.last(), block.nodes.first()) {
            (Some(tail), Some(head)) => !is_separator(tail) && !is_separator(head),
            _ => false,
        };
        if needs_seam {
            current.nodes.push(separator());
        }
        current.nodes.extend(block.nodes);
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Element {
    Paragraph,
    Heading,
    List,
}

fn element_of(node: &Node) -> Option<Element> {
    match node {
        _ if is_separator(node) => None,
        Node::Paragraph { .. } => Some(Element::Paragraph),
        Node::Heading { .. } => Some(Element::Heading),
        Node::BulletList { .. } | Node::OrderedList { .. } => Some(Element::List),
        _ => None,
    }
}

/// Collapses separator runs to one and puts exactly one separator where a
/// paragraph, heading or list meets an element of another kind.
pub fn normalize_separators(nodes: Vec<Node>) -> Vec<Node> {
    normalize_counted(nodes).0
}

/// Normalized nodes plus the number of separators dropped or inserted.
fn normalize_counted(nodes: Vec<Node>) -> (Vec<Node>, usize) {
    let mut out: Vec<Node> = Vec::with_capacity(nodes.len());
    let mut changes = 0;
    for node in nodes {
        let previous = out.last();
        if is_separator(&node) {
            if previous.is_some_and(is_separator) {
                changes += 1;
                continue;
            }
        } else if let (Some(before), Some(current)) =
            (previous.and_then(element_of), element_of(&node))
            && before != current
        {
            out.push(separator());
            changes += 1;
        }
        out.push(node);
    }
    (out, changes)
}

/// Reconciles `main_blocks` and normalizes separators in every rich-text block.
pub fn reconcile_document(document: &mut Document) -> Result<ReconcileReport, MigrationError> {
    let blocks = document.main_blocks()?;
    let blocks_before = blocks.len();
    let mut blocks = reconcile(blocks);
    let mut separators_changed = 0;
    for block in blocks.iter_mut().filter(|block| block.is_rich_text()) {
        let (nodes, changes) = normalize_counted(std::mem::take(&mut block.nodes));
        block.nodes = nodes;
        separators_changed += changes;
    }
    let report = ReconcileReport {
        blocks_before,
        blocks_after: blocks.len(),
        merged: blocks_before - blocks.len(),
        separators_changed,
    };
    if report.merged > 0 || report.separators_changed > 0 {
        document.set_main_blocks(&blocks);
    }
    Ok(report)
}
