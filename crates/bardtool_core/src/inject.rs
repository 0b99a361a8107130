//! Splices new nodes into a located text run.

use crate::bard::{Block, Node, TextRun};
use crate::document::Document;
use crate::error::MigrationError;
use crate::locate::Span;

pub fn inject(
    document: &Document,
    span: &Span,
    new_nodes: Vec<Node>,
) -> Result<Document, MigrationError> {
    let mut blocks = document.main_blocks()?;
    inject_blocks(&mut blocks, span, new_nodes)?;
    let mut updated = document.clone();
    updated.set_main_blocks(&blocks);
    Ok(updated)
}

/// Replaces the span's text with `prefix, new_nodes..., suffix` inside the
/// containing text node's parent.
///
/// Prefix and suffix keep the run's marks except bold (injected links are
/// never bold) and are dropped when they are whitespace only. Siblings and
/// other blocks are untouched. A span that no longer matches the tree fails
/// with `StaleSpan` and leaves `blocks` unchanged.
pub fn inject_blocks(
    blocks: &mut [Block],
    span: &Span,
    new_nodes: Vec<Node>,
) -> Result<(), MigrationError> {
    let stale = |reason: &str| MigrationError::StaleSpan(format!("{:?}: {reason}", span.matched));

    let block = blocks
        .get_mut(span.block)
        .ok_or_else(|| stale("block index out of range"))?;
    if !block.is_rich_text() {
        return Err(stale("block is not rich text"));
    }
    let Some((last, parents)) = span.path.split_last() else {
        return Err(stale("empty node path"));
    };

    let mut siblings = &mut block.nodes;
    for index in parents {
        siblings = siblings
            .get_mut(*index)
            .and_then(Node::children_mut)
            .ok_or_else(|| stale("node path does not resolve"))?;
    }
    let Some(Node::Text(run)) = siblings.get(*last) else {
        return Err(stale("node path does not end at a text node"));
    };
    if run.is_linked() {
        return Err(stale("text is already linked"));
    }
    let end = span.offset + span.len;
    let current = run
        .text
        .get(span.offset..end)
        .ok_or_else(|| stale("offset outside text"))?;
    if !current.eq_ignore_ascii_case(&span.matched) {
        return Err(stale("text changed since it was located"));
    }

    let replacement = split_run(run, span.offset, end, new_nodes);
    siblings.splice(*last..=*last, replacement);
    Ok(())
}

fn split_run(run: &TextRun, start: usize, end: usize, new_nodes: Vec<Node>) -> Vec<Node> {
    let piece = |text: &str| {
        let mut part = run.derive(text);
        part.remove_bold();
        Node::Text(part)
    };

    let mut out = Vec::with_capacity(new_nodes.len() + 2);
    let prefix = &run.text[..start];
    if !prefix.trim().is_empty() {
        out.push(piece(prefix));
    }
    out.extend(new_nodes.into_iter().map(|node| match node {
        Node::Text(mut inserted) => {
            inserted.remove_bold();
            Node::Text(inserted)
        }
        other => other,
    }));
    let suffix = &run.text[end..];
    if !suffix.trim().is_empty() {
        out.push(piece(suffix));
    }
    out
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::bard::{LinkAttrs, Mark, flatten};
    use crate::locate::{MatchKind, MatchOptions, locate_in_blocks};

    fn link(text: &str, href: &str) -> Node {
        Node::Text(TextRun::with_marks(
            text,
            vec![Mark::Link(LinkAttrs::new(href, None, None, None))],
        ))
    }

    fn blocks_with(nodes: Vec<Node>) -> Vec<Block> {
        vec![
            Block::rich_text("a", nodes),
            Block::rich_text("b", vec![Node::paragraph(vec![Node::text("untouched")])]),
        ]
    }

    #[test]
    fn link_is_spliced_between_prefix_and_suffix() {
        let mut blocks = blocks_with(vec![Node::paragraph(vec![
            Node::text("Intro. "),
            Node::text("Learn to start an online business today."),
            Node::HardBreak,
        ])]);
        let other_before = blocks[1].clone();
        let before = flatten(&blocks[0].nodes);
        let span = locate_in_blocks(&blocks, "start an online business", &MatchOptions::default())
            .expect("span");
        inject_blocks(
            &mut blocks,
            &span,
            vec![link("start an online business", "/articles/online")],
        )
        .expect("inject");

        let Node::Paragraph { content, .. } = &blocks[0].nodes[0] else {
            panic!("expected paragraph");
        };
        assert_eq!(
            content,
            &vec![
                Node::text("Intro. "),
                Node::text("Learn to "),
                link("start an online business", "/articles/online"),
                Node::text(" today."),
                Node::HardBreak,
            ]
        );
        assert_eq!(flatten(&blocks[0].nodes), before);
        assert_eq!(blocks[1], other_before);
    }

    #[test]
    fn whole_run_match_leaves_no_empty_pieces() {
        let mut blocks = blocks_with(vec![Node::paragraph(vec![Node::text("Form an LLC")])]);
        let span = locate_in_blocks(&blocks, "form an llc", &MatchOptions::default()).expect("span");
        inject_blocks(&mut blocks, &span, vec![link(&span.matched, "/llc")]).expect("inject");
        assert_eq!(
            blocks[0].nodes,
            vec![Node::paragraph(vec![link("Form an LLC", "/llc")])]
        );
    }

    #[test]
    fn bold_is_dropped_from_split_pieces() {
        let bold = Node::Text(TextRun::with_marks("Read our LLC guide", vec![Mark::Bold]));
        let mut blocks = blocks_with(vec![Node::paragraph(vec![bold])]);
        let span = locate_in_blocks(&blocks, "LLC guide", &MatchOptions::default()).expect("span");
        let mut inserted = TextRun::with_marks("LLC guide", vec![Mark::Bold]);
        inserted
            .marks
            .push(Mark::Link(LinkAttrs::new("/llc", None, None, None)));
        inject_blocks(&mut blocks, &span, vec![Node::Text(inserted)]).expect("inject");
        assert_eq!(
            blocks[0].nodes,
            vec![Node::paragraph(vec![
                Node::text("Read our "),
                link("LLC guide", "/llc"),
            ])]
        );
    }

    #[test]
    fn whitespace_only_prefix_is_omitted() {
        let mut blocks = blocks_with(vec![Node::paragraph(vec![Node::text(" LLC")])]);
        let span = locate_in_blocks(&blocks, "LLC", &MatchOptions::default()).expect("span");
        inject_blocks(&mut blocks, &span, vec![link("LLC", "/llc")]).expect("inject");
        assert_eq!(blocks[0].nodes, vec![Node::paragraph(vec![link("LLC", "/llc")])]);
    }

    #[test]
    fn stale_span_is_rejected_without_changes() {
        let mut blocks = blocks_with(vec![Node::paragraph(vec![Node::text("Form an LLC")])]);
        let original = blocks.clone();
        let span = Span {
            block: 0,
            path: vec![0, 0],
            offset: 0,
            len: 4,
            matched: "Open".to_string(),
            kind: MatchKind::Exact,
        };
        let err = inject_blocks(&mut blocks, &span, vec![link("Open", "/x")]).expect_err("stale");
        assert!(matches!(err, MigrationError::StaleSpan(_)));
        assert_eq!(blocks, original);

        let bad_path = Span {
            path: vec![3],
            ..span
        };
        assert!(inject_blocks(&mut blocks, &bad_path, Vec::new()).is_err());
    }

    #[test]
    fn inject_on_document_rewrites_main_blocks() {
        let text = "---\nmain_blocks:\n  -\n    id: a\n    content:\n      -\n        type: paragraph\n        content:\n          -\n            type: text\n            text: 'Start an LLC today'\n    type: rich_text\n---\n";
        let document = Document::parse(text).expect("parse");
        let span = crate::locate::locate(&document, "an LLC", &MatchOptions::default())
            .expect("locate")
            .expect("span");
        let updated = inject(&document, &span, vec![link("an LLC", "/llc")]).expect("inject");
        let blocks = updated.main_blocks().expect("blocks");
        assert_eq!(flatten(&blocks[0].nodes), "Start an LLC today");
        assert!(updated.serialize().contains("href: '/llc'"));
    }
}
