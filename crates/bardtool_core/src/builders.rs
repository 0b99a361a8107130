//! Constructors for the node and block shapes the CMS expects.

use serde::{Deserialize, Serialize};

use crate::bard::{BUTTON_TYPE, Block, LinkAttrs, Mark, Node, TextRun};
use crate::site::Site;
use crate::yaml::{Mapping, Value};

pub const EXTERNAL_REL: &str = "noopener noreferrer";
pub const EXTERNAL_TARGET: &str = "_blank";

/// Anchor text and the href it should point at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorLink {
    pub text: String,
    pub href: String,
}

impl Node {
    /// A text node carrying a link mark. Links leaving the site open in a new
    /// tab with `noopener noreferrer`; site links keep null rel and target.
    pub fn link(text: &str, href: &str, site: &Site) -> Self {
        let attrs = if site.is_external(href) {
            LinkAttrs::new(href, Some(EXTERNAL_REL), Some(EXTERNAL_TARGET), None)
        } else {
            LinkAttrs::new(href, None, None, None)
        };
        Self::Text(TextRun::with_marks(text, vec![Mark::Link(attrs)]))
    }
}

/// An `article_button` block. Label lines are joined with hard breaks and the
/// label paragraph is left aligned with no bold.
pub fn button_block(id: &str, label: &str, url: &str, new_tab: bool) -> Block {
    let mut content = Vec::new();
    for line in label.lines().map(str::trim) {
        if !content.is_empty() {
            content.push(Node::HardBreak);
        }
        if !line.is_empty() {
            content.push(Node::text(line));
        }
    }
    if content.last() == Some(&Node::HardBreak) {
        content.pop();
    }

    let mut align = Mapping::new();
    align.insert("textAlign", Value::plain("left"));
    let label_paragraph = Node::Paragraph {
        attrs: Some(align),
        content,
    };

    let mut fields = Mapping::new();
    fields.insert("id", Value::plain(id));
    fields.insert("version", Value::plain("article_button_1"));
    fields.insert("label", Value::seq(Vec::new()));
    fields.insert("url", Value::string(url));
    fields.insert("open_in_new_tab", Value::Bool(new_tab));
    fields.insert("type", Value::plain(BUTTON_TYPE));
    fields.insert("enabled", Value::Bool(true));
    let mut block = Block::from_fields(fields);
    block.nodes = vec![label_paragraph];
    block
}

/// Strips `1.` / `1)` numbering; numbered lists migrate as bullet lists.
pub fn strip_list_number(item: &str) -> &str {
    let item = item.trim();
    let digits = item.len() - item.trim_start_matches(|ch: char| ch.is_ascii_digit()).len();
    if digits == 0 {
        return item;
    }
    match item[digits..].strip_prefix(['.', ')']) {
        Some(rest) => rest.trim_start(),
        None => item,
    }
}

pub fn bullet_list<S: AsRef<str>>(items: &[S]) -> Node {
    let content = items
        .iter()
        .map(|item| Node::ListItem {
            content: vec![Node::paragraph(vec![Node::text(strip_list_number(
                item.as_ref(),
            ))])],
        })
        .collect();
    Node::BulletList { content }
}

/// A paragraph whose text is split around each anchor's first occurrence.
///
/// Anchors that do not occur, or that overlap an earlier anchor, stay plain
/// text. Whitespace-only pieces between links are dropped.
pub fn paragraph_with_links(text: &str, links: &[AnchorLink], site: &Site) -> Node {
    let mut matched = links
        .iter()
        .filter_map(|link| text.find(&link.text).map(|position| (position, link)))
        .collect::<Vec<_>>();
    matched.sort_by_key(|(position, _)| *position);

    let mut content = Vec::new();
    let mut cursor = 0;
    for (position, link) in matched {
        if position < cursor || link.text.is_empty() {
            continue;
        }
        let before = &text[cursor..position];
        if !before.trim().is_empty() {
            content.push(Node::text(before));
        }
        content.push(Node::link(&link.text, &link.href, site));
        cursor = position + link.text.len();
    }
    let rest = &text[cursor..];
    if !rest.trim().is_empty() {
        content.push(Node::text(rest));
    }
    Node::paragraph(content)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::bard::{BlockKind, flatten};

    #[test]
    fn external_links_open_in_new_tab() {
        let site = Site::default();
        let Node::Text(external) = Node::link("IRS", "https://irs.gov", &site) else {
            panic!("expected text");
        };
        let attrs = external.link().expect("link");
        assert_eq!(attrs.rel(), Some(EXTERNAL_REL));
        assert_eq!(attrs.target(), Some(EXTERNAL_TARGET));

        let Node::Text(internal) = Node::link("LLC", "/articles/llc", &site) else {
            panic!("expected text");
        };
        let attrs = internal.link().expect("link");
        assert_eq!((attrs.rel(), attrs.target()), (None, None));
    }

    #[test]
    fn button_label_lines_are_joined_with_breaks() {
        let block = button_block(
            "btn1",
            "Form Your LLC\n\nGet Started Today",
            "https://bizee.com/start",
            false,
        );
        assert_eq!(block.kind, BlockKind::Button);
        assert_eq!(flatten(&block.nodes), "Form Your LLC\n\nGet Started Today");
        let Node::Paragraph { attrs, content } = &block.nodes[0] else {
            panic!("expected paragraph");
        };
        assert_eq!(attrs.as_ref().and_then(|a| a.get_str("textAlign")), Some("left"));
        assert!(content.iter().all(|node| match node {
            Node::Text(run) => !run.is_bold(),
            _ => true,
        }));

        let value = block.to_value();
        let map = value.as_map().expect("map");
        assert_eq!(
            map.keys().collect::<Vec<_>>(),
            vec!["id", "version", "label", "url", "open_in_new_tab", "type", "enabled"]
        );
    }

    #[test]
    fn bullet_list_strips_numbering() {
        let list = bullet_list(&["1. First step", "2) Second step", "Third"]);
        let Node::BulletList { content } = &list else {
            panic!("expected list");
        };
        let items = content.iter().map(Node::plain_text).collect::<Vec<_>>();
        assert_eq!(items, vec!["First step", "Second step", "Third"]);
        assert_eq!(strip_list_number("2024 was good"), "2024 was good");
    }

    #[test]
    fn paragraph_with_links_splits_text() {
        let site = Site::default();
        let links = vec![
            AnchorLink {
                text: "EIN".to_string(),
                href: "https://irs.gov/ein".to_string(),
            },
            AnchorLink {
                text: "LLC".to_string(),
                href: "/articles/llc".to_string(),
            },
            AnchorLink {
                text: "missing".to_string(),
                href: "/x".to_string(),
            },
        ];
        let paragraph = paragraph_with_links("Form an LLC, then get an EIN.", &links, &site);
        let Node::Paragraph { content, .. } = &paragraph else {
            panic!("expected paragraph");
        };
        assert_eq!(content.len(), 5);
        assert_eq!(content[1], Node::link("LLC", "/articles/llc", &site));
        assert_eq!(paragraph.plain_text(), "Form an LLC, then get an EIN.");
    }
}
