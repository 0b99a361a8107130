//! Typed view over Bard (ProseMirror-style) block content.
//!
//! Nodes are decoded from front-matter values and encoded back with the same
//! key order and scalar quoting. A node is only given a typed variant when
//! re-encoding it reproduces the source value exactly; anything else is kept
//! as [`Node::Raw`] and passed through untouched.

use crate::error::MigrationError;
use crate::yaml::{Mapping, ScalarStyle, SeqStyle, Value};

pub const RICH_TEXT_TYPE: &str = "rich_text";
pub const IMAGE_TYPE: &str = "image";
pub const BUTTON_TYPE: &str = "article_button";

#[derive(Debug, Clone, PartialEq)]
pub enum Mark {
    Bold,
    Italic,
    Link(LinkAttrs),
    Raw(Value),
}

impl Mark {
    fn from_value(value: &Value) -> Self {
        let Some(map) = value.as_map() else {
            return Self::Raw(value.clone());
        };
        let keys = map.keys().collect::<Vec<_>>();
        match (map.get_str("type"), keys.as_slice()) {
            (Some("bold"), ["type"]) => Self::Bold,
            (Some("italic"), ["type"]) => Self::Italic,
            (Some("link"), ["type", "attrs"]) => match map.get("attrs").and_then(Value::as_map) {
                Some(attrs) if attrs.get_str("href").is_some() => Self::Link(LinkAttrs {
                    fields: attrs.clone(),
                }),
                _ => Self::Raw(value.clone()),
            },
            _ => Self::Raw(value.clone()),
        }
    }

    fn to_value(&self) -> Value {
        let tagged = |name: &str| {
            let mut map = Mapping::new();
            map.insert("type", Value::plain(name));
            map
        };
        match self {
            Self::Bold => Value::Map(tagged("bold")),
            Self::Italic => Value::Map(tagged("italic")),
            Self::Link(attrs) => {
                let mut map = tagged("link");
                map.insert("attrs", Value::Map(attrs.fields.clone()));
                Value::Map(map)
            }
            Self::Raw(value) => value.clone(),
        }
    }
}

/// Attributes of a `link` mark, kept in source order and quoting.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkAttrs {
    fields: Mapping,
}

impl LinkAttrs {
    pub fn new(href: &str, rel: Option<&str>, target: Option<&str>, title: Option<&str>) -> Self {
        let optional = |value: Option<&str>| value.map(Value::string).unwrap_or(Value::Null);
        let mut fields = Mapping::new();
        fields.insert("href", Value::string(href));
        fields.insert("rel", optional(rel));
        fields.insert("target", optional(target));
        fields.insert("title", optional(title));
        Self { fields }
    }

    pub fn href(&self) -> Option<&str> {
        self.fields.get_str("href")
    }

    pub fn set_href(&mut self, href: &str) {
        let value = match self.fields.get("href") {
            Some(Value::Str { style, .. }) => Value::styled(href, *style),
            _ => Value::string(href),
        };
        self.fields.insert("href", value);
    }

    pub fn rel(&self) -> Option<&str> {
        self.fields.get_str("rel")
    }

    pub fn target(&self) -> Option<&str> {
        self.fields.get_str("target")
    }
}

/// A `text` node: the only node that carries visible characters.
#[derive(Debug, Clone)]
pub struct TextRun {
    pub text: String,
    pub marks: Vec<Mark>,
    style: Option<ScalarStyle>,
}

// Quoting style is presentation only.
impl PartialEq for TextRun {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text && self.marks == other.marks
    }
}

impl TextRun {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            marks: Vec::new(),
            style: None,
        }
    }

    pub fn with_marks(text: impl Into<String>, marks: Vec<Mark>) -> Self {
        Self {
            text: text.into(),
            marks,
            style: None,
        }
    }

    /// A run with the same marks and quoting but different text.
    pub fn derive(&self, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            marks: self.marks.clone(),
            style: self.style,
        }
    }

    pub fn link(&self) -> Option<&LinkAttrs> {
        self.marks.iter().find_map(|mark| match mark {
            Mark::Link(attrs) => Some(attrs),
            _ => None,
        })
    }

    pub fn link_mut(&mut self) -> Option<&mut LinkAttrs> {
        self.marks.iter_mut().find_map(|mark| match mark {
            Mark::Link(attrs) => Some(attrs),
            _ => None,
        })
    }

    pub fn is_linked(&self) -> bool {
        self.link().is_some()
    }

    pub fn is_bold(&self) -> bool {
        self.marks.iter().any(|mark| *mark == Mark::Bold)
    }

    pub fn remove_link(&mut self) -> bool {
        let before = self.marks.len();
        self.marks.retain(|mark| !matches!(mark, Mark::Link(_)));
        self.marks.len() != before
    }

    pub fn remove_bold(&mut self) -> bool {
        let before = self.marks.len();
        self.marks.retain(|mark| *mark != Mark::Bold);
        self.marks.len() != before
    }

    fn text_value(&self) -> Value {
        match self.style {
            Some(style) => Value::styled(self.text.clone(), style),
            None => Value::string(self.text.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Text(TextRun),
    HardBreak,
    Paragraph {
        attrs: Option<Mapping>,
        content: Vec<Node>,
    },
    Heading {
        attrs: Option<Mapping>,
        content: Vec<Node>,
    },
    BulletList {
        content: Vec<Node>,
    },
    OrderedList {
        attrs: Option<Mapping>,
        content: Vec<Node>,
    },
    ListItem {
        content: Vec<Node>,
    },
    Raw(Value),
}

impl Node {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(TextRun::new(text))
    }

    pub fn paragraph(content: Vec<Node>) -> Self {
        Self::Paragraph {
            attrs: None,
            content,
        }
    }

    pub fn from_value(value: &Value) -> Self {
        match Self::decode(value) {
            Some(node) if node.to_value(seq_style_of(value)) == *value => node,
            _ => Self::Raw(value.clone()),
        }
    }

    fn decode(value: &Value) -> Option<Self> {
        let map = value.as_map()?;
        let node_type = map.get_str("type")?;
        let keys = map.keys().collect::<Vec<_>>();

        if node_type == "text" {
            if !matches!(keys.as_slice(), ["type", "text"] | ["type", "marks", "text"]) {
                return None;
            }
            let (text, style) = match map.get("text")? {
                Value::Str { value, style } => (value.clone(), *style),
                _ => return None,
            };
            let marks = match map.get("marks") {
                Some(Value::Seq(items, _)) if !items.is_empty() => {
                    items.iter().map(Mark::from_value).collect()
                }
                Some(_) => return None,
                None => Vec::new(),
            };
            return Some(Self::Text(TextRun {
                text,
                marks,
                style: Some(style),
            }));
        }

        if node_type == "hardBreak" {
            return (keys.as_slice() == ["type"]).then_some(Self::HardBreak);
        }

        let allowed = ["type", "attrs", "content"];
        let mut cursor = 0;
        for key in &keys {
            match allowed[cursor..].iter().position(|candidate| candidate == key) {
                Some(offset) => cursor += offset + 1,
                None => return None,
            }
        }
        let attrs = match map.get("attrs") {
            Some(Value::Map(attrs)) if !attrs.is_empty() => Some(attrs.clone()),
            Some(_) => return None,
            None => None,
        };
        let content = match map.get("content") {
            Some(Value::Seq(items, _)) if !items.is_empty() => {
                items.iter().map(Node::from_value).collect()
            }
            Some(_) => return None,
            None => Vec::new(),
        };

        match node_type {
            "paragraph" => Some(Self::Paragraph { attrs, content }),
            "heading" => Some(Self::Heading { attrs, content }),
            "orderedList" => Some(Self::OrderedList { attrs, content }),
            "bulletList" if attrs.is_none() => Some(Self::BulletList { content }),
            "listItem" if attrs.is_none() => Some(Self::ListItem { content }),
            _ => None,
        }
    }

    pub fn to_value(&self, style: SeqStyle) -> Value {
        let mut map = Mapping::new();
        let (node_type, attrs, content) = match self {
            Self::Text(run) => {
                map.insert("type", Value::plain("text"));
                if !run.marks.is_empty() {
                    let marks = run.marks.iter().map(Mark::to_value).collect();
                    map.insert("marks", Value::Seq(marks, style));
                }
                map.insert("text", run.text_value());
                return Value::Map(map);
            }
            Self::HardBreak => {
                map.insert("type", Value::plain("hardBreak"));
                return Value::Map(map);
            }
            Self::Raw(value) => return value.clone(),
            Self::Paragraph { attrs, content } => ("paragraph", attrs.as_ref(), content),
            Self::Heading { attrs, content } => ("heading", attrs.as_ref(), content),
            Self::OrderedList { attrs, content } => ("orderedList", attrs.as_ref(), content),
            Self::BulletList { content } => ("bulletList", None, content),
            Self::ListItem { content } => ("listItem", None, content),
        };
        map.insert("type", Value::plain(node_type));
        if let Some(attrs) = attrs {
            map.insert("attrs", Value::Map(attrs.clone()));
        }
        if !content.is_empty() {
            let items = content.iter().map(|node| node.to_value(style)).collect();
            map.insert("content", Value::Seq(items, style));
        }
        Value::Map(map)
    }

    pub fn children(&self) -> Option<&Vec<Node>> {
        match self {
            Self::Paragraph { content, .. }
            | Self::Heading { content, .. }
            | Self::BulletList { content }
            | Self::OrderedList { content, .. }
            | Self::ListItem { content } => Some(content),
            _ => None,
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<Node>> {
        match self {
            Self::Paragraph { content, .. }
            | Self::Heading { content, .. }
            | Self::BulletList { content }
            | Self::OrderedList { content, .. }
            | Self::ListItem { content } => Some(content),
            _ => None,
        }
    }

    /// Visible text: text runs verbatim, hard breaks as `\n`.
    pub fn plain_text(&self) -> String {
        match self {
            Self::Text(run) => run.text.clone(),
            Self::HardBreak => "\n".to_string(),
            Self::Raw(value) => raw_plain_text(value),
            other => other.children().map(|nodes| flatten(nodes)).unwrap_or_default(),
        }
    }

    pub fn type_name(&self) -> &str {
        match self {
            Self::Text(_) => "text",
            Self::HardBreak => "hardBreak",
            Self::Paragraph { .. } => "paragraph",
            Self::Heading { .. } => "heading",
            Self::BulletList { .. } => "bulletList",
            Self::OrderedList { .. } => "orderedList",
            Self::ListItem { .. } => "listItem",
            Self::Raw(value) => value
                .as_map()
                .and_then(|map| map.get_str("type"))
                .unwrap_or(""),
        }
    }
}

fn seq_style_of(value: &Value) -> SeqStyle {
    let Some(map) = value.as_map() else {
        return SeqStyle::Block;
    };
    for key in ["content", "marks"] {
        if let Some(Value::Seq(items, style)) = map.get(key)
            && !items.is_empty()
        {
            return *style;
        }
    }
    SeqStyle::Block
}

fn raw_plain_text(value: &Value) -> String {
    let Some(map) = value.as_map() else {
        return String::new();
    };
    if map.get_str("type") == Some("hardBreak") {
        return "\n".to_string();
    }
    let mut out = map.get_str("text").unwrap_or_default().to_string();
    if let Some(items) = map.get("content").and_then(Value::as_seq) {
        for item in items {
            out.push_str(&raw_plain_text(item));
        }
    }
    out
}

pub fn flatten(nodes: &[Node]) -> String {
    nodes.iter().map(Node::plain_text).collect()
}

/// The seam marker between merged or distinct sub-elements: an empty
/// paragraph holding a single hard break.
pub fn separator() -> Node {
    Node::paragraph(vec![Node::HardBreak])
}

pub fn is_separator(node: &Node) -> bool {
    match node {
        Node::HardBreak => true,
        Node::Paragraph { content, .. } => content.as_slice() == [Node::HardBreak],
        _ => false,
    }
}

/// Text runs in document order with their index path from the block root.
pub fn text_runs(nodes: &[Node]) -> Vec<(Vec<usize>, &TextRun)> {
    fn walk<'a>(nodes: &'a [Node], prefix: &mut Vec<usize>, out: &mut Vec<(Vec<usize>, &'a TextRun)>) {
        for (index, node) in nodes.iter().enumerate() {
            prefix.push(index);
            match node {
                Node::Text(run) => out.push((prefix.clone(), run)),
                other => {
                    if let Some(children) = other.children() {
                        walk(children, prefix, out);
                    }
                }
            }
            prefix.pop();
        }
    }
    let mut out = Vec::new();
    walk(nodes, &mut Vec::new(), &mut out);
    out
}

pub fn for_each_text_mut<F>(nodes: &mut [Node], visit: &mut F)
where
    F: FnMut(&mut TextRun),
{
    for node in nodes {
        match node {
            Node::Text(run) => visit(run),
            other => {
                if let Some(children) = other.children_mut() {
                    for_each_text_mut(children, visit);
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockKind {
    RichText,
    Image,
    Button,
    Other(String),
}

impl BlockKind {
    pub fn from_type(value: &str) -> Self {
        match value {
            RICH_TEXT_TYPE => Self::RichText,
            IMAGE_TYPE => Self::Image,
            BUTTON_TYPE => Self::Button,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::RichText => RICH_TEXT_TYPE,
            Self::Image => IMAGE_TYPE,
            Self::Button => BUTTON_TYPE,
            Self::Other(value) => value,
        }
    }

    fn node_key(&self) -> Option<&'static str> {
        match self {
            Self::RichText => Some("content"),
            Self::Button => Some("label"),
            _ => None,
        }
    }
}

/// One entry of `main_blocks`.
///
/// `nodes` holds the decoded `content` of a rich-text block or the `label`
/// of a button; every other field stays in `fields` in source order.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub kind: BlockKind,
    pub fields: Mapping,
    pub nodes: Vec<Node>,
    style: SeqStyle,
}

impl Block {
    pub fn from_value(value: &Value, index: usize) -> Result<Self, MigrationError> {
        let Some(map) = value.as_map() else {
            return Err(MigrationError::malformed(format!(
                "main_blocks[{index}] is not a mapping"
            )));
        };
        let kind = BlockKind::from_type(map.get_str("type").unwrap_or_default());
        let mut fields = map.clone();
        let mut nodes = Vec::new();
        let mut style = SeqStyle::Block;
        if let Some(key) = kind.node_key()
            && let Some(Value::Seq(items, seq_style)) = fields.get_mut(key)
        {
            nodes = items.iter().map(Node::from_value).collect();
            style = *seq_style;
            items.clear();
        }
        Ok(Self {
            kind,
            fields,
            nodes,
            style,
        })
    }

    pub fn to_value(&self) -> Value {
        let mut fields = self.fields.clone();
        if let Some(key) = self.kind.node_key() {
            let holds_nodes = matches!(fields.get(key), Some(Value::Seq(_, _)));
            if holds_nodes || !self.nodes.is_empty() {
                let items = self
                    .nodes
                    .iter()
                    .map(|node| node.to_value(self.style))
                    .collect();
                fields.insert(key, Value::Seq(items, self.style));
            }
        }
        Value::Map(fields)
    }

    pub fn rich_text(id: &str, nodes: Vec<Node>) -> Self {
        let mut fields = Mapping::new();
        fields.insert("id", Value::plain(id));
        fields.insert("version", Value::plain("rich_text_1"));
        fields.insert("content", Value::seq(Vec::new()));
        fields.insert("type", Value::plain(RICH_TEXT_TYPE));
        fields.insert("enabled", Value::Bool(true));
        Self {
            kind: BlockKind::RichText,
            fields,
            nodes,
            style: SeqStyle::Block,
        }
    }

    pub fn from_fields(fields: Mapping) -> Self {
        let kind = BlockKind::from_type(fields.get_str("type").unwrap_or_default());
        Self {
            kind,
            fields,
            nodes: Vec::new(),
            style: SeqStyle::Block,
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.fields.get_str("id")
    }

    pub fn is_rich_text(&self) -> bool {
        self.kind == BlockKind::RichText
    }

    pub fn plain_text(&self) -> String {
        flatten(&self.nodes)
    }
}
