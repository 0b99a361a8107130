//! Ordered value model for the front-matter subset the CMS emits.
//!
//! Only the patterns written by the CMS and by this tool are accepted:
//! block mappings, `-` sequences (item maps either on the following lines or
//! starting inline), quoted and plain scalars, and the empty collections `[]`
//! and `{}`. Anything else is reported as a malformed document rather than
//! guessed at, so a write never happens on input we cannot reproduce.

use crate::error::MigrationError;

const INDENT: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarStyle {
    Plain,
    Single,
    Double,
}

/// How map items inside a sequence are laid out.
///
/// `Block` writes the dash on its own line (`-` then the map one level
/// deeper); `Compact` puts the first key on the dash line (`- type: text`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SeqStyle {
    #[default]
    Block,
    Compact,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    /// Numeric scalar, kept as its source text.
    Number(String),
    Str { value: String, style: ScalarStyle },
    Seq(Vec<Value>, SeqStyle),
    Map(Mapping),
}

impl Value {
    /// String scalar quoted the way the CMS expects: double quotes when the
    /// text carries an apostrophe or a control character, single quotes otherwise.
    pub fn string(text: impl Into<String>) -> Self {
        let value = text.into();
        let style = if value.contains('\'') || value.chars().any(char::is_control) {
            ScalarStyle::Double
        } else {
            ScalarStyle::Single
        };
        Self::Str { value, style }
    }

    /// Unquoted string scalar. Falls back to [`Value::string`] when the text
    /// would not read back as the same plain string.
    pub fn plain(text: impl Into<String>) -> Self {
        let value = text.into();
        if is_plain_safe(&value) {
            Self::Str {
                value,
                style: ScalarStyle::Plain,
            }
        } else {
            Self::string(value)
        }
    }

    pub fn styled(text: impl Into<String>, style: ScalarStyle) -> Self {
        let value = text.into();
        match style {
            ScalarStyle::Plain => Self::plain(value),
            ScalarStyle::Single if value.chars().any(char::is_control) => Self::Str {
                value,
                style: ScalarStyle::Double,
            },
            _ => Self::Str { value, style },
        }
    }

    pub fn seq(items: Vec<Value>) -> Self {
        Self::Seq(items, SeqStyle::Block)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Mapping> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_map_mut(&mut self) -> Option<&mut Mapping> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_seq(&self) -> Option<&[Value]> {
        match self {
            Self::Seq(items, _) => Some(items),
            _ => None,
        }
    }

    pub fn as_seq_mut(&mut self) -> Option<&mut Vec<Value>> {
        match self {
            Self::Seq(items, _) => Some(items),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Visits every string scalar in the tree.
    pub fn for_each_str_mut<F>(&mut self, visit: &mut F)
    where
        F: FnMut(&mut String),
    {
        match self {
            Self::Str { value, .. } => visit(value),
            Self::Seq(items, _) => {
                for item in items {
                    item.for_each_str_mut(visit);
                }
            }
            Self::Map(map) => {
                for (_, value) in map.iter_mut() {
                    value.for_each_str_mut(visit);
                }
            }
            _ => {}
        }
    }
}

/// Insertion-ordered string-keyed map.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Mapping {
    entries: Vec<(String, Value)>,
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.entries
            .iter_mut()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Replaces the value in place, or appends a new entry.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        let key = key.into();
        if let Some(slot) = self.get_mut(&key) {
            return Some(std::mem::replace(slot, value));
        }
        self.entries.push((key, value));
        None
    }

    /// Replaces the value in place, or inserts right after `anchor` (appends
    /// when the anchor is absent).
    pub fn insert_after(&mut self, anchor: &str, key: impl Into<String>, value: Value) {
        let key = key.into();
        if let Some(slot) = self.get_mut(&key) {
            *slot = value;
            return;
        }
        match self.entries.iter().position(|(name, _)| name == anchor) {
            Some(index) => self.entries.insert(index + 1, (key, value)),
            None => self.entries.push((key, value)),
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let index = self.entries.iter().position(|(name, _)| name == key)?;
        Some(self.entries.remove(index).1)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut Value)> {
        self.entries
            .iter_mut()
            .map(|(name, value)| (name.as_str(), value))
    }
}

impl FromIterator<(String, Value)> for Mapping {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        let mut map = Mapping::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

#[derive(Debug, Clone)]
struct Line {
    number: usize,
    indent: usize,
    text: String,
}

pub fn parse_front_matter(text: &str) -> Result<Mapping, MigrationError> {
    let mut lines = Vec::new();
    for (index, raw) in text.lines().enumerate() {
        let number = index + 1;
        if raw.trim().is_empty() {
            continue;
        }
        let content = raw.trim_start_matches(' ');
        if content.starts_with('\t') {
            return Err(MigrationError::malformed(format!(
                "line {number}: tab indentation is not supported"
            )));
        }
        if content.starts_with('#') {
            return Err(MigrationError::malformed(format!(
                "line {number}: comments are not supported"
            )));
        }
        lines.push(Line {
            number,
            indent: raw.len() - content.len(),
            text: content.trim_end().to_string(),
        });
    }

    if lines.is_empty() {
        return Ok(Mapping::new());
    }
    if lines[0].indent != 0 {
        return Err(MigrationError::malformed(format!(
            "line {}: front-matter must start at column 0",
            lines[0].number
        )));
    }

    let mut parser = Parser { lines, pos: 0 };
    let map = parser.parse_map(0)?;
    if let Some(line) = parser.lines.get(parser.pos) {
        return Err(MigrationError::malformed(format!(
            "line {}: unexpected indentation",
            line.number
        )));
    }
    Ok(map)
}

struct Parser {
    lines: Vec<Line>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Line> {
        self.lines.get(self.pos)
    }

    fn parse_block(&mut self, indent: usize) -> Result<Value, MigrationError> {
        let is_seq = self
            .peek()
            .map(|line| is_seq_item(&line.text))
            .unwrap_or(false);
        if is_seq {
            self.parse_seq(indent)
        } else {
            self.parse_map(indent).map(Value::Map)
        }
    }

    fn parse_map(&mut self, indent: usize) -> Result<Mapping, MigrationError> {
        let mut map = Mapping::new();
        while let Some(line) = self.peek() {
            if line.indent < indent {
                break;
            }
            if line.indent > indent {
                return Err(MigrationError::malformed(format!(
                    "line {}: unexpected indentation",
                    line.number
                )));
            }
            if is_seq_item(&line.text) {
                break;
            }
            let number = line.number;
            let Some((key, rest)) = split_key(&line.text, number)? else {
                return Err(MigrationError::malformed(format!(
                    "line {number}: expected `key: value`"
                )));
            };
            if map.contains_key(&key) {
                return Err(MigrationError::malformed(format!(
                    "line {number}: duplicate key `{key}`"
                )));
            }
            self.pos += 1;

            let value = if rest.is_empty() {
                match self.peek() {
                    Some(next) if next.indent > indent => {
                        let child_indent = next.indent;
                        self.parse_block(child_indent)?
                    }
                    Some(next) if next.indent == indent && is_seq_item(&next.text) => {
                        self.parse_seq(indent)?
                    }
                    _ => Value::Null,
                }
            } else {
                parse_scalar(&rest, number)?
            };
            map.insert(key, value);
        }
        Ok(map)
    }

    fn parse_seq(&mut self, indent: usize) -> Result<Value, MigrationError> {
        let mut items = Vec::new();
        let mut style = SeqStyle::Block;
        while let Some(line) = self.peek() {
            if line.indent != indent || !is_seq_item(&line.text) {
                if line.indent > indent {
                    return Err(MigrationError::malformed(format!(
                        "line {}: unexpected indentation",
                        line.number
                    )));
                }
                break;
            }
            let number = line.number;
            if line.text == "-" {
                self.pos += 1;
                let item = match self.peek() {
                    Some(next) if next.indent > indent => {
                        let child_indent = next.indent;
                        self.parse_block(child_indent)?
                    }
                    _ => Value::Null,
                };
                items.push(item);
                continue;
            }

            let after_dash = &line.text[1..];
            let rest = after_dash.trim_start_matches(' ');
            let inline_indent = indent + 1 + (after_dash.len() - rest.len());
            let opens_collection = is_seq_item(rest) || split_key(rest, number)?.is_some();
            if opens_collection {
                if items.is_empty() {
                    style = SeqStyle::Compact;
                }
                let rest = rest.to_string();
                self.lines[self.pos] = Line {
                    number,
                    indent: inline_indent,
                    text: rest,
                };
                items.push(self.parse_block(inline_indent)?);
            } else {
                let value = parse_scalar(rest, number)?;
                self.pos += 1;
                items.push(value);
            }
        }
        Ok(Value::Seq(items, style))
    }
}

fn is_seq_item(text: &str) -> bool {
    text == "-" || text.starts_with("- ")
}

/// Splits `key: rest`. Returns `None` when the text is not a mapping entry.
fn split_key(text: &str, number: usize) -> Result<Option<(String, String)>, MigrationError> {
    if text.starts_with('\'') || text.starts_with('"') {
        let (key, consumed) = parse_quoted(text, number)?;
        let tail = &text[consumed..];
        return Ok(match tail.strip_prefix(':') {
            Some("") => Some((key, String::new())),
            Some(rest) if rest.starts_with(' ') => Some((key, rest.trim().to_string())),
            _ => None,
        });
    }

    let bytes = text.as_bytes();
    for (index, byte) in bytes.iter().enumerate() {
        if *byte != b':' {
            continue;
        }
        let next = bytes.get(index + 1).copied();
        if next.is_none() || next == Some(b' ') {
            let key = text[..index].trim_end();
            if key.is_empty() {
                return Ok(None);
            }
            return Ok(Some((key.to_string(), text[index + 1..].trim().to_string())));
        }
    }
    Ok(None)
}

fn parse_scalar(text: &str, number: usize) -> Result<Value, MigrationError> {
    if text.starts_with('\'') || text.starts_with('"') {
        let (value, consumed) = parse_quoted(text, number)?;
        if !text[consumed..].trim().is_empty() {
            return Err(MigrationError::malformed(format!(
                "line {number}: trailing characters after quoted scalar"
            )));
        }
        let style = if text.starts_with('\'') {
            ScalarStyle::Single
        } else {
            ScalarStyle::Double
        };
        return Ok(Value::Str { value, style });
    }

    match text {
        "[]" => return Ok(Value::Seq(Vec::new(), SeqStyle::Block)),
        "{}" => return Ok(Value::Map(Mapping::new())),
        "null" | "~" => return Ok(Value::Null),
        "true" => return Ok(Value::Bool(true)),
        "false" => return Ok(Value::Bool(false)),
        _ => {}
    }

    let first = text.chars().next().unwrap_or(' ');
    if matches!(first, '[' | '{') {
        return Err(MigrationError::malformed(format!(
            "line {number}: flow collections are not supported"
        )));
    }
    if matches!(first, '|' | '>') {
        return Err(MigrationError::malformed(format!(
            "line {number}: block scalars are not supported"
        )));
    }
    if matches!(first, '&' | '*' | '!') {
        return Err(MigrationError::malformed(format!(
            "line {number}: anchors, aliases and tags are not supported"
        )));
    }

    if is_number(text) {
        return Ok(Value::Number(text.to_string()));
    }
    Ok(Value::Str {
        value: text.to_string(),
        style: ScalarStyle::Plain,
    })
}

/// Parses a quoted scalar at the start of `text`, returning the value and the
/// number of bytes consumed including both quotes.
fn parse_quoted(text: &str, number: usize) -> Result<(String, usize), MigrationError> {
    let mut chars = text.char_indices();
    let Some((_, quote)) = chars.next() else {
        return Err(MigrationError::malformed(format!(
            "line {number}: empty scalar"
        )));
    };
    let mut value = String::new();

    if quote == '\'' {
        while let Some((index, ch)) = chars.next() {
            if ch != '\'' {
                value.push(ch);
                continue;
            }
            if text[index + 1..].starts_with('\'') {
                value.push('\'');
                chars.next();
                continue;
            }
            return Ok((value, index + 1));
        }
    } else {
        while let Some((index, ch)) = chars.next() {
            match ch {
                '"' => return Ok((value, index + 1)),
                '\\' => {
                    let Some((_, escaped)) = chars.next() else {
                        break;
                    };
                    match escaped {
                        '"' => value.push('"'),
                        '\\' => value.push('\\'),
                        '/' => value.push('/'),
                        'n' => value.push('\n'),
                        't' => value.push('\t'),
                        'r' => value.push('\r'),
                        '0' => value.push('\0'),
                        'u' => {
                            let mut code = String::new();
                            for _ in 0..4 {
                                match chars.next() {
                                    Some((_, digit)) => code.push(digit),
                                    None => break,
                                }
                            }
                            let decoded = u32::from_str_radix(&code, 16)
                                .ok()
                                .and_then(char::from_u32)
                                .ok_or_else(|| {
                                    MigrationError::malformed(format!(
                                        "line {number}: invalid unicode escape \\u{code}"
                                    ))
                                })?;
                            value.push(decoded);
                        }
                        other => {
                            return Err(MigrationError::malformed(format!(
                                "line {number}: unsupported escape \\{other}"
                            )));
                        }
                    }
                }
                other => value.push(other),
            }
        }
    }

    Err(MigrationError::malformed(format!(
        "line {number}: unterminated quoted scalar"
    )))
}

fn is_number(text: &str) -> bool {
    let digits = text.strip_prefix('-').unwrap_or(text);
    let mut parts = digits.splitn(2, '.');
    let whole = parts.next().unwrap_or("");
    let fraction = parts.next();
    let all_digits = |part: &str| !part.is_empty() && part.bytes().all(|byte| byte.is_ascii_digit());
    if !all_digits(whole) {
        return false;
    }
    match fraction {
        Some(part) => all_digits(part),
        None => true,
    }
}

/// Whether `text` reads back as the same plain string scalar.
pub fn is_plain_safe(text: &str) -> bool {
    if text.is_empty() || text.trim() != text {
        return false;
    }
    if matches!(text, "null" | "~" | "true" | "false" | "[]" | "{}") || is_number(text) {
        return false;
    }
    let first = text.chars().next().unwrap_or(' ');
    if matches!(
        first,
        '\'' | '"' | '[' | '{' | '|' | '>' | '&' | '*' | '!' | '#' | '%' | '@' | '`'
    ) {
        return false;
    }
    if text == "-" || text.starts_with("- ") || text.ends_with(':') {
        return false;
    }
    !text.contains(": ") && !text.contains(" #") && !text.chars().any(char::is_control)
}

pub fn emit_front_matter(map: &Mapping) -> String {
    let mut out = String::new();
    emit_map(map, 0, &mut out);
    out
}

fn emit_map(map: &Mapping, indent: usize, out: &mut String) {
    let pad = " ".repeat(indent);
    for (key, value) in map.iter() {
        out.push_str(&pad);
        out.push_str(&emit_key(key));
        out.push(':');
        match value {
            Value::Map(child) if !child.is_empty() => {
                out.push('\n');
                emit_map(child, indent + INDENT, out);
            }
            Value::Seq(items, style) if !items.is_empty() => {
                out.push('\n');
                emit_seq(items, *style, indent + INDENT, out);
            }
            scalar => {
                out.push(' ');
                out.push_str(&emit_scalar(scalar));
                out.push('\n');
            }
        }
    }
}

fn emit_seq(items: &[Value], style: SeqStyle, indent: usize, out: &mut String) {
    let pad = " ".repeat(indent);
    let child_pad = " ".repeat(indent + INDENT);
    for item in items {
        let nested = match item {
            Value::Map(child) if !child.is_empty() => {
                let mut nested = String::new();
                emit_map(child, indent + INDENT, &mut nested);
                Some(nested)
            }
            Value::Seq(children, child_style) if !children.is_empty() => {
                let mut nested = String::new();
                emit_seq(children, *child_style, indent + INDENT, &mut nested);
                Some(nested)
            }
            _ => None,
        };

        match nested {
            Some(nested) if style == SeqStyle::Compact => {
                out.push_str(&pad);
                out.push_str("- ");
                out.push_str(nested.strip_prefix(&child_pad).unwrap_or(&nested));
            }
            Some(nested) => {
                out.push_str(&pad);
                out.push_str("-\n");
                out.push_str(&nested);
            }
            None => {
                out.push_str(&pad);
                out.push_str("- ");
                out.push_str(&emit_scalar(item));
                out.push('\n');
            }
        }
    }
}

fn emit_key(key: &str) -> String {
    let needs_quotes = key.is_empty()
        || key.trim() != key
        || key.contains(": ")
        || key.ends_with(':')
        || key.starts_with(['\'', '"', '-', '#', '[', '{', '&', '*', '!']);
    if needs_quotes {
        quote_single(key)
    } else {
        key.to_string()
    }
}

fn emit_scalar(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(true) => "true".to_string(),
        Value::Bool(false) => "false".to_string(),
        Value::Number(raw) => raw.clone(),
        Value::Str { value, style } => match style {
            ScalarStyle::Plain if is_plain_safe(value) => value.clone(),
            ScalarStyle::Double => quote_double(value),
            _ if value.chars().any(char::is_control) => quote_double(value),
            _ => quote_single(value),
        },
        Value::Seq(_, _) => "[]".to_string(),
        Value::Map(_) => "{}".to_string(),
    }
}

fn quote_single(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

fn quote_double(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for ch in text.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\0' => out.push_str("\\0"),
            other if other.is_control() => out.push_str(&format!("\\u{:04x}", other as u32)),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const SAMPLE: &str = "id: 7d1c0f52-1111-4c3b-9a55-0123456789ab
blueprint: article
title: 'Can a Minor Own a Business?'
subtitle: \"Here's what to know\"
likes: 0
published: false
tags: []
main_blocks:
  -
    id: lq1
    version: rich_text_1
    content:
      -
        type: paragraph
        attrs:
          textAlign: left
        content:
          -
            type: text
            text: 'Start an LLC today'
    type: rich_text
    enabled: true
categories:
  - taxes
  - formation
";

    #[test]
    fn parses_nested_blocks_in_order() {
        let map = parse_front_matter(SAMPLE).expect("parse");
        let keys = map.keys().collect::<Vec<_>>();
        assert_eq!(
            keys,
            vec![
                "id",
                "blueprint",
                "title",
                "subtitle",
                "likes",
                "published",
                "tags",
                "main_blocks",
                "categories"
            ]
        );
        assert_eq!(map.get_str("title"), Some("Can a Minor Own a Business?"));
        assert_eq!(map.get_str("subtitle"), Some("Here's what to know"));
        assert_eq!(map.get("likes"), Some(&Value::Number("0".to_string())));
        assert_eq!(map.get("published"), Some(&Value::Bool(false)));

        let blocks = map.get("main_blocks").and_then(Value::as_seq).expect("blocks");
        assert_eq!(blocks.len(), 1);
        let block = blocks[0].as_map().expect("block map");
        assert_eq!(block.get_str("type"), Some("rich_text"));
        assert_eq!(block.get("enabled"), Some(&Value::Bool(true)));
    }

    #[test]
    fn emits_parsed_text_byte_for_byte() {
        let map = parse_front_matter(SAMPLE).expect("parse");
        assert_eq!(emit_front_matter(&map), SAMPLE);
    }

    #[test]
    fn compact_sequences_round_trip() {
        let text = "marks:\n  - type: link\n    attrs:\n      href: /articles/llc\n      rel: null\n  - type: bold\n";
        let map = parse_front_matter(text).expect("parse");
        let marks = map.get("marks").expect("marks");
        assert!(matches!(marks, Value::Seq(_, SeqStyle::Compact)));
        assert_eq!(emit_front_matter(&map), text);
    }

    #[test]
    fn zero_indent_sequence_under_key_is_accepted() {
        let map = parse_front_matter("tags:\n- a\n- b\nother: x\n").expect("parse");
        assert_eq!(
            map.get("tags").and_then(Value::as_seq).map(<[Value]>::len),
            Some(2)
        );
        assert_eq!(map.get_str("other"), Some("x"));
    }

    #[test]
    fn quoting_follows_apostrophe_rule() {
        assert_eq!(emit_scalar(&Value::string("plain text")), "'plain text'");
        assert_eq!(emit_scalar(&Value::string("it's here")), "\"it's here\"");
        assert_eq!(
            emit_scalar(&Value::string("say \"hi\" it's")),
            "\"say \\\"hi\\\" it's\""
        );
        assert_eq!(
            emit_scalar(&Value::styled("O'Neil", ScalarStyle::Single)),
            "'O''Neil'"
        );
    }

    #[test]
    fn escapes_are_decoded() {
        let map = parse_front_matter("a: 'it''s'\nb: \"x\\ny \\u00e9 \\/\"\n").expect("parse");
        assert_eq!(map.get_str("a"), Some("it's"));
        assert_eq!(map.get_str("b"), Some("x\ny é /"));
    }

    #[test]
    fn plain_scalars_keep_colons_inside_urls() {
        let map = parse_front_matter("href: https://bizee.com/articles\n").expect("parse");
        assert_eq!(map.get_str("href"), Some("https://bizee.com/articles"));
    }

    #[test]
    fn unsupported_syntax_is_malformed() {
        for text in [
            "a: |\n  block\n",
            "a: [1, 2]\n",
            "# comment\na: b\n",
            "a: &anchor x\n",
            "a: 'unterminated\n",
            "a:\n\tb: c\n",
            "a: b\n    c: d\n",
            "a: 1\na: 2\n",
        ] {
            let err = parse_front_matter(text).expect_err("must fail");
            assert!(
                matches!(err, MigrationError::MalformedDocument(_)),
                "unexpected error for {text:?}: {err}"
            );
        }
    }

    #[test]
    fn insert_after_places_new_keys_next_to_anchor() {
        let mut map = parse_front_matter("likes: 0\nupdated_by: x\n").expect("parse");
        map.insert_after("likes", "slug_category", Value::plain("taxes"));
        map.insert_after("missing", "hold", Value::Bool(true));
        assert_eq!(
            emit_front_matter(&map),
            "likes: 0\nslug_category: taxes\nupdated_by: x\nhold: true\n"
        );
    }

    #[test]
    fn plain_falls_back_to_quotes_for_ambiguous_text() {
        assert_eq!(emit_scalar(&Value::plain("true")), "'true'");
        assert_eq!(emit_scalar(&Value::plain("12")), "'12'");
        assert_eq!(emit_scalar(&Value::plain("a: b")), "'a: b'");
        assert_eq!(emit_scalar(&Value::plain("/articles/llc")), "/articles/llc");
    }
}
