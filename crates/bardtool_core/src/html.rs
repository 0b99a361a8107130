//! Tolerant tag scanner for production pages. No DOM: tags are found by
//! byte scanning, and element extents by counting same-name nesting.

use std::collections::BTreeMap;
use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::text::{collapse_whitespace, index_of_ignore_case};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

static DATE_PUBLISHED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""datePublished":\s*"([^"]*)""#).expect("datePublished pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    /// Byte offset of `<`.
    pub start: usize,
    /// Byte offset of the closing `>`.
    pub end: usize,
    pub attrs: BTreeMap<String, String>,
}

impl Tag {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    pub fn class_contains(&self, fragment: &str) -> bool {
        self.attr("class")
            .is_some_and(|class| {
                class
                    .to_ascii_lowercase()
                    .contains(&fragment.to_ascii_lowercase())
            })
    }

    pub fn is_self_closing(&self, html: &str) -> bool {
        html[..self.end].trim_end().ends_with('/')
    }
}

/// An element: its opening tag, inner byte range and the offset just past
/// its closing tag (or end of input when unclosed).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub tag: Tag,
    pub inner: Range<usize>,
    pub outer_end: usize,
}

impl Element {
    pub fn inner_html<'a>(&self, html: &'a str) -> &'a str {
        &html[self.inner.clone()]
    }

    pub fn text(&self, html: &str) -> String {
        text_content(self.inner_html(html))
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct SeoReport {
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub canonical: Option<String>,
    pub h1: Option<String>,
    pub author: Option<String>,
    pub date_published: Option<String>,
}

pub fn extract_seo(html: &str) -> SeoReport {
    let meta_description = scan_tags(html, "meta")
        .into_iter()
        .find(|tag| {
            tag.attr("name")
                .is_some_and(|name| name.eq_ignore_ascii_case("description"))
        })
        .and_then(|tag| tag.attr("content").map(decode_html))
        .map(|value| value.trim().to_string());
    let canonical = scan_tags(html, "link")
        .into_iter()
        .find(|tag| tag.attr("rel").is_some_and(|rel| rel.eq_ignore_ascii_case("canonical")))
        .and_then(|tag| tag.attr("href").map(decode_html));
    let author = author_text(html);

    SeoReport {
        meta_title: element_inner(html, "title"),
        meta_description,
        canonical,
        h1: element_inner(html, "h1"),
        author,
        date_published: DATE_PUBLISHED_RE
            .captures(html)
            .map(|captures| captures[1].to_string()),
    }
}

fn author_text(html: &str) -> Option<String> {
    for element in elements(html, "a") {
        if element
            .tag
            .attr("rel")
            .is_some_and(|rel| rel.split_whitespace().any(|part| part.eq_ignore_ascii_case("author")))
        {
            let text = element.text(html);
            if !text.is_empty() {
                return Some(text);
            }
        }
    }
    None
}

/// Visible text of the first `tag_name` element, or `None` when absent or blank.
pub fn element_inner(html: &str, tag_name: &str) -> Option<String> {
    let element = elements(html, tag_name).into_iter().next()?;
    let text = element.text(html);
    if text.is_empty() { None } else { Some(text) }
}

pub fn scan_tags(html: &str, tag_name: &str) -> Vec<Tag> {
    let name = tag_name.to_ascii_lowercase();
    let mut output = Vec::new();
    let mut index = 0usize;

    while index < html.len() {
        let Some(lt) = html[index..].find('<') else {
            break;
        };
        let at = index + lt;
        if starts_with_at(html, at, "<!--") {
            index = skip_comment(html, at);
            continue;
        }
        if is_tag_at(html, at, &name) {
            let Some(end) = find_tag_end(html, at) else {
                break;
            };
            output.push(Tag {
                start: at,
                end,
                attrs: parse_attributes(&html[at..=end], &name),
            });
            index = end + 1;
            continue;
        }
        index = at + 1;
    }

    output
}

/// Every `tag_name` element in document order, including nested ones.
pub fn elements(html: &str, tag_name: &str) -> Vec<Element> {
    let name = tag_name.to_ascii_lowercase();
    scan_tags(html, &name)
        .into_iter()
        .map(|tag| {
            let open_end = tag.end + 1;
            if VOID_ELEMENTS.contains(&name.as_str()) || tag.is_self_closing(html) {
                return Element {
                    inner: open_end..open_end,
                    outer_end: open_end,
                    tag,
                };
            }
            match find_closing(html, &name, open_end) {
                Some((close_start, close_end)) => Element {
                    inner: open_end..close_start,
                    outer_end: close_end,
                    tag,
                },
                None => Element {
                    inner: open_end..html.len(),
                    outer_end: html.len(),
                    tag,
                },
            }
        })
        .collect()
}

/// Returns `(start of "</name", offset past its ">")` for the close tag
/// balancing an open tag that ended just before `from`.
fn find_closing(html: &str, name: &str, from: usize) -> Option<(usize, usize)> {
    let mut depth = 1usize;
    let mut index = from;
    while index < html.len() {
        let lt = html[index..].find('<')?;
        let at = index + lt;
        if starts_with_at(html, at, "<!--") {
            index = skip_comment(html, at);
            continue;
        }
        if is_close_tag_at(html, at, name) {
            let end = find_tag_end(html, at)?;
            depth -= 1;
            if depth == 0 {
                return Some((at, end + 1));
            }
            index = end + 1;
            continue;
        }
        if is_tag_at(html, at, name) {
            let end = find_tag_end(html, at)?;
            if !html[..end].trim_end().ends_with('/') {
                depth += 1;
            }
            index = end + 1;
            continue;
        }
        index = at + 1;
    }
    None
}

/// Removes every `tag_name` element whose opening tag matches `predicate`.
pub fn remove_elements<F>(html: &str, tag_name: &str, predicate: F) -> String
where
    F: Fn(&Tag) -> bool,
{
    let mut output = String::with_capacity(html.len());
    let mut cursor = 0usize;
    for element in elements(html, tag_name) {
        if element.tag.start < cursor || !predicate(&element.tag) {
            continue;
        }
        output.push_str(&html[cursor..element.tag.start]);
        cursor = element.outer_end;
    }
    output.push_str(&html[cursor..]);
    output
}

/// Inner HTML of the `<main>` element whose `id` is `main_id`.
pub fn main_by_id<'a>(html: &'a str, main_id: &str) -> Option<&'a str> {
    elements(html, "main")
        .into_iter()
        .find(|element| element.tag.attr("id") == Some(main_id))
        .map(|element| element.inner_html(html))
}

/// Drops header, footer, aside and nav elements, plus `div` and `section`
/// containers whose class contains one of `container_classes`.
pub fn strip_page_chrome(fragment: &str, container_classes: &[String]) -> String {
    let mut content = fragment.to_string();
    for tag in ["header", "footer", "aside", "nav"] {
        content = remove_elements(&content, tag, |_| true);
    }
    for tag in ["div", "section"] {
        content = remove_elements(&content, tag, |element| {
            container_classes
                .iter()
                .any(|class| element.class_contains(class))
        });
    }
    content
}

/// `class` attributes of the elements still open at byte `position`,
/// outermost first.
pub fn ancestor_classes(html: &str, position: usize) -> Vec<String> {
    let mut stack: Vec<(String, String)> = Vec::new();
    let mut index = 0usize;
    let limit = position.min(html.len());

    while index < limit {
        let Some(lt) = html[index..limit].find('<') else {
            break;
        };
        let at = index + lt;
        if starts_with_at(html, at, "<!--") {
            index = skip_comment(html, at);
            continue;
        }
        let Some((name, closing)) = tag_name_at(html, at) else {
            index = at + 1;
            continue;
        };
        let Some(end) = find_tag_end(html, at) else {
            break;
        };
        if end >= limit {
            break;
        }
        if closing {
            if let Some(open) = stack.iter().rposition(|(open, _)| *open == name) {
                stack.truncate(open);
            }
            index = end + 1;
            continue;
        }
        if RAW_TEXT_ELEMENTS.contains(&name.as_str()) {
            index = find_closing(html, &name, end + 1).map_or(html.len(), |(_, after)| after);
            continue;
        }
        if !VOID_ELEMENTS.contains(&name.as_str()) && !html[..end].trim_end().ends_with('/') {
            let attrs = parse_attributes(&html[at..=end], &name);
            stack.push((name, attrs.get("class").cloned().unwrap_or_default()));
        }
        index = end + 1;
    }

    stack.into_iter().map(|(_, class)| class).collect()
}

fn tag_name_at(html: &str, at: usize) -> Option<(String, bool)> {
    let bytes = html.as_bytes();
    let mut index = at + 1;
    let closing = bytes.get(index).copied() == Some(b'/');
    if closing {
        index += 1;
    }
    let start = index;
    while index < bytes.len() && (bytes[index].is_ascii_alphanumeric() || bytes[index] == b'-') {
        index += 1;
    }
    if index == start || !bytes[start].is_ascii_alphabetic() {
        return None;
    }
    Some((html[start..index].to_ascii_lowercase(), closing))
}

/// Tags removed, entities decoded, whitespace collapsed.
pub fn text_content(fragment: &str) -> String {
    collapse_whitespace(&decode_html(&strip_tags(fragment)))
}

/// Replaces each tag with a space so adjacent words stay apart.
pub fn strip_tags(html: &str) -> String {
    let mut output = String::with_capacity(html.len());
    let mut index = 0usize;
    while index < html.len() {
        let Some(lt) = html[index..].find('<') else {
            output.push_str(&html[index..]);
            break;
        };
        let at = index + lt;
        output.push_str(&html[index..at]);
        if starts_with_at(html, at, "<!--") {
            index = skip_comment(html, at);
            continue;
        }
        if tag_name_at(html, at).is_none() {
            output.push('<');
            index = at + 1;
            continue;
        }
        match find_tag_end(html, at) {
            Some(end) => {
                if is_inline_boundary(html, at) {
                    output.push(' ');
                }
                index = end + 1;
            }
            None => break,
        }
    }
    output
}

fn is_inline_boundary(html: &str, at: usize) -> bool {
    !matches!(
        tag_name_at(html, at).map(|(name, _)| name).as_deref(),
        Some("a" | "b" | "strong" | "em" | "i" | "span" | "u")
    )
}

fn skip_comment(html: &str, at: usize) -> usize {
    match html[at + 4..].find("-->") {
        Some(end) => at + 4 + end + 3,
        None => html.len(),
    }
}

pub fn find_tag_start(html: &str, tag_name: &str, start: usize) -> Option<usize> {
    let mut index = start;
    while index < html.len() {
        let lt = html[index..].find('<')?;
        let at = index + lt;
        if is_tag_at(html, at, tag_name) {
            return Some(at);
        }
        index = at + 1;
    }
    None
}

fn is_tag_at(html: &str, at: usize, tag_name: &str) -> bool {
    let bytes = html.as_bytes();
    if bytes.get(at).copied() != Some(b'<') {
        return false;
    }
    let index = at + 1;
    if bytes.get(index).copied() == Some(b'/') {
        return false;
    }
    name_follows(bytes, index, tag_name)
}

fn is_close_tag_at(html: &str, at: usize, tag_name: &str) -> bool {
    let bytes = html.as_bytes();
    bytes.get(at).copied() == Some(b'<')
        && bytes.get(at + 1).copied() == Some(b'/')
        && name_follows(bytes, at + 2, tag_name)
}

fn name_follows(bytes: &[u8], start: usize, tag_name: &str) -> bool {
    let mut index = start;
    for expected in tag_name.as_bytes() {
        let Some(actual) = bytes.get(index) else {
            return false;
        };
        if !actual.eq_ignore_ascii_case(expected) {
            return false;
        }
        index += 1;
    }
    matches!(
        bytes.get(index).copied(),
        Some(b' ') | Some(b'\t') | Some(b'\n') | Some(b'\r') | Some(b'>') | Some(b'/')
    )
}

pub fn find_tag_end(html: &str, start: usize) -> Option<usize> {
    let bytes = html.as_bytes();
    let mut index = start;
    let mut quote = None::<u8>;
    while index < bytes.len() {
        let byte = bytes[index];
        if let Some(active) = quote {
            if byte == active {
                quote = None;
            }
            index += 1;
            continue;
        }
        if byte == b'"' || byte == b'\'' {
            quote = Some(byte);
            index += 1;
            continue;
        }
        if byte == b'>' {
            return Some(index);
        }
        index += 1;
    }
    None
}

/// Attribute names are lowercased; valueless attributes map to `""`.
pub fn parse_attributes(tag_raw: &str, tag_name: &str) -> BTreeMap<String, String> {
    let mut attrs = BTreeMap::new();
    let bytes = tag_raw.as_bytes();
    let mut index = tag_name.len() + 1;

    while index < bytes.len() {
        let byte = bytes[index];
        if byte == b'>' {
            break;
        }
        if byte == b'/' || byte.is_ascii_whitespace() {
            index += 1;
            continue;
        }

        let name_start = index;
        while index < bytes.len() {
            let ch = bytes[index];
            if ch.is_ascii_whitespace() || ch == b'=' || ch == b'>' || ch == b'/' {
                break;
            }
            index += 1;
        }
        if name_start == index {
            index += 1;
            continue;
        }
        let name = tag_raw[name_start..index].to_ascii_lowercase();
        while index < bytes.len() && bytes[index].is_ascii_whitespace() {
            index += 1;
        }
        let mut value = String::new();
        if bytes.get(index).copied() == Some(b'=') {
            index += 1;
            while index < bytes.len() && bytes[index].is_ascii_whitespace() {
                index += 1;
            }
            if let Some(quote) = bytes
                .get(index)
                .copied()
                .filter(|byte| *byte == b'"' || *byte == b'\'')
            {
                index += 1;
                let value_start = index;
                while index < bytes.len() && bytes[index] != quote {
                    index += 1;
                }
                value = tag_raw[value_start..index].to_string();
                if bytes.get(index).copied() == Some(quote) {
                    index += 1;
                }
            } else {
                let value_start = index;
                while index < bytes.len()
                    && !bytes[index].is_ascii_whitespace()
                    && bytes[index] != b'>'
                {
                    index += 1;
                }
                value = tag_raw[value_start..index].to_string();
            }
        }

        attrs.entry(name).or_insert(value);
    }

    attrs
}

fn starts_with_at(text: &str, index: usize, sequence: &str) -> bool {
    text.as_bytes()
        .get(index..index + sequence.len())
        .is_some_and(|slice| slice == sequence.as_bytes())
}

/// Decodes the named entities pages actually use plus numeric references.
pub fn decode_html(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    let mut output = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        output.push_str(&rest[..amp]);
        let candidate = &rest[amp..];
        let decoded = candidate
            .find(';')
            .filter(|semi| *semi <= 10)
            .and_then(|semi| decode_entity(&candidate[1..semi]).map(|ch| (ch, semi)));
        match decoded {
            Some((ch, semi)) => {
                output.push(ch);
                rest = &candidate[semi + 1..];
            }
            None => {
                output.push('&');
                rest = &candidate[1..];
            }
        }
    }
    output.push_str(rest);
    output
}

fn decode_entity(entity: &str) -> Option<char> {
    let named = match entity {
        "amp" => Some('&'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "nbsp" => Some('\u{a0}'),
        "rsquo" => Some('\u{2019}'),
        "lsquo" => Some('\u{2018}'),
        "rdquo" => Some('\u{201d}'),
        "ldquo" => Some('\u{201c}'),
        "mdash" => Some('\u{2014}'),
        "ndash" => Some('\u{2013}'),
        "hellip" => Some('\u{2026}'),
        _ => None,
    };
    if named.is_some() {
        return named;
    }
    let number = entity.strip_prefix('#')?;
    let code = match number.strip_prefix(['x', 'X']) {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => number.parse::<u32>().ok()?,
    };
    char::from_u32(code)
}

/// First URL of a `srcset` list.
pub fn extract_srcset(srcset: &str) -> Option<String> {
    let first = srcset.split(',').next()?.trim();
    let value = first.split_whitespace().next().unwrap_or_default();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Case-insensitive search for `needle` anywhere in `html`.
pub fn contains_markup(html: &str, needle: &str) -> bool {
    index_of_ignore_case(html, needle, 0).is_some()
}
