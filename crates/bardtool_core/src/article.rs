//! Post-migration fix-ups for one article plus the routing-file edits that
//! release it.

use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, Result, bail};
use regex::Regex;
use serde::Serialize;

use crate::bard::{BlockKind, Node, for_each_text_mut};
use crate::document::Document;
use crate::error::MigrationError;
use crate::filesystem::{read_text, scan_articles, write_if_changed};
use crate::yaml::Value;

pub const RELEASE_MARKER: &str = "// end categories";
pub const REQUIRED_FIELDS: [&str; 5] = ["id", "title", "slug", "article_category", "article_author"];

static DATED_FILE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}\.(.+)$").expect("dated file name pattern is valid")
});
static SINGLE_QUOTED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:-\s+)?([\w-]+):\s+'(.*)'\s*$").expect("single-quoted value pattern is valid")
});
static ARTICLE_REDIRECT_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*'/articles/").expect("article redirect line pattern is valid")
});

#[derive(Debug, Clone, Default, Serialize)]
pub struct ArticleFixReport {
    pub buttons: usize,
    pub buttons_fixed: usize,
    pub alignments_fixed: usize,
    pub bold_removed: usize,
    /// `(previous, new)` when `slug_category` was added or changed.
    pub slug_category: Option<(Option<String>, String)>,
    pub flags_changed: Vec<String>,
}

impl ArticleFixReport {
    pub fn changed(&self) -> bool {
        self.buttons_fixed > 0 || self.slug_category.is_some() || !self.flags_changed.is_empty()
    }
}

/// Normalizes buttons, sets `slug_category` and stages the article as
/// unpublished and on hold.
pub fn fix_article(document: &mut Document, category: &str) -> Result<ArticleFixReport, MigrationError> {
    let mut report = ArticleFixReport::default();

    let mut blocks = document.main_blocks()?;
    for block in blocks.iter_mut().filter(|block| block.kind == BlockKind::Button) {
        report.buttons += 1;
        let aligned = align_left(&mut block.nodes);
        let mut unbolded = 0;
        for_each_text_mut(&mut block.nodes, &mut |run| {
            if run.remove_bold() {
                unbolded += 1;
            }
        });
        if aligned + unbolded > 0 {
            log::info!(
                "button {} fixed: {aligned} alignment(s), {unbolded} bold run(s)",
                block.id().unwrap_or("?")
            );
            report.buttons_fixed += 1;
            report.alignments_fixed += aligned;
            report.bold_removed += unbolded;
        }
    }
    if report.buttons_fixed > 0 {
        document.set_main_blocks(&blocks);
    }

    let current = document.get_str("slug_category").map(ToString::to_string);
    if current.as_deref() != Some(category) {
        document
            .front_matter
            .insert_after("likes", "slug_category", Value::plain(category));
        report.slug_category = Some((current, category.to_string()));
    }

    let anchor = ["slug_category", "likes", "is_featured_article"]
        .into_iter()
        .find(|key| document.front_matter.contains_key(key))
        .unwrap_or("slug");
    if document.get("published").and_then(Value::as_bool) != Some(false) {
        document
            .front_matter
            .insert_after(anchor, "published", Value::Bool(false));
        report.flags_changed.push("published: false".to_string());
    }
    if document.get("hold").and_then(Value::as_bool) != Some(true) {
        let after = if document.front_matter.contains_key("published") {
            "published"
        } else {
            anchor
        };
        document.front_matter.insert_after(after, "hold", Value::Bool(true));
        report.flags_changed.push("hold: true".to_string());
    }

    Ok(report)
}

fn align_left(nodes: &mut [Node]) -> usize {
    let mut fixed = 0;
    for node in nodes {
        if let Node::Paragraph {
            attrs: Some(attrs), ..
        } = node
            && attrs.get_str("textAlign") == Some("center")
        {
            attrs.insert("textAlign", Value::plain("left"));
            fixed += 1;
        }
        if let Some(children) = node.children_mut() {
            fixed += align_left(children);
        }
    }
    fixed
}

/// The `slug` field, else the slug part of a `YYYY-MM-DD.slug.md` file name.
pub fn article_slug(path: &Path, document: &Document) -> Option<String> {
    if let Some(slug) = document.slug().map(str::trim).filter(|slug| !slug.is_empty()) {
        return Some(slug.to_string());
    }
    let stem = path.file_stem()?.to_str()?;
    DATED_FILE_RE
        .captures(stem)
        .and_then(|captures| captures.get(1))
        .map(|slug| slug.as_str().to_string())
}

pub fn article_route(category: &str, slug: &str) -> String {
    format!("/articles/{category}/{slug}")
}

/// `released-articles.php` text with `route` added after the category
/// marker; `None` when the route is already listed.
pub fn add_release_route(text: &str, route: &str) -> Result<Option<String>> {
    if text.contains(&format!("'{route}'")) || text.contains(&format!("\"{route}\"")) {
        return Ok(None);
    }
    let Some(marker) = text.find(RELEASE_MARKER) else {
        bail!("could not find `{RELEASE_MARKER}` in released articles");
    };
    let insert_at = text[marker..]
        .find('\n')
        .map_or(text.len(), |newline| marker + newline + 1);
    let mut updated = String::with_capacity(text.len() + route.len() + 8);
    updated.push_str(&text[..insert_at]);
    if !updated.ends_with('\n') {
        updated.push('\n');
    }
    updated.push_str(&format!("    '{route}',\n"));
    updated.push_str(&text[insert_at..]);
    Ok(Some(updated))
}

/// `redirects.php` text with `'old' => 'new',` appended after the last
/// `/articles/` entry; `None` when `old` already redirects.
pub fn add_redirect_entry(text: &str, old: &str, new: &str) -> Result<Option<String>> {
    let old = if old.starts_with('/') {
        old.to_string()
    } else {
        format!("/{old}")
    };
    let existing = Regex::new(&format!(r#"['"]{}['"]\s*=>"#, regex::escape(&old)))
        .context("failed to build redirect lookup pattern")?;
    if existing.is_match(text) {
        return Ok(None);
    }

    let lines = text.split_inclusive('\n').collect::<Vec<_>>();
    let Some(last) = lines
        .iter()
        .rposition(|line| ARTICLE_REDIRECT_LINE_RE.is_match(line))
    else {
        bail!("could not find an `/articles/` redirect entry to insert after");
    };
    let mut updated = String::with_capacity(text.len() + old.len() + new.len() + 12);
    for (index, line) in lines.iter().enumerate() {
        updated.push_str(line);
        if index == last {
            if !line.ends_with('\n') {
                updated.push('\n');
            }
            updated.push_str(&format!("    '{old}' => '{new}',\n"));
        }
    }
    Ok(Some(updated))
}

pub fn register_release(released_path: &Path, route: &str) -> Result<bool> {
    let original = read_text(released_path)?;
    match add_release_route(&original, route)
        .with_context(|| format!("failed to update {}", released_path.display()))?
    {
        Some(updated) => write_if_changed(released_path, &original, &updated),
        None => Ok(false),
    }
}

pub fn register_redirect(redirects_path: &Path, old: &str, new: &str) -> Result<bool> {
    let original = read_text(redirects_path)?;
    match add_redirect_entry(&original, old, new)
        .with_context(|| format!("failed to update {}", redirects_path.display()))?
    {
        Some(updated) => write_if_changed(redirects_path, &original, &updated),
        None => Ok(false),
    }
}

pub fn category_exists(categories_dir: &Path, slug: &str) -> bool {
    categories_dir.join(format!("{slug}.md")).is_file()
}

pub fn list_entries(dir: &Path) -> Result<Vec<String>> {
    Ok(scan_articles(dir)?
        .iter()
        .filter_map(|path| path.file_stem().and_then(|stem| stem.to_str()))
        .map(ToString::to_string)
        .collect())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryMatch {
    pub file: String,
    pub uuid: String,
    pub title: Option<String>,
}

fn entry_match(path: &Path) -> Result<Option<EntryMatch>> {
    let text = read_text(path)?;
    let document = Document::parse(&text)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(document.id().map(|uuid| EntryMatch {
        file: path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default(),
        uuid: uuid.to_string(),
        title: document.title().map(ToString::to_string),
    }))
}

/// The `id` of `{dir}/{slug}.md`.
pub fn find_entry_uuid(dir: &Path, slug: &str) -> Result<Option<EntryMatch>> {
    let path = dir.join(format!("{slug}.md"));
    if !path.is_file() {
        return Ok(None);
    }
    entry_match(&path)
}

/// First author entry whose file mentions `name`, case-insensitively.
pub fn find_author_uuid(authors_dir: &Path, name: &str) -> Result<Option<EntryMatch>> {
    if let Some(found) = find_entry_uuid(authors_dir, name)? {
        return Ok(Some(found));
    }
    let needle = name.to_lowercase();
    for path in scan_articles(authors_dir)? {
        let text = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        if text.to_lowercase().contains(&needle)
            && let Some(found) = entry_match(&path)?
        {
            return Ok(Some(found));
        }
    }
    Ok(None)
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Single-quoted front-matter values holding a bare apostrophe.
pub fn quote_issues(raw: &str) -> Vec<String> {
    let header = raw
        .strip_prefix("---")
        .and_then(|rest| rest.find("\n---").map(|end| &rest[..end]))
        .unwrap_or(raw);
    header
        .lines()
        .enumerate()
        .filter_map(|(index, line)| {
            let captures = SINGLE_QUOTED_RE.captures(line)?;
            let value = captures.get(2)?.as_str();
            value
                .replace("''", "")
                .contains('\'')
                .then(|| format!("line {}: `{}` has an unescaped apostrophe in single quotes", index + 1, line.trim()))
        })
        .collect()
}

/// Checks the raw article text: quoting first, then parse, then fields.
pub fn validate(raw: &str) -> ValidationReport {
    let mut report = ValidationReport {
        errors: quote_issues(raw),
        warnings: Vec::new(),
    };

    let document = match Document::parse(raw) {
        Ok(document) => document,
        Err(error) => {
            report.errors.push(error.to_string());
            return report;
        }
    };

    for field in REQUIRED_FIELDS {
        let missing = document.get(field).is_none_or(Value::is_null);
        if missing {
            report.errors.push(format!("missing required field: {field}"));
        }
    }
    for flag in ["hold", "published"] {
        if document.get(flag).and_then(Value::as_bool) != Some(true) {
            report.warnings.push(format!("`{flag}` is not true"));
        }
    }
    if let Err(error) = document.main_blocks() {
        report.errors.push(error.to_string());
    }
    report
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    use super::*;

    const ARTICLE: &str = "---
id: 3f0a6a3e-2f43-4a55-9c1e-6a1f0d9b2c10
title: 'Start an LLC'
slug: start-an-llc
article_category: 9a1e
article_author:
  - 77b2
likes: 0
main_blocks:
  -
    id: btn1
    version: article_button_1
    label:
      -
        type: paragraph
        attrs:
          textAlign: center
        content:
          -
            type: text
            marks:
              -
                type: bold
            text: 'Start Now'
    url: 'https://bizee.com/start'
    open_in_new_tab: false
    type: article_button
    enabled: true
---
";

    #[test]
    fn fix_article_normalizes_buttons_and_flags() {
        let mut document = Document::parse(ARTICLE).expect("parse");
        let report = fix_article(&mut document, "business-formation").expect("fix");
        assert_eq!((report.buttons, report.buttons_fixed), (1, 1));
        assert_eq!((report.alignments_fixed, report.bold_removed), (1, 1));
        assert_eq!(
            report.slug_category,
            Some((None, "business-formation".to_string()))
        );
        assert_eq!(report.flags_changed, vec!["published: false", "hold: true"]);

        let text = document.serialize();
        assert!(text.contains(
            "likes: 0\nslug_category: business-formation\npublished: false\nhold: true\n"
        ));
        assert!(text.contains("textAlign: left"));
        assert!(!text.contains("bold"));

        let mut again = Document::parse(&text).expect("reparse");
        let second = fix_article(&mut again, "business-formation").expect("fix");
        assert!(!second.changed());
        assert_eq!(again.serialize(), text);
    }

    #[test]
    fn fix_article_updates_existing_values_in_place() {
        let text = ARTICLE.replace(
            "likes: 0\n",
            "likes: 0\nslug_category: taxes\npublished: true\n",
        );
        let mut document = Document::parse(&text).expect("parse");
        let report = fix_article(&mut document, "business-formation").expect("fix");
        assert_eq!(
            report.slug_category,
            Some((Some("taxes".to_string()), "business-formation".to_string()))
        );
        assert!(
            document
                .serialize()
                .contains("slug_category: business-formation\npublished: false\nhold: true\n")
        );
    }

    #[test]
    fn slug_falls_back_to_file_name() {
        let document = Document::parse("---\ntitle: x\n---\n").expect("parse");
        let path = Path::new("articles/2020-12-15.why-a-series-llc.md");
        assert_eq!(article_slug(path, &document).as_deref(), Some("why-a-series-llc"));
        assert_eq!(article_slug(Path::new("notes.md"), &document), None);
        assert_eq!(
            article_route("business-formation", "why-a-series-llc"),
            "/articles/business-formation/why-a-series-llc"
        );
    }

    #[test]
    fn release_route_goes_after_marker_once() {
        let text = "<?php\nreturn [\n    // end categories\n    '/authors/x',\n];\n";
        let updated = add_release_route(text, "/articles/taxes/a")
            .expect("insert")
            .expect("changed");
        assert_eq!(
            updated,
            "<?php\nreturn [\n    // end categories\n    '/articles/taxes/a',\n    '/authors/x',\n];\n"
        );
        assert_eq!(add_release_route(&updated, "/articles/taxes/a").expect("insert"), None);
        add_release_route("<?php return [];", "/a").expect_err("must fail");
    }

    #[test]
    fn redirect_entry_follows_last_article_redirect() {
        let text = "<?php\nreturn [\n    '/articles/a' => '/articles/taxes/a',\n    '/pricing' => '/plans',\n];\n";
        let updated = add_redirect_entry(text, "articles/b", "/articles/taxes/b")
            .expect("insert")
            .expect("changed");
        assert_eq!(
            updated,
            "<?php\nreturn [\n    '/articles/a' => '/articles/taxes/a',\n    '/articles/b' => '/articles/taxes/b',\n    '/pricing' => '/plans',\n];\n"
        );
        assert_eq!(
            add_redirect_entry(&updated, "/articles/b", "/elsewhere").expect("insert"),
            None
        );
    }

    #[test]
    fn register_functions_write_files() {
        let temp = tempdir().expect("tempdir");
        let released = temp.path().join("released-articles.php");
        fs::write(&released, "return [\n// end categories\n];\n").expect("seed");
        assert!(register_release(&released, "/articles/t/a").expect("register"));
        assert!(!register_release(&released, "/articles/t/a").expect("register"));
        let redirects = temp.path().join("redirects.php");
        fs::write(&redirects, "return [\n  '/articles/x' => '/y',\n];\n").expect("seed");
        assert!(register_redirect(&redirects, "/articles/a", "/articles/t/a").expect("register"));
        assert!(
            fs::read_to_string(&redirects)
                .expect("read")
                .contains("    '/articles/a' => '/articles/t/a',\n];")
        );
    }

    #[test]
    fn entries_are_found_by_slug_and_name() {
        let temp = tempdir().expect("tempdir");
        fs::write(
            temp.path().join("jane-doe.md"),
            "---\nid: 11111111-2222-3333-4444-555555555555\ntitle: 'Jane Doe'\n---\n",
        )
        .expect("seed");
        let by_slug = find_entry_uuid(temp.path(), "jane-doe").expect("find").expect("found");
        assert_eq!(by_slug.uuid, "11111111-2222-3333-4444-555555555555");
        let by_name = find_author_uuid(temp.path(), "JANE doe").expect("find").expect("found");
        assert_eq!(by_name.file, "jane-doe.md");
        assert_eq!(find_entry_uuid(temp.path(), "nobody").expect("find"), None);
        assert!(category_exists(temp.path(), "jane-doe"));
        assert_eq!(list_entries(temp.path()).expect("list"), vec!["jane-doe"]);
    }

    #[test]
    fn validate_reports_fields_flags_and_quotes() {
        let report = validate(ARTICLE);
        assert!(report.is_valid(), "{:?}", report.errors);
        assert_eq!(report.warnings.len(), 2);

        let broken = "---\nid: x\ntitle: 'Here's the deal'\n---\n";
        let report = validate(broken);
        assert!(report.errors[0].contains("line 3"));
        assert!(report.errors.iter().any(|error| error.contains("malformed")));

        let report = validate("---\nid: x\ntitle: 'It''s fine'\nhold: true\npublished: true\n---\n");
        assert_eq!(
            report.errors,
            vec![
                "missing required field: slug",
                "missing required field: article_category",
                "missing required field: article_author",
            ]
        );
        assert!(report.warnings.is_empty());
    }
}
