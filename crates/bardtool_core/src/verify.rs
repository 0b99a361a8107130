//! Checks a migrated article against the live production page.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::article::{article_route, quote_issues};
use crate::bard::{BlockKind, Node, RICH_TEXT_TYPE, text_runs};
use crate::document::{Document, MAIN_BLOCKS_KEY};
use crate::filesystem::scan_articles;
use crate::html::{decode_html, elements, extract_seo, main_by_id, scan_tags, strip_page_chrome};
use crate::redirects::{RedirectTable, resolve};
use crate::site::Site;
use crate::yaml::Value;

static UUID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$")
        .expect("uuid pattern is valid")
});
static WISTIA_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)incfile\.wistia\.com/medias/([a-z0-9]+)").expect("wistia pattern is valid")
});
static DATED_ARTICLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d{4}-\d{2}-\d{2}\.(.+)\.md").expect("dated article pattern is valid")
});

const TABLE_MARKERS: [&str; 4] = ["<table", "border=", "cellpadding", "cellspacing"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifyRules {
    /// `id` of the `<main>` element holding the article body.
    pub main_content_id: String,
    /// `div` / `section` containers dropped before collecting links.
    pub removed_container_classes: Vec<String>,
    /// Case-insensitive substrings that mark layout or sharing links.
    pub link_exclude_patterns: Vec<String>,
    /// Off-site URL prefixes that count as content links.
    pub external_link_prefixes: Vec<String>,
    /// Substrings of a production href that make it a call to action.
    pub cta_url_markers: Vec<String>,
    pub title_class: String,
    pub subtitle_class: String,
    pub required_seo_fields: Vec<String>,
    pub local_image_markers: Vec<String>,
}

impl Default for VerifyRules {
    fn default() -> Self {
        Self {
            main_content_id: "main-webpage-content".to_string(),
            removed_container_classes: ["featured", "podcast", "author"]
                .map(String::from)
                .to_vec(),
            link_exclude_patterns: [
                "#",
                "javascript:",
                "mailto:",
                "tel:",
                "/author/",
                "/get-bizee-podcast",
                "sharer.php",
                "share-offsite",
                "intent/tweet",
                "_next",
                "static",
                "twitter.com",
                "facebook.com",
                "linkedin.com",
                "x.com",
            ]
            .map(String::from)
            .to_vec(),
            external_link_prefixes: [
                "https://www.uspto.gov",
                "https://orders.bizee.com",
                "https://www.care.com",
                "https://www.taskrabbit.com",
                "https://www.canva.com",
                "https://kdp.amazon.com",
                "https://www.shopify.com",
                "https://www.amazon.com",
            ]
            .map(String::from)
            .to_vec(),
            cta_url_markers: ["orders.bizee.com", "trademark-name-search"]
                .map(String::from)
                .to_vec(),
            title_class: "mxOiBotP".to_string(),
            subtitle_class: "bOeUtvGC".to_string(),
            required_seo_fields: [
                "seo_title",
                "seo_meta_description",
                "seo_custom_meta_title",
                "seo_custom_meta_description",
                "seo_canonical",
                "seo_og_description",
                "seo_og_title",
                "seo_tw_title",
                "seo_tw_description",
            ]
            .map(String::from)
            .to_vec(),
            local_image_markers: ["public/assets/", "/tmp/"].map(String::from).to_vec(),
        }
    }
}

impl VerifyRules {
    fn is_local_image(&self, path: &str) -> bool {
        self.local_image_markers
            .iter()
            .any(|marker| path.contains(marker.as_str()))
    }

    fn is_excluded_link(&self, href: &str) -> bool {
        let lower = href.to_ascii_lowercase();
        self.link_exclude_patterns
            .iter()
            .any(|pattern| lower.contains(&pattern.to_ascii_lowercase()))
    }
}

pub struct VerifyContext<'a> {
    pub site: &'a Site,
    pub table: &'a RedirectTable,
    /// Contents of the released-articles routing file, when it exists.
    pub released_articles: Option<String>,
    /// Contents of the redirects routing file, when it exists.
    pub redirects_text: Option<String>,
    pub rules: &'a VerifyRules,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct VerificationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub info: Vec<String>,
}

impl VerificationReport {
    pub fn passed(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Runs every check; production comparisons are skipped when the page could
/// not be fetched.
pub fn verify_migration(
    path: &Path,
    document: &Document,
    raw: &str,
    production_html: Option<&str>,
    context: &VerifyContext<'_>,
) -> Result<VerificationReport> {
    let mut report = VerificationReport::default();
    let rules = context.rules;

    check_uuid(path, document, &mut report)?;
    check_published(document, &mut report);
    check_seo(document, production_html, rules, &mut report);
    check_images(document, rules, &mut report);
    match production_html {
        Some(html) => {
            check_links(document, html, context, &mut report);
            check_videos(document, html, &mut report);
            check_ctas(document, html, context, &mut report);
            check_tables(document, html, &mut report);
        }
        None => report
            .warnings
            .push("production HTML unavailable; link, video, CTA and table checks skipped".to_string()),
    }
    check_routing(path, document, context, &mut report);
    report.warnings.extend(quote_issues(raw));
    check_block_structure(document, &mut report);
    check_intro(document, &mut report);
    if let Some(html) = production_html {
        check_subtitle(document, html, rules, &mut report);
    }
    Ok(report)
}

fn check_uuid(path: &Path, document: &Document, report: &mut VerificationReport) -> Result<()> {
    let Some(uuid) = document.id() else {
        report.errors.push("id is missing".to_string());
        return Ok(());
    };
    if !UUID_RE.is_match(uuid) {
        report.errors.push(format!("id is not a valid UUID: {uuid}"));
        return Ok(());
    }

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let pattern = Regex::new(&format!(r"(?m)^id:\s*['\x22]?{}", regex::escape(uuid)))
        .context("failed to build uuid lookup pattern")?;
    let mut duplicates = Vec::new();
    for sibling in scan_articles(dir)? {
        if sibling.file_name() == path.file_name() {
            continue;
        }
        let text = fs::read_to_string(&sibling)
            .with_context(|| format!("failed to read {}", sibling.display()))?;
        if pattern.is_match(&text) {
            duplicates.push(
                sibling
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            );
        }
    }
    if duplicates.is_empty() {
        report.info.push("id is unique".to_string());
    } else {
        report
            .errors
            .push(format!("id is duplicated in: {}", duplicates.join(", ")));
    }
    Ok(())
}

fn check_published(document: &Document, report: &mut VerificationReport) {
    match document.get("published") {
        None | Some(Value::Null) => report.errors.push("published is missing".to_string()),
        Some(Value::Bool(true)) => {}
        Some(Value::Bool(false)) => report
            .errors
            .push("published is false; migrated articles must be published".to_string()),
        Some(other) => report
            .warnings
            .push(format!("published has an unexpected value: {other:?}")),
    }
}

fn check_seo(
    document: &Document,
    production_html: Option<&str>,
    rules: &VerifyRules,
    report: &mut VerificationReport,
) {
    let missing = rules
        .required_seo_fields
        .iter()
        .filter(|field| document.get(field).is_none_or(Value::is_null))
        .map(String::as_str)
        .collect::<Vec<_>>();
    if !missing.is_empty() {
        report
            .errors
            .push(format!("missing SEO fields: {}", missing.join(", ")));
    }

    let Some(html) = production_html else {
        return;
    };
    let production = extract_seo(html);
    let pairs = [
        ("title", production.meta_title, "seo_custom_meta_title"),
        ("description", production.meta_description, "seo_custom_meta_description"),
    ];
    for (label, expected, field) in pairs {
        let Some(expected) = expected else {
            continue;
        };
        let actual = document.get_str(field).unwrap_or_default();
        if actual != expected {
            report.warnings.push(format!(
                "SEO {label} mismatch: production {expected:?}, article {actual:?}"
            ));
        }
    }
}

fn check_images(document: &Document, rules: &VerifyRules, report: &mut VerificationReport) {
    match document.get_str("featured_image").map(str::trim) {
        None | Some("") => report.errors.push("featured_image is missing".to_string()),
        Some(path) if rules.is_local_image(path) => report
            .errors
            .push(format!("featured_image points at a local file: {path}")),
        Some(_) => {}
    }

    let mut content_images = 0;
    for block in raw_blocks(document) {
        let Some(map) = block.as_map() else {
            continue;
        };
        if !matches!(map.get_str("type"), Some("article_image" | "image")) {
            continue;
        }
        if let Some(image) = map.get_str("image") {
            content_images += 1;
            if rules.is_local_image(image) {
                report
                    .errors
                    .push(format!("content image points at a local file: {image}"));
            }
        }
    }
    report.info.push(format!("content images: {content_images}"));
}

/// Site links become absolute production URLs after redirect resolution so
/// both sides compare equal.
fn canonical_link(href: &str, context: &VerifyContext<'_>) -> String {
    match context.site.local_path(href) {
        Some(path) => context
            .site
            .production_link(&resolve(&path, context.table)),
        None => href.trim().to_string(),
    }
}

fn article_links(document: &Document, context: &VerifyContext<'_>) -> BTreeSet<String> {
    let Ok(blocks) = document.main_blocks() else {
        return BTreeSet::new();
    };
    blocks
        .iter()
        .filter(|block| block.is_rich_text())
        .flat_map(|block| {
            text_runs(&block.nodes)
                .into_iter()
                .filter_map(|(_, run)| run.link().and_then(|link| link.href()).map(String::from))
                .collect::<Vec<_>>()
        })
        .map(|href| canonical_link(&href, context))
        .collect()
}

/// Inner HTML of the article's `<main>` element with layout sections removed.
fn main_content(html: &str, rules: &VerifyRules) -> Option<String> {
    let main = main_by_id(html, &rules.main_content_id)?;
    Some(strip_page_chrome(main, &rules.removed_container_classes))
}

fn production_links(html: &str, context: &VerifyContext<'_>) -> BTreeSet<String> {
    let rules = context.rules;
    let Some(content) = main_content(html, rules) else {
        return BTreeSet::new();
    };
    scan_tags(&content, "a")
        .iter()
        .filter_map(|tag| tag.attr("href"))
        .map(decode_html)
        .filter(|href| !href.trim().is_empty() && !rules.is_excluded_link(href))
        .filter(|href| {
            context.site.local_path(href).is_some()
                || rules
                    .external_link_prefixes
                    .iter()
                    .any(|prefix| href.starts_with(prefix.as_str()))
        })
        .map(|href| canonical_link(&href, context))
        .collect()
}

fn button_urls(document: &Document, context: &VerifyContext<'_>) -> BTreeSet<String> {
    raw_blocks(document)
        .iter()
        .filter_map(Value::as_map)
        .filter(|map| map.get_str("type") == Some(BlockKind::Button.as_str()))
        .filter_map(|map| map.get_str("url"))
        .filter(|url| !url.trim().is_empty())
        .map(|url| canonical_link(url, context))
        .collect()
}

fn check_links(
    document: &Document,
    html: &str,
    context: &VerifyContext<'_>,
    report: &mut VerificationReport,
) {
    let in_article = article_links(document, context);
    let in_production = production_links(html, context);
    let buttons = button_urls(document, context);

    let missing = in_production
        .iter()
        .filter(|link| !in_article.contains(*link) && !buttons.contains(*link))
        .collect::<Vec<_>>();
    let extra = in_article
        .iter()
        .filter(|link| !in_production.contains(*link))
        .filter(|link| context.site.local_path(link).is_some())
        .collect::<Vec<_>>();

    if !missing.is_empty() {
        report.errors.push(format!(
            "missing links ({}): {}",
            missing.len(),
            join_limited(&missing, 10)
        ));
    }
    if !extra.is_empty() {
        report.warnings.push(format!(
            "extra site links in article ({}): {}",
            extra.len(),
            join_limited(&extra, 5)
        ));
    }
    report.info.push(format!(
        "links: {} in article, {} in production",
        in_article.len(),
        in_production.len()
    ));
}

fn check_videos(document: &Document, html: &str, report: &mut VerificationReport) {
    let in_article = raw_blocks(document)
        .iter()
        .filter_map(Value::as_map)
        .filter(|map| map.get_str("type") == Some("video"))
        .filter_map(|map| map.get_str("video_url"))
        .map(String::from)
        .collect::<BTreeSet<_>>();
    let in_production = WISTIA_RE
        .captures_iter(html)
        .map(|captures| format!("https://incfile.wistia.com/medias/{}", &captures[1]))
        .collect::<BTreeSet<_>>();

    let missing = in_production.difference(&in_article).collect::<Vec<_>>();
    if !missing.is_empty() {
        report.errors.push(format!(
            "missing videos ({}): {}",
            missing.len(),
            join_limited(&missing, 10)
        ));
    }
    report.info.push(format!(
        "videos: {} in article, {} in production",
        in_article.len(),
        in_production.len()
    ));
}

fn check_ctas(
    document: &Document,
    html: &str,
    context: &VerifyContext<'_>,
    report: &mut VerificationReport,
) {
    let buttons = button_urls(document, context);
    let production = main_content(html, context.rules)
        .map(|content| {
            scan_tags(&content, "a")
                .iter()
                .filter_map(|tag| tag.attr("href"))
                .map(decode_html)
                .filter(|href| {
                    context
                        .rules
                        .cta_url_markers
                        .iter()
                        .any(|marker| href.contains(marker.as_str()))
                })
                .map(|href| canonical_link(&href, context))
                .collect::<BTreeSet<_>>()
        })
        .unwrap_or_default();

    let missing = production.difference(&buttons).collect::<Vec<_>>();
    if !missing.is_empty() {
        report.errors.push(format!(
            "missing CTAs ({}): {}",
            missing.len(),
            join_limited(&missing, 5)
        ));
    }
    report.info.push(format!(
        "CTAs: {} in article, {} in production",
        buttons.len(),
        production.len()
    ));
}

fn check_tables(document: &Document, html: &str, report: &mut VerificationReport) {
    let tables = raw_blocks(document)
        .iter()
        .filter_map(Value::as_map)
        .filter(|map| map.get_str("type") == Some("info_table"))
        .count();
    let lower = html.to_ascii_lowercase();
    let production_has_tables = TABLE_MARKERS.iter().any(|marker| lower.contains(marker));
    if production_has_tables && tables == 0 {
        report.warnings.push(
            "production page may contain tables that need info_table blocks".to_string(),
        );
    }
    report.info.push(format!("info tables: {tables}"));
}

fn check_routing(
    path: &Path,
    document: &Document,
    context: &VerifyContext<'_>,
    report: &mut VerificationReport,
) {
    let Some(category) = document.get_str("slug_category").filter(|value| !value.is_empty()) else {
        report.errors.push("slug_category is missing".to_string());
        return;
    };
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let Some(slug) = DATED_ARTICLE_RE
        .captures(&file_name)
        .and_then(|captures| captures.get(1))
        .map(|slug| slug.as_str().to_string())
    else {
        report
            .warnings
            .push("could not extract the slug from the file name".to_string());
        return;
    };

    let route = article_route(category, &slug);
    if let Some(released) = &context.released_articles
        && !released.contains(&route)
    {
        report
            .errors
            .push(format!("route not registered in released articles: {route}"));
    }
    let old_path = format!("/articles/{slug}");
    if let Some(redirects) = &context.redirects_text
        && !redirects.contains(&old_path)
    {
        report
            .warnings
            .push(format!("redirect may be missing: {old_path} => {route}"));
    }
}

fn raw_blocks(document: &Document) -> &[Value] {
    document
        .get(MAIN_BLOCKS_KEY)
        .and_then(Value::as_seq)
        .unwrap_or_default()
}

fn check_block_structure(document: &Document, report: &mut VerificationReport) {
    let mut previous_rich_text = None;
    for (index, block) in raw_blocks(document).iter().enumerate() {
        let map = block.as_map();
        for field in ["type", "enabled"] {
            if !map.is_some_and(|map| map.contains_key(field)) {
                report
                    .errors
                    .push(format!("block #{index} is missing `{field}`"));
            }
        }
        let is_rich_text = map.and_then(|map| map.get_str("type")) == Some(RICH_TEXT_TYPE);
        if is_rich_text {
            if let Some(previous) = previous_rich_text {
                report.warnings.push(format!(
                    "consecutive rich_text blocks #{previous} and #{index} should be combined"
                ));
            }
            previous_rich_text = Some(index);
        } else {
            previous_rich_text = None;
        }
    }
}

fn check_intro(document: &Document, report: &mut VerificationReport) {
    let nodes = document
        .get("intro")
        .and_then(Value::as_seq)
        .unwrap_or_default();
    if nodes.is_empty() {
        report.warnings.push("intro is empty".to_string());
        return;
    }
    let paragraphs = nodes
        .iter()
        .map(Node::from_value)
        .filter(|node| node.type_name() == "paragraph")
        .count();
    if paragraphs > 1 {
        report.warnings.push(format!(
            "intro contains {paragraphs} paragraphs; only the first belongs there"
        ));
    }
}

fn production_subtitle(html: &str, rules: &VerifyRules) -> Option<String> {
    let title = elements(html, "h1")
        .into_iter()
        .find(|element| element.tag.class_contains(&rules.title_class))?;
    let rest = &html[title.outer_end..];
    elements(rest, "p")
        .into_iter()
        .find(|element| element.tag.class_contains(&rules.subtitle_class))
        .map(|element| element.text(rest))
        .filter(|text| !text.is_empty())
}

fn check_subtitle(
    document: &Document,
    html: &str,
    rules: &VerifyRules,
    report: &mut VerificationReport,
) {
    let article = document
        .get_str("subtitle")
        .map(str::trim)
        .filter(|text| !text.is_empty());
    match (article, production_subtitle(html, rules)) {
        (None, Some(production)) => report
            .errors
            .push(format!("subtitle is missing; production has {production:?}")),
        (Some(article), Some(production)) if article != production => report.warnings.push(
            format!("subtitle mismatch: article {article:?}, production {production:?}"),
        ),
        (Some(article), None) => report.warnings.push(format!(
            "article has subtitle {article:?} but production has none"
        )),
        _ => {}
    }
}

fn join_limited<T: AsRef<str>>(items: &[T], limit: usize) -> String {
    let mut shown = items
        .iter()
        .take(limit)
        .map(|item| item.as_ref().to_string())
        .collect::<Vec<_>>();
    if items.len() > limit {
        shown.push(format!("... and {} more", items.len() - limit));
    }
    shown.join(", ")
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    use super::*;

    const UUID: &str = "3f0a6a3e-2f43-4a55-9c1e-6a1f0d9b2c10";

    fn article() -> String {
        format!(
            "---
id: {UUID}
title: 'Start an LLC'
subtitle: 'Everything you need'
seo_title: 'Start an LLC'
seo_meta_description: 'How to'
seo_custom_meta_title: 'Start an LLC | Bizee'
seo_custom_meta_description: 'Steps & costs'
seo_canonical: 'https://bizee.com/articles/start-an-llc'
seo_og_description: x
seo_og_title: x
seo_tw_title: x
seo_tw_description: x
featured_image: articles/featured/start-an-llc.webp
slug_category: business-formation
published: true
intro:
  -
    type: paragraph
    content:
      -
        type: text
        text: 'Intro.'
main_blocks:
  -
    id: m1
    version: rich_text_1
    content:
      -
        type: paragraph
        content:
          -
            type: text
            marks:
              -
                type: link
                attrs:
                  href: /articles/taxes/llc-taxes
                  rel: null
                  target: null
                  title: null
            text: 'LLC taxes'
    type: rich_text
    enabled: true
  -
    id: b1
    version: article_button_1
    url: 'https://orders.bizee.com/form-order-now'
    type: article_button
    enabled: true
---
"
        )
    }

    const PRODUCTION: &str = r#"<html><head><title>Start an LLC | Bizee</title>
<meta name="description" content="Steps &amp; costs"></head>
<body><main id="main-webpage-content">
<header><a href="/pricing">Pricing</a></header>
<h1 class="x mxOiBotP">Start an LLC</h1>
<p class="bOeUtvGC y">Everything you need</p>
<div class="rich-t"><p>Read about <a href="https://bizee.com/articles/llc-taxes">LLC taxes</a>.</p>
<a href="https://orders.bizee.com/form-order-now">GET STARTED</a>
<a href="https://twitter.com/intent/tweet?x">Share</a></div>
<div class="featured-articles"><a href="/articles/other">Other</a></div>
<aside><a href="/articles/sidebar">Sidebar</a></aside>
</main></body></html>"#;

    fn fixture() -> (tempfile::TempDir, std::path::PathBuf) {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("2024-03-01.start-an-llc.md");
        fs::write(&path, article()).expect("write article");
        (temp, path)
    }

    fn run(path: &Path, raw: &str, html: Option<&str>, released: Option<&str>) -> VerificationReport {
        let document = Document::parse(raw).expect("parse");
        let site = Site::default();
        let table = RedirectTable::from_pairs([("/articles/llc-taxes", "/articles/taxes/llc-taxes")]);
        let rules = VerifyRules::default();
        let context = VerifyContext {
            site: &site,
            table: &table,
            released_articles: released.map(String::from),
            redirects_text: Some("'/articles/start-an-llc' => '/articles/business-formation/start-an-llc',".to_string()),
            rules: &rules,
        };
        verify_migration(path, &document, raw, html, &context).expect("verify")
    }

    #[test]
    fn clean_migration_passes() {
        let (_temp, path) = fixture();
        let report = run(
            &path,
            &article(),
            Some(PRODUCTION),
            Some("'/articles/business-formation/start-an-llc',"),
        );
        assert_eq!(report.errors, Vec::<String>::new());
        assert_eq!(report.warnings, Vec::<String>::new());
        assert!(report.info.iter().any(|line| line == "links: 1 in article, 2 in production"));
        assert!(report.passed());
    }

    #[test]
    fn duplicate_ids_and_unpublished_articles_fail() {
        let (temp, path) = fixture();
        fs::write(
            temp.path().join("2023-01-01.other.md"),
            format!("---\nid: {UUID}\n---\n"),
        )
        .expect("write sibling");
        let raw = article().replace("published: true", "published: false");
        let report = run(&path, &raw, None, None);
        assert!(report.errors.iter().any(|error| error.contains("2023-01-01.other.md")));
        assert!(report.errors.iter().any(|error| error.starts_with("published is false")));
        assert!(report.warnings[0].starts_with("production HTML unavailable"));
    }

    #[test]
    fn missing_content_is_reported_against_production() {
        let (_temp, path) = fixture();
        let html = PRODUCTION.replace(
            "</div>\n<div class=\"featured",
            "<a href=\"https://www.uspto.gov/trademarks\">USPTO</a>\n<script src=\"https://fast.wistia.com/x\"></script>incfile.wistia.com/medias/abc123<table></table></div>\n<div class=\"featured",
        );
        let raw = article()
            .replace("subtitle: 'Everything you need'\n", "")
            .replace("featured_image: articles/featured/start-an-llc.webp", "featured_image: public/assets/a.webp");
        let report = run(&path, &raw, Some(&html), Some("return [];"));

        let joined = report.errors.join("\n");
        assert!(joined.contains("missing links (1): https://www.uspto.gov/trademarks"));
        assert!(joined.contains("missing videos (1): https://incfile.wistia.com/medias/abc123"));
        assert!(joined.contains("featured_image points at a local file"));
        assert!(joined.contains("route not registered"));
        assert!(joined.contains("subtitle is missing"));
        assert!(report.warnings.iter().any(|warning| warning.contains("info_table")));
    }

    #[test]
    fn structure_checks_flag_blocks_and_intro() {
        let (_temp, path) = fixture();
        let raw = article().replace(
            "  -\n    id: b1\n",
            "  -\n    id: m2\n    version: rich_text_1\n    type: rich_text\n  -\n    id: b1\n",
        );
        let raw = raw.replace(
            "        text: 'Intro.'\n",
            "        text: 'Intro.'\n  -\n    type: paragraph\n    content:\n      -\n        type: text\n        text: 'Second.'\n",
        );
        let report = run(&path, &raw, None, None);
        assert!(report.errors.contains(&"block #1 is missing `enabled`".to_string()));
        assert!(report.warnings.iter().any(|warning| warning.contains("#0 and #1")));
        assert!(report.warnings.iter().any(|warning| warning.contains("intro contains 2 paragraphs")));
    }

    #[test]
    fn subtitle_is_read_after_the_title() {
        let rules = VerifyRules::default();
        assert_eq!(
            production_subtitle(PRODUCTION, &rules).as_deref(),
            Some("Everything you need")
        );
        assert_eq!(production_subtitle("<p class=\"bOeUtvGC\">x</p>", &rules), None);
    }
}
