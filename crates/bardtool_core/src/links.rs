//! Anchor-text link maps from production HTML, and adding those links to
//! article documents.

use serde::{Deserialize, Serialize};

use crate::bard::{Block, Node, text_runs};
use crate::builders::AnchorLink;
use crate::document::Document;
use crate::error::MigrationError;
use crate::html::{elements, main_by_id, strip_page_chrome};
use crate::inject::inject_blocks;
use crate::locate::{MatchKind, MatchOptions, locate_in_blocks};
use crate::reconcile::reconcile;
use crate::redirects::RedirectTable;
use crate::site::Site;
use crate::text::{contains_ignore_case, word_overlap};

/// Which anchors count as content links.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ExclusionRules {
    /// Minimum anchor text length (chars) for the link map.
    pub min_text_len: usize,
    /// Whole anchor texts that never enter the link map (case-insensitive).
    pub skip_texts: Vec<String>,
    /// Anchor text prefixes that mark navigation links.
    pub navigation_prefixes: Vec<String>,
    /// Minimum anchor text length (chars) for `extract-links`.
    pub min_extract_text_len: usize,
    /// `id` of the `<main>` element that holds the article body.
    pub main_content_id: String,
    /// `div` / `section` containers outside the article body.
    pub removed_container_classes: Vec<String>,
}

impl Default for ExclusionRules {
    fn default() -> Self {
        Self {
            min_text_len: 3,
            skip_texts: ["share", "follow", "read more", "click here"]
                .map(String::from)
                .to_vec(),
            navigation_prefixes: ["Home", "Menu", "Skip", "Search", "Login", "Sign"]
                .map(String::from)
                .to_vec(),
            min_extract_text_len: 2,
            main_content_id: "main-webpage-content".to_string(),
            removed_container_classes: ["featured", "podcast", "author"]
                .map(String::from)
                .to_vec(),
        }
    }
}

impl ExclusionRules {
    fn is_skip_text(&self, text: &str) -> bool {
        self.skip_texts
            .iter()
            .any(|skip| skip.eq_ignore_ascii_case(text))
    }

    fn is_navigation(&self, text: &str) -> bool {
        self.navigation_prefixes.iter().any(|prefix| {
            text.get(..prefix.len())
                .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
        })
    }
}

/// Maps an article phrase to the anchor text it should borrow a URL from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LinkAlias {
    pub phrase: String,
    pub anchor: String,
}

/// Anchor text to href, in page order. A repeated text keeps the longer href.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LinkMap {
    entries: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "via", rename_all = "snake_case")]
pub enum LookupKind {
    Exact,
    Substring,
    Fuzzy { score: f64 },
    Alias,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkMatch {
    /// Anchor text in the link map that supplied the href.
    pub anchor: String,
    pub href: String,
    pub kind: LookupKind,
}

impl LinkMap {
    pub fn insert(&mut self, text: &str, href: &str) {
        match self.entries.iter_mut().find(|(existing, _)| existing == text) {
            Some((_, current)) => {
                if href.len() > current.len() {
                    *current = href.to_string();
                }
            }
            None => self.entries.push((text.to_string(), href.to_string())),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, text: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == text)
            .map(|(_, href)| href.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(text, href)| (text.as_str(), href.as_str()))
    }

    /// Every entry as a link request, in page order.
    pub fn anchors(&self) -> Vec<AnchorLink> {
        self.iter()
            .map(|(text, href)| AnchorLink {
                text: text.to_string(),
                href: href.to_string(),
            })
            .collect()
    }

    /// Finds the href for an article phrase: equal text, then containment
    /// either way, then the best word overlap at or above the threshold,
    /// then a configured alias.
    pub fn lookup(
        &self,
        target: &str,
        options: &MatchOptions,
        aliases: &[LinkAlias],
    ) -> Option<LinkMatch> {
        let target = target.trim();
        if target.is_empty() {
            return None;
        }
        let hit = |text: &str, href: &str, kind: LookupKind| LinkMatch {
            anchor: text.to_string(),
            href: href.to_string(),
            kind,
        };

        if let Some((text, href)) = self.iter().find(|(text, _)| text.eq_ignore_ascii_case(target)) {
            return Some(hit(text, href, LookupKind::Exact));
        }
        if let Some((text, href)) = self
            .iter()
            .find(|(text, _)| contains_ignore_case(text, target) || contains_ignore_case(target, text))
        {
            return Some(hit(text, href, LookupKind::Substring));
        }
        if options.fuzzy {
            let mut best: Option<(f64, &str, &str)> = None;
            for (text, href) in self.iter() {
                let score = word_overlap(text, target, options.min_word_len).ratio();
                if score >= options.fuzzy_threshold && best.is_none_or(|(top, _, _)| score > top) {
                    best = Some((score, text, href));
                }
            }
            if let Some((score, text, href)) = best {
                return Some(hit(text, href, LookupKind::Fuzzy { score }));
            }
        }
        aliases
            .iter()
            .filter(|alias| alias.phrase.eq_ignore_ascii_case(target))
            .find_map(|alias| {
                self.iter()
                    .find(|(text, _)| contains_ignore_case(text, &alias.anchor))
                    .map(|(text, href)| hit(text, href, LookupKind::Alias))
            })
    }
}

/// Collects `(anchor text, href)` pairs from every `<a>` with visible text.
pub fn extract_link_map(html: &str, rules: &ExclusionRules) -> LinkMap {
    let mut map = LinkMap::default();
    for element in elements(html, "a") {
        let href = element.tag.attr("href").unwrap_or_default().trim();
        if href.is_empty() || href.starts_with('#') {
            continue;
        }
        let text = element.text(html);
        if text.chars().count() < rules.min_text_len || rules.is_skip_text(&text) {
            continue;
        }
        map.insert(&text, href);
    }
    log::debug!("link map holds {} anchors", map.len());
    map
}

/// Article body of a production page: the configured `<main>`, else the first
/// `<main>`, else the whole page, with navigation and layout sections removed.
pub fn content_region(html: &str, rules: &ExclusionRules) -> String {
    let main = main_by_id(html, &rules.main_content_id)
        .or_else(|| elements(html, "main").first().map(|element| element.inner_html(html)))
        .unwrap_or(html);
    strip_page_chrome(main, &rules.removed_container_classes)
}

/// Link map of the article body only, for adding every production link.
pub fn extract_content_link_map(html: &str, rules: &ExclusionRules) -> LinkMap {
    extract_link_map(&content_region(html, rules), rules)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkType {
    Internal,
    External,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkEntry {
    pub url: String,
    pub original_url: String,
    pub text: String,
    #[serde(rename = "type")]
    pub link_type: LinkType,
    pub was_redirected: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LinksReport {
    pub links: Vec<LinkEntry>,
    pub internal: usize,
    pub external: usize,
    pub redirected: usize,
}

/// Every content link on a page, with internal paths resolved through the
/// redirect table.
pub fn extract_links(
    html: &str,
    site: &Site,
    table: &RedirectTable,
    rules: &ExclusionRules,
) -> LinksReport {
    let mut report = LinksReport::default();
    for element in elements(html, "a") {
        let href = element.tag.attr("href").unwrap_or_default().trim();
        if href.is_empty() || href == "#" {
            continue;
        }
        let text = element.text(html);
        if text.chars().count() < rules.min_extract_text_len || rules.is_navigation(&text) {
            continue;
        }

        let entry = if site.is_external(href) {
            report.external += 1;
            LinkEntry {
                url: href.to_string(),
                original_url: href.to_string(),
                text,
                link_type: LinkType::External,
                was_redirected: false,
            }
        } else {
            report.internal += 1;
            let path = site.local_path(href).unwrap_or_else(|| href.to_string());
            let url = table.lookup(&path).unwrap_or(&path).to_string();
            let was_redirected = url != href && url != path;
            if was_redirected {
                report.redirected += 1;
            }
            LinkEntry {
                url,
                original_url: href.to_string(),
                text,
                link_type: LinkType::Internal,
                was_redirected,
            }
        };
        report.links.push(entry);
    }
    report
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LinkStatus {
    Added { matched: String, kind: MatchKind },
    AlreadyLinked,
    NotFound { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkOutcome {
    pub text: String,
    pub href: String,
    #[serde(flatten)]
    pub status: LinkStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LinkRunReport {
    pub requested: usize,
    pub added: usize,
    pub already_linked: usize,
    pub not_found: usize,
    pub merged_blocks: usize,
    pub items: Vec<LinkOutcome>,
}

/// Adds each requested link independently. Text that is already linked is
/// left alone; text that cannot be located is reported and skipped. Blocks
/// are reconciled once after all links are in.
pub fn apply_links(
    document: &mut Document,
    links: &[AnchorLink],
    options: &MatchOptions,
    site: &Site,
) -> Result<LinkRunReport, MigrationError> {
    let mut blocks = document.main_blocks()?;
    let mut report = LinkRunReport {
        requested: links.len(),
        ..LinkRunReport::default()
    };

    for link in links {
        let status = apply_one(&mut blocks, link, options, site);
        match &status {
            LinkStatus::Added { matched, .. } => {
                log::debug!("linked {matched:?} -> {}", link.href);
                report.added += 1;
            }
            LinkStatus::AlreadyLinked => report.already_linked += 1,
            LinkStatus::NotFound { reason } => {
                log::warn!("{reason}");
                report.not_found += 1;
            }
        }
        report.items.push(LinkOutcome {
            text: link.text.clone(),
            href: link.href.clone(),
            status,
        });
    }

    if report.added > 0 {
        let before = blocks.len();
        let blocks = reconcile(blocks);
        report.merged_blocks = before - blocks.len();
        document.set_main_blocks(&blocks);
    }
    Ok(report)
}

fn apply_one(
    blocks: &mut [Block],
    link: &AnchorLink,
    options: &MatchOptions,
    site: &Site,
) -> LinkStatus {
    if is_already_linked(blocks, &link.text) {
        return LinkStatus::AlreadyLinked;
    }
    let Some(span) = locate_in_blocks(blocks, &link.text, options) else {
        return LinkStatus::NotFound {
            reason: MigrationError::SpanNotFound(link.text.clone()).to_string(),
        };
    };
    let node = Node::link(&span.matched, &link.href, site);
    match inject_blocks(blocks, &span, vec![node]) {
        Ok(()) => LinkStatus::Added {
            matched: span.matched,
            kind: span.kind,
        },
        Err(error) => LinkStatus::NotFound {
            reason: error.to_string(),
        },
    }
}

fn is_already_linked(blocks: &[Block], target: &str) -> bool {
    let target = target.trim();
    blocks
        .iter()
        .filter(|block| block.is_rich_text())
        .flat_map(|block| text_runs(&block.nodes))
        .any(|(_, run)| run.is_linked() && contains_ignore_case(&run.text, target))
}

/// Resolves phrases against a link map. Phrases without a match come back
/// in the second list.
pub fn plan_links(
    map: &LinkMap,
    phrases: &[String],
    options: &MatchOptions,
    aliases: &[LinkAlias],
) -> (Vec<AnchorLink>, Vec<String>) {
    let mut planned = Vec::new();
    let mut unmatched = Vec::new();
    for phrase in phrases {
        match map.lookup(phrase, options, aliases) {
            Some(found) => {
                log::debug!("{phrase:?} takes href from {:?} ({:?})", found.anchor, found.kind);
                planned.push(AnchorLink {
                    text: phrase.clone(),
                    href: found.href,
                });
            }
            None => unmatched.push(phrase.clone()),
        }
    }
    (planned, unmatched)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::bard::{LinkAttrs, Mark, TextRun, flatten};
    use crate::builders::EXTERNAL_TARGET;

    const PAGE: &str = r##"
<nav><a href="/">Home</a><a href="/search">Search articles</a></nav>
<p>Before you <a href="/articles/start-online-business">start an online business</a>, pick a
<a href="https://bizee.com/articles/business-name-generator">killer name for it</a>.</p>
<p><a href="/old-llc">Limited Liability Company (LLC)</a> and the
<a href="https://www.irs.gov/ein">IRS EIN page</a>.</p>
<p><a href="/x">Share</a> <a href="#top">Back to top</a> <a href="/y">ok</a>
<a href="/llc">Limited Liability Company (LLC)</a></p>
"##;

    fn article(paragraphs: &[&str]) -> Document {
        let mut document = Document::parse("---\nid: a1\ntitle: 'Test'\nmain_blocks: []\n---\n")
            .expect("parse");
        let blocks = paragraphs
            .iter()
            .enumerate()
            .map(|(index, text)| {
                Block::rich_text(&format!("b{index}"), vec![Node::paragraph(vec![Node::text(*text)])])
            })
            .collect::<Vec<_>>();
        document.set_main_blocks(&blocks);
        document
    }

    #[test]
    fn link_map_skips_short_and_generic_anchors() {
        let map = extract_link_map(PAGE, &ExclusionRules::default());
        assert_eq!(map.get("Share"), None);
        assert_eq!(map.get("ok"), None);
        assert_eq!(map.get("Back to top"), None);
        assert_eq!(map.get("Limited Liability Company (LLC)"), Some("/old-llc"));
        assert_eq!(map.get("killer name for it"), Some("https://bizee.com/articles/business-name-generator"));
    }

    #[test]
    fn link_map_keeps_longer_href_for_repeated_text() {
        let mut map = LinkMap::default();
        map.insert("LLC", "/a");
        map.insert("LLC", "/articles/llc");
        map.insert("LLC", "/b");
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("LLC"), Some("/articles/llc"));
    }

    #[test]
    fn lookup_falls_back_to_fuzzy_overlap() {
        let map = extract_link_map(PAGE, &ExclusionRules::default());
        let found = map
            .lookup("come up with a killer name", &MatchOptions::default(), &[])
            .expect("fuzzy hit");
        assert_eq!(found.href, "https://bizee.com/articles/business-name-generator");
        assert!(matches!(found.kind, LookupKind::Fuzzy { score } if score >= 0.6));

        let strict = MatchOptions {
            fuzzy: false,
            ..MatchOptions::default()
        };
        assert_eq!(map.lookup("come up with a killer name", &strict, &[]), None);
    }

    #[test]
    fn lookup_prefers_exact_then_substring_then_alias() {
        let map = extract_link_map(PAGE, &ExclusionRules::default());
        let options = MatchOptions::default();
        let exact = map.lookup("irs ein page", &options, &[]).expect("exact");
        assert_eq!(exact.kind, LookupKind::Exact);
        let substring = map.lookup("online business", &options, &[]).expect("substring");
        assert_eq!(substring.kind, LookupKind::Substring);
        assert_eq!(substring.href, "/articles/start-online-business");

        let aliases = vec![LinkAlias {
            phrase: "employer number".to_string(),
            anchor: "EIN".to_string(),
        }];
        let alias = map.lookup("employer number", &options, &aliases).expect("alias");
        assert_eq!(alias.kind, LookupKind::Alias);
        assert_eq!(alias.href, "https://www.irs.gov/ein");
    }

    #[test]
    fn extract_links_classifies_and_resolves() {
        let table = RedirectTable::from_pairs([("/old-llc", "/articles/llc")]);
        let report = extract_links(PAGE, &Site::default(), &table, &ExclusionRules::default());
        let texts = report.links.iter().map(|link| link.text.as_str()).collect::<Vec<_>>();
        assert!(!texts.contains(&"Home"));
        assert!(!texts.contains(&"Search articles"));
        assert!(texts.contains(&"ok"));

        let llc = &report.links[2];
        assert_eq!(llc.url, "/articles/llc");
        assert!(llc.was_redirected);

        let generator = &report.links[1];
        assert_eq!(generator.url, "/articles/business-name-generator");
        assert!(!generator.was_redirected);
        assert_eq!(generator.link_type, LinkType::Internal);

        let irs = report
            .links
            .iter()
            .find(|link| link.text == "IRS EIN page")
            .expect("irs link");
        assert_eq!(irs.link_type, LinkType::External);
        assert_eq!(report.external, 1);
        assert_eq!(report.redirected, 1);
    }

    #[test]
    fn apply_links_adds_reports_and_reconciles() {
        let mut document = article(&[
            "Here is how to start an online business today.",
            "Pick a name you love.",
        ]);
        let before = flatten(&document.main_blocks().expect("blocks")[0].nodes);
        let links = vec![
            AnchorLink {
                text: "start an online business".to_string(),
                href: "https://www.sba.gov/online".to_string(),
            },
            AnchorLink {
                text: "quantum accounting".to_string(),
                href: "/nowhere".to_string(),
            },
        ];
        let report = apply_links(&mut document, &links, &MatchOptions::default(), &Site::default())
            .expect("apply");
        assert_eq!((report.added, report.not_found, report.merged_blocks), (1, 1, 1));
        assert!(matches!(report.items[1].status, LinkStatus::NotFound { .. }));

        let blocks = document.main_blocks().expect("blocks");
        assert_eq!(blocks.len(), 1);
        assert!(flatten(&blocks[0].nodes).starts_with(&before));
        let linked = text_runs(&blocks[0].nodes)
            .into_iter()
            .find(|(_, run)| run.is_linked())
            .map(|(_, run)| run.clone())
            .expect("linked run");
        assert_eq!(linked.text, "start an online business");
        assert_eq!(
            linked.link().and_then(|attrs| attrs.target()),
            Some(EXTERNAL_TARGET)
        );
    }

    #[test]
    fn apply_links_skips_text_that_is_already_linked() {
        let mut document = article(&[]);
        let linked = Node::Text(TextRun::with_marks(
            "form an LLC",
            vec![Mark::Link(LinkAttrs::new("/articles/llc", None, None, None))],
        ));
        document.set_main_blocks(&[Block::rich_text(
            "b0",
            vec![Node::paragraph(vec![Node::text("First, "), linked])],
        )]);
        let original = document.clone();
        let report = apply_links(
            &mut document,
            &[AnchorLink {
                text: "form an LLC".to_string(),
                href: "/other".to_string(),
            }],
            &MatchOptions::default(),
            &Site::default(),
        )
        .expect("apply");
        assert_eq!(report.already_linked, 1);
        assert_eq!(document, original);
    }

    #[test]
    fn plan_links_splits_matched_and_unmatched() {
        let map = extract_link_map(PAGE, &ExclusionRules::default());
        let phrases = vec!["start an online business".to_string(), "zebra".to_string()];
        let (planned, unmatched) = plan_links(&map, &phrases, &MatchOptions::default(), &[]);
        assert_eq!(planned.len(), 1);
        assert_eq!(planned[0].href, "/articles/start-online-business");
        assert_eq!(unmatched, vec!["zebra".to_string()]);
    }

    #[test]
    fn content_link_map_leaves_out_navigation() {
        let rules = ExclusionRules::default();
        let map = extract_content_link_map(PAGE, &rules);
        assert_eq!(map.get("Search articles"), None);
        assert_eq!(map.get("start an online business"), Some("/articles/start-online-business"));

        let wrapped = r#"<header><a href="/pricing">Pricing plans</a></header>
<main id="main-webpage-content"><p><a href="/articles/llc">form an LLC</a></p>
<div class="featured-articles"><a href="/articles/ein">Get an EIN</a></div></main>"#;
        let map = extract_content_link_map(wrapped, &rules);
        assert_eq!(map.anchors().len(), 1);
        assert_eq!(map.get("form an LLC"), Some("/articles/llc"));
    }

    #[test]
    fn bulk_links_from_the_body_skip_navigation_phrases() {
        let mut document = article(&["You can search our articles archive for more."]);
        let original = document.clone();
        let map = extract_content_link_map(PAGE, &ExclusionRules::default());
        let exact = MatchOptions {
            fuzzy: false,
            ..MatchOptions::default()
        };
        let report = apply_links(&mut document, &map.anchors(), &exact, &Site::default())
            .expect("apply");
        assert_eq!(report.added, 0);
        assert_eq!(document, original);
    }
}
