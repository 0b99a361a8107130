//! Redirect table lookup and href rewriting inside article documents.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use anyhow::Result;
use regex::Regex;
use reqwest::blocking::Client;
use serde::Serialize;

use crate::bard::{Block, BlockKind, for_each_text_mut};
use crate::document::Document;
use crate::error::MigrationError;
use crate::http::{HttpSettings, build_client, describe};
use crate::site::Site;
use crate::yaml::Value;

/// Static old-path to new-path mapping, read-only once loaded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RedirectTable {
    entries: BTreeMap<String, String>,
}

impl RedirectTable {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: pairs
                .into_iter()
                .map(|(old, new)| (old.into(), new.into()))
                .collect(),
        }
    }

    /// Loads `.json` objects, `.yaml` / `.yml` mappings, or the `'old' => 'new',`
    /// lines of a PHP routing array.
    pub fn load(path: &Path) -> Result<Self, MigrationError> {
        let content = fs::read_to_string(path)?;
        let extension = path
            .extension()
            .and_then(|value| value.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let invalid = |reason: String| {
            MigrationError::InvalidRedirectTable(format!("{}: {reason}", path.display()))
        };
        match extension.as_str() {
            "json" => serde_json::from_str::<BTreeMap<String, String>>(&content)
                .map(|entries| Self { entries })
                .map_err(|error| invalid(error.to_string())),
            "yaml" | "yml" => serde_yaml::from_str::<BTreeMap<String, String>>(&content)
                .map(|entries| Self { entries })
                .map_err(|error| invalid(error.to_string())),
            "php" => Ok(Self::from_pairs(parse_php_pairs(&content))),
            other => Err(invalid(format!("unsupported extension `{other}`"))),
        }
    }

    /// Missing file reads as an empty table.
    pub fn load_or_empty(path: &Path) -> Result<Self, MigrationError> {
        if path.exists() {
            Self::load(path)
        } else {
            log::warn!("redirect table {} not found; using empty table", path.display());
            Ok(Self::default())
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    /// Exact path, then without trailing slash, then with one. One hop only.
    pub fn lookup(&self, path: &str) -> Option<&str> {
        let trimmed = path.trim_end_matches('/');
        self.entries
            .get(path)
            .or_else(|| self.entries.get(trimmed))
            .or_else(|| self.entries.get(&format!("{trimmed}/")))
            .map(String::as_str)
    }
}

pub fn resolve(path: &str, table: &RedirectTable) -> String {
    table.lookup(path).unwrap_or(path).to_string()
}

static PHP_PAIR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*(?:'([^']*)'|"([^"]*)")\s*=>\s*(?:'([^']*)'|"([^"]*)")"#)
        .expect("php pair pattern is valid")
});

pub(crate) fn parse_php_pairs(content: &str) -> Vec<(String, String)> {
    content
        .lines()
        .filter_map(|line| {
            let captures = PHP_PAIR_RE.captures(line)?;
            let old = captures.get(1).or_else(|| captures.get(2))?.as_str();
            let new = captures.get(3).or_else(|| captures.get(4))?.as_str();
            Some((old.to_string(), new.to_string()))
        })
        .collect()
}

/// Asks the live site whether a path redirects.
pub trait RedirectProbe {
    /// `Ok(Some(path))` for a same-site redirect target, `Ok(None)` otherwise.
    fn probe(&mut self, path: &str) -> Result<Option<String>, MigrationError>;
}

pub struct HttpRedirectProbe {
    client: Client,
    site: Site,
}

impl HttpRedirectProbe {
    pub fn new(site: &Site, settings: &HttpSettings) -> Result<Self> {
        Ok(Self {
            client: build_client(settings, false)?,
            site: site.clone(),
        })
    }
}

impl RedirectProbe for HttpRedirectProbe {
    fn probe(&mut self, path: &str) -> Result<Option<String>, MigrationError> {
        let url = self.site.production_link(path);
        let response = self
            .client
            .head(&url)
            .send()
            .map_err(|error| MigrationError::network(&url, describe(&error)))?;
        let status = response.status().as_u16();
        if !(301..=308).contains(&status) {
            return Ok(None);
        }
        let location = response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        Ok(location_target(&self.site, location))
    }
}

fn location_target(site: &Site, location: &str) -> Option<String> {
    if location.is_empty() {
        return None;
    }
    site.local_path(location)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RedirectSource {
    Table,
    Production,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RedirectChange {
    pub from: String,
    pub to: String,
    pub source: RedirectSource,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RedirectFixReport {
    pub checked: usize,
    pub fixed: usize,
    pub removed: usize,
    pub skipped: usize,
    pub errors: usize,
    pub changes: Vec<RedirectChange>,
    pub removed_texts: Vec<String>,
}

struct HrefFixer<'a, 'p> {
    table: &'a RedirectTable,
    probe: Option<&'p mut dyn RedirectProbe>,
    site: &'a Site,
    probed: HashMap<String, Option<String>>,
    report: RedirectFixReport,
}

impl HrefFixer<'_, '_> {
    fn fix(&mut self, href: &str) -> Option<String> {
        let Some(path) = self.site.local_path(href) else {
            self.report.skipped += 1;
            return None;
        };
        self.report.checked += 1;

        let (resolved, source) = match self.table.lookup(&path) {
            Some(target) => (target.to_string(), RedirectSource::Table),
            None => (self.probe_path(&path)?, RedirectSource::Production),
        };
        if resolved == path || resolved == path.trim_end_matches('/') {
            return None;
        }
        log::info!("redirect {path} -> {resolved}");
        self.report.fixed += 1;
        self.report.changes.push(RedirectChange {
            from: path,
            to: resolved.clone(),
            source,
        });
        Some(resolved)
    }

    fn probe_path(&mut self, path: &str) -> Option<String> {
        if let Some(cached) = self.probed.get(path) {
            return cached.clone();
        }
        let probe = self.probe.as_deref_mut()?;
        let result = match probe.probe(path) {
            Ok(target) => target.filter(|target| target != path),
            Err(error) => {
                log::warn!("skipping production redirect check: {error}");
                self.report.errors += 1;
                None
            }
        };
        self.probed.insert(path.to_string(), result.clone());
        result
    }

    fn fix_block(&mut self, block: &mut Block) {
        for_each_text_mut(&mut block.nodes, &mut |run| {
            let Some(href) = run.link().and_then(|attrs| attrs.href()).map(str::to_string) else {
                return;
            };
            if let Some(resolved) = self.fix(&href)
                && let Some(attrs) = run.link_mut()
            {
                attrs.set_href(&resolved);
            }
        });

        if block.kind == BlockKind::Button
            && let Some(url) = block.fields.get_str("url").map(str::to_string)
            && let Some(resolved) = self.fix(&url)
        {
            let value = match block.fields.get("url") {
                Some(Value::Str { style, .. }) => Value::styled(resolved, *style),
                _ => Value::string(resolved),
            };
            block.fields.insert("url", value);
        }
    }

    /// Drops link marks that now point at the bare articles index; the text stays.
    fn unlink_articles_index(&mut self, block: &mut Block) {
        let site = self.site;
        let report = &mut self.report;
        for_each_text_mut(&mut block.nodes, &mut |run| {
            let points_at_index = run
                .link()
                .and_then(|attrs| attrs.href())
                .and_then(|href| site.local_path(href))
                .is_some_and(|path| site.is_articles_index(&path));
            if points_at_index && run.remove_link() {
                log::info!("removed generic articles link from {:?}", run.text);
                report.removed += 1;
                report.removed_texts.push(run.text.clone());
            }
        });
    }
}

/// Rewrites every site link in `main_blocks` through the table, then the
/// production probe when one is given.
pub fn fix_document_redirects(
    document: &mut Document,
    table: &RedirectTable,
    probe: Option<&mut dyn RedirectProbe>,
    site: &Site,
) -> Result<RedirectFixReport, MigrationError> {
    let mut blocks = document.main_blocks()?;
    let mut fixer = HrefFixer {
        table,
        probe,
        site,
        probed: HashMap::new(),
        report: RedirectFixReport::default(),
    };
    for block in &mut blocks {
        fixer.fix_block(block);
        fixer.unlink_articles_index(block);
    }
    let report = fixer.report;
    if report.fixed > 0 || report.removed > 0 {
        document.set_main_blocks(&blocks);
    }
    Ok(report)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedLink {
    pub original: String,
    pub resolved: String,
    pub changed: bool,
}

/// Single-path resolution as reported by `resolve-redirect`.
pub fn resolve_link(url: &str, table: &RedirectTable, site: &Site) -> ResolvedLink {
    let path = site.local_path(url).unwrap_or_else(|| url.to_string());
    match table.lookup(&path) {
        Some(target) => ResolvedLink {
            original: url.to_string(),
            resolved: target.to_string(),
            changed: true,
        },
        None => ResolvedLink {
            original: url.to_string(),
            resolved: path,
            changed: false,
        },
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;

    use super::RedirectProbe;
    use crate::error::MigrationError;

    #[derive(Default)]
    pub struct MockProbe {
        pub redirects: HashMap<String, String>,
        pub failing: Vec<String>,
        pub requests: Vec<String>,
    }

    impl RedirectProbe for MockProbe {
        fn probe(&mut self, path: &str) -> Result<Option<String>, MigrationError> {
            self.requests.push(path.to_string());
            if self.failing.iter().any(|failing| failing == path) {
                return Err(MigrationError::network(path, "timed out"));
            }
            Ok(self.redirects.get(path).cloned())
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    use super::testing::MockProbe;
    use super::*;
    use crate::bard::{Node, flatten};
    use crate::builders::button_block;

    fn table() -> RedirectTable {
        RedirectTable::from_pairs([
            ("/a", "/b"),
            ("/b", "/c"),
            ("/old-guide", "/articles/guides/new-guide"),
            ("/gone", "/articles"),
        ])
    }

    #[test]
    fn resolve_is_single_hop() {
        let table = table();
        assert_eq!(resolve("/a", &table), "/b");
        assert_eq!(resolve(&resolve("/a", &table), &table), "/c");
        assert_eq!(resolve("/unknown", &table), "/unknown");
    }

    #[test]
    fn resolve_probes_trailing_slash_variants() {
        let table = RedirectTable::from_pairs([("/x", "/y"), ("/p/", "/q")]);
        assert_eq!(resolve("/x/", &table), "/y");
        assert_eq!(resolve("/p", &table), "/q");
    }

    #[test]
    fn load_reads_php_json_and_yaml() {
        let temp = tempdir().expect("tempdir");
        let php = temp.path().join("redirects.php");
        fs::write(
            &php,
            "<?php\n\nreturn [\n    '/old' => '/articles/new',\n    \"/two\" => \"/2\",\n    // comment\n];\n",
        )
        .expect("write php");
        let loaded = RedirectTable::load(&php).expect("php");
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.lookup("/old"), Some("/articles/new"));

        let json = temp.path().join("redirects.json");
        fs::write(&json, r#"{"/a": "/b"}"#).expect("write json");
        assert_eq!(RedirectTable::load(&json).expect("json").lookup("/a"), Some("/b"));

        let yaml = temp.path().join("redirects.yaml");
        fs::write(&yaml, "/a: /b\n").expect("write yaml");
        assert_eq!(RedirectTable::load(&yaml).expect("yaml").lookup("/a"), Some("/b"));

        let broken = temp.path().join("broken.json");
        fs::write(&broken, "[1, 2]").expect("write broken");
        let err = RedirectTable::load(&broken).expect_err("must fail");
        assert!(matches!(err, MigrationError::InvalidRedirectTable(_)));

        assert!(
            RedirectTable::load_or_empty(&temp.path().join("missing.php"))
                .expect("empty")
                .is_empty()
        );
    }

    fn document_with_links() -> Document {
        let site = Site::default();
        let mut document = Document {
            front_matter: Default::default(),
            body: "\n".to_string(),
        };
        document.set_main_blocks(&[
            Block::rich_text(
                "a",
                vec![Node::paragraph(vec![
                    Node::link("old guide", "https://bizee.com/old-guide", &site),
                    Node::text(" and "),
                    Node::link("IRS", "https://irs.gov/ein", &site),
                    Node::text(" and "),
                    Node::link("more articles", "/gone", &site),
                    Node::text(" and "),
                    Node::link("moved", "/moved", &site),
                ])],
            ),
            button_block("btn", "Start", "/a", false),
        ]);
        document
    }

    #[test]
    fn fix_document_rewrites_hrefs_and_unlinks_index_targets() {
        let mut document = document_with_links();
        let mut probe = MockProbe::default();
        probe
            .redirects
            .insert("/moved".to_string(), "/articles/moved-here".to_string());

        let report = fix_document_redirects(
            &mut document,
            &table(),
            Some(&mut probe),
            &Site::default(),
        )
        .expect("fix");
        assert_eq!(report.checked, 4);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.fixed, 4);
        assert_eq!(report.removed, 1);
        assert_eq!(report.removed_texts, vec!["more articles".to_string()]);
        assert_eq!(probe.requests, vec!["/moved".to_string()]);

        let blocks = document.main_blocks().expect("blocks");
        let hrefs = crate::bard::text_runs(&blocks[0].nodes)
            .into_iter()
            .filter_map(|(_, run)| run.link().and_then(|attrs| attrs.href()).map(str::to_string))
            .collect::<Vec<_>>();
        assert_eq!(
            hrefs,
            vec!["/articles/guides/new-guide", "https://irs.gov/ein", "/articles/moved-here"]
        );
        assert_eq!(blocks[1].fields.get_str("url"), Some("/b"));
        assert_eq!(
            flatten(&blocks[0].nodes),
            "old guide and IRS and more articles and moved"
        );
    }

    #[test]
    fn probe_failures_are_counted_and_skipped() {
        let mut document = document_with_links();
        let before = document.serialize();
        let mut probe = MockProbe {
            failing: vec!["/moved".to_string()],
            ..MockProbe::default()
        };
        let empty = RedirectTable::default();
        let report = fix_document_redirects(&mut document, &empty, Some(&mut probe), &Site::default())
            .expect("fix");
        assert_eq!(report.errors, 1);
        assert_eq!(report.fixed, 0);
        assert_eq!(document.serialize(), before);
    }

    #[test]
    fn resolve_link_strips_site_origin() {
        let resolved = resolve_link("https://bizee.com/a", &table(), &Site::default());
        assert_eq!(resolved.resolved, "/b");
        assert!(resolved.changed);
        let untouched = resolve_link("https://bizee.com/zzz", &table(), &Site::default());
        assert_eq!(untouched.resolved, "/zzz");
        assert!(!untouched.changed);
    }

    #[test]
    fn location_target_accepts_site_and_relative_locations() {
        let site = Site::default();
        assert_eq!(location_target(&site, "https://bizee.com/new").as_deref(), Some("/new"));
        assert_eq!(location_target(&site, "/rel").as_deref(), Some("/rel"));
        assert_eq!(location_target(&site, "https://elsewhere.com/x"), None);
    }
}
