use reqwest::Url;
use serde::Serialize;

pub const DEFAULT_SITE_HOST: &str = "bizee.com";
pub const DEFAULT_PRODUCTION_URL: &str = "https://bizee.com";
pub const DEFAULT_ARTICLES_PREFIX: &str = "/articles";

/// The site being migrated: its host, where production lives, and where
/// articles are routed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Site {
    pub host: String,
    pub production_url: String,
    pub articles_prefix: String,
}

impl Default for Site {
    fn default() -> Self {
        Self {
            host: DEFAULT_SITE_HOST.to_string(),
            production_url: DEFAULT_PRODUCTION_URL.to_string(),
            articles_prefix: DEFAULT_ARTICLES_PREFIX.to_string(),
        }
    }
}

impl Site {
    pub fn is_site_host(&self, host: &str) -> bool {
        let host = host.trim_start_matches("www.");
        host.eq_ignore_ascii_case(self.host.trim_start_matches("www."))
    }

    /// Absolute http(s) URL on some other host.
    pub fn is_external(&self, href: &str) -> bool {
        match Url::parse(href.trim()) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {
                !url.host_str().is_some_and(|host| self.is_site_host(host))
            }
            _ => false,
        }
    }

    /// Site-relative path (with query and fragment) for an href on this site;
    /// `None` for external, `mailto:`, `tel:` and fragment-only hrefs.
    pub fn local_path(&self, href: &str) -> Option<String> {
        let href = href.trim();
        if href.is_empty() || href.starts_with('#') {
            return None;
        }
        if href.starts_with('/') && !href.starts_with("//") {
            return Some(href.to_string());
        }
        let url = Url::parse(href)
            .or_else(|_| Url::parse(&format!("https:{href}")))
            .ok()?;
        if !matches!(url.scheme(), "http" | "https") || !self.is_site_host(url.host_str()?) {
            return None;
        }
        let mut path = url.path().to_string();
        if let Some(query) = url.query() {
            path.push('?');
            path.push_str(query);
        }
        if let Some(fragment) = url.fragment() {
            path.push('#');
            path.push_str(fragment);
        }
        Some(path)
    }

    pub fn production_link(&self, path: &str) -> String {
        format!("{}{}", self.production_url.trim_end_matches('/'), path)
    }

    /// Whether `path` is the bare articles index, with or without a trailing slash.
    pub fn is_articles_index(&self, path: &str) -> bool {
        path.trim_end_matches('/') == self.articles_prefix.trim_end_matches('/')
    }
}

/// Path without query or fragment.
pub fn path_only(path: &str) -> &str {
    let end = path.find(['?', '#']).unwrap_or(path.len());
    &path[..end]
}
