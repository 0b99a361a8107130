use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::assets::{StorageBackend, StorageSettings};
use crate::http::{DEFAULT_TIMEOUT_MS, DEFAULT_USER_AGENT, HttpSettings};
use crate::images::ImageRules;
use crate::links::{ExclusionRules, LinkAlias};
use crate::locate::{DEFAULT_FUZZY_THRESHOLD, DEFAULT_MIN_WORD_LEN, MatchOptions};
use crate::site::{DEFAULT_ARTICLES_PREFIX, DEFAULT_PRODUCTION_URL, DEFAULT_SITE_HOST, Site};
use crate::verify::VerifyRules;

pub const DEFAULT_STORAGE_BASE_PATH: &str = "articles";

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
pub struct BardConfig {
    #[serde(default)]
    pub site: SiteSection,
    #[serde(default)]
    pub matching: MatchingSection,
    #[serde(default)]
    pub links: ExclusionRules,
    #[serde(default)]
    pub images: ImageRules,
    #[serde(default)]
    pub storage: StorageSection,
    #[serde(default)]
    pub http: HttpSection,
    #[serde(default)]
    pub verify: VerifyRules,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct SiteSection {
    pub host: Option<String>,
    pub production_url: Option<String>,
    pub articles_prefix: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct MatchingSection {
    pub fuzzy: bool,
    pub fuzzy_threshold: f64,
    pub min_word_len: usize,
    pub aliases: Vec<LinkAlias>,
}

impl Default for MatchingSection {
    fn default() -> Self {
        Self {
            fuzzy: true,
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
            min_word_len: DEFAULT_MIN_WORD_LEN,
            aliases: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct StorageSection {
    #[serde(default)]
    pub backend: StorageBackend,
    pub local_dir: Option<String>,
    pub endpoint: Option<String>,
    pub base_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct HttpSection {
    pub timeout_ms: Option<u64>,
    pub user_agent: Option<String>,
}

/// Effective settings after env overrides, ready to hand to components.
#[derive(Debug, Clone)]
pub struct Settings {
    pub site: Site,
    pub matching: MatchOptions,
    pub aliases: Vec<LinkAlias>,
    pub exclusions: ExclusionRules,
    pub images: ImageRules,
    pub storage: StorageSettings,
    pub http: HttpSettings,
    pub verify: VerifyRules,
}

impl BardConfig {
    /// Resolve settings: env > config > built-in default.
    pub fn settings(&self, project_root: &Path) -> Settings {
        self.settings_with_lookup(project_root, |key| env::var(key).ok())
    }

    pub fn settings_with_lookup<F>(&self, project_root: &Path, lookup_env: F) -> Settings
    where
        F: Fn(&str) -> Option<String>,
    {
        let pick = |key: &str, configured: &Option<String>, default: &str| {
            env_value(&lookup_env, key)
                .or_else(|| configured.clone())
                .unwrap_or_else(|| default.to_string())
        };

        let site = Site {
            host: pick("BARDTOOL_SITE_HOST", &self.site.host, DEFAULT_SITE_HOST),
            production_url: pick(
                "BARDTOOL_PRODUCTION_URL",
                &self.site.production_url,
                DEFAULT_PRODUCTION_URL,
            ),
            articles_prefix: self
                .site
                .articles_prefix
                .clone()
                .unwrap_or_else(|| DEFAULT_ARTICLES_PREFIX.to_string()),
        };

        let timeout_ms = env_value(&lookup_env, "BARDTOOL_HTTP_TIMEOUT_MS")
            .and_then(|value| value.parse::<u64>().ok())
            .or(self.http.timeout_ms)
            .unwrap_or(DEFAULT_TIMEOUT_MS);
        let http = HttpSettings {
            timeout_ms,
            user_agent: pick("BARDTOOL_USER_AGENT", &self.http.user_agent, DEFAULT_USER_AGENT),
        };

        let local_dir = env_value(&lookup_env, "BARDTOOL_STORAGE_DIR")
            .or_else(|| self.storage.local_dir.clone())
            .map(|dir| absolutize(Path::new(&dir), project_root))
            .unwrap_or_else(|| project_root.join("public").join("storage"));
        let storage = StorageSettings {
            backend: self.storage.backend,
            local_dir,
            endpoint: env_value(&lookup_env, "BARDTOOL_STORAGE_ENDPOINT")
                .or_else(|| self.storage.endpoint.clone()),
            base_path: self
                .storage
                .base_path
                .clone()
                .unwrap_or_else(|| DEFAULT_STORAGE_BASE_PATH.to_string()),
        };

        Settings {
            site,
            matching: MatchOptions {
                fuzzy: self.matching.fuzzy,
                fuzzy_threshold: self.matching.fuzzy_threshold,
                min_word_len: self.matching.min_word_len,
            },
            aliases: self.matching.aliases.clone(),
            exclusions: self.links.clone(),
            images: self.images.clone(),
            storage,
            http,
            verify: self.verify.clone(),
        }
    }
}

fn env_value<F>(lookup_env: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup_env(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn absolutize(path: &Path, base: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Load and parse a BardConfig from a TOML file. Returns default if file doesn't exist.
pub fn load_config(config_path: &Path) -> Result<BardConfig> {
    if !config_path.exists() {
        return Ok(BardConfig::default());
    }
    let content = fs::read_to_string(config_path)
        .with_context(|| format!("failed to read {}", config_path.display()))?;
    let parsed: BardConfig = toml::from_str(&content)
        .with_context(|| format!("failed to parse {}", config_path.display()))?;
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use tempfile::tempdir;

    use super::*;

    #[test]
    fn load_config_returns_default_for_missing_file() {
        let config = load_config(Path::new("/nonexistent/config.toml")).expect("load config");
        assert_eq!(config, BardConfig::default());
        let settings = config.settings_with_lookup(Path::new("/repo"), |_| None);
        assert_eq!(settings.site, Site::default());
        assert_eq!(settings.matching, MatchOptions::default());
        assert_eq!(settings.http.timeout_ms, DEFAULT_TIMEOUT_MS);
        assert_eq!(settings.storage.local_dir, Path::new("/repo/public/storage"));
    }

    #[test]
    fn load_config_parses_sections() {
        let temp = tempdir().expect("tempdir");
        let config_path = temp.path().join("config.toml");
        fs::write(
            &config_path,
            r#"
[site]
host = "example.com"
production_url = "https://www.example.com"

[matching]
fuzzy_threshold = 0.75

[[matching.aliases]]
phrase = "come up with a killer name"
anchor = "killer name"

[links]
min_text_len = 4

[images]
min_width = 300

[storage]
backend = "http"
endpoint = "https://storage.example.com/bucket"

[http]
timeout_ms = 2500
"#,
        )
        .expect("write config");

        let config = load_config(&config_path).expect("load config");
        let settings = config.settings_with_lookup(temp.path(), |_| None);
        assert_eq!(settings.site.host, "example.com");
        assert_eq!(settings.matching.fuzzy_threshold, 0.75);
        assert!(settings.matching.fuzzy);
        assert_eq!(settings.aliases.len(), 1);
        assert_eq!(settings.exclusions.min_text_len, 4);
        assert!(!settings.exclusions.skip_texts.is_empty());
        assert_eq!(settings.images.min_width, 300);
        assert_eq!(settings.images.featured_min_width, 800);
        assert_eq!(settings.storage.backend, StorageBackend::Http);
        assert_eq!(settings.http.timeout_ms, 2500);
    }

    #[test]
    fn env_overrides_config_values() {
        let config = BardConfig {
            site: SiteSection {
                host: Some("example.com".to_string()),
                ..SiteSection::default()
            },
            ..BardConfig::default()
        };
        let env = HashMap::from([
            ("BARDTOOL_SITE_HOST".to_string(), " other.com ".to_string()),
            ("BARDTOOL_HTTP_TIMEOUT_MS".to_string(), "900".to_string()),
            ("BARDTOOL_USER_AGENT".to_string(), "  ".to_string()),
        ]);
        let settings = config.settings_with_lookup(Path::new("/repo"), |key| env.get(key).cloned());
        assert_eq!(settings.site.host, "other.com");
        assert_eq!(settings.http.timeout_ms, 900);
        assert_eq!(settings.http.user_agent, DEFAULT_USER_AGENT);
    }

    #[test]
    fn load_config_returns_error_for_invalid_toml() {
        let temp = tempdir().expect("tempdir");
        let config_path = temp.path().join("config.toml");
        fs::write(&config_path, "[site\nhost = \"oops\"").expect("write config");
        let error = load_config(&config_path).expect_err("must fail");
        assert!(error.to_string().contains("failed to parse"));
    }
}
