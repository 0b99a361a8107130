//! Downloading article images and storing them under the CMS asset paths.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result, bail};
use reqwest::StatusCode;
use reqwest::Url;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use crate::document::Document;
use crate::error::MigrationError;
use crate::filesystem::sha256_hex;
use crate::http::{HtmlFetcher, HttpSettings, build_client, describe};
use crate::images::{ImageRules, UniqueNames};

pub const FEATURED_TYPE: &str = "featured";
pub const CONTENT_TYPE: &str = "main-content";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Local,
    Http,
}

impl StorageBackend {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Http => "http",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageSettings {
    pub backend: StorageBackend,
    pub local_dir: PathBuf,
    pub endpoint: Option<String>,
    pub base_path: String,
}

/// Object storage addressed by slash-separated relative paths.
pub trait ObjectStore {
    fn exists(&mut self, path: &str) -> Result<bool, MigrationError>;
    /// Stores `bytes` at `path`; `Ok(false)` when the store declined the write.
    fn put(&mut self, path: &str, bytes: &[u8], content_type: &str)
    -> Result<bool, MigrationError>;
}

/// A directory tree standing in for the bucket.
pub struct LocalDirStore {
    root: PathBuf,
}

impl LocalDirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, MigrationError> {
        let relative = Path::new(path);
        let escapes = relative
            .components()
            .any(|component| !matches!(component, Component::Normal(_)));
        if path.is_empty() || escapes {
            return Err(MigrationError::storage(path, "path must be relative and stay inside the store"));
        }
        Ok(self.root.join(relative))
    }
}

impl ObjectStore for LocalDirStore {
    fn exists(&mut self, path: &str) -> Result<bool, MigrationError> {
        Ok(self.resolve(path)?.is_file())
    }

    fn put(
        &mut self,
        path: &str,
        bytes: &[u8],
        _content_type: &str,
    ) -> Result<bool, MigrationError> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|error| MigrationError::storage(path, error))?;
        }
        fs::write(&target, bytes).map_err(|error| MigrationError::storage(path, error))?;
        Ok(true)
    }
}

/// HEAD / PUT against `{endpoint}/{path}`.
pub struct HttpObjectStore {
    client: Client,
    endpoint: String,
}

impl HttpObjectStore {
    pub fn new(endpoint: &str, settings: &HttpSettings) -> Result<Self> {
        Url::parse(endpoint).with_context(|| format!("invalid storage endpoint {endpoint}"))?;
        Ok(Self {
            client: build_client(settings, true)?,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.endpoint, path.trim_start_matches('/'))
    }
}

impl ObjectStore for HttpObjectStore {
    fn exists(&mut self, path: &str) -> Result<bool, MigrationError> {
        let response = self
            .client
            .head(self.url(path))
            .send()
            .map_err(|error| MigrationError::storage(path, describe(&error)))?;
        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(MigrationError::storage(
                path,
                format!("HEAD returned HTTP {}", status.as_u16()),
            )),
        }
    }

    fn put(
        &mut self,
        path: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<bool, MigrationError> {
        let response = self
            .client
            .put(self.url(path))
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes.to_vec())
            .send()
            .map_err(|error| MigrationError::storage(path, describe(&error)))?;
        let status = response.status();
        if status.is_success() {
            Ok(true)
        } else {
            log::warn!("PUT {path} returned HTTP {}", status.as_u16());
            Ok(false)
        }
    }
}

pub fn build_store(
    storage: &StorageSettings,
    http: &HttpSettings,
) -> Result<Box<dyn ObjectStore>> {
    match storage.backend {
        StorageBackend::Local => Ok(Box::new(LocalDirStore::new(storage.local_dir.clone()))),
        StorageBackend::Http => {
            let Some(endpoint) = storage.endpoint.as_deref() else {
                bail!("storage backend `http` requires [storage].endpoint or BARDTOOL_STORAGE_ENDPOINT");
            };
            Ok(Box::new(HttpObjectStore::new(endpoint, http)?))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedUpload {
    pub original_url: String,
    pub path: String,
    pub file_name: String,
    pub image_type: String,
}

/// Storage paths for an article's images, in the order given. Files keep
/// their source extension when it is allowed; repeated names get a numeric
/// suffix.
pub fn plan_uploads(
    slug: &str,
    urls: &[String],
    base_path: &str,
    rules: &ImageRules,
) -> Vec<PlannedUpload> {
    let base = base_path.trim_matches('/');
    let mut featured_names = UniqueNames::default();
    let mut content_names = UniqueNames::default();
    urls.iter()
        .enumerate()
        .map(|(index, url)| {
            let extension = rules.extension_for(url);
            let (image_type, file_name) = if index == 0 && looks_featured(url) {
                (FEATURED_TYPE, featured_names.claim(slug, &extension))
            } else {
                let name = clean_basename(url);
                let stem = if name.len() < 3 {
                    format!("{slug}-image-{}", index + 1)
                } else {
                    name
                };
                (CONTENT_TYPE, content_names.claim(&stem, &extension))
            };
            let path = if base.is_empty() {
                format!("{image_type}/{file_name}")
            } else {
                format!("{base}/{image_type}/{file_name}")
            };
            log::debug!("planned {url} -> {path}");
            PlannedUpload {
                original_url: url.clone(),
                path,
                file_name,
                image_type: image_type.to_string(),
            }
        })
        .collect()
}

fn looks_featured(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    ["featured", "hero", "header"]
        .iter()
        .any(|marker| lower.contains(marker))
}

/// File stem of the URL path with anything outside `[A-Za-z0-9-]` turned into
/// single dashes.
fn clean_basename(url: &str) -> String {
    let without_query = url.split(['?', '#']).next().unwrap_or_default();
    let path = match without_query.split_once("://") {
        Some((_, rest)) => rest.find('/').map_or("", |slash| &rest[slash..]),
        None => without_query,
    };
    let basename = path.rsplit('/').next().unwrap_or_default();
    let stem = match basename.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => basename,
    };

    let mut out = String::with_capacity(stem.len());
    for ch in stem.chars() {
        let ch = if ch.is_ascii_alphanumeric() || ch == '-' {
            ch
        } else {
            '-'
        };
        if ch == '-' && out.ends_with('-') {
            continue;
        }
        out.push(ch);
    }
    out.trim_matches('-').to_string()
}

fn content_type_for(url: &str, served: Option<&str>, rules: &ImageRules) -> String {
    if let Some(served) = served
        && served.starts_with("image/")
    {
        return served.split(';').next().unwrap_or(served).trim().to_string();
    }
    let path = url.split(['?', '#']).next().unwrap_or_default();
    let extension = path
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| rules.extensions.iter().any(|allowed| allowed == ext));
    match extension.as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg".to_string(),
        Some("svg") => "image/svg+xml".to_string(),
        Some(ext) => format!("image/{ext}"),
        None => "image/webp".to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageMapping {
    pub original_url: String,
    pub s3_path: String,
    #[serde(rename = "type")]
    pub image_type: String,
}

/// The mapping file written after an upload run and read by `remap-images`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageMappingFile {
    pub article_slug: String,
    pub article_url: String,
    pub images: Vec<ImageMapping>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UploadReport {
    pub uploaded: usize,
    pub skipped: usize,
    pub failed: usize,
    /// sha256 of each uploaded object, keyed by storage path.
    pub digests: BTreeMap<String, String>,
    pub images: Vec<ImageMapping>,
    pub errors: Vec<String>,
}

/// Uploads each planned image that is not already stored.
///
/// Download and storage failures are recorded per image; the remaining
/// images are still processed.
pub fn upload_images(
    fetcher: &mut dyn HtmlFetcher,
    store: &mut dyn ObjectStore,
    plan: &[PlannedUpload],
    rules: &ImageRules,
) -> UploadReport {
    let mut report = UploadReport::default();

    for item in plan {
        let mapping = ImageMapping {
            original_url: item.original_url.clone(),
            s3_path: item.path.clone(),
            image_type: item.image_type.clone(),
        };

        match store.exists(&item.path) {
            Ok(true) => {
                log::info!("{} already stored, skipping", item.path);
                report.skipped += 1;
                report.images.push(mapping);
                continue;
            }
            Ok(false) => {}
            Err(error) => log::warn!("could not check {}: {error}; uploading anyway", item.path),
        }

        let fetched = match fetcher.fetch_bytes(&item.original_url) {
            Ok(fetched) => fetched,
            Err(error) => {
                log::warn!("{error}");
                report.failed += 1;
                report.errors.push(error.to_string());
                continue;
            }
        };

        let content_type =
            content_type_for(&item.original_url, fetched.content_type.as_deref(), rules);
        match store.put(&item.path, &fetched.bytes, &content_type) {
            Ok(true) => {
                report.uploaded += 1;
                report
                    .digests
                    .insert(item.path.clone(), sha256_hex(&fetched.bytes));
                report.images.push(mapping);
            }
            Ok(false) => {
                let error = MigrationError::storage(&item.path, "store rejected the write");
                report.failed += 1;
                report.errors.push(error.to_string());
            }
            Err(error) => {
                log::warn!("{error}");
                report.failed += 1;
                report.errors.push(error.to_string());
            }
        }
    }

    report
}

/// Replaces every front-matter string equal to an original URL with its
/// storage path. Returns the number of replacements.
pub fn remap_image_urls(document: &mut Document, mapping: &[ImageMapping]) -> usize {
    let targets = mapping
        .iter()
        .map(|image| (image.original_url.as_str(), image.s3_path.as_str()))
        .collect::<HashMap<_, _>>();
    let mut replaced = 0;
    for (_, value) in document.front_matter.iter_mut() {
        value.for_each_str_mut(&mut |text: &mut String| {
            if let Some(path) = targets.get(text.trim()) {
                *text = (*path).to_string();
                replaced += 1;
            }
        });
    }
    replaced
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::BTreeMap;

    use super::ObjectStore;
    use crate::error::MigrationError;

    /// In-memory store; paths listed in `broken` fail on put.
    #[derive(Default)]
    pub struct MockStore {
        pub objects: BTreeMap<String, (Vec<u8>, String)>,
        pub broken: Vec<String>,
        pub puts: usize,
    }

    impl ObjectStore for MockStore {
        fn exists(&mut self, path: &str) -> Result<bool, MigrationError> {
            Ok(self.objects.contains_key(path))
        }

        fn put(
            &mut self,
            path: &str,
            bytes: &[u8],
            content_type: &str,
        ) -> Result<bool, MigrationError> {
            self.puts += 1;
            if self.broken.iter().any(|broken| broken == path) {
                return Err(MigrationError::storage(path, "HTTP 500"));
            }
            self.objects
                .insert(path.to_string(), (bytes.to_vec(), content_type.to_string()));
            Ok(true)
        }
    }
}
