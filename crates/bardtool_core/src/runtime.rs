use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

pub const STATE_DIR_NAME: &str = ".bardtool";
pub const CONFIG_FILENAME: &str = "config.toml";
const ARTICLES_REL: &str = "content/collections/articles";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueSource {
    Flag,
    Env,
    Heuristic,
    Default,
}

impl ValueSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Flag => "flag",
            Self::Env => "env",
            Self::Heuristic => "heuristic",
            Self::Default => "default",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PathOverrides {
    pub project_root: Option<PathBuf>,
    pub config: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct ResolutionContext {
    pub cwd: PathBuf,
    pub executable_dir: Option<PathBuf>,
}

impl ResolutionContext {
    pub fn from_process() -> Result<Self> {
        let cwd = env::current_dir().context("failed to read current directory")?;
        let executable_dir = env::current_exe()
            .ok()
            .and_then(|path| path.parent().map(Path::to_path_buf));
        Ok(Self {
            cwd,
            executable_dir,
        })
    }
}

/// Where the CMS project keeps articles, taxonomy entries and routing files.
#[derive(Debug, Clone)]
pub struct ResolvedPaths {
    pub project_root: PathBuf,
    pub articles_dir: PathBuf,
    pub categories_dir: PathBuf,
    pub authors_dir: PathBuf,
    pub redirects_path: PathBuf,
    pub released_articles_path: PathBuf,
    pub state_dir: PathBuf,
    pub reports_dir: PathBuf,
    pub config_path: PathBuf,
    pub root_source: ValueSource,
    pub config_source: ValueSource,
}

#[derive(Debug, Clone)]
pub struct RuntimeStatus {
    pub project_root_exists: bool,
    pub articles_exists: bool,
    pub categories_exists: bool,
    pub redirects_exists: bool,
    pub released_articles_exists: bool,
    pub config_exists: bool,
    pub warnings: Vec<String>,
}

impl ResolvedPaths {
    pub fn diagnostics(&self) -> String {
        format!(
            "project_root={} ({})\narticles_dir={}\ncategories_dir={}\nauthors_dir={}\nredirects_path={}\nreleased_articles_path={}\nstate_dir={}\nreports_dir={}\nconfig_path={} ({})",
            normalize_for_display(&self.project_root),
            self.root_source.as_str(),
            normalize_for_display(&self.articles_dir),
            normalize_for_display(&self.categories_dir),
            normalize_for_display(&self.authors_dir),
            normalize_for_display(&self.redirects_path),
            normalize_for_display(&self.released_articles_path),
            normalize_for_display(&self.state_dir),
            normalize_for_display(&self.reports_dir),
            normalize_for_display(&self.config_path),
            self.config_source.as_str(),
        )
    }

    /// Path relative to the project root when inside it, for report output.
    pub fn display_relative(&self, path: &Path) -> String {
        match path.strip_prefix(&self.project_root) {
            Ok(relative) => normalize_for_display(relative),
            Err(_) => normalize_for_display(path),
        }
    }
}

pub fn inspect_runtime(paths: &ResolvedPaths) -> RuntimeStatus {
    let articles_exists = paths.articles_dir.is_dir();
    let categories_exists = paths.categories_dir.is_dir();
    let redirects_exists = paths.redirects_path.is_file();
    let released_articles_exists = paths.released_articles_path.is_file();

    let mut warnings = Vec::new();
    if !articles_exists {
        warnings.push(format!(
            "{ARTICLES_REL}/ is missing; is --project-root pointing at the CMS checkout?"
        ));
    }
    if !redirects_exists {
        warnings.push(format!(
            "{} is missing; redirect resolution will use an empty table",
            normalize_for_display(&paths.redirects_path)
        ));
    }
    if !released_articles_exists {
        warnings.push(format!(
            "{} is missing; routes cannot be registered or verified",
            normalize_for_display(&paths.released_articles_path)
        ));
    }

    RuntimeStatus {
        project_root_exists: paths.project_root.exists(),
        articles_exists,
        categories_exists,
        redirects_exists,
        released_articles_exists,
        config_exists: paths.config_path.exists(),
        warnings,
    }
}

pub fn ensure_articles_dir(paths: &ResolvedPaths, status: &RuntimeStatus) -> Result<()> {
    if !status.articles_exists {
        bail!(
            "Articles collection not found at {}\nRun from the CMS checkout or pass --project-root <dir>.",
            normalize_for_display(&paths.articles_dir)
        );
    }
    Ok(())
}

pub fn ensure_reports_dir(paths: &ResolvedPaths) -> Result<PathBuf> {
    fs::create_dir_all(&paths.reports_dir)
        .with_context(|| format!("failed to create {}", paths.reports_dir.display()))?;
    Ok(paths.reports_dir.clone())
}

pub fn resolve_paths(
    context: &ResolutionContext,
    overrides: &PathOverrides,
) -> Result<ResolvedPaths> {
    resolve_paths_with_lookup(context, overrides, |key| env::var(key).ok())
}

fn resolve_paths_with_lookup<F>(
    context: &ResolutionContext,
    overrides: &PathOverrides,
    lookup_env: F,
) -> Result<ResolvedPaths>
where
    F: Fn(&str) -> Option<String>,
{
    let (project_root, root_source) = resolve_project_root(context, overrides, &lookup_env)
        .context("failed to resolve project root")?;

    let state_dir = project_root.join(STATE_DIR_NAME);
    let collections = project_root.join("content").join("collections");
    let routing = project_root.join("app").join("Routing");

    let (config_path, config_source) = if let Some(path) = overrides.config.as_deref() {
        (absolutize(path, &project_root), ValueSource::Flag)
    } else if let Some(value) = env_value(&lookup_env, "BARDTOOL_CONFIG") {
        (absolutize(Path::new(&value), &project_root), ValueSource::Env)
    } else {
        (state_dir.join(CONFIG_FILENAME), ValueSource::Default)
    };

    Ok(ResolvedPaths {
        articles_dir: collections.join("articles"),
        categories_dir: collections.join("categories"),
        authors_dir: collections.join("authors"),
        redirects_path: routing.join("redirects.php"),
        released_articles_path: routing.join("migration").join("released-articles.php"),
        reports_dir: state_dir.join("reports"),
        project_root,
        state_dir,
        config_path,
        root_source,
        config_source,
    })
}

fn env_value<F>(lookup_env: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup_env(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn resolve_project_root<F>(
    context: &ResolutionContext,
    overrides: &PathOverrides,
    lookup_env: &F,
) -> Result<(PathBuf, ValueSource)>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(path) = overrides.project_root.as_deref() {
        return Ok((absolutize(path, &context.cwd), ValueSource::Flag));
    }

    if let Some(value) = env_value(lookup_env, "BARDTOOL_PROJECT_ROOT") {
        return Ok((absolutize(Path::new(&value), &context.cwd), ValueSource::Env));
    }

    Ok(detect_project_root_heuristic(
        &context.cwd,
        context.executable_dir.as_deref(),
    ))
}

fn detect_project_root_heuristic(
    cwd: &Path,
    executable_dir: Option<&Path>,
) -> (PathBuf, ValueSource) {
    let mut seen = HashSet::new();
    for candidate in candidate_roots(cwd, executable_dir) {
        let key = normalize_for_display(&candidate);
        if !seen.insert(key) {
            continue;
        }
        if candidate.join(ARTICLES_REL).is_dir() {
            return (candidate, ValueSource::Heuristic);
        }
    }
    (cwd.to_path_buf(), ValueSource::Default)
}

fn candidate_roots(cwd: &Path, executable_dir: Option<&Path>) -> Vec<PathBuf> {
    let mut out = ancestors(cwd);
    if let Some(exe_dir) = executable_dir {
        out.extend(ancestors(exe_dir));
    }
    out
}

fn ancestors(path: &Path) -> Vec<PathBuf> {
    path.ancestors().map(Path::to_path_buf).collect()
}

fn absolutize(path: &Path, base: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

pub fn normalize_for_display(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
