use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use bardtool_core::article::{
    ValidationReport, add_redirect_entry, add_release_route, article_route, article_slug,
    category_exists, find_author_uuid, find_entry_uuid, fix_article, list_entries,
    register_redirect, register_release, validate,
};
use bardtool_core::assets::{
    ImageMappingFile, build_store, plan_uploads, remap_image_urls, upload_images,
};
use bardtool_core::config::{Settings, load_config};
use bardtool_core::document::Document;
use bardtool_core::filesystem::{
    read_text, scan_articles, unified_diff, write_if_changed, write_report,
};
use bardtool_core::html::extract_seo;
use bardtool_core::http::{HtmlFetcher, HttpFetcher};
use bardtool_core::images::extract_images;
use bardtool_core::links::{
    LinkStatus, apply_links, extract_content_link_map, extract_link_map, extract_links,
    plan_links,
};
use bardtool_core::reconcile::reconcile_document;
use bardtool_core::redirects::{
    HttpRedirectProbe, RedirectProbe, RedirectTable, fix_document_redirects, resolve_link,
};
use bardtool_core::runtime::{
    PathOverrides, ResolutionContext, ResolvedPaths, ensure_articles_dir, ensure_reports_dir,
    inspect_runtime, normalize_for_display, resolve_paths,
};
use bardtool_core::verify::{VerifyContext, verify_migration};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(
    name = "bardtool",
    version,
    about = "Article migration tooling for Bard-block CMS collections"
)]
struct Cli {
    #[arg(long, global = true, value_name = "PATH")]
    project_root: Option<PathBuf>,
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Print resolved runtime diagnostics")]
    diagnostics: bool,
    #[arg(long, short, global = true, help = "Log progress at info level")]
    verbose: bool,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Clone)]
struct RuntimeOptions {
    project_root: Option<PathBuf>,
    config: Option<PathBuf>,
    diagnostics: bool,
}

impl RuntimeOptions {
    fn from_cli(cli: &Cli) -> Self {
        Self {
            project_root: cli.project_root.clone(),
            config: cli.config.clone(),
            diagnostics: cli.diagnostics,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Check front-matter quoting, parsing and required fields
    Validate(ValidateArgs),
    /// Merge adjacent rich-text blocks and normalize separators
    Reconcile(ReconcileArgs),
    /// Copy links from a production page into an article
    #[command(name = "add-links")]
    AddLinks(AddLinksArgs),
    /// Rewrite article links through the redirect table and live site
    #[command(name = "fix-redirects")]
    FixRedirects(FixRedirectsArgs),
    /// Show where a single path resolves
    #[command(name = "resolve-redirect")]
    ResolveRedirect(ResolveRedirectArgs),
    /// List content links on a page
    #[command(name = "extract-links")]
    ExtractLinks(ExtractLinksArgs),
    /// Print SEO metadata from a page
    #[command(name = "extract-seo")]
    ExtractSeo(SourceArgs),
    /// List featured and content images on a page
    #[command(name = "extract-images")]
    ExtractImages(SourceArgs),
    /// Download page images and store them under the article slug
    #[command(name = "upload-images")]
    UploadImages(UploadImagesArgs),
    /// Point article image fields at stored paths from a mapping file
    #[command(name = "remap-images")]
    RemapImages(RemapImagesArgs),
    /// Normalize buttons and flags, then register the article route
    #[command(name = "fix-article")]
    FixArticle(FixArticleArgs),
    /// Compare a migrated article against its production page
    #[command(name = "verify-migration")]
    VerifyMigration(VerifyMigrationArgs),
    /// Look up the id of a category or author entry
    #[command(name = "find-uuid")]
    FindUuid(FindUuidArgs),
}

#[derive(Debug, Args)]
struct ValidateArgs {
    file: PathBuf,
}

#[derive(Debug, Args)]
struct ReconcileArgs {
    #[arg(required_unless_present = "all")]
    files: Vec<PathBuf>,
    #[arg(long, conflicts_with = "files", help = "Reconcile every article in the collection")]
    all: bool,
    #[arg(long, help = "Print the diff instead of writing")]
    dry_run: bool,
}

#[derive(Debug, Args)]
struct AddLinksArgs {
    file: PathBuf,
    #[arg(value_name = "HTML_FILE_OR_URL")]
    source: String,
    #[arg(long = "only", value_name = "TEXT", help = "Link only these phrases (repeatable)")]
    only: Vec<String>,
    #[arg(long, help = "Disable fuzzy phrase matching")]
    no_fuzzy: bool,
    #[arg(long, help = "Print the diff instead of writing")]
    dry_run: bool,
}

#[derive(Debug, Args)]
struct FixRedirectsArgs {
    file: PathBuf,
    #[arg(long, help = "Skip HEAD requests against the production site")]
    no_probe: bool,
    #[arg(long, help = "Print the diff instead of writing")]
    dry_run: bool,
}

#[derive(Debug, Args)]
struct ResolveRedirectArgs {
    path: String,
}

#[derive(Debug, Args)]
struct SourceArgs {
    #[arg(value_name = "HTML_FILE_OR_URL")]
    source: String,
}

#[derive(Debug, Args)]
struct ExtractLinksArgs {
    #[arg(value_name = "HTML_FILE_OR_URL")]
    source: String,
    #[arg(long, value_name = "PATH", help = "Write the JSON report to a file")]
    output: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct UploadImagesArgs {
    slug: String,
    #[arg(value_name = "HTML_FILE_OR_URL")]
    source: String,
    #[arg(long, help = "Print the upload plan without downloading")]
    dry_run: bool,
}

#[derive(Debug, Args)]
struct RemapImagesArgs {
    file: PathBuf,
    mapping: PathBuf,
    #[arg(long, help = "Print the diff instead of writing")]
    dry_run: bool,
}

#[derive(Debug, Args)]
struct FixArticleArgs {
    file: PathBuf,
    category: String,
    #[arg(long, value_name = "PATH", help = "Old URL path to redirect to the new route")]
    old_path: Option<String>,
    #[arg(long, help = "Print the diffs instead of writing")]
    dry_run: bool,
}

#[derive(Debug, Args)]
struct VerifyMigrationArgs {
    file: PathBuf,
    production_url: String,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum EntryKind {
    Category,
    Author,
}

#[derive(Debug, Args)]
struct FindUuidArgs {
    #[arg(value_enum)]
    kind: EntryKind,
    slug: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let runtime = RuntimeOptions::from_cli(&cli);

    match cli.command {
        Some(Commands::Validate(args)) => run_validate(&runtime, args),
        Some(Commands::Reconcile(args)) => run_reconcile(&runtime, args),
        Some(Commands::AddLinks(args)) => run_add_links(&runtime, args),
        Some(Commands::FixRedirects(args)) => run_fix_redirects(&runtime, args),
        Some(Commands::ResolveRedirect(args)) => run_resolve_redirect(&runtime, args),
        Some(Commands::ExtractLinks(args)) => run_extract_links(&runtime, args),
        Some(Commands::ExtractSeo(args)) => run_extract_seo(&runtime, args),
        Some(Commands::ExtractImages(args)) => run_extract_images(&runtime, args),
        Some(Commands::UploadImages(args)) => run_upload_images(&runtime, args),
        Some(Commands::RemapImages(args)) => run_remap_images(&runtime, args),
        Some(Commands::FixArticle(args)) => run_fix_article(&runtime, args),
        Some(Commands::VerifyMigration(args)) => run_verify_migration(&runtime, args),
        Some(Commands::FindUuid(args)) => run_find_uuid(&runtime, args),
        None => {
            let mut command = Cli::command();
            command.print_help()?;
            println!();
            Ok(())
        }
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        log::LevelFilter::Info
    } else {
        log::LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .init();
}

struct Workspace {
    paths: ResolvedPaths,
    settings: Settings,
}

fn load_workspace(runtime: &RuntimeOptions) -> Result<Workspace> {
    let paths = resolve_runtime_paths(runtime)?;
    let settings = load_config(&paths.config_path)?.settings(&paths.project_root);
    Ok(Workspace { paths, settings })
}

fn print_diagnostics(runtime: &RuntimeOptions, paths: &ResolvedPaths) {
    if runtime.diagnostics {
        println!("\n[diagnostics]\n{}", paths.diagnostics());
    }
}

fn run_validate(runtime: &RuntimeOptions, args: ValidateArgs) -> Result<()> {
    let workspace = load_workspace(runtime)?;
    let path = article_path(&workspace.paths, &args.file);
    let raw = read_text(&path)?;
    let report = validate(&raw);

    println!("validate");
    println!("file: {}", workspace.paths.display_relative(&path));
    print_validation(&report);
    print_diagnostics(runtime, &workspace.paths);
    if !report.is_valid() {
        bail!("validation failed with {} error(s)", report.errors.len());
    }
    Ok(())
}

fn print_validation(report: &ValidationReport) {
    for error in &report.errors {
        println!("✗ {error}");
    }
    for warning in &report.warnings {
        println!("! {warning}");
    }
    if report.is_valid() {
        println!("✓ valid");
    }
    println!("errors: {}", report.errors.len());
    println!("warnings: {}", report.warnings.len());
}

fn run_reconcile(runtime: &RuntimeOptions, args: ReconcileArgs) -> Result<()> {
    let workspace = load_workspace(runtime)?;
    let paths = &workspace.paths;
    let files = if args.all {
        let status = inspect_runtime(paths);
        ensure_articles_dir(paths, &status)?;
        scan_articles(&paths.articles_dir)?
    } else {
        args.files
            .iter()
            .map(|file| article_path(paths, file))
            .collect()
    };

    println!("reconcile");
    println!("files: {}", files.len());
    let mut changed = 0usize;
    let mut merged = 0usize;
    let mut failed = 0usize;
    for path in &files {
        let label = paths.display_relative(path);
        let result = read_text(path).and_then(|original| {
            let mut document = Document::parse(&original)?;
            let report = reconcile_document(&mut document)?;
            let updated = document.serialize();
            let wrote = commit(path, &label, &original, &updated, args.dry_run)?;
            Ok((report, wrote))
        });
        match result {
            Ok((report, wrote)) => {
                merged += report.merged;
                if wrote {
                    changed += 1;
                    println!(
                        "✓ {label}: merged {} block(s), {} separator change(s)",
                        report.merged, report.separators_changed
                    );
                } else {
                    log::info!("{label}: already reconciled");
                }
            }
            Err(error) => {
                failed += 1;
                println!("✗ {label}: {error:#}");
            }
        }
    }
    println!("changed: {changed}");
    println!("merged_blocks: {merged}");
    println!("failed: {failed}");
    print_diagnostics(runtime, paths);
    if failed > 0 {
        bail!("{failed} file(s) could not be reconciled");
    }
    Ok(())
}

fn run_add_links(runtime: &RuntimeOptions, args: AddLinksArgs) -> Result<()> {
    let workspace = load_workspace(runtime)?;
    let settings = &workspace.settings;
    let path = article_path(&workspace.paths, &args.file);
    let original = read_text(&path)?;
    let mut document = Document::parse(&original)?;

    let html = load_html(&args.source, settings)?;
    let mut options = settings.matching.clone();
    if args.no_fuzzy {
        options.fuzzy = false;
    }
    // Every body anchor is requested in bulk mode, so each must appear verbatim.
    let (map, planned, unmatched) = if args.only.is_empty() {
        let map = extract_content_link_map(&html, &settings.exclusions);
        options.fuzzy = false;
        let planned = map.anchors();
        (map, planned, Vec::new())
    } else {
        let map = extract_link_map(&html, &settings.exclusions);
        let (planned, unmatched) = plan_links(&map, &args.only, &options, &settings.aliases);
        (map, planned, unmatched)
    };

    let report = apply_links(&mut document, &planned, &options, &settings.site)?;
    let label = workspace.paths.display_relative(&path);
    let wrote = commit(&path, &label, &original, &document.serialize(), args.dry_run)?;

    println!("add-links");
    println!("file: {label}");
    println!("source: {}", args.source);
    println!("link_map: {}", map.len());
    for phrase in &unmatched {
        println!("✗ no anchor on page for {phrase:?}");
    }
    for item in &report.items {
        match &item.status {
            LinkStatus::Added { matched, .. } => {
                println!("✓ {matched:?} -> {}", item.href);
            }
            LinkStatus::AlreadyLinked => {
                println!("- {:?} already linked", item.text);
            }
            LinkStatus::NotFound { reason } => {
                println!("✗ {reason}");
            }
        }
    }
    println!("requested: {}", report.requested + unmatched.len());
    println!("added: {}", report.added);
    println!("already_linked: {}", report.already_linked);
    println!("not_found: {}", report.not_found + unmatched.len());
    println!("merged_blocks: {}", report.merged_blocks);
    println!("written: {wrote}");
    print_diagnostics(runtime, &workspace.paths);
    Ok(())
}

fn run_fix_redirects(runtime: &RuntimeOptions, args: FixRedirectsArgs) -> Result<()> {
    let workspace = load_workspace(runtime)?;
    let settings = &workspace.settings;
    let path = article_path(&workspace.paths, &args.file);
    let original = read_text(&path)?;
    let mut document = Document::parse(&original)?;
    let table = RedirectTable::load_or_empty(&workspace.paths.redirects_path)?;

    let mut http_probe = if args.no_probe {
        None
    } else {
        Some(HttpRedirectProbe::new(&settings.site, &settings.http)?)
    };
    let probe = http_probe
        .as_mut()
        .map(|probe| probe as &mut dyn RedirectProbe);
    let report = fix_document_redirects(&mut document, &table, probe, &settings.site)?;

    let label = workspace.paths.display_relative(&path);
    let wrote = commit(&path, &label, &original, &document.serialize(), args.dry_run)?;

    println!("fix-redirects");
    println!("file: {label}");
    println!("redirect_table: {} entries", table.len());
    for change in &report.changes {
        println!("✓ {} -> {}", change.from, change.to);
    }
    for text in &report.removed_texts {
        println!("- unlinked {text:?} (articles index)");
    }
    println!("checked: {}", report.checked);
    println!("fixed: {}", report.fixed);
    println!("removed: {}", report.removed);
    println!("skipped: {}", report.skipped);
    println!("probe_errors: {}", report.errors);
    println!("written: {wrote}");
    print_diagnostics(runtime, &workspace.paths);
    Ok(())
}

fn run_resolve_redirect(runtime: &RuntimeOptions, args: ResolveRedirectArgs) -> Result<()> {
    let workspace = load_workspace(runtime)?;
    let table = RedirectTable::load_or_empty(&workspace.paths.redirects_path)?;
    let resolved = resolve_link(&args.path, &table, &workspace.settings.site);

    println!("resolve-redirect");
    println!("original: {}", resolved.original);
    println!("resolved: {}", resolved.resolved);
    println!("changed: {}", format_flag(resolved.changed));
    print_diagnostics(runtime, &workspace.paths);
    Ok(())
}

fn run_extract_links(runtime: &RuntimeOptions, args: ExtractLinksArgs) -> Result<()> {
    let workspace = load_workspace(runtime)?;
    let settings = &workspace.settings;
    let html = load_html(&args.source, settings)?;
    let table = RedirectTable::load_or_empty(&workspace.paths.redirects_path)?;
    let report = extract_links(&html, &settings.site, &table, &settings.exclusions);

    match &args.output {
        Some(output) => {
            write_report(output, &report)?;
            println!("report: {}", normalize_for_display(output));
        }
        None => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    println!("links: {}", report.links.len());
    println!("internal: {}", report.internal);
    println!("external: {}", report.external);
    println!("redirected: {}", report.redirected);
    print_diagnostics(runtime, &workspace.paths);
    Ok(())
}

fn run_extract_seo(runtime: &RuntimeOptions, args: SourceArgs) -> Result<()> {
    let workspace = load_workspace(runtime)?;
    let html = load_html(&args.source, &workspace.settings)?;
    let report = extract_seo(&html);
    println!("{}", serde_json::to_string_pretty(&report)?);
    print_diagnostics(runtime, &workspace.paths);
    Ok(())
}

fn run_extract_images(runtime: &RuntimeOptions, args: SourceArgs) -> Result<()> {
    let workspace = load_workspace(runtime)?;
    let html = load_html(&args.source, &workspace.settings)?;
    let report = extract_images(&html, &workspace.settings.images);
    println!("{}", serde_json::to_string_pretty(&report)?);
    println!("featured: {}", report.counts.featured);
    println!("content: {}", report.counts.content);
    println!("skipped: {}", report.counts.skipped);
    print_diagnostics(runtime, &workspace.paths);
    Ok(())
}

fn run_upload_images(runtime: &RuntimeOptions, args: UploadImagesArgs) -> Result<()> {
    let workspace = load_workspace(runtime)?;
    let settings = &workspace.settings;
    let html = load_html(&args.source, settings)?;
    let images = extract_images(&html, &settings.images);
    let plan = plan_uploads(
        &args.slug,
        &images.urls(),
        &settings.storage.base_path,
        &settings.images,
    );

    println!("upload-images");
    println!("slug: {}", args.slug);
    println!("backend: {}", settings.storage.backend.as_str());
    if args.dry_run {
        for item in &plan {
            println!("- {} -> {} ({})", item.original_url, item.path, item.image_type);
        }
        println!("planned: {}", plan.len());
        print_diagnostics(runtime, &workspace.paths);
        return Ok(());
    }

    let mut store = build_store(&settings.storage, &settings.http)?;
    let mut fetcher = HttpFetcher::new(&settings.http)?;
    let report = upload_images(&mut fetcher, store.as_mut(), &plan, &settings.images);
    for error in &report.errors {
        println!("✗ {error}");
    }

    let mapping = ImageMappingFile {
        article_slug: args.slug.clone(),
        article_url: args.source.clone(),
        images: report.images.clone(),
    };
    let mapping_path = ensure_reports_dir(&workspace.paths)?.join(format!("{}-images.json", args.slug));
    write_report(&mapping_path, &mapping)?;

    println!("planned: {}", plan.len());
    println!("uploaded: {}", report.uploaded);
    println!("skipped: {}", report.skipped);
    println!("failed: {}", report.failed);
    println!("mapping: {}", workspace.paths.display_relative(&mapping_path));
    print_diagnostics(runtime, &workspace.paths);
    if report.failed > 0 {
        bail!("{} image(s) failed to upload", report.failed);
    }
    Ok(())
}

fn run_remap_images(runtime: &RuntimeOptions, args: RemapImagesArgs) -> Result<()> {
    let workspace = load_workspace(runtime)?;
    let path = article_path(&workspace.paths, &args.file);
    let original = read_text(&path)?;
    let mut document = Document::parse(&original)?;
    let mapping_text = read_text(&args.mapping)?;
    let mapping: ImageMappingFile = serde_json::from_str(&mapping_text)
        .with_context(|| format!("failed to parse {}", args.mapping.display()))?;

    let replaced = remap_image_urls(&mut document, &mapping.images);
    let label = workspace.paths.display_relative(&path);
    let wrote = commit(&path, &label, &original, &document.serialize(), args.dry_run)?;

    println!("remap-images");
    println!("file: {label}");
    println!("mappings: {}", mapping.images.len());
    println!("replaced: {replaced}");
    println!("written: {wrote}");
    print_diagnostics(runtime, &workspace.paths);
    Ok(())
}

fn run_fix_article(runtime: &RuntimeOptions, args: FixArticleArgs) -> Result<()> {
    let workspace = load_workspace(runtime)?;
    let paths = &workspace.paths;
    if !category_exists(&paths.categories_dir, &args.category) {
        let known = list_entries(&paths.categories_dir).unwrap_or_default();
        bail!(
            "unknown category `{}`; known categories: {}",
            args.category,
            if known.is_empty() {
                "<none>".to_string()
            } else {
                known.join(", ")
            }
        );
    }

    let path = article_path(paths, &args.file);
    let original = read_text(&path)?;
    let mut document = Document::parse(&original)?;
    let report = fix_article(&mut document, &args.category)?;
    let Some(slug) = article_slug(&path, &document) else {
        bail!("cannot determine slug for {}", path.display());
    };
    let route = article_route(&args.category, &slug);

    let label = paths.display_relative(&path);
    let wrote = commit(&path, &label, &original, &document.serialize(), args.dry_run)?;

    let (route_added, redirect_added) = if args.dry_run {
        let released = preview_edit(&paths.released_articles_path, paths, |text| {
            add_release_route(text, &route)
        })?;
        let redirect = match &args.old_path {
            Some(old) => preview_edit(&paths.redirects_path, paths, |text| {
                add_redirect_entry(text, old, &route)
            })?,
            None => false,
        };
        (released, redirect)
    } else {
        let released = register_release(&paths.released_articles_path, &route)?;
        let redirect = match &args.old_path {
            Some(old) => register_redirect(&paths.redirects_path, old, &route)?,
            None => false,
        };
        (released, redirect)
    };

    println!("fix-article");
    println!("file: {label}");
    println!("route: {route}");
    println!("buttons: {}", report.buttons);
    println!("buttons_fixed: {}", report.buttons_fixed);
    println!("alignments_fixed: {}", report.alignments_fixed);
    println!("bold_removed: {}", report.bold_removed);
    if let Some((previous, current)) = &report.slug_category {
        println!(
            "slug_category: {} -> {current}",
            previous.as_deref().unwrap_or("<none>")
        );
    }
    println!("flags_changed: {:?}", report.flags_changed);
    println!("written: {wrote}");
    println!("route_registered: {}", format_flag(route_added));
    if args.old_path.is_some() {
        println!("redirect_registered: {}", format_flag(redirect_added));
    }
    print_diagnostics(runtime, paths);
    Ok(())
}

/// Prints the diff an edit would make to a routing file; true when it would change.
fn preview_edit<F>(path: &Path, paths: &ResolvedPaths, edit: F) -> Result<bool>
where
    F: FnOnce(&str) -> Result<Option<String>>,
{
    let original = read_text(path)?;
    match edit(&original)? {
        Some(updated) => {
            print!("{}", unified_diff(&paths.display_relative(path), &original, &updated));
            Ok(true)
        }
        None => Ok(false),
    }
}

fn run_verify_migration(runtime: &RuntimeOptions, args: VerifyMigrationArgs) -> Result<()> {
    let workspace = load_workspace(runtime)?;
    let paths = &workspace.paths;
    let settings = &workspace.settings;
    let path = article_path(paths, &args.file);
    let raw = read_text(&path)?;
    let document = Document::parse(&raw)?;
    let table = RedirectTable::load_or_empty(&paths.redirects_path)?;

    let production_html = match load_html(&args.production_url, settings) {
        Ok(html) => Some(html),
        Err(error) => {
            log::warn!("production page unavailable: {error:#}");
            None
        }
    };
    let context = VerifyContext {
        site: &settings.site,
        table: &table,
        released_articles: read_optional(&paths.released_articles_path)?,
        redirects_text: read_optional(&paths.redirects_path)?,
        rules: &settings.verify,
    };
    let report = verify_migration(&path, &document, &raw, production_html.as_deref(), &context)?;

    println!("verify-migration");
    println!("file: {}", paths.display_relative(&path));
    println!("production_url: {}", args.production_url);
    for line in &report.info {
        println!("  {line}");
    }
    for warning in &report.warnings {
        println!("! {warning}");
    }
    for error in &report.errors {
        println!("✗ {error}");
    }
    println!("errors: {}", report.errors.len());
    println!("warnings: {}", report.warnings.len());
    print_diagnostics(runtime, paths);
    if !report.passed() {
        bail!("verification failed with {} error(s)", report.errors.len());
    }
    println!("✓ verification passed");
    Ok(())
}

fn run_find_uuid(runtime: &RuntimeOptions, args: FindUuidArgs) -> Result<()> {
    let workspace = load_workspace(runtime)?;
    let paths = &workspace.paths;
    let (dir, found) = match args.kind {
        EntryKind::Category => (
            &paths.categories_dir,
            find_entry_uuid(&paths.categories_dir, &args.slug)?,
        ),
        EntryKind::Author => (
            &paths.authors_dir,
            find_author_uuid(&paths.authors_dir, &args.slug)?,
        ),
    };

    println!("find-uuid");
    println!("query: {}", args.slug);
    match found {
        Some(entry) => {
            println!("uuid: {}", entry.uuid);
            println!("file: {}", entry.file);
            println!("title: {}", entry.title.as_deref().unwrap_or("<none>"));
            print_diagnostics(runtime, paths);
            Ok(())
        }
        None => {
            let known = list_entries(dir).unwrap_or_default();
            println!("available: {}", known.len());
            for name in known {
                println!("  - {name}");
            }
            print_diagnostics(runtime, paths);
            bail!("no entry found for `{}`", args.slug);
        }
    }
}

/// Writes the change, or prints its diff under `--dry-run`.
fn commit(path: &Path, label: &str, original: &str, updated: &str, dry_run: bool) -> Result<bool> {
    if dry_run {
        print!("{}", unified_diff(label, original, updated));
        return Ok(false);
    }
    write_if_changed(path, original, updated)
}

/// Paths that do not exist as given are looked up in the articles collection.
fn article_path(paths: &ResolvedPaths, file: &Path) -> PathBuf {
    if file.exists() || file.is_absolute() {
        return file.to_path_buf();
    }
    let candidate = paths.articles_dir.join(file);
    if candidate.exists() {
        candidate
    } else {
        file.to_path_buf()
    }
}

fn load_html(source: &str, settings: &Settings) -> Result<String> {
    if source.starts_with("http://") || source.starts_with("https://") {
        let mut fetcher = HttpFetcher::new(&settings.http)?;
        return Ok(fetcher.fetch_text(source)?);
    }
    read_text(Path::new(source))
}

fn read_optional(path: &Path) -> Result<Option<String>> {
    if path.is_file() {
        read_text(path).map(Some)
    } else {
        Ok(None)
    }
}

fn resolve_runtime_paths(runtime: &RuntimeOptions) -> Result<ResolvedPaths> {
    dotenvy::dotenv().ok();

    let context = ResolutionContext::from_process()?;
    let overrides = PathOverrides {
        project_root: runtime.project_root.clone(),
        config: runtime.config.clone(),
    };

    let initial = resolve_paths(&context, &overrides)?;
    let project_env = initial.project_root.join(".env");
    if project_env.exists() {
        let _ = dotenvy::from_path_override(&project_env);
    }

    resolve_paths(&context, &overrides)
}

fn format_flag(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}
