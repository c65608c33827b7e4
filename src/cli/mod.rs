//! # CLI Module
//!
//! Command-line interface for the media organizer.
//!
//! ## Usage
//! ```bash
//! # File a camera dump into <target>/<yyyy>/<MM>/
//! media-organizer prepare ~/Downloads/dcim --target ~/Photos --move
//!
//! # Rename by metadata hash and drop exact duplicates
//! media-organizer rename-by-meta ~/Photos --dry-run
//!
//! # Find look-alike images that carry no metadata
//! media-organizer find-same ~/Photos --threshold 95
//!
//! # JSON output
//! media-organizer --output json meta-stats ~/Photos
//! ```

mod output;
mod progress;

use clap::{Args, Parser, Subcommand, ValueEnum};
use console::{style, Term};
use media_hash_organizer::core::cache::{default_cache_path, CacheBackend, SqliteCache};
use media_hash_organizer::core::loader::MediaLoader;
use media_hash_organizer::core::media::{MediaFile, MediaKind};
use media_hash_organizer::core::metadata::{MediaMetadataExtractor, MetadataExtractor};
use media_hash_organizer::core::organize::{OperationMode, OrganizeConfig, Organizer};
use media_hash_organizer::core::pipeline::{validate_roots, CancellationToken, RenamePipeline};
use media_hash_organizer::core::scanner::{MediaScanner, ScanConfig, WalkDirScanner};
use media_hash_organizer::core::similar::{SimilarConfig, SimilarScanner, DEFAULT_THRESHOLD};
use media_hash_organizer::core::stats::MetadataStats;
use media_hash_organizer::error::{OrganizerError, Result, ScanError};
use media_hash_organizer::events::{EventChannel, EventSender};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Media Organizer - name, deduplicate and file photos and videos by metadata
#[derive(Parser, Debug)]
#[command(name = "media-organizer")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct GlobalArgs {
    /// Metadata cache database path
    #[arg(long, global = true)]
    cache: Option<PathBuf>,

    /// Read metadata from the files only, never from the cache
    #[arg(long, global = true, conflicts_with = "cache")]
    no_cache: bool,

    /// Output format
    #[arg(short, long, global = true, default_value = "pretty")]
    output: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Include hidden files and directories
    #[arg(long, global = true)]
    include_hidden: bool,

    /// Cancel the run after this many seconds; finished operations are kept
    #[arg(long, global = true, value_name = "SECS")]
    timeout: Option<u64>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Copy or move media into <target>/<yyyy>/<MM>/
    Prepare {
        /// Directories to collect from
        #[arg(required = true)]
        sources: Vec<PathBuf>,

        /// Root of the year/month layout
        #[arg(short, long)]
        target: PathBuf,

        /// Move instead of copy
        #[arg(long = "move")]
        move_files: bool,

        /// Overwrite files already in the target
        #[arg(long)]
        force: bool,

        /// Show the plan without copying or moving anything
        #[arg(long)]
        dry_run: bool,

        /// Folder for files without a capture date
        #[arg(long, default_value = "unsorted")]
        fallback: String,
    },

    /// Rename files after their metadata hash and resolve duplicates
    RenameByMeta {
        /// Directories to process
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Recompute names of already hashed files
        #[arg(long)]
        rehash: bool,

        /// Overwrite existing targets
        #[arg(long)]
        force: bool,

        /// Show the plan without changing anything
        #[arg(long)]
        dry_run: bool,

        /// Keep files in their folder even if the date says otherwise
        #[arg(long)]
        no_path_correction: bool,

        /// Afterwards, look for similar images among those without metadata
        #[arg(long)]
        similar: bool,

        /// Similarity threshold in percent (0-100)
        #[arg(long, default_value_t = DEFAULT_THRESHOLD, value_parser = parse_threshold)]
        threshold: f64,
    },

    /// Find images that look alike
    FindSame {
        /// Directories to search
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Similarity threshold in percent (0-100)
        #[arg(long, default_value_t = DEFAULT_THRESHOLD, value_parser = parse_threshold)]
        threshold: f64,

        /// Compare every image, not only those without metadata
        #[arg(long)]
        all: bool,
    },

    /// Summarize metadata coverage
    MetaStats {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Read metadata into the cache ahead of a run
    CachePreload {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Empty the metadata cache
    CacheClear {
        /// Only drop entries for files that no longer exist
        #[arg(long)]
        prune: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Human-readable output with colors
    Pretty,
    /// JSON output for scripting
    Json,
}

fn parse_threshold(value: &str) -> std::result::Result<f64, String> {
    let threshold: f64 = value
        .parse()
        .map_err(|_| format!("{} is not a number", value))?;
    if !(0.0..=100.0).contains(&threshold) {
        return Err(format!("{} is outside 0-100", threshold));
    }
    Ok(threshold)
}

/// Shared state of one invocation
struct Context {
    global: GlobalArgs,
    term: Term,
    cancel: CancellationToken,
}

impl Context {
    fn pretty(&self) -> bool {
        self.global.output == OutputFormat::Pretty
    }

    fn scan_config(&self) -> ScanConfig {
        ScanConfig {
            include_hidden: self.global.include_hidden,
            ..Default::default()
        }
    }

    fn cache_path(&self) -> PathBuf {
        self.global.cache.clone().unwrap_or_else(default_cache_path)
    }

    fn open_cache(&self) -> Result<Option<Arc<dyn CacheBackend>>> {
        if self.global.no_cache {
            return Ok(None);
        }
        let cache = SqliteCache::open(&self.cache_path())?;
        Ok(Some(Arc::new(cache)))
    }

    fn extractor(&self) -> Arc<dyn MetadataExtractor> {
        let extractor = MediaMetadataExtractor::detect();
        Arc::new(extractor)
    }

    /// Run `work` with a progress renderer draining its events
    fn with_progress<T>(&self, work: impl FnOnce(&EventSender) -> T) -> T {
        let (sender, receiver) = EventChannel::new();
        let renderer = progress::spawn(receiver, self.pretty(), self.global.verbose);
        let result = work(&sender);
        drop(sender);
        renderer.join().ok();
        result
    }

    /// Scan `paths` and read metadata, as the first half of every command
    fn load(&self, paths: &[PathBuf], kinds: Vec<MediaKind>, events: &EventSender) -> Result<Loaded> {
        let roots = validate_roots(paths)?;
        let scanner = WalkDirScanner::new(ScanConfig {
            kinds,
            ..self.scan_config()
        })
        .with_cancellation(self.cancel.clone());

        let scanned = match scanner.scan_with_events(&roots, events) {
            Ok(scanned) => scanned,
            Err(ScanError::Cancelled) => return Ok(Loaded::default()),
            Err(e) => return Err(e.into()),
        };

        let mut loader = MediaLoader::new(self.extractor());
        if let Some(cache) = self.open_cache()? {
            loader = loader.with_cache(cache);
        }
        let loaded = loader.load(&scanned.files, events, &self.cancel);

        let mut failures: Vec<String> = scanned.errors.iter().map(ToString::to_string).collect();
        failures.extend(loaded.errors.iter().map(ToString::to_string));

        Ok(Loaded {
            files: loaded.files,
            failures,
            cache_hits: loaded.cache_hits,
        })
    }
}

#[derive(Default)]
struct Loaded {
    files: Vec<MediaFile>,
    failures: Vec<String>,
    cache_hits: usize,
}

/// Run the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    media_hash_organizer::init_tracing(if cli.global.verbose { "debug" } else { "warn" });

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        if let Err(e) = ctrlc::set_handler(move || {
            tracing::warn!("Interrupted, finishing operations in flight");
            cancel.cancel();
        }) {
            tracing::warn!("Could not install Ctrl-C handler: {}", e);
        }
    }
    if let Some(secs) = cli.global.timeout {
        cancel.cancel_after(Duration::from_secs(secs));
    }

    let ctx = Context {
        global: cli.global,
        term: Term::stderr(),
        cancel,
    };

    match cli.command {
        Commands::Prepare {
            sources,
            target,
            move_files,
            force,
            dry_run,
            fallback,
        } => {
            let config = OrganizeConfig {
                sources,
                target,
                operation: if move_files {
                    OperationMode::Move
                } else {
                    OperationMode::Copy
                },
                force,
                dry_run,
                fallback,
                scan_config: ctx.scan_config(),
            };
            run_prepare(&ctx, config)
        }
        Commands::RenameByMeta {
            paths,
            rehash,
            force,
            dry_run,
            no_path_correction,
            similar,
            threshold,
        } => {
            let mut builder = RenamePipeline::builder()
                .paths(paths)
                .rehash(rehash)
                .force(force)
                .dry_run(dry_run)
                .path_correction(!no_path_correction)
                .scan_config(ctx.scan_config())
                .extractor(ctx.extractor())
                .cancellation(ctx.cancel.clone());
            if let Some(cache) = ctx.open_cache()? {
                builder = builder.cache(cache);
            }
            run_rename(&ctx, builder.build(), similar.then_some(threshold))
        }
        Commands::FindSame {
            paths,
            threshold,
            all,
        } => run_find_same(&ctx, &paths, threshold, all),
        Commands::MetaStats { paths } => run_meta_stats(&ctx, &paths),
        Commands::CachePreload { paths } => run_cache_preload(&ctx, &paths),
        Commands::CacheClear { prune } => run_cache_clear(&ctx, prune),
    }
}

fn run_prepare(ctx: &Context, config: OrganizeConfig) -> Result<()> {
    output::header(ctx, "Prepare");

    let mut organizer = Organizer::new(config)
        .with_extractor(ctx.extractor())
        .with_cancellation(ctx.cancel.clone());
    if let Some(cache) = ctx.open_cache()? {
        organizer = organizer.with_cache(cache);
    }

    let result = ctx.with_progress(|events| organizer.run_with_events(events))?;

    match ctx.global.output {
        OutputFormat::Pretty => output::print_organize(&ctx.term, &result, ctx.global.verbose),
        OutputFormat::Json => output::print_json(&output::organize_json(&result)),
    }

    let failed = result.errors.len() + result.scan_errors.len();
    if failed > 0 {
        return Err(OrganizerError::PartialFailure { failed });
    }
    Ok(())
}

fn run_rename(ctx: &Context, pipeline: RenamePipeline, similar: Option<f64>) -> Result<()> {
    output::header(ctx, "Rename by metadata");

    let report = ctx.with_progress(|events| pipeline.run_with_events(events))?;

    let similar_result = match similar {
        Some(threshold) if !report.no_metadata_images.is_empty() && !report.cancelled => {
            let scanner = SimilarScanner::new(SimilarConfig { threshold });
            Some(ctx.with_progress(|events| {
                scanner.scan(&report.no_metadata_images, events, &ctx.cancel)
            }))
        }
        _ => None,
    };

    match ctx.global.output {
        OutputFormat::Pretty => {
            output::print_rename(&ctx.term, &report, ctx.global.verbose);
            if let Some(result) = &similar_result {
                output::print_similar(&ctx.term, result);
            }
        }
        OutputFormat::Json => {
            let mut json = output::rename_json(&report);
            if let Some(result) = &similar_result {
                json["similar"] = output::similar_json(result);
            }
            output::print_json(&json);
        }
    }

    let failed = report.errors.len() + report.scan_errors.len();
    if failed > 0 {
        return Err(OrganizerError::PartialFailure { failed });
    }
    Ok(())
}

fn run_find_same(ctx: &Context, paths: &[PathBuf], threshold: f64, all: bool) -> Result<()> {
    output::header(ctx, "Find similar images");

    let result = ctx.with_progress(|events| -> Result<_> {
        let loaded = ctx.load(paths, vec![MediaKind::Image], events)?;
        let images: Vec<PathBuf> = loaded
            .files
            .iter()
            .filter(|file| all || file.metadata().is_empty())
            .map(|file| file.path().to_path_buf())
            .collect();
        tracing::info!("Comparing {} image(s)", images.len());

        let scanner = SimilarScanner::new(SimilarConfig { threshold });
        Ok(scanner.scan(&images, events, &ctx.cancel))
    })?;

    match ctx.global.output {
        OutputFormat::Pretty => output::print_similar(&ctx.term, &result),
        OutputFormat::Json => output::print_json(&output::similar_json(&result)),
    }
    Ok(())
}

fn run_meta_stats(ctx: &Context, paths: &[PathBuf]) -> Result<()> {
    output::header(ctx, "Metadata statistics");

    let loaded = ctx.with_progress(|events| {
        ctx.load(paths, vec![MediaKind::Image, MediaKind::Video], events)
    })?;
    let stats = MetadataStats::collect(&loaded.files);

    match ctx.global.output {
        OutputFormat::Pretty => output::print_stats(&ctx.term, &stats, &loaded.failures),
        OutputFormat::Json => output::print_json(&serde_json::json!({
            "stats": stats,
            "failures": loaded.failures,
        })),
    }

    if !loaded.failures.is_empty() {
        return Err(OrganizerError::PartialFailure {
            failed: loaded.failures.len(),
        });
    }
    Ok(())
}

fn run_cache_preload(ctx: &Context, paths: &[PathBuf]) -> Result<()> {
    if ctx.global.no_cache {
        return Err(OrganizerError::Config(
            "cache-preload needs a cache, drop --no-cache".to_string(),
        ));
    }
    output::header(ctx, "Cache preload");

    let loaded = ctx.with_progress(|events| {
        ctx.load(paths, vec![MediaKind::Image, MediaKind::Video], events)
    })?;

    match ctx.global.output {
        OutputFormat::Pretty => {
            ctx.term
                .write_line(&format!(
                    "  {} files cached ({} were already fresh) in {}",
                    style(loaded.files.len()).cyan(),
                    style(loaded.cache_hits).dim(),
                    ctx.cache_path().display()
                ))
                .ok();
            output::print_failures(&ctx.term, &loaded.failures);
        }
        OutputFormat::Json => output::print_json(&serde_json::json!({
            "cached": loaded.files.len(),
            "already_fresh": loaded.cache_hits,
            "cache": ctx.cache_path(),
            "failures": loaded.failures,
        })),
    }

    if !loaded.failures.is_empty() {
        return Err(OrganizerError::PartialFailure {
            failed: loaded.failures.len(),
        });
    }
    Ok(())
}

fn run_cache_clear(ctx: &Context, prune: bool) -> Result<()> {
    if ctx.global.no_cache {
        return Err(OrganizerError::Config(
            "cache-clear needs a cache, drop --no-cache".to_string(),
        ));
    }
    let path = ctx.cache_path();
    if !path.exists() {
        if ctx.pretty() {
            ctx.term
                .write_line(&format!("  No cache at {}", path.display()))
                .ok();
        }
        return Ok(());
    }

    let cache = SqliteCache::open(&path)?;
    let removed = if prune {
        cache.prune_orphans()?
    } else {
        let before = cache.stats()?.total_entries;
        cache.clear()?;
        before
    };

    match ctx.global.output {
        OutputFormat::Pretty => {
            ctx.term
                .write_line(&format!(
                    "{} Removed {} cache entries from {}",
                    style("✓").green().bold(),
                    style(removed).cyan(),
                    path.display()
                ))
                .ok();
        }
        OutputFormat::Json => output::print_json(&serde_json::json!({
            "removed": removed,
            "cache": path,
        })),
    }
    Ok(())
}
