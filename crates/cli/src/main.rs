use anyhow::{Context as AnyhowContext, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use docscout_index::{
    is_stale, AreaScanner, BuildConfig, BuildOrchestrator, IndexStore, ManifestStore,
    SummaryCache,
};
use docscout_matcher::{build_previews, MatchOutcome, MatcherConfig, PreviewConfig, RelevanceMatcher};
use docscout_oracle::{HttpOracle, HttpOracleConfig, Oracle, RetryPolicy, StubOracle};
use docscout_publisher::{CachePublisher, PublishConfig, PublishOutcome};
use docscout_vcs::{GitVcs, Scrubber, Vcs};
use std::env;
use std::path::PathBuf;
use std::sync::Arc;

const INDEX_DIR_NAME: &str = ".doc-index";

#[derive(Parser)]
#[command(name = "docscout")]
#[command(about = "Incremental semantic index cache for documentation trees", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors (stdout is reserved for output)
    #[arg(long, global = true)]
    quiet: bool,

    /// Documentation root (overrides DOCSCOUT_DOCS_ROOT; default: docs)
    #[arg(long, global = true)]
    docs_root: Option<PathBuf>,

    /// Oracle backend (overrides DOCSCOUT_ORACLE_MODE; default: http)
    #[arg(long, global = true, value_enum)]
    oracle: Option<OracleMode>,
}

#[derive(Subcommand)]
enum Commands {
    /// List documentation areas and their index freshness
    List(ListArgs),

    /// Build stale area indexes and publish the cache
    Build(BuildArgs),

    /// Print one area's built index
    Show(ShowArgs),

    /// Match a code diff against the built indexes
    #[command(name = "match")]
    Match(MatchArgs),
}

#[derive(Args)]
struct ListArgs {
    /// Output JSON format
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct BuildArgs {
    /// Rebuild every area regardless of freshness
    #[arg(long)]
    force: bool,

    /// Worker pool width (overrides DOCSCOUT_WORKERS)
    #[arg(long)]
    workers: Option<usize>,

    /// Skip pushing cache artifacts to the shared branch
    #[arg(long)]
    no_publish: bool,

    /// Output JSON format
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct ShowArgs {
    /// Area name, e.g. "guides"
    area: String,
}

#[derive(Args)]
struct MatchArgs {
    /// Base ref to diff against (merge-base with HEAD)
    #[arg(long, default_value = "origin/main")]
    base: String,

    /// Area indexes per matching prompt (overrides DOCSCOUT_BATCH_SIZE)
    #[arg(long)]
    batch_size: Option<usize>,

    /// Skip pushing refreshed summaries to the shared branch
    #[arg(long)]
    no_publish: bool,

    /// Output JSON format
    #[arg(long)]
    json: bool,
}

#[derive(Copy, Clone, ValueEnum)]
enum OracleMode {
    Http,
    Stub,
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut cli = Cli::parse();

    // Keep stdout clean for JSON parsing
    let json_output = match &cli.command {
        Commands::List(args) => args.json,
        Commands::Build(args) => args.json,
        Commands::Match(args) => args.json,
        Commands::Show(_) => false,
    };
    if json_output {
        cli.quiet = true;
    }

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    let docs_root = resolve_docs_root(&cli);
    let index_root = docs_root.join(INDEX_DIR_NAME);

    match cli.command {
        Commands::List(args) => run_list(args, &docs_root, &index_root).await?,
        Commands::Build(args) => {
            let oracle = resolve_oracle(cli.oracle)?;
            run_build(args, &docs_root, &index_root, oracle).await?;
        }
        Commands::Show(args) => run_show(args, &index_root).await?,
        Commands::Match(args) => {
            let oracle = resolve_oracle(cli.oracle)?;
            run_match(args, &docs_root, &index_root, oracle).await?;
        }
    }

    Ok(())
}

fn resolve_docs_root(cli: &Cli) -> PathBuf {
    cli.docs_root
        .clone()
        .or_else(|| env::var("DOCSCOUT_DOCS_ROOT").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("docs"))
}

fn resolve_oracle(flag: Option<OracleMode>) -> Result<Arc<dyn Oracle>> {
    let mode = flag.unwrap_or_else(|| {
        match env::var("DOCSCOUT_ORACLE_MODE").as_deref() {
            Ok("stub") => OracleMode::Stub,
            _ => OracleMode::Http,
        }
    });

    match mode {
        OracleMode::Stub => {
            log::warn!("Using stub oracle; no external calls will be made");
            Ok(Arc::new(StubOracle::new()))
        }
        OracleMode::Http => {
            let endpoint = env::var("DOCSCOUT_ORACLE_URL")
                .context("DOCSCOUT_ORACLE_URL is required for the http oracle")?;
            let api_key = env::var("DOCSCOUT_ORACLE_API_KEY")
                .context("DOCSCOUT_ORACLE_API_KEY is required for the http oracle")?;
            let oracle = HttpOracle::new(HttpOracleConfig::new(endpoint, api_key))
                .context("Failed to construct oracle client")?;
            Ok(Arc::new(oracle))
        }
    }
}

fn env_usize(var: &str) -> Option<usize> {
    let raw = env::var(var).ok()?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            log::warn!("Ignoring non-numeric {var}={raw}");
            None
        }
    }
}

fn publish_config(index_root: &std::path::Path) -> PublishConfig {
    let defaults = PublishConfig::default();
    PublishConfig {
        remote: env::var("DOCSCOUT_REMOTE").unwrap_or(defaults.remote),
        shared_branch: env::var("DOCSCOUT_BRANCH").unwrap_or(defaults.shared_branch),
        index_root: index_root.to_path_buf(),
    }
}

fn git_vcs() -> Arc<dyn Vcs> {
    Arc::new(GitVcs::new(".", Scrubber::from_env()))
}

/// List areas with file counts and index freshness.
async fn run_list(args: ListArgs, docs_root: &std::path::Path, index_root: &std::path::Path) -> Result<()> {
    let scanner = AreaScanner::new(docs_root, INDEX_DIR_NAME);
    let manifest = ManifestStore::new(index_root).load().await;

    let mut rows = Vec::new();
    for area in scanner.scan() {
        let stale = is_stale(docs_root, &area, &manifest).await;
        rows.push((area.name.clone(), area.files.len(), stale));
    }

    if args.json {
        let value: Vec<_> = rows
            .iter()
            .map(|(name, files, stale)| {
                serde_json::json!({
                    "area": name,
                    "files": files,
                    "status": if *stale { "stale" } else { "fresh" },
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    if rows.is_empty() {
        eprintln!("No documentation areas under {}", docs_root.display());
        return Ok(());
    }
    for (name, files, stale) in rows {
        println!(
            "{:<30} {:>4} files  {}",
            name,
            files,
            if stale { "stale" } else { "fresh" }
        );
    }
    Ok(())
}

/// Rebuild stale indexes, then publish whatever is safe to share.
async fn run_build(
    args: BuildArgs,
    docs_root: &std::path::Path,
    index_root: &std::path::Path,
    oracle: Arc<dyn Oracle>,
) -> Result<()> {
    let workers = args
        .workers
        .or_else(|| env_usize("DOCSCOUT_WORKERS"))
        .unwrap_or(BuildConfig::default().workers);
    let config = BuildConfig {
        workers,
        force: args.force,
    };

    let report = BuildOrchestrator::new(docs_root, index_root, oracle, config)
        .run()
        .await?;

    if args.json {
        let statuses: serde_json::Map<String, serde_json::Value> = report
            .statuses
            .iter()
            .map(|(area, status)| (area.clone(), status.as_str().into()))
            .collect();
        println!("{}", serde_json::to_string_pretty(&statuses)?);
    } else {
        for (area, status) in &report.statuses {
            println!("{:<30} {}", area, status.as_str());
        }
    }

    if !args.no_publish {
        let summaries = SummaryCache::open(index_root).await.snapshot().await;
        let publisher = CachePublisher::new(git_vcs(), publish_config(index_root));
        report_publish(publisher.publish(&summaries).await);
    }

    if report.has_failures() {
        eprintln!("Some areas failed to build; they will be retried next run");
        std::process::exit(1);
    }
    Ok(())
}

async fn run_show(args: ShowArgs, index_root: &std::path::Path) -> Result<()> {
    let store = IndexStore::new(index_root);
    match store.load(&args.area).await? {
        Some(content) => {
            println!("{content}");
            Ok(())
        }
        None => anyhow::bail!(
            "No index built for area '{}' (run `docscout build` first)",
            args.area
        ),
    }
}

/// Two-stage match of the branch diff against the built indexes.
async fn run_match(
    args: MatchArgs,
    docs_root: &std::path::Path,
    index_root: &std::path::Path,
    oracle: Arc<dyn Oracle>,
) -> Result<()> {
    let vcs = git_vcs();
    let diff = vcs.diff_since_merge_base(&args.base).await?;
    if diff.text.trim().is_empty() {
        eprintln!("No changes against {}", args.base);
        return Ok(());
    }
    log::info!(
        "Matching {} changed files against built indexes",
        diff.changed_files.len()
    );

    let mut matcher_config = MatcherConfig::default();
    if let Some(size) = args.batch_size.or_else(|| env_usize("DOCSCOUT_BATCH_SIZE")) {
        matcher_config.area_batch_size = size;
    }
    let matcher = RelevanceMatcher::new(oracle.clone()).with_config(matcher_config);

    let indexes = IndexStore::new(index_root).load_all().await?;
    let scanner = AreaScanner::new(docs_root, INDEX_DIR_NAME);
    let areas = match matcher.find_relevant_areas(&diff.text, &indexes).await {
        MatchOutcome::Areas(areas) => areas,
        MatchOutcome::ScanAll => {
            log::info!("Falling back to a full scan of every area");
            scanner.scan().into_iter().map(|a| a.name).collect()
        }
    };

    let candidates = scanner.candidate_files(&areas);
    let cache = Arc::new(SummaryCache::open(index_root).await);
    let previews = build_previews(
        docs_root,
        &candidates,
        cache.clone(),
        oracle,
        RetryPolicy::oracle_default(),
        PreviewConfig::default(),
    )
    .await;
    let files = matcher.find_relevant_files(&diff.text, &previews).await;

    if args.json {
        let value = serde_json::json!({ "areas": areas, "files": files });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        eprintln!("{} relevant files:", files.len());
        for file in &files {
            println!("{file}");
        }
    }

    // Summary generation may have refreshed the cache.
    if !args.no_publish {
        let publisher = CachePublisher::new(vcs, publish_config(index_root));
        report_publish(publisher.publish(&cache.snapshot().await).await);
    }

    Ok(())
}

fn report_publish(outcome: PublishOutcome) {
    match outcome {
        PublishOutcome::Published => eprintln!("Published cache to the shared branch"),
        PublishOutcome::SummariesOnly(sources) => {
            eprintln!("Published {} summaries (branch diverged)", sources.len());
        }
        PublishOutcome::NothingToPublish => eprintln!("Cache already up to date on the shared branch"),
        PublishOutcome::NotPublished => eprintln!("Cache not published; kept locally"),
    }
}
