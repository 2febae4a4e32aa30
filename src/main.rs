// pdf2search - CLI for the PDF ingestion pipeline
//
// Wires the pipeline together: stage PDFs, register them in the
// catalog, queue enhancement work, run robots, and manage/query the
// search projection.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use pdf2search_config::Settings;
use pdf2search_core::EnhancementType;
use pdf2search_robots::{
    PaperpileSyncRobot, PdfExtractorRobot, PdftotextExtractor, RobotRunner,
};
use pdf2search_search::{
    EsClient, IndexManager, SearchFilters, SearchHit, SearchOptions, SortOrder,
};
use pdf2search_store::Store;

#[derive(Parser)]
#[command(name = "pdf2search")]
#[command(version)]
#[command(about = "Research-paper PDF ingestion pipeline", long_about = None)]
struct Cli {
    /// Log level: trace, debug, info, warn, error
    #[arg(short = 'v', long, global = true, value_name = "LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the database schema
    InitDb,
    /// Create the search index and alias if missing
    InitEs,
    /// Copy new PDFs from the source directory to the processing directory
    Stage {
        /// Max number of PDFs to copy
        #[arg(long, value_name = "N")]
        limit: Option<usize>,
        /// Glob pattern to match in the source directory
        #[arg(long, default_value = "*.pdf", value_name = "GLOB")]
        pattern: String,
    },
    /// Register PDFs in the processing directory into the catalog
    Register {
        /// Do not enqueue FULL_TEXT work for catalog documents
        #[arg(long)]
        no_queue: bool,
    },
    /// Enqueue PAPERPILE_METADATA work for every catalog document
    QueueMetadata,
    /// Run a robot loop
    RunRobot {
        robot: RobotKind,
        /// Stop after N iterations and exit on empty queue (for tests)
        #[arg(long, value_name = "N")]
        max_iterations: Option<u64>,
        /// Path to the Paperpile CSV manifest (paperpile-sync only)
        #[arg(long, default_value = "metadata/papers_manifest_normalized.csv")]
        manifest: PathBuf,
        /// Seconds to sleep when the queue is empty (daemon mode)
        #[arg(long, default_value_t = 1.0, value_name = "SECS")]
        poll_interval: f64,
    },
    /// Bulk-project catalog + artifacts into the search index
    SyncEs {
        /// Delete all versioned indices first and start from v1
        #[arg(long)]
        rebuild: bool,
    },
    /// Report alias, current physical index, and versions
    EsStatus,
    /// Migrate to the next index version with zero read downtime
    EsMigrate,
    /// Swing the alias back to the previous index version
    EsRollback,
    /// Delete old index versions
    EsCleanup {
        /// Number of latest versions to retain
        #[arg(long, default_value_t = 2, value_name = "N")]
        keep: u32,
    },
    /// Free-text search over indexed papers
    Search {
        #[arg(short, long)]
        query: String,
        #[arg(long, default_value_t = 10)]
        size: usize,
        #[arg(long)]
        year_from: Option<i32>,
        #[arg(long)]
        year_to: Option<i32>,
        /// Filter by Paperpile tag
        #[arg(long)]
        tag: Option<String>,
        /// Filter by Paperpile folder
        #[arg(long)]
        folder: Option<String>,
        /// Only print the count of matching documents
        #[arg(long)]
        count: bool,
    },
    /// Search with context snippets around matches
    Grep {
        #[arg(short, long)]
        query: String,
        /// Number of documents
        #[arg(long, default_value_t = 10)]
        size: usize,
        /// Snippets per document
        #[arg(long, default_value_t = 3)]
        fragments: usize,
        /// Characters per snippet
        #[arg(long, default_value_t = 150)]
        fragment_size: usize,
        /// Sort order: relevance, year-asc, year-desc
        #[arg(long, default_value = "relevance")]
        sort: String,
        /// Term to highlight (defaults to the query)
        #[arg(long)]
        highlight: Option<String>,
        #[arg(long)]
        year_from: Option<i32>,
        #[arg(long)]
        year_to: Option<i32>,
        #[arg(long)]
        tag: Option<String>,
        #[arg(long)]
        folder: Option<String>,
    },
    /// Top venues by document count
    Venues {
        #[arg(short, long)]
        query: Option<String>,
        #[arg(long, default_value_t = 20)]
        size: usize,
        #[arg(long)]
        year_from: Option<i32>,
        #[arg(long)]
        year_to: Option<i32>,
        #[arg(long)]
        tag: Option<String>,
        #[arg(long)]
        folder: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum RobotKind {
    PdfExtractor,
    PaperpileSync,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?
        .block_on(run(cli))
}

fn init_tracing(level: Option<&str>) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = match level {
        Some(level) => EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info")),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let settings = Settings::load();
    settings.validate().context("invalid configuration")?;

    match cli.command {
        Command::InitDb => {
            let store = connect_store(&settings).await?;
            store.init_schema().await?;
            println!("Database schema ready.");
        }
        Command::InitEs => {
            let index = index_manager(&settings)?.initialize().await?;
            println!("Search index ready: {index}");
        }
        Command::Stage { limit, pattern } => stage(&settings, limit, &pattern)?,
        Command::Register { no_queue } => register(&settings, no_queue).await?,
        Command::QueueMetadata => queue_metadata(&settings).await?,
        Command::RunRobot {
            robot,
            max_iterations,
            manifest,
            poll_interval,
        } => run_robot(&settings, robot, max_iterations, &manifest, poll_interval).await?,
        Command::SyncEs { rebuild } => sync_es(&settings, rebuild).await?,
        Command::EsStatus => {
            let status = index_manager(&settings)?.status().await?;
            if !status.exists {
                println!("alias={} (no index)", status.alias);
                return Ok(());
            }
            println!("alias={}", status.alias);
            println!("current={}", status.current_index.unwrap_or_default());
            println!("version=v{}", status.version.unwrap_or(0));
            println!("documents={}", status.document_count.unwrap_or(0));
            println!("versions={}", status.all_versions.join(", "));
        }
        Command::EsMigrate => {
            let index = index_manager(&settings)?.migrate().await?;
            println!("Migrated; alias now points at {index}");
        }
        Command::EsRollback => {
            let index = index_manager(&settings)?.rollback().await?;
            println!("Rolled back; alias now points at {index}");
        }
        Command::EsCleanup { keep } => {
            let deleted = index_manager(&settings)?.delete_old_versions(keep).await?;
            if deleted.is_empty() {
                println!("Nothing to delete.");
            } else {
                println!("Deleted: {}", deleted.join(", "));
            }
        }
        Command::Search {
            query,
            size,
            year_from,
            year_to,
            tag,
            folder,
            count,
        } => {
            let manager = index_manager(&settings)?;
            let filters = SearchFilters {
                year_from,
                year_to,
                tag,
                folder,
            };
            if count {
                println!("{}", manager.count(&query, &filters).await?);
            } else {
                let hits = manager.search(&query, &filters, size).await?;
                print_hits(&hits);
            }
        }
        Command::Grep {
            query,
            size,
            fragments,
            fragment_size,
            sort,
            highlight,
            year_from,
            year_to,
            tag,
            folder,
        } => {
            let manager = index_manager(&settings)?;
            let filters = SearchFilters {
                year_from,
                year_to,
                tag,
                folder,
            };
            let sort: SortOrder = sort.parse().map_err(|e: String| anyhow::anyhow!(e))?;
            let options = SearchOptions {
                size,
                fragments,
                fragment_size,
                sort,
                highlight,
            };
            let hits = manager.search_with_context(&query, &filters, &options).await?;
            print_hits_with_context(&hits);
        }
        Command::Venues {
            query,
            size,
            year_from,
            year_to,
            tag,
            folder,
        } => {
            let manager = index_manager(&settings)?;
            let filters = SearchFilters {
                year_from,
                year_to,
                tag,
                folder,
            };
            let buckets = manager
                .aggregate_venues(query.as_deref(), &filters, size)
                .await?;
            for bucket in buckets {
                println!("{:5}  {}", bucket.count, bucket.venue);
            }
        }
    }
    Ok(())
}

async fn connect_store(settings: &Settings) -> Result<Store> {
    Store::connect(&settings.pg_dsn)
        .await
        .with_context(|| format!("failed to connect to postgres at {}", settings.pg_dsn))
}

fn index_manager(settings: &Settings) -> Result<IndexManager> {
    let client = EsClient::new(&settings.es_url)?;
    Ok(IndexManager::new(client, settings.es_index.clone()))
}

/// Copy new PDFs from the source directory to the processing
/// directory, skipping file names already present.
fn stage(settings: &Settings, limit: Option<usize>, pattern: &str) -> Result<()> {
    let source = &settings.pdf_source;
    let dest = &settings.pdf_processing;

    if !source.exists() {
        anyhow::bail!("source directory does not exist: {}", source.display());
    }
    std::fs::create_dir_all(dest)
        .with_context(|| format!("failed to create {}", dest.display()))?;

    let existing: HashSet<String> = std::fs::read_dir(dest)?
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .collect();

    let matches: Vec<PathBuf> = glob::glob(&source.join(pattern).to_string_lossy())
        .context("invalid glob pattern")?
        .filter_map(|p| p.ok())
        .filter(|p| p.is_file())
        .collect();

    let mut to_copy: Vec<&PathBuf> = matches
        .iter()
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .map(|n| !existing.contains(n))
                .unwrap_or(false)
        })
        .collect();
    let skipped = matches.len() - to_copy.len();
    if let Some(limit) = limit {
        to_copy.truncate(limit);
    }

    let mut copied = 0usize;
    for pdf in to_copy {
        let name = pdf.file_name().expect("filtered above");
        std::fs::copy(pdf, dest.join(name))
            .with_context(|| format!("failed to copy {}", pdf.display()))?;
        copied += 1;
        if copied % 50 == 0 {
            println!("  Copied {copied} PDFs...");
        }
    }

    println!("Staged {copied} PDFs to {}", dest.display());
    println!("  (skipped {skipped} already present)");
    Ok(())
}

/// Register every PDF under the processing directory, then (unless
/// told otherwise) enqueue FULL_TEXT work for each catalog document.
async fn register(settings: &Settings, no_queue: bool) -> Result<()> {
    let root = &settings.pdf_processing;
    if !root.exists() {
        anyhow::bail!("processing directory does not exist: {}", root.display());
    }

    let pdfs: Vec<PathBuf> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| ext == "pdf")
                .unwrap_or(false)
        })
        .map(|entry| entry.into_path())
        .collect();

    let store = connect_store(settings).await?;
    store.init_schema().await?;
    let new_count = store.register_documents(&pdfs).await?;
    println!("Registered {new_count} new documents ({} found).", pdfs.len());

    if no_queue {
        return Ok(());
    }
    let queued = enqueue_all(&store, EnhancementType::FullText).await?;
    println!("Queued {queued} FULL_TEXT enhancements.");
    Ok(())
}

async fn queue_metadata(settings: &Settings) -> Result<()> {
    let store = connect_store(settings).await?;
    store.init_schema().await?;
    let queued = enqueue_all(&store, EnhancementType::PaperpileMetadata).await?;
    println!("Queued {queued} PAPERPILE_METADATA enhancements.");
    Ok(())
}

async fn enqueue_all(store: &Store, ty: EnhancementType) -> Result<u64> {
    let mut queued = 0;
    for document in store.all_documents(None).await? {
        store.enqueue(document.id, ty).await?;
        queued += 1;
    }
    Ok(queued)
}

async fn run_robot(
    settings: &Settings,
    robot: RobotKind,
    max_iterations: Option<u64>,
    manifest: &PathBuf,
    poll_interval: f64,
) -> Result<()> {
    let store = connect_store(settings).await?;
    store.init_schema().await?;

    let robot: Box<dyn pdf2search_robots::Robot> = match robot {
        RobotKind::PdfExtractor => Box::new(PdfExtractorRobot::new(Arc::new(
            PdftotextExtractor::new(),
        ))),
        RobotKind::PaperpileSync => {
            if !manifest.exists() {
                anyhow::bail!("manifest not found: {}", manifest.display());
            }
            Box::new(PaperpileSyncRobot::from_manifest_file(manifest)?)
        }
    };

    let mut runner = RobotRunner::new(store, robot)
        .with_poll_interval(Duration::from_secs_f64(poll_interval));
    let summary = runner.run(max_iterations).await?;
    println!(
        "Done: {} completed, {} discarded, {} failed.",
        summary.completed, summary.discarded, summary.failed
    );
    Ok(())
}

async fn sync_es(settings: &Settings, rebuild: bool) -> Result<()> {
    let mut store = connect_store(settings).await?;
    let manager = index_manager(settings)?;

    if rebuild {
        let deleted = manager.delete_all_versions().await?;
        if !deleted.is_empty() {
            println!("Deleted {} old indices for rebuild.", deleted.len());
        }
    }

    let items = store.documents_with_enhancements(None, None).await?;
    println!("Fetched {} documents with artifacts.", items.len());
    let indexed = manager.sync_documents(&items).await?;
    println!("Indexed {indexed} documents.");
    Ok(())
}

fn print_hits(hits: &[SearchHit]) {
    for hit in hits {
        let source = &hit.source;
        println!(
            "{:6.2}  {}  {}",
            hit.score.unwrap_or(0.0),
            display_field(source, "year"),
            display_field(source, "title"),
        );
        println!(
            "        venue={} tags={}",
            display_field(source, "venue"),
            source["tags"]
                .as_array()
                .map(|tags| tags
                    .iter()
                    .filter_map(|t| t.as_str())
                    .collect::<Vec<_>>()
                    .join(";"))
                .unwrap_or_default(),
        );
        println!("        {}", display_field(source, "file_path"));
        println!();
    }
}

fn print_hits_with_context(hits: &[SearchHit]) {
    for hit in hits {
        let source = &hit.source;
        println!("{}", "=".repeat(80));
        println!(
            "{:6.2}  {}  {}",
            hit.score.unwrap_or(0.0),
            display_field(source, "year"),
            display_field(source, "title"),
        );
        println!("        {}", display_field(source, "file_path"));
        println!();
        for snippet in &hit.highlights {
            println!("    ...{snippet}...");
            println!();
        }
    }
}

fn display_field(source: &serde_json::Value, key: &str) -> String {
    match &source[key] {
        serde_json::Value::Null => "-".to_string(),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
