//! Topic clustering binary entry point.
//!
//! Loads a CSV of papers, clusters the abstracts into topics and prints one
//! section per cluster with its label, ranked papers and a plain-language
//! summary.
//!
//! # Examples
//!
//! ```bash
//! cluster --input papers.csv
//! cluster --input papers.csv --min-cluster-size 5 --format json > clusters.json
//! PAPERS_CSV=papers.csv EMBEDDING_MODEL=bge-small-en-v1.5 cluster
//! ```

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use comfy_table::{presets::UTF8_FULL, Attribute, Cell, Color, ContentArrangement, Table};
use indicatif::{ProgressBar, ProgressStyle};
use paper_clusters::{
    config::PipelineConfig,
    embedding::{fastembed::FastEmbedProvider, EmbeddingProvider},
    models::{ClusterReport, PipelineReport},
    pipeline::TopicPipeline,
    provider::{csv::CsvPaperProvider, PaperProvider},
    reduction::RandomProjectionReducer,
};
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Output format for the cluster report
#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    /// Human-friendly tables, one per cluster
    Table,
    /// Machine-readable JSON report
    Json,
}

/// Cluster research papers into labelled, summarised topics
#[derive(Parser, Debug)]
#[command(
    name = "cluster",
    version,
    about = "Cluster research papers into labelled topics with plain-language summaries",
    long_about = "Embed paper abstracts, search for the best density clustering, attach every \
                  outlier to its nearest topic, and print a label, ranked paper list and short \
                  non-technical summary per topic.

EXAMPLES:
  Default run:
    cluster --input papers.csv

  Larger topics, JSON output:
    cluster --input papers.csv --min-cluster-size 6 --format json

  Settings from a file, verbose logging:
    cluster --input papers.csv --config cluster.json --log-level debug"
)]
struct Args {
    /// CSV file with `title`, `abstract` and optional `citation_number` columns
    #[arg(short, long, value_name = "FILE", env = "PAPERS_CSV", default_value = "papers.csv")]
    input: PathBuf,

    /// FastEmbed model name
    #[arg(long, value_name = "MODEL", env = "EMBEDDING_MODEL", default_value = paper_clusters::DEFAULT_EMBEDDING_MODEL)]
    embedding_model: String,

    /// JSON configuration file; flags below override its values
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Default minimum cluster size (the search also tries nearby values)
    #[arg(long, value_name = "N", env = "MIN_CLUSTER_SIZE")]
    min_cluster_size: Option<usize>,

    /// Neighbourhood size carried to the reducer
    #[arg(long, value_name = "N", env = "UMAP_N_NEIGHBORS")]
    n_neighbors: Option<usize>,

    /// Reduced dimensionality
    #[arg(long, value_name = "N", env = "UMAP_N_COMPONENTS")]
    n_components: Option<usize>,

    /// Minimum distance carried to the reducer
    #[arg(long, value_name = "F", env = "UMAP_MIN_DIST")]
    min_dist: Option<f32>,

    /// Only cluster the first N papers
    #[arg(long, value_name = "N")]
    limit: Option<usize>,

    /// Evaluate the min-cluster-size grid in parallel
    #[arg(long)]
    parallel: bool,

    /// Output format
    #[arg(long, value_enum, default_value = "table")]
    format: OutputFormat,

    /// Logging verbosity level
    #[arg(long, value_name = "LEVEL", default_value = "info")]
    log_level: String,

    /// FastEmbed model cache directory
    #[arg(long, value_name = "DIR")]
    cache_dir: Option<PathBuf>,
}

/// Initialize logging subsystem with the specified level
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

/// Build the run configuration: defaults, then the config file, then flags
fn load_config(args: &Args) -> Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => PipelineConfig::default(),
    };

    if let Some(n) = args.min_cluster_size {
        config.selector.min_cluster_size = n;
    }
    if let Some(n) = args.n_neighbors {
        config.reduction.n_neighbors = n;
    }
    if let Some(n) = args.n_components {
        config.reduction.target_dim = n;
    }
    if let Some(d) = args.min_dist {
        config.reduction.min_dist = d;
    }
    if args.parallel {
        config.selector.parallel = true;
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Create the FastEmbed provider, defaulting the cache to the user cache dir
fn create_embedding_provider(args: &Args) -> Result<FastEmbedProvider> {
    let cache_dir = args.cache_dir.clone().unwrap_or_else(|| {
        dirs::cache_dir()
            .map(|p| p.join("fastembed"))
            .unwrap_or_else(|| PathBuf::from(".cache/fastembed"))
    });
    debug!("Using cache directory: {}", cache_dir.display());

    let provider = FastEmbedProvider::from_model_name(&args.embedding_model, Some(cache_dir))
        .context("Failed to initialize FastEmbed provider")?;
    info!(
        "FastEmbed provider initialized: model={}, dimension={}",
        provider.model_name(),
        provider.dimension()
    );
    Ok(provider)
}

fn create_spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} [{elapsed_precise}] {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner
}

fn format_citations(count: Option<f64>) -> String {
    match count {
        Some(c) if c.fract() == 0.0 => format!("{}", c as i64),
        Some(c) => format!("{:.1}", c),
        None => "N/A".to_string(),
    }
}

/// Format one cluster as a header line, a paper table and its summary
fn format_cluster(cluster: &ClusterReport) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("#").add_attribute(Attribute::Bold),
        Cell::new("Title").add_attribute(Attribute::Bold),
        Cell::new("Citations").add_attribute(Attribute::Bold),
    ]);

    for (rank, paper) in cluster.papers.iter().enumerate() {
        let title_display = if paper.title.chars().count() > 80 {
            format!("{}...", paper.title.chars().take(77).collect::<String>())
        } else {
            paper.title.clone()
        };
        let citations = Cell::new(format_citations(paper.citation_count));
        let citations = if paper.citation_count.is_none() {
            citations.fg(Color::DarkGrey)
        } else {
            citations
        };

        table.add_row(vec![Cell::new(rank + 1), Cell::new(title_display), citations]);
    }

    let average = cluster
        .average_citations
        .map(|a| format!("{:.1}", a))
        .unwrap_or_else(|| "N/A".to_string());
    let summary = if cluster.summary.is_empty() {
        "(no concise summary available)"
    } else {
        cluster.summary.as_str()
    };

    format!(
        "Cluster {}: {}\nPapers: {} | Average citations: {}\n{}\nSummary (non-technical): {}\n",
        cluster.cluster_id, cluster.label, cluster.size, average, table, summary
    )
}

fn format_report_table(report: &PipelineReport) -> String {
    if report.clusters.is_empty() {
        return "No clusters found.".to_string();
    }

    let mut out = String::new();
    for cluster in &report.clusters {
        out.push_str(&format_cluster(cluster));
        out.push('\n');
    }

    let quality = report
        .quality
        .map(|q| format!("{:.4}", q))
        .unwrap_or_else(|| "n/a (fallback)".to_string());
    out.push_str(&format!(
        "{} clusters | min_cluster_size {} | silhouette {} | reassigned outliers {}\n",
        report.clusters.len(),
        report.min_cluster_size,
        quality,
        report.reassigned
    ));
    out.push_str(&format!(
        "Clustered {} of {} papers\n",
        report.clustered_documents(),
        report.total_documents
    ));
    out
}

fn format_report_json(report: &PipelineReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("Failed to serialize report to JSON")
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);
    debug!("CLI arguments: {:?}", args);

    let start_time = Instant::now();

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }
    let config = load_config(&args)?;

    info!("Loading papers from {}", args.input.display());
    let provider = CsvPaperProvider::from_file(&args.input)
        .await
        .with_context(|| format!("Failed to load papers from {}", args.input.display()))?;
    let documents = match args.limit {
        Some(limit) => provider.fetch_documents_limit(limit).await?,
        None => provider.fetch_documents().await?,
    };
    if documents.is_empty() {
        anyhow::bail!("No papers found in {}", args.input.display());
    }
    let available = provider.count_documents().await?;
    info!(
        "Loaded {} of {} papers from {}",
        documents.len(),
        available,
        provider.name()
    );

    let spinner = create_spinner("Loading embedding model...");
    let pipeline = match create_embedding_provider(&args).and_then(|embedder| {
        TopicPipeline::new(embedder, RandomProjectionReducer::new(), config)
            .context("Failed to create clustering pipeline")
    }) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            spinner.finish_and_clear();
            return Err(e);
        }
    };

    spinner.set_message(format!("Clustering {} papers...", documents.len()));
    let report = pipeline.run(&documents).await;
    spinner.finish_and_clear();
    let report = report.context("Clustering failed")?;

    match args.format {
        OutputFormat::Table => println!("{}", format_report_table(&report)),
        OutputFormat::Json => println!("{}", format_report_json(&report)?),
    }

    if report.unresolved > 0 {
        warn!(
            "{} papers could not be assigned to any cluster",
            report.unresolved
        );
    }
    if !report.covers_all_documents() {
        warn!(
            "Cluster sizes sum to {} but {} papers were loaded",
            report.clustered_documents(),
            report.total_documents
        );
    }

    info!("Clustering completed in {:.2?}", start_time.elapsed());
    Ok(())
}
