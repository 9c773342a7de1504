//! Paper Clusters - topic discovery for research-paper abstracts.
//!
//! This library groups a corpus of paper abstracts into topics, gives each
//! topic a short human-readable label and writes a plain-language summary
//! for it.
//!
//! # Architecture
//!
//! The system is organized into several key modules:
//!
//! - **models**: Core data structures (Document, ClusterAssignment, ClusterModel, reports)
//! - **embedding**: Text normalization and embedding generation
//! - **reduction**: Dimensionality reduction of the embedding matrix
//! - **orchestrator**: Batched embedding followed by a single reduction call
//! - **clustering**: Density clustering, silhouette scoring and class TF-IDF keywords
//! - **selector**: Grid search over `min_cluster_size` with a fallback partition
//! - **reassign**: Nearest-centroid reassignment of outliers
//! - **terms** / **labels**: Keyword deduplication and cluster labels
//! - **summary**: Extractive relevance/centrality/diversity summaries
//! - **provider**: Dataset loading (CSV)
//! - **config** / **pipeline**: Run configuration and the end-to-end pipeline
//!
//! # Workflow
//!
//! 1. Load papers and build the normalized "title. abstract" text of each
//! 2. Embed every text and reduce the matrix once
//! 3. Cluster for each `min_cluster_size` in the grid and keep the best
//!    silhouette, or fall back to the default size
//! 4. Attach every outlier to its nearest cluster centroid
//! 5. Label each cluster from its keywords and summarize its abstracts
//!
//! # Example
//!
//! ```ignore
//! use paper_clusters::{
//!     config::PipelineConfig,
//!     embedding::fastembed::FastEmbedProvider,
//!     pipeline::TopicPipeline,
//!     provider::csv::CsvPaperProvider,
//!     reduction::RandomProjectionReducer,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let provider = CsvPaperProvider::from_file("papers.csv").await?;
//!     let pipeline = TopicPipeline::new(
//!         FastEmbedProvider::new(None, None)?,
//!         RandomProjectionReducer::new(),
//!         PipelineConfig::default(),
//!     )?;
//!
//!     let report = pipeline.run_from_provider(&provider).await?;
//!     for cluster in report.clusters {
//!         println!("{} ({} papers): {}", cluster.label, cluster.size, cluster.summary);
//!     }
//!
//!     Ok(())
//! }
//! ```

// Public modules
pub mod clustering;
pub mod config;
pub mod embedding;
pub mod labels;
pub mod models;
pub mod orchestrator;
pub mod pipeline;
pub mod provider;
pub mod reassign;
pub mod reduction;
pub mod selector;
pub mod summary;
pub mod terms;

// Re-export commonly used types at the crate root
pub use clustering::{Clusterer, KeywordExtractor, QualityScorer};
pub use config::PipelineConfig;
pub use embedding::EmbeddingProvider;
pub use models::{ClusterAssignment, ClusterId, ClusterLabel, ClusterModel, ClusterReport, Document, PipelineReport};
pub use pipeline::{PipelineError, TopicPipeline};
pub use provider::PaperProvider;
pub use reduction::Reducer;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default embedding model name
pub const DEFAULT_EMBEDDING_MODEL: &str = "all-MiniLM-L6-v2";
