//! End-to-end topic clustering pipeline.
//!
//! This module wires the stages together:
//!
//! 1. Embed and reduce every document ([`EmbeddingOrchestrator`])
//! 2. Grid-search a partition and extract keywords ([`ModelSelector`])
//! 3. Move outliers to their nearest cluster ([`reassign_outliers`])
//! 4. Label every cluster ([`build_labels`])
//! 5. Build one report per cluster with ranked papers, citation statistics
//!    and a plain-language summary
//!
//! ```ignore
//! use paper_clusters::pipeline::TopicPipeline;
//! use paper_clusters::provider::csv::CsvPaperProvider;
//!
//! let provider = CsvPaperProvider::from_file("papers.csv").await?;
//! let pipeline = TopicPipeline::new(
//!     FastEmbedProvider::new(None, None)?,
//!     RandomProjectionReducer::new(),
//!     PipelineConfig::default(),
//! )?;
//! let report = pipeline.run_from_provider(&provider).await?;
//! for cluster in &report.clusters {
//!     println!("{}: {}", cluster.cluster_id, cluster.label);
//! }
//! ```

use std::cmp::Ordering;
use std::collections::BTreeMap;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::clustering::{ClassTfidfExtractor, Clusterer, DensityClusterer, KeywordExtractor, QualityScorer, SilhouetteScorer};
use crate::config::{ConfigError, PipelineConfig};
use crate::embedding::EmbeddingProvider;
use crate::labels::build_labels;
use crate::models::{
    ClusterId, ClusterLabel, ClusterModel, ClusterReport, Document, LabelSource, ModelOrigin, PaperEntry,
    PipelineReport,
};
use crate::orchestrator::{EmbeddingOrchestrator, OrchestratorError};
use crate::provider::{PaperProvider, ProviderError};
use crate::reassign::reassign_outliers;
use crate::reduction::Reducer;
use crate::selector::{ModelSelector, SelectionError};
use crate::summary::Summarizer;

/// Errors that abort a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The input corpus is empty
    #[error("No documents to cluster")]
    EmptyInput,

    /// Configuration is invalid
    #[error("Configuration error: {0}")]
    ConfigError(#[from] ConfigError),

    /// Loading documents failed
    #[error("Provider error: {0}")]
    ProviderError(#[from] ProviderError),

    /// Embedding or reduction failed
    #[error("Embedding stage failed: {0}")]
    OrchestratorError(#[from] OrchestratorError),

    /// Model selection failed
    #[error("Model selection failed: {0}")]
    SelectionError(#[from] SelectionError),
}

/// Result type for pipeline runs.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Clustering pipeline over an embedding provider `E` and a reducer `R`.
///
/// Clusterer, quality scorer and keyword extractor are trait objects so
/// callers can swap backends without changing the pipeline type.
pub struct TopicPipeline<E, R>
where
    E: EmbeddingProvider,
    R: Reducer,
{
    orchestrator: EmbeddingOrchestrator<E, R>,
    clusterer: Box<dyn Clusterer>,
    scorer: Box<dyn QualityScorer>,
    extractor: Box<dyn KeywordExtractor>,
    summarizer: Summarizer,
    config: PipelineConfig,
}

impl<E, R> TopicPipeline<E, R>
where
    E: EmbeddingProvider,
    R: Reducer,
{
    /// Create a pipeline with the default density clusterer, silhouette
    /// scorer and class TF-IDF keyword extractor.
    ///
    /// # Errors
    /// Returns `PipelineError::ConfigError` if `config` fails validation.
    pub fn new(embedder: E, reducer: R, config: PipelineConfig) -> PipelineResult<Self> {
        config.validate()?;

        let orchestrator =
            EmbeddingOrchestrator::new(embedder, reducer, config.orchestrator.clone(), config.reduction.clone());

        Ok(Self {
            orchestrator,
            clusterer: Box::new(DensityClusterer::default()),
            scorer: Box::new(SilhouetteScorer::new()),
            extractor: Box::new(ClassTfidfExtractor::with_top_n(config.keywords_per_cluster)),
            summarizer: Summarizer::new(config.summary.clone()),
            config,
        })
    }

    /// Replace the clusterer.
    pub fn with_clusterer(mut self, clusterer: impl Clusterer + 'static) -> Self {
        self.clusterer = Box::new(clusterer);
        self
    }

    /// Replace the quality scorer.
    pub fn with_scorer(mut self, scorer: impl QualityScorer + 'static) -> Self {
        self.scorer = Box::new(scorer);
        self
    }

    /// Replace the keyword extractor.
    pub fn with_extractor(mut self, extractor: impl KeywordExtractor + 'static) -> Self {
        self.extractor = Box::new(extractor);
        self
    }

    /// Active configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Cluster `documents` and build the report.
    ///
    /// # Errors
    /// Fails on empty input, on any embedder or reducer failure, and when
    /// model selection cannot produce even the fallback partition.
    pub async fn run(&self, documents: &[Document]) -> PipelineResult<PipelineReport> {
        if documents.is_empty() {
            return Err(PipelineError::EmptyInput);
        }
        info!(
            documents = documents.len(),
            embedder = self.orchestrator.embedder().model_name(),
            clusterer = self.clusterer.name(),
            "Starting clustering run"
        );

        let corpus = self.orchestrator.run(documents).await?;
        let texts: Vec<String> = documents.iter().map(|d| d.normalized.clone()).collect();

        let selector = ModelSelector::new(
            self.clusterer.as_ref(),
            self.scorer.as_ref(),
            self.extractor.as_ref(),
            self.config.selector.clone(),
        );
        let mut model = selector.select(&texts, &corpus.reduced)?;
        let used_fallback = model.origin == ModelOrigin::Fallback;

        let outcome = reassign_outliers(&mut model, &texts, &corpus.reduced, self.extractor.as_ref());
        if outcome.unresolved > 0 {
            warn!(unresolved = outcome.unresolved, "Some documents remain unclustered");
        }

        let labels = build_labels(&model, self.config.label_terms);
        let clusters = cluster_reports(documents, &model, &labels, &self.summarizer);

        let report = PipelineReport {
            total_documents: documents.len(),
            min_cluster_size: model.min_cluster_size,
            quality: model.quality,
            used_fallback,
            reassigned: outcome.reassigned,
            unresolved: outcome.unresolved,
            clusters,
        };
        info!(
            clusters = report.clusters.len(),
            clustered = report.clustered_documents(),
            used_fallback,
            "Clustering run complete"
        );
        Ok(report)
    }

    /// Fetch every document from `provider` and run the pipeline on them.
    pub async fn run_from_provider<P>(&self, provider: &P) -> PipelineResult<PipelineReport>
    where
        P: PaperProvider + ?Sized,
    {
        info!(provider = provider.name(), "Loading documents");
        let documents = provider.fetch_documents().await?;
        self.run(&documents).await
    }
}

/// Citations descending, unknown counts after every known one.
fn by_citations_desc(a: &Document, b: &Document) -> Ordering {
    match (a.citation_count, b.citation_count) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn average_citations(papers: &[&Document]) -> Option<f64> {
    let known: Vec<f64> = papers.iter().filter_map(|d| d.citation_count).collect();
    if known.is_empty() {
        None
    } else {
        Some(known.iter().sum::<f64>() / known.len() as f64)
    }
}

/// Per-cluster reports, ascending by cluster id.
///
/// Member papers keep dataset order among equal citation counts. The
/// summary reads abstracts in that same order and is steered by the label
/// terms unless the label is a placeholder.
pub fn cluster_reports(
    documents: &[Document],
    model: &ClusterModel,
    labels: &BTreeMap<ClusterId, ClusterLabel>,
    summarizer: &Summarizer,
) -> Vec<ClusterReport> {
    model
        .assignment
        .members_by_cluster()
        .into_iter()
        .map(|(cluster_id, members)| {
            let mut papers: Vec<&Document> = members.iter().filter_map(|&i| documents.get(i)).collect();
            papers.sort_by(|a, b| by_citations_desc(a, b));

            let label = labels.get(&cluster_id).cloned().unwrap_or_else(|| ClusterLabel {
                cluster_id,
                terms: vec![format!("topic-{}", cluster_id)],
                source: LabelSource::Placeholder,
            });
            let terms: &[String] = match label.source {
                LabelSource::Placeholder => &[],
                LabelSource::Filtered | LabelSource::RawKeywords => &label.terms,
            };

            let abstracts: Vec<&str> = papers.iter().map(|d| d.abstract_text.as_str()).collect();
            let summary = summarizer.summarize(&abstracts, terms);
            debug!(cluster = cluster_id.0, size = papers.len(), label = %label, "Built cluster report");

            ClusterReport {
                cluster_id,
                size: papers.len(),
                average_citations: average_citations(&papers),
                papers: papers
                    .iter()
                    .map(|d| PaperEntry {
                        index: d.index,
                        title: d.title.clone(),
                        citation_count: d.citation_count,
                    })
                    .collect(),
                summary,
                label,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clustering::ClusteringResult;
    use crate::embedding::{EmbeddingError, EmbeddingResult};
    use crate::models::{ClusterAssignment, Keyword};
    use crate::reduction::{ReductionParams, ReductionResult};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    // ===== Mock Implementations =====

    /// Two-axis embedder: molecule vocabulary vs speech vocabulary.
    #[derive(Clone, Default)]
    struct MockEmbedder {
        fail: bool,
        calls: Arc<Mutex<usize>>,
    }

    fn axis_counts(text: &str) -> Vec<f32> {
        let graph = ["molecule", "molecules", "graph", "graphs", "chemistry"];
        let speech = ["speech", "acoustic", "audio", "speaker"];
        let mut v = vec![0.0f32, 0.0];
        for token in text.split_whitespace() {
            let token = token.trim_matches(|c: char| !c.is_alphanumeric());
            if graph.contains(&token) {
                v[0] += 1.0;
            }
            if speech.contains(&token) {
                v[1] += 1.0;
            }
        }
        v
    }

    #[async_trait]
    impl EmbeddingProvider for MockEmbedder {
        async fn embed(&self, text: &str) -> EmbeddingResult<Vec<f32>> {
            Ok(axis_counts(text))
        }

        async fn embed_batch(&self, texts: &[&str]) -> EmbeddingResult<Vec<Vec<f32>>> {
            *self.calls.lock().unwrap() += 1;
            if self.fail {
                return Err(EmbeddingError::GenerationError("model offline".to_string()));
            }
            Ok(texts.iter().map(|t| axis_counts(t)).collect())
        }

        fn dimension(&self) -> usize {
            2
        }

        fn model_name(&self) -> &str {
            "mock-axes"
        }
    }

    struct IdentityReducer;

    impl Reducer for IdentityReducer {
        fn reduce(&self, matrix: &[Vec<f32>], _params: &ReductionParams) -> ReductionResult<Vec<Vec<f32>>> {
            Ok(matrix.to_vec())
        }

        fn name(&self) -> &str {
            "identity"
        }
    }

    /// Splits on which axis dominates; the first `outliers` rows stay unclustered.
    struct AxisClusterer {
        outliers: usize,
    }

    impl Clusterer for AxisClusterer {
        fn cluster(&self, matrix: &[Vec<f32>], _min_cluster_size: usize) -> ClusteringResult<Vec<Option<ClusterId>>> {
            Ok(matrix
                .iter()
                .enumerate()
                .map(|(i, v)| {
                    if i < self.outliers {
                        None
                    } else if v[0] >= v[1] {
                        Some(ClusterId(0))
                    } else {
                        Some(ClusterId(1))
                    }
                })
                .collect())
        }

        fn name(&self) -> &str {
            "axis"
        }
    }

    fn corpus() -> Vec<Document> {
        vec![
            Document::new(0, "Graph nets", "Graph models for molecule chemistry.", Some(5.0)),
            Document::new(1, "Molecule graphs", "We embed molecules as graphs.", None),
            Document::new(2, "Chemistry at scale", "Molecule graph chemistry benchmarks.", Some(40.0)),
            Document::new(3, "Speech models", "Acoustic speech recognition for audio.", Some(2.0)),
            Document::new(4, "Speaker audio", "Speaker identification from audio.", Some(2.0)),
            Document::new(5, "Robust speech", "Acoustic speech under noise.", Some(9.0)),
        ]
    }

    fn pipeline(embedder: MockEmbedder, outliers: usize) -> TopicPipeline<MockEmbedder, IdentityReducer> {
        let mut config = PipelineConfig::default();
        config.selector.min_cluster_size = 2;
        TopicPipeline::new(embedder, IdentityReducer, config)
            .unwrap()
            .with_clusterer(AxisClusterer { outliers })
    }

    // ===== Tests =====

    #[tokio::test]
    async fn test_run_clusters_every_document() {
        let report = pipeline(MockEmbedder::default(), 0).run(&corpus()).await.unwrap();

        assert_eq!(report.total_documents, 6);
        assert_eq!(report.clusters.len(), 2);
        assert!(report.covers_all_documents(), "Every document should land in one cluster");
        assert!(!report.used_fallback, "Clean two-way split should be eligible");
        assert!(report.quality.is_some());
        assert_eq!(report.reassigned, 0);
        assert_eq!(report.unresolved, 0);

        let sizes: Vec<usize> = report.clusters.iter().map(|c| c.size).collect();
        assert_eq!(sizes, vec![3, 3]);
        for cluster in &report.clusters {
            assert!(!cluster.label.terms.is_empty(), "Labels are never empty");
        }
    }

    #[tokio::test]
    async fn test_papers_ranked_by_citations_unknown_last() {
        let report = pipeline(MockEmbedder::default(), 0).run(&corpus()).await.unwrap();

        let graph = &report.clusters[0];
        let order: Vec<usize> = graph.papers.iter().map(|p| p.index).collect();
        assert_eq!(order, vec![2, 0, 1], "Highest citations first, unknown last");
        assert_eq!(graph.average_citations, Some(22.5), "Average over known counts only");

        let speech = &report.clusters[1];
        let order: Vec<usize> = speech.papers.iter().map(|p| p.index).collect();
        assert_eq!(order, vec![5, 3, 4], "Ties keep dataset order");
    }

    #[tokio::test]
    async fn test_outliers_are_reassigned() {
        // Document 0 starts unclustered, which also makes every grid value ineligible
        let report = pipeline(MockEmbedder::default(), 1).run(&corpus()).await.unwrap();

        assert!(report.used_fallback, "Outliers make every candidate ineligible");
        assert_eq!(report.quality, None);
        assert_eq!(report.reassigned, 1);
        assert_eq!(report.unresolved, 0);
        assert!(report.covers_all_documents());
        assert!(report.clusters[0].papers.iter().any(|p| p.index == 0), "Outlier joins the graph cluster");
    }

    #[tokio::test]
    async fn test_empty_input() {
        let result = pipeline(MockEmbedder::default(), 0).run(&[]).await;
        assert!(matches!(result, Err(PipelineError::EmptyInput)));
    }

    #[tokio::test]
    async fn test_embedder_failure_is_fatal() {
        let embedder = MockEmbedder {
            fail: true,
            ..Default::default()
        };
        let result = pipeline(embedder.clone(), 0).run(&corpus()).await;

        assert!(matches!(result, Err(PipelineError::OrchestratorError(_))));
        assert_eq!(*embedder.calls.lock().unwrap(), 1, "No retries after a failed call");
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = PipelineConfig::default();
        config.selector.min_cluster_size = 1;
        let result = TopicPipeline::new(MockEmbedder::default(), IdentityReducer, config);
        assert!(matches!(result, Err(PipelineError::ConfigError(_))));
    }

    #[test]
    fn test_placeholder_label_gives_keyword_free_summary() {
        let documents = vec![
            Document::new(0, "a", "", None),
            Document::new(1, "b", "", None),
        ];
        let model = ClusterModel {
            assignment: ClusterAssignment::from_labels(vec![Some(ClusterId(0)), Some(ClusterId(0))]),
            keywords: BTreeMap::new(),
            min_cluster_size: 2,
            quality: None,
            origin: ModelOrigin::Fallback,
        };
        let labels = build_labels(&model, 5);
        let reports = cluster_reports(&documents, &model, &labels, &Summarizer::default());

        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].label.text(), "topic-0");
        assert_eq!(reports[0].summary, "", "No sentences and no label terms means no summary");
        assert_eq!(reports[0].average_citations, None);
    }

    #[test]
    fn test_label_terms_steer_summary() {
        let documents = vec![
            Document::new(0, "a", "", None),
            Document::new(1, "b", "", None),
        ];
        let mut keywords = BTreeMap::new();
        keywords.insert(
            ClusterId(0),
            vec![Keyword::new("molecule", 1.0), Keyword::new("chemistry", 0.5)],
        );
        let model = ClusterModel {
            assignment: ClusterAssignment::from_labels(vec![Some(ClusterId(0)), Some(ClusterId(0))]),
            keywords,
            min_cluster_size: 2,
            quality: Some(0.5),
            origin: ModelOrigin::Selected,
        };
        let labels = build_labels(&model, 5);
        let reports = cluster_reports(&documents, &model, &labels, &Summarizer::default());

        assert_eq!(reports[0].summary, "This group of papers explores molecule, chemistry.");
    }
}
