//! Embedding and reduction orchestration.
//!
//! The orchestrator turns an ordered document set into one reduced vector per
//! document:
//!
//! 1. Embeds the normalized texts, in fixed-size batches once the corpus is
//!    larger than a threshold, otherwise in a single call
//! 2. Concatenates batch results in input order and checks count and width
//! 3. Optionally L2-normalises every embedding
//! 4. Hands the full matrix to the reducer exactly once
//!
//! Downstream stages address documents by position, so row `i` of both
//! matrices always belongs to document `i`.
//!
//! ```ignore
//! let orchestrator = EmbeddingOrchestrator::new(
//!     FastEmbedProvider::new(None, None)?,
//!     RandomProjectionReducer::new(),
//!     OrchestratorConfig::default(),
//!     ReductionParams::default(),
//! );
//! let corpus = orchestrator.run(&documents).await?;
//! assert_eq!(corpus.reduced.len(), documents.len());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::embedding::{l2_normalize, EmbeddingProvider};
use crate::models::Document;
use crate::reduction::{ReductionError, ReductionParams, Reducer};

/// Errors that can occur while embedding and reducing a corpus.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// No documents were supplied
    #[error("No documents to embed")]
    EmptyInput,

    /// Embedding generation failed
    #[error("Embedding error: {0}")]
    EmbeddingError(String),

    /// The embedder returned the wrong number of vectors
    #[error("Embedder returned {found} vectors for {expected} texts")]
    CountMismatch {
        /// Texts sent
        expected: usize,
        /// Vectors received
        found: usize,
    },

    /// Embeddings have inconsistent lengths
    #[error("Embedding {index} has dimension {found}, expected {expected}")]
    DimensionMismatch {
        /// Offending document
        index: usize,
        /// Dimension of the first embedding
        expected: usize,
        /// Dimension of the offending embedding
        found: usize,
    },

    /// Dimensionality reduction failed
    #[error("Reduction error: {0}")]
    ReductionError(#[from] ReductionError),

    /// The reducer returned the wrong number of rows
    #[error("Reducer returned {found} rows for {expected} documents")]
    ReducedCountMismatch {
        /// Rows sent
        expected: usize,
        /// Rows received
        found: usize,
    },
}

/// Result type for orchestration.
pub type OrchestratorResult<T> = Result<T, OrchestratorError>;

/// Batching and normalisation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Texts per embedder call when batching
    pub batch_size: usize,

    /// Corpora larger than this are embedded in batches
    pub batch_threshold: usize,

    /// L2-normalise embeddings before reduction
    pub normalize_embeddings: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            batch_size: 64,
            batch_threshold: 1000,
            normalize_embeddings: true,
        }
    }
}

/// Full-dimensional and reduced vectors of a corpus, in document order.
#[derive(Debug, Clone)]
pub struct EmbeddedCorpus {
    /// One embedding per document
    pub embeddings: Vec<Vec<f32>>,

    /// One reduced vector per document
    pub reduced: Vec<Vec<f32>>,
}

/// Embedding/reduction coordinator.
pub struct EmbeddingOrchestrator<E, R>
where
    E: EmbeddingProvider,
    R: Reducer,
{
    /// Embedding provider
    embedder: E,

    /// Dimensionality reducer
    reducer: R,

    config: OrchestratorConfig,
    params: ReductionParams,
}

impl<E, R> EmbeddingOrchestrator<E, R>
where
    E: EmbeddingProvider,
    R: Reducer,
{
    /// Create a new orchestrator.
    pub fn new(embedder: E, reducer: R, config: OrchestratorConfig, params: ReductionParams) -> Self {
        Self {
            embedder,
            reducer,
            config,
            params,
        }
    }

    /// The embedding provider in use.
    pub fn embedder(&self) -> &E {
        &self.embedder
    }

    /// Embed texts, preserving order.
    ///
    /// # Errors
    /// Returns `OrchestratorError::EmbeddingError` if any embedder call fails
    /// and `CountMismatch`/`DimensionMismatch` if the embedder breaks its
    /// contract.
    pub async fn embed(&self, texts: &[&str]) -> OrchestratorResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Err(OrchestratorError::EmptyInput);
        }

        let batch_size = self.config.batch_size.max(1);
        let batched = texts.len() > self.config.batch_threshold;

        let mut embeddings: Vec<Vec<f32>> = Vec::with_capacity(texts.len());
        if batched {
            let total_batches = texts.len().div_ceil(batch_size);
            info!(
                documents = texts.len(),
                batch_size, total_batches, "Embedding in batches"
            );
            for (n, chunk) in texts.chunks(batch_size).enumerate() {
                let batch = self.embed_chunk(chunk).await?;
                embeddings.extend(batch);
                debug!(batch = n + 1, total_batches, "Embedded batch");
            }
        } else {
            info!(documents = texts.len(), "Embedding in a single call");
            embeddings = self.embed_chunk(texts).await?;
        }

        let expected = embeddings[0].len();
        if let Some((index, found)) = embeddings
            .iter()
            .enumerate()
            .find(|(_, e)| e.len() != expected)
            .map(|(i, e)| (i, e.len()))
        {
            return Err(OrchestratorError::DimensionMismatch { index, expected, found });
        }

        if self.config.normalize_embeddings {
            embeddings.iter_mut().for_each(|e| l2_normalize(e));
        }

        Ok(embeddings)
    }

    async fn embed_chunk(&self, chunk: &[&str]) -> OrchestratorResult<Vec<Vec<f32>>> {
        let batch = self
            .embedder
            .embed_batch(chunk)
            .await
            .map_err(|e| OrchestratorError::EmbeddingError(e.to_string()))?;

        if batch.len() != chunk.len() {
            return Err(OrchestratorError::CountMismatch {
                expected: chunk.len(),
                found: batch.len(),
            });
        }
        Ok(batch)
    }

    /// Reduce the full embedding matrix in one reducer call.
    pub fn reduce(&self, embeddings: &[Vec<f32>]) -> OrchestratorResult<Vec<Vec<f32>>> {
        info!(
            reducer = self.reducer.name(),
            target_dim = self.params.target_dim,
            seed = self.params.seed,
            "Reducing embeddings"
        );
        let reduced = self.reducer.reduce(embeddings, &self.params)?;
        if reduced.len() != embeddings.len() {
            return Err(OrchestratorError::ReducedCountMismatch {
                expected: embeddings.len(),
                found: reduced.len(),
            });
        }
        Ok(reduced)
    }

    /// Embed and reduce the normalized texts of `documents`.
    ///
    /// # Errors
    /// Any embedder or reducer failure is fatal for the run.
    pub async fn run(&self, documents: &[Document]) -> OrchestratorResult<EmbeddedCorpus> {
        let texts: Vec<&str> = documents.iter().map(|d| d.normalized.as_str()).collect();
        let embeddings = self.embed(&texts).await?;
        let reduced = self.reduce(&embeddings)?;
        Ok(EmbeddedCorpus { embeddings, reduced })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::{EmbeddingError, EmbeddingResult};
    use crate::reduction::ReductionResult;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    // ===== Mock Implementations =====

    /// Embeds every text as `[sequence number, 1.0]`, recording batch sizes.
    #[derive(Clone, Default)]
    struct MockEmbeddingProvider {
        state: Arc<Mutex<MockEmbeddingState>>,
    }

    #[derive(Default)]
    struct MockEmbeddingState {
        batch_sizes: Vec<usize>,
        seen: usize,
        should_fail: bool,
        drop_last: bool,
        ragged: bool,
    }

    impl MockEmbeddingProvider {
        fn with_failure(self) -> Self {
            self.state.lock().unwrap().should_fail = true;
            self
        }

        fn dropping_last(self) -> Self {
            self.state.lock().unwrap().drop_last = true;
            self
        }

        fn ragged(self) -> Self {
            self.state.lock().unwrap().ragged = true;
            self
        }

        fn batch_sizes(&self) -> Vec<usize> {
            self.state.lock().unwrap().batch_sizes.clone()
        }
    }

    #[async_trait]
    impl EmbeddingProvider for MockEmbeddingProvider {
        async fn embed(&self, text: &str) -> EmbeddingResult<Vec<f32>> {
            let mut batch = self.embed_batch(&[text]).await?;
            batch.pop().ok_or_else(|| EmbeddingError::Other("empty".to_string()))
        }

        async fn embed_batch(&self, texts: &[&str]) -> EmbeddingResult<Vec<Vec<f32>>> {
            let mut state = self.state.lock().unwrap();
            state.batch_sizes.push(texts.len());
            if state.should_fail {
                return Err(EmbeddingError::GenerationError("Mock embed_batch failure".to_string()));
            }

            let mut out = Vec::with_capacity(texts.len());
            for _ in texts {
                let mut v = vec![state.seen as f32, 1.0];
                if state.ragged && state.seen == 1 {
                    v.push(0.0);
                }
                out.push(v);
                state.seen += 1;
            }
            if state.drop_last {
                out.pop();
            }
            Ok(out)
        }

        fn dimension(&self) -> usize {
            2
        }

        fn model_name(&self) -> &str {
            "mock-model"
        }
    }

    /// Keeps the first `target_dim` columns and counts calls.
    #[derive(Clone, Default)]
    struct MockReducer {
        calls: Arc<Mutex<Vec<ReductionParams>>>,
    }

    impl Reducer for MockReducer {
        fn reduce(&self, matrix: &[Vec<f32>], params: &ReductionParams) -> ReductionResult<Vec<Vec<f32>>> {
            self.calls.lock().unwrap().push(params.clone());
            Ok(matrix
                .iter()
                .map(|row| row.iter().take(params.target_dim).copied().collect())
                .collect())
        }

        fn name(&self) -> &str {
            "mock-reducer"
        }
    }

    // ===== Test Helper Functions =====

    fn create_documents(n: usize) -> Vec<Document> {
        (0..n)
            .map(|i| Document::new(i, format!("Paper {}", i), "An abstract.", None))
            .collect()
    }

    fn raw_config() -> OrchestratorConfig {
        OrchestratorConfig {
            normalize_embeddings: false,
            ..Default::default()
        }
    }

    fn params(target_dim: usize) -> ReductionParams {
        ReductionParams {
            target_dim,
            ..Default::default()
        }
    }

    // ===== Batching Tests =====

    #[tokio::test]
    async fn test_small_corpus_uses_single_call() {
        let embedder = MockEmbeddingProvider::default();
        let orchestrator = EmbeddingOrchestrator::new(embedder.clone(), MockReducer::default(), raw_config(), params(1));

        let corpus = orchestrator.run(&create_documents(1000)).await.unwrap();
        assert_eq!(embedder.batch_sizes(), vec![1000], "At the threshold there should be one call");
        assert_eq!(corpus.embeddings.len(), 1000);
    }

    #[tokio::test]
    async fn test_large_corpus_is_batched_in_order() {
        let embedder = MockEmbeddingProvider::default();
        let orchestrator = EmbeddingOrchestrator::new(embedder.clone(), MockReducer::default(), raw_config(), params(1));

        let corpus = orchestrator.run(&create_documents(1001)).await.unwrap();

        let sizes = embedder.batch_sizes();
        assert_eq!(sizes.len(), 16, "1001 documents in batches of 64 need 16 calls");
        assert!(sizes[..15].iter().all(|&s| s == 64));
        assert_eq!(sizes[15], 41);

        for (i, row) in corpus.embeddings.iter().enumerate() {
            assert_eq!(row[0], i as f32, "Embedding {} should belong to document {}", i, i);
        }
        for (i, row) in corpus.reduced.iter().enumerate() {
            assert_eq!(row, &vec![i as f32], "Reduced row order should match input order");
        }
    }

    #[tokio::test]
    async fn test_reducer_called_once_with_params() {
        let reducer = MockReducer::default();
        let orchestrator = EmbeddingOrchestrator::new(
            MockEmbeddingProvider::default(),
            reducer.clone(),
            OrchestratorConfig {
                batch_threshold: 2,
                batch_size: 2,
                ..Default::default()
            },
            params(2),
        );

        orchestrator.run(&create_documents(5)).await.unwrap();
        let calls = reducer.calls.lock().unwrap().clone();
        assert_eq!(calls.len(), 1, "Reducer should see the full matrix once");
        assert_eq!(calls[0], params(2));
    }

    #[tokio::test]
    async fn test_embeddings_are_normalized() {
        let orchestrator = EmbeddingOrchestrator::new(
            MockEmbeddingProvider::default(),
            MockReducer::default(),
            OrchestratorConfig::default(),
            params(2),
        );

        let corpus = orchestrator.run(&create_documents(3)).await.unwrap();
        for row in &corpus.embeddings {
            let norm: f32 = row.iter().map(|x| x * x).sum::<f32>().sqrt();
            assert!((norm - 1.0).abs() < 1e-5, "Expected unit norm, got {}", norm);
        }
    }

    // ===== Error Handling Tests =====

    #[tokio::test]
    async fn test_empty_input() {
        let orchestrator = EmbeddingOrchestrator::new(
            MockEmbeddingProvider::default(),
            MockReducer::default(),
            OrchestratorConfig::default(),
            params(2),
        );
        assert!(matches!(orchestrator.run(&[]).await, Err(OrchestratorError::EmptyInput)));
    }

    #[tokio::test]
    async fn test_embedder_failure_is_fatal() {
        let orchestrator = EmbeddingOrchestrator::new(
            MockEmbeddingProvider::default().with_failure(),
            MockReducer::default(),
            OrchestratorConfig::default(),
            params(2),
        );

        let result = orchestrator.run(&create_documents(3)).await;
        if let Err(OrchestratorError::EmbeddingError(msg)) = result {
            assert!(msg.contains("Mock embed_batch failure"), "Error should carry the embedder message");
        } else {
            panic!("Expected EmbeddingError");
        }
    }

    #[tokio::test]
    async fn test_count_mismatch() {
        let orchestrator = EmbeddingOrchestrator::new(
            MockEmbeddingProvider::default().dropping_last(),
            MockReducer::default(),
            OrchestratorConfig::default(),
            params(2),
        );
        assert!(matches!(
            orchestrator.run(&create_documents(3)).await,
            Err(OrchestratorError::CountMismatch { expected: 3, found: 2 })
        ));
    }

    #[tokio::test]
    async fn test_dimension_mismatch() {
        let orchestrator = EmbeddingOrchestrator::new(
            MockEmbeddingProvider::default().ragged(),
            MockReducer::default(),
            OrchestratorConfig::default(),
            params(2),
        );
        assert!(matches!(
            orchestrator.run(&create_documents(3)).await,
            Err(OrchestratorError::DimensionMismatch { index: 1, expected: 2, found: 3 })
        ));
    }
}
