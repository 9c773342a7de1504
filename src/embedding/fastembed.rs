//! FastEmbed embedding provider implementation.
//!
//! This module provides an implementation of the `EmbeddingProvider` trait
//! using the fastembed library for local embedding generation.
//!
//! FastEmbed runs sentence-embedding models locally (ONNX), so a clustering
//! run needs no API key and is reproducible for a fixed model.

use super::{EmbeddingError, EmbeddingProvider, EmbeddingResult};
use ::fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Models selectable by name, with their output dimension.
const KNOWN_MODELS: &[(&str, usize)] = &[
    ("AllMiniLML6V2", 384),
    ("BGESmallENV15", 384),
    ("BGEBaseENV15", 768),
    ("BGELargeENV15", 1024),
    ("NomicEmbedTextV1", 768),
    ("NomicEmbedTextV15", 768),
    ("ParaphraseMLMiniLML12V2", 384),
    ("ParaphraseMLMpnetBaseV2", 768),
];

/// Resolve a model from a user-supplied name.
///
/// Matching ignores case, dashes, underscores and dots, so
/// `all-MiniLM-L6-v2`, `AllMiniLML6V2` and
/// `sentence-transformers/all-minilm-l6-v2` all resolve to the same model.
pub fn parse_model_name(name: &str) -> Option<EmbeddingModel> {
    let base = name.rsplit('/').next().unwrap_or(name);
    let key: String = base
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect();

    let model = match key.as_str() {
        "allminilml6v2" => EmbeddingModel::AllMiniLML6V2,
        "bgesmallenv15" => EmbeddingModel::BGESmallENV15,
        "bgebaseenv15" => EmbeddingModel::BGEBaseENV15,
        "bgelargeenv15" => EmbeddingModel::BGELargeENV15,
        "nomicembedtextv1" => EmbeddingModel::NomicEmbedTextV1,
        "nomicembedtextv15" => EmbeddingModel::NomicEmbedTextV15,
        "paraphrasemlminilml12v2" | "paraphrasemultilingualminilml12v2" => {
            EmbeddingModel::ParaphraseMLMiniLML12V2
        }
        "paraphrasemlmpnetbasev2" | "paraphrasemultilingualmpnetbasev2" => {
            EmbeddingModel::ParaphraseMLMpnetBaseV2
        }
        _ => return None,
    };
    Some(model)
}

/// Output dimension of a model, by its debug name.
fn model_dimension(model_name: &str) -> usize {
    KNOWN_MODELS
        .iter()
        .find(|(name, _)| *name == model_name)
        .map(|(_, dim)| *dim)
        .unwrap_or(384)
}

/// FastEmbed embedding provider configuration.
///
/// This struct holds the model instance used to embed normalized paper texts.
#[derive(Clone)]
pub struct FastEmbedProvider {
    /// The embedding model instance (wrapped in Arc<Mutex> for thread-safety)
    model: Arc<Mutex<TextEmbedding>>,

    /// Model identifier
    model_name: String,

    /// Expected dimension of the embedding vectors
    embedding_dimension: usize,
}

impl FastEmbedProvider {
    /// Create a new FastEmbed embedding provider.
    ///
    /// # Arguments
    /// * `model` - Optional model to use (defaults to AllMiniLML6V2)
    /// * `cache_dir` - Optional cache directory for model files
    ///
    /// # Errors
    /// Returns `EmbeddingError::ConfigError` if model initialization fails
    pub fn new(model: Option<EmbeddingModel>, cache_dir: Option<PathBuf>) -> EmbeddingResult<Self> {
        let model_type = model.unwrap_or(EmbeddingModel::AllMiniLML6V2);
        let model_name = format!("{:?}", model_type);
        let embedding_dimension = model_dimension(&model_name);

        let mut init_options = InitOptions::new(model_type);
        if let Some(dir) = cache_dir {
            init_options = init_options.with_cache_dir(dir);
        }

        let text_embedding = TextEmbedding::try_new(init_options).map_err(|e| {
            EmbeddingError::ConfigError(format!("Failed to initialize FastEmbed model: {}", e))
        })?;

        Ok(Self {
            model: Arc::new(Mutex::new(text_embedding)),
            model_name,
            embedding_dimension,
        })
    }

    /// Create a provider from a model name such as `all-MiniLM-L6-v2`.
    ///
    /// # Errors
    /// Returns `EmbeddingError::ConfigError` for unknown names or when the
    /// model cannot be loaded
    pub fn from_model_name(name: &str, cache_dir: Option<PathBuf>) -> EmbeddingResult<Self> {
        let model = parse_model_name(name).ok_or_else(|| {
            let known: Vec<&str> = KNOWN_MODELS.iter().map(|(n, _)| *n).collect();
            EmbeddingError::ConfigError(format!(
                "Unknown embedding model '{}'. Known models: {}",
                name,
                known.join(", ")
            ))
        })?;
        Self::new(Some(model), cache_dir)
    }
}

#[async_trait]
impl EmbeddingProvider for FastEmbedProvider {
    async fn embed(&self, text: &str) -> EmbeddingResult<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::InvalidInput("Text cannot be empty".to_string()));
        }

        let mut model = self.model.lock().await;
        let embeddings = model
            .embed(vec![text.to_string()], None)
            .map_err(|e| EmbeddingError::GenerationError(e.to_string()))?;

        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::Other("No embedding generated".to_string()))
    }

    async fn embed_batch(&self, texts: &[&str]) -> EmbeddingResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        if let Some(position) = texts.iter().position(|t| t.trim().is_empty()) {
            return Err(EmbeddingError::InvalidInput(format!(
                "All texts must be non-empty (text {} is empty)",
                position
            )));
        }

        let mut model = self.model.lock().await;
        let text_strings: Vec<String> = texts.iter().map(|&s| s.to_string()).collect();

        model
            .embed(text_strings, None)
            .map_err(|e| EmbeddingError::GenerationError(format!("Batch embedding failed: {}", e)))
    }

    fn dimension(&self) -> usize {
        self.embedding_dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

// TextEmbedding does not implement Debug
impl std::fmt::Debug for FastEmbedProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FastEmbedProvider")
            .field("model_name", &self.model_name)
            .field("embedding_dimension", &self.embedding_dimension)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_model_name_variants() {
        assert!(matches!(
            parse_model_name("all-MiniLM-L6-v2"),
            Some(EmbeddingModel::AllMiniLML6V2)
        ));
        assert!(matches!(
            parse_model_name("sentence-transformers/all-minilm-l6-v2"),
            Some(EmbeddingModel::AllMiniLML6V2)
        ));
        assert!(matches!(
            parse_model_name("BAAI/bge-base-en-v1.5"),
            Some(EmbeddingModel::BGEBaseENV15)
        ));
        assert!(parse_model_name("definitely-not-a-model").is_none());
    }

    #[test]
    fn test_model_dimensions() {
        assert_eq!(model_dimension("AllMiniLML6V2"), 384);
        assert_eq!(model_dimension("BGELargeENV15"), 1024);
        assert_eq!(model_dimension("Unknown"), 384, "Unknown models fall back to 384");
    }

    #[test]
    fn test_unknown_model_name_is_config_error() {
        let result = FastEmbedProvider::from_model_name("no-such-model", None);
        match result {
            Err(EmbeddingError::ConfigError(msg)) => {
                assert!(msg.contains("no-such-model"), "Error should name the model");
                assert!(msg.contains("AllMiniLML6V2"), "Error should list known models");
            }
            other => panic!("Expected ConfigError, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    #[ignore = "downloads model weights"]
    async fn test_embed_batch_preserves_order_and_dimension() {
        let provider = FastEmbedProvider::new(None, None).expect("model should load");
        let texts = vec!["graph neural networks for molecules", "speech recognition"];

        let embeddings = provider.embed_batch(&texts).await.unwrap();
        assert_eq!(embeddings.len(), 2);
        assert!(embeddings.iter().all(|e| e.len() == provider.dimension()));

        let single = provider.embed(texts[1]).await.unwrap();
        assert_eq!(single.len(), embeddings[1].len());
    }

    #[tokio::test]
    #[ignore = "downloads model weights"]
    async fn test_embed_rejects_empty_text() {
        let provider = FastEmbedProvider::new(None, None).expect("model should load");
        let result = provider.embed_batch(&["valid", "  "]).await;
        assert!(matches!(result, Err(EmbeddingError::InvalidInput(_))));
    }
}
