//! Embedding provider abstraction and text normalization.
//!
//! This module defines the interface for text embedding generation and the
//! normalizer that cleans titles and abstracts before they are embedded.
//!
//! The abstraction allows the pipeline to swap embedding models without
//! changing the clustering logic downstream.

pub mod fastembed;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// Errors that can occur during embedding operations.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// Model inference failed
    #[error("Embedding generation failed: {0}")]
    GenerationError(String),

    /// Invalid input text (e.g., empty)
    #[error("Invalid input text: {0}")]
    InvalidInput(String),

    /// Configuration error (e.g., model could not be loaded)
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Other unexpected errors
    #[error("Unexpected error: {0}")]
    Other(String),
}

/// Result type for embedding operations.
pub type EmbeddingResult<T> = Result<T, EmbeddingError>;

/// Trait for text embedding providers.
///
/// Implementors generate one fixed-length vector per input text. Providers
/// must be deterministic for a given model configuration and must return
/// batch results in input order.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding vector for the given text.
    ///
    /// # Errors
    /// Returns `EmbeddingError` if the embedding generation fails
    async fn embed(&self, text: &str) -> EmbeddingResult<Vec<f32>>;

    /// Generate embeddings for multiple texts in a single batch.
    ///
    /// # Returns
    /// A vector of embedding vectors, in the same order as the input texts
    ///
    /// # Errors
    /// Returns `EmbeddingError` if any embedding generation fails
    async fn embed_batch(&self, texts: &[&str]) -> EmbeddingResult<Vec<Vec<f32>>>;

    /// Get the dimension of embeddings produced by this provider.
    fn dimension(&self) -> usize;

    /// Get the model name/identifier for this provider.
    fn model_name(&self) -> &str;
}

static BRACKETED_OR_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[[^\]]*\]|\([^)]*\)|https?://\S+").expect("valid regex"));
static DISALLOWED_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\p{L}\p{N}\s\-]").expect("valid regex"));
static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Normalizes raw title or abstract text before embedding.
///
/// Rules, applied in order:
/// 1. Remove `[...]` and `(...)` spans and `http(s)://` URLs
/// 2. Replace every character that is not a letter, digit, whitespace or
///    hyphen with a space
/// 3. Collapse whitespace runs to one space
/// 4. Lowercase
/// 5. Trim
///
/// Never fails; empty or junk input yields an empty string.
///
/// # Example
/// ```
/// use paper_clusters::embedding::normalize_text;
///
/// let normalized = normalize_text("  Graph NETS [12], see https://x.org (v2)!  ");
/// assert_eq!(normalized, "graph nets see");
/// ```
pub fn normalize_text(text: &str) -> String {
    let stripped = BRACKETED_OR_URL.replace_all(text, "");
    let cleaned = DISALLOWED_CHARS.replace_all(&stripped, " ");
    let collapsed = WHITESPACE_RUN.replace_all(&cleaned, " ");
    collapsed.to_lowercase().trim().to_string()
}

/// Normalizes possibly-absent text; absent input yields an empty string.
pub fn normalize_optional(text: Option<&str>) -> String {
    text.map(normalize_text).unwrap_or_default()
}

/// Scale a vector to unit L2 norm in place. Zero vectors are left untouched.
pub fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for x in vector.iter_mut() {
            *x /= norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text("Hello World"), "hello world");
        assert_eq!(normalize_text("  Multiple   Spaces  "), "multiple spaces");
        assert_eq!(normalize_text("UPPERCASE"), "uppercase");
        assert_eq!(normalize_text("   "), "");
    }

    #[test]
    fn test_normalize_strips_citations_and_urls() {
        assert_eq!(
            normalize_text("Results [3, 4] improve (see appendix) http://a.b/c?d=1 a lot"),
            "results improve a lot"
        );
    }

    #[test]
    fn test_normalize_keeps_hyphens_and_digits() {
        assert_eq!(
            normalize_text("State-of-the-art 3D models: 95% accuracy; wow_ok"),
            "state-of-the-art 3d models 95 accuracy wow ok"
        );
    }

    #[test]
    fn test_normalize_keeps_unicode_letters() {
        assert_eq!(normalize_text("Über Modèles"), "über modèles");
    }

    #[test]
    fn test_normalize_optional() {
        assert_eq!(normalize_optional(None), "");
        assert_eq!(normalize_optional(Some("A  B")), "a b");
    }

    #[test]
    fn test_l2_normalize() {
        let mut v = vec![3.0, 4.0];
        l2_normalize(&mut v);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);

        let mut zero = vec![0.0, 0.0];
        l2_normalize(&mut zero);
        assert_eq!(zero, vec![0.0, 0.0], "Zero vector should stay zero");
    }
}
