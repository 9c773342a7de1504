//! Paper provider module.
//!
//! This module defines the interface for sourcing the papers to cluster and
//! includes a CSV implementation.
//!
//! The `PaperProvider` trait abstracts the source of paper data, so the
//! clustering pipeline works on already validated, typed [`Document`]s and
//! never sees file formats.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::Document;

pub mod csv;

/// Errors that can occur when loading papers from a provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Failed to read from the data source
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse the data format
    #[error("Parse error: {0}")]
    ParseError(String),

    /// A required column is absent
    #[error("Missing required column '{0}' (the dataset must include 'title' and 'abstract')")]
    MissingColumn(String),

    /// Other provider-specific errors
    #[error("Provider error: {0}")]
    Other(String),
}

/// Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Trait for sourcing papers from various providers.
///
/// # Design Notes
///
/// - Documents come back in source order with `index` set to their position
/// - Providers validate required fields; missing optional values become
///   empty strings or `None`
#[async_trait]
pub trait PaperProvider: Send + Sync {
    /// Fetch all available papers from this provider.
    ///
    /// # Errors
    /// Returns `ProviderError` if papers cannot be fetched or parsed
    async fn fetch_documents(&self) -> ProviderResult<Vec<Document>>;

    /// Fetch at most `limit` papers, useful for quick trial runs.
    async fn fetch_documents_limit(&self, limit: usize) -> ProviderResult<Vec<Document>> {
        let all = self.fetch_documents().await?;
        Ok(all.into_iter().take(limit).collect())
    }

    /// Get the total count of papers available from this provider.
    async fn count_documents(&self) -> ProviderResult<usize> {
        // Providers should override this with a cheaper count if possible
        self.fetch_documents().await.map(|docs| docs.len())
    }

    /// Get a human-readable name/description of this provider.
    fn name(&self) -> &str;
}
