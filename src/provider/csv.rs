//! CSV paper provider.
//!
//! Reads a table with required `title` and `abstract` columns and an
//! optional numeric `citation_number` column. Other columns are ignored.

use std::path::Path;

use ::csv::{ReaderBuilder, StringRecord};
use async_trait::async_trait;
use tracing::{debug, warn};

use super::{PaperProvider, ProviderError, ProviderResult};
use crate::models::Document;

const TITLE_COLUMN: &str = "title";
const ABSTRACT_COLUMN: &str = "abstract";
const CITATION_COLUMN: &str = "citation_number";

/// Paper provider backed by a CSV file loaded into memory.
#[derive(Debug, Clone)]
pub struct CsvPaperProvider {
    name: String,
    documents: Vec<Document>,
}

impl CsvPaperProvider {
    /// Load and validate a CSV file.
    ///
    /// # Errors
    /// Returns `ProviderError::IoError` if the file cannot be read,
    /// `MissingColumn` if `title` or `abstract` is absent and `ParseError` for
    /// malformed CSV.
    pub async fn from_file(path: impl AsRef<Path>) -> ProviderResult<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await?;
        let documents = parse_documents(&content)?;
        debug!(path = %path.display(), documents = documents.len(), "Loaded CSV dataset");

        Ok(Self {
            name: format!("csv:{}", path.display()),
            documents,
        })
    }

    /// Parse CSV content already in memory.
    pub fn from_csv_str(content: &str) -> ProviderResult<Self> {
        Ok(Self {
            name: "csv:<memory>".to_string(),
            documents: parse_documents(content)?,
        })
    }
}

fn column(headers: &StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h.trim() == name)
}

/// Citation counts are optional; anything non-numeric counts as unknown.
fn parse_citations(raw: Option<&str>) -> Option<f64> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|c| c.is_finite())
}

fn parse_documents(content: &str) -> ProviderResult<Vec<Document>> {
    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| ProviderError::ParseError(e.to_string()))?
        .clone();

    let title_idx = column(&headers, TITLE_COLUMN).ok_or_else(|| ProviderError::MissingColumn(TITLE_COLUMN.to_string()))?;
    let abstract_idx =
        column(&headers, ABSTRACT_COLUMN).ok_or_else(|| ProviderError::MissingColumn(ABSTRACT_COLUMN.to_string()))?;
    let citation_idx = column(&headers, CITATION_COLUMN);
    if citation_idx.is_none() {
        warn!("No '{}' column, citation statistics will be unavailable", CITATION_COLUMN);
    }

    let mut documents = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record.map_err(|e| ProviderError::ParseError(format!("row {}: {}", index + 1, e)))?;
        let citations = parse_citations(citation_idx.and_then(|i| record.get(i)));
        documents.push(Document::from_cells(
            index,
            record.get(title_idx),
            record.get(abstract_idx),
            citations,
        ));
    }
    Ok(documents)
}

#[async_trait]
impl PaperProvider for CsvPaperProvider {
    async fn fetch_documents(&self) -> ProviderResult<Vec<Document>> {
        Ok(self.documents.clone())
    }

    async fn count_documents(&self) -> ProviderResult<usize> {
        Ok(self.documents.len())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = "\
title,abstract,citation_number,venue
Graph Nets,We study molecules.,12,ICLR
Speech Models,\"Acoustic, robust models.\",n/a,ACL
Untitled,,,
";

    #[tokio::test]
    async fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let provider = CsvPaperProvider::from_file(file.path()).await.unwrap();
        let docs = provider.fetch_documents().await.unwrap();

        assert_eq!(docs.len(), 3);
        assert_eq!(provider.count_documents().await.unwrap(), 3);
        assert!(provider.name().starts_with("csv:"));

        assert_eq!(docs[0].index, 0);
        assert_eq!(docs[0].title, "Graph Nets");
        assert_eq!(docs[0].citation_count, Some(12.0));
        assert_eq!(docs[1].abstract_text, "Acoustic, robust models.", "Quoted commas stay in the cell");
        assert_eq!(docs[1].citation_count, None, "Non-numeric citations are unknown");
        assert_eq!(docs[2].abstract_text, "", "Missing cells become empty strings");
    }

    #[tokio::test]
    async fn test_limit() {
        let provider = CsvPaperProvider::from_csv_str(SAMPLE).unwrap();
        let docs = provider.fetch_documents_limit(2).await.unwrap();
        assert_eq!(docs.len(), 2);
    }

    #[test]
    fn test_missing_required_column() {
        let result = CsvPaperProvider::from_csv_str("title,summary\nA,B\n");
        match result {
            Err(ProviderError::MissingColumn(col)) => assert_eq!(col, "abstract"),
            other => panic!("Expected MissingColumn, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_citation_column_is_optional() {
        let provider = CsvPaperProvider::from_csv_str("abstract,title\nSome text.,T\n").unwrap();
        assert_eq!(provider.documents[0].citation_count, None);
        assert_eq!(provider.documents[0].title, "T", "Column order does not matter");
    }

    #[test]
    fn test_short_row_has_empty_abstract() {
        let provider = CsvPaperProvider::from_csv_str("title,abstract\nOnly A Title\n").unwrap();
        let doc = &provider.documents[0];
        assert_eq!(doc.title, "Only A Title");
        assert_eq!(doc.abstract_text, "", "Absent trailing cell should read as empty");
        assert_eq!(doc.normalized, "only a title. ");
    }

    #[tokio::test]
    async fn test_missing_file() {
        let result = CsvPaperProvider::from_file("/definitely/not/here.csv").await;
        assert!(matches!(result, Err(ProviderError::IoError(_))));
    }

    #[test]
    fn test_parse_citations() {
        assert_eq!(parse_citations(Some(" 7 ")), Some(7.0));
        assert_eq!(parse_citations(Some("3.5")), Some(3.5));
        assert_eq!(parse_citations(Some("")), None);
        assert_eq!(parse_citations(Some("NaN")), None);
        assert_eq!(parse_citations(None), None);
    }
}
