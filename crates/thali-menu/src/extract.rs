//! Document text extraction.
//!
//! Provides the [`TextExtractor`] trait the menu pipeline reads documents
//! through, a [`PlainTextExtractor`] for text exports, and a
//! [`MockTextExtractor`] for tests.

use std::path::Path;

use thali_core::ThaliError;
use tracing::debug;

/// Service that turns a raw document into best-effort plain text.
///
/// Implementations wrap a concrete decoder (plain text, PDF, OCR) behind a
/// uniform async interface. Garbled output is acceptable; the parser
/// degrades to fewer items instead of failing.
pub trait TextExtractor: Send + Sync {
    /// Extract text from raw document bytes.
    fn extract_text(
        &self,
        document: &[u8],
    ) -> impl std::future::Future<Output = Result<String, ThaliError>> + Send;
}

/// Read a document from disk and run it through `extractor`.
pub async fn extract_file<E: TextExtractor>(
    extractor: &E,
    path: &Path,
) -> Result<String, ThaliError> {
    let bytes = tokio::fs::read(path).await?;
    debug!(path = %path.display(), bytes = bytes.len(), "Read menu document");
    extractor.extract_text(&bytes).await
}

// =============================================================================
// PlainTextExtractor
// =============================================================================

/// Extractor for text exports of a menu (`pdftotext` output, `.txt`).
///
/// Decodes lossily as UTF-8 and rewrites form feeds and carriage returns
/// as newlines so line-anchored patterns see one line per menu row.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextExtractor;

impl PlainTextExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl TextExtractor for PlainTextExtractor {
    async fn extract_text(&self, document: &[u8]) -> Result<String, ThaliError> {
        if document.is_empty() {
            return Err(ThaliError::Extraction("Empty document".to_string()));
        }
        Ok(normalize_text(&String::from_utf8_lossy(document)))
    }
}

/// Normalize line endings and page breaks to `\n`.
pub fn normalize_text(text: &str) -> String {
    text.replace("\r\n", "\n").replace(['\r', '\u{c}'], "\n")
}

// =============================================================================
// MockTextExtractor
// =============================================================================

/// Mock extractor for testing.
///
/// Returns the configured text for any non-empty input.
#[derive(Debug, Clone)]
pub struct MockTextExtractor {
    response_text: String,
}

impl MockTextExtractor {
    /// Create a mock extractor that returns the specified text.
    pub fn with_text(text: &str) -> Self {
        Self {
            response_text: text.to_string(),
        }
    }

    /// Create a mock extractor that returns empty text (an unreadable scan).
    pub fn empty() -> Self {
        Self {
            response_text: String::new(),
        }
    }
}

impl TextExtractor for MockTextExtractor {
    async fn extract_text(&self, document: &[u8]) -> Result<String, ThaliError> {
        if document.is_empty() {
            return Err(ThaliError::Extraction("Empty document".to_string()));
        }
        Ok(self.response_text.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_plain_text_passthrough() {
        let extractor = PlainTextExtractor::new();
        let text = extractor.extract_text(b"Naan - 80").await.unwrap();
        assert_eq!(text, "Naan - 80");
    }

    #[tokio::test]
    async fn test_plain_text_normalizes_line_breaks() {
        let extractor = PlainTextExtractor::new();
        let text = extractor
            .extract_text(b"Naan - 80\r\nRaita - 60\x0cLassi - 150\rTea - 90")
            .await
            .unwrap();
        assert_eq!(text, "Naan - 80\nRaita - 60\nLassi - 150\nTea - 90");
    }

    #[tokio::test]
    async fn test_plain_text_lossy_utf8() {
        let extractor = PlainTextExtractor::new();
        let text = extractor.extract_text(&[b'N', 0xff, b'a']).await.unwrap();
        assert!(text.starts_with('N'));
        assert!(text.ends_with('a'));
    }

    #[tokio::test]
    async fn test_plain_text_empty_document() {
        let extractor = PlainTextExtractor::new();
        let result = extractor.extract_text(&[]).await;
        assert!(matches!(result, Err(ThaliError::Extraction(_))));
    }

    #[tokio::test]
    async fn test_extract_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"Chicken Biryani .... Rs 450\r\n").unwrap();
        let text = extract_file(&PlainTextExtractor::new(), file.path())
            .await
            .unwrap();
        assert_eq!(text, "Chicken Biryani .... Rs 450\n");
    }

    #[tokio::test]
    async fn test_extract_missing_file() {
        let result = extract_file(
            &PlainTextExtractor::new(),
            Path::new("/nonexistent/menu.txt"),
        )
        .await;
        assert!(matches!(result, Err(ThaliError::Io(_))));
    }

    #[tokio::test]
    async fn test_mock_extractor() {
        let extractor = MockTextExtractor::with_text("Naan - 80");
        assert_eq!(extractor.extract_text(&[1]).await.unwrap(), "Naan - 80");
        assert!(MockTextExtractor::empty()
            .extract_text(&[1])
            .await
            .unwrap()
            .is_empty());
        assert!(extractor.extract_text(&[]).await.is_err());
    }
}
