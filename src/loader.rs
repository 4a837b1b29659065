//! Source document ingestion.
//!
//! PDF files are extracted page by page; any other extension is read as
//! UTF-8 text and becomes a single page.

use std::path::Path;

use tracing::{debug, info};

use crate::document::Page;
use crate::error::{RagError, Result};

/// Load a source document into an ordered sequence of pages.
///
/// # Errors
///
/// Returns [`RagError::Document`] if the path cannot be read or the PDF
/// cannot be parsed. Callers that must not fail (the pipeline's
/// `load_data`) absorb this error at their own boundary.
pub fn load_document(path: &str) -> Result<Vec<Page>> {
    let is_pdf = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));

    let pages = if is_pdf { load_pdf(path)? } else { load_plain_text(path)? };

    info!(path, page_count = pages.len(), "loaded document");
    Ok(pages)
}

fn load_pdf(path: &str) -> Result<Vec<Page>> {
    let page_texts = pdf_extract::extract_text_by_pages(path).map_err(|e| RagError::Document {
        path: path.to_string(),
        message: format!("PDF extraction failed: {e}"),
    })?;

    debug!(path, page_count = page_texts.len(), "extracted PDF pages");

    Ok(page_texts
        .into_iter()
        .enumerate()
        .map(|(page_index, text)| Page { text, page_index, source: path.to_string() })
        .collect())
}

fn load_plain_text(path: &str) -> Result<Vec<Page>> {
    let text = std::fs::read_to_string(path).map_err(|e| RagError::Document {
        path: path.to_string(),
        message: format!("read failed: {e}"),
    })?;

    Ok(vec![Page { text, page_index: 0, source: path.to_string() }])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_plain_text_as_single_page() {
        let mut file = tempfile::NamedTempFile::with_suffix(".txt").unwrap();
        write!(file, "hello world").unwrap();

        let pages = load_document(file.path().to_str().unwrap()).unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].text, "hello world");
        assert_eq!(pages[0].page_index, 0);
    }

    #[test]
    fn missing_path_is_a_document_error() {
        let err = load_document("no/such/file.txt").unwrap_err();
        assert!(matches!(err, RagError::Document { .. }));
    }
}
