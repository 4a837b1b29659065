//! Token-aware recursive document chunking.
//!
//! [`TokenChunker`] splits page text hierarchically — paragraphs, then
//! sentences, then words — measuring segment sizes in tokens under a named
//! tiktoken encoding. Segments that no separator can break are cut at raw
//! token windows. Adjacent chunks share the trailing `chunk_overlap` tokens
//! of their predecessor so local context survives a cut boundary.

use tiktoken_rs::CoreBPE;
use tracing::debug;

use crate::document::{Chunk, Page};
use crate::error::{RagError, Result};

/// Separator ladder tried in order during recursive splitting.
const SEPARATORS: [&str; 5] = ["\n\n", ". ", "! ", "? ", " "];

/// Splits text into token-bounded chunks with token-level overlap.
///
/// Chunking is deterministic: identical input, size, overlap, and encoding
/// always yield the identical chunk sequence.
pub struct TokenChunker {
    chunk_size: usize,
    chunk_overlap: usize,
    bpe: CoreBPE,
}

impl std::fmt::Debug for TokenChunker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenChunker")
            .field("chunk_size", &self.chunk_size)
            .field("chunk_overlap", &self.chunk_overlap)
            .finish_non_exhaustive()
    }
}

impl TokenChunker {
    /// Create a chunker for the given token budget and encoding name.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Chunking`] if the encoding name is not one of
    /// `cl100k_base`, `o200k_base`, `p50k_base`, `r50k_base`, or if the
    /// encoding fails to load.
    pub fn new(chunk_size: usize, chunk_overlap: usize, encoding: &str) -> Result<Self> {
        let bpe = match encoding {
            "cl100k_base" => tiktoken_rs::cl100k_base(),
            "o200k_base" => tiktoken_rs::o200k_base(),
            "p50k_base" => tiktoken_rs::p50k_base(),
            "r50k_base" => tiktoken_rs::r50k_base(),
            other => {
                return Err(RagError::Chunking(format!("unknown encoding '{other}'")));
            }
        }
        .map_err(|e| RagError::Chunking(format!("failed to load encoding '{encoding}': {e}")))?;

        Ok(Self { chunk_size, chunk_overlap, bpe })
    }

    /// Split pages into an ordered chunk sequence.
    ///
    /// Empty input yields an empty result. Chunk indices are global across
    /// the page sequence.
    pub fn chunk_pages(&self, pages: &[Page]) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        let mut chunk_index = 0;

        for page in pages {
            if page.text.is_empty() {
                continue;
            }
            for text in self.split_and_merge(&page.text, &SEPARATORS) {
                chunks.push(Chunk::from_page(page, chunk_index, text));
                chunk_index += 1;
            }
        }

        debug!(page_count = pages.len(), chunk_count = chunks.len(), "chunked pages");
        chunks
    }

    /// Count tokens in `text` under the configured encoding.
    pub fn token_len(&self, text: &str) -> usize {
        self.bpe.encode_ordinary(text).len()
    }

    /// Split text by a separator, then merge segments into chunks that
    /// respect the token budget. Oversized segments fall through to the
    /// next-level separator, and finally to a raw token-window split.
    fn split_and_merge(&self, text: &str, separators: &[&str]) -> Vec<String> {
        if self.token_len(text) <= self.chunk_size {
            return vec![text.to_string()];
        }
        if separators.is_empty() {
            return self.split_by_tokens(text);
        }

        let separator = separators[0];
        let remaining = &separators[1..];

        let segments: Vec<&str> = if separator == " " {
            text.split_inclusive(' ').collect()
        } else {
            split_keeping_separator(text, separator)
        };

        let mut chunks: Vec<String> = Vec::new();
        let mut current = String::new();
        let mut current_tokens = 0;

        for segment in segments {
            let segment_tokens = self.token_len(segment);

            if current.is_empty() {
                current = segment.to_string();
                current_tokens = segment_tokens;
            } else if current_tokens + segment_tokens <= self.chunk_size {
                current.push_str(segment);
                current_tokens += segment_tokens;
            } else {
                self.flush(&mut chunks, current, remaining);
                // Seed the next chunk with the tail of the previous one.
                let tail = self.overlap_tail(chunks.last().map_or("", |c| c.as_str()));
                current = format!("{tail}{segment}");
                current_tokens = self.token_len(&current);
            }
        }

        if !current.is_empty() {
            self.flush(&mut chunks, current, remaining);
        }

        chunks
    }

    fn flush(&self, chunks: &mut Vec<String>, current: String, separators: &[&str]) {
        if self.token_len(&current) > self.chunk_size {
            chunks.extend(self.split_and_merge(&current, separators));
        } else {
            chunks.push(current);
        }
    }

    /// Decode the trailing `chunk_overlap` tokens of `text`.
    fn overlap_tail(&self, text: &str) -> String {
        if self.chunk_overlap == 0 || text.is_empty() {
            return String::new();
        }
        let tokens = self.bpe.encode_ordinary(text);
        let mut start = tokens.len().saturating_sub(self.chunk_overlap);
        // A token boundary can fall inside a multi-byte scalar; advance
        // until the slice decodes cleanly.
        while start < tokens.len() {
            if let Ok(tail) = self.bpe.decode(tokens[start..].to_vec()) {
                return tail;
            }
            start += 1;
        }
        String::new()
    }

    /// Raw token-window split for text no separator can break.
    fn split_by_tokens(&self, text: &str) -> Vec<String> {
        let tokens = self.bpe.encode_ordinary(text);
        if tokens.len() <= self.chunk_size {
            return vec![text.to_string()];
        }

        let step = self.chunk_size.saturating_sub(self.chunk_overlap).max(1);
        let mut pieces = Vec::new();
        let mut start = 0;

        while start < tokens.len() {
            let mut end = (start + self.chunk_size).min(tokens.len());
            let mut piece = self.bpe.decode(tokens[start..end].to_vec());
            // Widen past a broken scalar boundary if needed.
            while piece.is_err() && end < tokens.len() {
                end += 1;
                piece = self.bpe.decode(tokens[start..end].to_vec());
            }
            match piece {
                Ok(p) => pieces.push(p),
                Err(_) => break,
            }
            if end >= tokens.len() {
                break;
            }
            start += step;
        }

        pieces
    }
}

/// Split text at a separator while keeping the separator attached to the
/// preceding segment.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    let mut result = Vec::new();
    let mut start = 0;

    while let Some(pos) = text[start..].find(separator) {
        let end = start + pos + separator.len();
        result.push(&text[start..end]);
        start = end;
    }

    if start < text.len() {
        result.push(&text[start..]);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(text: &str) -> Page {
        Page { text: text.to_string(), page_index: 0, source: "doc.txt".to_string() }
    }

    fn chunker(size: usize, overlap: usize) -> TokenChunker {
        TokenChunker::new(size, overlap, "cl100k_base").unwrap()
    }

    #[test]
    fn unknown_encoding_is_rejected() {
        let err = TokenChunker::new(64, 8, "not_an_encoding").unwrap_err();
        assert!(matches!(err, RagError::Chunking(_)));
    }

    #[test]
    fn empty_pages_yield_no_chunks() {
        let chunks = chunker(64, 8).chunk_pages(&[]);
        assert!(chunks.is_empty());
        let chunks = chunker(64, 8).chunk_pages(&[page("")]);
        assert!(chunks.is_empty());
    }

    #[test]
    fn short_page_is_a_single_chunk() {
        let chunks = chunker(64, 8).chunk_pages(&[page("a short paragraph")]);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "a short paragraph");
        assert_eq!(chunks[0].id, "doc_0");
    }

    #[test]
    fn every_chunk_respects_the_token_budget() {
        let text = "The quick brown fox jumps over the lazy dog. ".repeat(60);
        let c = chunker(32, 4);
        let chunks = c.chunk_pages(&[page(&text)]);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(
                c.token_len(&chunk.text) <= 32,
                "chunk exceeds budget: {} tokens",
                c.token_len(&chunk.text)
            );
        }
    }

    #[test]
    fn chunking_is_deterministic() {
        let text = "Paragraph one about apples.\n\nParagraph two about oranges. ".repeat(30);
        let c = chunker(48, 6);
        let first: Vec<String> = c.chunk_pages(&[page(&text)]).into_iter().map(|c| c.text).collect();
        let second: Vec<String> =
            c.chunk_pages(&[page(&text)]).into_iter().map(|c| c.text).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn unbroken_text_is_cut_at_token_windows_with_overlap() {
        // No separators at all, so the raw token-window path must run.
        let text = "abcdefghij".repeat(100);
        let c = chunker(16, 4);
        let chunks = c.chunk_pages(&[page(&text)]);
        assert!(chunks.len() > 1);
        for window in chunks.windows(2) {
            // Each chunk ends with text its successor begins with.
            let a = &window[0].text;
            let b = &window[1].text;
            let shared = (1..=a.len().min(b.len()))
                .rev()
                .find(|&n| b.starts_with(&a[a.len() - n..]))
                .unwrap_or(0);
            assert!(shared > 0, "no textual overlap between adjacent chunks");
        }
    }

    #[test]
    fn chunk_indices_are_global_across_pages() {
        let pages = vec![
            Page { text: "page one text".into(), page_index: 0, source: "doc.txt".into() },
            Page { text: "page two text".into(), page_index: 1, source: "doc.txt".into() },
        ];
        let chunks = chunker(64, 8).chunk_pages(&pages);
        assert_eq!(chunks[0].id, "doc_0");
        assert_eq!(chunks[1].id, "doc_1");
        assert_eq!(chunks[1].metadata["page_index"], "1");
    }
}
