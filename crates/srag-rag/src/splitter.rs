//! Fixed-size overlapping text splitter

use srag_core::{Chunk, ChunkMetadata, Error, Result};
use uuid::Uuid;

/// Splits text into windows of `chunk_size` characters, each sharing
/// `chunk_overlap` characters with the previous one.
#[derive(Debug, Clone)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl TextSplitter {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 || chunk_overlap >= chunk_size {
            return Err(Error::Configuration(format!(
                "invalid splitter settings: chunk_size={} chunk_overlap={}",
                chunk_size, chunk_overlap
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    /// Split text into raw windows. Whitespace-only input yields nothing.
    pub fn split_text(&self, content: &str) -> Vec<String> {
        let mut chunks = Vec::new();
        if content.trim().is_empty() {
            return chunks;
        }

        let chars: Vec<char> = content.chars().collect();
        let mut start = 0;

        while start < chars.len() {
            let end = (start + self.chunk_size).min(chars.len());
            let chunk: String = chars[start..end].iter().collect();
            chunks.push(chunk);

            if end >= chars.len() {
                break;
            }

            start = end - self.chunk_overlap;
        }

        chunks
    }

    /// Split a document's text into chunks tagged with their source file
    pub fn split_document(&self, content: &str, file_name: &str, source: &str) -> Vec<Chunk> {
        let pieces = self.split_text(content);
        let total_chunks = pieces.len();

        pieces
            .into_iter()
            .enumerate()
            .map(|(chunk_index, text)| {
                let id = Uuid::new_v4().to_string();
                Chunk {
                    metadata: ChunkMetadata {
                        file_name: file_name.to_string(),
                        node_id: id.clone(),
                        source: source.to_string(),
                        chunk_index,
                        total_chunks,
                    },
                    id,
                    text,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_count_and_overlap() {
        let splitter = TextSplitter::new(500, 20).unwrap();
        let text = "a".repeat(1800);
        let chunks = splitter.split_text(&text);

        // windows start at 0, 480, 960, 1440
        assert_eq!(chunks.len(), 4);
        assert_eq!(chunks[0].len(), 500);
        assert_eq!(chunks[3].len(), 360);
    }

    #[test]
    fn test_overlap_is_shared() {
        let splitter = TextSplitter::new(10, 3).unwrap();
        let chunks = splitter.split_text("abcdefghijklmnop");
        assert_eq!(chunks, vec!["abcdefghij", "hijklmnop"]);
    }

    #[test]
    fn test_short_and_empty_text() {
        let splitter = TextSplitter::new(500, 20).unwrap();
        assert_eq!(splitter.split_text("short").len(), 1);
        assert!(splitter.split_text("").is_empty());
        assert!(splitter.split_text("   \n ").is_empty());
    }

    #[test]
    fn test_multibyte_characters_are_not_split() {
        let splitter = TextSplitter::new(4, 1).unwrap();
        let chunks = splitter.split_text("héllo wörld");
        assert!(chunks.iter().all(|c| c.chars().count() <= 4));
        assert_eq!(chunks[0], "héll");
    }

    #[test]
    fn test_invalid_settings() {
        assert!(TextSplitter::new(0, 0).is_err());
        assert!(TextSplitter::new(10, 10).is_err());
    }

    #[test]
    fn test_split_document_metadata() {
        let splitter = TextSplitter::new(10, 2).unwrap();
        let chunks = splitter.split_document("0123456789abcdefghij", "a.pdf", "uploads/a.pdf");

        assert_eq!(chunks.len(), 3);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.metadata.file_name, "a.pdf");
            assert_eq!(chunk.metadata.source, "uploads/a.pdf");
            assert_eq!(chunk.metadata.chunk_index, i);
            assert_eq!(chunk.metadata.total_chunks, 3);
            assert_eq!(chunk.metadata.node_id, chunk.id);
        }
    }
}
