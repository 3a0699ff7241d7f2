//! Text chunking with fixed-size overlapping windows
//!
//! Chunk boundaries are raw character counts aligned to UTF-8 character
//! boundaries, not sentences: each chunk after the first starts exactly
//! `overlap` characters before the previous chunk ends, so stripping the
//! leading overlap from every chunk but the first reconstitutes the source
//! text. The output is deterministic for identical inputs.

use crate::error::{Error, Result};

/// A single chunk produced by the chunker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkPiece {
    /// Ordinal position within the document (0-based)
    pub ordinal: u32,
    /// Chunk text
    pub text: String,
}

/// Text chunker with configurable window size and overlap
#[derive(Debug, Clone)]
pub struct TextChunker {
    /// Target chunk size in characters
    target_size: usize,
    /// Characters shared between consecutive chunks
    overlap: usize,
}

impl TextChunker {
    /// Create a new chunker; the configuration is validated here so every
    /// later `chunk` call is infallible.
    pub fn new(target_size: usize, overlap: usize) -> Result<Self> {
        if target_size == 0 {
            return Err(Error::InvalidChunkConfig(
                "target_size must be greater than zero".to_string(),
            ));
        }
        if overlap >= target_size {
            return Err(Error::InvalidChunkConfig(format!(
                "overlap ({}) must be smaller than target_size ({})",
                overlap, target_size
            )));
        }
        Ok(Self {
            target_size,
            overlap,
        })
    }

    /// Split text into overlapping chunks, ordered by ordinal.
    ///
    /// Empty input yields no chunks.
    pub fn chunk(&self, text: &str) -> Vec<ChunkPiece> {
        if text.is_empty() {
            return Vec::new();
        }

        // Byte offset of every character boundary, plus the end of the text.
        let bounds: Vec<usize> = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .collect();
        let total_chars = bounds.len() - 1;

        let stride = self.target_size - self.overlap;
        let mut pieces = Vec::new();
        let mut start = 0usize;
        let mut ordinal = 0u32;

        loop {
            let end = (start + self.target_size).min(total_chars);
            pieces.push(ChunkPiece {
                ordinal,
                text: text[bounds[start]..bounds[end]].to_string(),
            });

            if end == total_chars {
                break;
            }
            start += stride;
            ordinal += 1;
        }

        pieces
    }

    /// The configured overlap in characters
    pub fn overlap(&self) -> usize {
        self.overlap
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Strip the leading overlap from every chunk but the first and
    /// concatenate; must reproduce the source exactly.
    fn reconstitute(chunker: &TextChunker, pieces: &[ChunkPiece]) -> String {
        let mut out = String::new();
        for (i, piece) in pieces.iter().enumerate() {
            if i == 0 {
                out.push_str(&piece.text);
            } else {
                let skipped: String = piece.text.chars().skip(chunker.overlap()).collect();
                out.push_str(&skipped);
            }
        }
        out
    }

    #[test]
    fn invalid_configs_are_rejected() {
        assert!(matches!(
            TextChunker::new(0, 0).unwrap_err(),
            Error::InvalidChunkConfig(_)
        ));
        assert!(matches!(
            TextChunker::new(100, 100).unwrap_err(),
            Error::InvalidChunkConfig(_)
        ));
        assert!(matches!(
            TextChunker::new(100, 150).unwrap_err(),
            Error::InvalidChunkConfig(_)
        ));
        assert!(TextChunker::new(100, 0).is_ok());
    }

    #[test]
    fn short_text_is_a_single_chunk() {
        let chunker = TextChunker::new(500, 50).unwrap();
        let pieces = chunker.chunk("short text");
        assert_eq!(pieces.len(), 1);
        assert_eq!(pieces[0].ordinal, 0);
        assert_eq!(pieces[0].text, "short text");
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        let chunker = TextChunker::new(500, 50).unwrap();
        assert!(chunker.chunk("").is_empty());
    }

    #[test]
    fn ordinals_are_sequential_and_windows_overlap() {
        let chunker = TextChunker::new(10, 3).unwrap();
        let text = "abcdefghijklmnopqrstuvwxyz";
        let pieces = chunker.chunk(text);

        for (i, piece) in pieces.iter().enumerate() {
            assert_eq!(piece.ordinal, i as u32);
        }
        // Consecutive chunks share exactly `overlap` characters
        for pair in pieces.windows(2) {
            let tail: String = pair[0].text.chars().rev().take(3).collect::<Vec<_>>()
                .into_iter().rev().collect();
            let head: String = pair[1].text.chars().take(3).collect();
            assert_eq!(tail, head);
        }
    }

    #[test]
    fn reconstitution_roundtrip() {
        let chunker = TextChunker::new(10, 3).unwrap();
        let text = "The quick brown fox jumps over the lazy dog, twice around the block.";
        let pieces = chunker.chunk(text);
        assert!(pieces.len() > 1);
        assert_eq!(reconstitute(&chunker, &pieces), text);
    }

    #[test]
    fn reconstitution_roundtrip_multibyte() {
        let chunker = TextChunker::new(7, 2).unwrap();
        let text = "héllo wörld — ünïcode tëxt über αβγδε and 日本語のテキスト";
        let pieces = chunker.chunk(text);
        assert!(pieces.len() > 1);
        assert_eq!(reconstitute(&chunker, &pieces), text);
    }

    #[test]
    fn chunking_is_deterministic() {
        let chunker = TextChunker::new(12, 4).unwrap();
        let text = "determinism matters for reproducible retrieval tests";
        assert_eq!(chunker.chunk(text), chunker.chunk(text));
    }

    #[test]
    fn no_chunk_exceeds_target_size() {
        let chunker = TextChunker::new(10, 3).unwrap();
        let text = "abcdefghijklmnopqrstuvwxyz0123456789";
        for piece in chunker.chunk(text) {
            assert!(piece.text.chars().count() <= 10);
        }
    }
}
