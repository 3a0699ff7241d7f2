//! Document ingestion: text extraction and chunking

mod chunker;
mod extractor;

pub use chunker::{ChunkPiece, TextChunker};
pub use extractor::extract;
