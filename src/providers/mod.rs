//! Provider abstractions for embeddings, vector storage, and answer generation
//!
//! Trait-based so the retrieval coordinator receives explicitly owned,
//! injectable handles; tests swap in doubles without touching the pipeline.

pub mod embedding;
pub mod generation;
pub mod memory;
pub mod ollama;
pub mod qdrant;
pub mod vector_index;

pub use embedding::Embedder;
pub use generation::AnswerGenerator;
pub use memory::MemoryIndex;
pub use ollama::{OllamaEmbedder, OllamaGenerator};
pub use qdrant::QdrantIndex;
pub use vector_index::{ChunkRecord, ScoredChunk, VectorIndex};
