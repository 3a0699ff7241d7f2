//! Answer generation trait
//!
//! The core never fabricates answers itself; retrieved chunks are handed to
//! this collaborator, which is consumed as a black box.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::response::RetrievedChunk;

/// Trait for turning retrieved chunks into a prose answer
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    /// Generate an answer to `question` grounded in `chunks`.
    ///
    /// The chunks carry provenance (filename, ordinal) so the generator can
    /// cite sources.
    async fn generate(&self, question: &str, chunks: &[RetrievedChunk]) -> Result<String>;

    /// Provider name for logging
    fn name(&self) -> &str;
}
