//! vault-rag: multi-user document Q&A with per-account isolation
//!
//! This crate implements the ingestion-and-retrieval core of a document
//! question-answering service. Authenticated users upload PDF, DOCX, or plain
//! text files; the pipeline extracts text, chunks it, embeds each chunk, and
//! stores the embeddings tagged with the owning account. Questions are
//! answered by retrieving the owner's most relevant chunks, which are handed
//! to a pluggable generation collaborator.
//!
//! One account's documents are never visible to another: every index record
//! carries its owner at write time and every read path filters on it.

pub mod auth;
pub mod config;
pub mod error;
pub mod ingestion;
pub mod providers;
pub mod retrieval;
pub mod server;
pub mod storage;
pub mod types;

pub use config::AppConfig;
pub use error::{Error, Result};
pub use retrieval::Coordinator;
pub use types::{
    account::{Account, Session},
    document::{Document, FileType},
    response::RetrievedChunk,
};
