//! Core types for the document Q&A service

pub mod account;
pub mod document;
pub mod query;
pub mod response;

pub use account::{Account, Session};
pub use document::{Document, FileType};
pub use query::QueryRequest;
pub use response::{DocumentSummary, QueryResponse, RetrievedChunk};
