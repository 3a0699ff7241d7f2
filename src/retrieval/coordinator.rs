//! Retrieval coordinator
//!
//! Orchestrates the ingestion pipeline (size check → extract → chunk → embed
//! → index → document row) and owner-scoped retrieval. The owning account is
//! an explicit parameter on every operation; there is no ambient "current
//! user" anywhere in this module.

use dashmap::DashMap;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::ingestion::{self, TextChunker};
use crate::providers::{ChunkRecord, Embedder, VectorIndex};
use crate::storage::Database;
use crate::types::document::{Document, FileType};
use crate::types::response::RetrievedChunk;

/// Base delay for the bounded retry loop on transient store failures
const RETRY_BASE_DELAY: Duration = Duration::from_millis(100);

/// Coordinates ingestion and retrieval with per-account isolation.
///
/// The vector index and embedder are injected handles, so tests run the full
/// pipeline against in-process doubles.
pub struct Coordinator {
    db: Arc<Database>,
    index: Arc<dyn VectorIndex>,
    embedder: Arc<dyn Embedder>,
    chunker: TextChunker,
    max_upload_size: usize,
    max_retries: u32,
    /// Per-document locks serializing a delete against an in-flight ingest
    /// for the same document, so a racing delete cannot orphan chunks.
    doc_locks: DashMap<Uuid, Arc<tokio::sync::Mutex<()>>>,
}

impl Coordinator {
    /// Create a coordinator; fails if the chunking configuration is invalid
    pub fn new(
        config: &AppConfig,
        db: Arc<Database>,
        index: Arc<dyn VectorIndex>,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Self> {
        let chunker = TextChunker::new(config.chunking.chunk_size, config.chunking.chunk_overlap)?;

        Ok(Self {
            db,
            index,
            embedder,
            chunker,
            max_upload_size: config.server.max_upload_size,
            max_retries: config.vector_index.max_retries,
            doc_locks: DashMap::new(),
        })
    }

    /// Ingest an uploaded file for `owner`.
    ///
    /// All-or-nothing: the document row is only written after every chunk is
    /// in the index, and a failed upsert is compensated by deleting whatever
    /// was partially written. A failed ingest is invisible to
    /// `list_documents`.
    pub async fn ingest(&self, owner: Uuid, filename: &str, data: &[u8]) -> Result<Document> {
        if data.len() > self.max_upload_size {
            return Err(Error::FileTooLarge {
                size: data.len(),
                limit: self.max_upload_size,
            });
        }

        // Extraction parses arbitrary container formats; keep it off the
        // async workers so one large file never stalls unrelated requests.
        let text = {
            let filename = filename.to_string();
            let data = data.to_vec();
            tokio::task::spawn_blocking(move || ingestion::extract(&filename, &data))
                .await
                .map_err(|e| Error::Internal(format!("Extraction task failed: {}", e)))??
        };

        let file_type = FileType::from_filename(filename)
            .ok_or_else(|| Error::UnsupportedExtension(filename.to_string()))?;
        let content_hash = hash_content(&text);

        let pieces = self.chunker.chunk(&text);
        let texts: Vec<String> = pieces.iter().map(|p| p.text.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;

        // Fresh ID every upload: re-uploading a filename creates a new
        // document rather than overwriting the old one.
        let doc = Document::new(
            owner,
            filename.to_string(),
            file_type,
            text.len() as u64,
            pieces.len() as u32,
            content_hash,
        );

        let records: Vec<ChunkRecord> = pieces
            .into_iter()
            .zip(embeddings)
            .map(|(piece, embedding)| ChunkRecord {
                id: Uuid::new_v4(),
                owner,
                document_id: doc.id,
                ordinal: piece.ordinal,
                text: piece.text,
                embedding,
            })
            .collect();

        let lock = self.doc_lock(doc.id);
        let _guard = lock.lock().await;

        if let Err(e) = self.index.upsert(&records).await {
            // Best-effort compensation; with no document row committed the
            // upload leaves no visible trace either way.
            if let Err(cleanup) = self.index.delete_document(owner, doc.id).await {
                tracing::warn!(document_id = %doc.id, error = %cleanup,
                    "failed to clean up after aborted ingest");
            }
            return Err(e);
        }

        if let Err(e) = self.db.insert_document(&doc) {
            if let Err(cleanup) = self.index.delete_document(owner, doc.id).await {
                tracing::warn!(document_id = %doc.id, error = %cleanup,
                    "failed to clean up after aborted ingest");
            }
            return Err(e);
        }

        drop(_guard);
        self.doc_locks.remove(&doc.id);

        tracing::info!(
            owner = %owner,
            document_id = %doc.id,
            filename = %doc.filename,
            chunks = doc.total_chunks,
            "document ingested"
        );

        Ok(doc)
    }

    /// Retrieve the chunks most relevant to `question`, scoped to `owner`.
    ///
    /// Fails with `NoDocuments` when the owner has nothing indexed at all;
    /// weak matches on existing documents simply score low. The returned
    /// chunks are the sole input for the answer-generation collaborator.
    pub async fn answer_context(
        &self,
        owner: Uuid,
        question: &str,
        top_k: usize,
    ) -> Result<Vec<RetrievedChunk>> {
        if self.db.count_documents(owner)? == 0 {
            return Err(Error::NoDocuments);
        }

        let embedding = self.embedder.embed(question).await?;
        let scored = self.query_with_retry(owner, &embedding, top_k).await?;

        // Attach provenance from the document rows; a chunk whose document
        // row is gone (delete racing the query) is dropped rather than
        // returned without attribution.
        let mut filenames: HashMap<Uuid, String> = HashMap::new();
        let mut chunks = Vec::with_capacity(scored.len());

        for result in scored {
            let filename = match filenames.get(&result.document_id) {
                Some(name) => name.clone(),
                None => match self.db.get_document(result.document_id)? {
                    Some(doc) if doc.account_id == owner => {
                        filenames.insert(result.document_id, doc.filename.clone());
                        doc.filename
                    }
                    _ => continue,
                },
            };

            chunks.push(RetrievedChunk {
                document_id: result.document_id,
                filename,
                ordinal: result.ordinal,
                text: result.text,
                score: result.score,
            });
        }

        Ok(chunks)
    }

    /// List all documents owned by `owner`
    pub fn list_documents(&self, owner: Uuid) -> Result<Vec<Document>> {
        self.db.list_documents(owner)
    }

    /// Delete a document and all its chunks.
    ///
    /// Ownership is verified first; a document belonging to someone else is
    /// `NotOwner` (reported to clients exactly like `NotFound`).
    pub async fn delete_document(&self, owner: Uuid, document_id: Uuid) -> Result<()> {
        let doc = self.db.get_document(document_id)?.ok_or(Error::NotFound)?;
        if doc.account_id != owner {
            return Err(Error::NotOwner);
        }

        let lock = self.doc_lock(document_id);
        let _guard = lock.lock().await;

        // Chunks first: if this fails the document row stays visible and the
        // delete can be retried, never the other way around.
        self.index.delete_document(owner, document_id).await?;
        self.db.delete_document(document_id)?;

        drop(_guard);
        self.doc_locks.remove(&document_id);

        tracing::info!(owner = %owner, document_id = %document_id, "document deleted");
        Ok(())
    }

    /// Query the index, retrying transient failures with exponential backoff
    async fn query_with_retry(
        &self,
        owner: Uuid,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<crate::providers::ScoredChunk>> {
        let mut attempt = 0u32;
        loop {
            match self.index.query(owner, embedding, top_k).await {
                Err(Error::StoreUnavailable(reason)) if attempt < self.max_retries => {
                    let delay = RETRY_BASE_DELAY * 2u32.pow(attempt);
                    attempt += 1;
                    tracing::warn!(%reason, attempt, "vector store query failed, retrying");
                    tokio::time::sleep(delay).await;
                }
                other => return other,
            }
        }
    }

    fn doc_lock(&self, document_id: Uuid) -> Arc<tokio::sync::Mutex<()>> {
        self.doc_locks
            .entry(document_id)
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }
}

/// SHA-256 hex digest of the extracted text
fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{MemoryIndex, ScoredChunk};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Deterministic bag-of-words embedder: each word hashes into one of 64
    /// buckets, so texts sharing words score higher than unrelated texts.
    struct StubEmbedder;

    fn bucket(word: &str) -> usize {
        word.bytes().fold(7usize, |acc, b| {
            acc.wrapping_mul(31).wrapping_add(b as usize)
        }) % 64
    }

    #[async_trait]
    impl Embedder for StubEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            let mut v = vec![0.0f32; 64];
            for word in text
                .to_lowercase()
                .split(|c: char| !c.is_alphanumeric() && c != '$' && c != '.')
                .filter(|w| !w.is_empty())
            {
                v[bucket(word)] += 1.0;
            }
            Ok(v)
        }

        fn dimensions(&self) -> usize {
            64
        }

        fn name(&self) -> &str {
            "stub"
        }
    }

    /// Index whose upserts always fail, for the all-or-nothing contract
    struct FailingIndex;

    #[async_trait]
    impl VectorIndex for FailingIndex {
        async fn upsert(&self, _records: &[ChunkRecord]) -> Result<()> {
            Err(Error::StoreUnavailable("index is down".to_string()))
        }

        async fn query(
            &self,
            _owner: Uuid,
            _embedding: &[f32],
            _top_k: usize,
        ) -> Result<Vec<ScoredChunk>> {
            Err(Error::StoreUnavailable("index is down".to_string()))
        }

        async fn delete_document(&self, _owner: Uuid, _document_id: Uuid) -> Result<()> {
            Ok(())
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    /// Fails a fixed number of queries before recovering
    struct FlakyIndex {
        inner: MemoryIndex,
        failures_left: AtomicU32,
    }

    #[async_trait]
    impl VectorIndex for FlakyIndex {
        async fn upsert(&self, records: &[ChunkRecord]) -> Result<()> {
            self.inner.upsert(records).await
        }

        async fn query(
            &self,
            owner: Uuid,
            embedding: &[f32],
            top_k: usize,
        ) -> Result<Vec<ScoredChunk>> {
            if self
                .failures_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(Error::StoreUnavailable("transient".to_string()));
            }
            self.inner.query(owner, embedding, top_k).await
        }

        async fn delete_document(&self, owner: Uuid, document_id: Uuid) -> Result<()> {
            self.inner.delete_document(owner, document_id).await
        }

        fn name(&self) -> &str {
            "flaky"
        }
    }

    fn coordinator_with(index: Arc<dyn VectorIndex>) -> (Coordinator, Arc<Database>) {
        let db = Arc::new(Database::in_memory().unwrap());
        let coordinator = Coordinator::new(
            &AppConfig::default(),
            Arc::clone(&db),
            index,
            Arc::new(StubEmbedder),
        )
        .unwrap();
        (coordinator, db)
    }

    fn account(db: &Database, name: &str) -> Uuid {
        let account = crate::types::account::Account::new(
            name.to_string(),
            format!("{}@example.com", name),
            "hash".to_string(),
        );
        db.insert_account(&account).unwrap();
        account.id
    }

    #[tokio::test]
    async fn ingest_then_retrieve_ranks_the_relevant_chunk_first() {
        let (coordinator, db) = coordinator_with(Arc::new(MemoryIndex::new()));
        let alice = account(&db, "alice");

        coordinator
            .ingest(
                alice,
                "Report_Q1.txt",
                b"Sales were $1.2M in Q1, ahead of forecast.",
            )
            .await
            .unwrap();
        coordinator
            .ingest(
                alice,
                "handbook.txt",
                b"Office plants must be watered on Fridays.",
            )
            .await
            .unwrap();

        let chunks = coordinator
            .answer_context(alice, "What were Q1 sales?", 5)
            .await
            .unwrap();

        assert!(!chunks.is_empty());
        assert!(chunks[0].text.contains("$1.2M"));
        assert_eq!(chunks[0].filename, "Report_Q1.txt");
    }

    #[tokio::test]
    async fn owner_with_no_documents_gets_no_documents() {
        let (coordinator, db) = coordinator_with(Arc::new(MemoryIndex::new()));
        let alice = account(&db, "alice");
        let bob = account(&db, "bob");

        coordinator
            .ingest(alice, "report.txt", b"Sales were $1.2M in Q1.")
            .await
            .unwrap();

        let err = coordinator
            .answer_context(bob, "What were Q1 sales?", 5)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NoDocuments));
    }

    #[tokio::test]
    async fn retrieval_never_crosses_account_boundaries() {
        let (coordinator, db) = coordinator_with(Arc::new(MemoryIndex::new()));
        let alice = account(&db, "alice");
        let bob = account(&db, "bob");

        coordinator
            .ingest(alice, "secret.txt", b"The launch code is 0000.")
            .await
            .unwrap();
        coordinator
            .ingest(bob, "recipes.txt", b"Add two eggs and a cup of flour.")
            .await
            .unwrap();

        let chunks = coordinator
            .answer_context(bob, "What is the launch code?", 10)
            .await
            .unwrap();

        for chunk in &chunks {
            assert!(!chunk.text.contains("launch code"));
            assert_eq!(chunk.filename, "recipes.txt");
        }
    }

    #[tokio::test]
    async fn delete_removes_the_document_and_all_its_chunks() {
        let (coordinator, db) = coordinator_with(Arc::new(MemoryIndex::new()));
        let alice = account(&db, "alice");

        let doc = coordinator
            .ingest(alice, "report.txt", b"Sales were $1.2M in Q1.")
            .await
            .unwrap();
        coordinator
            .ingest(alice, "other.txt", b"Unrelated planning notes.")
            .await
            .unwrap();

        coordinator.delete_document(alice, doc.id).await.unwrap();

        assert_eq!(coordinator.list_documents(alice).unwrap().len(), 1);
        let chunks = coordinator
            .answer_context(alice, "What were Q1 sales?", 10)
            .await
            .unwrap();
        for chunk in &chunks {
            assert_ne!(chunk.document_id, doc.id);
        }
    }

    #[tokio::test]
    async fn delete_of_another_accounts_document_is_not_owner() {
        let (coordinator, db) = coordinator_with(Arc::new(MemoryIndex::new()));
        let alice = account(&db, "alice");
        let bob = account(&db, "bob");

        let doc = coordinator
            .ingest(alice, "report.txt", b"Sales were $1.2M in Q1.")
            .await
            .unwrap();

        let err = coordinator.delete_document(bob, doc.id).await.unwrap_err();
        assert!(matches!(err, Error::NotOwner));

        // Alice's document is untouched
        assert_eq!(coordinator.list_documents(alice).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn delete_of_unknown_document_is_not_found() {
        let (coordinator, db) = coordinator_with(Arc::new(MemoryIndex::new()));
        let alice = account(&db, "alice");

        let err = coordinator
            .delete_document(alice, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound));
    }

    #[tokio::test]
    async fn oversized_upload_is_rejected_before_extraction() {
        let (coordinator, db) = coordinator_with(Arc::new(MemoryIndex::new()));
        let alice = account(&db, "alice");

        let big = vec![b'a'; 10 * 1024 * 1024 + 1];
        let err = coordinator.ingest(alice, "big.txt", &big).await.unwrap_err();
        assert!(matches!(err, Error::FileTooLarge { .. }));
    }

    #[tokio::test]
    async fn unsupported_extension_is_rejected() {
        let (coordinator, db) = coordinator_with(Arc::new(MemoryIndex::new()));
        let alice = account(&db, "alice");

        let err = coordinator
            .ingest(alice, "tool.exe", b"MZ\x90")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedExtension(_)));
    }

    #[tokio::test]
    async fn failed_ingest_leaves_no_trace() {
        let (coordinator, db) = coordinator_with(Arc::new(FailingIndex));
        let alice = account(&db, "alice");

        let err = coordinator
            .ingest(alice, "report.txt", b"Sales were $1.2M in Q1.")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::StoreUnavailable(_)));

        assert!(coordinator.list_documents(alice).unwrap().is_empty());
    }

    #[tokio::test]
    async fn transient_query_failures_are_retried() {
        let flaky = Arc::new(FlakyIndex {
            inner: MemoryIndex::new(),
            failures_left: AtomicU32::new(2),
        });
        let (coordinator, db) = coordinator_with(flaky);
        let alice = account(&db, "alice");

        coordinator
            .ingest(alice, "report.txt", b"Sales were $1.2M in Q1.")
            .await
            .unwrap();

        // Two transient failures, then success within max_retries (2)
        let chunks = coordinator
            .answer_context(alice, "What were Q1 sales?", 5)
            .await
            .unwrap();
        assert!(!chunks.is_empty());
    }

    #[tokio::test]
    async fn reupload_of_the_same_filename_creates_a_new_document() {
        let (coordinator, db) = coordinator_with(Arc::new(MemoryIndex::new()));
        let alice = account(&db, "alice");

        let first = coordinator
            .ingest(alice, "report.txt", b"Version one of the report.")
            .await
            .unwrap();
        let second = coordinator
            .ingest(alice, "report.txt", b"Version two, fully revised.")
            .await
            .unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(coordinator.list_documents(alice).unwrap().len(), 2);
    }

    #[tokio::test]
    async fn empty_upload_is_reported_not_swallowed() {
        let (coordinator, db) = coordinator_with(Arc::new(MemoryIndex::new()));
        let alice = account(&db, "alice");

        let err = coordinator
            .ingest(alice, "blank.txt", b"   \n \t ")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::EmptyExtraction));
        assert!(coordinator.list_documents(alice).unwrap().is_empty());
    }
}
