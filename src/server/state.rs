//! Application state for the HTTP server

use std::sync::Arc;

use crate::auth::{CredentialStore, SessionManager};
use crate::config::{AppConfig, VectorIndexBackend};
use crate::error::Result;
use crate::providers::{
    AnswerGenerator, Embedder, MemoryIndex, OllamaEmbedder, OllamaGenerator, QdrantIndex,
    VectorIndex,
};
use crate::retrieval::Coordinator;
use crate::storage::Database;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AppConfig,
    credentials: CredentialStore,
    sessions: SessionManager,
    coordinator: Coordinator,
    generator: Option<Arc<dyn AnswerGenerator>>,
}

impl AppState {
    /// Build the full state from configuration: database, providers,
    /// coordinator, and auth components.
    pub async fn new(config: AppConfig) -> Result<Self> {
        let db = Arc::new(Database::new(&config.auth.db_path)?);
        tracing::info!(path = %config.auth.db_path.display(), "database opened");

        let embedder: Arc<dyn Embedder> = Arc::new(OllamaEmbedder::new(&config.embeddings)?);

        let index: Arc<dyn VectorIndex> = match config.vector_index.backend {
            VectorIndexBackend::Memory => {
                tracing::info!("using in-process vector index");
                Arc::new(MemoryIndex::new())
            }
            VectorIndexBackend::Qdrant => {
                tracing::info!(url = %config.vector_index.url, "using Qdrant vector index");
                Arc::new(
                    QdrantIndex::connect(&config.vector_index, config.embeddings.dimensions)
                        .await?,
                )
            }
        };

        let generator: Option<Arc<dyn AnswerGenerator>> = if config.generation.enabled {
            tracing::info!(model = %config.generation.model, "answer generation enabled");
            Some(Arc::new(OllamaGenerator::new(&config.generation)?))
        } else {
            None
        };

        let coordinator = Coordinator::new(&config, Arc::clone(&db), index, embedder)?;
        let credentials = CredentialStore::new(Arc::clone(&db));
        let sessions = SessionManager::new(Arc::clone(&db), config.auth.session_ttl_secs);

        // Startup housekeeping: drop session rows that expired while the
        // process was down.
        match sessions.purge_expired() {
            Ok(0) => {}
            Ok(n) => tracing::info!(count = n, "purged expired sessions"),
            Err(e) => tracing::warn!(error = %e, "failed to purge expired sessions"),
        }

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                credentials,
                sessions,
                coordinator,
                generator,
            }),
        })
    }

    /// Get configuration
    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    /// Get the credential store
    pub fn credentials(&self) -> &CredentialStore {
        &self.inner.credentials
    }

    /// Get the session manager
    pub fn sessions(&self) -> &SessionManager {
        &self.inner.sessions
    }

    /// Get the retrieval coordinator
    pub fn coordinator(&self) -> &Coordinator {
        &self.inner.coordinator
    }

    /// Get the answer generator, if one is configured
    pub fn generator(&self) -> Option<&Arc<dyn AnswerGenerator>> {
        self.inner.generator.as_ref()
    }
}
