//! API server binary
//!
//! Run with: cargo run --bin vault-rag-server
//! Config file path is taken from VAULT_RAG_CONFIG if set.

use vault_rag::{server::ApiServer, AppConfig};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vault_rag=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match std::env::var("VAULT_RAG_CONFIG") {
        Ok(path) => {
            tracing::info!(path = %path, "loading configuration");
            AppConfig::load(path)?
        }
        Err(_) => {
            tracing::info!("no config file set, using defaults");
            AppConfig::default()
        }
    };

    tracing::info!("  - Embedding model: {}", config.embeddings.model);
    tracing::info!("  - Vector index: {:?}", config.vector_index.backend);
    tracing::info!("  - Chunk size: {}", config.chunking.chunk_size);
    tracing::info!("  - Max upload: {} bytes", config.server.max_upload_size);
    tracing::info!("  - Session TTL: {}s", config.auth.session_ttl_secs);

    let server = ApiServer::new(config).await?;

    println!("\nServer starting...");
    println!("  API: http://{}", server.address());
    println!("  Health: http://{}/health", server.address());
    println!("\nEndpoints:");
    println!("  POST   /auth/signup        - Create an account");
    println!("  POST   /auth/login         - Log in, returns a session token");
    println!("  POST   /auth/logout        - End the session");
    println!("  POST   /api/ingest         - Upload documents");
    println!("  POST   /api/query          - Ask questions about your documents");
    println!("  GET    /api/documents      - List your documents");
    println!("  DELETE /api/documents/:id  - Delete a document");
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}
