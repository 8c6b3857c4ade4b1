//! Tiered Cache - product service
//!
//! Serves a product catalogue through a write-through or write-behind
//! repository over an in-memory cache and persistent store.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tiered_cache::api::{create_router, AppState};
use tiered_cache::models::Product;
use tiered_cache::{
    spawn_cleanup_task, Config, InMemoryStore, MemoryCacheStore, Repository, WriteBehindRepository,
    WriteMode, WriteThroughRepository,
};

type ProductCache = MemoryCacheStore<Product>;
type ProductStore = InMemoryStore<Product>;

const CATEGORIES: [&str; 4] = ["tools", "kitchen", "garden", "books"];

/// Main entry point for the product service.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Seed the persistent store and create the cache store
/// 4. Build the repository for the configured write mode
/// 5. Start background TTL cleanup task
/// 6. Serve HTTP until SIGINT/SIGTERM
/// 7. Flush buffered writes before exiting
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tiered_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting tiered cache product service");

    let config = Config::from_env();
    info!(
        "Configuration loaded: mode={:?}, max_entries={}, default_ttl={}s, eviction={:?}, port={}",
        config.write_mode,
        config.max_entries,
        config.default_ttl,
        config.eviction_policy,
        config.server_port
    );

    let store = Arc::new(ProductStore::new());
    store.seed(seed_products(config.seed_products)).await;
    info!("Persistent store seeded with {} products", store.len().await);

    let cache = Arc::new(ProductCache::from_config(&config));

    let (repository, write_behind) = build_repository(&config, &cache, &store);
    info!("Repository initialized in {:?} mode", config.write_mode);

    let cleanup_handle = spawn_cleanup_task(
        Arc::clone(&cache),
        Duration::from_secs(config.cleanup_interval),
    );
    info!("Background cleanup task started");

    let app = create_router(AppState::new(repository));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cleanup_handle))
        .await
        .context("server error")?;

    if let Some(repository) = write_behind {
        let report = repository.shutdown().await;
        info!(flushed = report.flushed, "Buffered writes flushed");
    }

    cache.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Builds the repository served over HTTP. In write-behind mode the concrete
/// handle is returned too so its buffer can be flushed at shutdown.
fn build_repository(
    config: &Config,
    cache: &Arc<ProductCache>,
    store: &Arc<ProductStore>,
) -> (
    Arc<dyn Repository<Product>>,
    Option<Arc<WriteBehindRepository<Product, ProductCache, ProductStore>>>,
) {
    match config.write_mode {
        WriteMode::Through => {
            let repository: Arc<dyn Repository<Product>> = Arc::new(WriteThroughRepository::new(
                Arc::clone(cache),
                Arc::clone(store),
                config.repository_options(),
            ));
            (repository, None)
        }
        WriteMode::Behind => {
            let repository = Arc::new(WriteBehindRepository::new(
                Arc::clone(cache),
                Arc::clone(store),
                config.repository_options(),
                config.write_behind_config(),
            ));
            let shared: Arc<dyn Repository<Product>> = repository.clone();
            (shared, Some(repository))
        }
    }
}

fn seed_products(count: u64) -> impl Iterator<Item = Product> {
    (1..=count).map(|id| {
        let category = CATEGORIES[(id as usize - 1) % CATEGORIES.len()];
        Product::new(
            id,
            format!("Product {}", id),
            category,
            500 + id as i64 * 125,
        )
    })
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
///
/// On shutdown signal, aborts the cleanup task and allows graceful shutdown.
async fn shutdown_signal(cleanup_handle: tokio::task::JoinHandle<()>) {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(error = %err, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                error!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    cleanup_handle.abort();
    warn!("Cleanup task aborted");
}
