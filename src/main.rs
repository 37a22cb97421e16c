mod core;
mod features;
mod modules;
mod shared;

use crate::core::config::Config;
use crate::core::openapi::{self, OPENAPI_JSON_PATH};
use crate::core::{database, middleware};
use crate::features::files::{
    routes as files_routes, FileService, FileStore, FilesState, ImportService,
};
use crate::features::pages::routes as pages_routes;
use crate::modules::storage::LocalStorage;
use crate::shared::views::Views;
use axum::Router;
use std::sync::Arc;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> anyhow::Result<()> {
    // Build Tokio runtime with configurable worker threads
    let worker_threads = std::env::var("TOKIO_WORKER_THREADS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|p| p.get())
                .unwrap_or(4)
        });

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(worker_threads)
        .max_blocking_threads(worker_threads * 4)
        .enable_all()
        .build()?;

    runtime.block_on(async_main(worker_threads))
}

async fn async_main(worker_threads: usize) -> anyhow::Result<()> {
    // Load .env file BEFORE initializing logger so RUST_LOG is available
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().map_err(|e| anyhow::anyhow!(e))?;

    tracing::info!(
        "System info: tokio_worker_threads={}, pid={}",
        worker_threads,
        std::process::id()
    );
    tracing::info!("Configuration loaded successfully");

    // Database
    let pool = database::create_pool(&config.database).await?;
    tracing::info!("Database connection pool created");

    let store = FileStore::new(pool);
    store
        .initialize()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to initialize files table: {}", e))?;
    tracing::info!("files table initialized");

    // Storage area
    let storage = Arc::new(LocalStorage::new(
        config.storage.root.clone(),
        config.storage.collision_policy,
    ));
    storage
        .ensure_root()
        .map_err(|e| anyhow::anyhow!("Failed to prepare storage root: {}", e))?;
    tracing::info!(
        "Storage root ready: {} (collision policy: {:?})",
        storage.root().display(),
        storage.policy()
    );

    // Services
    let file_service = Arc::new(FileService::new(store.clone(), Arc::clone(&storage)));

    let mut import_service =
        ImportService::new(store, Arc::clone(&storage), config.import.use_manifest);
    if let Some(temp_dir) = &config.import.temp_dir {
        std::fs::create_dir_all(temp_dir)?;
        import_service = import_service.with_temp_dir(temp_dir);
    }
    let import_service = Arc::new(import_service);
    tracing::info!(
        "File services initialized (manifest metadata: {})",
        if config.import.use_manifest { "enabled" } else { "disabled" }
    );

    let views = Arc::new(Views::new().map_err(|e| anyhow::anyhow!("Failed to load views: {}", e))?);

    let files_state = FilesState {
        file_service,
        import_service,
        views: Arc::clone(&views),
    };

    // Simple health check endpoint
    async fn health_check() -> axum::http::StatusCode {
        axum::http::StatusCode::OK
    }
    let health_route = Router::new().route("/health", axum::routing::get(health_check));

    let app = Router::new()
        .merge(pages_routes::routes(views))
        .merge(files_routes::routes(
            files_state,
            storage.root(),
            config.app.max_request_body_size,
        ))
        .merge(openapi::routes(&config.openapi))
        .merge(health_route)
        .layer(middleware::cors_layer(
            config.app.cors_allowed_origins.clone(),
        ))
        // Propagate X-Request-Id to response headers
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(middleware::trace_layer())
        // Generate X-Request-Id using UUID v7 (or use client-provided one)
        .layer(SetRequestIdLayer::x_request_id(middleware::MakeRequestUuid));

    // Start server
    let addr = config.app.server_address();
    let socket_addr: std::net::SocketAddr = addr
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid address: {}", e))?;

    // Use socket2 for TCP listener configuration
    let socket = socket2::Socket::new(
        socket2::Domain::for_address(socket_addr),
        socket2::Type::STREAM,
        Some(socket2::Protocol::TCP),
    )?;

    socket.set_reuse_address(true)?;
    socket.set_nodelay(true)?;

    // Uploads and archives are large; keep socket buffers generous
    socket.set_recv_buffer_size(1024 * 1024)?;
    socket.set_send_buffer_size(1024 * 1024)?;

    let keepalive = socket2::TcpKeepalive::new().with_time(std::time::Duration::from_secs(60));
    socket.set_tcp_keepalive(&keepalive)?;

    socket.set_nonblocking(true)?;
    socket.bind(&socket_addr.into())?;
    socket.listen(1024)?;

    let listener = tokio::net::TcpListener::from_std(socket.into())?;
    tracing::info!("Server listening on {}", format!("http://{}", addr));
    tracing::info!(
        "OpenAPI document available at {}",
        format!("http://{}{}", addr, OPENAPI_JSON_PATH)
    );

    axum::serve(listener, app).await?;

    Ok(())
}
