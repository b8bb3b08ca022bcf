use clap::Parser;
use dotenvy::dotenv;
use fitcoach_backend::config::ImportConfig;
use fitcoach_backend::infrastructure::database;
use fitcoach_backend::services::client_store::SeaOrmClientStore;
use fitcoach_backend::services::import::ImportService;
use fitcoach_backend::services::sessions::UploadSessionStore;
use fitcoach_backend::services::worker::SessionSweeper;
use fitcoach_backend::{AppState, create_app};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about = "Client import backend", long_about = None)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value_t = 3000)]
    port: u16,

    /// Address to bind
    #[arg(long, default_value = "127.0.0.1")]
    host: std::net::IpAddr,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let args = Args::parse();

    // Initialize tracing with EnvFilter
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fitcoach_backend=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("🚀 Starting client import backend...");

    let db = database::setup_database().await?;

    let import_config = ImportConfig::from_env();
    info!(
        "🛡️  Import Config: Max File={}MB, Max Workbook={}MB, Max Chunk={}MB, Retries={}, Session TTL={}s",
        import_config.max_import_file_size / 1024 / 1024,
        import_config.max_multi_sheet_file_size / 1024 / 1024,
        import_config.max_chunk_size / 1024 / 1024,
        import_config.retry_max_attempts,
        import_config.session_ttl_secs
    );

    let sessions = UploadSessionStore::new();
    let import_service = Arc::new(ImportService::new(
        Arc::new(SeaOrmClientStore::new(db.clone())),
        sessions.clone(),
        import_config.clone(),
    ));

    let state = AppState {
        db: db.clone(),
        config: import_config.clone(),
        import_service,
    };

    // Setup Shutdown Channel
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    let sweeper = SessionSweeper::new(
        sessions,
        import_config.session_ttl(),
        import_config.sweep_interval(),
        shutdown_rx,
    );
    tokio::spawn(async move {
        sweeper.run().await;
    });

    let app = create_app(state).layer(
        TraceLayer::new_for_http()
            .make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("unknown");
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            })
            .on_request(|request: &axum::http::Request<_>, _span: &tracing::Span| {
                info!("📥 {} {}", request.method(), request.uri());
            })
            .on_response(
                |response: &axum::http::Response<_>,
                 latency: std::time::Duration,
                 _span: &tracing::Span| {
                    info!(
                        "📤 Finished in {:?} with status {}",
                        latency,
                        response.status()
                    );
                },
            ),
    );

    let addr = SocketAddr::new(args.host, args.port);
    info!("✅ Server ready at http://{}", addr);
    info!("📖 Swagger UI: http://{}/swagger-ui", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            let _ = shutdown_tx.send(true);
        })
        .await?;

    info!("🛑 Server shut down gracefully.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("⌨️  Ctrl+C received, starting graceful shutdown...");
        },
        _ = terminate => {
            info!("💤 SIGTERM received, starting graceful shutdown...");
        },
    }
}
