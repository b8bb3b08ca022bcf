pub mod api;
pub mod config;
pub mod entities;
pub mod infrastructure;
pub mod services;
pub mod utils;

use crate::config::ImportConfig;
use crate::services::import::ImportService;
use axum::{
    Router,
    http::HeaderValue,
    middleware::from_fn,
    routing::{get, post},
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::health::health_check,
        api::handlers::clients::list_clients,
        api::handlers::clients::create_client,
        api::handlers::imports::upload::import_clients,
        api::handlers::imports::upload::import_multi_sheet,
        api::handlers::imports::upload::import_json,
        api::handlers::imports::stream::import_stream,
        api::handlers::imports::stream::import_chunked,
        api::handlers::imports::stream::session_status,
    ),
    components(
        schemas(
            api::handlers::health::HealthResponse,
            api::handlers::clients::ClientResponse,
            api::handlers::clients::CreateClientRequest,
            api::handlers::imports::FileUploadForm,
            api::handlers::imports::FileChunkForm,
            api::handlers::imports::JsonImportRequest,
            api::handlers::imports::StreamChunkRequest,
            services::import::report::ImportSummary,
            services::import::types::RowError,
            services::import::chunked::ChunkProgress,
            services::import::chunked::SessionStatus,
        )
    ),
    tags(
        (name = "system", description = "Health and diagnostics"),
        (name = "clients", description = "Client records"),
        (name = "imports", description = "Bulk client import from files, JSON and streamed chunks")
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: ImportConfig,
    pub import_service: Arc<ImportService>,
}

fn cors_layer(config: &ImportConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("⚠️  Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers(Any)
}

pub fn create_app(state: AppState) -> Router {
    let owned_routes = Router::new()
        .route(
            "/clients",
            get(api::handlers::clients::list_clients).post(api::handlers::clients::create_client),
        )
        .route(
            "/clients/import",
            post(api::handlers::imports::import_clients),
        )
        .route(
            "/clients/import/multi-sheet",
            post(api::handlers::imports::import_multi_sheet),
        )
        .route(
            "/clients/import/json",
            post(api::handlers::imports::import_json),
        )
        .route(
            "/clients/import/stream",
            post(api::handlers::imports::import_stream),
        )
        .route(
            "/clients/import/chunked",
            post(api::handlers::imports::import_chunked),
        )
        .route(
            "/clients/import/sessions/:session_id",
            get(api::handlers::imports::session_status),
        )
        .route_layer(from_fn(api::middleware::owner::owner_middleware));

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(api::handlers::health::health_check))
        .merge(owned_routes)
        .layer(from_fn(api::middleware::request_id::request_id_middleware))
        .layer(cors_layer(&state.config))
        .layer(axum::extract::DefaultBodyLimit::max(state.config.body_limit()))
        .with_state(state)
}
