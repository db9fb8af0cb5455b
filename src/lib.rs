use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod config;
pub mod error;
pub mod filter;
pub mod handlers;
pub mod models;
pub mod policy;
pub mod repository;

// Routing split by access level (public, authenticated).
pub mod routes;
use auth::AuthUser;
use routes::{authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::ApiError;
pub use repository::{InMemoryRepository, PostgresRepository, RepositoryState};

/// ApiDoc
///
/// OpenAPI document for every snippet endpoint, served at `/api-docs/openapi.json`
/// and browsable through Swagger UI.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::list_snippets, handlers::create_snippet, handlers::get_snippet,
        handlers::update_snippet, handlers::delete_snippet
    ),
    components(
        schemas(
            models::Snippet, models::User, models::SnippetWithOwner,
            models::CreateSnippetRequest, models::UpdateSnippetRequest,
            models::DeleteSnippetResponse, models::ErrorResponse,
        )
    ),
    tags(
        (name = "snippet-share", description = "Code snippet sharing API")
    )
)]
struct ApiDoc;

/// AppState
///
/// Shared, immutable container for the services every request needs. Cloned per
/// request; no mutable state lives here.
#[derive(Clone)]
pub struct AppState {
    /// Persistence layer behind the `Repository` trait.
    pub repo: RepositoryState,
    /// Configuration loaded at startup.
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

// Let extractors (notably `AuthUser`) pull single components out of the shared state.

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Guards the authenticated routes. Extracting `AuthUser` rejects the request with a
/// 401 `{"error":"Unauthorized"}` before the handler runs when no identity resolves.
/// The resolved user is stashed in the request extensions so the handler's own
/// `AuthUser` extraction does not hit the store again.
async fn auth_middleware(auth_user: AuthUser, mut request: Request, next: Next) -> Response {
    request.extensions_mut().insert(auth_user);
    next.run(request).await
}

/// create_router
///
/// Assembles the routing table, applies the scoped auth middleware and the global
/// observability layers, and registers the application state.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                // Tag every request with a UUID before anything logs.
                .layer(SetRequestIdLayer::new(
                    x_request_id.clone(),
                    MakeRequestUuid,
                ))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // Echo the request id back to the client.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Builds the per-request span so every log line of a request carries its method,
/// URI and `x-request-id`.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
