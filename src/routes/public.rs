use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Public Router Module
///
/// Endpoints reachable without a session. A session, when present, is still resolved
/// (via `MaybeAuthUser`) so owners see their private snippets here too.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for load balancers and monitoring.
        .route("/health", get(|| async { "ok" }))
        // GET /snippets?search=...&language=...&tag=...&public=true
        // Lists visible snippets, newest first. No pagination.
        .route("/snippets", get(handlers::list_snippets))
        // GET /snippets/{id}
        // Shareable link target. Public snippets are readable by anyone.
        .route("/snippets/{id}", get(handlers::get_snippet))
}
