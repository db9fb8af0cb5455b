use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{post, put},
};

/// Authenticated Router Module
///
/// Mutating snippet endpoints. The router above wraps this module in the
/// authentication middleware; each handler additionally extracts `AuthUser` and
/// enforces ownership through the shared access policy.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // POST /snippets
        // Creates a snippet owned by the caller.
        .route("/snippets", post(handlers::create_snippet))
        // PUT/DELETE /snippets/{id}
        // Owner-only replacement and removal.
        .route(
            "/snippets/{id}",
            put(handlers::update_snippet).delete(handlers::delete_snippet),
        )
}
