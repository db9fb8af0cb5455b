use crate::{
    AppState,
    auth::{AuthUser, MaybeAuthUser},
    error::ApiError,
    filter::{ListSnippetsQuery, SnippetFilter},
    models::{
        CreateSnippetRequest, DeleteSnippetResponse, ErrorResponse, SnippetWithOwner,
        UpdateSnippetRequest,
    },
    policy::{Action, authorize},
};
use axum::{
    Json,
    extract::{FromRequest, Path, State},
    http::StatusCode,
};
use uuid::Uuid;

/// AppJson
///
/// `Json` body extractor whose rejection renders as an `ApiError`, so malformed bodies
/// get the same `{ "error" }` shape as every other failure.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct AppJson<T>(pub T);

/// Snippet ids are opaque to clients. Anything that is not a UUID cannot name a stored
/// snippet and is reported as missing.
fn parse_snippet_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::NotFound)
}

// --- Collection Handlers ---

/// list_snippets
///
/// [Public Route] Lists the snippets the caller may see, newest first.
///
/// *Visibility*: `public=true` restricts to public snippets; otherwise an authenticated
/// caller sees their own plus public ones, and an anonymous caller sees public ones.
/// Search, language and tag narrow the result further.
#[utoipa::path(
    get,
    path = "/snippets",
    params(ListSnippetsQuery),
    responses(
        (status = 200, description = "Matching snippets", body = [SnippetWithOwner]),
        (status = 500, description = "Store failure", body = ErrorResponse)
    )
)]
pub async fn list_snippets(
    MaybeAuthUser(caller): MaybeAuthUser,
    State(state): State<AppState>,
    query: ListSnippetsQuery,
) -> Result<Json<Vec<SnippetWithOwner>>, ApiError> {
    let filter = SnippetFilter::new(query, caller.as_ref());
    let snippets = state
        .repo
        .list_snippets(&filter)
        .await
        .map_err(|e| ApiError::internal("Failed to fetch snippets", e))?;
    Ok(Json(snippets))
}

/// create_snippet
///
/// [Authenticated Route] Stores a new snippet owned by the caller.
/// `isPublic` defaults to false and `tags` to an empty list.
#[utoipa::path(
    post,
    path = "/snippets",
    request_body = CreateSnippetRequest,
    responses(
        (status = 201, description = "Created", body = SnippetWithOwner),
        (status = 400, description = "Missing title, code or language", body = ErrorResponse),
        (status = 401, description = "No session", body = ErrorResponse),
        (status = 500, description = "Store failure", body = ErrorResponse)
    )
)]
pub async fn create_snippet(
    user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateSnippetRequest>,
) -> Result<(StatusCode, Json<SnippetWithOwner>), ApiError> {
    let snippet = payload
        .validate()
        .map_err(|message| ApiError::Validation(message.to_string()))?;

    let created = state
        .repo
        .create_snippet(user.id, snippet)
        .await
        .map_err(|e| ApiError::internal("Failed to create snippet", e))?;

    tracing::info!(snippet_id = %created.snippet.id, user_id = %user.id, "snippet created");
    Ok((StatusCode::CREATED, Json(created)))
}

// --- Item Handlers ---

/// get_snippet
///
/// [Public Route] Retrieves one snippet. Existence is checked before visibility, so a
/// private snippet answers 403 to strangers while a missing one answers 404.
#[utoipa::path(
    get,
    path = "/snippets/{id}",
    params(("id" = String, Path, description = "Snippet ID")),
    responses(
        (status = 200, description = "Found", body = SnippetWithOwner),
        (status = 403, description = "Private and not owned by the caller", body = ErrorResponse),
        (status = 404, description = "Not Found", body = ErrorResponse),
        (status = 500, description = "Store failure", body = ErrorResponse)
    )
)]
pub async fn get_snippet(
    MaybeAuthUser(caller): MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SnippetWithOwner>, ApiError> {
    let id = parse_snippet_id(&id)?;
    let found = state
        .repo
        .get_snippet(id)
        .await
        .map_err(|e| ApiError::internal("Failed to fetch snippet", e))?
        .ok_or(ApiError::NotFound)?;

    authorize(&found.snippet, caller.as_ref(), Action::Read)?;
    Ok(Json(found))
}

/// update_snippet
///
/// [Authenticated Route] Replaces every mutable field of a snippet the caller owns.
///
/// *Order*: 401 without a session, then 404 for a missing snippet, then 403 for a
/// non-owner, then 400 for a body that is malformed or lacks title, code or language.
#[utoipa::path(
    put,
    path = "/snippets/{id}",
    params(("id" = String, Path, description = "Snippet ID")),
    request_body = UpdateSnippetRequest,
    responses(
        (status = 200, description = "Updated", body = SnippetWithOwner),
        (status = 400, description = "Missing title, code or language", body = ErrorResponse),
        (status = 401, description = "No session", body = ErrorResponse),
        (status = 403, description = "Not Owner", body = ErrorResponse),
        (status = 404, description = "Not Found", body = ErrorResponse),
        (status = 500, description = "Store failure", body = ErrorResponse)
    )
)]
pub async fn update_snippet(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<AppJson<UpdateSnippetRequest>, ApiError>,
) -> Result<Json<SnippetWithOwner>, ApiError> {
    const FAILED: &str = "Failed to update snippet";

    let id = parse_snippet_id(&id)?;
    let existing = state
        .repo
        .get_snippet(id)
        .await
        .map_err(|e| ApiError::internal(FAILED, e))?
        .ok_or(ApiError::NotFound)?;

    if let Err(e) = authorize(&existing.snippet, Some(&user), Action::Write) {
        tracing::warn!(snippet_id = %id, user_id = %user.id, "update rejected: not the owner");
        return Err(e);
    }

    // Body errors, malformed JSON included, only surface once the caller owns the snippet.
    let AppJson(payload) = payload?;
    let changes = payload
        .into_changes()
        .map_err(|message| ApiError::Validation(message.to_string()))?;

    // The snippet may have been deleted since the existence check.
    let updated = state
        .repo
        .update_snippet(id, changes)
        .await
        .map_err(|e| ApiError::internal(FAILED, e))?
        .ok_or(ApiError::NotFound)?;

    Ok(Json(updated))
}

/// delete_snippet
///
/// [Authenticated Route] Permanently removes a snippet the caller owns.
/// Same authorization order as `update_snippet`.
#[utoipa::path(
    delete,
    path = "/snippets/{id}",
    params(("id" = String, Path, description = "Snippet ID")),
    responses(
        (status = 200, description = "Deleted", body = DeleteSnippetResponse),
        (status = 401, description = "No session", body = ErrorResponse),
        (status = 403, description = "Not Owner", body = ErrorResponse),
        (status = 404, description = "Not Found", body = ErrorResponse),
        (status = 500, description = "Store failure", body = ErrorResponse)
    )
)]
pub async fn delete_snippet(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteSnippetResponse>, ApiError> {
    const FAILED: &str = "Failed to delete snippet";

    let id = parse_snippet_id(&id)?;
    let existing = state
        .repo
        .get_snippet(id)
        .await
        .map_err(|e| ApiError::internal(FAILED, e))?
        .ok_or(ApiError::NotFound)?;

    if let Err(e) = authorize(&existing.snippet, Some(&user), Action::Write) {
        tracing::warn!(snippet_id = %id, user_id = %user.id, "delete rejected: not the owner");
        return Err(e);
    }

    let deleted = state
        .repo
        .delete_snippet(id)
        .await
        .map_err(|e| ApiError::internal(FAILED, e))?;
    if !deleted {
        return Err(ApiError::NotFound);
    }

    tracing::info!(snippet_id = %id, user_id = %user.id, "snippet deleted");
    Ok(Json(DeleteSnippetResponse {
        message: "Snippet deleted".to_string(),
    }))
}
