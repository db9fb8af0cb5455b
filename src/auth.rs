use std::convert::Infallible;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::{AppConfig, Env},
    error::ApiError,
    models::User,
    repository::RepositoryState,
};

/// Claims
///
/// Payload expected inside the bearer JWT issued by the external session provider.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the user's UUID, looked up in the `users` table.
    pub sub: Uuid,
    /// Expiration Time (exp): tokens past this instant are rejected.
    pub exp: usize,
    /// Issued At (iat).
    pub iat: usize,
}

/// AuthUser
///
/// The resolved caller identity for a request. Handlers use `id` for every ownership
/// decision; `email` and `name` are carried along for logging and display.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
}

impl From<User> for AuthUser {
    fn from(user: User) -> Self {
        AuthUser {
            id: user.id,
            email: user.email,
            name: user.name,
        }
    }
}

/// Looks the user up, treating a store failure the same as an unknown user.
async fn resolve_user(repo: &RepositoryState, id: Uuid) -> Option<AuthUser> {
    match repo.get_user(id).await {
        Ok(user) => user.map(AuthUser::from),
        Err(e) => {
            tracing::error!(error = %e, user_id = %id, "identity lookup failed");
            None
        }
    }
}

/// AuthUser Extractor Implementation
///
/// Resolution order:
/// 0. Already resolved: an `AuthUser` placed in the request extensions by the auth
///    middleware is reused as is.
/// 1. Local bypass: in `Env::Local` an `x-user-id` header naming an existing user is
///    accepted without a token.
/// 2. Bearer token: `Authorization: Bearer <jwt>`, HS256 with the configured secret,
///    expiry enforced.
/// 3. User lookup: the `sub` claim must still name an existing user.
///
/// Rejection: `ApiError::Unauthorized` (401, `{"error":"Unauthorized"}`) on any failure.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(user.clone());
        }

        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        // Development bypass. Falls through to the JWT flow when the header is absent,
        // malformed, or names an unknown user.
        if config.env == Env::Local {
            let bypass_id = parts
                .headers
                .get("x-user-id")
                .and_then(|value| value.to_str().ok())
                .and_then(|value| Uuid::parse_str(value).ok());
            if let Some(user_id) = bypass_id {
                if let Some(user) = resolve_user(&repo, user_id).await {
                    return Ok(user);
                }
            }
        }

        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or(ApiError::Unauthorized)?;

        let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
        let mut validation = Validation::default();
        validation.validate_exp = true;

        let token_data = decode::<Claims>(token, &decoding_key, &validation).map_err(|e| {
            tracing::debug!(error = %e, "rejected bearer token");
            ApiError::Unauthorized
        })?;

        // A valid token for a user that no longer exists is still rejected.
        resolve_user(&repo, token_data.claims.sub)
            .await
            .ok_or(ApiError::Unauthorized)
    }
}

/// MaybeAuthUser
///
/// Optional identity for routes open to anonymous callers. Never rejects: any
/// authentication failure simply yields `None`.
#[derive(Debug, Clone)]
pub struct MaybeAuthUser(pub Option<AuthUser>);

impl<S> FromRequestParts<S> for MaybeAuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeAuthUser(
            AuthUser::from_request_parts(parts, state).await.ok(),
        ))
    }
}
