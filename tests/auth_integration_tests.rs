use axum::{
    extract::FromRequestParts,
    http::{Method, Request, Uri, header, request::Parts},
};
use jsonwebtoken::{EncodingKey, Header, encode};
use snippet_share::{
    AppState, InMemoryRepository,
    auth::{AuthUser, Claims, MaybeAuthUser},
    config::{AppConfig, Env},
    error::ApiError,
    models::User,
};
use std::{sync::Arc, time::SystemTime};
use uuid::Uuid;

// --- Helper Functions ---

const TEST_JWT_SECRET: &str = "test-secret-value-1234567890";
const TEST_USER_ID: Uuid = Uuid::from_u128(1);

fn now() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

fn create_token(user_id: Uuid, exp: u64, secret: &str) -> String {
    let claims = Claims {
        sub: user_id,
        iat: now() as usize,
        exp: exp as usize,
    };
    let key = EncodingKey::from_secret(secret.as_bytes());
    encode(&Header::default(), &claims, &key).unwrap()
}

fn valid_token(user_id: Uuid) -> String {
    create_token(user_id, now() + 3600, TEST_JWT_SECRET)
}

fn test_user() -> User {
    User {
        id: TEST_USER_ID,
        name: Some("Test User".to_string()),
        email: "test@example.com".to_string(),
    }
}

async fn create_app_state(env: Env, users: Vec<User>) -> AppState {
    let repo = InMemoryRepository::new();
    for user in users {
        repo.insert_user(user).await;
    }

    let mut config = AppConfig::default();
    config.env = env;
    config.jwt_secret = TEST_JWT_SECRET.to_string();

    AppState {
        repo: Arc::new(repo),
        config,
    }
}

fn get_request_parts(method: Method, uri: Uri) -> Parts {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap();
    let (parts, _) = request.into_parts();
    parts
}

fn parts_with_bearer(token: &str) -> Parts {
    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    parts.headers.insert(
        header::AUTHORIZATION,
        header::HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
    );
    parts
}

fn parts_with_bypass(user_id: Uuid) -> Parts {
    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    parts.headers.insert(
        header::HeaderName::from_static("x-user-id"),
        header::HeaderValue::from_str(&user_id.to_string()).unwrap(),
    );
    parts
}

// --- Tests ---

#[tokio::test]
async fn test_auth_success_with_valid_jwt() {
    let app_state = create_app_state(Env::Production, vec![test_user()]).await;
    let mut parts = parts_with_bearer(&valid_token(TEST_USER_ID));

    let user = AuthUser::from_request_parts(&mut parts, &app_state)
        .await
        .unwrap();

    assert_eq!(user.id, TEST_USER_ID);
    assert_eq!(user.email, "test@example.com");
    assert_eq!(user.name.as_deref(), Some("Test User"));
}

#[tokio::test]
async fn test_auth_failure_with_missing_header() {
    let app_state = create_app_state(Env::Production, vec![test_user()]).await;
    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());

    let auth_user = AuthUser::from_request_parts(&mut parts, &app_state).await;

    assert_eq!(auth_user.unwrap_err(), ApiError::Unauthorized);
}

#[tokio::test]
async fn test_auth_failure_with_non_bearer_scheme() {
    let app_state = create_app_state(Env::Production, vec![test_user()]).await;
    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    parts.headers.insert(
        header::AUTHORIZATION,
        header::HeaderValue::from_static("Basic dXNlcjpwYXNz"),
    );

    let auth_user = AuthUser::from_request_parts(&mut parts, &app_state).await;

    assert_eq!(auth_user.unwrap_err(), ApiError::Unauthorized);
}

#[tokio::test]
async fn test_auth_failure_with_expired_jwt() {
    let app_state = create_app_state(Env::Production, vec![test_user()]).await;
    // Well past the validator's default leeway.
    let token = create_token(TEST_USER_ID, now() - 3600, TEST_JWT_SECRET);
    let mut parts = parts_with_bearer(&token);

    let auth_user = AuthUser::from_request_parts(&mut parts, &app_state).await;

    assert_eq!(auth_user.unwrap_err(), ApiError::Unauthorized);
}

#[tokio::test]
async fn test_auth_failure_with_wrong_secret() {
    let app_state = create_app_state(Env::Production, vec![test_user()]).await;
    let token = create_token(TEST_USER_ID, now() + 3600, "some-other-secret");
    let mut parts = parts_with_bearer(&token);

    let auth_user = AuthUser::from_request_parts(&mut parts, &app_state).await;

    assert_eq!(auth_user.unwrap_err(), ApiError::Unauthorized);
}

#[tokio::test]
async fn test_auth_failure_for_deleted_user() {
    // Token is valid but the user no longer exists.
    let app_state = create_app_state(Env::Production, vec![]).await;
    let mut parts = parts_with_bearer(&valid_token(TEST_USER_ID));

    let auth_user = AuthUser::from_request_parts(&mut parts, &app_state).await;

    assert_eq!(auth_user.unwrap_err(), ApiError::Unauthorized);
}

#[tokio::test]
async fn test_local_bypass_success() {
    let app_state = create_app_state(Env::Local, vec![test_user()]).await;
    let mut parts = parts_with_bypass(TEST_USER_ID);

    let user = AuthUser::from_request_parts(&mut parts, &app_state)
        .await
        .unwrap();

    assert_eq!(user.id, TEST_USER_ID);
}

#[tokio::test]
async fn test_local_bypass_unknown_user_falls_through() {
    let app_state = create_app_state(Env::Local, vec![test_user()]).await;
    let mut parts = parts_with_bypass(Uuid::new_v4());

    let auth_user = AuthUser::from_request_parts(&mut parts, &app_state).await;

    assert_eq!(auth_user.unwrap_err(), ApiError::Unauthorized);
}

#[tokio::test]
async fn test_local_bypass_disabled_in_prod() {
    let app_state = create_app_state(Env::Production, vec![test_user()]).await;
    let mut parts = parts_with_bypass(TEST_USER_ID);

    let auth_user = AuthUser::from_request_parts(&mut parts, &app_state).await;

    assert_eq!(auth_user.unwrap_err(), ApiError::Unauthorized);
}

#[tokio::test]
async fn test_optional_identity_never_rejects() {
    let app_state = create_app_state(Env::Production, vec![test_user()]).await;

    let mut anonymous = get_request_parts(Method::GET, "/".parse().unwrap());
    let MaybeAuthUser(caller) = MaybeAuthUser::from_request_parts(&mut anonymous, &app_state)
        .await
        .unwrap();
    assert!(caller.is_none());

    let mut garbage = parts_with_bearer("not-a-jwt");
    let MaybeAuthUser(caller) = MaybeAuthUser::from_request_parts(&mut garbage, &app_state)
        .await
        .unwrap();
    assert!(caller.is_none());

    let mut signed_in = parts_with_bearer(&valid_token(TEST_USER_ID));
    let MaybeAuthUser(caller) = MaybeAuthUser::from_request_parts(&mut signed_in, &app_state)
        .await
        .unwrap();
    assert_eq!(caller.map(|user| user.id), Some(TEST_USER_ID));
}

#[tokio::test]
async fn test_already_resolved_user_skips_lookup() {
    // No users in the store and no credentials: only the extension can satisfy this.
    let app_state = create_app_state(Env::Production, vec![]).await;
    let mut parts = get_request_parts(Method::PUT, "/snippets".parse().unwrap());
    let resolved = AuthUser::from(test_user());
    parts.extensions.insert(resolved.clone());

    let user = AuthUser::from_request_parts(&mut parts, &app_state)
        .await
        .unwrap();

    assert_eq!(user, resolved);
}
