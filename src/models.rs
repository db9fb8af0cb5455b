use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// The owner projection attached to every snippet returned by the API, and the
/// identity record resolved during authentication (`users` table).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct User {
    pub id: Uuid,
    // Display name is optional upstream; the identity provider may not supply one.
    pub name: Option<String>,
    pub email: String,
}

/// Snippet
///
/// A stored unit of code text with its metadata, as held in the `snippets` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Snippet {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub code: String,
    // Free-form label; the server never checks it against a list of languages.
    pub language: String,
    pub is_public: bool,
    pub tags: Vec<String>,
    // Owner. Fixed at creation.
    pub user_id: Uuid,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// SnippetWithOwner
///
/// Response shape for every snippet endpoint: the snippet fields at the top level
/// plus a nested `user` object holding the owner projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct SnippetWithOwner {
    #[serde(flatten)]
    pub snippet: Snippet,
    pub user: User,
}

// --- Request Payloads (Input Schemas) ---

/// CreateSnippetRequest
///
/// Input payload for `POST /snippets`. Every field is optional at the wire level so
/// that a missing required field surfaces as a validation error instead of a
/// deserialization rejection.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreateSnippetRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub code: Option<String>,
    pub language: Option<String>,
    pub is_public: Option<bool>,
    pub tags: Option<Vec<String>>,
}

/// UpdateSnippetRequest
///
/// Input payload for `PUT /snippets/{id}`. This is a full replacement: fields that are
/// absent are written as cleared values (see [`SnippetChanges`]), never merged with
/// the stored record.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UpdateSnippetRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub code: Option<String>,
    pub language: Option<String>,
    pub is_public: Option<bool>,
    pub tags: Option<Vec<String>>,
}

/// DeleteSnippetResponse
///
/// Confirmation body returned by `DELETE /snippets/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct DeleteSnippetResponse {
    pub message: String,
}

/// ErrorResponse
///
/// Body of every non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ErrorResponse {
    pub error: String,
}

// --- Validated Domain Inputs (Repository Layer) ---

/// NewSnippet
///
/// A create payload that has passed validation. Defaults are already applied.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSnippet {
    pub title: String,
    pub description: Option<String>,
    pub code: String,
    pub language: String,
    pub is_public: bool,
    pub tags: Vec<String>,
}

/// SnippetChanges
///
/// The complete set of mutable fields written by an update. `user_id`, `id` and
/// `created_at` are not part of it.
#[derive(Debug, Clone, PartialEq)]
pub struct SnippetChanges {
    pub title: String,
    pub description: Option<String>,
    pub code: String,
    pub language: String,
    pub is_public: bool,
    pub tags: Vec<String>,
}

pub const REQUIRED_FIELDS_MESSAGE: &str = "Title, code, and language are required";

/// Returns the value when it is present and non-empty.
fn required(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

impl CreateSnippetRequest {
    /// Checks the required fields and applies the `isPublic = false` and `tags = []`
    /// defaults.
    pub fn validate(self) -> Result<NewSnippet, &'static str> {
        let (Some(title), Some(code), Some(language)) = (
            required(self.title),
            required(self.code),
            required(self.language),
        ) else {
            return Err(REQUIRED_FIELDS_MESSAGE);
        };

        Ok(NewSnippet {
            title,
            description: self.description,
            code,
            language,
            is_public: self.is_public.unwrap_or(false),
            tags: self.tags.unwrap_or_default(),
        })
    }
}

impl UpdateSnippetRequest {
    /// Builds the replacement record. Omitted optional fields are cleared; the
    /// required fields cannot be cleared and are rejected instead.
    pub fn into_changes(self) -> Result<SnippetChanges, &'static str> {
        let (Some(title), Some(code), Some(language)) = (
            required(self.title),
            required(self.code),
            required(self.language),
        ) else {
            return Err(REQUIRED_FIELDS_MESSAGE);
        };

        Ok(SnippetChanges {
            title,
            description: self.description,
            code,
            language,
            is_public: self.is_public.unwrap_or(false),
            tags: self.tags.unwrap_or_default(),
        })
    }
}
