use crate::{
    filter::{SnippetFilter, Visibility},
    models::{NewSnippet, Snippet, SnippetChanges, SnippetWithOwner, User},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, query_builder::QueryBuilder};
use std::{collections::HashMap, sync::Arc};
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Failures surfaced by a store. Handlers never show these to clients.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database query failed: {0}")]
    Query(#[from] sqlx::Error),
    #[error("owner {0} does not exist")]
    UnknownOwner(Uuid),
}

/// Repository Trait
///
/// The persistence contract the handlers work against. Each method is a single store
/// call; authorization decisions are made by the caller, not here.
///
/// **Send + Sync + async_trait** let the trait object (`Arc<dyn Repository>`) be shared
/// across Axum's task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Snippets matching the filter, newest first, each joined with its owner.
    async fn list_snippets(
        &self,
        filter: &SnippetFilter,
    ) -> Result<Vec<SnippetWithOwner>, RepositoryError>;

    async fn get_snippet(&self, id: Uuid) -> Result<Option<SnippetWithOwner>, RepositoryError>;

    async fn create_snippet(
        &self,
        owner: Uuid,
        snippet: NewSnippet,
    ) -> Result<SnippetWithOwner, RepositoryError>;

    /// Overwrites every mutable field. `None` when the snippet no longer exists.
    async fn update_snippet(
        &self,
        id: Uuid,
        changes: SnippetChanges,
    ) -> Result<Option<SnippetWithOwner>, RepositoryError>;

    /// Returns false when there was nothing to delete.
    async fn delete_snippet(&self, id: Uuid) -> Result<bool, RepositoryError>;

    // --- User/Auth ---
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, RepositoryError>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

// --- Postgres ---

/// Columns selected for every snippet read, with `s` the snippet row and `u` its owner.
const SNIPPET_COLUMNS: &str = "s.id, s.title, s.description, s.code, s.language, \
     s.is_public, s.tags, s.user_id, s.created_at, \
     u.name AS owner_name, u.email AS owner_email";

/// Flat row produced by the snippet/owner join.
#[derive(Debug, FromRow)]
struct SnippetRow {
    id: Uuid,
    title: String,
    description: Option<String>,
    code: String,
    language: String,
    is_public: bool,
    tags: Vec<String>,
    user_id: Uuid,
    created_at: DateTime<Utc>,
    owner_name: Option<String>,
    owner_email: String,
}

impl From<SnippetRow> for SnippetWithOwner {
    fn from(row: SnippetRow) -> Self {
        SnippetWithOwner {
            user: User {
                id: row.user_id,
                name: row.owner_name,
                email: row.owner_email,
            },
            snippet: Snippet {
                id: row.id,
                title: row.title,
                description: row.description,
                code: row.code,
                language: row.language,
                is_public: row.is_public,
                tags: row.tags,
                user_id: row.user_id,
                created_at: row.created_at,
            },
        }
    }
}

/// Escapes `LIKE` metacharacters so the search term is matched literally.
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

/// build_list_query
///
/// Translates a [`SnippetFilter`] into a parameterized query. The visibility group and
/// the search group are each wrapped in their own parentheses and joined with `AND`,
/// so a search match can never surface a snippet the caller is not allowed to see.
pub(crate) fn build_list_query(filter: &SnippetFilter) -> QueryBuilder<'static, Postgres> {
    let mut builder: QueryBuilder<'static, Postgres> = QueryBuilder::new(format!(
        "SELECT {SNIPPET_COLUMNS} FROM snippets s JOIN users u ON u.id = s.user_id WHERE "
    ));

    match filter.visibility {
        Visibility::PublicOnly | Visibility::PublicFallback => {
            builder.push("s.is_public = true");
        }
        Visibility::OwnerOrPublic(owner) => {
            builder.push("(s.user_id = ");
            builder.push_bind(owner);
            builder.push(" OR s.is_public = true)");
        }
    }

    if let Some(search) = &filter.search {
        let pattern = like_pattern(search);
        builder.push(" AND (s.title ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR s.description ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR s.code ILIKE ");
        builder.push_bind(pattern);
        builder.push(")");
    }

    if let Some(language) = &filter.language {
        builder.push(" AND s.language = ");
        builder.push_bind(language.clone());
    }

    if let Some(tag) = &filter.tag {
        builder.push(" AND ");
        builder.push_bind(tag.clone());
        builder.push(" = ANY(s.tags)");
    }

    builder.push(" ORDER BY s.created_at DESC");
    builder
}

/// PostgresRepository
///
/// The `Repository` implementation backed by PostgreSQL.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn list_snippets(
        &self,
        filter: &SnippetFilter,
    ) -> Result<Vec<SnippetWithOwner>, RepositoryError> {
        let mut builder = build_list_query(filter);
        let rows = builder
            .build_query_as::<SnippetRow>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(SnippetWithOwner::from).collect())
    }

    async fn get_snippet(&self, id: Uuid) -> Result<Option<SnippetWithOwner>, RepositoryError> {
        let sql = format!(
            "SELECT {SNIPPET_COLUMNS} FROM snippets s JOIN users u ON u.id = s.user_id WHERE s.id = $1"
        );
        let row = sqlx::query_as::<_, SnippetRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(SnippetWithOwner::from))
    }

    /// Inserts and joins the owner in one round trip through a CTE.
    async fn create_snippet(
        &self,
        owner: Uuid,
        snippet: NewSnippet,
    ) -> Result<SnippetWithOwner, RepositoryError> {
        let sql = format!(
            r#"
            WITH inserted AS (
                INSERT INTO snippets (id, title, description, code, language, is_public, tags, user_id, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW())
                RETURNING *
            )
            SELECT {SNIPPET_COLUMNS} FROM inserted s JOIN users u ON u.id = s.user_id
            "#
        );
        let row = sqlx::query_as::<_, SnippetRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(snippet.title)
            .bind(snippet.description)
            .bind(snippet.code)
            .bind(snippet.language)
            .bind(snippet.is_public)
            .bind(snippet.tags)
            .bind(owner)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.into())
    }

    async fn update_snippet(
        &self,
        id: Uuid,
        changes: SnippetChanges,
    ) -> Result<Option<SnippetWithOwner>, RepositoryError> {
        let sql = format!(
            r#"
            WITH updated AS (
                UPDATE snippets
                SET title = $2, description = $3, code = $4,
                    language = $5, is_public = $6, tags = $7
                WHERE id = $1
                RETURNING *
            )
            SELECT {SNIPPET_COLUMNS} FROM updated s JOIN users u ON u.id = s.user_id
            "#
        );
        let row = sqlx::query_as::<_, SnippetRow>(&sql)
            .bind(id)
            .bind(changes.title)
            .bind(changes.description)
            .bind(changes.code)
            .bind(changes.language)
            .bind(changes.is_public)
            .bind(changes.tags)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(SnippetWithOwner::from))
    }

    async fn delete_snippet(&self, id: Uuid) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM snippets WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>("SELECT id, name, email FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }
}

// --- In-memory ---

/// InMemoryRepository
///
/// A process-local store implementing the same contract, used by the test suite and
/// for running the service without a database. Listing applies
/// [`SnippetFilter::matches`]; snippets whose owner is unknown are dropped from reads,
/// mirroring the inner join of the SQL store.
#[derive(Default)]
pub struct InMemoryRepository {
    users: RwLock<HashMap<Uuid, User>>,
    snippets: RwLock<Vec<Snippet>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_user(&self, user: User) {
        self.users.write().await.insert(user.id, user);
    }

    /// Stores a snippet as given, including its id and timestamp.
    pub async fn insert_snippet(&self, snippet: Snippet) {
        self.snippets.write().await.push(snippet);
    }

    /// Raw stored record, without the owner join.
    pub async fn snippet(&self, id: Uuid) -> Option<Snippet> {
        self.snippets
            .read()
            .await
            .iter()
            .find(|s| s.id == id)
            .cloned()
    }

    pub async fn snippet_count(&self) -> usize {
        self.snippets.read().await.len()
    }

    fn join(users: &HashMap<Uuid, User>, snippet: &Snippet) -> Option<SnippetWithOwner> {
        users.get(&snippet.user_id).map(|user| SnippetWithOwner {
            snippet: snippet.clone(),
            user: user.clone(),
        })
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn list_snippets(
        &self,
        filter: &SnippetFilter,
    ) -> Result<Vec<SnippetWithOwner>, RepositoryError> {
        let users = self.users.read().await;
        let snippets = self.snippets.read().await;

        let mut found: Vec<SnippetWithOwner> = snippets
            .iter()
            .filter(|s| filter.matches(s))
            .filter_map(|s| Self::join(&users, s))
            .collect();
        found.sort_by(|a, b| b.snippet.created_at.cmp(&a.snippet.created_at));
        Ok(found)
    }

    async fn get_snippet(&self, id: Uuid) -> Result<Option<SnippetWithOwner>, RepositoryError> {
        let users = self.users.read().await;
        let snippets = self.snippets.read().await;
        Ok(snippets
            .iter()
            .find(|s| s.id == id)
            .and_then(|s| Self::join(&users, s)))
    }

    async fn create_snippet(
        &self,
        owner: Uuid,
        snippet: NewSnippet,
    ) -> Result<SnippetWithOwner, RepositoryError> {
        let users = self.users.read().await;
        let user = users
            .get(&owner)
            .cloned()
            .ok_or(RepositoryError::UnknownOwner(owner))?;

        let stored = Snippet {
            id: Uuid::new_v4(),
            title: snippet.title,
            description: snippet.description,
            code: snippet.code,
            language: snippet.language,
            is_public: snippet.is_public,
            tags: snippet.tags,
            user_id: owner,
            created_at: Utc::now(),
        };
        self.snippets.write().await.push(stored.clone());

        Ok(SnippetWithOwner {
            snippet: stored,
            user,
        })
    }

    async fn update_snippet(
        &self,
        id: Uuid,
        changes: SnippetChanges,
    ) -> Result<Option<SnippetWithOwner>, RepositoryError> {
        let users = self.users.read().await;
        let mut snippets = self.snippets.write().await;
        let Some(stored) = snippets.iter_mut().find(|s| s.id == id) else {
            return Ok(None);
        };

        stored.title = changes.title;
        stored.description = changes.description;
        stored.code = changes.code;
        stored.language = changes.language;
        stored.is_public = changes.is_public;
        stored.tags = changes.tags;

        Ok(Self::join(&users, stored))
    }

    async fn delete_snippet(&self, id: Uuid) -> Result<bool, RepositoryError> {
        let mut snippets = self.snippets.write().await;
        let before = snippets.len();
        snippets.retain(|s| s.id != id);
        Ok(snippets.len() < before)
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, RepositoryError> {
        Ok(self.users.read().await.get(&id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(visibility: Visibility) -> SnippetFilter {
        SnippetFilter {
            search: None,
            language: None,
            tag: None,
            visibility,
        }
    }

    #[test]
    fn public_listing_has_no_owner_clause() {
        let builder = build_list_query(&filter(Visibility::PublicOnly));
        let sql = builder.sql();
        assert!(sql.contains("WHERE s.is_public = true ORDER BY s.created_at DESC"));
        assert!(!sql.contains("s.user_id ="));
    }

    #[test]
    fn owner_and_search_groups_stay_separate() {
        let mut f = filter(Visibility::OwnerOrPublic(Uuid::from_u128(7)));
        f.search = Some("sort".to_string());
        let builder = build_list_query(&f);

        assert!(builder.sql().contains(
            "WHERE (s.user_id = $1 OR s.is_public = true) \
             AND (s.title ILIKE $2 OR s.description ILIKE $3 OR s.code ILIKE $4)"
        ));
    }

    #[test]
    fn language_and_tag_are_bound_parameters() {
        let mut f = filter(Visibility::PublicFallback);
        f.language = Some("go".to_string());
        f.tag = Some("x".to_string());
        let builder = build_list_query(&f);

        assert!(
            builder
                .sql()
                .contains("AND s.language = $1 AND $2 = ANY(s.tags) ORDER BY")
        );
    }

    #[test]
    fn like_metacharacters_are_escaped() {
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(like_pattern(r"C:\dir"), r"%C:\\dir%");
    }
}
