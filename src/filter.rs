use std::convert::Infallible;

use axum::{
    extract::{FromRequestParts, Query},
    http::request::Parts,
};
use uuid::Uuid;

use crate::{auth::AuthUser, models::Snippet};

/// ListSnippetsQuery
///
/// Raw query parameters accepted by `GET /snippets`, turned into a [`SnippetFilter`]
/// before it reaches the repository.
///
/// Extraction never rejects: a repeated key keeps its first value and unknown keys are
/// ignored, so a listing only ever answers 200 or 500.
#[derive(Debug, Clone, Default, PartialEq, Eq, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListSnippetsQuery {
    /// Case-insensitive substring matched against title, description and code.
    pub search: Option<String>,
    /// Exact language label.
    pub language: Option<String>,
    /// Exact tag that must be present in the snippet's tag list.
    pub tag: Option<String>,
    /// Only the literal value `"true"` restricts the listing to public snippets.
    pub public: Option<String>,
}

impl ListSnippetsQuery {
    /// Folds decoded `key=value` pairs into the query, first value wins.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut query = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "search" => &mut query.search,
                "language" => &mut query.language,
                "tag" => &mut query.tag,
                "public" => &mut query.public,
                _ => continue,
            };
            slot.get_or_insert(value);
        }
        query
    }
}

impl<S> FromRequestParts<S> for ListSnippetsQuery
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let pairs = match Query::<Vec<(String, String)>>::try_from_uri(&parts.uri) {
            Ok(Query(pairs)) => pairs,
            Err(e) => {
                tracing::debug!(error = %e, "unreadable query string, listing unfiltered");
                Vec::new()
            }
        };
        Ok(Self::from_pairs(pairs))
    }
}

/// Which snippets the caller may see in a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// `public=true` was requested, whoever the caller is.
    PublicOnly,
    /// Authenticated caller: their own snippets plus every public one.
    OwnerOrPublic(Uuid),
    /// Anonymous caller without the flag.
    PublicFallback,
}

impl Visibility {
    pub fn allows(&self, snippet: &Snippet) -> bool {
        match self {
            Visibility::PublicOnly | Visibility::PublicFallback => snippet.is_public,
            Visibility::OwnerOrPublic(owner) => snippet.is_public || snippet.user_id == *owner,
        }
    }
}

/// SnippetFilter
///
/// The typed predicate for a listing. Evaluated as
/// `visibility AND search AND language AND tag`, where the visibility and search
/// groups are each a disjunction kept intact inside the conjunction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnippetFilter {
    pub search: Option<String>,
    pub language: Option<String>,
    pub tag: Option<String>,
    pub visibility: Visibility,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

impl SnippetFilter {
    /// Builds the filter from the query string and the resolved caller, if any.
    pub fn new(query: ListSnippetsQuery, caller: Option<&AuthUser>) -> Self {
        let visibility = if query.public.as_deref() == Some("true") {
            Visibility::PublicOnly
        } else if let Some(user) = caller {
            Visibility::OwnerOrPublic(user.id)
        } else {
            Visibility::PublicFallback
        };

        Self {
            search: non_empty(query.search),
            language: non_empty(query.language),
            tag: non_empty(query.tag),
            visibility,
        }
    }

    /// In-process evaluation of the filter, used by stores without a query engine.
    pub fn matches(&self, snippet: &Snippet) -> bool {
        if !self.visibility.allows(snippet) {
            return false;
        }

        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            let hit = snippet.title.to_lowercase().contains(&needle)
                || snippet
                    .description
                    .as_deref()
                    .is_some_and(|d| d.to_lowercase().contains(&needle))
                || snippet.code.to_lowercase().contains(&needle);
            if !hit {
                return false;
            }
        }

        if let Some(language) = &self.language {
            if snippet.language != *language {
                return false;
            }
        }

        if let Some(tag) = &self.tag {
            if !snippet.tags.iter().any(|t| t == tag) {
                return false;
            }
        }

        true
    }
}
