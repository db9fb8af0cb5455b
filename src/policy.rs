use uuid::Uuid;

use crate::{auth::AuthUser, error::ApiError, models::Snippet};

/// What the caller wants to do with a snippet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    Write,
}

/// can_access
///
/// The single ownership and visibility rule shared by the item handlers.
/// Public snippets are readable by anyone; only the owner may write, public or not.
pub fn can_access(snippet: &Snippet, caller: Option<Uuid>, action: Action) -> bool {
    let is_owner = caller.is_some_and(|id| id == snippet.user_id);
    match action {
        Action::Read => snippet.is_public || is_owner,
        Action::Write => is_owner,
    }
}

/// Same rule as [`can_access`], surfaced as the `Forbidden` error handlers return.
pub fn authorize(
    snippet: &Snippet,
    caller: Option<&AuthUser>,
    action: Action,
) -> Result<(), ApiError> {
    if can_access(snippet, caller.map(|user| user.id), action) {
        Ok(())
    } else {
        Err(ApiError::Forbidden)
    }
}
