//! History ledger: append-only record of every content change.
//!
//! Writes happen inside the caller's unit of work so that a comment write and
//! its ledger entry commit or roll back together. Reads do not authorize; the
//! lifecycle runs `policy::ensure(.., Action::Read)` on the parent comment first.

use crate::error::CommentsError;
use crate::ports::{HistoryStore, Result};
use crate::types::{CommentId, HistoryEntry, HistoryEntryId, Page};

/// Append an entry. `old_value = None` marks the creation event.
pub async fn record<S>(
    store: &mut S,
    comment_id: CommentId,
    old_value: Option<&str>,
    new_value: &str,
) -> Result<HistoryEntry>
where
    S: HistoryStore + ?Sized,
{
    if new_value.is_empty() {
        return Err(CommentsError::InvalidInput(
            "history entry requires a new value".into(),
        ));
    }
    let entry = store
        .append_history(comment_id, old_value, new_value)
        .await?;
    tracing::debug!(
        comment = %comment_id,
        entry = %entry.id,
        creation = old_value.is_none(),
        "history entry recorded"
    );
    Ok(entry)
}

/// Entries for a comment in creation order, paginated.
pub async fn list_for_comment<S>(
    store: &mut S,
    comment_id: CommentId,
    page: Page,
) -> Result<Vec<HistoryEntry>>
where
    S: HistoryStore + ?Sized,
{
    store.list_history(comment_id, page).await
}

pub async fn get_entry<S>(store: &mut S, id: HistoryEntryId) -> Result<HistoryEntry>
where
    S: HistoryStore + ?Sized,
{
    store
        .get_history_entry(id)
        .await?
        .ok_or_else(|| CommentsError::NotFound(format!("history entry {id}")))
}
