//! Row types for `sqlx::query_as`, converted into core types at the edge.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use comments_core::types::*;

#[derive(Debug, FromRow)]
pub struct PgUserRow {
    pub id: i64,
    pub username: String,
    pub group_name: String,
}

impl From<PgUserRow> for User {
    fn from(r: PgUserRow) -> Self {
        User {
            id: UserId(r.id),
            username: r.username,
            group: r.group_name,
        }
    }
}

#[derive(Debug, FromRow)]
pub struct PgCredentialRow {
    pub id: i64,
    pub username: String,
    pub group_name: String,
    pub password_hash: String,
}

impl From<PgCredentialRow> for UserCredential {
    fn from(r: PgCredentialRow) -> Self {
        UserCredential {
            user: User {
                id: UserId(r.id),
                username: r.username,
                group: r.group_name,
            },
            password_hash: r.password_hash,
        }
    }
}

#[derive(Debug, FromRow)]
pub struct PgCommentRow {
    pub id: i64,
    pub content: String,
    pub owner_user_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<PgCommentRow> for Comment {
    fn from(r: PgCommentRow) -> Self {
        Comment {
            id: CommentId(r.id),
            content: r.content,
            owner_user_id: UserId(r.owner_user_id),
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

/// A comment joined with its owner's user row.
#[derive(Debug, FromRow)]
pub struct PgOwnedCommentRow {
    pub id: i64,
    pub content: String,
    pub owner_user_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub owner_username: String,
    pub owner_group: String,
}

impl From<PgOwnedCommentRow> for OwnedComment {
    fn from(r: PgOwnedCommentRow) -> Self {
        OwnedComment {
            owner: User {
                id: UserId(r.owner_user_id),
                username: r.owner_username,
                group: r.owner_group,
            },
            comment: Comment {
                id: CommentId(r.id),
                content: r.content,
                owner_user_id: UserId(r.owner_user_id),
                created_at: r.created_at,
                updated_at: r.updated_at,
            },
        }
    }
}

#[derive(Debug, FromRow)]
pub struct PgHistoryRow {
    pub id: i64,
    pub comment_id: i64,
    pub timestamp: DateTime<Utc>,
    pub old_value: Option<String>,
    pub new_value: String,
}

impl From<PgHistoryRow> for HistoryEntry {
    fn from(r: PgHistoryRow) -> Self {
        HistoryEntry {
            id: HistoryEntryId(r.id),
            comment_id: CommentId(r.comment_id),
            timestamp: r.timestamp,
            old_value: r.old_value,
            new_value: r.new_value,
        }
    }
}
