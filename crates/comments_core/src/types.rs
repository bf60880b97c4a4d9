//! Domain types shared by the lifecycle, the ledger and the storage ports.
//!
//! These carry no serialization attributes; each transport adapter owns its
//! own DTOs and converts from these at the boundary.

use chrono::{DateTime, Utc};

macro_rules! id_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub i64);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(v: i64) -> Self {
                Self(v)
            }
        }
    };
}

id_newtype!(
    /// Identity of a registered user.
    UserId
);
id_newtype!(
    /// Identity of a comment.
    CommentId
);
id_newtype!(
    /// Identity of a history entry. Increases in creation order.
    HistoryEntryId
);

// ── Users ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub group: String,
}

/// A user row together with its stored credential. Never leaves the core.
#[derive(Debug, Clone)]
pub struct UserCredential {
    pub user: User,
    pub password_hash: String,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub group: String,
    pub password_hash: String,
}

/// Partial update of a user account. `None` leaves the field untouched.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub username: Option<String>,
    pub group: Option<String>,
    pub password_hash: Option<String>,
}

impl UserChanges {
    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.group.is_none() && self.password_hash.is_none()
    }
}

// ── Comments ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub id: CommentId,
    pub content: String,
    pub owner_user_id: UserId,
    pub created_at: DateTime<Utc>,
    /// Set only when the content actually changed.
    pub updated_at: Option<DateTime<Utc>>,
}

/// A comment with its owner resolved. This is what the permission policy
/// evaluates and what both adapters render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnedComment {
    pub comment: Comment,
    pub owner: User,
}

// ── History ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub id: HistoryEntryId,
    pub comment_id: CommentId,
    pub timestamp: DateTime<Utc>,
    /// `None` marks the creation event.
    pub old_value: Option<String>,
    pub new_value: String,
}

// ── Pagination ────────────────────────────────────────────────

pub const DEFAULT_PAGE_LIMIT: u32 = 100;

/// Zero-based offset plus maximum count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub offset: u32,
    pub limit: u32,
}

impl Page {
    pub fn new(offset: Option<u32>, limit: Option<u32>) -> Self {
        Self {
            offset: offset.unwrap_or(0),
            limit: limit.unwrap_or(DEFAULT_PAGE_LIMIT),
        }
    }

    /// Apply this page to an already ordered iterator.
    pub fn slice<T>(&self, items: impl IntoIterator<Item = T>) -> Vec<T> {
        items
            .into_iter()
            .skip(self.offset as usize)
            .take(self.limit as usize)
            .collect()
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(None, None)
    }
}
