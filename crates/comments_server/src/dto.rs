//! Wire types for the REST adapter (snake_case JSON).

use chrono::{DateTime, Utc};
use comments_core::types::{HistoryEntry, OwnedComment, Page, User};
use serde::{Deserialize, Serialize};

// ── Requests ──────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub group: String,
}

/// OAuth2 password-grant style form body.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct UserUpdateRequest {
    pub username: Option<String>,
    pub group: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CommentCreateRequest {
    pub content: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct CommentUpdateRequest {
    pub content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub skip: Option<u32>,
    pub limit: Option<u32>,
}

impl PageQuery {
    pub fn page(&self) -> Page {
        Page::new(self.skip, self.limit)
    }
}

// ── Responses ─────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub group: String,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            id: u.id.0,
            username: u.username,
            group: u.group,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CommentResponse {
    pub id: i64,
    pub content: String,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub user: UserResponse,
}

impl From<OwnedComment> for CommentResponse {
    fn from(oc: OwnedComment) -> Self {
        Self {
            id: oc.comment.id.0,
            content: oc.comment.content,
            user_id: oc.comment.owner_user_id.0,
            created_at: oc.comment.created_at,
            updated_at: oc.comment.updated_at,
            user: oc.owner.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub id: i64,
    pub comment_id: i64,
    pub timestamp: DateTime<Utc>,
    pub old_value: Option<String>,
    pub new_value: String,
}

impl From<HistoryEntry> for HistoryResponse {
    fn from(e: HistoryEntry) -> Self {
        Self {
            id: e.id.0,
            comment_id: e.comment_id.0,
            timestamp: e.timestamp,
            old_value: e.old_value,
            new_value: e.new_value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use comments_core::types::{Comment, CommentId, UserId};

    #[test]
    fn comment_response_embeds_owner() {
        let owner = User {
            id: UserId(3),
            username: "carol".into(),
            group: "g2".into(),
        };
        let owned = OwnedComment {
            comment: Comment {
                id: CommentId(9),
                content: "hi".into(),
                owner_user_id: owner.id,
                created_at: Utc::now(),
                updated_at: None,
            },
            owner,
        };
        let json = serde_json::to_value(CommentResponse::from(owned)).unwrap();
        assert_eq!(json["user_id"], 3);
        assert_eq!(json["user"]["group"], "g2");
        assert!(json["updated_at"].is_null());
    }

    #[test]
    fn page_query_defaults() {
        let page = PageQuery::default().page();
        assert_eq!(page, Page::default());
    }
}
