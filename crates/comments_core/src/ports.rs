//! Storage and credential port traits.
//! Implemented by comments_postgres and `memory`: core logic depends only on these traits.
//!
//! All reads and writes of one lifecycle operation go through a single
//! `UnitOfWork`. Nothing is visible to other requests until `commit`; a unit of
//! work dropped without committing rolls back.

use async_trait::async_trait;

use crate::error::CommentsError;
use crate::types::*;

pub type Result<T> = std::result::Result<T, CommentsError>;

#[async_trait]
pub trait UserStore: Send {
    /// Insert a user. A duplicate username surfaces as a persistence error.
    async fn insert_user(&mut self, new_user: &NewUser) -> Result<User>;

    async fn get_user(&mut self, id: UserId) -> Result<Option<User>>;

    /// Look a user up by username, including the stored credential.
    async fn find_credential(&mut self, username: &str) -> Result<Option<UserCredential>>;

    /// Users in ascending id order.
    async fn list_users(&mut self, page: Page) -> Result<Vec<User>>;

    /// Apply `changes` and return the updated user, or `None` if absent.
    async fn update_user(&mut self, id: UserId, changes: &UserChanges) -> Result<Option<User>>;

    /// Delete a user together with their comments and those comments' history.
    async fn delete_user(&mut self, id: UserId) -> Result<()>;
}

#[async_trait]
pub trait CommentStore: Send {
    async fn insert_comment(&mut self, owner: UserId, content: &str) -> Result<Comment>;

    async fn get_comment(&mut self, id: CommentId) -> Result<Option<Comment>>;

    /// Load a comment and hold it against concurrent writers until the unit of
    /// work ends.
    async fn lock_comment(&mut self, id: CommentId) -> Result<Option<Comment>>;

    /// Comments whose owner belongs to `group`, ascending id.
    async fn list_comments_by_group(&mut self, group: &str, page: Page)
        -> Result<Vec<OwnedComment>>;

    /// Replace the content and stamp `updated_at`.
    async fn update_content(&mut self, id: CommentId, content: &str) -> Result<Comment>;

    /// Remove the comment. Its history goes with it.
    async fn delete_comment(&mut self, id: CommentId) -> Result<()>;
}

#[async_trait]
pub trait HistoryStore: Send {
    /// Append an entry; the store assigns id and timestamp.
    async fn append_history(
        &mut self,
        comment_id: CommentId,
        old_value: Option<&str>,
        new_value: &str,
    ) -> Result<HistoryEntry>;

    /// Entries for a comment in creation order.
    async fn list_history(&mut self, comment_id: CommentId, page: Page)
        -> Result<Vec<HistoryEntry>>;

    async fn get_history_entry(&mut self, id: HistoryEntryId) -> Result<Option<HistoryEntry>>;
}

/// One transaction against the store.
#[async_trait]
pub trait UnitOfWork: UserStore + CommentStore + HistoryStore {
    async fn commit(self: Box<Self>) -> Result<()>;
}

/// Store handle shared across requests.
#[async_trait]
pub trait Store: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>>;
}

/// Password hashing, supplied by the authentication provider.
pub trait CredentialHasher: Send + Sync {
    fn hash(&self, password: &str) -> Result<String>;

    fn verify(&self, password: &str, password_hash: &str) -> Result<bool>;
}
