//! In-memory implementation of the storage ports.
//!
//! Used by the test suites and by `serve --in-memory`. A unit of work holds an
//! owned lock on the shared state for its whole lifetime and edits a private
//! copy; `commit` swaps the copy in, dropping discards it. Units of work are
//! therefore fully serialized.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::ports::{CommentStore, HistoryStore, Result, Store, UnitOfWork, UserStore};
use crate::types::*;

#[derive(Debug, Clone)]
struct UserRow {
    user: User,
    password_hash: String,
}

#[derive(Debug, Clone, Default)]
struct State {
    users: BTreeMap<UserId, UserRow>,
    comments: BTreeMap<CommentId, Comment>,
    history: BTreeMap<HistoryEntryId, HistoryEntry>,
    next_user_id: i64,
    next_comment_id: i64,
    next_history_id: i64,
    last_timestamp: Option<DateTime<Utc>>,
}

impl State {
    /// Wall-clock time, nudged forward so that successive calls strictly increase.
    fn tick(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let ts = match self.last_timestamp {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last_timestamp = Some(ts);
        ts
    }

    fn username_taken(&self, username: &str, except: Option<UserId>) -> bool {
        self.users
            .values()
            .any(|row| row.user.username == username && Some(row.user.id) != except)
    }

    fn remove_comment(&mut self, id: CommentId) {
        self.comments.remove(&id);
        self.history.retain(|_, entry| entry.comment_id != id);
    }
}

#[derive(Debug, Default)]
struct Faults {
    fail_history_writes: AtomicBool,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
    faults: Arc<Faults>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent history append fail, to exercise rollback paths.
    pub fn fail_history_writes(&self, fail: bool) {
        self.faults
            .fail_history_writes
            .store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryUnitOfWork {
            guard,
            working,
            faults: Arc::clone(&self.faults),
        }))
    }
}

pub struct MemoryUnitOfWork {
    guard: OwnedMutexGuard<State>,
    working: State,
    faults: Arc<Faults>,
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn commit(self: Box<Self>) -> Result<()> {
        let MemoryUnitOfWork {
            mut guard, working, ..
        } = *self;
        *guard = working;
        Ok(())
    }
}

#[async_trait]
impl UserStore for MemoryUnitOfWork {
    async fn insert_user(&mut self, new_user: &NewUser) -> Result<User> {
        let state = &mut self.working;
        if state.username_taken(&new_user.username, None) {
            return Err(anyhow!(
                "duplicate key value violates unique constraint \"users_username_key\""
            )
            .into());
        }
        state.next_user_id += 1;
        let user = User {
            id: UserId(state.next_user_id),
            username: new_user.username.clone(),
            group: new_user.group.clone(),
        };
        state.users.insert(
            user.id,
            UserRow {
                user: user.clone(),
                password_hash: new_user.password_hash.clone(),
            },
        );
        Ok(user)
    }

    async fn get_user(&mut self, id: UserId) -> Result<Option<User>> {
        Ok(self.working.users.get(&id).map(|row| row.user.clone()))
    }

    async fn find_credential(&mut self, username: &str) -> Result<Option<UserCredential>> {
        Ok(self
            .working
            .users
            .values()
            .find(|row| row.user.username == username)
            .map(|row| UserCredential {
                user: row.user.clone(),
                password_hash: row.password_hash.clone(),
            }))
    }

    async fn list_users(&mut self, page: Page) -> Result<Vec<User>> {
        Ok(page.slice(self.working.users.values().map(|row| row.user.clone())))
    }

    async fn update_user(&mut self, id: UserId, changes: &UserChanges) -> Result<Option<User>> {
        if let Some(username) = &changes.username {
            if self.working.username_taken(username, Some(id)) {
                return Err(anyhow!(
                    "duplicate key value violates unique constraint \"users_username_key\""
                )
                .into());
            }
        }
        let Some(row) = self.working.users.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(username) = &changes.username {
            row.user.username = username.clone();
        }
        if let Some(group) = &changes.group {
            row.user.group = group.clone();
        }
        if let Some(hash) = &changes.password_hash {
            row.password_hash = hash.clone();
        }
        Ok(Some(row.user.clone()))
    }

    async fn delete_user(&mut self, id: UserId) -> Result<()> {
        let owned: Vec<CommentId> = self
            .working
            .comments
            .values()
            .filter(|c| c.owner_user_id == id)
            .map(|c| c.id)
            .collect();
        for comment_id in owned {
            self.working.remove_comment(comment_id);
        }
        self.working.users.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl CommentStore for MemoryUnitOfWork {
    async fn insert_comment(&mut self, owner: UserId, content: &str) -> Result<Comment> {
        let state = &mut self.working;
        if !state.users.contains_key(&owner) {
            return Err(anyhow!("comments_owner_user_id_fkey: user {owner} does not exist").into());
        }
        state.next_comment_id += 1;
        let comment = Comment {
            id: CommentId(state.next_comment_id),
            content: content.to_string(),
            owner_user_id: owner,
            created_at: state.tick(),
            updated_at: None,
        };
        state.comments.insert(comment.id, comment.clone());
        Ok(comment)
    }

    async fn get_comment(&mut self, id: CommentId) -> Result<Option<Comment>> {
        Ok(self.working.comments.get(&id).cloned())
    }

    async fn lock_comment(&mut self, id: CommentId) -> Result<Option<Comment>> {
        // The unit of work already holds the store-wide lock.
        self.get_comment(id).await
    }

    async fn list_comments_by_group(
        &mut self,
        group: &str,
        page: Page,
    ) -> Result<Vec<OwnedComment>> {
        let users = &self.working.users;
        let matching = self.working.comments.values().filter_map(|comment| {
            users
                .get(&comment.owner_user_id)
                .filter(|row| row.user.group == group)
                .map(|row| OwnedComment {
                    comment: comment.clone(),
                    owner: row.user.clone(),
                })
        });
        Ok(page.slice(matching))
    }

    async fn update_content(&mut self, id: CommentId, content: &str) -> Result<Comment> {
        let ts = self.working.tick();
        let comment = self
            .working
            .comments
            .get_mut(&id)
            .ok_or_else(|| anyhow!("comment {id} vanished during update"))?;
        comment.content = content.to_string();
        comment.updated_at = Some(ts);
        Ok(comment.clone())
    }

    async fn delete_comment(&mut self, id: CommentId) -> Result<()> {
        self.working.remove_comment(id);
        Ok(())
    }
}

#[async_trait]
impl HistoryStore for MemoryUnitOfWork {
    async fn append_history(
        &mut self,
        comment_id: CommentId,
        old_value: Option<&str>,
        new_value: &str,
    ) -> Result<HistoryEntry> {
        if self.faults.fail_history_writes.load(Ordering::SeqCst) {
            return Err(anyhow!("injected failure: history write rejected").into());
        }
        let state = &mut self.working;
        if !state.comments.contains_key(&comment_id) {
            return Err(
                anyhow!("comment_history_comment_id_fkey: comment {comment_id} does not exist")
                    .into(),
            );
        }
        state.next_history_id += 1;
        let entry = HistoryEntry {
            id: HistoryEntryId(state.next_history_id),
            comment_id,
            timestamp: state.tick(),
            old_value: old_value.map(str::to_string),
            new_value: new_value.to_string(),
        };
        state.history.insert(entry.id, entry.clone());
        Ok(entry)
    }

    async fn list_history(
        &mut self,
        comment_id: CommentId,
        page: Page,
    ) -> Result<Vec<HistoryEntry>> {
        Ok(page.slice(
            self.working
                .history
                .values()
                .filter(|e| e.comment_id == comment_id)
                .cloned(),
        ))
    }

    async fn get_history_entry(&mut self, id: HistoryEntryId) -> Result<Option<HistoryEntry>> {
        Ok(self.working.history.get(&id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CommentsError;

    fn new_user(name: &str, group: &str) -> NewUser {
        NewUser {
            username: name.into(),
            group: group.into(),
            password_hash: "hash".into(),
        }
    }

    #[tokio::test]
    async fn uncommitted_work_is_discarded() {
        let store = MemoryStore::new();
        {
            let mut tx = store.begin().await.unwrap();
            tx.insert_user(&new_user("alice", "g1")).await.unwrap();
        }
        let mut tx = store.begin().await.unwrap();
        assert!(tx.find_credential("alice").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn committed_work_is_visible() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let user = tx.insert_user(&new_user("alice", "g1")).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        assert_eq!(tx.get_user(user.id).await.unwrap(), Some(user));
    }

    #[tokio::test]
    async fn duplicate_username_is_a_persistence_error() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        tx.insert_user(&new_user("alice", "g1")).await.unwrap();
        let err = tx.insert_user(&new_user("alice", "g2")).await.unwrap_err();
        assert!(matches!(err, CommentsError::Persistence(_)));
    }

    #[tokio::test]
    async fn deleting_comment_cascades_history() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let user = tx.insert_user(&new_user("alice", "g1")).await.unwrap();
        let comment = tx.insert_comment(user.id, "hi").await.unwrap();
        let entry = tx.append_history(comment.id, None, "hi").await.unwrap();
        tx.delete_comment(comment.id).await.unwrap();
        assert!(tx.get_history_entry(entry.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn deleting_user_cascades_comments() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let user = tx.insert_user(&new_user("alice", "g1")).await.unwrap();
        let comment = tx.insert_comment(user.id, "hi").await.unwrap();
        tx.delete_user(user.id).await.unwrap();
        assert!(tx.get_comment(comment.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn history_requires_live_comment() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let err = tx
            .append_history(CommentId(1), None, "orphan")
            .await
            .unwrap_err();
        assert!(matches!(err, CommentsError::Persistence(_)));
    }

    #[tokio::test]
    async fn group_listing_joins_owner() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let a = tx.insert_user(&new_user("a", "g1")).await.unwrap();
        let b = tx.insert_user(&new_user("b", "g2")).await.unwrap();
        tx.insert_comment(a.id, "from a").await.unwrap();
        tx.insert_comment(b.id, "from b").await.unwrap();
        let listed = tx.list_comments_by_group("g1", Page::default()).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].owner, a);
    }
}
