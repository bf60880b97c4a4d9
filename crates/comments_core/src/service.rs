//! CommentService: the comment lifecycle and user accounts.
//!
//! Takes port traits via `Arc<dyn ...>` so that the same logic runs against
//! Postgres or the in-memory store. Both transport adapters hold an
//! `Arc<dyn CommentService>` and do nothing but translate requests and results.
//!
//! Every operation opens exactly one unit of work. Content-changing operations
//! write the comment and its ledger entry inside it and commit once; read-only
//! operations drop it without committing.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    error::CommentsError,
    identity::Identity,
    ledger,
    policy::{self, Action},
    ports::{CredentialHasher, Store, UnitOfWork},
    types::*,
};

pub type Result<T> = std::result::Result<T, CommentsError>;

/// Registration payload. The password is hashed before it reaches the store.
#[derive(Debug, Clone)]
pub struct Registration {
    pub username: String,
    pub password: String,
    pub group: String,
}

/// Requested account changes; `None` leaves the field as is.
#[derive(Debug, Clone, Default)]
pub struct AccountUpdate {
    pub username: Option<String>,
    pub group: Option<String>,
    pub password: Option<String>,
}

// ── CommentService trait ──────────────────────────────────────

/// All methods that act on behalf of a user take `&Identity` explicitly.
#[async_trait]
pub trait CommentService: Send + Sync {
    // ── Accounts ──────────────────────────────────────────────

    async fn register(&self, registration: Registration) -> Result<User>;

    /// Verify credentials. Unknown user and bad password are indistinguishable.
    async fn authenticate(&self, username: &str, password: &str) -> Result<User>;

    /// Reload the actor for a verified token subject.
    async fn resolve_identity(&self, user_id: UserId) -> Result<Identity>;

    async fn list_users(&self, page: Page) -> Result<Vec<User>>;

    async fn get_user(&self, id: UserId) -> Result<User>;

    async fn update_user(&self, actor: &Identity, id: UserId, update: AccountUpdate)
        -> Result<User>;

    /// Delete an account together with its comments and their history.
    async fn delete_user(&self, actor: &Identity, id: UserId) -> Result<User>;

    // ── Comments ──────────────────────────────────────────────

    async fn create_comment(&self, actor: &Identity, content: &str) -> Result<OwnedComment>;

    async fn get_comment(&self, actor: &Identity, id: CommentId) -> Result<OwnedComment>;

    /// Comments visible to the actor's group, creation order.
    async fn list_comments(&self, actor: &Identity, page: Page) -> Result<Vec<OwnedComment>>;

    /// `None` or unchanged content is a no-op that returns the current state.
    async fn update_comment(
        &self,
        actor: &Identity,
        id: CommentId,
        content: Option<&str>,
    ) -> Result<OwnedComment>;

    /// Returns the comment as it was before deletion.
    async fn delete_comment(&self, actor: &Identity, id: CommentId) -> Result<OwnedComment>;

    // ── History ───────────────────────────────────────────────

    async fn list_history(
        &self,
        actor: &Identity,
        comment_id: CommentId,
        page: Page,
    ) -> Result<Vec<HistoryEntry>>;

    async fn get_history_entry(&self, actor: &Identity, id: HistoryEntryId)
        -> Result<HistoryEntry>;
}

// ── CommentServiceImpl ────────────────────────────────────────

pub struct CommentServiceImpl {
    pub store: Arc<dyn Store>,
    pub hasher: Arc<dyn CredentialHasher>,
}

impl CommentServiceImpl {
    pub fn new(store: Arc<dyn Store>, hasher: Arc<dyn CredentialHasher>) -> Self {
        Self { store, hasher }
    }
}

fn require_text(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(CommentsError::InvalidInput(format!("{field} must not be empty")));
    }
    Ok(())
}

fn comment_not_found(id: CommentId) -> CommentsError {
    CommentsError::NotFound(format!("comment {id}"))
}

/// Explicit owner fetch. A comment whose owner row cannot be loaded cannot be
/// evaluated by the policy; that is a store failure, not a denial.
async fn with_owner(tx: &mut dyn UnitOfWork, comment: Comment) -> Result<OwnedComment> {
    let owner = tx.get_user(comment.owner_user_id).await?.ok_or_else(|| {
        CommentsError::Persistence(anyhow::anyhow!(
            "owner {} of comment {} could not be loaded",
            comment.owner_user_id,
            comment.id
        ))
    })?;
    Ok(OwnedComment { comment, owner })
}

/// Load a comment and its owner, then gate it with `action`.
async fn load_authorized(
    tx: &mut dyn UnitOfWork,
    actor: &Identity,
    id: CommentId,
    action: Action,
    lock: bool,
) -> Result<OwnedComment> {
    let found = if lock {
        tx.lock_comment(id).await?
    } else {
        tx.get_comment(id).await?
    };
    let comment = found.ok_or_else(|| comment_not_found(id))?;
    let target = with_owner(tx, comment).await?;
    policy::ensure(actor, &target, &action)?;
    Ok(target)
}

impl CommentServiceImpl {
    /// Argon2 is CPU-bound; run it on the blocking pool.
    async fn hash_password(&self, password: &str) -> Result<String> {
        let hasher = Arc::clone(&self.hasher);
        let password = password.to_owned();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| {
                CommentsError::Persistence(anyhow::anyhow!("password hashing task failed: {e}"))
            })?
    }

    async fn verify_password(&self, password: &str, password_hash: &str) -> Result<bool> {
        let hasher = Arc::clone(&self.hasher);
        let password = password.to_owned();
        let password_hash = password_hash.to_owned();
        tokio::task::spawn_blocking(move || hasher.verify(&password, &password_hash))
            .await
            .map_err(|e| {
                CommentsError::Persistence(anyhow::anyhow!("password verification task failed: {e}"))
            })?
    }

    async fn ensure_username_free(
        tx: &mut dyn UnitOfWork,
        username: &str,
        except: Option<UserId>,
    ) -> Result<()> {
        match tx.find_credential(username).await? {
            Some(existing) if Some(existing.user.id) != except => Err(CommentsError::Conflict(
                "The user with this username already exists in the system.".into(),
            )),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl CommentService for CommentServiceImpl {
    async fn register(&self, registration: Registration) -> Result<User> {
        require_text("username", &registration.username)?;
        require_text("password", &registration.password)?;
        require_text("group", &registration.group)?;
        let password_hash = self.hash_password(&registration.password).await?;

        let mut tx = self.store.begin().await?;
        Self::ensure_username_free(&mut *tx, &registration.username, None).await?;
        let user = tx
            .insert_user(&NewUser {
                username: registration.username,
                group: registration.group,
                password_hash,
            })
            .await?;
        tx.commit().await?;
        tracing::info!(user = %user.id, group = %user.group, "user registered");
        Ok(user)
    }

    async fn authenticate(&self, username: &str, password: &str) -> Result<User> {
        let mut tx = self.store.begin().await?;
        let credential = tx.find_credential(username).await?;
        drop(tx);

        let rejected = || CommentsError::Unauthenticated("Incorrect username or password".into());
        let credential = credential.ok_or_else(rejected)?;
        if !self
            .verify_password(password, &credential.password_hash)
            .await?
        {
            tracing::debug!(username, "password mismatch");
            return Err(rejected());
        }
        Ok(credential.user)
    }

    async fn resolve_identity(&self, user_id: UserId) -> Result<Identity> {
        let mut tx = self.store.begin().await?;
        let user = tx.get_user(user_id).await?.ok_or_else(|| {
            CommentsError::Unauthenticated(format!("user {user_id} no longer exists"))
        })?;
        Ok(Identity::from(user))
    }

    async fn list_users(&self, page: Page) -> Result<Vec<User>> {
        let mut tx = self.store.begin().await?;
        tx.list_users(page).await
    }

    async fn get_user(&self, id: UserId) -> Result<User> {
        let mut tx = self.store.begin().await?;
        tx.get_user(id)
            .await?
            .ok_or_else(|| CommentsError::NotFound(format!("user {id}")))
    }

    async fn update_user(
        &self,
        actor: &Identity,
        id: UserId,
        update: AccountUpdate,
    ) -> Result<User> {
        // Hashed outside the unit of work; non-holders are rejected below.
        let password_hash = match &update.password {
            Some(password) if actor.id == id => {
                require_text("password", password)?;
                Some(self.hash_password(password).await?)
            }
            _ => None,
        };

        let mut tx = self.store.begin().await?;
        if tx.get_user(id).await?.is_none() {
            return Err(CommentsError::NotFound(format!("user {id}")));
        }
        policy::ensure_account(actor, id, &Action::Update)?;

        if let Some(username) = &update.username {
            require_text("username", username)?;
            Self::ensure_username_free(&mut *tx, username, Some(id)).await?;
        }
        if let Some(group) = &update.group {
            require_text("group", group)?;
        }
        let changes = UserChanges {
            username: update.username,
            group: update.group,
            password_hash,
        };
        let user = tx
            .update_user(id, &changes)
            .await?
            .ok_or_else(|| CommentsError::NotFound(format!("user {id}")))?;
        tx.commit().await?;
        tracing::info!(user = %id, "user updated");
        Ok(user)
    }

    async fn delete_user(&self, actor: &Identity, id: UserId) -> Result<User> {
        let mut tx = self.store.begin().await?;
        let user = tx
            .get_user(id)
            .await?
            .ok_or_else(|| CommentsError::NotFound(format!("user {id}")))?;
        policy::ensure_account(actor, id, &Action::Delete)?;
        tx.delete_user(id).await?;
        tx.commit().await?;
        tracing::info!(user = %id, "user deleted");
        Ok(user)
    }

    async fn create_comment(&self, actor: &Identity, content: &str) -> Result<OwnedComment> {
        require_text("content", content)?;

        let mut tx = self.store.begin().await?;
        let owner = tx
            .get_user(actor.id)
            .await?
            .ok_or_else(|| CommentsError::NotFound(format!("user {}", actor.id)))?;
        let comment = tx.insert_comment(owner.id, content).await?;
        ledger::record(&mut *tx, comment.id, None, &comment.content).await?;
        tx.commit().await?;

        tracing::info!(comment = %comment.id, owner = %owner.id, "comment created");
        Ok(OwnedComment { comment, owner })
    }

    async fn get_comment(&self, actor: &Identity, id: CommentId) -> Result<OwnedComment> {
        let mut tx = self.store.begin().await?;
        load_authorized(&mut *tx, actor, id, Action::Read, false).await
    }

    async fn list_comments(&self, actor: &Identity, page: Page) -> Result<Vec<OwnedComment>> {
        // The group filter is the read policy; no per-item check.
        let mut tx = self.store.begin().await?;
        tx.list_comments_by_group(&actor.group, page).await
    }

    async fn update_comment(
        &self,
        actor: &Identity,
        id: CommentId,
        content: Option<&str>,
    ) -> Result<OwnedComment> {
        let mut tx = self.store.begin().await?;
        let current = load_authorized(&mut *tx, actor, id, Action::Update, true).await?;

        let new_content = match content {
            None => return Ok(current),
            Some(new_content) => new_content,
        };
        require_text("content", new_content)?;
        if new_content == current.comment.content {
            tracing::debug!(comment = %id, "content unchanged; nothing recorded");
            return Ok(current);
        }

        let old_content = current.comment.content;
        let comment = tx.update_content(id, new_content).await?;
        ledger::record(&mut *tx, id, Some(&old_content), &comment.content).await?;
        tx.commit().await?;

        tracing::info!(comment = %id, "comment updated");
        Ok(OwnedComment {
            comment,
            owner: current.owner,
        })
    }

    async fn delete_comment(&self, actor: &Identity, id: CommentId) -> Result<OwnedComment> {
        let mut tx = self.store.begin().await?;
        let snapshot = load_authorized(&mut *tx, actor, id, Action::Delete, true).await?;
        tx.delete_comment(id).await?;
        tx.commit().await?;

        tracing::info!(comment = %id, "comment deleted");
        Ok(snapshot)
    }

    async fn list_history(
        &self,
        actor: &Identity,
        comment_id: CommentId,
        page: Page,
    ) -> Result<Vec<HistoryEntry>> {
        let mut tx = self.store.begin().await?;
        load_authorized(&mut *tx, actor, comment_id, Action::Read, false).await?;
        ledger::list_for_comment(&mut *tx, comment_id, page).await
    }

    async fn get_history_entry(
        &self,
        actor: &Identity,
        id: HistoryEntryId,
    ) -> Result<HistoryEntry> {
        let mut tx = self.store.begin().await?;
        let entry = ledger::get_entry(&mut *tx, id).await?;
        load_authorized(&mut *tx, actor, entry.comment_id, Action::Read, false).await?;
        Ok(entry)
    }
}
