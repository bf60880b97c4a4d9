//! Postgres implementation of the core storage ports.
//!
//! `PgStore` wraps a PgPool; every unit of work is one sqlx transaction. All
//! SQL is runtime-checked (sqlx::query_as, not sqlx::query!) to avoid a
//! compile-time DB requirement.

use anyhow::anyhow;
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};

use comments_core::error::CommentsError;
use comments_core::ports::{CommentStore, HistoryStore, Result, Store, UnitOfWork, UserStore};
use comments_core::types::*;

use crate::sqlx_types::{
    PgCommentRow, PgCredentialRow, PgHistoryRow, PgOwnedCommentRow, PgUserRow,
};

/// Map a driver error, surfacing unique-key races as conflicts.
fn db_err(e: sqlx::Error) -> CommentsError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return CommentsError::Conflict(
                "The user with this username already exists in the system.".into(),
            );
        }
    }
    CommentsError::Persistence(anyhow!(e))
}

fn limit_offset(page: Page) -> (i64, i64) {
    (i64::from(page.limit), i64::from(page.offset))
}

// ── PgStore ───────────────────────────────────────────────────

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply the bundled schema migrations.
    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        tracing::info!("database migrations applied");
        Ok(())
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>> {
        let tx = self.pool.begin().await.map_err(|e| anyhow!(e))?;
        Ok(Box::new(PgUnitOfWork { tx }))
    }
}

// ── PgUnitOfWork ──────────────────────────────────────────────

/// A live transaction. Dropping it without `commit` rolls back.
pub struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await.map_err(|e| anyhow!(e))?;
        Ok(())
    }
}

#[async_trait]
impl UserStore for PgUnitOfWork {
    async fn insert_user(&mut self, new_user: &NewUser) -> Result<User> {
        let row = sqlx::query_as::<_, PgUserRow>(
            r#"
            INSERT INTO users (username, group_name, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, username, group_name
            "#,
        )
        .bind(&new_user.username)
        .bind(&new_user.group)
        .bind(&new_user.password_hash)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(db_err)?;
        Ok(row.into())
    }

    async fn get_user(&mut self, id: UserId) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, PgUserRow>(
            "SELECT id, username, group_name FROM users WHERE id = $1",
        )
        .bind(id.0)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| anyhow!(e))?;
        Ok(row.map(Into::into))
    }

    async fn find_credential(&mut self, username: &str) -> Result<Option<UserCredential>> {
        let row = sqlx::query_as::<_, PgCredentialRow>(
            r#"
            SELECT id, username, group_name, password_hash
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| anyhow!(e))?;
        Ok(row.map(Into::into))
    }

    async fn list_users(&mut self, page: Page) -> Result<Vec<User>> {
        let (limit, offset) = limit_offset(page);
        let rows = sqlx::query_as::<_, PgUserRow>(
            r#"
            SELECT id, username, group_name
            FROM users
            ORDER BY id
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| anyhow!(e))?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn update_user(&mut self, id: UserId, changes: &UserChanges) -> Result<Option<User>> {
        if changes.is_empty() {
            return self.get_user(id).await;
        }
        let row = sqlx::query_as::<_, PgUserRow>(
            r#"
            UPDATE users
            SET username      = COALESCE($2, username),
                group_name    = COALESCE($3, group_name),
                password_hash = COALESCE($4, password_hash)
            WHERE id = $1
            RETURNING id, username, group_name
            "#,
        )
        .bind(id.0)
        .bind(changes.username.as_deref())
        .bind(changes.group.as_deref())
        .bind(changes.password_hash.as_deref())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_err)?;
        Ok(row.map(Into::into))
    }

    async fn delete_user(&mut self, id: UserId) -> Result<()> {
        // comments and comment_history follow via ON DELETE CASCADE
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id.0)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| anyhow!(e))?;
        Ok(())
    }
}

#[async_trait]
impl CommentStore for PgUnitOfWork {
    async fn insert_comment(&mut self, owner: UserId, content: &str) -> Result<Comment> {
        let row = sqlx::query_as::<_, PgCommentRow>(
            r#"
            INSERT INTO comments (content, owner_user_id)
            VALUES ($1, $2)
            RETURNING id, content, owner_user_id, created_at, updated_at
            "#,
        )
        .bind(content)
        .bind(owner.0)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| anyhow!(e))?;
        Ok(row.into())
    }

    async fn get_comment(&mut self, id: CommentId) -> Result<Option<Comment>> {
        let row = sqlx::query_as::<_, PgCommentRow>(
            r#"
            SELECT id, content, owner_user_id, created_at, updated_at
            FROM comments
            WHERE id = $1
            "#,
        )
        .bind(id.0)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| anyhow!(e))?;
        Ok(row.map(Into::into))
    }

    async fn lock_comment(&mut self, id: CommentId) -> Result<Option<Comment>> {
        let row = sqlx::query_as::<_, PgCommentRow>(
            r#"
            SELECT id, content, owner_user_id, created_at, updated_at
            FROM comments
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id.0)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| anyhow!(e))?;
        Ok(row.map(Into::into))
    }

    async fn list_comments_by_group(
        &mut self,
        group: &str,
        page: Page,
    ) -> Result<Vec<OwnedComment>> {
        let (limit, offset) = limit_offset(page);
        let rows = sqlx::query_as::<_, PgOwnedCommentRow>(
            r#"
            SELECT c.id, c.content, c.owner_user_id, c.created_at, c.updated_at,
                   u.username AS owner_username, u.group_name AS owner_group
            FROM comments c
            JOIN users u ON u.id = c.owner_user_id
            WHERE u.group_name = $1
            ORDER BY c.id
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(group)
        .bind(limit)
        .bind(offset)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| anyhow!(e))?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn update_content(&mut self, id: CommentId, content: &str) -> Result<Comment> {
        let row = sqlx::query_as::<_, PgCommentRow>(
            r#"
            UPDATE comments
            SET content = $2, updated_at = clock_timestamp()
            WHERE id = $1
            RETURNING id, content, owner_user_id, created_at, updated_at
            "#,
        )
        .bind(id.0)
        .bind(content)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| anyhow!(e))?;
        row.map(Into::into)
            .ok_or_else(|| CommentsError::Persistence(anyhow!("comment {id} vanished during update")))
    }

    async fn delete_comment(&mut self, id: CommentId) -> Result<()> {
        sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id.0)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| anyhow!(e))?;
        Ok(())
    }
}

#[async_trait]
impl HistoryStore for PgUnitOfWork {
    async fn append_history(
        &mut self,
        comment_id: CommentId,
        old_value: Option<&str>,
        new_value: &str,
    ) -> Result<HistoryEntry> {
        let row = sqlx::query_as::<_, PgHistoryRow>(
            r#"
            INSERT INTO comment_history (comment_id, old_value, new_value)
            VALUES ($1, $2, $3)
            RETURNING id, comment_id, "timestamp", old_value, new_value
            "#,
        )
        .bind(comment_id.0)
        .bind(old_value)
        .bind(new_value)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| anyhow!(e))?;
        Ok(row.into())
    }

    async fn list_history(
        &mut self,
        comment_id: CommentId,
        page: Page,
    ) -> Result<Vec<HistoryEntry>> {
        let (limit, offset) = limit_offset(page);
        let rows = sqlx::query_as::<_, PgHistoryRow>(
            r#"
            SELECT id, comment_id, "timestamp", old_value, new_value
            FROM comment_history
            WHERE comment_id = $1
            ORDER BY id
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(comment_id.0)
        .bind(limit)
        .bind(offset)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| anyhow!(e))?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn get_history_entry(&mut self, id: HistoryEntryId) -> Result<Option<HistoryEntry>> {
        let row = sqlx::query_as::<_, PgHistoryRow>(
            r#"
            SELECT id, comment_id, "timestamp", old_value, new_value
            FROM comment_history
            WHERE id = $1
            "#,
        )
        .bind(id.0)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| anyhow!(e))?;
        Ok(row.map(Into::into))
    }
}
