//! GraphQL adapter.
//!
//! Same lifecycle as the REST handlers, different wire shape (camelCase).
//! The resolved [`Identity`], when present, is attached to each request as
//! schema data; every resolver except `createUser` requires it.

use std::sync::Arc;

use async_graphql::{
    Context, EmptySubscription, ErrorExtensions, InputObject, Object, Schema, SimpleObject,
};
use axum::{Extension, Json};
use chrono::{DateTime, Utc};
use comments_core::{
    error::CommentsError,
    identity::Identity,
    service::{CommentService, Registration},
    types::{CommentId, HistoryEntry, OwnedComment, Page, User},
};

pub type CommentsSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

pub fn build_schema(service: Arc<dyn CommentService>) -> CommentsSchema {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .data(service)
        .finish()
}

/// POST /graphql
pub async fn graphql_handler(
    Extension(schema): Extension<CommentsSchema>,
    identity: Option<Extension<Identity>>,
    Json(request): Json<async_graphql::Request>,
) -> Json<async_graphql::Response> {
    let request = match identity {
        Some(Extension(identity)) => request.data(identity),
        None => request,
    };
    Json(schema.execute(request).await)
}

// ── Output types ──────────────────────────────────────────────

#[derive(SimpleObject)]
#[graphql(name = "User")]
pub struct UserType {
    pub id: i64,
    pub username: String,
    pub group: String,
}

impl From<User> for UserType {
    fn from(u: User) -> Self {
        Self {
            id: u.id.0,
            username: u.username,
            group: u.group,
        }
    }
}

#[derive(SimpleObject)]
#[graphql(name = "Comment")]
pub struct CommentType {
    pub id: i64,
    pub content: String,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub user: UserType,
}

impl From<OwnedComment> for CommentType {
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

#[derive(SimpleObject)]
#[graphql(name = "CommentHistory")]
pub struct CommentHistoryType {
    pub id: i64,
    pub comment_id: i64,
    pub timestamp: DateTime<Utc>,
    pub old_value: Option<String>,
    pub new_value: String,
}

impl From<HistoryEntry> for CommentHistoryType {
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

// ── Inputs ────────────────────────────────────────────────────

#[derive(InputObject)]
pub struct UserInput {
    pub username: String,
    pub password: String,
    pub group: String,
}

#[derive(InputObject)]
pub struct CommentInput {
    pub content: String,
}

#[derive(InputObject)]
pub struct CommentUpdateInput {
    pub content: Option<String>,
}

// ── Error mapping ─────────────────────────────────────────────

fn gql_error(e: CommentsError) -> async_graphql::Error {
    let message = match &e {
        CommentsError::Persistence(inner) => {
            tracing::error!(error = %inner, "persistence failure");
            "Internal server error".to_string()
        }
        other => other.to_string(),
    };
    let code = e.code();
    async_graphql::Error::new(message).extend_with(|_, ext| ext.set("code", code))
}

fn service<'a>(ctx: &Context<'a>) -> async_graphql::Result<&'a Arc<dyn CommentService>> {
    ctx.data::<Arc<dyn CommentService>>()
}

fn actor<'a>(ctx: &Context<'a>) -> async_graphql::Result<&'a Identity> {
    ctx.data_opt::<Identity>()
        .ok_or_else(|| gql_error(CommentsError::Unauthenticated("Not authenticated".into())))
}

// ── Roots ─────────────────────────────────────────────────────

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    async fn users(
        &self,
        ctx: &Context<'_>,
        skip: Option<u32>,
        limit: Option<u32>,
    ) -> async_graphql::Result<Vec<UserType>> {
        actor(ctx)?;
        let users = service(ctx)?
            .list_users(Page::new(skip, limit))
            .await
            .map_err(gql_error)?;
        Ok(users.into_iter().map(Into::into).collect())
    }

    /// Comments visible to the caller's group.
    async fn comments(
        &self,
        ctx: &Context<'_>,
        skip: Option<u32>,
        limit: Option<u32>,
    ) -> async_graphql::Result<Vec<CommentType>> {
        let identity = actor(ctx)?;
        let comments = service(ctx)?
            .list_comments(identity, Page::new(skip, limit))
            .await
            .map_err(gql_error)?;
        Ok(comments.into_iter().map(Into::into).collect())
    }

    async fn comment(&self, ctx: &Context<'_>, id: i64) -> async_graphql::Result<CommentType> {
        let identity = actor(ctx)?;
        let comment = service(ctx)?
            .get_comment(identity, CommentId(id))
            .await
            .map_err(gql_error)?;
        Ok(comment.into())
    }

    async fn comment_history(
        &self,
        ctx: &Context<'_>,
        comment_id: i64,
        skip: Option<u32>,
        limit: Option<u32>,
    ) -> async_graphql::Result<Vec<CommentHistoryType>> {
        let identity = actor(ctx)?;
        let entries = service(ctx)?
            .list_history(identity, CommentId(comment_id), Page::new(skip, limit))
            .await
            .map_err(gql_error)?;
        Ok(entries.into_iter().map(Into::into).collect())
    }
}

pub struct MutationRoot;

#[Object]
impl MutationRoot {
    /// Public: registers a new account.
    async fn create_user(
        &self,
        ctx: &Context<'_>,
        input: UserInput,
    ) -> async_graphql::Result<UserType> {
        let user = service(ctx)?
            .register(Registration {
                username: input.username,
                password: input.password,
                group: input.group,
            })
            .await
            .map_err(gql_error)?;
        Ok(user.into())
    }

    async fn create_comment(
        &self,
        ctx: &Context<'_>,
        input: CommentInput,
    ) -> async_graphql::Result<CommentType> {
        let identity = actor(ctx)?;
        let created = service(ctx)?
            .create_comment(identity, &input.content)
            .await
            .map_err(gql_error)?;
        Ok(created.into())
    }

    async fn update_comment(
        &self,
        ctx: &Context<'_>,
        comment_id: i64,
        input: CommentUpdateInput,
    ) -> async_graphql::Result<CommentType> {
        let identity = actor(ctx)?;
        let updated = service(ctx)?
            .update_comment(identity, CommentId(comment_id), input.content.as_deref())
            .await
            .map_err(gql_error)?;
        Ok(updated.into())
    }

    /// Returns the comment as it was before deletion.
    async fn delete_comment(
        &self,
        ctx: &Context<'_>,
        comment_id: i64,
    ) -> async_graphql::Result<CommentType> {
        let identity = actor(ctx)?;
        let snapshot = service(ctx)?
            .delete_comment(identity, CommentId(comment_id))
            .await
            .map_err(gql_error)?;
        Ok(snapshot.into())
    }
}
