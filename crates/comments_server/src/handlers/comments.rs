//! Comment handlers (authenticated).
//!
//! POST   /api/v1/comments      create a comment owned by the caller
//! GET    /api/v1/comments      comments visible to the caller's group
//! GET    /api/v1/comments/:id  one comment
//! PUT    /api/v1/comments/:id  change content (owner only)
//! DELETE /api/v1/comments/:id  delete with its history (owner only)

use std::sync::Arc;

use axum::{http::StatusCode, Extension, Json};
use comments_core::{identity::Identity, service::CommentService, types::CommentId};

use crate::dto::{CommentCreateRequest, CommentResponse, CommentUpdateRequest, PageQuery};
use crate::error::AppError;
use crate::extract::{JsonBody, PathParam, QueryParams};

pub async fn create_comment(
    Extension(identity): Extension<Identity>,
    Extension(service): Extension<Arc<dyn CommentService>>,
    JsonBody(body): JsonBody<CommentCreateRequest>,
) -> Result<(StatusCode, Json<CommentResponse>), AppError> {
    let created = service.create_comment(&identity, &body.content).await?;
    Ok((StatusCode::CREATED, Json(created.into())))
}

pub async fn list_comments(
    Extension(identity): Extension<Identity>,
    Extension(service): Extension<Arc<dyn CommentService>>,
    QueryParams(query): QueryParams<PageQuery>,
) -> Result<Json<Vec<CommentResponse>>, AppError> {
    let comments = service.list_comments(&identity, query.page()).await?;
    Ok(Json(comments.into_iter().map(Into::into).collect()))
}

pub async fn get_comment(
    Extension(identity): Extension<Identity>,
    Extension(service): Extension<Arc<dyn CommentService>>,
    PathParam(id): PathParam<i64>,
) -> Result<Json<CommentResponse>, AppError> {
    let comment = service.get_comment(&identity, CommentId(id)).await?;
    Ok(Json(comment.into()))
}

pub async fn update_comment(
    Extension(identity): Extension<Identity>,
    Extension(service): Extension<Arc<dyn CommentService>>,
    PathParam(id): PathParam<i64>,
    JsonBody(body): JsonBody<CommentUpdateRequest>,
) -> Result<Json<CommentResponse>, AppError> {
    let comment = service
        .update_comment(&identity, CommentId(id), body.content.as_deref())
        .await?;
    Ok(Json(comment.into()))
}

pub async fn delete_comment(
    Extension(identity): Extension<Identity>,
    Extension(service): Extension<Arc<dyn CommentService>>,
    PathParam(id): PathParam<i64>,
) -> Result<Json<CommentResponse>, AppError> {
    let snapshot = service.delete_comment(&identity, CommentId(id)).await?;
    Ok(Json(snapshot.into()))
}
