//! Comment history handlers (authenticated, read-only).
//!
//! GET /api/v1/comments/:id/history  entries for a comment, oldest first
//! GET /api/v1/history/:entry_id     one entry

use std::sync::Arc;

use axum::{Extension, Json};
use comments_core::{
    identity::Identity,
    service::CommentService,
    types::{CommentId, HistoryEntryId},
};

use crate::dto::{HistoryResponse, PageQuery};
use crate::error::AppError;
use crate::extract::{PathParam, QueryParams};

pub async fn list_history(
    Extension(identity): Extension<Identity>,
    Extension(service): Extension<Arc<dyn CommentService>>,
    PathParam(comment_id): PathParam<i64>,
    QueryParams(query): QueryParams<PageQuery>,
) -> Result<Json<Vec<HistoryResponse>>, AppError> {
    let entries = service
        .list_history(&identity, CommentId(comment_id), query.page())
        .await?;
    Ok(Json(entries.into_iter().map(Into::into).collect()))
}

pub async fn get_entry(
    Extension(identity): Extension<Identity>,
    Extension(service): Extension<Arc<dyn CommentService>>,
    PathParam(entry_id): PathParam<i64>,
) -> Result<Json<HistoryResponse>, AppError> {
    let entry = service
        .get_history_entry(&identity, HistoryEntryId(entry_id))
        .await?;
    Ok(Json(entry.into()))
}
