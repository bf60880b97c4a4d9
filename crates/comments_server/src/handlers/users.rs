//! User account handlers (authenticated).
//!
//! GET    /api/v1/users      list users
//! GET    /api/v1/users/:id  fetch one profile
//! PUT    /api/v1/users/:id  update own account
//! DELETE /api/v1/users/:id  delete own account and its comments

use std::sync::Arc;

use axum::{Extension, Json};
use comments_core::{
    identity::Identity,
    service::{AccountUpdate, CommentService},
    types::UserId,
};

use crate::dto::{PageQuery, UserResponse, UserUpdateRequest};
use crate::error::AppError;
use crate::extract::{JsonBody, PathParam, QueryParams};

pub async fn list_users(
    Extension(service): Extension<Arc<dyn CommentService>>,
    QueryParams(query): QueryParams<PageQuery>,
) -> Result<Json<Vec<UserResponse>>, AppError> {
    let users = service.list_users(query.page()).await?;
    Ok(Json(users.into_iter().map(Into::into).collect()))
}

pub async fn get_user(
    Extension(service): Extension<Arc<dyn CommentService>>,
    PathParam(id): PathParam<i64>,
) -> Result<Json<UserResponse>, AppError> {
    Ok(Json(service.get_user(UserId(id)).await?.into()))
}

pub async fn update_user(
    Extension(identity): Extension<Identity>,
    Extension(service): Extension<Arc<dyn CommentService>>,
    PathParam(id): PathParam<i64>,
    JsonBody(body): JsonBody<UserUpdateRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let update = AccountUpdate {
        username: body.username,
        group: body.group,
        password: body.password,
    };
    let user = service.update_user(&identity, UserId(id), update).await?;
    Ok(Json(user.into()))
}

pub async fn delete_user(
    Extension(identity): Extension<Identity>,
    Extension(service): Extension<Arc<dyn CommentService>>,
    PathParam(id): PathParam<i64>,
) -> Result<Json<UserResponse>, AppError> {
    Ok(Json(service.delete_user(&identity, UserId(id)).await?.into()))
}
