//! Public account endpoints.
//!
//! POST /api/v1/auth/register  create an account (JSON body)
//! POST /api/v1/auth/login     exchange form credentials for a bearer token

use std::sync::Arc;

use axum::{http::StatusCode, Extension, Json};
use comments_core::service::{CommentService, Registration};

use crate::dto::{LoginForm, RegisterRequest, TokenResponse, UserResponse};
use crate::error::AppError;
use crate::extract::{FormBody, JsonBody};
use crate::middleware::jwt::JwtConfig;

pub async fn register(
    Extension(service): Extension<Arc<dyn CommentService>>,
    JsonBody(body): JsonBody<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    let user = service
        .register(Registration {
            username: body.username,
            password: body.password,
            group: body.group,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

pub async fn login(
    Extension(service): Extension<Arc<dyn CommentService>>,
    Extension(jwt): Extension<JwtConfig>,
    FormBody(form): FormBody<LoginForm>,
) -> Result<Json<TokenResponse>, AppError> {
    let user = service.authenticate(&form.username, &form.password).await?;
    let access_token = jwt.issue(&user)?;
    tracing::info!(user = %user.id, "token issued");
    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer",
    }))
}
