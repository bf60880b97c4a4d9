//! Bearer-token authentication.
//!
//! Tokens are HS256 JWTs whose `sub` is the user id. The middleware verifies
//! the token, reloads the user through the service (groups are mutable) and
//! inserts the resulting [`Identity`] into the request extensions.

use std::sync::Arc;

use axum::{
    extract::Request,
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
    Extension,
};
use chrono::{Duration, Utc};
use comments_core::{
    error::CommentsError,
    identity::Identity,
    service::CommentService,
    types::{User, UserId},
};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

pub const DEFAULT_TOKEN_TTL_MINUTES: i64 = 30;

/// Claims carried by an access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: String,
    pub username: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Clone)]
pub struct JwtConfig {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl JwtConfig {
    pub fn from_secret(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub"]);
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl: Duration::minutes(DEFAULT_TOKEN_TTL_MINUTES),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Sign an access token for `user`.
    pub fn issue(&self, user: &User) -> Result<String, CommentsError> {
        let now = Utc::now();
        let claims = AccessClaims {
            sub: user.id.to_string(),
            username: user.username.clone(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| CommentsError::Persistence(anyhow::anyhow!("token signing failed: {e}")))
    }

    pub fn verify(&self, token: &str) -> Result<AccessClaims, CommentsError> {
        decode::<AccessClaims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "token rejected");
                invalid_credentials()
            })
    }
}

fn invalid_credentials() -> CommentsError {
    CommentsError::Unauthenticated("Could not validate credentials".into())
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
}

async fn resolve(
    config: &JwtConfig,
    service: &dyn CommentService,
    token: &str,
) -> Result<Identity, CommentsError> {
    let claims = config.verify(token)?;
    let user_id: i64 = claims.sub.parse().map_err(|_| invalid_credentials())?;
    service.resolve_identity(UserId(user_id)).await
}

/// Require a valid bearer token.
pub async fn jwt_auth(
    Extension(config): Extension<JwtConfig>,
    Extension(service): Extension<Arc<dyn CommentService>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(req.headers())
        .ok_or_else(|| CommentsError::Unauthenticated("Not authenticated".into()))?;
    let identity = resolve(&config, service.as_ref(), token).await?;
    tracing::debug!(user = %identity.id, group = %identity.group, "authenticated");
    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}

/// Resolve a bearer token when one is sent. A missing header passes through
/// without an identity; a bad token is still rejected.
pub async fn optional_identity(
    Extension(config): Extension<JwtConfig>,
    Extension(service): Extension<Arc<dyn CommentService>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    if let Some(token) = bearer_token(req.headers()) {
        let identity = resolve(&config, service.as_ref(), token).await?;
        req.extensions_mut().insert(identity);
    }
    Ok(next.run(req).await)
}
