//! Router construction for the comments server.

use std::sync::Arc;

use axum::{
    http::HeaderValue,
    middleware as axum_mw,
    routing::{get, post},
    Extension, Router,
};
use comments_core::service::CommentService;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::graph::{self, build_schema};
use crate::handlers;
use crate::middleware::jwt::{jwt_auth, optional_identity, JwtConfig};
use crate::middleware::timing::request_timing;

/// Build a CORS layer for the given origins. Empty means no CORS layer.
pub fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    if origins.is_empty() {
        return None;
    }
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o.trim()) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods(Any)
            .allow_headers(Any),
    )
}

/// Build the full axum router with all routes and middleware.
pub fn build_router(
    service: Arc<dyn CommentService>,
    jwt_config: JwtConfig,
    cors: Option<CorsLayer>,
) -> Router {
    // Routes that require JWT authentication
    let protected = Router::new()
        .route("/api/v1/users", get(handlers::users::list_users))
        .route(
            "/api/v1/users/:id",
            get(handlers::users::get_user)
                .put(handlers::users::update_user)
                .delete(handlers::users::delete_user),
        )
        .route(
            "/api/v1/comments",
            post(handlers::comments::create_comment).get(handlers::comments::list_comments),
        )
        .route(
            "/api/v1/comments/:id",
            get(handlers::comments::get_comment)
                .put(handlers::comments::update_comment)
                .delete(handlers::comments::delete_comment),
        )
        .route(
            "/api/v1/comments/:id/history",
            get(handlers::history::list_history),
        )
        .route("/api/v1/history/:entry_id", get(handlers::history::get_entry))
        .layer(axum_mw::from_fn(jwt_auth));

    // GraphQL resolves the caller when a token is sent; createUser needs none.
    let graphql = Router::new()
        .route("/graphql", post(graph::graphql_handler))
        .layer(axum_mw::from_fn(optional_identity))
        .layer(Extension(build_schema(Arc::clone(&service))));

    // Public routes (no auth)
    let public = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/api/v1/health", get(handlers::health::health))
        .route("/api/v1/auth/register", post(handlers::auth::register))
        .route("/api/v1/auth/login", post(handlers::auth::login));

    let app = public
        .merge(protected)
        .merge(graphql)
        .layer(Extension(jwt_config))
        .layer(Extension(service))
        .layer(axum_mw::from_fn(request_timing))
        .layer(TraceLayer::new_for_http());

    match cors {
        Some(cors) => app.layer(cors),
        None => app,
    }
}
