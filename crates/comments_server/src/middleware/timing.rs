//! Per-request timing and correlation headers.

use std::time::Instant;

use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";
pub const PROCESS_TIME_HEADER: &str = "x-process-time";

pub async fn request_timing(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_owned();
    let request_id = Uuid::new_v4().to_string();

    let mut response = next.run(req).await;
    let elapsed = start.elapsed().as_secs_f64();

    tracing::info!(
        %method,
        %path,
        status = response.status().as_u16(),
        elapsed_s = elapsed,
        request_id = %request_id,
        "request completed"
    );

    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        headers.insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
    }
    if let Ok(value) = HeaderValue::from_str(&format!("{elapsed:.4}")) {
        headers.insert(HeaderName::from_static(PROCESS_TIME_HEADER), value);
    }
    response
}
