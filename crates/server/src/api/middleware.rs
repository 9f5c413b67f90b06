//! Acting-identity extraction and metrics middleware for API routes.

use axum::{
    body::Body,
    extract::FromRequestParts,
    http::{request::Parts, Request, StatusCode},
    middleware::Next,
    response::Response,
};
use std::future::Future;
use std::time::Instant;

use custodian_core::Actor;

use super::error::ApiError;
use crate::metrics::{
    normalize_path, ACTOR_REJECTIONS_TOTAL, HTTP_REQUESTS_IN_FLIGHT, HTTP_REQUESTS_TOTAL,
    HTTP_REQUEST_DURATION,
};

/// Header carrying the acting user's id.
pub const ACTOR_ID_HEADER: &str = "x-actor-id";

/// Header carrying the acting user's role.
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";

/// Metrics middleware that tracks HTTP request duration and counts.
///
/// This middleware records:
/// - Request duration (histogram)
/// - Request count (counter)
/// - Requests in flight (gauge)
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = normalize_path(request.uri().path());

    HTTP_REQUESTS_IN_FLIGHT.inc();

    let response = next.run(request).await;

    HTTP_REQUESTS_IN_FLIGHT.dec();

    let duration = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    HTTP_REQUEST_DURATION
        .with_label_values(&[&method, &path, &status])
        .observe(duration);
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[&method, &path, &status])
        .inc();

    response
}

/// Extractor for the acting user.
///
/// The front end is trusted to report who is acting; this only checks that
/// both headers are present and non-empty. Permission checks happen in the
/// lifecycle operations.
#[derive(Debug, Clone)]
pub struct ActingUser(pub Actor);

fn header_value(parts: &Parts, name: &str) -> Option<String> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl<S> FromRequestParts<S> for ActingUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl Future<Output = Result<Self, Self::Rejection>> + Send {
        let result = match (
            header_value(parts, ACTOR_ID_HEADER),
            header_value(parts, ACTOR_ROLE_HEADER),
        ) {
            (Some(id), Some(role)) => Ok(ActingUser(Actor::new(id, role))),
            (None, _) => {
                ACTOR_REJECTIONS_TOTAL.with_label_values(&["missing_id"]).inc();
                Err(ApiError::new(
                    StatusCode::UNAUTHORIZED,
                    "missing_actor",
                    "X-Actor-Id header is required",
                ))
            }
            (Some(_), None) => {
                ACTOR_REJECTIONS_TOTAL.with_label_values(&["missing_role"]).inc();
                Err(ApiError::new(
                    StatusCode::UNAUTHORIZED,
                    "missing_actor",
                    "X-Actor-Role header is required",
                ))
            }
        };
        std::future::ready(result)
    }
}
