//! Request middleware: tracing context, CORS and bearer identity

use crate::{error::ApiError, state::AppState};
use axum::{
    extract::{Request, State},
    http::{header, HeaderName, HeaderValue, Method},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Request ID header name
pub const X_REQUEST_ID: &str = "x-request-id";

/// Correlation id of the request, stored in the request extensions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestId(pub Uuid);

impl RequestId {
    /// Reuse a well-formed `x-request-id` header, otherwise mint a new id
    fn from_headers(request: &Request) -> Self {
        let incoming = request
            .headers()
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| Uuid::parse_str(s).ok());
        Self(incoming.unwrap_or_else(Uuid::new_v4))
    }

    fn of(request: &Request) -> Uuid {
        request
            .extensions()
            .get::<RequestId>()
            .map_or_else(Uuid::nil, |id| id.0)
    }
}

/// Browser access for the API and its bearer header
pub fn cors_layer() -> CorsLayer {
    let request_id = HeaderName::from_static(X_REQUEST_ID);
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, request_id.clone()])
        .expose_headers([request_id])
        .max_age(Duration::from_secs(3600))
}

/// Tag the request with a [`RequestId`], echo it on the response and log the
/// outcome. Server errors log at ERROR, refusals at WARN.
pub async fn trace_request(mut request: Request, next: Next) -> Response {
    let id = RequestId::from_headers(&request);
    request.extensions_mut().insert(id);

    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let started = Instant::now();

    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&id.0.to_string()) {
        response.headers_mut().insert(X_REQUEST_ID, value);
    }

    let status = response.status().as_u16();
    let elapsed_ms = started.elapsed().as_millis() as u64;
    if response.status().is_server_error() {
        error!(request_id = %id.0, %method, %path, status, elapsed_ms, "Request failed");
    } else if response.status().is_client_error() {
        warn!(request_id = %id.0, %method, %path, status, elapsed_ms, "Request refused");
    } else {
        info!(request_id = %id.0, %method, %path, status, elapsed_ms, "Request served");
    }

    response
}

/// Bearer token identity middleware
///
/// Verifies the token, resolves the caller's permissions from their role and
/// stores the resulting [`cofund_core::ActingUser`] in the request
/// extensions. Requests without a valid token get 401.
pub async fn identity_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let request_id = RequestId::of(&request);

    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());

    let Some(token) = token else {
        warn!(
            request_id = %request_id,
            path = %request.uri().path(),
            "Missing bearer token"
        );
        return Err(ApiError::Unauthenticated("missing bearer token".into()));
    };

    let claims = state.tokens.verify(token).inspect_err(|e| {
        warn!(request_id = %request_id, error = %e, "Rejected bearer token");
    })?;

    let actor = state
        .permissions
        .resolve(claims.sub, claims.role.as_deref(), claims.member_id);

    debug!(
        request_id = %request_id,
        user = %actor.id,
        role = ?actor.role,
        "Identity resolved"
    );

    request.extensions_mut().insert(actor);
    Ok(next.run(request).await)
}
