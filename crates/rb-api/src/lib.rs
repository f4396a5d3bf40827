//! # rb-api
//!
//! The HTTP layer of Rusty-Blog: axum routes, DTOs, the bearer-token
//! middleware and error rendering. No business rules live here.

pub mod dto;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod state;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{middleware::from_fn_with_state, Router};
use rb_core::AppError;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

pub use error::ApiError;
pub use state::AppState;

use crate::middleware::{LocalRequestIdGenerator, X_REQUEST_ID};

/// Builds the complete application router.
///
/// `/webhooks` sits outside the bearer-token check; everything else requires it.
pub fn router(state: AppState) -> Router {
    let authenticated = Router::new()
        .nest("/posts", handlers::posts::routes())
        .nest("/comments", handlers::comments::routes())
        .nest("/users", handlers::users::routes())
        .route_layer(from_fn_with_state(state.clone(), middleware::require_auth));

    let trace = TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
        let request_id = request
            .headers()
            .get(&X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        tracing::info_span!(
            "http.request",
            http.method = %request.method(),
            http.target = %request.uri().path(),
            request.id = %request_id,
        )
    });

    let layers = ServiceBuilder::new()
        .layer(SetRequestIdLayer::new(X_REQUEST_ID, LocalRequestIdGenerator))
        .layer(trace)
        .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
        .layer(middleware::cors_layer())
        .layer(from_fn_with_state(state.clone(), error::render_errors))
        .layer(CatchPanicLayer::custom(middleware::catch_panic));

    Router::new()
        .nest("/webhooks", handlers::webhooks::routes())
        .merge(authenticated)
        .fallback(not_found_route)
        .layer(layers)
        .with_state(state)
}

async fn not_found_route(method: Method) -> Response {
    match method {
        Method::HEAD => StatusCode::NOT_FOUND.into_response(),
        _ => ApiError(AppError::not_found("Route")).into_response(),
    }
}
