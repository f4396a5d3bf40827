use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::post;
use axum::{Json, Router};
use rb_core::WebhookHeaders;

use crate::dto::MessageDto;
use crate::error::ApiError;
use crate::state::AppState;

fn header(headers: &HeaderMap, name: &str) -> String {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// Receives Clerk user events. The raw body is what the signature covers.
pub async fn clerk_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<MessageDto>, ApiError> {
    let signature = WebhookHeaders {
        id: header(&headers, "svix-id"),
        timestamp: header(&headers, "svix-timestamp"),
        signature: header(&headers, "svix-signature"),
    };
    state.webhooks.handle_clerk_delivery(&signature, &body).await?;

    Ok(Json(MessageDto {
        message: "Webhook received",
    }))
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/clerk", post(clerk_webhook))
}
