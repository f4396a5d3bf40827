use axum::extract::State;
use axum::routing::{get, patch};
use axum::{Json, Router};
use uuid::Uuid;

use crate::dto::PostIdRequest;
use crate::error::ApiError;
use crate::extract::{self, AuthUser};
use crate::state::AppState;

pub async fn saved_posts(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
) -> Result<Json<Vec<Uuid>>, ApiError> {
    Ok(Json(state.users.saved_posts(&identity).await?))
}

pub async fn toggle_saved(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    extract::Json(body): extract::Json<PostIdRequest>,
) -> Result<Json<&'static str>, ApiError> {
    let outcome = state.users.toggle_saved(&identity, body.post_id).await?;
    Ok(Json(outcome.message()))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/saved", get(saved_posts))
        .route("/save", patch(toggle_saved))
}
