use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use uuid::Uuid;

use crate::dto::{CommentDto, CreateCommentRequest};
use crate::error::ApiError;
use crate::extract::{AuthUser, Path, ValidatedJson};
use crate::state::AppState;

pub async fn list_comments(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
) -> Result<Json<Vec<CommentDto>>, ApiError> {
    let comments = state.comments.list_comments(post_id).await?;
    Ok(Json(comments.into_iter().map(CommentDto::from).collect()))
}

pub async fn add_comment(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(post_id): Path<Uuid>,
    ValidatedJson(body): ValidatedJson<CreateCommentRequest>,
) -> Result<Response, ApiError> {
    let comment = state
        .comments
        .add_comment(&identity, post_id, &body.desc)
        .await?;
    Ok((StatusCode::CREATED, Json(CommentDto::from(comment))).into_response())
}

pub async fn delete_comment(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<&'static str>, ApiError> {
    state.comments.delete_comment(&identity, id).await?;
    Ok(Json("Comment deleted"))
}

/// The segment is a post id for GET/POST and a comment id for DELETE.
pub fn routes() -> Router<AppState> {
    Router::new().route(
        "/{id}",
        get(list_comments).post(add_comment).delete(delete_comment),
    )
}
