use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch};
use axum::{Json, Router};
use rb_core::PageRequest;
use uuid::Uuid;

use crate::dto::{
    CreatePostRequest, ListPostsQuery, PostDto, PostIdRequest, PostListDto, UploadAuthDto,
};
use crate::error::ApiError;
use crate::extract::{self, AuthUser, Path, Query, ValidatedJson};
use crate::state::AppState;

pub async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<ListPostsQuery>,
) -> Result<Json<PostListDto>, ApiError> {
    let page = PageRequest::parse(query.page.as_deref(), query.limit.as_deref());
    let page = state.posts.list_posts(query.filter()?, page).await?;
    Ok(Json(page.into()))
}

pub async fn get_post(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<PostDto>, ApiError> {
    let post = state.posts.get_post(&slug).await?;
    Ok(Json(post.into()))
}

pub async fn create_post(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    ValidatedJson(body): ValidatedJson<CreatePostRequest>,
) -> Result<Response, ApiError> {
    let post = state.posts.create_post(&identity, body.into_draft()?).await?;
    Ok((StatusCode::CREATED, Json(PostDto::from(post))).into_response())
}

pub async fn delete_post(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<&'static str>, ApiError> {
    state.posts.delete_post(&identity, id).await?;
    Ok(Json("Post has been deleted"))
}

pub async fn feature_post(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    extract::Json(body): extract::Json<PostIdRequest>,
) -> Result<Json<PostDto>, ApiError> {
    let post = state.posts.toggle_featured(&identity, body.post_id).await?;
    Ok(Json(post.into()))
}

pub async fn upload_auth(State(state): State<AppState>) -> Result<Json<UploadAuthDto>, ApiError> {
    Ok(Json(state.posts.upload_auth()?.into()))
}

/// `GET /{post}` takes a slug and `DELETE /{post}` an id; they share the
/// segment so the router sees one parameter name.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_posts).post(create_post))
        .route("/upload-auth", get(upload_auth))
        .route("/feature", patch(feature_post))
        .route("/{post}", get(get_post).delete(delete_post))
}
