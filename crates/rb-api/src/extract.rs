use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::request::Parts;
use rb_core::{AppError, Identity};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::error::ApiError;

/// The verified caller, placed in the request extensions by `require_auth`.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Identity);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .map(AuthUser)
            .ok_or_else(ApiError::unauthenticated)
    }
}

/// [`axum::Json`] that answers with the API error schema and runs the
/// body's `validator` rules.
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let axum::Json(value) = axum::Json::<T>::from_request(req, state)
            .await
            .map_err(rejection)?;
        value
            .validate()
            .map_err(|errors| AppError::ValidationError(errors.to_string()))?;
        Ok(ValidatedJson(value))
    }
}

/// Plain JSON body without extra rules.
pub struct Json<T>(pub T);

impl<T, S> FromRequest<S> for Json<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let axum::Json(value) = axum::Json::<T>::from_request(req, state)
            .await
            .map_err(rejection)?;
        Ok(Json(value))
    }
}

/// [`axum::extract::Path`] with JSON rejections.
pub struct Path<T>(pub T);

impl<T, S> FromRequestParts<S> for Path<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match axum::extract::Path::<T>::from_request_parts(parts, state).await {
            Ok(axum::extract::Path(value)) => Ok(Path(value)),
            Err(PathRejection::FailedToDeserializePathParams(err)) => {
                Err(ApiError(AppError::ValidationError(err.body_text())))
            }
            Err(other) => Err(ApiError(AppError::Internal(other.body_text()))),
        }
    }
}

/// [`axum::extract::Query`] with JSON rejections.
pub struct Query<T>(pub T);

impl<T, S> FromRequestParts<S> for Query<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let axum::extract::Query(value) = axum::extract::Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|err| ApiError(AppError::ValidationError(err.body_text())))?;
        Ok(Query(value))
    }
}

fn rejection(err: JsonRejection) -> ApiError {
    let message = match err {
        JsonRejection::MissingJsonContentType(_) => "Invalid content type".to_string(),
        other => other.body_text(),
    };
    ApiError(AppError::ValidationError(message))
}
