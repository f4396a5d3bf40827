//! HTTP rendering of domain errors.
//!
//! Client errors (4xx) are answered with the message as a bare JSON string,
//! which the frontend shows as-is. Server errors carry the
//! `{ message, status }` object; [`ApiError`] always renders its
//! production-safe form and the `render_errors` middleware swaps in the
//! detailed body, with `stack`, when the server runs outside production.

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use rb_core::AppError;
use serde::Serialize;

use crate::state::AppState;

const GENERIC_MESSAGE: &str = "Something went wrong!";

#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError(err)
    }
}

impl ApiError {
    pub fn unauthenticated() -> Self {
        ApiError(AppError::Unauthorized("Not authenticated!".into()))
    }

    pub fn status(&self) -> StatusCode {
        match self.0 {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

/// Attached to server error responses so outer layers can re-render them.
#[derive(Debug, Clone)]
struct ErrorReport {
    message: String,
    stack: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if !status.is_server_error() {
            tracing::debug!(error = %self.0, %status, "request rejected");
            return (status, Json(self.0.to_string())).into_response();
        }
        tracing::error!(error = ?self.0, "request failed");

        let report = ErrorReport {
            message: self.0.to_string(),
            stack: format!("{:?}", self.0),
        };
        let body = ErrorBody {
            message: GENERIC_MESSAGE.to_string(),
            status: status.as_u16(),
            stack: None,
        };

        let mut response = (status, Json(body)).into_response();
        response.extensions_mut().insert(report);
        response
    }
}

/// Replaces server error bodies with their detailed form when errors are exposed.
pub async fn render_errors(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let Some(report) = response.extensions_mut().remove::<ErrorReport>() else {
        return response;
    };
    if !state.expose_errors {
        return response;
    }

    let status = response.status();
    let (parts, _) = response.into_parts();
    let body = ErrorBody {
        message: report.message,
        status: status.as_u16(),
        stack: Some(report.stack),
    };
    (parts, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_the_error_kind() {
        let cases = [
            (AppError::ValidationError("x".into()), 400),
            (AppError::Unauthorized("x".into()), 401),
            (AppError::Forbidden("x".into()), 403),
            (AppError::not_found("Post"), 404),
            (AppError::Conflict("x".into()), 409),
            (AppError::Internal("x".into()), 500),
        ];
        for (err, code) in cases {
            assert_eq!(ApiError(err).status().as_u16(), code);
        }
    }

    #[tokio::test]
    async fn client_errors_are_bare_strings() {
        let response =
            ApiError(AppError::Forbidden("You can delete only your posts!".into())).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(response.extensions().get::<ErrorReport>().is_none());

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, "You can delete only your posts!");
    }

    #[test]
    fn internal_details_stay_out_of_the_default_body() {
        let response = ApiError(AppError::Internal("pool timed out".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let report = response.extensions().get::<ErrorReport>().unwrap();
        assert_eq!(report.message, "pool timed out");
    }
}
