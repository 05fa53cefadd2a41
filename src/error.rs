use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("login required")]
    Unauthorized,
    #[error("access forbidden")]
    Forbidden(Option<&'static str>),
    #[error("password change required")]
    PasswordChangeRequired,
    #[error("registration closed")]
    RegistrationClosed,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
    #[error("server error: {0}")]
    Server(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                json!({ "message": "login required" }),
            ),
            ApiError::PasswordChangeRequired => (
                StatusCode::FORBIDDEN,
                json!({ "message": "password change required" }),
            ),
            ApiError::Forbidden(Some(permission)) => (
                StatusCode::FORBIDDEN,
                json!({
                    "message": "access forbidden",
                    "required_permission": permission,
                }),
            ),
            ApiError::Forbidden(None) => (
                StatusCode::FORBIDDEN,
                json!({ "message": "access forbidden" }),
            ),
            ApiError::RegistrationClosed => (
                StatusCode::FORBIDDEN,
                json!({ "message": "registration closed" }),
            ),
            ApiError::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                json!({ "message": format!("{} not found", resource) }),
            ),
            ApiError::BadRequest(reason) => (
                StatusCode::BAD_REQUEST,
                json!({ "message": "bad request", "reason": reason }),
            ),
            ApiError::Db(error) => {
                tracing::error!(%error, "database error while handling request");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "message": "server error" }),
                )
            }
            ApiError::Server(error) => {
                tracing::error!(%error, "unhandled error while handling request");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "message": "server error" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
