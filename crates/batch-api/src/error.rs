use batch_core::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Core(#[from] CoreError),
}

#[cfg(feature = "http")]
impl ApiError {
    pub fn status(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;

        match self {
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Core(e) => match e {
                CoreError::Unauthorized { .. } => StatusCode::FORBIDDEN,
                CoreError::UnknownProject(_)
                | CoreError::NoTasksConfigured { .. }
                | CoreError::UnknownTask { .. } => StatusCode::NOT_FOUND,
                CoreError::NoBuildAvailable { .. } => StatusCode::CONFLICT,
                CoreError::InvalidTransition { .. } | CoreError::RecordClosed { .. } => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }
}

#[cfg(feature = "http")]
impl axum::response::IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let body = serde_json::json!({ "error": self.to_string() });
        (self.status(), axum::Json(body)).into_response()
    }
}
