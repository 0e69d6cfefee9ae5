use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use concierge_core::CoreError;
use concierge_trip::TripError;
use serde_json::json;

#[derive(Debug)]
pub enum AppError {
    ValidationError(String),
    AuthenticationError(String),
    NotFoundError(String),
    ConflictError(String),
    GoneError(String),
    RateLimitError,
    UnavailableError(String),
    InternalServerError(String),
    Anyhow(anyhow::Error),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::ValidationError(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        AppError::NotFoundError(message.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::AuthenticationError(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::NotFoundError(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::ConflictError(msg) => (StatusCode::CONFLICT, msg),
            AppError::GoneError(msg) => (StatusCode::GONE, msg),
            AppError::RateLimitError => (StatusCode::TOO_MANY_REQUESTS, "Rate limit exceeded".to_string()),
            AppError::UnavailableError(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
            }
            AppError::Anyhow(err) => {
                tracing::error!("Internal Server Error: {:#}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
            }
        };

        (status, Json(json!({ "error": error_message }))).into_response()
    }
}

impl From<TripError> for AppError {
    fn from(err: TripError) -> Self {
        match err {
            TripError::Validation(msg) => AppError::ValidationError(msg),
            TripError::NotFound(msg) => AppError::NotFoundError(msg),
            TripError::Expired(msg) => AppError::GoneError(msg),
            TripError::Transition(e) => AppError::ConflictError(e.to_string()),
            TripError::Core(e) => e.into(),
        }
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ValidationError(msg) => AppError::ValidationError(msg),
            CoreError::NotFound(msg) => AppError::NotFoundError(msg),
            CoreError::StorageError(msg) | CoreError::InternalError(msg) => AppError::InternalServerError(msg),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::Anyhow(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use concierge_trip::TransitionError;

    #[test]
    fn test_trip_errors_map_to_status() {
        let status = |e: TripError| AppError::from(e).into_response().status();

        assert_eq!(status(TripError::validation("Transcript is required")), StatusCode::BAD_REQUEST);
        assert_eq!(status(TripError::not_found("Session not found")), StatusCode::NOT_FOUND);
        assert_eq!(status(TripError::Expired("Session has expired".into())), StatusCode::GONE);
        assert_eq!(
            status(TripError::Transition(TransitionError { from: "resolved".into(), to: "accepted".into() })),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status(TripError::Core(CoreError::StorageError("pool timed out".into()))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
