//! HTTP error response mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use vigil_domain::error::VigilError;

/// JSON error body returned by API endpoints.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Maps [`VigilError`] to an HTTP response with appropriate status code.
pub struct ApiError(VigilError);

impl From<VigilError> for ApiError {
    fn from(err: VigilError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            VigilError::Configuration(_) | VigilError::InvalidArgument(_) => {
                StatusCode::BAD_REQUEST
            }
            VigilError::NotFound(_) => StatusCode::NOT_FOUND,
            VigilError::ResourceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            VigilError::Evaluation(_) | VigilError::Persistence(_) => {
                tracing::error!(error = %self.0, "command failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (
            status,
            Json(ErrorBody {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}
