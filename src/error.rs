use std::path::PathBuf;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Failures of the model/forecast/prediction pipeline.
///
/// Artifact errors are fatal at startup. Everything else is scoped to a single
/// dashboard run and ends up as an inline status message, never as an HTTP error.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("model artifact not found at {}", path.display())]
    ArtifactMissing { path: PathBuf },

    #[error("model artifact at {} is corrupt: {reason}", path.display())]
    ArtifactCorrupt { path: PathBuf, reason: String },

    #[error("forecast unavailable: {0}")]
    ForecastUnavailable(String),

    #[error("forecast row at {time} is missing `{field}`")]
    FeatureIncomplete { time: String, field: &'static str },

    #[error("model returned {actual} predictions for {expected} rows")]
    PredictionMismatch { expected: usize, actual: usize },
}

impl AppError {
    /// Artifact errors abort the process; the rest only abort the current run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, AppError::ArtifactMissing { .. } | AppError::ArtifactCorrupt { .. })
    }
}

/// Errors raised at the HTTP boundary before a pipeline run starts.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn error_type(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BadRequest",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        tracing::debug!(error = %self, "rejected request");

        let body = ErrorBody {
            error: self.error_type(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_artifact_errors_are_fatal() {
        let missing = AppError::ArtifactMissing { path: PathBuf::from("m.json") };
        let corrupt = AppError::ArtifactCorrupt {
            path: PathBuf::from("m.json"),
            reason: "bad".into(),
        };
        assert!(missing.is_fatal());
        assert!(corrupt.is_fatal());
        assert!(!AppError::ForecastUnavailable("HTTP 500".into()).is_fatal());
        assert!(!AppError::FeatureIncomplete { time: "t".into(), field: "rain" }.is_fatal());
    }

    #[test]
    fn test_feature_incomplete_names_row_and_field() {
        let err = AppError::FeatureIncomplete {
            time: "2025-03-01T04:00".into(),
            field: "wind_speed_100m",
        };
        assert_eq!(
            err.to_string(),
            "forecast row at 2025-03-01T04:00 is missing `wind_speed_100m`"
        );
    }

    #[test]
    fn test_bad_request_response() {
        let err = ApiError::BadRequest("latitude 95 is outside [-90, 90]".into());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.error_type(), "BadRequest");
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
