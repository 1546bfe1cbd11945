use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use snafu::Snafu;

use crate::auth::AuthError;
use crate::service::{EngineError, ErrorKind};

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ApiError {
    #[snafu(display("{source}"))]
    Unauthenticated { source: AuthError },

    #[snafu(display("{source}"))]
    Engine { source: EngineError },
}

impl From<AuthError> for ApiError {
    fn from(source: AuthError) -> Self {
        ApiError::Unauthenticated { source }
    }
}

impl From<EngineError> for ApiError {
    fn from(source: EngineError) -> Self {
        ApiError::Engine { source }
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated { .. } => StatusCode::UNAUTHORIZED,
            ApiError::Engine { source } => match source.kind() {
                ErrorKind::InvalidRequest | ErrorKind::Conflict | ErrorKind::AlreadyCompleted => {
                    StatusCode::BAD_REQUEST
                }
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::LessonLocked => StatusCode::FORBIDDEN,
                ErrorKind::Store => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse<T> {
    message: String,
    #[serde(flatten)]
    data: T,
}

#[derive(Debug, Serialize)]
#[serde(tag = "error")]
enum Internal {
    Internal,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        match self {
            ApiError::Unauthenticated { source } => {
                tracing::debug!(error = %source, "rejected unauthenticated request");
                let content = ErrorResponse {
                    message: source.to_string(),
                    data: source,
                };
                (status, Json(content)).into_response()
            }
            ApiError::Engine { source } if source.kind() == ErrorKind::Store => {
                tracing::error!(error = %source, location = ?source.location(), "request failed");
                let content = ErrorResponse {
                    message: "internal server error".to_owned(),
                    data: Internal::Internal,
                };
                (status, Json(content)).into_response()
            }
            ApiError::Engine { source } => {
                let content = ErrorResponse {
                    message: source.to_string(),
                    data: source,
                };
                (status, Json(content)).into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CourseId;

    #[test]
    fn status_follows_the_error_kind() {
        let conflict = ApiError::from(EngineError::AlreadyEnrolled {
            course_id: CourseId::from("c1"),
        });
        assert_eq!(conflict.status(), StatusCode::BAD_REQUEST);

        let locked = ApiError::from(EngineError::LessonLocked {
            lecture_id: "l3".into(),
        });
        assert_eq!(locked.status(), StatusCode::FORBIDDEN);

        let missing = ApiError::from(AuthError::MissingToken);
        assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn domain_errors_carry_their_data() {
        let error = EngineError::CourseNotFound {
            course_id: CourseId::from("c9"),
        };
        let content = ErrorResponse {
            message: error.to_string(),
            data: error,
        };

        let json = serde_json::to_value(&content).unwrap();
        assert_eq!(json["error"], "CourseNotFound");
        assert_eq!(json["data"]["course_id"], "c9");
    }
}
