use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::error;

use agora_db::StoreError;
use agora_types::api::{ErrorResponse, FieldError};

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("validation failed")]
    Validation(Vec<FieldError>),

    #[error("authentication required")]
    Unauthenticated,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("conflict on {0:?}")]
    Conflict(FieldError),

    #[error("store failure: {0}")]
    Store(#[source] StoreError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn field(field: &str, message: &str) -> Self {
        Self::Validation(vec![FieldError::new(field, message)])
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Store(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => Self::NotFound(what),
            StoreError::Conflict(column) => {
                let message = format!("{column} already registered");
                Self::Conflict(FieldError::new(column, message))
            }
            other => Self::Store(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            Self::Validation(errors) => ErrorResponse {
                error: "validation_failed".into(),
                errors,
            },
            Self::Conflict(field) => ErrorResponse {
                error: "conflict".into(),
                errors: vec![field],
            },
            Self::Unauthenticated => ErrorResponse {
                error: "unauthenticated".into(),
                errors: vec![],
            },
            Self::NotFound(what) => ErrorResponse {
                error: format!("{what} not found"),
                errors: vec![],
            },
            // Never leak store or internal details to clients.
            Self::Store(e) => {
                error!("store failure: {}", e);
                ErrorResponse {
                    error: "internal_error".into(),
                    errors: vec![],
                }
            }
            Self::Internal(msg) => {
                error!("internal error: {}", msg);
                ErrorResponse {
                    error: "internal_error".into(),
                    errors: vec![],
                }
            }
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_conflict_becomes_field_tagged_conflict() {
        let err = ApiError::from(StoreError::Conflict("email".into()));
        match &err {
            ApiError::Conflict(f) => {
                assert_eq!(f.field, "email");
                assert_eq!(f.message, "email already registered");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn store_failures_are_internal() {
        let err = ApiError::from(StoreError::Poisoned);
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(ApiError::from(StoreError::NotFound("post")).status(), StatusCode::NOT_FOUND);
    }
}
