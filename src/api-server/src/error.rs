use crate::models::ErrorResponse;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use cofund_core::FieldError;
use cofund_workflow::WorkflowError;
use tracing::error;

pub type Result<T> = std::result::Result<T, ApiError>;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    #[error("Validation error: {} field(s) failed", .0.len())]
    Validation(Vec<FieldError>),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Workflow(e) => match e {
                WorkflowError::Unauthorized { .. } => StatusCode::FORBIDDEN,
                WorkflowError::InvalidTransition { .. } | WorkflowError::EntityDeleted { .. } => {
                    StatusCode::CONFLICT
                }
                WorkflowError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
                WorkflowError::NotFound { .. } => StatusCode::NOT_FOUND,
                WorkflowError::Persistence(_) => StatusCode::SERVICE_UNAVAILABLE,
                WorkflowError::Core(_) => StatusCode::BAD_REQUEST,
                WorkflowError::Notification(_)
                | WorkflowError::Configuration(_)
                | WorkflowError::Internal(_)
                | WorkflowError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn fields(&self) -> &[FieldError] {
        match self {
            ApiError::Validation(fields) | ApiError::Workflow(WorkflowError::Validation(fields)) => {
                fields
            }
            _ => &[],
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ApiError::Validation(cofund_core::types::field_errors(&errors))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "Request failed");
        }

        let body = Json(ErrorResponse {
            error: self.to_string(),
            status: status.as_u16(),
            fields: self.fields().to_vec(),
        });

        (status, body).into_response()
    }
}
