//! Mock gateway error types

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use fhevm_client::ClientError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MockError {
    #[error("Handle not found: {0}")]
    NotFound(String),

    #[error("Not authorized: {0}")]
    Unauthorized(String),

    #[error("Not publicly decryptable: {0}")]
    NotPublic(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MockError {
    pub fn status(&self) -> StatusCode {
        match self {
            MockError::NotFound(_) => StatusCode::NOT_FOUND,
            MockError::Unauthorized(_) => StatusCode::FORBIDDEN,
            MockError::NotPublic(_) => StatusCode::FORBIDDEN,
            MockError::BadRequest(_) => StatusCode::BAD_REQUEST,
            MockError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for MockError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}

/// In-process decryptions fail exactly like the HTTP gateway would
impl From<MockError> for ClientError {
    fn from(err: MockError) -> Self {
        ClientError::Gateway {
            status: err.status().as_u16(),
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for MockError {
    fn from(err: std::io::Error) -> Self {
        MockError::Internal(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, MockError>;
