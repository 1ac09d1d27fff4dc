//! Server error types

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use qiot_core::SendDataResponse;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("{0}")]
    Core(#[from] qiot_core::Error),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Metrics recorder error: {0}")]
    Recorder(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServerError {
    /// Caller mistakes are reported in-band with HTTP 200; server faults are 500
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::Core(e) if e.is_client_error() => StatusCode::OK,
            ServerError::InvalidRequest(_) => StatusCode::OK,
            ServerError::Core(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::Recorder(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn is_client_error(&self) -> bool {
        self.status_code() == StatusCode::OK
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = SendDataResponse::Error {
            message: self.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors_stay_in_band() {
        let err = ServerError::Core(qiot_core::Error::MalformedCiphertext {
            expected: 768,
            actual: 4,
        });
        assert_eq!(err.status_code(), StatusCode::OK);
        assert!(err.is_client_error());

        let err = ServerError::InvalidRequest("missing field `ciphertext`".into());
        assert_eq!(err.status_code(), StatusCode::OK);
    }

    #[test]
    fn test_server_faults_are_500() {
        let err = ServerError::Core(qiot_core::Error::Decapsulation("boom".into()));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        let err = ServerError::Internal("boom".into());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
