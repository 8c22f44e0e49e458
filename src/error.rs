//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Message returned for every 5xx; details stay in the log.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Table name and label are required")]
    MissingNameOrLabel,
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),
    #[error("duplicate field '{field}' in table {table}")]
    DuplicateField { table: String, field: String },
    #[error("field '{field}' references unknown table '{target}'")]
    UnknownReference { field: String, target: String },
    #[error("validation: {0}")]
    Validation(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Conflict(String),
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("internal: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Schema(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Db(e) if is_unique_violation(e) => StatusCode::CONFLICT,
            AppError::Db(_) | AppError::Io(_) | AppError::Json(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Client-facing message. Server faults collapse to a generic text.
    pub fn public_message(&self) -> String {
        match self {
            AppError::Db(e) if is_unique_violation(e) => "record already exists".to_string(),
            _ if self.status().is_server_error() => INTERNAL_ERROR_MESSAGE.to_string(),
            _ => self.to_string(),
        }
    }

    fn log(&self) {
        if self.status().is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, "request rejected");
        }
    }
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Database(db) => db.code().as_deref() == Some("23505"),
        _ => false,
    }
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.log();
        let status = self.status();
        let body = ErrorBody {
            error: self.public_message(),
        };
        (status, Json(body)).into_response()
    }
}

/// Error wrapper for the `{action, data}` endpoints: `{success:false, error}`.
#[derive(Debug)]
pub struct ActionError(pub AppError);

impl From<AppError> for ActionError {
    fn from(e: AppError) -> Self {
        ActionError(e)
    }
}

impl From<SchemaError> for ActionError {
    fn from(e: SchemaError) -> Self {
        ActionError(e.into())
    }
}

impl From<serde_json::Error> for ActionError {
    fn from(e: serde_json::Error) -> Self {
        ActionError(e.into())
    }
}

impl From<std::io::Error> for ActionError {
    fn from(e: std::io::Error) -> Self {
        ActionError(e.into())
    }
}

#[derive(Serialize)]
struct ActionErrorBody {
    success: bool,
    error: String,
}

impl IntoResponse for ActionError {
    fn into_response(self) -> Response {
        self.0.log();
        let status = self.0.status();
        let body = ActionErrorBody {
            success: false,
            error: self.0.public_message(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_faults_hide_details() {
        let err = AppError::Internal("pool exhausted".into());
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.public_message(), "Internal server error");
    }

    #[test]
    fn client_errors_keep_their_message() {
        let err = AppError::NotFound("material not found".into());
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.public_message(), "material not found");
        let err = AppError::Schema(SchemaError::MissingNameOrLabel);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.public_message(), "Table name and label are required");
    }
}
