use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use ledger::{ErrorKind, LedgerError};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Malformed payload: {message}")]
    MalformedPayload { status: StatusCode, message: String },

    #[error("Unauthorized")]
    Unauthorized,

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("Internal error: {0}")]
    InternalError(#[from] Box<dyn std::error::Error + Send + Sync>),
}

fn ledger_status(err: &LedgerError) -> StatusCode {
    match err {
        LedgerError::RegistrationClosed => StatusCode::FORBIDDEN,
        other => match other.kind() {
            ErrorKind::Validation => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::Rejected => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Permission => StatusCode::FORBIDDEN,
            ErrorKind::Transient => StatusCode::SERVICE_UNAVAILABLE,
        },
    }
}

fn ledger_body(err: &LedgerError) -> Value {
    match err {
        LedgerError::Validation { message, errors } | LedgerError::Conflict { message, errors } => {
            json!({ "message": message, "errors": errors })
        }
        LedgerError::InvalidBatch { message, errors } => {
            json!({ "message": message, "errors": errors })
        }
        LedgerError::Permission(diagnostic) => {
            json!({ "message": "Missing or insufficient permissions.", "diagnostic": diagnostic })
        }
        LedgerError::Store(_) | LedgerError::Decode { .. } => {
            json!({ "message": "Database service is not available. Please try again later." })
        }
        other => json!({ "message": other.to_string() }),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            AppError::MalformedPayload { status, message } => {
                (*status, json!({ "message": message }))
            }
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                json!({ "message": self.to_string() }),
            ),
            AppError::Ledger(err) => (ledger_status(err), ledger_body(err)),
            AppError::InternalError(err) => {
                error!("Internal error: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "message": "An unexpected error occurred." }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
