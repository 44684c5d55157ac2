use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

/// RepoError
///
/// Failure surface of the persistence layer. The only condition the domain
/// layer is allowed to react to is a unique-constraint violation (signup maps
/// it to `CredentialsTaken`); every other database failure passes through
/// untouched and becomes a 500 at the boundary.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("unique constraint violated")]
    UniqueViolation,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// ApiError
///
/// The application's complete error taxonomy. Every failure a handler or
/// service can produce is one of these conditions, and each maps to exactly
/// one HTTP status and one stable message string. Internal details (SQL
/// errors, hash/signing failures) are logged server-side and never reach the
/// response body.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed input, rejected before any service logic runs.
    #[error("{0}")]
    Validation(String),
    /// Signup with an email that already has an account.
    #[error("Credentials taken")]
    CredentialsTaken,
    /// Signin failure. Identical for unknown email and wrong password, so the
    /// response cannot be used to enumerate accounts.
    #[error("Credentials invalid")]
    CredentialsInvalid,
    /// Missing, malformed, or expired bearer token, or a subject that no
    /// longer resolves to a user. All cases are indistinguishable.
    #[error("Unauthorized")]
    Unauthenticated,
    /// Ownership mismatch on a bookmark edit/delete. Deliberately identical
    /// for "does not exist" and "exists but is not yours".
    #[error("Access to resource is denied")]
    AccessDenied,
    #[error("Resource not found")]
    NotFound,
    /// Unexpected failure (store, hasher, signer). The payload is the
    /// server-side log line; the client only ever sees the generic message.
    #[error("Internal server error")]
    Internal(String),
}

impl ApiError {
    /// Wraps an unexpected lower-level error, preserving its text for the log.
    pub fn internal(err: impl std::fmt::Display) -> Self {
        ApiError::Internal(err.to_string())
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::CredentialsTaken => StatusCode::FORBIDDEN,
            ApiError::CredentialsInvalid => StatusCode::FORBIDDEN,
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::AccessDenied => StatusCode::FORBIDDEN,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<RepoError> for ApiError {
    /// Default translation for store failures reaching the boundary: any
    /// repository error that was not explicitly handled by a service (signup's
    /// uniqueness check) is unexpected and must surface as a 500.
    fn from(err: RepoError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

/// ErrorBody
///
/// The JSON shape of every error response: a stable, per-condition message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if let ApiError::Internal(detail) = &self {
            // The detail stays in the log; the client gets the generic body.
            tracing::error!("internal error: {detail}");
        }
        let body = ErrorBody {
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
