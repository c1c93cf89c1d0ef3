//! Authentication error types.

use axum::response::{IntoResponse, Response};

use crate::api::ApiError;

/// Why the auth extractor rejected a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorKind {
    /// No `Authorization: Bearer ...` header
    MissingToken,
    /// Bad signature, malformed payload, wrong token type or lapsed expiry
    InvalidToken,
    InsufficientRole,
}

/// Rejection from the `Auth` extractor. Renders as the standard error body.
#[derive(Debug)]
pub struct ApiAuthError {
    pub kind: AuthErrorKind,
}

impl ApiAuthError {
    pub(super) fn new(kind: AuthErrorKind) -> Self {
        Self { kind }
    }
}

impl From<ApiAuthError> for ApiError {
    fn from(err: ApiAuthError) -> Self {
        match err.kind {
            AuthErrorKind::MissingToken => ApiError::unauthorized("Authentication required"),
            AuthErrorKind::InvalidToken => ApiError::token_expired("Invalid or expired token"),
            AuthErrorKind::InsufficientRole => ApiError::forbidden("Insufficient permissions"),
        }
    }
}

impl IntoResponse for ApiAuthError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}
