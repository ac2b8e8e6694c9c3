use axum::response::{IntoResponse, Response};
use common_http_errors::ApiError;
use thiserror::Error;

pub type AuthResult<T> = Result<T, AuthError>;

/// Why a presented token was not accepted. Callers log the variant but show
/// the client a single generic message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenRejection {
    #[error("token expired")]
    Expired,
    #[error("token signature does not verify")]
    BadSignature,
    #[error("token is malformed")]
    Malformed,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("authorization header missing")]
    MissingAuthorization,
    #[error("access token rejected: {0}")]
    InvalidAccessToken(TokenRejection),
    #[error("failed to sign token: {0}")]
    Signing(String),
    #[error("invalid token policy: {0}")]
    InvalidPolicy(String),
}

pub(crate) const LOGIN_REQUIRED: &str = "please login first";
pub(crate) const INVALID_ACCESS_TOKEN: &str = "invalid access token or token expired";

impl From<AuthError> for ApiError {
    fn from(value: AuthError) -> Self {
        match value {
            AuthError::MissingAuthorization => ApiError::unauthorized("login_required", LOGIN_REQUIRED),
            AuthError::InvalidAccessToken(_) => {
                ApiError::unauthorized("invalid_access_token", INVALID_ACCESS_TOKEN)
            }
            other @ (AuthError::Signing(_) | AuthError::InvalidPolicy(_)) => {
                ApiError::internal(other, false)
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}
