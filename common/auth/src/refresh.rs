use axum::response::{IntoResponse, Response};
use common_http_errors::ApiError;
use thiserror::Error;
use tracing::debug;

use crate::codec::TokenCodec;
use crate::config::TokenPolicies;
use crate::error::{AuthError, TokenRejection};

#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("refresh token is required")]
    Missing,
    #[error("refresh token rejected: {0}")]
    Rejected(TokenRejection),
    #[error(transparent)]
    Issue(#[from] AuthError),
}

impl From<RefreshError> for ApiError {
    fn from(value: RefreshError) -> Self {
        match value {
            RefreshError::Missing => {
                ApiError::validation("refresh_token_required", "refresh token is required")
            }
            RefreshError::Rejected(_) => ApiError::unauthorized(
                "invalid_refresh_token",
                "invalid refresh token or token expired",
            ),
            RefreshError::Issue(err) => ApiError::from(err),
        }
    }
}

impl IntoResponse for RefreshError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}

/// Trade a refresh token for a new access token carrying the same principal.
/// The refresh token itself is left untouched and stays valid until it expires.
pub fn renew(
    codec: &TokenCodec,
    policies: &TokenPolicies,
    refresh_token: Option<&str>,
) -> Result<String, RefreshError> {
    let token = refresh_token
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(RefreshError::Missing)?;

    let principal = codec
        .verify(token, &policies.refresh)
        .map_err(|rejection| {
            debug!(?rejection, "refresh token rejected");
            RefreshError::Rejected(rejection)
        })?;

    Ok(codec.issue(&principal, &policies.access)?)
}
