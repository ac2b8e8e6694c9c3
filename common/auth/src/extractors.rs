use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{FromRef, FromRequestParts};
use axum::http::{header::AUTHORIZATION, request::Parts, HeaderMap};
use tracing::debug;

use crate::claims::Principal;
use crate::codec::TokenCodec;
use crate::config::TokenPolicy;
use crate::error::{AuthError, AuthResult, TokenRejection};

/// Checks the `Authorization` header of a request against the access policy.
#[derive(Clone)]
pub struct AuthGate {
    codec: TokenCodec,
    access: TokenPolicy,
}

impl AuthGate {
    pub fn new(codec: TokenCodec, access: TokenPolicy) -> Self {
        Self { codec, access }
    }

    pub fn check(&self, headers: &HeaderMap) -> AuthResult<AuthContext> {
        let Some(value) = headers.get(AUTHORIZATION) else {
            return Err(AuthError::MissingAuthorization);
        };
        if value.as_bytes().iter().all(u8::is_ascii_whitespace) {
            return Err(AuthError::MissingAuthorization);
        }

        let token = value
            .to_str()
            .map(extract_token)
            .map_err(|_| AuthError::InvalidAccessToken(TokenRejection::Malformed))?;

        match self.codec.verify(token, &self.access) {
            Ok(principal) => Ok(AuthContext {
                principal,
                token: token.to_owned(),
            }),
            Err(rejection) => {
                if rejection == TokenRejection::Expired {
                    let subject = self
                        .codec
                        .decode_unchecked(token, &self.access)
                        .map(|principal| principal.id);
                    debug!(?rejection, ?subject, "access token rejected");
                } else {
                    debug!(?rejection, "access token rejected");
                }
                Err(AuthError::InvalidAccessToken(rejection))
            }
        }
    }
}

/// The verified caller of a protected route.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub principal: Principal,
    pub token: String,
}

impl AuthContext {
    pub fn into_principal(self) -> Principal {
        self.principal
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    Arc<AuthGate>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let gate = Arc::<AuthGate>::from_ref(state);
        gate.check(&parts.headers)
    }
}

/// Clients send either `Bearer <token>` or the bare token.
fn extract_token(raw: &str) -> &str {
    let raw = raw.trim();
    match raw.split_once(' ') {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest.trim(),
        _ => raw,
    }
}
