use serde::{Deserialize, Serialize};

/// Identity carried inside every token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: String,
    pub username: String,
    pub email: String,
}

/// Full JWT payload: the principal plus issued-at and expiry, in seconds since
/// the Unix epoch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct TokenClaims {
    #[serde(flatten)]
    pub principal: Principal,
    pub iat: i64,
    pub exp: i64,
}
