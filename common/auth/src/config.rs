use std::fmt;

use jsonwebtoken::Algorithm;

use crate::error::{AuthError, AuthResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenClass {
    Access,
    Refresh,
}

impl TokenClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenClass::Access => "access",
            TokenClass::Refresh => "refresh",
        }
    }
}

/// Upper bound on any token lifetime: ten years.
pub const MAX_TTL_SECONDS: i64 = 10 * 365 * 86_400;

/// Signing configuration for one token class.
#[derive(Clone)]
pub struct TokenPolicy {
    class: TokenClass,
    secret: Vec<u8>,
    algorithm: Algorithm,
    ttl_seconds: i64,
}

impl TokenPolicy {
    pub fn new(
        class: TokenClass,
        secret: impl Into<Vec<u8>>,
        algorithm: Algorithm,
        ttl_seconds: i64,
    ) -> AuthResult<Self> {
        let secret = secret.into();
        if secret.is_empty() {
            return Err(AuthError::InvalidPolicy(format!(
                "{} token secret must not be empty",
                class.as_str()
            )));
        }
        if ttl_seconds <= 0 {
            return Err(AuthError::InvalidPolicy(format!(
                "{} token ttl must be positive, got {ttl_seconds}",
                class.as_str()
            )));
        }
        if ttl_seconds > MAX_TTL_SECONDS {
            return Err(AuthError::InvalidPolicy(format!(
                "{} token ttl {ttl_seconds}s exceeds the {MAX_TTL_SECONDS}s ceiling",
                class.as_str()
            )));
        }
        if !matches!(algorithm, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512) {
            return Err(AuthError::InvalidPolicy(format!(
                "unsupported signing algorithm {algorithm:?}; use HS256, HS384 or HS512"
            )));
        }
        Ok(Self {
            class,
            secret,
            algorithm,
            ttl_seconds,
        })
    }

    pub fn class(&self) -> TokenClass {
        self.class
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn ttl_seconds(&self) -> i64 {
        self.ttl_seconds
    }

    pub(crate) fn secret(&self) -> &[u8] {
        &self.secret
    }
}

impl fmt::Debug for TokenPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPolicy")
            .field("class", &self.class)
            .field("secret", &"<redacted>")
            .field("algorithm", &self.algorithm)
            .field("ttl_seconds", &self.ttl_seconds)
            .finish()
    }
}

/// The access/refresh pair. Construction fails when both classes share a
/// secret, since that would let one class be replayed as the other.
#[derive(Debug, Clone)]
pub struct TokenPolicies {
    pub access: TokenPolicy,
    pub refresh: TokenPolicy,
}

impl TokenPolicies {
    pub fn new(access: TokenPolicy, refresh: TokenPolicy) -> AuthResult<Self> {
        if access.class != TokenClass::Access || refresh.class != TokenClass::Refresh {
            return Err(AuthError::InvalidPolicy(
                "policies passed in the wrong class slots".to_string(),
            ));
        }
        if access.secret == refresh.secret {
            return Err(AuthError::InvalidPolicy(
                "access and refresh tokens must use distinct secrets".to_string(),
            ));
        }
        Ok(Self { access, refresh })
    }
}

/// Parse a TTL such as `10s`, `15m`, `12h`, `7d` or a bare number of seconds.
pub fn parse_ttl(value: &str) -> AuthResult<i64> {
    let trimmed = value.trim();
    let split = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    let (digits, unit) = trimmed.split_at(split);
    let amount: i64 = digits
        .parse()
        .map_err(|_| AuthError::InvalidPolicy(format!("invalid ttl '{value}'")))?;
    let multiplier = match unit.trim() {
        "" | "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        "d" => 24 * 60 * 60,
        other => {
            return Err(AuthError::InvalidPolicy(format!(
                "unknown ttl unit '{other}' in '{value}'"
            )))
        }
    };
    amount
        .checked_mul(multiplier)
        .ok_or_else(|| AuthError::InvalidPolicy(format!("ttl '{value}' overflows")))
}

pub fn parse_algorithm(value: &str) -> AuthResult<Algorithm> {
    match value.trim().to_ascii_uppercase().as_str() {
        "HS256" => Ok(Algorithm::HS256),
        "HS384" => Ok(Algorithm::HS384),
        "HS512" => Ok(Algorithm::HS512),
        other => Err(AuthError::InvalidPolicy(format!(
            "unsupported signing algorithm '{other}'"
        ))),
    }
}
