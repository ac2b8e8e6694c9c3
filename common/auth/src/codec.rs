use std::sync::Arc;

use jsonwebtoken::errors::{Error as JwtError, ErrorKind};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use tracing::debug;

use crate::claims::{Principal, TokenClaims};
use crate::clock::{Clock, SystemClock};
use crate::config::TokenPolicy;
use crate::error::{AuthError, AuthResult, TokenRejection};

/// Issues and verifies signed tokens. Holds no keys of its own: every call
/// names the policy it signs or verifies under.
#[derive(Clone)]
pub struct TokenCodec {
    clock: Arc<dyn Clock>,
}

impl Default for TokenCodec {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl TokenCodec {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    pub fn issue(&self, principal: &Principal, policy: &TokenPolicy) -> AuthResult<String> {
        let issued_at = self.clock.now().timestamp();
        let expires_at = issued_at.checked_add(policy.ttl_seconds()).ok_or_else(|| {
            AuthError::InvalidPolicy(format!(
                "{} token expiry overflows",
                policy.class().as_str()
            ))
        })?;
        let claims = TokenClaims {
            principal: principal.clone(),
            iat: issued_at,
            exp: expires_at,
        };

        let header = Header::new(policy.algorithm());
        encode(&header, &claims, &EncodingKey::from_secret(policy.secret()))
            .map_err(|err| AuthError::Signing(err.to_string()))
    }

    /// Accepts the token only if the signature checks out under `policy` and
    /// the codec's clock is strictly before the embedded expiry.
    pub fn verify(&self, token: &str, policy: &TokenPolicy) -> Result<Principal, TokenRejection> {
        let mut validation = Validation::new(policy.algorithm());
        validation.leeway = 0;
        // Expiry is compared against our own clock below.
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp"]);

        let data = decode::<TokenClaims>(
            token,
            &DecodingKey::from_secret(policy.secret()),
            &validation,
        )
        .map_err(|err| classify(&err))?;

        if self.clock.now().timestamp() >= data.claims.exp {
            return Err(TokenRejection::Expired);
        }

        debug!(class = policy.class().as_str(), subject = %data.claims.principal.id, "verified token");
        Ok(data.claims.principal)
    }

    /// Reads the claims without checking signature or expiry. Never use the
    /// result to grant access.
    pub fn decode_unchecked(&self, token: &str, policy: &TokenPolicy) -> Option<Principal> {
        let mut validation = Validation::new(policy.algorithm());
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        decode::<TokenClaims>(
            token,
            &DecodingKey::from_secret(policy.secret()),
            &validation,
        )
        .ok()
        .map(|data| data.claims.principal)
    }
}

fn classify(err: &JwtError) -> TokenRejection {
    match err.kind() {
        ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => TokenRejection::BadSignature,
        ErrorKind::ExpiredSignature => TokenRejection::Expired,
        _ => TokenRejection::Malformed,
    }
}
