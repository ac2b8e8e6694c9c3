pub mod claims;
pub mod clock;
pub mod codec;
pub mod config;
pub mod error;
pub mod extractors;
pub mod refresh;

pub use claims::Principal;
pub use clock::{Clock, ManualClock, SystemClock};
pub use codec::TokenCodec;
pub use config::{
    parse_algorithm, parse_ttl, TokenClass, TokenPolicies, TokenPolicy, MAX_TTL_SECONDS,
};
pub use error::{AuthError, AuthResult, TokenRejection};
pub use extractors::{AuthContext, AuthGate};
pub use jsonwebtoken::Algorithm;
pub use refresh::{renew, RefreshError};
