use anyhow::{anyhow, Context, Result};
use common_auth::{parse_algorithm, parse_ttl, TokenClass, TokenPolicies, TokenPolicy};
use std::env;
use std::net::{IpAddr, SocketAddr};

const DEFAULT_ACCESS_SECRET: &str = "mock-access-token-secret";
const DEFAULT_REFRESH_SECRET: &str = "mock-refresh-token-secret";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Production,
}

impl AppEnvironment {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppEnvironment::Development => "development",
            AppEnvironment::Production => "production",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
    /// Mount point of the API routes; empty means the root.
    pub prefix: String,
    pub enable_cors: bool,
    pub environment: AppEnvironment,
    pub tokens: TokenPolicies,
    pub database_url: Option<String>,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::from((self.host, self.port))
    }

    pub fn expose_error_detail(&self) -> bool {
        self.environment == AppEnvironment::Development
    }
}

pub fn load_server_config() -> Result<ServerConfig> {
    config_from_lookup(|key| env::var(key).ok())
}

/// Builds the configuration from any key lookup; the process environment in
/// production, a map in tests.
pub fn config_from_lookup<F>(lookup: F) -> Result<ServerConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let host = lookup("HOST")
        .and_then(|value| normalize_optional(&value))
        .unwrap_or_else(|| "0.0.0.0".to_string());
    let host: IpAddr = host
        .parse()
        .with_context(|| format!("Failed to parse HOST '{host}'"))?;

    let port = match lookup("APP_PORT").and_then(|value| normalize_optional(&value)) {
        Some(raw) => raw
            .parse::<u16>()
            .with_context(|| format!("Failed to parse APP_PORT '{raw}'"))?,
        None => 3000,
    };

    let prefix = normalize_prefix(lookup("API_PREFIX").as_deref().unwrap_or("/api"));
    let enable_cors = lookup("ENABLE_CORS")
        .map(|value| is_truthy(&value))
        .unwrap_or(true);

    let environment = match lookup("APP_ENV")
        .map(|value| value.trim().to_ascii_lowercase())
        .as_deref()
    {
        Some("development") | Some("dev") => AppEnvironment::Development,
        Some("production") | Some("prod") | Some("") | None => AppEnvironment::Production,
        Some(other) => {
            return Err(anyhow!(
                "Unsupported APP_ENV '{other}'. Use development or production."
            ))
        }
    };

    let algorithm = parse_algorithm(lookup("TOKEN_ALGORITHM").as_deref().unwrap_or("HS256"))
        .context("Failed to parse TOKEN_ALGORITHM")?;

    let access_secret = lookup("ACCESS_TOKEN_SECRET")
        .and_then(|value| normalize_optional(&value))
        .unwrap_or_else(|| DEFAULT_ACCESS_SECRET.to_string());
    let access_ttl = parse_ttl(lookup("ACCESS_TOKEN_TTL").as_deref().unwrap_or("10s"))
        .context("Failed to parse ACCESS_TOKEN_TTL")?;
    let refresh_secret = lookup("REFRESH_TOKEN_SECRET")
        .and_then(|value| normalize_optional(&value))
        .unwrap_or_else(|| DEFAULT_REFRESH_SECRET.to_string());
    let refresh_ttl = parse_ttl(lookup("REFRESH_TOKEN_TTL").as_deref().unwrap_or("7d"))
        .context("Failed to parse REFRESH_TOKEN_TTL")?;

    let tokens = TokenPolicies::new(
        TokenPolicy::new(TokenClass::Access, access_secret, algorithm, access_ttl)?,
        TokenPolicy::new(TokenClass::Refresh, refresh_secret, algorithm, refresh_ttl)?,
    )
    .context("Invalid token configuration")?;

    let database_url = lookup("DATABASE_URL").and_then(|value| normalize_optional(&value));

    Ok(ServerConfig {
        host,
        port,
        prefix,
        enable_cors,
        environment,
        tokens,
        database_url,
    })
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn normalize_optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn normalize_prefix(value: &str) -> String {
    let trimmed = value.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<ServerConfig> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        config_from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_match_mock_server() {
        let config = config_from(&[]).expect("defaults load");
        assert_eq!(config.port, 3000);
        assert_eq!(config.prefix, "/api");
        assert!(config.enable_cors);
        assert_eq!(config.environment, AppEnvironment::Production);
        assert_eq!(config.tokens.access.ttl_seconds(), 10);
        assert_eq!(config.tokens.refresh.ttl_seconds(), 7 * 24 * 60 * 60);
        assert!(config.database_url.is_none());
        assert!(!config.expose_error_detail());
    }

    #[test]
    fn overrides_are_applied() {
        let config = config_from(&[
            ("APP_PORT", "8080"),
            ("API_PREFIX", "v1/"),
            ("ENABLE_CORS", "off"),
            ("APP_ENV", "Development"),
            ("ACCESS_TOKEN_TTL", "15m"),
            ("TOKEN_ALGORITHM", "hs512"),
            ("DATABASE_URL", " postgres://localhost/mock "),
        ])
        .expect("overrides load");
        assert_eq!(config.port, 8080);
        assert_eq!(config.prefix, "/v1");
        assert!(!config.enable_cors);
        assert!(config.expose_error_detail());
        assert_eq!(config.tokens.access.ttl_seconds(), 900);
        assert_eq!(config.tokens.access.algorithm(), common_auth::Algorithm::HS512);
        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/mock"));
    }

    #[test]
    fn shared_secret_is_rejected() {
        let err = config_from(&[
            ("ACCESS_TOKEN_SECRET", "one-secret"),
            ("REFRESH_TOKEN_SECRET", "one-secret"),
        ])
        .expect_err("shared secret must fail");
        assert!(format!("{err:#}").contains("distinct secrets"));
    }

    #[test]
    fn oversized_ttl_fails_at_startup() {
        let err = config_from(&[("REFRESH_TOKEN_TTL", "9223372036854775807")])
            .expect_err("i64::MAX ttl must fail");
        assert!(format!("{err:#}").contains("ceiling"));
    }

    #[test]
    fn root_prefix_normalises_to_empty() {
        assert_eq!(normalize_prefix("/"), "");
        assert_eq!(normalize_prefix(""), "");
        assert_eq!(normalize_prefix("/api"), "/api");
    }

    #[test]
    fn truthy_values() {
        assert!(is_truthy("YES"));
        assert!(is_truthy(" 1 "));
        assert!(!is_truthy("no"));
    }
}
