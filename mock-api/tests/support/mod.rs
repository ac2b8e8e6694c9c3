use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::{TimeZone, Utc};
use common_auth::{ManualClock, TokenCodec};
use http_body_util::BodyExt;
use mock_api::articles::ArticleRepository;
use mock_api::config::{config_from_lookup, ServerConfig};
use mock_api::credentials::{CredentialVerifier, InMemoryCredentialStore};
use mock_api::{build_router, AppState};
use serde_json::Value;
use tower::ServiceExt;

pub struct TestApp {
    pub router: Router,
    pub clock: ManualClock,
    pub state: AppState,
}

#[allow(dead_code)]
pub fn test_config(overrides: &[(&str, &str)]) -> Result<ServerConfig> {
    let map: HashMap<String, String> = overrides
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    config_from_lookup(|key| map.get(key).cloned())
}

impl TestApp {
    pub async fn spawn() -> Result<Self> {
        Self::spawn_with(&[]).await
    }

    pub async fn spawn_with(overrides: &[(&str, &str)]) -> Result<Self> {
        let config = test_config(overrides)?;
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        let codec = TokenCodec::new(Arc::new(clock.clone()));

        let credentials = CredentialVerifier::new(Arc::new(InMemoryCredentialStore::new()))?;
        credentials.seed_default_admin().await?;

        let state = AppState::new(config, codec, credentials, ArticleRepository::seeded())?;
        let router = build_router(state.clone());
        Ok(Self {
            router,
            clock,
            state,
        })
    }

    pub async fn send(&self, request: Request<Body>) -> Result<(StatusCode, Value)> {
        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let bytes = response.into_body().collect().await?.to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)?
        };
        Ok((status, body))
    }

    #[allow(dead_code)]
    pub async fn get_text(&self, uri: &str) -> Result<String> {
        let response = self
            .router
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty())?)
            .await?;
        let bytes = response.into_body().collect().await?.to_bytes();
        Ok(String::from_utf8(bytes.to_vec())?)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> Result<(StatusCode, Value)> {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        self.send(builder.body(Body::empty())?).await
    }

    pub async fn post_json(
        &self,
        uri: &str,
        token: Option<&str>,
        body: &Value,
    ) -> Result<(StatusCode, Value)> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        self.send(builder.body(Body::from(body.to_string()))?).await
    }

    /// Logs in as the seeded admin and returns (access, refresh).
    #[allow(dead_code)]
    pub async fn login_admin(&self) -> Result<(String, String)> {
        let (status, body) = self
            .post_json(
                "/api/login",
                None,
                &serde_json::json!({
                    "account": "admin@example.com",
                    "password": "e10adc3949ba59abbe56e057f20f883e"
                }),
            )
            .await?;
        anyhow::ensure!(status == StatusCode::OK, "login failed: {body}");
        let access = body["data"]["accessToken"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("missing accessToken"))?
            .to_string();
        let refresh = body["data"]["refreshToken"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("missing refreshToken"))?
            .to_string();
        Ok((access, refresh))
    }
}
