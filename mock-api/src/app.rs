use std::fmt::Display;
use std::sync::Arc;

use anyhow::Result;
use axum::extract::{FromRef, State};
use axum::response::Response;
use axum::routing::{get, patch, post};
use axum::Router;
use common_auth::{AuthGate, TokenCodec};
use common_http_errors::{success, ApiError, ApiResult, Success};
use tower_http::cors::CorsLayer;
use tracing::error;

use crate::article_handlers::{create_article, delete_article, list_articles, update_article};
use crate::articles::ArticleRepository;
use crate::config::ServerConfig;
use crate::credentials::CredentialVerifier;
use crate::metrics::AuthMetrics;
use crate::user_handlers::{login_user, refresh_access_token};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub codec: TokenCodec,
    pub gate: Arc<AuthGate>,
    pub credentials: CredentialVerifier,
    pub articles: ArticleRepository,
    pub metrics: Arc<AuthMetrics>,
}

impl FromRef<AppState> for Arc<AuthGate> {
    fn from_ref(state: &AppState) -> Self {
        state.gate.clone()
    }
}

impl AppState {
    pub fn new(
        config: ServerConfig,
        codec: TokenCodec,
        credentials: CredentialVerifier,
        articles: ArticleRepository,
    ) -> Result<Self> {
        let gate = AuthGate::new(codec.clone(), config.tokens.access.clone());
        Ok(Self {
            config: Arc::new(config),
            codec,
            gate: Arc::new(gate),
            credentials,
            articles,
            metrics: Arc::new(AuthMetrics::new()?),
        })
    }

    /// Logs an unexpected fault and turns it into a 500 envelope.
    pub fn internal_error<E: Display>(&self, context: &str, err: E) -> ApiError {
        error!(error = %err, "{context}");
        ApiError::internal(err, self.config.expose_error_detail())
    }
}

async fn health() -> Success<&'static str> {
    success("OK")
}

async fn metrics_endpoint(State(state): State<AppState>) -> ApiResult<Response> {
    state
        .metrics
        .render()
        .map_err(|err| state.internal_error("failed to render metrics", err))
}

pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/login", post(login_user))
        .route("/refresh_access_token", get(refresh_access_token))
        .route("/refresh-access-token", get(refresh_access_token))
        .route("/articles", get(list_articles).post(create_article))
        .route("/articles/:id", patch(update_article).delete(delete_article));

    let root = Router::new()
        .route("/", get(health))
        .route("/metrics", get(metrics_endpoint));

    let prefix = state.config.prefix.clone();
    let enable_cors = state.config.enable_cors;

    let routes = if prefix.is_empty() {
        root.merge(api)
    } else {
        root.nest(&prefix, api)
    };
    let app = routes.with_state(state);

    if enable_cors {
        app.layer(CorsLayer::permissive())
    } else {
        app
    }
}
