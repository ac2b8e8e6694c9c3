use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::Json;
use common_auth::{renew, Principal, RefreshError};
use common_http_errors::{success, ApiError, ApiResult, Success};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::AppState;

const INVALID_CREDENTIALS: &str = "invalid email or password";

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(alias = "email")]
    pub account: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    #[serde(flatten)]
    pub user: Principal,
    pub access_token: String,
    pub refresh_token: String,
}

pub async fn login_user(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Success<LoginResponse>> {
    let Json(LoginRequest { account, password }) = payload.map_err(|rejection| {
        debug!(error = %rejection, "login body rejected");
        ApiError::validation("invalid_request_body", "invalid request body")
    })?;

    let principal = match state.credentials.authenticate(&account, &password).await {
        Ok(Some(principal)) => principal,
        Ok(None) => {
            state.metrics.login_attempt("invalid_credentials");
            warn!(account = %account.trim(), "login rejected");
            return Err(ApiError::unauthorized(
                "invalid_credentials",
                INVALID_CREDENTIALS,
            ));
        }
        Err(err) => {
            state.metrics.login_attempt("error");
            return Err(state.internal_error("credential check failed", err));
        }
    };

    let tokens = &state.config.tokens;
    let issued = state
        .codec
        .issue(&principal, &tokens.access)
        .and_then(|access| {
            state
                .codec
                .issue(&principal, &tokens.refresh)
                .map(|refresh| (access, refresh))
        });
    let (access_token, refresh_token) = match issued {
        Ok(pair) => pair,
        Err(err) => {
            state.metrics.login_attempt("error");
            return Err(state.internal_error("failed to issue tokens", err));
        }
    };

    state.metrics.login_attempt("success");
    info!(user_id = %principal.id, "login succeeded");

    Ok(success(LoginResponse {
        user: principal,
        access_token,
        refresh_token,
    }))
}

#[derive(Debug, Deserialize)]
pub struct RefreshQuery {
    #[serde(rename = "refreshToken")]
    pub refresh_token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
}

pub async fn refresh_access_token(
    State(state): State<AppState>,
    query: Result<Query<RefreshQuery>, QueryRejection>,
) -> ApiResult<Success<RefreshResponse>> {
    let Query(query) = query.map_err(|rejection| {
        debug!(error = %rejection, "refresh query rejected");
        state.metrics.token_refresh("invalid_request");
        ApiError::validation("invalid_request_query", "invalid request query")
    })?;
    match renew(
        &state.codec,
        &state.config.tokens,
        query.refresh_token.as_deref(),
    ) {
        Ok(access_token) => {
            state.metrics.token_refresh("success");
            Ok(success(RefreshResponse { access_token }))
        }
        Err(RefreshError::Issue(err)) => {
            state.metrics.token_refresh("error");
            Err(state.internal_error("failed to issue access token", err))
        }
        Err(err) => {
            let outcome = match err {
                RefreshError::Missing => "missing",
                _ => "rejected",
            };
            state.metrics.token_refresh(outcome);
            Err(ApiError::from(err))
        }
    }
}
