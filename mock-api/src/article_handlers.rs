use std::collections::HashMap;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::Json;
use common_auth::AuthContext;
use common_http_errors::{success, ApiError, ApiResult, Success};
use serde_json::{json, Value};
use tracing::info;

use crate::articles::{Article, ArticlePage, ArticlePatch, NewArticle, Pagination};
use crate::AppState;

pub async fn list_articles(
    State(state): State<AppState>,
    _auth: AuthContext,
    Query(params): Query<HashMap<String, String>>,
) -> Success<ArticlePage> {
    let pagination = Pagination::from_query(
        params.get("page").map(String::as_str),
        params.get("limit").map(String::as_str),
    );
    success(state.articles.list(pagination).await)
}

pub async fn create_article(
    State(state): State<AppState>,
    auth: AuthContext,
    payload: Result<Json<NewArticle>, JsonRejection>,
) -> ApiResult<Success<Article>> {
    let Json(new_article) = payload
        .map_err(|_| ApiError::validation("invalid_article", "title, author and content are required"))?;
    if new_article.title.trim().is_empty() {
        return Err(ApiError::validation("invalid_article", "title must not be empty"));
    }

    let article = state.articles.create(new_article).await;
    info!(article_id = %article.id, user_id = %auth.principal.id, "article created");
    Ok(success(article))
}

pub async fn update_article(
    State(state): State<AppState>,
    _auth: AuthContext,
    Path(id): Path<String>,
    payload: Result<Json<ArticlePatch>, JsonRejection>,
) -> ApiResult<Success<Option<Article>>> {
    let Json(patch) = payload
        .map_err(|_| ApiError::validation("invalid_article", "invalid article payload"))?;
    Ok(success(state.articles.update(&id, patch).await))
}

pub async fn delete_article(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> Success<Value> {
    if state.articles.delete(&id).await {
        info!(article_id = %id, user_id = %auth.principal.id, "article deleted");
    }
    success(json!({ "id": id }))
}
