use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

pub const SEED_ARTICLE_COUNT: usize = 50;
const DEFAULT_PAGE_SIZE: usize = 10;
const MAX_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: String,
    pub title: String,
    pub author: String,
    pub content: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Deserialize)]
pub struct NewArticle {
    pub title: String,
    pub author: String,
    pub content: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ArticlePatch {
    pub title: Option<String>,
    pub author: Option<String>,
    pub content: Option<String>,
}

impl ArticlePatch {
    fn is_empty(&self) -> bool {
        self.title.is_none() && self.author.is_none() && self.content.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: usize,
    pub limit: usize,
}

impl Pagination {
    /// Lenient parsing: anything missing or unparsable falls back to page 1
    /// with the default size, and the size is capped.
    pub fn from_query(page: Option<&str>, limit: Option<&str>) -> Self {
        let page = page
            .and_then(|raw| raw.trim().parse::<usize>().ok())
            .filter(|value| *value > 0)
            .unwrap_or(1);
        let limit = limit
            .and_then(|raw| raw.trim().parse::<usize>().ok())
            .filter(|value| *value > 0)
            .map(|value| value.min(MAX_PAGE_SIZE))
            .unwrap_or(DEFAULT_PAGE_SIZE);
        Self { page, limit }
    }

    fn offset(&self) -> usize {
        (self.page - 1).saturating_mul(self.limit)
    }
}

#[derive(Debug, Serialize)]
pub struct ArticlePage {
    pub count: usize,
    pub rows: Vec<Article>,
}

#[derive(Clone, Default)]
pub struct ArticleRepository {
    inner: Arc<RwLock<Vec<Article>>>,
}

impl ArticleRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seeded() -> Self {
        let now = timestamp();
        let rows = (1..=SEED_ARTICLE_COUNT)
            .map(|n| Article {
                id: Uuid::new_v4().to_string(),
                title: format!("Sample Article {n}"),
                author: format!("Author {n}"),
                content: format!("This is the content of article {n}"),
                created_at: now.clone(),
                updated_at: now.clone(),
            })
            .collect();
        Self {
            inner: Arc::new(RwLock::new(rows)),
        }
    }

    pub async fn list(&self, pagination: Pagination) -> ArticlePage {
        let guard = self.inner.read().await;
        let rows = guard
            .iter()
            .skip(pagination.offset())
            .take(pagination.limit)
            .cloned()
            .collect();
        ArticlePage {
            count: guard.len(),
            rows,
        }
    }

    pub async fn create(&self, new: NewArticle) -> Article {
        let now = timestamp();
        let article = Article {
            id: Uuid::new_v4().to_string(),
            title: new.title,
            author: new.author,
            content: new.content,
            created_at: now.clone(),
            updated_at: now,
        };
        self.inner.write().await.push(article.clone());
        article
    }

    /// Returns `None` when no article has that id.
    pub async fn update(&self, id: &str, patch: ArticlePatch) -> Option<Article> {
        let mut guard = self.inner.write().await;
        let article = guard.iter_mut().find(|article| article.id == id)?;
        if patch.is_empty() {
            return Some(article.clone());
        }
        if let Some(title) = patch.title {
            article.title = title;
        }
        if let Some(author) = patch.author {
            article.author = author;
        }
        if let Some(content) = patch.content {
            article.content = content;
        }
        article.updated_at = timestamp();
        Some(article.clone())
    }

    pub async fn delete(&self, id: &str) -> bool {
        let mut guard = self.inner.write().await;
        let before = guard.len();
        guard.retain(|article| article.id != id);
        guard.len() != before
    }
}

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_defaults_and_caps() {
        assert_eq!(Pagination::from_query(None, None), Pagination { page: 1, limit: 10 });
        assert_eq!(
            Pagination::from_query(Some("3"), Some("500")),
            Pagination { page: 3, limit: 100 }
        );
        assert_eq!(
            Pagination::from_query(Some("0"), Some("abc")),
            Pagination { page: 1, limit: 10 }
        );
    }

    #[tokio::test]
    async fn seeded_catalogue_pages() {
        let repo = ArticleRepository::seeded();
        let page = repo.list(Pagination { page: 5, limit: 10 }).await;
        assert_eq!(page.count, SEED_ARTICLE_COUNT);
        assert_eq!(page.rows.len(), 10);
        assert_eq!(page.rows[0].title, "Sample Article 41");

        let past_end = repo.list(Pagination { page: 6, limit: 10 }).await;
        assert!(past_end.rows.is_empty());
    }

    #[tokio::test]
    async fn create_update_delete() {
        let repo = ArticleRepository::new();
        let created = repo
            .create(NewArticle {
                title: "t".to_string(),
                author: "a".to_string(),
                content: "c".to_string(),
            })
            .await;

        let updated = repo
            .update(
                &created.id,
                ArticlePatch {
                    title: Some("new title".to_string()),
                    ..ArticlePatch::default()
                },
            )
            .await
            .expect("article exists");
        assert_eq!(updated.title, "new title");
        assert_eq!(updated.author, "a");

        assert!(repo.update("missing", ArticlePatch::default()).await.is_none());
        assert!(repo.delete(&created.id).await);
        assert!(!repo.delete(&created.id).await);
    }
}
