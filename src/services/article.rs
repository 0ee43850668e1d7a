//! Article service
//!
//! Business rules in front of the article aggregate store:
//! - title, content and category are required on create and update
//! - ids are caller-assigned or generated as UUIDs
//! - tag lists are de-duplicated before they reach the store
//! - timestamps are stamped here; counters are maintained by the store
//!   inside the write transaction

use crate::db::repositories::ArticleRepository;
use crate::models::{Article, CreateArticleInput, ListParams, PagedResult, UpdateArticleInput};
use anyhow::Context;
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

/// Widths of the `article` columns that callers fill in
const MAX_ID_LENGTH: usize = 64;
const MAX_TITLE_LENGTH: usize = 255;
const MAX_COVER_IMAGE_LENGTH: usize = 512;

/// Error types for article service operations
#[derive(Debug, thiserror::Error)]
pub enum ArticleServiceError {
    #[error("Article not found: {0}")]
    NotFound(String),

    /// Rejected before anything is written
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Storage failure; the enclosing transaction has been rolled back
    #[error("Persistence error: {0}")]
    PersistenceError(#[from] anyhow::Error),
}

/// Article service for managing blog articles
pub struct ArticleService {
    repo: Arc<dyn ArticleRepository>,
}

impl ArticleService {
    pub fn new(repo: Arc<dyn ArticleRepository>) -> Self {
        Self { repo }
    }

    /// Create an article and bump its category and tag counters.
    ///
    /// # Errors
    /// - `ValidationError` if title, content or category is blank, or a
    ///   field is wider than its column
    /// - `PersistenceError` for a duplicate id, an unknown tag, or any
    ///   other storage failure
    pub async fn create(&self, input: CreateArticleInput) -> Result<Article, ArticleServiceError> {
        validate_fields(&input.title, &input.content, &input.category_id, &input.cover_image)?;
        check_length("author id", &input.author_id, MAX_ID_LENGTH)?;

        let id = match input.id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => Uuid::new_v4().to_string(),
        };
        check_length("id", &id, MAX_ID_LENGTH)?;

        let mut article = Article::new(id, input.title, input.content, input.category_id);
        article.excerpt = input.excerpt;
        article.cover_image = input.cover_image;
        article.author_id = input.author_id;
        article.published = input.published;

        let tag_ids = dedupe_tag_ids(input.tags);
        let created = self
            .repo
            .create(&article, &tag_ids)
            .await
            .with_context(|| format!("Failed to create article {}", article.id))?;

        tracing::debug!(
            article_id = %created.id,
            category_id = %created.category_id,
            tags = tag_ids.len(),
            "Article created"
        );
        Ok(created)
    }

    /// Get an article with its category and tags
    pub async fn get(&self, id: &str) -> Result<Article, ArticleServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get article")?
            .ok_or_else(|| ArticleServiceError::NotFound(id.to_string()))
    }

    /// Full-replace update.
    ///
    /// Views, likes, author and creation time are kept from the stored row;
    /// `updated_at` is stamped now.
    pub async fn update(&self, input: UpdateArticleInput) -> Result<Article, ArticleServiceError> {
        let id = input.id.trim().to_string();
        if id.is_empty() {
            return Err(ArticleServiceError::ValidationError(
                "Article id is required".to_string(),
            ));
        }
        check_length("id", &id, MAX_ID_LENGTH)?;
        validate_fields(&input.title, &input.content, &input.category_id, &input.cover_image)?;

        let mut article = Article::new(id, input.title, input.content, input.category_id);
        article.excerpt = input.excerpt;
        article.cover_image = input.cover_image;
        article.published = input.published;
        article.updated_at = Utc::now();

        let tag_ids = dedupe_tag_ids(input.tags);
        let updated = self
            .repo
            .update(&article, &tag_ids)
            .await
            .with_context(|| format!("Failed to update article {}", article.id))?
            .ok_or_else(|| ArticleServiceError::NotFound(article.id.clone()))?;

        tracing::debug!(article_id = %updated.id, "Article updated");
        Ok(updated)
    }

    /// Hard delete; the article's counters are retracted
    pub async fn delete(&self, id: &str) -> Result<(), ArticleServiceError> {
        let removed = self
            .repo
            .delete(id)
            .await
            .with_context(|| format!("Failed to delete article {}", id))?
            .ok_or_else(|| ArticleServiceError::NotFound(id.to_string()))?;

        tracing::debug!(article_id = %removed.id, "Article deleted");
        Ok(())
    }

    /// Published articles, newest first
    pub async fn list(&self, params: &ListParams) -> Result<PagedResult<Article>, ArticleServiceError> {
        let list = self
            .repo
            .list_published(params.offset(), params.limit())
            .await
            .context("Failed to list articles")?;
        let total = self
            .repo
            .count_published()
            .await
            .context("Failed to count articles")?;

        Ok(PagedResult::new(list, total, params))
    }

    pub async fn list_by_category(
        &self,
        category_id: &str,
        params: &ListParams,
    ) -> Result<PagedResult<Article>, ArticleServiceError> {
        let list = self
            .repo
            .list_by_category(category_id, params.offset(), params.limit())
            .await
            .context("Failed to list articles by category")?;
        let total = self
            .repo
            .count_by_category(category_id)
            .await
            .context("Failed to count articles by category")?;

        Ok(PagedResult::new(list, total, params))
    }

    pub async fn list_by_tag(
        &self,
        tag_id: &str,
        params: &ListParams,
    ) -> Result<PagedResult<Article>, ArticleServiceError> {
        let list = self
            .repo
            .list_by_tag(tag_id, params.offset(), params.limit())
            .await
            .context("Failed to list articles by tag")?;
        let total = self
            .repo
            .count_by_tag(tag_id)
            .await
            .context("Failed to count articles by tag")?;

        Ok(PagedResult::new(list, total, params))
    }
}

fn validate_fields(
    title: &str,
    content: &str,
    category_id: &str,
    cover_image: &str,
) -> Result<(), ArticleServiceError> {
    if title.trim().is_empty() {
        return Err(ArticleServiceError::ValidationError(
            "Article title cannot be empty".to_string(),
        ));
    }
    if content.trim().is_empty() {
        return Err(ArticleServiceError::ValidationError(
            "Article content cannot be empty".to_string(),
        ));
    }
    if category_id.trim().is_empty() {
        return Err(ArticleServiceError::ValidationError(
            "Article category is required".to_string(),
        ));
    }
    check_length("title", title, MAX_TITLE_LENGTH)?;
    check_length("category id", category_id, MAX_ID_LENGTH)?;
    check_length("cover image", cover_image, MAX_COVER_IMAGE_LENGTH)
}

fn check_length(field: &str, value: &str, max: usize) -> Result<(), ArticleServiceError> {
    if value.chars().count() > max {
        return Err(ArticleServiceError::ValidationError(format!(
            "Article {} cannot exceed {} characters",
            field, max
        )));
    }
    Ok(())
}

/// Drop blank and repeated tag ids, keeping first-seen order
fn dedupe_tag_ids(tags: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    tags.into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty() && seen.insert(t.clone()))
        .collect()
}
