//! Category service
//!
//! Business rules for categories:
//! - names are required, unique, and at most 100 characters
//! - ids are caller-assigned or generated
//! - counters belong to the article write path and are never set here
//! - a category that articles still reference cannot be deleted

use crate::db::repositories::CategoryRepository;
use crate::models::{Category, CreateCategoryInput, UpdateCategoryInput};
use anyhow::Context;
use std::sync::Arc;
use uuid::Uuid;

const MAX_NAME_LENGTH: usize = 100;

/// Error types for category service operations
#[derive(Debug, thiserror::Error)]
pub enum CategoryServiceError {
    #[error("Category name already exists: {0}")]
    DuplicateName(String),

    #[error("Category not found: {0}")]
    NotFound(String),

    /// Articles still reference the category
    #[error("Category {0} is still used by {1} article(s)")]
    InUse(String, i64),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Category service for managing blog categories
pub struct CategoryService {
    repo: Arc<dyn CategoryRepository>,
}

impl CategoryService {
    pub fn new(repo: Arc<dyn CategoryRepository>) -> Self {
        Self { repo }
    }

    /// All categories, most used first
    pub async fn list(&self) -> Result<Vec<Category>, CategoryServiceError> {
        Ok(self.repo.list().await.context("Failed to list categories")?)
    }

    pub async fn get(&self, id: &str) -> Result<Category, CategoryServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get category")?
            .ok_or_else(|| CategoryServiceError::NotFound(id.to_string()))
    }

    /// Create a category. Articles already filed under the id are counted.
    ///
    /// # Errors
    /// - `ValidationError` for a blank or overlong name
    /// - `DuplicateName` if the name or id is taken
    pub async fn create(&self, input: CreateCategoryInput) -> Result<Category, CategoryServiceError> {
        let name = validate_name(&input.name)?;

        if self
            .repo
            .get_by_name(&name)
            .await
            .context("Failed to check name uniqueness")?
            .is_some()
        {
            return Err(CategoryServiceError::DuplicateName(name));
        }

        let id = match input.id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => Uuid::new_v4().to_string(),
        };

        if self
            .repo
            .get_by_id(&id)
            .await
            .context("Failed to check id uniqueness")?
            .is_some()
        {
            return Err(CategoryServiceError::DuplicateName(format!("id {}", id)));
        }

        let created = self
            .repo
            .create(&Category::new(id, name))
            .await
            .context("Failed to create category")?;

        tracing::debug!(category_id = %created.id, "Category created");
        Ok(created)
    }

    /// Rename a category
    pub async fn rename(&self, id: &str, input: UpdateCategoryInput) -> Result<Category, CategoryServiceError> {
        let name = validate_name(&input.name)?;

        if let Some(existing) = self
            .repo
            .get_by_name(&name)
            .await
            .context("Failed to check name uniqueness")?
        {
            if existing.id != id {
                return Err(CategoryServiceError::DuplicateName(name));
            }
        }

        self.repo
            .rename(id, &name)
            .await
            .context("Failed to rename category")?
            .ok_or_else(|| CategoryServiceError::NotFound(id.to_string()))
    }

    /// Delete an unused category.
    ///
    /// The store only deletes a row whose count is zero, so a refusal is
    /// told apart from an unknown id by reading the row back.
    pub async fn delete(&self, id: &str) -> Result<(), CategoryServiceError> {
        if self.repo.delete(id).await.context("Failed to delete category")? {
            tracing::debug!(category_id = %id, "Category deleted");
            return Ok(());
        }

        let category = self.get(id).await?;
        Err(CategoryServiceError::InUse(category.id, category.count))
    }
}

fn validate_name(raw: &str) -> Result<String, CategoryServiceError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(CategoryServiceError::ValidationError(
            "Category name cannot be empty".to_string(),
        ));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(CategoryServiceError::ValidationError(format!(
            "Category name cannot exceed {} characters",
            MAX_NAME_LENGTH
        )));
    }
    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{ArticleRepository, SqlxArticleRepository, SqlxCategoryRepository};
    use crate::db::{create_test_pool, migrations, DynDatabasePool};
    use crate::models::Article;

    async fn setup_test_service() -> (DynDatabasePool, CategoryService) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let service = CategoryService::new(SqlxCategoryRepository::boxed(pool.clone()));
        (pool, service)
    }

    fn input(id: Option<&str>, name: &str) -> CreateCategoryInput {
        CreateCategoryInput {
            id: id.map(str::to_string),
            name: name.to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_generates_id_when_missing() {
        let (_pool, service) = setup_test_service().await;

        let generated = service.create(input(None, "Rust")).await.unwrap();
        assert!(Uuid::parse_str(&generated.id).is_ok());
        assert_eq!(generated.count, 0);

        let blank = service.create(input(Some("  "), "Go")).await.unwrap();
        assert!(Uuid::parse_str(&blank.id).is_ok());

        let explicit = service.create(input(Some("cat-life"), "Life")).await.unwrap();
        assert_eq!(explicit.id, "cat-life");
    }

    #[tokio::test]
    async fn test_create_validates_name() {
        let (_pool, service) = setup_test_service().await;

        assert!(matches!(
            service.create(input(None, "   ")).await,
            Err(CategoryServiceError::ValidationError(_))
        ));
        assert!(matches!(
            service.create(input(None, &"x".repeat(101))).await,
            Err(CategoryServiceError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_create_duplicate_name_or_id() {
        let (_pool, service) = setup_test_service().await;
        service.create(input(Some("c1"), "Rust")).await.unwrap();

        assert!(matches!(
            service.create(input(None, "Rust")).await,
            Err(CategoryServiceError::DuplicateName(_))
        ));
        assert!(matches!(
            service.create(input(Some("c1"), "Other")).await,
            Err(CategoryServiceError::DuplicateName(_))
        ));
    }

    #[tokio::test]
    async fn test_rename() {
        let (_pool, service) = setup_test_service().await;
        service.create(input(Some("c1"), "Rust")).await.unwrap();
        service.create(input(Some("c2"), "Go")).await.unwrap();

        let renamed = service
            .rename("c1", UpdateCategoryInput { name: "Rustlang".into() })
            .await
            .unwrap();
        assert_eq!(renamed.name, "Rustlang");

        // Renaming to its own name is allowed
        assert!(service
            .rename("c1", UpdateCategoryInput { name: "Rustlang".into() })
            .await
            .is_ok());

        assert!(matches!(
            service.rename("c1", UpdateCategoryInput { name: "Go".into() }).await,
            Err(CategoryServiceError::DuplicateName(_))
        ));
        assert!(matches!(
            service.rename("nope", UpdateCategoryInput { name: "New".into() }).await,
            Err(CategoryServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_refuses_category_in_use() {
        let (pool, service) = setup_test_service().await;
        service.create(input(Some("c1"), "Rust")).await.unwrap();

        sqlx::query("UPDATE category SET count = 2 WHERE id = 'c1'")
            .execute(pool.as_sqlite().unwrap())
            .await
            .unwrap();

        assert!(matches!(
            service.delete("c1").await,
            Err(CategoryServiceError::InUse(_, 2))
        ));
        assert!(service.get("c1").await.is_ok());
    }

    #[tokio::test]
    async fn test_delete_refuses_category_with_earlier_articles() {
        let (pool, service) = setup_test_service().await;
        let articles = SqlxArticleRepository::new(pool.clone());
        let article = Article::new(
            "a1".to_string(),
            "Title".to_string(),
            "Body".to_string(),
            "c1".to_string(),
        );
        articles.create(&article, &[]).await.unwrap();

        let created = service.create(input(Some("c1"), "Rust")).await.unwrap();
        assert_eq!(created.count, 1);
        assert!(matches!(
            service.delete("c1").await,
            Err(CategoryServiceError::InUse(_, 1))
        ));

        articles.delete("a1").await.unwrap();
        service.delete("c1").await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_unused_and_missing() {
        let (_pool, service) = setup_test_service().await;
        service.create(input(Some("c1"), "Rust")).await.unwrap();

        service.delete("c1").await.unwrap();
        assert!(matches!(service.get("c1").await, Err(CategoryServiceError::NotFound(_))));
        assert!(matches!(service.delete("c1").await, Err(CategoryServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_orders_by_count() {
        let (pool, service) = setup_test_service().await;
        service.create(input(Some("c1"), "Alpha")).await.unwrap();
        service.create(input(Some("c2"), "Beta")).await.unwrap();

        sqlx::query("UPDATE category SET count = 5 WHERE id = 'c2'")
            .execute(pool.as_sqlite().unwrap())
            .await
            .unwrap();

        let ids: Vec<String> = service.list().await.unwrap().into_iter().map(|c| c.id).collect();
        assert_eq!(ids, vec!["c2", "c1"]);
    }
}
