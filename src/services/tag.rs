//! Tag service
//!
//! Tags share the category rules except on delete: removing a tag drops its
//! article associations along with it.

use crate::db::repositories::TagRepository;
use crate::models::{CreateTagInput, Tag, UpdateTagInput};
use anyhow::Context;
use std::sync::Arc;
use uuid::Uuid;

const MAX_NAME_LENGTH: usize = 50;

/// Error types for tag service operations
#[derive(Debug, thiserror::Error)]
pub enum TagServiceError {
    #[error("Tag name already exists: {0}")]
    DuplicateName(String),

    #[error("Tag not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Tag service for managing blog tags
pub struct TagService {
    repo: Arc<dyn TagRepository>,
}

impl TagService {
    pub fn new(repo: Arc<dyn TagRepository>) -> Self {
        Self { repo }
    }

    pub async fn list(&self) -> Result<Vec<Tag>, TagServiceError> {
        Ok(self.repo.list().await.context("Failed to list tags")?)
    }

    pub async fn get(&self, id: &str) -> Result<Tag, TagServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get tag")?
            .ok_or_else(|| TagServiceError::NotFound(id.to_string()))
    }

    pub async fn create(&self, input: CreateTagInput) -> Result<Tag, TagServiceError> {
        let name = validate_name(&input.name)?;

        if self
            .repo
            .get_by_name(&name)
            .await
            .context("Failed to check name uniqueness")?
            .is_some()
        {
            return Err(TagServiceError::DuplicateName(name));
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
            return Err(TagServiceError::DuplicateName(format!("id {}", id)));
        }

        let created = self
            .repo
            .create(&Tag::new(id, name))
            .await
            .context("Failed to create tag")?;

        tracing::debug!(tag_id = %created.id, "Tag created");
        Ok(created)
    }

    pub async fn rename(&self, id: &str, input: UpdateTagInput) -> Result<Tag, TagServiceError> {
        let name = validate_name(&input.name)?;

        if let Some(existing) = self
            .repo
            .get_by_name(&name)
            .await
            .context("Failed to check name uniqueness")?
        {
            if existing.id != id {
                return Err(TagServiceError::DuplicateName(name));
            }
        }

        self.repo
            .rename(id, &name)
            .await
            .context("Failed to rename tag")?
            .ok_or_else(|| TagServiceError::NotFound(id.to_string()))
    }

    /// Delete a tag and its article associations
    pub async fn delete(&self, id: &str) -> Result<(), TagServiceError> {
        if !self.repo.delete(id).await.context("Failed to delete tag")? {
            return Err(TagServiceError::NotFound(id.to_string()));
        }
        tracing::debug!(tag_id = %id, "Tag deleted");
        Ok(())
    }
}

fn validate_name(raw: &str) -> Result<String, TagServiceError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(TagServiceError::ValidationError("Tag name cannot be empty".to_string()));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(TagServiceError::ValidationError(format!(
            "Tag name cannot exceed {} characters",
            MAX_NAME_LENGTH
        )));
    }
    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::SqlxTagRepository;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_service() -> TagService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        TagService::new(SqlxTagRepository::boxed(pool))
    }

    fn input(id: Option<&str>, name: &str) -> CreateTagInput {
        CreateTagInput {
            id: id.map(str::to_string),
            name: name.to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let service = setup_test_service().await;

        let tag = service.create(input(Some("t1"), "  async  ")).await.unwrap();
        assert_eq!(tag.name, "async");
        assert_eq!(tag.count, 0);
        assert_eq!(service.get("t1").await.unwrap(), tag);

        let generated = service.create(input(None, "tokio")).await.unwrap();
        assert!(Uuid::parse_str(&generated.id).is_ok());
    }

    #[tokio::test]
    async fn test_create_rejects_bad_names() {
        let service = setup_test_service().await;
        service.create(input(Some("t1"), "async")).await.unwrap();

        assert!(matches!(
            service.create(input(None, "")).await,
            Err(TagServiceError::ValidationError(_))
        ));
        assert!(matches!(
            service.create(input(None, &"t".repeat(51))).await,
            Err(TagServiceError::ValidationError(_))
        ));
        assert!(matches!(
            service.create(input(None, "async")).await,
            Err(TagServiceError::DuplicateName(_))
        ));
    }

    #[tokio::test]
    async fn test_rename_conflicts() {
        let service = setup_test_service().await;
        service.create(input(Some("t1"), "async")).await.unwrap();
        service.create(input(Some("t2"), "sync")).await.unwrap();

        assert!(matches!(
            service.rename("t1", UpdateTagInput { name: "sync".into() }).await,
            Err(TagServiceError::DuplicateName(_))
        ));

        let renamed = service
            .rename("t1", UpdateTagInput { name: "futures".into() })
            .await
            .unwrap();
        assert_eq!(renamed.name, "futures");
    }

    #[tokio::test]
    async fn test_delete() {
        let service = setup_test_service().await;
        service.create(input(Some("t1"), "async")).await.unwrap();

        service.delete("t1").await.unwrap();
        assert!(matches!(service.get("t1").await, Err(TagServiceError::NotFound(_))));
        assert!(matches!(service.delete("t1").await, Err(TagServiceError::NotFound(_))));
    }
}
