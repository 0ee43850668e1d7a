//! Tag repository
//!
//! Database operations for tags and the article↔tag association table
//! (`relevance`).

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::Tag;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlConnection, MySqlPool, Row, SqliteConnection, SqlitePool};
use std::sync::Arc;

/// Tag repository trait
#[async_trait]
pub trait TagRepository: Send + Sync {
    async fn create(&self, tag: &Tag) -> Result<Tag>;

    async fn get_by_id(&self, id: &str) -> Result<Option<Tag>>;

    async fn get_by_name(&self, name: &str) -> Result<Option<Tag>>;

    /// All tags, most used first
    async fn list(&self) -> Result<Vec<Tag>>;

    /// Tags associated with an article, ordered by name
    async fn get_by_article_id(&self, article_id: &str) -> Result<Vec<Tag>>;

    /// Rename a tag. Returns `None` when the id is unknown.
    async fn rename(&self, id: &str, name: &str) -> Result<Option<Tag>>;

    /// Delete a tag and, by cascade, its associations.
    /// Returns `false` when the id is unknown.
    async fn delete(&self, id: &str) -> Result<bool>;
}

/// SQLx-based tag repository implementation
pub struct SqlxTagRepository {
    pool: DynDatabasePool,
}

impl SqlxTagRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn TagRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl TagRepository for SqlxTagRepository {
    async fn create(&self, tag: &Tag) -> Result<Tag> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_tag_sqlite(self.pool.sqlite()?, tag).await,
            DatabaseDriver::Mysql => create_tag_mysql(self.pool.mysql()?, tag).await,
        }
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Tag>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_tag_by_sqlite(self.pool.sqlite()?, "id", id).await,
            DatabaseDriver::Mysql => get_tag_by_mysql(self.pool.mysql()?, "id", id).await,
        }
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<Tag>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_tag_by_sqlite(self.pool.sqlite()?, "name", name).await,
            DatabaseDriver::Mysql => get_tag_by_mysql(self.pool.mysql()?, "name", name).await,
        }
    }

    async fn list(&self) -> Result<Vec<Tag>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_tags_sqlite(self.pool.sqlite()?).await,
            DatabaseDriver::Mysql => list_tags_mysql(self.pool.mysql()?).await,
        }
    }

    async fn get_by_article_id(&self, article_id: &str) -> Result<Vec<Tag>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let mut conn = self.pool.sqlite()?.acquire().await?;
                tags_for_article_sqlite(&mut conn, article_id).await
            }
            DatabaseDriver::Mysql => {
                let mut conn = self.pool.mysql()?.acquire().await?;
                tags_for_article_mysql(&mut conn, article_id).await
            }
        }
    }

    async fn rename(&self, id: &str, name: &str) -> Result<Option<Tag>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => rename_tag_sqlite(self.pool.sqlite()?, id, name).await,
            DatabaseDriver::Mysql => rename_tag_mysql(self.pool.mysql()?, id, name).await,
        }
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => delete_tag_sqlite(self.pool.sqlite()?, id).await,
            DatabaseDriver::Mysql => delete_tag_mysql(self.pool.mysql()?, id).await,
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_tag_sqlite(pool: &SqlitePool, tag: &Tag) -> Result<Tag> {
    sqlx::query("INSERT INTO tag (id, name, count) VALUES (?, ?, ?)")
        .bind(&tag.id)
        .bind(&tag.name)
        .bind(tag.count)
        .execute(pool)
        .await
        .context("Failed to create tag")?;

    Ok(tag.clone())
}

// `column` is always one of the literals passed by the trait impl.
async fn get_tag_by_sqlite(pool: &SqlitePool, column: &str, value: &str) -> Result<Option<Tag>> {
    let sql = format!("SELECT id, name, count FROM tag WHERE {} = ?", column);
    let row = sqlx::query(&sql)
        .bind(value)
        .fetch_optional(pool)
        .await
        .with_context(|| format!("Failed to get tag by {}", column))?;

    Ok(row.map(|row| row_to_tag_sqlite(&row)))
}

async fn list_tags_sqlite(pool: &SqlitePool) -> Result<Vec<Tag>> {
    let rows = sqlx::query("SELECT id, name, count FROM tag ORDER BY count DESC, name")
        .fetch_all(pool)
        .await
        .context("Failed to list tags")?;

    Ok(rows.iter().map(row_to_tag_sqlite).collect())
}

/// Tags joined through `relevance` on an open connection or transaction
pub async fn tags_for_article_sqlite(conn: &mut SqliteConnection, article_id: &str) -> Result<Vec<Tag>> {
    let rows = sqlx::query(
        r#"
        SELECT t.id, t.name, t.count
        FROM tag t
        INNER JOIN relevance r ON t.id = r.tag_id
        WHERE r.article_id = ?
        ORDER BY t.name
        "#,
    )
    .bind(article_id)
    .fetch_all(&mut *conn)
    .await
    .context("Failed to get tags for article")?;

    Ok(rows.iter().map(row_to_tag_sqlite).collect())
}

async fn rename_tag_sqlite(pool: &SqlitePool, id: &str, name: &str) -> Result<Option<Tag>> {
    let result = sqlx::query("UPDATE tag SET name = ? WHERE id = ?")
        .bind(name)
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to rename tag")?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }
    get_tag_by_sqlite(pool, "id", id).await
}

async fn delete_tag_sqlite(pool: &SqlitePool, id: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM tag WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete tag")?;

    Ok(result.rows_affected() > 0)
}

/// Insert one association row inside the caller's transaction
pub async fn link_tag_sqlite(conn: &mut SqliteConnection, article_id: &str, tag_id: &str) -> Result<()> {
    sqlx::query("INSERT INTO relevance (article_id, tag_id) VALUES (?, ?)")
        .bind(article_id)
        .bind(tag_id)
        .execute(&mut *conn)
        .await
        .with_context(|| format!("Failed to link tag {} to article {}", tag_id, article_id))?;

    Ok(())
}

/// Remove every association of an article inside the caller's transaction
pub async fn unlink_all_tags_sqlite(conn: &mut SqliteConnection, article_id: &str) -> Result<u64> {
    let result = sqlx::query("DELETE FROM relevance WHERE article_id = ?")
        .bind(article_id)
        .execute(&mut *conn)
        .await
        .with_context(|| format!("Failed to unlink tags of article {}", article_id))?;

    Ok(result.rows_affected())
}

/// Apply `count = count + delta` inside the caller's transaction
pub async fn adjust_tag_count_sqlite(conn: &mut SqliteConnection, id: &str, delta: i64) -> Result<u64> {
    let result = sqlx::query("UPDATE tag SET count = count + ? WHERE id = ?")
        .bind(delta)
        .bind(id)
        .execute(&mut *conn)
        .await
        .with_context(|| format!("Failed to adjust count of tag {}", id))?;

    Ok(result.rows_affected())
}

fn row_to_tag_sqlite(row: &sqlx::sqlite::SqliteRow) -> Tag {
    Tag {
        id: row.get("id"),
        name: row.get("name"),
        count: row.get("count"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_tag_mysql(pool: &MySqlPool, tag: &Tag) -> Result<Tag> {
    sqlx::query("INSERT INTO tag (id, name, count) VALUES (?, ?, ?)")
        .bind(&tag.id)
        .bind(&tag.name)
        .bind(tag.count)
        .execute(pool)
        .await
        .context("Failed to create tag")?;

    Ok(tag.clone())
}

async fn get_tag_by_mysql(pool: &MySqlPool, column: &str, value: &str) -> Result<Option<Tag>> {
    let sql = format!("SELECT id, name, count FROM tag WHERE {} = ?", column);
    let row = sqlx::query(&sql)
        .bind(value)
        .fetch_optional(pool)
        .await
        .with_context(|| format!("Failed to get tag by {}", column))?;

    Ok(row.map(|row| row_to_tag_mysql(&row)))
}

async fn list_tags_mysql(pool: &MySqlPool) -> Result<Vec<Tag>> {
    let rows = sqlx::query("SELECT id, name, count FROM tag ORDER BY count DESC, name")
        .fetch_all(pool)
        .await
        .context("Failed to list tags")?;

    Ok(rows.iter().map(row_to_tag_mysql).collect())
}

/// Tags joined through `relevance` on an open connection or transaction
pub async fn tags_for_article_mysql(conn: &mut MySqlConnection, article_id: &str) -> Result<Vec<Tag>> {
    let rows = sqlx::query(
        r#"
        SELECT t.id, t.name, t.count
        FROM tag t
        INNER JOIN relevance r ON t.id = r.tag_id
        WHERE r.article_id = ?
        ORDER BY t.name
        "#,
    )
    .bind(article_id)
    .fetch_all(&mut *conn)
    .await
    .context("Failed to get tags for article")?;

    Ok(rows.iter().map(row_to_tag_mysql).collect())
}

async fn rename_tag_mysql(pool: &MySqlPool, id: &str, name: &str) -> Result<Option<Tag>> {
    sqlx::query("UPDATE tag SET name = ? WHERE id = ?")
        .bind(name)
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to rename tag")?;

    get_tag_by_mysql(pool, "id", id).await
}

async fn delete_tag_mysql(pool: &MySqlPool, id: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM tag WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete tag")?;

    Ok(result.rows_affected() > 0)
}

pub async fn link_tag_mysql(conn: &mut MySqlConnection, article_id: &str, tag_id: &str) -> Result<()> {
    sqlx::query("INSERT INTO relevance (article_id, tag_id) VALUES (?, ?)")
        .bind(article_id)
        .bind(tag_id)
        .execute(&mut *conn)
        .await
        .with_context(|| format!("Failed to link tag {} to article {}", tag_id, article_id))?;

    Ok(())
}

pub async fn unlink_all_tags_mysql(conn: &mut MySqlConnection, article_id: &str) -> Result<u64> {
    let result = sqlx::query("DELETE FROM relevance WHERE article_id = ?")
        .bind(article_id)
        .execute(&mut *conn)
        .await
        .with_context(|| format!("Failed to unlink tags of article {}", article_id))?;

    Ok(result.rows_affected())
}

pub async fn adjust_tag_count_mysql(conn: &mut MySqlConnection, id: &str, delta: i64) -> Result<u64> {
    let result = sqlx::query("UPDATE tag SET count = count + ? WHERE id = ?")
        .bind(delta)
        .bind(id)
        .execute(&mut *conn)
        .await
        .with_context(|| format!("Failed to adjust count of tag {}", id))?;

    Ok(result.rows_affected())
}

fn row_to_tag_mysql(row: &sqlx::mysql::MySqlRow) -> Tag {
    Tag {
        id: row.get("id"),
        name: row.get("name"),
        count: row.get("count"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_repo() -> (DynDatabasePool, SqlxTagRepository) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let repo = SqlxTagRepository::new(pool.clone());
        (pool, repo)
    }

    async fn insert_article(pool: &SqlitePool, id: &str) {
        sqlx::query(
            "INSERT INTO article (id, title, content, category_id, created_at, updated_at) \
             VALUES (?, 'title', 'content', 'cat', '2024-01-01T00:00:00Z', '2024-01-01T00:00:00Z')",
        )
        .bind(id)
        .execute(pool)
        .await
        .expect("Failed to insert article");
    }

    #[tokio::test]
    async fn test_create_and_lookup_tag() {
        let (_pool, repo) = setup_test_repo().await;

        repo.create(&Tag::new("t1".into(), "async".into())).await.unwrap();

        assert_eq!(repo.get_by_id("t1").await.unwrap().unwrap().name, "async");
        assert_eq!(repo.get_by_name("async").await.unwrap().unwrap().id, "t1");
        assert!(repo.get_by_id("t2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_tag_name_rejected() {
        let (_pool, repo) = setup_test_repo().await;

        repo.create(&Tag::new("t1".into(), "async".into())).await.unwrap();
        assert!(repo.create(&Tag::new("t2".into(), "async".into())).await.is_err());
    }

    #[tokio::test]
    async fn test_get_by_article_id_orders_by_name() {
        let (pool, repo) = setup_test_repo().await;
        let sqlite_pool = pool.as_sqlite().unwrap();

        repo.create(&Tag::new("t1".into(), "zeta".into())).await.unwrap();
        repo.create(&Tag::new("t2".into(), "alpha".into())).await.unwrap();
        repo.create(&Tag::new("t3".into(), "unused".into())).await.unwrap();
        insert_article(sqlite_pool, "a1").await;

        let mut conn = sqlite_pool.acquire().await.unwrap();
        link_tag_sqlite(&mut conn, "a1", "t1").await.unwrap();
        link_tag_sqlite(&mut conn, "a1", "t2").await.unwrap();
        drop(conn);

        let names: Vec<String> = repo
            .get_by_article_id("a1")
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["alpha", "zeta"]);

        assert!(repo.get_by_article_id("nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_link_unknown_tag_fails() {
        let (pool, _repo) = setup_test_repo().await;
        let sqlite_pool = pool.as_sqlite().unwrap();
        insert_article(sqlite_pool, "a1").await;

        let mut conn = sqlite_pool.acquire().await.unwrap();
        assert!(link_tag_sqlite(&mut conn, "a1", "missing").await.is_err());
    }

    #[tokio::test]
    async fn test_delete_tag_removes_associations() {
        let (pool, repo) = setup_test_repo().await;
        let sqlite_pool = pool.as_sqlite().unwrap();

        repo.create(&Tag::new("t1".into(), "async".into())).await.unwrap();
        insert_article(sqlite_pool, "a1").await;

        let mut conn = sqlite_pool.acquire().await.unwrap();
        link_tag_sqlite(&mut conn, "a1", "t1").await.unwrap();
        drop(conn);

        assert!(repo.delete("t1").await.unwrap());
        assert!(repo.get_by_article_id("a1").await.unwrap().is_empty());
        assert!(!repo.delete("t1").await.unwrap());
    }

    #[tokio::test]
    async fn test_unlink_all_and_adjust_count() {
        let (pool, repo) = setup_test_repo().await;
        let sqlite_pool = pool.as_sqlite().unwrap();

        repo.create(&Tag::new("t1".into(), "async".into())).await.unwrap();
        repo.create(&Tag::new("t2".into(), "sync".into())).await.unwrap();
        insert_article(sqlite_pool, "a1").await;

        let mut conn = sqlite_pool.acquire().await.unwrap();
        link_tag_sqlite(&mut conn, "a1", "t1").await.unwrap();
        link_tag_sqlite(&mut conn, "a1", "t2").await.unwrap();
        assert_eq!(unlink_all_tags_sqlite(&mut conn, "a1").await.unwrap(), 2);
        assert_eq!(adjust_tag_count_sqlite(&mut conn, "t1", 3).await.unwrap(), 1);
        assert_eq!(adjust_tag_count_sqlite(&mut conn, "nope", 1).await.unwrap(), 0);
        drop(conn);

        assert_eq!(repo.get_by_id("t1").await.unwrap().unwrap().count, 3);
    }

    #[tokio::test]
    async fn test_rename_tag() {
        let (_pool, repo) = setup_test_repo().await;
        repo.create(&Tag::new("t1".into(), "async".into())).await.unwrap();

        assert_eq!(repo.rename("t1", "tokio").await.unwrap().unwrap().name, "tokio");
        assert!(repo.rename("t9", "x").await.unwrap().is_none());
    }
}
