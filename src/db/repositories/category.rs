//! Category repository
//!
//! Database operations for categories.
//!
//! This module provides:
//! - `CategoryRepository` trait defining the interface for category data access
//! - `SqlxCategoryRepository` implementing the trait for SQLite and MySQL
//! - connection-level helpers the article write path calls inside its
//!   transaction (`find_category_*`, `adjust_category_count_*`)

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::Category;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlConnection, MySqlPool, Row, SqliteConnection, SqlitePool};
use std::sync::Arc;

/// Category repository trait
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// Insert a category. Its count starts at the number of articles that
    /// already reference the id.
    async fn create(&self, category: &Category) -> Result<Category>;

    async fn get_by_id(&self, id: &str) -> Result<Option<Category>>;

    async fn get_by_name(&self, name: &str) -> Result<Option<Category>>;

    /// All categories, most used first
    async fn list(&self) -> Result<Vec<Category>>;

    /// Rename a category. Returns `None` when the id is unknown.
    async fn rename(&self, id: &str, name: &str) -> Result<Option<Category>>;

    /// Delete a category only while no article references it.
    ///
    /// Returns `false` when nothing was deleted: the id is unknown or the
    /// count is above zero.
    async fn delete(&self, id: &str) -> Result<bool>;
}

/// SQLx-based category repository implementation
pub struct SqlxCategoryRepository {
    pool: DynDatabasePool,
}

impl SqlxCategoryRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CategoryRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CategoryRepository for SqlxCategoryRepository {
    async fn create(&self, category: &Category) -> Result<Category> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_category_sqlite(self.pool.sqlite()?, category).await,
            DatabaseDriver::Mysql => create_category_mysql(self.pool.mysql()?, category).await,
        }
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Category>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let mut conn = self.pool.sqlite()?.acquire().await?;
                find_category_sqlite(&mut conn, id).await
            }
            DatabaseDriver::Mysql => {
                let mut conn = self.pool.mysql()?.acquire().await?;
                find_category_mysql(&mut conn, id).await
            }
        }
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<Category>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_category_by_name_sqlite(self.pool.sqlite()?, name).await,
            DatabaseDriver::Mysql => get_category_by_name_mysql(self.pool.mysql()?, name).await,
        }
    }

    async fn list(&self) -> Result<Vec<Category>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_categories_sqlite(self.pool.sqlite()?).await,
            DatabaseDriver::Mysql => list_categories_mysql(self.pool.mysql()?).await,
        }
    }

    async fn rename(&self, id: &str, name: &str) -> Result<Option<Category>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => rename_category_sqlite(self.pool.sqlite()?, id, name).await,
            DatabaseDriver::Mysql => rename_category_mysql(self.pool.mysql()?, id, name).await,
        }
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => delete_category_sqlite(self.pool.sqlite()?, id).await,
            DatabaseDriver::Mysql => delete_category_mysql(self.pool.mysql()?, id).await,
        }
    }
}

// Articles filed under an id before the category existed skipped their
// increment, so the new row starts from their number.
const SEEDED_INSERT: &str = r#"
    INSERT INTO category (id, name, count)
    SELECT ?, ?, COUNT(*) FROM article WHERE category_id = ?
"#;

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_category_sqlite(pool: &SqlitePool, category: &Category) -> Result<Category> {
    sqlx::query(SEEDED_INSERT)
        .bind(&category.id)
        .bind(&category.name)
        .bind(&category.id)
        .execute(pool)
        .await
        .context("Failed to create category")?;

    let mut conn = pool.acquire().await?;
    find_category_sqlite(&mut conn, &category.id)
        .await?
        .context("Category missing after insert")
}

/// Look up a category on an open connection or transaction
pub async fn find_category_sqlite(conn: &mut SqliteConnection, id: &str) -> Result<Option<Category>> {
    let row = sqlx::query("SELECT id, name, count FROM category WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .context("Failed to get category by ID")?;

    Ok(row.map(|row| row_to_category_sqlite(&row)))
}

async fn get_category_by_name_sqlite(pool: &SqlitePool, name: &str) -> Result<Option<Category>> {
    let row = sqlx::query("SELECT id, name, count FROM category WHERE name = ?")
        .bind(name)
        .fetch_optional(pool)
        .await
        .context("Failed to get category by name")?;

    Ok(row.map(|row| row_to_category_sqlite(&row)))
}

async fn list_categories_sqlite(pool: &SqlitePool) -> Result<Vec<Category>> {
    let rows = sqlx::query("SELECT id, name, count FROM category ORDER BY count DESC, name")
        .fetch_all(pool)
        .await
        .context("Failed to list categories")?;

    Ok(rows.iter().map(row_to_category_sqlite).collect())
}

async fn rename_category_sqlite(pool: &SqlitePool, id: &str, name: &str) -> Result<Option<Category>> {
    let result = sqlx::query("UPDATE category SET name = ? WHERE id = ?")
        .bind(name)
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to rename category")?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }

    let mut conn = pool.acquire().await?;
    find_category_sqlite(&mut conn, id).await
}

async fn delete_category_sqlite(pool: &SqlitePool, id: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM category WHERE id = ? AND count = 0")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete category")?;

    Ok(result.rows_affected() > 0)
}

/// Apply `count = count + delta` inside the caller's transaction.
///
/// Returns the number of rows touched; zero means the category is missing.
pub async fn adjust_category_count_sqlite(
    conn: &mut SqliteConnection,
    id: &str,
    delta: i64,
) -> Result<u64> {
    let result = sqlx::query("UPDATE category SET count = count + ? WHERE id = ?")
        .bind(delta)
        .bind(id)
        .execute(&mut *conn)
        .await
        .with_context(|| format!("Failed to adjust count of category {}", id))?;

    Ok(result.rows_affected())
}

fn row_to_category_sqlite(row: &sqlx::sqlite::SqliteRow) -> Category {
    Category {
        id: row.get("id"),
        name: row.get("name"),
        count: row.get("count"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_category_mysql(pool: &MySqlPool, category: &Category) -> Result<Category> {
    sqlx::query(SEEDED_INSERT)
        .bind(&category.id)
        .bind(&category.name)
        .bind(&category.id)
        .execute(pool)
        .await
        .context("Failed to create category")?;

    let mut conn = pool.acquire().await?;
    find_category_mysql(&mut conn, &category.id)
        .await?
        .context("Category missing after insert")
}

/// Look up a category on an open connection or transaction
pub async fn find_category_mysql(conn: &mut MySqlConnection, id: &str) -> Result<Option<Category>> {
    let row = sqlx::query("SELECT id, name, count FROM category WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .context("Failed to get category by ID")?;

    Ok(row.map(|row| row_to_category_mysql(&row)))
}

async fn get_category_by_name_mysql(pool: &MySqlPool, name: &str) -> Result<Option<Category>> {
    let row = sqlx::query("SELECT id, name, count FROM category WHERE name = ?")
        .bind(name)
        .fetch_optional(pool)
        .await
        .context("Failed to get category by name")?;

    Ok(row.map(|row| row_to_category_mysql(&row)))
}

async fn list_categories_mysql(pool: &MySqlPool) -> Result<Vec<Category>> {
    let rows = sqlx::query("SELECT id, name, count FROM category ORDER BY count DESC, name")
        .fetch_all(pool)
        .await
        .context("Failed to list categories")?;

    Ok(rows.iter().map(row_to_category_mysql).collect())
}

// MySQL reports zero affected rows when the new name equals the old one,
// so existence is checked with a read instead.
async fn rename_category_mysql(pool: &MySqlPool, id: &str, name: &str) -> Result<Option<Category>> {
    sqlx::query("UPDATE category SET name = ? WHERE id = ?")
        .bind(name)
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to rename category")?;

    let mut conn = pool.acquire().await?;
    find_category_mysql(&mut conn, id).await
}

async fn delete_category_mysql(pool: &MySqlPool, id: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM category WHERE id = ? AND count = 0")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete category")?;

    Ok(result.rows_affected() > 0)
}

/// Apply `count = count + delta` inside the caller's transaction.
pub async fn adjust_category_count_mysql(
    conn: &mut MySqlConnection,
    id: &str,
    delta: i64,
) -> Result<u64> {
    let result = sqlx::query("UPDATE category SET count = count + ? WHERE id = ?")
        .bind(delta)
        .bind(id)
        .execute(&mut *conn)
        .await
        .with_context(|| format!("Failed to adjust count of category {}", id))?;

    Ok(result.rows_affected())
}

fn row_to_category_mysql(row: &sqlx::mysql::MySqlRow) -> Category {
    Category {
        id: row.get("id"),
        name: row.get("name"),
        count: row.get("count"),
    }
}
