//! Database migrations module
//!
//! Code-based migrations for Folio. All migrations are embedded directly in
//! Rust code as SQL strings, with one dialect for SQLite and one for MySQL,
//! so the binary carries its own schema.
//!
//! # Usage
//!
//! ```ignore
//! use folio::db::{create_pool, migrations};
//!
//! let pool = create_pool(&config).await?;
//! migrations::run_migrations(&pool).await?;
//! ```
//!
//! Applied versions are recorded in the `_migrations` table, which makes
//! `run_migrations` idempotent.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{MySqlPool, Row, SqlitePool};

use super::DynDatabasePool;
use crate::config::DatabaseDriver;

/// A database migration with SQL for both SQLite and MySQL
#[derive(Debug, Clone)]
pub struct Migration {
    /// Migration version number (must be unique and sequential)
    pub version: i32,
    /// Human-readable migration name
    pub name: &'static str,
    /// SQL statements for SQLite
    pub up_sqlite: &'static str,
    /// SQL statements for MySQL
    pub up_mysql: &'static str,
}

/// Migration record stored in the database
#[derive(Debug, Clone)]
pub struct MigrationRecord {
    pub version: i64,
    pub name: String,
    pub applied_at: DateTime<Utc>,
}

/// All migrations, in application order.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create_users",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username VARCHAR(50) NOT NULL UNIQUE,
                email VARCHAR(255) NOT NULL UNIQUE,
                password_hash VARCHAR(255) NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS users (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                username VARCHAR(50) NOT NULL UNIQUE,
                email VARCHAR(255) NOT NULL UNIQUE,
                password_hash VARCHAR(255) NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
        "#,
    },
    Migration {
        version: 2,
        name: "create_category",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS category (
                id VARCHAR(64) PRIMARY KEY,
                name VARCHAR(100) NOT NULL UNIQUE,
                count INTEGER NOT NULL DEFAULT 0
            );
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS category (
                id VARCHAR(64) PRIMARY KEY,
                name VARCHAR(100) NOT NULL UNIQUE,
                count BIGINT NOT NULL DEFAULT 0
            );
        "#,
    },
    Migration {
        version: 3,
        name: "create_tag",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS tag (
                id VARCHAR(64) PRIMARY KEY,
                name VARCHAR(100) NOT NULL UNIQUE,
                count INTEGER NOT NULL DEFAULT 0
            );
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS tag (
                id VARCHAR(64) PRIMARY KEY,
                name VARCHAR(100) NOT NULL UNIQUE,
                count BIGINT NOT NULL DEFAULT 0
            );
        "#,
    },
    // category_id carries no foreign key: a create that names an unknown
    // category stores the article and skips the counter increment.
    Migration {
        version: 4,
        name: "create_article",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS article (
                id VARCHAR(64) PRIMARY KEY,
                title VARCHAR(255) NOT NULL,
                content TEXT NOT NULL,
                excerpt TEXT NOT NULL DEFAULT '',
                cover_image VARCHAR(512) NOT NULL DEFAULT '',
                category_id VARCHAR(64) NOT NULL,
                created_at TIMESTAMP NOT NULL,
                updated_at TIMESTAMP NOT NULL,
                views INTEGER NOT NULL DEFAULT 0,
                likes INTEGER NOT NULL DEFAULT 0,
                author_id VARCHAR(64) NOT NULL DEFAULT '',
                published BOOLEAN NOT NULL DEFAULT 0
            );
            CREATE INDEX IF NOT EXISTS idx_article_category_id ON article(category_id);
            CREATE INDEX IF NOT EXISTS idx_article_published_created ON article(published, created_at);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS article (
                id VARCHAR(64) PRIMARY KEY,
                title VARCHAR(255) NOT NULL,
                content LONGTEXT NOT NULL,
                excerpt TEXT NOT NULL,
                cover_image VARCHAR(512) NOT NULL DEFAULT '',
                category_id VARCHAR(64) NOT NULL,
                created_at DATETIME(6) NOT NULL,
                updated_at DATETIME(6) NOT NULL,
                views BIGINT NOT NULL DEFAULT 0,
                likes BIGINT NOT NULL DEFAULT 0,
                author_id VARCHAR(64) NOT NULL DEFAULT '',
                published BOOLEAN NOT NULL DEFAULT FALSE
            );
            CREATE INDEX idx_article_category_id ON article(category_id);
            CREATE INDEX idx_article_published_created ON article(published, created_at);
        "#,
    },
    Migration {
        version: 5,
        name: "create_relevance",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS relevance (
                article_id VARCHAR(64) NOT NULL,
                tag_id VARCHAR(64) NOT NULL,
                PRIMARY KEY (article_id, tag_id),
                FOREIGN KEY (article_id) REFERENCES article(id) ON DELETE CASCADE,
                FOREIGN KEY (tag_id) REFERENCES tag(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_relevance_tag_id ON relevance(tag_id);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS relevance (
                article_id VARCHAR(64) NOT NULL,
                tag_id VARCHAR(64) NOT NULL,
                PRIMARY KEY (article_id, tag_id),
                FOREIGN KEY (article_id) REFERENCES article(id) ON DELETE CASCADE,
                FOREIGN KEY (tag_id) REFERENCES tag(id) ON DELETE CASCADE
            );
            CREATE INDEX idx_relevance_tag_id ON relevance(tag_id);
        "#,
    },
];

/// Run all pending migrations.
///
/// Returns the number of migrations applied by this call.
///
/// # Errors
///
/// Returns an error if any migration fails to apply
pub async fn run_migrations(pool: &DynDatabasePool) -> Result<usize> {
    create_migrations_table(pool).await?;

    let applied = get_applied_migrations(pool).await?;
    let applied_versions: Vec<i32> = applied.iter().map(|m| m.version as i32).collect();

    let mut count = 0;

    for migration in MIGRATIONS {
        if !applied_versions.contains(&migration.version) {
            tracing::info!(
                "Applying migration {}: {}",
                migration.version,
                migration.name
            );
            apply_migration(pool, migration)
                .await
                .with_context(|| format!("Failed to apply migration: {}", migration.name))?;
            count += 1;
        }
    }

    if count > 0 {
        tracing::info!("Applied {} migration(s)", count);
    } else {
        tracing::debug!("No pending migrations");
    }

    Ok(count)
}

async fn create_migrations_table(pool: &DynDatabasePool) -> Result<()> {
    let sql = match pool.driver() {
        DatabaseDriver::Sqlite => {
            r#"
            CREATE TABLE IF NOT EXISTS _migrations (
                version INTEGER PRIMARY KEY,
                name VARCHAR(255) NOT NULL UNIQUE,
                applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#
        }
        DatabaseDriver::Mysql => {
            r#"
            CREATE TABLE IF NOT EXISTS _migrations (
                version BIGINT PRIMARY KEY,
                name VARCHAR(255) NOT NULL UNIQUE,
                applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#
        }
    };

    pool.execute(sql).await?;
    Ok(())
}

async fn get_applied_migrations(pool: &DynDatabasePool) -> Result<Vec<MigrationRecord>> {
    match pool.driver() {
        DatabaseDriver::Sqlite => get_applied_migrations_sqlite(pool.sqlite()?).await,
        DatabaseDriver::Mysql => get_applied_migrations_mysql(pool.mysql()?).await,
    }
}

async fn get_applied_migrations_sqlite(pool: &SqlitePool) -> Result<Vec<MigrationRecord>> {
    let rows = sqlx::query("SELECT version, name, applied_at FROM _migrations ORDER BY version")
        .fetch_all(pool)
        .await
        .context("Failed to read applied migrations")?;

    Ok(rows
        .into_iter()
        .map(|row| MigrationRecord {
            version: row.get("version"),
            name: row.get("name"),
            applied_at: row.get("applied_at"),
        })
        .collect())
}

async fn get_applied_migrations_mysql(pool: &MySqlPool) -> Result<Vec<MigrationRecord>> {
    let rows = sqlx::query("SELECT version, name, applied_at FROM _migrations ORDER BY version")
        .fetch_all(pool)
        .await
        .context("Failed to read applied migrations")?;

    Ok(rows
        .into_iter()
        .map(|row| MigrationRecord {
            version: row.get("version"),
            name: row.get("name"),
            applied_at: row.get("applied_at"),
        })
        .collect())
}

async fn apply_migration(pool: &DynDatabasePool, migration: &Migration) -> Result<()> {
    match pool.driver() {
        DatabaseDriver::Sqlite => apply_migration_sqlite(pool.sqlite()?, migration).await,
        DatabaseDriver::Mysql => apply_migration_mysql(pool.mysql()?, migration).await,
    }
}

async fn apply_migration_sqlite(pool: &SqlitePool, migration: &Migration) -> Result<()> {
    for statement in split_sql_statements(migration.up_sqlite) {
        sqlx::query(statement)
            .execute(pool)
            .await
            .with_context(|| format!("Failed to execute: {}", truncate_sql(statement)))?;
    }

    sqlx::query("INSERT INTO _migrations (version, name) VALUES (?, ?)")
        .bind(migration.version)
        .bind(migration.name)
        .execute(pool)
        .await?;

    Ok(())
}

// MySQL DDL commits implicitly, so statements are not wrapped in a transaction.
async fn apply_migration_mysql(pool: &MySqlPool, migration: &Migration) -> Result<()> {
    for statement in split_sql_statements(migration.up_mysql) {
        sqlx::query(statement)
            .execute(pool)
            .await
            .with_context(|| format!("Failed to execute: {}", truncate_sql(statement)))?;
    }

    sqlx::query("INSERT INTO _migrations (version, name) VALUES (?, ?)")
        .bind(migration.version)
        .bind(migration.name)
        .execute(pool)
        .await?;

    Ok(())
}

/// Truncate SQL for error messages
fn truncate_sql(sql: &str) -> String {
    match sql.char_indices().nth(100) {
        Some((idx, _)) => format!("{}...", &sql[..idx]),
        None => sql.to_string(),
    }
}

/// Split SQL into individual statements, dropping comment-only fragments
fn split_sql_statements(sql: &str) -> Vec<&str> {
    sql.split(';')
        .map(str::trim)
        .filter(|stmt| !stmt.is_empty() && !is_comment_only(stmt))
        .collect()
}

fn is_comment_only(s: &str) -> bool {
    s.lines()
        .map(str::trim)
        .all(|line| line.is_empty() || line.starts_with("--"))
}

/// Number of migrations not yet recorded in `_migrations`
pub async fn pending_count(pool: &DynDatabasePool) -> Result<usize> {
    create_migrations_table(pool).await?;

    let applied = get_applied_migrations(pool).await?;
    Ok(MIGRATIONS.len().saturating_sub(applied.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;

    async fn migrated_pool() -> DynDatabasePool {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        run_migrations(&pool).await.expect("Failed to run migrations");
        pool
    }

    #[tokio::test]
    async fn test_run_migrations() {
        let pool = create_test_pool().await.expect("Failed to create test pool");

        let count = run_migrations(&pool).await.expect("Failed to run migrations");
        assert_eq!(count, MIGRATIONS.len());

        // Running again should apply 0 migrations
        let count = run_migrations(&pool).await.expect("Failed to run migrations");
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_pending_count() {
        let pool = create_test_pool().await.expect("Failed to create test pool");

        assert_eq!(pending_count(&pool).await.unwrap(), MIGRATIONS.len());

        run_migrations(&pool).await.expect("Failed to run migrations");

        assert_eq!(pending_count(&pool).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_counter_columns_default_to_zero() {
        let pool = migrated_pool().await;
        let sqlite_pool = pool.as_sqlite().unwrap();

        sqlx::query("INSERT INTO category (id, name) VALUES ('c1', 'Rust')")
            .execute(sqlite_pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO tag (id, name) VALUES ('t1', 'async')")
            .execute(sqlite_pool)
            .await
            .unwrap();

        let category: i64 = sqlx::query("SELECT count FROM category WHERE id = 'c1'")
            .fetch_one(sqlite_pool)
            .await
            .unwrap()
            .get("count");
        let tag: i64 = sqlx::query("SELECT count FROM tag WHERE id = 't1'")
            .fetch_one(sqlite_pool)
            .await
            .unwrap()
            .get("count");

        assert_eq!(category, 0);
        assert_eq!(tag, 0);
    }

    #[tokio::test]
    async fn test_unique_names() {
        let pool = migrated_pool().await;
        let sqlite_pool = pool.as_sqlite().unwrap();

        sqlx::query("INSERT INTO category (id, name) VALUES ('c1', 'Rust')")
            .execute(sqlite_pool)
            .await
            .unwrap();
        let duplicate = sqlx::query("INSERT INTO category (id, name) VALUES ('c2', 'Rust')")
            .execute(sqlite_pool)
            .await;
        assert!(duplicate.is_err());

        sqlx::query(
            "INSERT INTO users (username, email, password_hash) VALUES ('alice', 'a@example.com', 'x')",
        )
        .execute(sqlite_pool)
        .await
        .unwrap();
        let duplicate = sqlx::query(
            "INSERT INTO users (username, email, password_hash) VALUES ('alice', 'b@example.com', 'x')",
        )
        .execute(sqlite_pool)
        .await;
        assert!(duplicate.is_err());
    }

    #[tokio::test]
    async fn test_relevance_requires_existing_tag() {
        let pool = migrated_pool().await;
        let sqlite_pool = pool.as_sqlite().unwrap();

        sqlx::query(
            "INSERT INTO article (id, title, content, category_id, created_at, updated_at) \
             VALUES ('a1', 't', 'c', 'cat', '2024-01-01T00:00:00Z', '2024-01-01T00:00:00Z')",
        )
        .execute(sqlite_pool)
        .await
        .unwrap();

        let result = sqlx::query("INSERT INTO relevance (article_id, tag_id) VALUES ('a1', 'nope')")
            .execute(sqlite_pool)
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_relevance_composite_key_and_cascade() {
        let pool = migrated_pool().await;
        let sqlite_pool = pool.as_sqlite().unwrap();

        sqlx::query("INSERT INTO tag (id, name) VALUES ('t1', 'async')")
            .execute(sqlite_pool)
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO article (id, title, content, category_id, created_at, updated_at) \
             VALUES ('a1', 't', 'c', 'cat', '2024-01-01T00:00:00Z', '2024-01-01T00:00:00Z')",
        )
        .execute(sqlite_pool)
        .await
        .unwrap();
        sqlx::query("INSERT INTO relevance (article_id, tag_id) VALUES ('a1', 't1')")
            .execute(sqlite_pool)
            .await
            .unwrap();

        let duplicate = sqlx::query("INSERT INTO relevance (article_id, tag_id) VALUES ('a1', 't1')")
            .execute(sqlite_pool)
            .await;
        assert!(duplicate.is_err());

        sqlx::query("DELETE FROM tag WHERE id = 't1'")
            .execute(sqlite_pool)
            .await
            .unwrap();
        let remaining: i64 = sqlx::query("SELECT COUNT(*) AS n FROM relevance")
            .fetch_one(sqlite_pool)
            .await
            .unwrap()
            .get("n");
        assert_eq!(remaining, 0);
    }

    #[test]
    fn test_versions_are_sequential() {
        for (idx, migration) in MIGRATIONS.iter().enumerate() {
            assert_eq!(migration.version as usize, idx + 1);
        }
    }

    #[test]
    fn test_split_sql_statements() {
        let sql = "CREATE TABLE a (id INT); CREATE TABLE b (id INT);";
        assert_eq!(split_sql_statements(sql).len(), 2);

        let sql_with_comments = "-- Comment\nCREATE TABLE a (id INT);\n-- trailing";
        assert_eq!(split_sql_statements(sql_with_comments).len(), 1);
    }

    #[test]
    fn test_is_comment_only() {
        assert!(is_comment_only("-- This is a comment"));
        assert!(is_comment_only("-- Line 1\n-- Line 2"));
        assert!(!is_comment_only("CREATE TABLE test"));
        assert!(!is_comment_only("-- Comment\nCREATE TABLE test"));
    }

    #[test]
    fn test_truncate_sql() {
        assert_eq!(truncate_sql("SELECT 1"), "SELECT 1");
        let long = "x".repeat(150);
        assert_eq!(truncate_sql(&long).len(), 103);
    }
}
