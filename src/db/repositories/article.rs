//! Article repository
//!
//! Database operations for the article aggregate.
//!
//! This module provides:
//! - `ArticleRepository` trait defining the interface for article data access
//! - `SqlxArticleRepository` implementing the trait for SQLite and MySQL
//!
//! Create, update and delete each run in a single transaction that also
//! maintains `category.count` and `tag.count`. Every early return drops the
//! transaction, which rolls it back; only the final `commit()` publishes the
//! write. Counters are always changed with relative `count = count ± 1`
//! statements.

use crate::config::DatabaseDriver;
use crate::db::repositories::category::{
    adjust_category_count_mysql, adjust_category_count_sqlite, find_category_mysql,
    find_category_sqlite,
};
use crate::db::repositories::tag::{
    adjust_tag_count_mysql, adjust_tag_count_sqlite, link_tag_mysql, link_tag_sqlite,
    tags_for_article_mysql, tags_for_article_sqlite, unlink_all_tags_mysql,
    unlink_all_tags_sqlite,
};
use crate::db::DynDatabasePool;
use crate::models::Article;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlConnection, MySqlPool, Row, SqliteConnection, SqlitePool};
use std::sync::Arc;

/// Article repository trait
#[async_trait]
pub trait ArticleRepository: Send + Sync {
    /// Insert an article, link `tag_ids` and bump the affected counters.
    ///
    /// `tag_ids` must already be free of duplicates.
    async fn create(&self, article: &Article, tag_ids: &[String]) -> Result<Article>;

    /// Get an article with its category and tags joined
    async fn get_by_id(&self, id: &str) -> Result<Option<Article>>;

    /// Full-replace update of the mutable fields and the tag set.
    ///
    /// Returns `None`, having written nothing, when the article does not exist.
    async fn update(&self, article: &Article, tag_ids: &[String]) -> Result<Option<Article>>;

    /// Hard delete. Returns the deleted article, or `None` when it did not exist.
    async fn delete(&self, id: &str) -> Result<Option<Article>>;

    /// Published articles, newest first
    async fn list_published(&self, offset: i64, limit: i64) -> Result<Vec<Article>>;

    /// Published articles in a category, newest first
    async fn list_by_category(&self, category_id: &str, offset: i64, limit: i64) -> Result<Vec<Article>>;

    /// Published articles carrying a tag, newest first
    async fn list_by_tag(&self, tag_id: &str, offset: i64, limit: i64) -> Result<Vec<Article>>;

    async fn count_published(&self) -> Result<i64>;

    async fn count_by_category(&self, category_id: &str) -> Result<i64>;

    async fn count_by_tag(&self, tag_id: &str) -> Result<i64>;
}

/// SQLx-based article repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxArticleRepository {
    pool: DynDatabasePool,
}

impl SqlxArticleRepository {
    /// Create a new SQLx article repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ArticleRepository> {
        Arc::new(Self::new(pool))
    }
}

/// Which published subset a list or count query selects
#[derive(Debug, Clone, Copy)]
enum ArticleFilter<'a> {
    All,
    Category(&'a str),
    Tag(&'a str),
}

impl ArticleFilter<'_> {
    fn from_clause(&self) -> &'static str {
        match self {
            ArticleFilter::All => "FROM article a WHERE a.published = 1",
            ArticleFilter::Category(_) => "FROM article a WHERE a.category_id = ? AND a.published = 1",
            ArticleFilter::Tag(_) => {
                "FROM article a INNER JOIN relevance r ON a.id = r.article_id \
                 WHERE r.tag_id = ? AND a.published = 1"
            }
        }
    }

    fn value(&self) -> Option<&str> {
        match self {
            ArticleFilter::All => None,
            ArticleFilter::Category(id) | ArticleFilter::Tag(id) => Some(*id),
        }
    }
}

const ARTICLE_COLUMNS: &str = "a.id, a.title, a.content, a.excerpt, a.cover_image, a.category_id, \
     a.created_at, a.updated_at, a.views, a.likes, a.author_id, a.published";

fn list_sql(filter: ArticleFilter<'_>) -> String {
    format!(
        "SELECT {} {} ORDER BY a.created_at DESC, a.id LIMIT ? OFFSET ?",
        ARTICLE_COLUMNS,
        filter.from_clause()
    )
}

fn count_sql(filter: ArticleFilter<'_>) -> String {
    format!("SELECT COUNT(*) AS total {}", filter.from_clause())
}

#[async_trait]
impl ArticleRepository for SqlxArticleRepository {
    async fn create(&self, article: &Article, tag_ids: &[String]) -> Result<Article> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_article_sqlite(self.pool.sqlite()?, article, tag_ids).await,
            DatabaseDriver::Mysql => create_article_mysql(self.pool.mysql()?, article, tag_ids).await,
        }
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Article>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let mut conn = self.pool.sqlite()?.acquire().await?;
                fetch_article_sqlite(&mut conn, id).await
            }
            DatabaseDriver::Mysql => {
                let mut conn = self.pool.mysql()?.acquire().await?;
                fetch_article_mysql(&mut conn, id).await
            }
        }
    }

    async fn update(&self, article: &Article, tag_ids: &[String]) -> Result<Option<Article>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => update_article_sqlite(self.pool.sqlite()?, article, tag_ids).await,
            DatabaseDriver::Mysql => update_article_mysql(self.pool.mysql()?, article, tag_ids).await,
        }
    }

    async fn delete(&self, id: &str) -> Result<Option<Article>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => delete_article_sqlite(self.pool.sqlite()?, id).await,
            DatabaseDriver::Mysql => delete_article_mysql(self.pool.mysql()?, id).await,
        }
    }

    async fn list_published(&self, offset: i64, limit: i64) -> Result<Vec<Article>> {
        self.list(ArticleFilter::All, offset, limit).await
    }

    async fn list_by_category(&self, category_id: &str, offset: i64, limit: i64) -> Result<Vec<Article>> {
        self.list(ArticleFilter::Category(category_id), offset, limit).await
    }

    async fn list_by_tag(&self, tag_id: &str, offset: i64, limit: i64) -> Result<Vec<Article>> {
        self.list(ArticleFilter::Tag(tag_id), offset, limit).await
    }

    async fn count_published(&self) -> Result<i64> {
        self.count(ArticleFilter::All).await
    }

    async fn count_by_category(&self, category_id: &str) -> Result<i64> {
        self.count(ArticleFilter::Category(category_id)).await
    }

    async fn count_by_tag(&self, tag_id: &str) -> Result<i64> {
        self.count(ArticleFilter::Tag(tag_id)).await
    }
}

impl SqlxArticleRepository {
    async fn list(&self, filter: ArticleFilter<'_>, offset: i64, limit: i64) -> Result<Vec<Article>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_articles_sqlite(self.pool.sqlite()?, filter, offset, limit).await,
            DatabaseDriver::Mysql => list_articles_mysql(self.pool.mysql()?, filter, offset, limit).await,
        }
    }

    async fn count(&self, filter: ArticleFilter<'_>) -> Result<i64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => count_articles_sqlite(self.pool.sqlite()?, filter).await,
            DatabaseDriver::Mysql => count_articles_mysql(self.pool.mysql()?, filter).await,
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_article_sqlite(pool: &SqlitePool, article: &Article, tag_ids: &[String]) -> Result<Article> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    sqlx::query(
        r#"
        INSERT INTO article (id, title, content, excerpt, cover_image, category_id,
                             created_at, updated_at, views, likes, author_id, published)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&article.id)
    .bind(&article.title)
    .bind(&article.content)
    .bind(&article.excerpt)
    .bind(&article.cover_image)
    .bind(&article.category_id)
    .bind(article.created_at)
    .bind(article.updated_at)
    .bind(article.views)
    .bind(article.likes)
    .bind(&article.author_id)
    .bind(article.published)
    .execute(&mut *tx)
    .await
    .with_context(|| format!("Failed to insert article {}", article.id))?;

    for tag_id in tag_ids {
        link_tag_sqlite(&mut tx, &article.id, tag_id).await?;
        adjust_tag_count_sqlite(&mut tx, tag_id, 1).await?;
    }

    if find_category_sqlite(&mut tx, &article.category_id).await?.is_some() {
        adjust_category_count_sqlite(&mut tx, &article.category_id, 1).await?;
    }

    let stored = fetch_article_sqlite(&mut tx, &article.id)
        .await?
        .context("Article missing after insert")?;

    tx.commit().await.context("Failed to commit article creation")?;

    Ok(stored)
}

/// Read one article with its category and tags on an open connection or transaction
async fn fetch_article_sqlite(conn: &mut SqliteConnection, id: &str) -> Result<Option<Article>> {
    let sql = format!("SELECT {} FROM article a WHERE a.id = ?", ARTICLE_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .context("Failed to get article by ID")?;

    match row {
        Some(row) => {
            let article = row_to_article_sqlite(&row);
            Ok(Some(hydrate_sqlite(conn, article).await?))
        }
        None => Ok(None),
    }
}

async fn hydrate_sqlite(conn: &mut SqliteConnection, mut article: Article) -> Result<Article> {
    article.category = find_category_sqlite(conn, &article.category_id).await?;
    article.tags = tags_for_article_sqlite(conn, &article.id).await?;
    Ok(article)
}

async fn update_article_sqlite(pool: &SqlitePool, article: &Article, tag_ids: &[String]) -> Result<Option<Article>> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let Some(previous) = fetch_article_sqlite(&mut tx, &article.id).await? else {
        return Ok(None);
    };

    sqlx::query(
        r#"
        UPDATE article
        SET title = ?, content = ?, excerpt = ?, cover_image = ?, category_id = ?,
            published = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&article.title)
    .bind(&article.content)
    .bind(&article.excerpt)
    .bind(&article.cover_image)
    .bind(&article.category_id)
    .bind(article.published)
    .bind(article.updated_at)
    .bind(&article.id)
    .execute(&mut *tx)
    .await
    .with_context(|| format!("Failed to update article {}", article.id))?;

    if previous.category_id != article.category_id {
        adjust_category_count_sqlite(&mut tx, &previous.category_id, -1).await?;
        adjust_category_count_sqlite(&mut tx, &article.category_id, 1).await?;
    }

    unlink_all_tags_sqlite(&mut tx, &article.id).await?;
    for tag in &previous.tags {
        adjust_tag_count_sqlite(&mut tx, &tag.id, -1).await?;
    }
    for tag_id in tag_ids {
        link_tag_sqlite(&mut tx, &article.id, tag_id).await?;
        adjust_tag_count_sqlite(&mut tx, tag_id, 1).await?;
    }

    let stored = fetch_article_sqlite(&mut tx, &article.id)
        .await?
        .context("Article missing after update")?;

    tx.commit().await.context("Failed to commit article update")?;

    Ok(Some(stored))
}

async fn delete_article_sqlite(pool: &SqlitePool, id: &str) -> Result<Option<Article>> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let Some(previous) = fetch_article_sqlite(&mut tx, id).await? else {
        return Ok(None);
    };

    sqlx::query("DELETE FROM article WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .with_context(|| format!("Failed to delete article {}", id))?;

    unlink_all_tags_sqlite(&mut tx, id).await?;
    adjust_category_count_sqlite(&mut tx, &previous.category_id, -1).await?;
    for tag in &previous.tags {
        adjust_tag_count_sqlite(&mut tx, &tag.id, -1).await?;
    }

    tx.commit().await.context("Failed to commit article deletion")?;

    Ok(Some(previous))
}

async fn list_articles_sqlite(
    pool: &SqlitePool,
    filter: ArticleFilter<'_>,
    offset: i64,
    limit: i64,
) -> Result<Vec<Article>> {
    let mut conn = pool.acquire().await?;
    let sql = list_sql(filter);

    let mut query = sqlx::query(&sql);
    if let Some(value) = filter.value() {
        query = query.bind(value);
    }
    let rows = query
        .bind(limit)
        .bind(offset)
        .fetch_all(&mut *conn)
        .await
        .context("Failed to list articles")?;

    let mut articles = Vec::with_capacity(rows.len());
    for row in rows {
        let article = row_to_article_sqlite(&row);
        articles.push(hydrate_sqlite(&mut conn, article).await?);
    }

    Ok(articles)
}

async fn count_articles_sqlite(pool: &SqlitePool, filter: ArticleFilter<'_>) -> Result<i64> {
    let sql = count_sql(filter);

    let mut query = sqlx::query(&sql);
    if let Some(value) = filter.value() {
        query = query.bind(value);
    }
    let row = query
        .fetch_one(pool)
        .await
        .context("Failed to count articles")?;

    Ok(row.get("total"))
}

fn row_to_article_sqlite(row: &sqlx::sqlite::SqliteRow) -> Article {
    Article {
        id: row.get("id"),
        title: row.get("title"),
        content: row.get("content"),
        excerpt: row.get("excerpt"),
        cover_image: row.get("cover_image"),
        category_id: row.get("category_id"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        views: row.get("views"),
        likes: row.get("likes"),
        author_id: row.get("author_id"),
        published: row.get("published"),
        category: None,
        tags: Vec::new(),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_article_mysql(pool: &MySqlPool, article: &Article, tag_ids: &[String]) -> Result<Article> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    sqlx::query(
        r#"
        INSERT INTO article (id, title, content, excerpt, cover_image, category_id,
                             created_at, updated_at, views, likes, author_id, published)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&article.id)
    .bind(&article.title)
    .bind(&article.content)
    .bind(&article.excerpt)
    .bind(&article.cover_image)
    .bind(&article.category_id)
    .bind(article.created_at)
    .bind(article.updated_at)
    .bind(article.views)
    .bind(article.likes)
    .bind(&article.author_id)
    .bind(article.published)
    .execute(&mut *tx)
    .await
    .with_context(|| format!("Failed to insert article {}", article.id))?;

    for tag_id in tag_ids {
        link_tag_mysql(&mut tx, &article.id, tag_id).await?;
        adjust_tag_count_mysql(&mut tx, tag_id, 1).await?;
    }

    if find_category_mysql(&mut tx, &article.category_id).await?.is_some() {
        adjust_category_count_mysql(&mut tx, &article.category_id, 1).await?;
    }

    let stored = fetch_article_mysql(&mut tx, &article.id)
        .await?
        .context("Article missing after insert")?;

    tx.commit().await.context("Failed to commit article creation")?;

    Ok(stored)
}

async fn fetch_article_mysql(conn: &mut MySqlConnection, id: &str) -> Result<Option<Article>> {
    let sql = format!("SELECT {} FROM article a WHERE a.id = ?", ARTICLE_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .context("Failed to get article by ID")?;

    match row {
        Some(row) => {
            let article = row_to_article_mysql(&row);
            Ok(Some(hydrate_mysql(conn, article).await?))
        }
        None => Ok(None),
    }
}

/// Take the row lock that serializes concurrent writers of one article
async fn lock_article_mysql(conn: &mut MySqlConnection, id: &str) -> Result<bool> {
    let row = sqlx::query("SELECT id FROM article WHERE id = ? FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .with_context(|| format!("Failed to lock article {}", id))?;

    Ok(row.is_some())
}

async fn hydrate_mysql(conn: &mut MySqlConnection, mut article: Article) -> Result<Article> {
    article.category = find_category_mysql(conn, &article.category_id).await?;
    article.tags = tags_for_article_mysql(conn, &article.id).await?;
    Ok(article)
}

async fn update_article_mysql(pool: &MySqlPool, article: &Article, tag_ids: &[String]) -> Result<Option<Article>> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    if !lock_article_mysql(&mut tx, &article.id).await? {
        return Ok(None);
    }
    let Some(previous) = fetch_article_mysql(&mut tx, &article.id).await? else {
        return Ok(None);
    };

    sqlx::query(
        r#"
        UPDATE article
        SET title = ?, content = ?, excerpt = ?, cover_image = ?, category_id = ?,
            published = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&article.title)
    .bind(&article.content)
    .bind(&article.excerpt)
    .bind(&article.cover_image)
    .bind(&article.category_id)
    .bind(article.published)
    .bind(article.updated_at)
    .bind(&article.id)
    .execute(&mut *tx)
    .await
    .with_context(|| format!("Failed to update article {}", article.id))?;

    if previous.category_id != article.category_id {
        adjust_category_count_mysql(&mut tx, &previous.category_id, -1).await?;
        adjust_category_count_mysql(&mut tx, &article.category_id, 1).await?;
    }

    unlink_all_tags_mysql(&mut tx, &article.id).await?;
    for tag in &previous.tags {
        adjust_tag_count_mysql(&mut tx, &tag.id, -1).await?;
    }
    for tag_id in tag_ids {
        link_tag_mysql(&mut tx, &article.id, tag_id).await?;
        adjust_tag_count_mysql(&mut tx, tag_id, 1).await?;
    }

    let stored = fetch_article_mysql(&mut tx, &article.id)
        .await?
        .context("Article missing after update")?;

    tx.commit().await.context("Failed to commit article update")?;

    Ok(Some(stored))
}

async fn delete_article_mysql(pool: &MySqlPool, id: &str) -> Result<Option<Article>> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    if !lock_article_mysql(&mut tx, id).await? {
        return Ok(None);
    }
    let Some(previous) = fetch_article_mysql(&mut tx, id).await? else {
        return Ok(None);
    };

    sqlx::query("DELETE FROM article WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .with_context(|| format!("Failed to delete article {}", id))?;

    unlink_all_tags_mysql(&mut tx, id).await?;
    adjust_category_count_mysql(&mut tx, &previous.category_id, -1).await?;
    for tag in &previous.tags {
        adjust_tag_count_mysql(&mut tx, &tag.id, -1).await?;
    }

    tx.commit().await.context("Failed to commit article deletion")?;

    Ok(Some(previous))
}

async fn list_articles_mysql(
    pool: &MySqlPool,
    filter: ArticleFilter<'_>,
    offset: i64,
    limit: i64,
) -> Result<Vec<Article>> {
    let mut conn = pool.acquire().await?;
    let sql = list_sql(filter);

    let mut query = sqlx::query(&sql);
    if let Some(value) = filter.value() {
        query = query.bind(value);
    }
    let rows = query
        .bind(limit)
        .bind(offset)
        .fetch_all(&mut *conn)
        .await
        .context("Failed to list articles")?;

    let mut articles = Vec::with_capacity(rows.len());
    for row in rows {
        let article = row_to_article_mysql(&row);
        articles.push(hydrate_mysql(&mut conn, article).await?);
    }

    Ok(articles)
}

async fn count_articles_mysql(pool: &MySqlPool, filter: ArticleFilter<'_>) -> Result<i64> {
    let sql = count_sql(filter);

    let mut query = sqlx::query(&sql);
    if let Some(value) = filter.value() {
        query = query.bind(value);
    }
    let row = query
        .fetch_one(pool)
        .await
        .context("Failed to count articles")?;

    Ok(row.get("total"))
}

fn row_to_article_mysql(row: &sqlx::mysql::MySqlRow) -> Article {
    Article {
        id: row.get("id"),
        title: row.get("title"),
        content: row.get("content"),
        excerpt: row.get("excerpt"),
        cover_image: row.get("cover_image"),
        category_id: row.get("category_id"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        views: row.get("views"),
        likes: row.get("likes"),
        author_id: row.get("author_id"),
        published: row.get("published"),
        category: None,
        tags: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::category::{CategoryRepository, SqlxCategoryRepository};
    use crate::db::repositories::tag::{SqlxTagRepository, TagRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::{Category, Tag};
    use chrono::{Duration, TimeZone, Utc};

    struct Fixture {
        repo: SqlxArticleRepository,
        categories: SqlxCategoryRepository,
        tags: SqlxTagRepository,
    }

    impl Fixture {
        async fn category_count(&self, id: &str) -> i64 {
            self.categories.get_by_id(id).await.unwrap().expect("category").count
        }

        async fn tag_count(&self, id: &str) -> i64 {
            self.tags.get_by_id(id).await.unwrap().expect("tag").count
        }
    }

    /// Seeds categories cat1, cat2 and tags tag1..tag3
    async fn setup() -> Fixture {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let categories = SqlxCategoryRepository::new(pool.clone());
        let tags = SqlxTagRepository::new(pool.clone());
        for (id, name) in [("cat1", "Programming"), ("cat2", "Life")] {
            categories.create(&Category::new(id.into(), name.into())).await.unwrap();
        }
        for (id, name) in [("tag1", "rust"), ("tag2", "sql"), ("tag3", "web")] {
            tags.create(&Tag::new(id.into(), name.into())).await.unwrap();
        }

        Fixture {
            repo: SqlxArticleRepository::new(pool),
            categories,
            tags,
        }
    }

    fn article(id: &str, category_id: &str) -> Article {
        let mut article = Article::new(
            id.to_string(),
            format!("Title {}", id),
            format!("Content {}", id),
            category_id.to_string(),
        );
        article.published = true;
        article
    }

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_create_bumps_counters_and_joins() {
        let fx = setup().await;

        let created = fx
            .repo
            .create(&article("a1", "cat1"), &ids(&["tag1", "tag2"]))
            .await
            .expect("create should succeed");

        assert_eq!(created.category.as_ref().map(|c| c.id.as_str()), Some("cat1"));
        assert_eq!(created.tag_ids(), vec!["tag1", "tag2"]);
        assert_eq!(created.views, 0);
        assert_eq!(created.likes, 0);

        assert_eq!(fx.category_count("cat1").await, 1);
        assert_eq!(fx.tag_count("tag1").await, 1);
        assert_eq!(fx.tag_count("tag2").await, 1);
        assert_eq!(fx.tag_count("tag3").await, 0);
    }

    #[tokio::test]
    async fn test_create_delete_scenario_restores_counters() {
        let fx = setup().await;

        fx.repo.create(&article("a1", "cat1"), &ids(&["tag1", "tag2"])).await.unwrap();
        let deleted = fx.repo.delete("a1").await.unwrap().expect("article existed");
        assert_eq!(deleted.id, "a1");

        assert_eq!(fx.category_count("cat1").await, 0);
        assert_eq!(fx.tag_count("tag1").await, 0);
        assert_eq!(fx.tag_count("tag2").await, 0);
        assert!(fx.repo.get_by_id("a1").await.unwrap().is_none());
        assert!(fx.tags.get_by_article_id("a1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_rolls_back_when_second_tag_fails() {
        let fx = setup().await;

        let result = fx
            .repo
            .create(&article("a1", "cat1"), &ids(&["tag1", "missing"]))
            .await;
        assert!(result.is_err());

        assert!(fx.repo.get_by_id("a1").await.unwrap().is_none());
        assert_eq!(fx.tag_count("tag1").await, 0);
        assert_eq!(fx.category_count("cat1").await, 0);
    }

    #[tokio::test]
    async fn test_create_duplicate_tag_in_one_call_rolls_back() {
        let fx = setup().await;

        let result = fx.repo.create(&article("a1", "cat1"), &ids(&["tag1", "tag1"])).await;
        assert!(result.is_err());
        assert_eq!(fx.tag_count("tag1").await, 0);
        assert!(fx.repo.get_by_id("a1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_duplicate_id_fails_without_side_effects() {
        let fx = setup().await;

        fx.repo.create(&article("a1", "cat1"), &ids(&["tag1"])).await.unwrap();
        let result = fx.repo.create(&article("a1", "cat2"), &ids(&["tag2"])).await;
        assert!(result.is_err());

        assert_eq!(fx.category_count("cat1").await, 1);
        assert_eq!(fx.category_count("cat2").await, 0);
        assert_eq!(fx.tag_count("tag2").await, 0);
    }

    #[tokio::test]
    async fn test_create_with_unknown_category_skips_increment() {
        let fx = setup().await;

        let created = fx.repo.create(&article("a1", "nowhere"), &[]).await.unwrap();
        assert!(created.category.is_none());
        assert_eq!(created.category_id, "nowhere");
        assert_eq!(fx.category_count("cat1").await, 0);
    }

    #[tokio::test]
    async fn test_update_same_category_and_tags_keeps_counters() {
        let fx = setup().await;
        fx.repo.create(&article("a1", "cat1"), &ids(&["tag1", "tag2"])).await.unwrap();

        let mut changed = article("a1", "cat1");
        changed.title = "Renamed".to_string();
        let updated = fx
            .repo
            .update(&changed, &ids(&["tag2", "tag1"]))
            .await
            .unwrap()
            .expect("article exists");

        assert_eq!(updated.title, "Renamed");
        assert_eq!(updated.tag_ids(), vec!["tag1", "tag2"]);
        assert_eq!(fx.category_count("cat1").await, 1);
        assert_eq!(fx.tag_count("tag1").await, 1);
        assert_eq!(fx.tag_count("tag2").await, 1);
    }

    #[tokio::test]
    async fn test_update_moves_category_and_diffs_tags() {
        let fx = setup().await;
        fx.repo.create(&article("a1", "cat1"), &ids(&["tag1", "tag2"])).await.unwrap();

        let updated = fx
            .repo
            .update(&article("a1", "cat2"), &ids(&["tag2", "tag3"]))
            .await
            .unwrap()
            .expect("article exists");

        assert_eq!(updated.category.map(|c| c.id), Some("cat2".to_string()));
        assert_eq!(fx.category_count("cat1").await, 0);
        assert_eq!(fx.category_count("cat2").await, 1);
        assert_eq!(fx.tag_count("tag1").await, 0);
        assert_eq!(fx.tag_count("tag2").await, 1);
        assert_eq!(fx.tag_count("tag3").await, 1);
    }

    #[tokio::test]
    async fn test_update_preserves_counters_and_creation_time() {
        let fx = setup().await;
        let mut original = article("a1", "cat1");
        original.views = 7;
        original.likes = 3;
        original.author_id = "alice".to_string();
        let created = fx.repo.create(&original, &[]).await.unwrap();

        let mut changed = article("a1", "cat1");
        changed.updated_at = created.updated_at + Duration::seconds(5);
        let updated = fx.repo.update(&changed, &[]).await.unwrap().unwrap();

        assert_eq!(updated.views, 7);
        assert_eq!(updated.likes, 3);
        assert_eq!(updated.author_id, "alice");
        assert_eq!(updated.created_at, created.created_at);
        assert_eq!(updated.updated_at, changed.updated_at);
    }

    #[tokio::test]
    async fn test_update_missing_article_returns_none() {
        let fx = setup().await;

        let result = fx.repo.update(&article("ghost", "cat1"), &ids(&["tag1"])).await.unwrap();
        assert!(result.is_none());
        assert_eq!(fx.category_count("cat1").await, 0);
        assert_eq!(fx.tag_count("tag1").await, 0);
    }

    #[tokio::test]
    async fn test_update_failure_rolls_back_everything() {
        let fx = setup().await;
        fx.repo.create(&article("a1", "cat1"), &ids(&["tag1"])).await.unwrap();

        let mut changed = article("a1", "cat2");
        changed.title = "Should not stick".to_string();
        let result = fx.repo.update(&changed, &ids(&["tag2", "missing"])).await;
        assert!(result.is_err());

        let stored = fx.repo.get_by_id("a1").await.unwrap().unwrap();
        assert_eq!(stored.title, "Title a1");
        assert_eq!(stored.category_id, "cat1");
        assert_eq!(stored.tag_ids(), vec!["tag1"]);
        assert_eq!(fx.category_count("cat1").await, 1);
        assert_eq!(fx.category_count("cat2").await, 0);
        assert_eq!(fx.tag_count("tag1").await, 1);
        assert_eq!(fx.tag_count("tag2").await, 0);
    }

    #[tokio::test]
    async fn test_delete_missing_article_returns_none() {
        let fx = setup().await;
        assert!(fx.repo.delete("ghost").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_published_orders_newest_first() {
        let fx = setup().await;
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        for i in 0..5 {
            let mut a = article(&format!("a{}", i), "cat1");
            a.created_at = base + Duration::days(i);
            a.updated_at = a.created_at;
            fx.repo.create(&a, &[]).await.unwrap();
        }
        let mut draft = article("draft", "cat1");
        draft.published = false;
        draft.created_at = base + Duration::days(30);
        fx.repo.create(&draft, &[]).await.unwrap();

        let first_page = fx.repo.list_published(0, 2).await.unwrap();
        let ids: Vec<&str> = first_page.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["a4", "a3"]);

        let last_page = fx.repo.list_published(4, 2).await.unwrap();
        assert_eq!(last_page.len(), 1);
        assert_eq!(last_page[0].id, "a0");

        assert!(fx.repo.list_published(10, 2).await.unwrap().is_empty());
        assert_eq!(fx.repo.count_published().await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_list_by_category_and_tag() {
        let fx = setup().await;

        fx.repo.create(&article("a1", "cat1"), &ids(&["tag1"])).await.unwrap();
        fx.repo.create(&article("a2", "cat2"), &ids(&["tag1", "tag2"])).await.unwrap();
        let mut hidden = article("a3", "cat1");
        hidden.published = false;
        fx.repo.create(&hidden, &ids(&["tag2"])).await.unwrap();

        let in_cat1 = fx.repo.list_by_category("cat1", 0, 10).await.unwrap();
        assert_eq!(in_cat1.len(), 1);
        assert_eq!(in_cat1[0].id, "a1");
        assert_eq!(fx.repo.count_by_category("cat1").await.unwrap(), 1);

        let with_tag1 = fx.repo.list_by_tag("tag1", 0, 10).await.unwrap();
        assert_eq!(with_tag1.len(), 2);
        assert!(with_tag1.iter().all(|a| a.tags.iter().any(|t| t.id == "tag1")));
        assert_eq!(fx.repo.count_by_tag("tag2").await.unwrap(), 1);

        assert!(fx.repo.list_by_tag("tag3", 0, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_hidden_articles_still_counted() {
        let fx = setup().await;
        let mut draft = article("a1", "cat1");
        draft.published = false;

        fx.repo.create(&draft, &ids(&["tag1"])).await.unwrap();

        assert_eq!(fx.category_count("cat1").await, 1);
        assert_eq!(fx.tag_count("tag1").await, 1);
        assert!(fx.repo.get_by_id("a1").await.unwrap().is_some());
    }
}
