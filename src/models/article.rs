//! Article model
//!
//! This module provides:
//! - `Article` entity with its joined category and tag set
//! - Input types for creating and updating articles
//! - Pagination types for list queries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Category, Tag};

/// Article entity
///
/// `category` and `tags` are joined on read and are never written through
/// this struct; the write path takes tag ids separately.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: String,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub excerpt: String,
    #[serde(default)]
    pub cover_image: String,
    pub category_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub views: i64,
    #[serde(default)]
    pub likes: i64,
    #[serde(default)]
    pub author_id: String,
    #[serde(default)]
    pub published: bool,
    /// Resolved category, `None` when `category_id` names no category
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

impl Article {
    /// Create a fresh article with zeroed counters and both timestamps set to now
    pub fn new(id: String, title: String, content: String, category_id: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            title,
            content,
            excerpt: String::new(),
            cover_image: String::new(),
            category_id,
            created_at: now,
            updated_at: now,
            views: 0,
            likes: 0,
            author_id: String::new(),
            published: false,
            category: None,
            tags: Vec::new(),
        }
    }

    /// Ids of the joined tags, sorted
    pub fn tag_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.tags.iter().map(|t| t.id.clone()).collect();
        ids.sort();
        ids
    }
}

/// Input for creating a new article
///
/// `tags` carries tag ids; `tagIds` is accepted as an alias.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateArticleInput {
    /// Caller-assigned id; a UUID is generated when absent or blank
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub excerpt: String,
    #[serde(default)]
    pub cover_image: String,
    #[serde(default)]
    pub category_id: String,
    #[serde(default)]
    pub author_id: String,
    #[serde(default)]
    pub published: bool,
    #[serde(default, alias = "tagIds")]
    pub tags: Vec<String>,
}

/// Input for a full-replace article update
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateArticleInput {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub excerpt: String,
    #[serde(default)]
    pub cover_image: String,
    #[serde(default)]
    pub category_id: String,
    #[serde(default)]
    pub published: bool,
    #[serde(default, alias = "tagIds")]
    pub tags: Vec<String>,
}

/// Pagination parameters for list queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListParams {
    /// Page number (1-indexed)
    pub page: u32,
    /// Number of items per page
    pub limit: u32,
}

impl ListParams {
    pub const DEFAULT_PAGE: u32 = 1;
    pub const DEFAULT_LIMIT: u32 = 10;

    /// Create pagination parameters; zero values fall back to the defaults
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page: if page == 0 { Self::DEFAULT_PAGE } else { page },
            limit: if limit == 0 { Self::DEFAULT_LIMIT } else { limit },
        }
    }

    /// Build parameters from raw query-string values.
    ///
    /// Absent, unparsable and non-positive values each fall back to their
    /// default independently.
    pub fn parse(page: Option<&str>, limit: Option<&str>) -> Self {
        Self::new(parse_positive(page), parse_positive(limit))
    }

    /// Offset for database queries: `(page - 1) * limit`
    pub fn offset(&self) -> i64 {
        (i64::from(self.page) - 1) * i64::from(self.limit)
    }

    /// Limit for database queries
    pub fn limit(&self) -> i64 {
        i64::from(self.limit)
    }
}

impl Default for ListParams {
    fn default() -> Self {
        Self::new(Self::DEFAULT_PAGE, Self::DEFAULT_LIMIT)
    }
}

fn parse_positive(raw: Option<&str>) -> u32 {
    raw.and_then(|s| s.trim().parse::<i64>().ok())
        .filter(|n| *n > 0)
        .and_then(|n| u32::try_from(n).ok())
        .unwrap_or(0)
}

/// Paginated result container
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedResult<T> {
    pub page: u32,
    pub page_size: u32,
    /// Total number of matching items across all pages
    pub total: i64,
    pub list: Vec<T>,
}

impl<T> PagedResult<T> {
    pub fn new(list: Vec<T>, total: i64, params: &ListParams) -> Self {
        Self {
            page: params.page,
            page_size: params.limit,
            total,
            list,
        }
    }
}
