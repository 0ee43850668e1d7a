//! Article API endpoints
//!
//! Handles HTTP requests for articles:
//! - GET /api/articles - Published articles, paginated
//! - GET /api/articles/category?categoryId= - Published articles in a category
//! - GET /api/articles/tag?tagId= - Published articles carrying a tag
//! - GET /api/article?id= - One article with category and tags
//! - POST /api/article - Create (auth)
//! - PUT /api/article - Full-replace update (auth)
//! - DELETE /api/article?id= - Delete (auth)

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::Deserialize;

use crate::api::common::{DeletedResponse, PageQuery};
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::{Article, CreateArticleInput, PagedResult, UpdateArticleInput};

/// `?id=` query for single-article endpoints
#[derive(Debug, Deserialize)]
pub struct ArticleIdQuery {
    pub id: Option<String>,
}

impl ArticleIdQuery {
    fn required(&self) -> Result<&str, ApiError> {
        self.id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ApiError::validation_error("Article id is required"))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryArticlesQuery {
    pub category_id: Option<String>,
    #[serde(flatten)]
    pub page: PageQuery,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagArticlesQuery {
    pub tag_id: Option<String>,
    #[serde(flatten)]
    pub page: PageQuery,
}

/// GET /api/articles
pub async fn list_articles_handler(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<PagedResult<Article>>, ApiError> {
    let result = state.article_service.list(&query.params()).await?;
    Ok(Json(result))
}

/// GET /api/articles/category
pub async fn list_by_category_handler(
    State(state): State<AppState>,
    Query(query): Query<CategoryArticlesQuery>,
) -> Result<Json<PagedResult<Article>>, ApiError> {
    let category_id = required_param(query.category_id.as_deref(), "categoryId")?;
    let result = state
        .article_service
        .list_by_category(category_id, &query.page.params())
        .await?;
    Ok(Json(result))
}

/// GET /api/articles/tag
pub async fn list_by_tag_handler(
    State(state): State<AppState>,
    Query(query): Query<TagArticlesQuery>,
) -> Result<Json<PagedResult<Article>>, ApiError> {
    let tag_id = required_param(query.tag_id.as_deref(), "tagId")?;
    let result = state
        .article_service
        .list_by_tag(tag_id, &query.page.params())
        .await?;
    Ok(Json(result))
}

/// GET /api/article?id=
pub async fn get_article_handler(
    State(state): State<AppState>,
    Query(query): Query<ArticleIdQuery>,
) -> Result<Json<Article>, ApiError> {
    let article = state.article_service.get(query.required()?).await?;
    Ok(Json(article))
}

/// POST /api/article
///
/// The caller becomes the author unless the body names one.
pub async fn create_article_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(mut input): Json<CreateArticleInput>,
) -> Result<Json<Article>, ApiError> {
    if input.author_id.trim().is_empty() {
        input.author_id = user.0.uid.to_string();
    }
    let article = state.article_service.create(input).await?;
    Ok(Json(article))
}

/// PUT /api/article
pub async fn update_article_handler(
    State(state): State<AppState>,
    Json(input): Json<UpdateArticleInput>,
) -> Result<Json<Article>, ApiError> {
    let article = state.article_service.update(input).await?;
    Ok(Json(article))
}

/// DELETE /api/article?id=
pub async fn delete_article_handler(
    State(state): State<AppState>,
    Query(query): Query<ArticleIdQuery>,
) -> Result<Json<DeletedResponse>, ApiError> {
    state.article_service.delete(query.required()?).await?;
    Ok(Json(DeletedResponse::ok()))
}

fn required_param<'a>(value: Option<&'a str>, name: &str) -> Result<&'a str, ApiError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::validation_error(format!("{} is required", name)))
}
