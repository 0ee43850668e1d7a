//! Tag API endpoints
//!
//! - GET /api/tags - All tags, most used first
//! - GET /api/tags/{id} - One tag
//! - POST /api/tags - Create (auth)
//! - PUT /api/tags/{id} - Rename (auth)
//! - DELETE /api/tags/{id} - Delete with its associations (auth)

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};

use crate::api::common::DeletedResponse;
use crate::api::middleware::{ApiError, AppState};
use crate::models::{CreateTagInput, Tag, UpdateTagInput};

pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/tags", get(list_tags))
        .route("/tags/{id}", get(get_tag))
}

pub fn protected_routes() -> Router<AppState> {
    Router::new()
        .route("/tags", post(create_tag))
        .route("/tags/{id}", put(rename_tag).delete(delete_tag))
}

async fn list_tags(State(state): State<AppState>) -> Result<Json<Vec<Tag>>, ApiError> {
    Ok(Json(state.tag_service.list().await?))
}

async fn get_tag(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Tag>, ApiError> {
    Ok(Json(state.tag_service.get(&id).await?))
}

async fn create_tag(
    State(state): State<AppState>,
    Json(input): Json<CreateTagInput>,
) -> Result<(StatusCode, Json<Tag>), ApiError> {
    let tag = state.tag_service.create(input).await?;
    Ok((StatusCode::CREATED, Json(tag)))
}

async fn rename_tag(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<UpdateTagInput>,
) -> Result<Json<Tag>, ApiError> {
    Ok(Json(state.tag_service.rename(&id, input).await?))
}

async fn delete_tag(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeletedResponse>, ApiError> {
    state.tag_service.delete(&id).await?;
    Ok(Json(DeletedResponse::ok()))
}
