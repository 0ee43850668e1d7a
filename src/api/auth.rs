//! Authentication API endpoints
//!
//! - POST /api/register - User registration
//! - POST /api/login - Issue a bearer token
//! - GET /api/me - Current user (auth)

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::User;
use crate::services::user::{LoginInput, RegisterInput};

/// Response for registration
#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub success: bool,
    pub message: String,
}

/// Response for login
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub message: String,
}

pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

pub fn protected_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_current_user))
}

/// POST /api/register
async fn register(
    State(state): State<AppState>,
    Json(input): Json<RegisterInput>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    let user = state.user_service.register(input).await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            success: true,
            message: format!("User {} registered", user.username),
        }),
    ))
}

/// POST /api/login
async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginInput>,
) -> Result<Json<LoginResponse>, ApiError> {
    let outcome = state.user_service.login(input).await?;
    tracing::info!(user_id = outcome.user.id, "User logged in");

    Ok(Json(LoginResponse {
        token: outcome.token,
        message: "Login successful".to_string(),
    }))
}

/// GET /api/me
async fn get_current_user(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<User>, ApiError> {
    let current = state
        .user_service
        .get_by_id(user.0.uid)
        .await?
        .ok_or_else(|| ApiError::unauthorized("User no longer exists"))?;
    Ok(Json(current))
}
