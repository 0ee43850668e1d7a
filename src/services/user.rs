//! User service
//!
//! Registration and login:
//! - usernames and e-mail addresses are unique
//! - passwords are stored as Argon2id hashes
//! - a successful login yields a signed JWT

use crate::db::repositories::UserRepository;
use crate::models::{CreateUserInput, User};
use crate::services::password::{hash_password, verify_password};
use crate::services::token::{Claims, TokenError, TokenService};
use anyhow::Context;
use serde::Deserialize;
use std::sync::Arc;

/// Same message for unknown users and wrong passwords
const INVALID_CREDENTIALS: &str = "Invalid username or password";

/// Error types for user service operations
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// Authentication failed (invalid credentials or token)
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Username or e-mail already taken
    #[error("User already exists: {0}")]
    UserExists(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Input for user registration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterInput {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub email: String,
}

impl RegisterInput {
    pub fn new(username: impl Into<String>, password: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            email: email.into(),
        }
    }
}

/// Input for user login
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginInput {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl LoginInput {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

/// Result of a successful login
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub token: String,
    pub user: User,
}

/// User service for registration and authentication
pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    tokens: Arc<TokenService>,
}

impl UserService {
    pub fn new(user_repo: Arc<dyn UserRepository>, tokens: Arc<TokenService>) -> Self {
        Self { user_repo, tokens }
    }

    /// Register a new user.
    ///
    /// # Errors
    ///
    /// - `ValidationError` if any field is blank
    /// - `UserExists` if the username or e-mail is taken
    /// - `InternalError` for database or hashing failures
    pub async fn register(&self, input: RegisterInput) -> Result<User, UserServiceError> {
        let username = input.username.trim();
        let email = input.email.trim();

        if username.is_empty() || input.password.is_empty() || email.is_empty() {
            return Err(UserServiceError::ValidationError(
                "Username, password and email are required".to_string(),
            ));
        }

        if self
            .user_repo
            .get_by_username(username)
            .await
            .context("Failed to check username")?
            .is_some()
        {
            return Err(UserServiceError::UserExists(format!(
                "Username '{}' is already taken",
                username
            )));
        }

        if self
            .user_repo
            .get_by_email(email)
            .await
            .context("Failed to check email")?
            .is_some()
        {
            return Err(UserServiceError::UserExists(format!(
                "Email '{}' is already registered",
                email
            )));
        }

        let password_hash = hash_password(&input.password)?;

        let user = self
            .user_repo
            .create(&CreateUserInput {
                username: username.to_string(),
                email: email.to_string(),
                password_hash,
            })
            .await
            .context("Failed to create user")?;

        tracing::info!(user_id = user.id, username = %user.username, "User registered");
        Ok(user)
    }

    /// Verify credentials and issue a token.
    ///
    /// # Errors
    ///
    /// - `AuthenticationError` for an unknown user or a wrong password
    /// - `InternalError` for database, hashing or signing failures
    pub async fn login(&self, input: LoginInput) -> Result<LoginOutcome, UserServiceError> {
        let user = self
            .user_repo
            .get_by_username(input.username.trim())
            .await
            .context("Failed to look up user")?
            .ok_or_else(|| UserServiceError::AuthenticationError(INVALID_CREDENTIALS.to_string()))?;

        if !verify_password(&input.password, &user.password_hash)? {
            tracing::debug!(username = %user.username, "Rejected login with wrong password");
            return Err(UserServiceError::AuthenticationError(
                INVALID_CREDENTIALS.to_string(),
            ));
        }

        let token = self
            .tokens
            .issue(&user)
            .map_err(|e| UserServiceError::InternalError(anyhow::anyhow!(e)))?;

        Ok(LoginOutcome { token, user })
    }

    /// Validate a bearer token
    pub fn verify_token(&self, token: &str) -> Result<Claims, UserServiceError> {
        self.tokens.verify(token).map_err(|e| match e {
            TokenError::Expired => UserServiceError::AuthenticationError("Token has expired".to_string()),
            TokenError::Invalid(_) => UserServiceError::AuthenticationError("Invalid token".to_string()),
            TokenError::Signing(msg) => UserServiceError::InternalError(anyhow::anyhow!(msg)),
        })
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>, UserServiceError> {
        Ok(self.user_repo.get_by_id(id).await.context("Failed to get user")?)
    }
}
