//! Data models
//!
//! This module contains the data structures shared across Folio:
//! - Database entities (Article, Category, Tag, User)
//! - API request types for the write endpoints
//! - Pagination helpers

mod article;
mod category;
mod tag;
mod user;

pub use article::{Article, CreateArticleInput, ListParams, PagedResult, UpdateArticleInput};
pub use category::{Category, CreateCategoryInput, UpdateCategoryInput};
pub use tag::{CreateTagInput, Tag, UpdateTagInput};
pub use user::{CreateUserInput, User};
