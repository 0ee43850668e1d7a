//! Services layer - Business logic
//!
//! Services validate input, assign ids and timestamps, and translate
//! repository results into typed errors for the HTTP layer.

pub mod article;
pub mod category;
pub mod password;
pub mod tag;
pub mod token;
pub mod user;

pub use article::{ArticleService, ArticleServiceError};
pub use category::{CategoryService, CategoryServiceError};
pub use password::{hash_password, verify_password};
pub use tag::{TagService, TagServiceError};
pub use token::{Claims, TokenError, TokenService};
pub use user::{LoginInput, LoginOutcome, RegisterInput, UserService, UserServiceError};
