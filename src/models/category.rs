//! Category model

use serde::{Deserialize, Serialize};

/// Category entity
///
/// `count` is denormalized: it equals the number of articles whose
/// `category_id` points here, and only the article write path changes it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub count: i64,
}

impl Category {
    /// Create a category with a zero count
    pub fn new(id: String, name: String) -> Self {
        Self { id, name, count: 0 }
    }
}

/// Input for creating a new category
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateCategoryInput {
    /// Caller-assigned id; generated when absent or blank
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
}

/// Input for renaming a category
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCategoryInput {
    #[serde(default)]
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_new() {
        let category = Category::new("c1".to_string(), "Rust".to_string());
        assert_eq!(category.count, 0);
    }

    #[test]
    fn test_category_deserialize_without_count() {
        let category: Category = serde_json::from_str(r#"{"id":"c1","name":"Rust"}"#).unwrap();
        assert_eq!(category, Category::new("c1".to_string(), "Rust".to_string()));
    }
}
