//! Tag model

use serde::{Deserialize, Serialize};

/// Tag entity
///
/// `count` equals the number of article associations referencing the tag.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tag {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub count: i64,
}

impl Tag {
    pub fn new(id: String, name: String) -> Self {
        Self { id, name, count: 0 }
    }
}

/// Input for creating a new tag
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateTagInput {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
}

/// Input for renaming a tag
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTagInput {
    #[serde(default)]
    pub name: String,
}
