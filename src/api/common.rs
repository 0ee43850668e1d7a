//! Common API utilities and shared types
//!
//! This module contains shared utilities used across multiple API endpoints.

use serde::{Deserialize, Serialize};

use crate::models::ListParams;

// ============================================================================
// Pagination Query Types
// ============================================================================

/// Raw pagination query parameters
///
/// Kept as strings so that `page=abc` falls back to the default instead of
/// rejecting the request.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl PageQuery {
    pub fn params(&self) -> ListParams {
        ListParams::parse(self.page.as_deref(), self.limit.as_deref())
    }
}

/// Body returned by delete endpoints
#[derive(Debug, Serialize, Deserialize)]
pub struct DeletedResponse {
    pub deleted: bool,
}

impl DeletedResponse {
    pub fn ok() -> Self {
        Self { deleted: true }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_query_lenient_parsing() {
        let query = PageQuery {
            page: Some("abc".into()),
            limit: Some("-3".into()),
        };
        assert_eq!(query.params(), ListParams::default());

        let query = PageQuery {
            page: Some("3".into()),
            limit: None,
        };
        assert_eq!(query.params(), ListParams::new(3, ListParams::DEFAULT_LIMIT));
    }
}
