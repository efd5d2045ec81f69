//! Query parameters and pagination utilities

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Query parameters for pagination, filtering and sorting
///
/// Extracted from URL query strings by list endpoints.
///
/// # Example
/// ```text
/// GET /api/tours?page=2&limit=10
/// GET /api/tours?filter={"difficulty": "easy"}
/// GET /api/events?filter={"base_price<": 50}&sort=start_date:asc
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QueryParams {
    /// Page number (starts at 1)
    pub page: usize,

    /// Number of items per page
    pub limit: usize,

    /// Filters as a JSON object
    ///
    /// - Exact match: `{"field": "value"}`
    /// - Comparison: `{"field>": value, "field<": value, "field>=": value, "field<=": value}`
    pub filter: Option<String>,

    /// `field`, `field:asc` or `field:desc`
    pub sort: Option<String>,
}

impl Default for QueryParams {
    fn default() -> Self {
        Self {
            page: 1,
            limit: 20,
            filter: None,
            sort: None,
        }
    }
}

impl QueryParams {
    pub fn new(page: usize, limit: usize) -> Self {
        Self {
            page,
            limit,
            ..Default::default()
        }
    }

    /// Get page number, ensuring minimum of 1
    pub fn page(&self) -> usize {
        self.page.max(1)
    }

    /// Get limit, between 1 and 100
    pub fn limit(&self) -> usize {
        self.limit.clamp(1, 100)
    }

    /// Parse filter JSON string into Value
    pub fn filter_value(&self) -> Option<Value> {
        self.filter
            .as_ref()
            .and_then(|s| serde_json::from_str(s).ok())
    }
}

/// Paginated success envelope
#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    pub success: bool,

    /// The current page of items
    pub data: Vec<T>,

    pub pagination: PaginationMeta,
}

impl<T> PaginatedResponse<T> {
    /// Slice one page out of an already filtered and sorted collection
    pub fn from_items(items: Vec<T>, params: &QueryParams) -> Self {
        let page = params.page();
        let limit = params.limit();
        let total = items.len();
        let data = items
            .into_iter()
            .skip((page - 1) * limit)
            .take(limit)
            .collect();

        Self {
            success: true,
            data,
            pagination: PaginationMeta::new(page, limit, total),
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PaginatedResponse<U> {
        PaginatedResponse {
            success: self.success,
            data: self.data.into_iter().map(f).collect(),
            pagination: self.pagination,
        }
    }
}

/// Pagination metadata
#[derive(Debug, Clone, Serialize)]
pub struct PaginationMeta {
    /// Current page number (starts at 1)
    pub page: usize,

    /// Number of items per page
    pub limit: usize,

    /// Total number of items (after filters)
    pub total: usize,

    pub total_pages: usize,

    pub has_next: bool,

    pub has_prev: bool,
}

impl PaginationMeta {
    pub fn new(page: usize, limit: usize, total: usize) -> Self {
        let page = page.max(1);
        let limit = limit.max(1);
        let total_pages = if total == 0 { 0 } else { total.div_ceil(limit) };
        let start = (page - 1) * limit;

        Self {
            page,
            limit,
            total,
            total_pages,
            has_next: start + limit < total,
            has_prev: page > 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_params_defaults() {
        let params = QueryParams::default();
        assert_eq!(params.page(), 1);
        assert_eq!(params.limit(), 20);
    }

    #[test]
    fn test_partial_query_keeps_defaults() {
        let params: QueryParams = serde_json::from_str(r#"{"page": 3}"#).unwrap();
        assert_eq!(params.page(), 3);
        assert_eq!(params.limit(), 20);
    }

    #[test]
    fn test_limit_is_clamped() {
        assert_eq!(QueryParams::new(1, 0).limit(), 1);
        assert_eq!(QueryParams::new(1, 500).limit(), 100);
    }

    #[test]
    fn test_pagination_meta() {
        let meta = PaginationMeta::new(1, 20, 145);
        assert_eq!(meta.total, 145);
        assert_eq!(meta.total_pages, 8);
        assert!(!meta.has_prev);
        assert!(meta.has_next);

        let empty = PaginationMeta::new(1, 20, 0);
        assert_eq!(empty.total_pages, 0);
        assert!(!empty.has_next);
    }

    #[test]
    fn test_from_items_slices_requested_page() {
        let items: Vec<u32> = (1..=25).collect();
        let page = PaginatedResponse::from_items(items, &QueryParams::new(2, 10));
        assert_eq!(page.data, (11..=20).collect::<Vec<_>>());
        assert!(page.pagination.has_prev);
        assert!(page.pagination.has_next);
        assert_eq!(page.pagination.total_pages, 3);
    }
}
