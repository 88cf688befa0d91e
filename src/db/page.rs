use serde::{Deserialize, Serialize};

use crate::config;
use crate::error::ApiError;

/// Pagination metadata attached to every list response.
///
/// `has_next` and `next_offset` are pure arithmetic over (limit, offset,
/// total): `hasNext == offset + limit < total`, and `nextOffset` is present
/// iff `hasNext`.
#[derive(Debug, Clone, Serialize)]
pub struct PageMeta {
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
    #[serde(rename = "hasNext")]
    pub has_next: bool,
    #[serde(rename = "nextOffset", skip_serializing_if = "Option::is_none")]
    pub next_offset: Option<i64>,
}

#[derive(Debug)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub meta: PageMeta,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: i64, limit: i64, offset: i64) -> Self {
        let has_next = offset + limit < total;
        Self {
            items,
            meta: PageMeta {
                total,
                limit,
                offset,
                has_next,
                next_offset: has_next.then_some(offset + limit),
            },
        }
    }
}

/// Common list-endpoint query parameters. Entity-specific filters live on the
/// handlers' own query structs.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl PageQuery {
    /// Validate and normalize (limit, offset). Negative values are rejected;
    /// the limit is clamped to the configured maximum to bound row-scan cost.
    pub fn normalize(&self) -> Result<(i64, i64), ApiError> {
        let api = &config::config().api;
        let limit = self.limit.unwrap_or(api.default_page_size);
        let offset = self.offset.unwrap_or(0);

        if limit < 0 || offset < 0 {
            return Err(ApiError::bad_request("Invalid pagination parameters"));
        }

        Ok((limit.min(api.max_page_size), offset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn has_next_and_next_offset_follow_the_arithmetic() {
        let page = Page::new(vec![0; 25], 30, 25, 0);
        assert_eq!(page.meta.total, 30);
        assert!(page.meta.has_next);
        assert_eq!(page.meta.next_offset, Some(25));

        let page = Page::new(vec![0; 5], 30, 25, 25);
        assert!(!page.meta.has_next);
        assert_eq!(page.meta.next_offset, None);
    }

    #[test]
    fn exact_boundary_has_no_next_page() {
        let page = Page::new(vec![0; 10], 10, 10, 0);
        assert!(!page.meta.has_next);
        assert_eq!(page.meta.next_offset, None);
    }

    #[test]
    fn empty_result_set() {
        let page = Page::<i32>::new(vec![], 0, 25, 0);
        assert!(!page.meta.has_next);
        assert_eq!(page.meta.total, 0);
    }

    #[test]
    fn next_offset_serialization_is_omitted_when_absent() {
        let page = Page::new(vec![1], 1, 25, 0);
        let v = serde_json::to_value(&page.meta).unwrap();
        assert_eq!(v.get("hasNext"), Some(&serde_json::Value::Bool(false)));
        assert!(v.get("nextOffset").is_none());
    }

    #[test]
    fn normalize_rejects_negative_values() {
        let q = PageQuery {
            limit: Some(-1),
            offset: Some(0),
        };
        assert!(q.normalize().is_err());

        let q = PageQuery {
            limit: Some(10),
            offset: Some(-5),
        };
        assert!(q.normalize().is_err());
    }

    #[test]
    fn normalize_clamps_oversized_limits() {
        let q = PageQuery {
            limit: Some(1_000_000),
            offset: Some(0),
        };
        let (limit, _) = q.normalize().unwrap();
        assert_eq!(limit, config::config().api.max_page_size);
    }

    #[test]
    fn normalize_applies_defaults() {
        let q = PageQuery::default();
        let (limit, offset) = q.normalize().unwrap();
        assert_eq!(limit, config::config().api.default_page_size);
        assert_eq!(offset, 0);
    }
}
