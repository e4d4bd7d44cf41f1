use serde::{Deserialize, Serialize};

use crate::ServiceError;

/// Default page size when the client does not send `limit`.
pub const DEFAULT_LIMIT: u32 = 20;

/// Largest page size served; bigger requests are clamped.
pub const MAX_LIMIT: u32 = 100;

/// Largest money value accepted for a price, line amount or total.
pub const MAX_AMOUNT: f64 = 1_000_000_000_000.0;

/// Raw pagination parameters as they arrive on the query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageParams {
    /// 1-based page number.
    #[serde(default)]
    pub page: Option<i64>,

    /// Page size.
    #[serde(default)]
    pub limit: Option<i64>,
}

impl PageParams {
    /// Validate and normalize into a [`Page`].
    pub fn resolve(&self) -> Result<Page, ServiceError> {
        let page = self.page.unwrap_or(1);
        if page < 1 {
            return Err(ServiceError::field("page", "must be at least 1"));
        }
        let limit = self.limit.unwrap_or(DEFAULT_LIMIT as i64);
        if limit < 1 {
            return Err(ServiceError::field("limit", "must be at least 1"));
        }
        let page = u32::try_from(page)
            .map_err(|_| ServiceError::field("page", format!("must be at most {}", u32::MAX)))?;
        Ok(Page {
            page,
            limit: limit.min(MAX_LIMIT as i64) as u32,
        })
    }
}

/// A validated page window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: u32,
    pub limit: u32,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl Page {
    /// Row offset of the first item on this page.
    pub fn offset(&self) -> i64 {
        (self.page as i64 - 1) * self.limit as i64
    }
}

/// Result wrapper for list operations.
#[derive(Debug, Clone, Serialize)]
pub struct ListResult<T: Serialize> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u64,
}

impl<T: Serialize> ListResult<T> {
    pub fn new(items: Vec<T>, total: u64, page: Page) -> Self {
        Self {
            items,
            total,
            page: page.page,
            limit: page.limit,
            total_pages: total.div_ceil(page.limit as u64),
        }
    }
}

/// Generate a new random opaque ID (UUIDv4, no dashes).
pub fn new_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Get the current time as an RFC 3339 string.
pub fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Today's date in UTC.
pub fn today() -> chrono::NaiveDate {
    chrono::Utc::now().date_naive()
}

/// Round a monetary amount to cents.
pub fn round_money(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Lowercase + trim, for case-insensitive `LIKE` search terms.
///
/// Compare against `unicode_lower(column)`, which folds the same way.
pub fn like_pattern(q: &str) -> String {
    let escaped = q
        .trim()
        .to_lowercase()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_defaults() {
        let page = PageParams::default().resolve().unwrap();
        assert_eq!(page, Page { page: 1, limit: DEFAULT_LIMIT });
        assert_eq!(page.offset(), 0);
    }

    #[test]
    fn test_page_offset() {
        let page = PageParams { page: Some(3), limit: Some(10) }.resolve().unwrap();
        assert_eq!(page.offset(), 20);
    }

    #[test]
    fn test_limit_is_clamped() {
        let page = PageParams { page: None, limit: Some(5000) }.resolve().unwrap();
        assert_eq!(page.limit, MAX_LIMIT);
    }

    #[test]
    fn test_zero_page_and_limit_rejected() {
        let err = PageParams { page: Some(0), limit: None }.resolve().unwrap_err();
        assert_eq!(err.details().unwrap()[0].field, "page");

        let err = PageParams { page: None, limit: Some(0) }.resolve().unwrap_err();
        assert_eq!(err.details().unwrap()[0].field, "limit");
    }

    #[test]
    fn test_oversized_page_rejected() {
        let err = PageParams { page: Some(u32::MAX as i64 + 1), limit: None }
            .resolve()
            .unwrap_err();
        assert_eq!(err.details().unwrap()[0].field, "page");

        let page = PageParams { page: Some(u32::MAX as i64), limit: None }.resolve().unwrap();
        assert_eq!(page.page, u32::MAX);
    }

    #[test]
    fn test_total_pages() {
        let page = Page { page: 1, limit: 10 };
        assert_eq!(ListResult::<u8>::new(vec![], 0, page).total_pages, 0);
        assert_eq!(ListResult::<u8>::new(vec![], 10, page).total_pages, 1);
        assert_eq!(ListResult::<u8>::new(vec![], 11, page).total_pages, 2);
    }

    #[test]
    fn test_new_id() {
        let id = new_id();
        assert_eq!(id.len(), 32);
        assert!(!id.contains('-'));
        assert_ne!(id, new_id());
    }

    #[test]
    fn test_now_rfc3339() {
        let ts = now_rfc3339();
        assert!(ts.contains('T'));
    }

    #[test]
    fn test_round_money() {
        assert_eq!(round_money(3.0 * 33.333), 100.0);
        assert_eq!(round_money(0.1 + 0.2), 0.3);
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("  Acme "), "%acme%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }
}
