//! Pagination types and window calculation.

use serde::{Deserialize, Serialize};

/// Page size used when the requested limit is below 1
pub const DEFAULT_PAGE_SIZE: u64 = 10;

/// First page number (1-indexed)
pub const DEFAULT_PAGE_NUMBER: u64 = 1;

/// Field used to order pages, most recent first
pub const DEFAULT_PAGE_SORT_FIELD: &str = "created_at";

/// One page of records plus the numbers describing it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pagination<T> {
    pub total: u64,
    pub per_page: u64,
    pub current_page: u64,
    pub last_page: u64,
    pub from: u64,
    pub to: u64,
    pub data: Vec<T>,
}

impl<T> Pagination<T> {
    /// Assemble a page from its window and fetched data.
    pub fn new(window: PageWindow, data: Vec<T>) -> Self {
        Self {
            total: window.total,
            per_page: window.per_page,
            current_page: window.current_page,
            last_page: window.last_page,
            from: window.from,
            to: window.to,
            data,
        }
    }

    /// Whether the requested page lies beyond the last page.
    pub fn is_past_end(&self) -> bool {
        self.current_page > self.last_page
    }
}

/// Window of a requested page within the full ordered result set.
///
/// `from` and `to` are 1-based and inclusive, both 0 for an empty set. For a
/// page past the end `to` is still `per_page * current_page`, which exceeds
/// `total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub total: u64,
    pub per_page: u64,
    pub current_page: u64,
    pub last_page: u64,
    pub from: u64,
    pub to: u64,
}

impl PageWindow {
    /// Clamp a requested limit and page: `limit < 1` becomes 10, `page < 1`
    /// becomes 1.
    pub fn normalize(limit: i64, page: i64) -> (u64, u64) {
        let per_page = if limit < 1 { DEFAULT_PAGE_SIZE } else { limit as u64 };
        let current_page = if page < 1 { DEFAULT_PAGE_NUMBER } else { page as u64 };
        (per_page, current_page)
    }

    /// Compute the window of `page` over `total` items.
    pub fn compute(total: u64, limit: i64, page: i64) -> Self {
        let (per_page, current_page) = Self::normalize(limit, page);

        let last_page = total / per_page + u64::from(total % per_page != 0);

        let (from, to) = if total == 0 {
            (0, 0)
        } else {
            let from = per_page.saturating_mul(current_page - 1).saturating_add(1);
            let to = if current_page == last_page {
                total
            } else {
                per_page.saturating_mul(current_page)
            };
            (from, to)
        };

        Self {
            total,
            per_page,
            current_page,
            last_page,
            from,
            to,
        }
    }

    /// Number of items before this page.
    pub fn skip(&self) -> u64 {
        self.per_page.saturating_mul(self.current_page - 1)
    }

    /// Whether a fetch is needed at all.
    pub fn has_items(&self) -> bool {
        self.total > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_collection_second_page() {
        let window = PageWindow::compute(11, 3, 2);

        assert_eq!(window.last_page, 4);
        assert_eq!(window.from, 4);
        assert_eq!(window.to, 6);
        assert_eq!(window.skip(), 3);
    }

    #[test]
    fn test_filtered_last_page_ends_at_total() {
        let window = PageWindow::compute(8, 4, 2);

        assert_eq!(window.last_page, 2);
        assert_eq!(window.from, 5);
        assert_eq!(window.to, 8);
    }

    #[test]
    fn test_partial_last_page() {
        let window = PageWindow::compute(11, 3, 4);

        assert_eq!(window.last_page, 4);
        assert_eq!(window.from, 10);
        assert_eq!(window.to, 11);
        assert_eq!(window.skip(), 9);
    }

    #[test]
    fn test_empty_total() {
        let window = PageWindow::compute(0, 5, 3);

        assert_eq!(window.last_page, 0);
        assert_eq!(window.from, 0);
        assert_eq!(window.to, 0);
        assert!(!window.has_items());
    }

    #[test]
    fn test_page_past_end_overshoots_total() {
        let window = PageWindow::compute(11, 3, 6);

        assert_eq!(window.last_page, 4);
        assert_eq!(window.from, 16);
        assert_eq!(window.to, 18);
    }

    #[test]
    fn test_clamps_limit_and_page() {
        let window = PageWindow::compute(25, 0, -3);

        assert_eq!(window.per_page, DEFAULT_PAGE_SIZE);
        assert_eq!(window.current_page, 1);
        assert_eq!(window.last_page, 3);
        assert_eq!(window.from, 1);
        assert_eq!(window.to, 10);
    }

    #[test]
    fn test_single_page_ends_at_total() {
        let window = PageWindow::compute(7, 10, 1);

        assert_eq!(window.last_page, 1);
        assert_eq!(window.from, 1);
        assert_eq!(window.to, 7);
    }

    #[test]
    fn test_pagination_serializes_snake_case() {
        let page = Pagination::new(PageWindow::compute(11, 3, 2), vec!["a", "b", "c"]);
        let json = serde_json::to_value(&page).unwrap();

        assert_eq!(json["per_page"], 3);
        assert_eq!(json["current_page"], 2);
        assert_eq!(json["last_page"], 4);
        assert_eq!(json["data"].as_array().unwrap().len(), 3);
        assert!(!page.is_past_end());
    }
}
