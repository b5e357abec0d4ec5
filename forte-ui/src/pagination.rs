//! Pagination utilities for table components

use std::ops::Range;

/// Pagination metadata calculated from total rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// Current page number (1-indexed)
    pub page: usize,
    /// Total number of pages
    pub total_pages: usize,
    /// Index of the first row on the page
    pub offset: usize,
    pub page_size: usize,
}

impl Pagination {
    /// Row indices shown on this page out of `total_rows`
    pub fn range(&self, total_rows: usize) -> Range<usize> {
        let start = self.offset.min(total_rows);
        let end = (self.offset + self.page_size).min(total_rows);
        start..end
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}

/// Calculate pagination metadata from total rows and requested page
///
/// Ensures page is within valid bounds [1, total_pages]. A `page_size` of 0
/// is treated as 1.
///
/// # Examples
/// ```
/// use forte_ui::pagination::calculate_pagination;
///
/// // 60 rows at 25 per page = 3 pages (25 + 25 + 10)
/// let p = calculate_pagination(60, 2, 25);
/// assert_eq!(p.page, 2);
/// assert_eq!(p.total_pages, 3);
/// assert_eq!(p.offset, 25);
///
/// // Requesting out-of-bounds page gets clamped
/// let p = calculate_pagination(60, 99, 25);
/// assert_eq!(p.page, 3);
/// assert_eq!(p.offset, 50);
/// ```
pub fn calculate_pagination(total_rows: usize, requested_page: usize, page_size: usize) -> Pagination {
    let page_size = page_size.max(1);
    let total_pages = total_rows.div_ceil(page_size);
    let page = requested_page.max(1).min(total_pages.max(1));
    let offset = (page - 1) * page_size;

    Pagination {
        page,
        total_pages,
        offset,
        page_size,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_normal() {
        let p = calculate_pagination(250, 2, 100);
        assert_eq!(p.page, 2);
        assert_eq!(p.total_pages, 3);
        assert_eq!(p.offset, 100);
    }

    #[test]
    fn test_pagination_first_page() {
        let p = calculate_pagination(150, 1, 100);
        assert_eq!(p.page, 1);
        assert_eq!(p.total_pages, 2);
        assert_eq!(p.offset, 0);
        assert!(!p.has_previous());
        assert!(p.has_next());
    }

    #[test]
    fn test_pagination_out_of_bounds_high() {
        let p = calculate_pagination(150, 99, 100);
        assert_eq!(p.page, 2); // Clamped to last page
        assert_eq!(p.offset, 100);
        assert!(!p.has_next());
    }

    #[test]
    fn test_pagination_out_of_bounds_low() {
        let p = calculate_pagination(150, 0, 100);
        assert_eq!(p.page, 1);
        assert_eq!(p.offset, 0);
    }

    #[test]
    fn test_pagination_empty() {
        let p = calculate_pagination(0, 1, 25);
        assert_eq!(p.page, 1);
        assert_eq!(p.total_pages, 0);
        assert_eq!(p.offset, 0);
        assert_eq!(p.range(0), 0..0);
    }

    #[test]
    fn test_pagination_range_last_page_partial() {
        let p = calculate_pagination(60, 3, 25);
        assert_eq!(p.range(60), 50..60);
    }

    #[test]
    fn test_pagination_zero_page_size() {
        let p = calculate_pagination(3, 2, 0);
        assert_eq!(p.page_size, 1);
        assert_eq!(p.total_pages, 3);
        assert_eq!(p.offset, 1);
    }
}
