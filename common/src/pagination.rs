//! Page-based pagination shared by the list endpoints.

use serde::{Deserialize, Serialize};

/// Default number of items per page when not specified in the request.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Maximum allowed items per page.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Default starting page number.
pub const DEFAULT_PAGE_NUMBER: u32 = 1;

/// `?page=&count=` query parameters
#[derive(Debug, Clone, Copy, Deserialize, Default)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub count: Option<u32>,
}

impl PageQuery {
    pub fn new(page: u32, count: u32) -> Self {
        Self {
            page: Some(page),
            count: Some(count),
        }
    }

    /// 1-based page number; 0 is treated as the first page
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(DEFAULT_PAGE_NUMBER).max(1)
    }

    /// Page size clamped to `1..=MAX_PAGE_SIZE`
    pub fn count(&self) -> u32 {
        self.count
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }

    pub fn limit(&self) -> i64 {
        self.count() as i64
    }

    pub fn offset(&self) -> i64 {
        (self.page() as i64 - 1) * self.count() as i64
    }
}

/// One page of results
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Paginated<T: Serialize> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub count: u32,
    pub total_pages: u64,
}

impl<T: Serialize> Paginated<T> {
    pub fn new(items: Vec<T>, total: u64, query: &PageQuery) -> Self {
        let count = query.count();
        Self {
            items,
            total,
            page: query.page(),
            count,
            total_pages: total.div_ceil(count as u64),
        }
    }

    pub fn map<U: Serialize>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
        Paginated {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            count: self.count,
            total_pages: self.total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let query = PageQuery::default();
        assert_eq!(query.page(), 1);
        assert_eq!(query.count(), DEFAULT_PAGE_SIZE);
        assert_eq!(query.offset(), 0);
    }

    #[test]
    fn test_clamping() {
        let query = PageQuery::new(0, 1000);
        assert_eq!(query.page(), 1);
        assert_eq!(query.count(), MAX_PAGE_SIZE);

        let query = PageQuery::new(3, 0);
        assert_eq!(query.count(), 1);
        assert_eq!(query.offset(), 2);
    }

    #[test]
    fn test_offset() {
        let query = PageQuery::new(3, 20);
        assert_eq!(query.offset(), 40);
        assert_eq!(query.limit(), 20);
    }

    #[test]
    fn test_total_pages() {
        let query = PageQuery::new(1, 10);
        assert_eq!(Paginated::new(vec![1], 0, &query).total_pages, 0);
        assert_eq!(Paginated::new(vec![1], 10, &query).total_pages, 1);
        assert_eq!(Paginated::new(vec![1], 11, &query).total_pages, 2);
    }

    #[test]
    fn test_map_keeps_metadata() {
        let query = PageQuery::new(2, 5);
        let page = Paginated::new(vec![1, 2], 7, &query).map(|n| n * 10);
        assert_eq!(page.items, vec![10, 20]);
        assert_eq!(page.page, 2);
        assert_eq!(page.total_pages, 2);
    }
}
