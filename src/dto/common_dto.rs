use serde::{Deserialize, Serialize};

// Response genérica
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: Option<String>,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    pub fn success_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: None,
        }
    }
}

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;
pub const MAX_PAGE: i64 = 1_000_000;

// Query string de búsqueda paginada: ?page=0&size=10&keyword=...
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub size: Option<i64>,
    pub keyword: Option<String>,
    pub include_deleted: Option<bool>,
}

impl PageQuery {
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(0).clamp(0, MAX_PAGE)
    }

    pub fn size(&self) -> i64 {
        self.size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> i64 {
        self.page().saturating_mul(self.size())
    }

    pub fn include_deleted(&self) -> bool {
        self.include_deleted.unwrap_or(false)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PageResponse<T> {
    pub content: Vec<T>,
    pub page: i64,
    pub size: i64,
    pub total_elements: i64,
    pub total_pages: i64,
}

impl<T> PageResponse<T> {
    pub fn new(content: Vec<T>, query: &PageQuery, total_elements: i64) -> Self {
        let size = query.size();
        Self {
            content,
            page: query.page(),
            size,
            total_elements,
            total_pages: (total_elements + size - 1) / size,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PageResponse<U> {
        PageResponse {
            content: self.content.into_iter().map(f).collect(),
            page: self.page,
            size: self.size,
            total_elements: self.total_elements,
            total_pages: self.total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_query_defaults_and_clamping() {
        let query = PageQuery::default();
        assert_eq!(query.page(), 0);
        assert_eq!(query.size(), DEFAULT_PAGE_SIZE);
        assert!(!query.include_deleted());

        let query = PageQuery { page: Some(-3), size: Some(1000), ..Default::default() };
        assert_eq!(query.page(), 0);
        assert_eq!(query.size(), MAX_PAGE_SIZE);

        let query = PageQuery { page: Some(2), size: Some(20), ..Default::default() };
        assert_eq!(query.offset(), 40);
    }

    #[test]
    fn test_huge_page_does_not_overflow_offset() {
        let query = PageQuery { page: Some(i64::MAX), size: Some(10), ..Default::default() };
        assert_eq!(query.page(), MAX_PAGE);
        assert_eq!(query.offset(), MAX_PAGE * 10);
        assert!(query.offset() > 0);
    }

    #[test]
    fn test_total_pages() {
        let query = PageQuery { size: Some(10), ..Default::default() };
        assert_eq!(PageResponse::<u8>::new(vec![], &query, 0).total_pages, 0);
        assert_eq!(PageResponse::<u8>::new(vec![], &query, 10).total_pages, 1);
        assert_eq!(PageResponse::<u8>::new(vec![], &query, 11).total_pages, 2);
    }

    #[test]
    fn test_map_keeps_paging() {
        let query = PageQuery { page: Some(1), size: Some(2), ..Default::default() };
        let page = PageResponse::new(vec![1, 2], &query, 5).map(|n| n * 10);
        assert_eq!(page.content, vec![10, 20]);
        assert_eq!(page.page, 1);
        assert_eq!(page.total_pages, 3);
    }
}
