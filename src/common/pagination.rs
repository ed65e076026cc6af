// src/common/pagination.rs

use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 100;

/// Query string shared by the list endpoints.
/// `filter` accepts `active` / `inactive` for tables that carry `is_active`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
    pub filter: Option<String>,
}

impl ListParams {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.limit)
    }

    pub fn search_term(&self) -> Option<String> {
        non_blank(self.search.as_deref()).map(|s| format!("%{}%", s))
    }

    pub fn active_filter(&self) -> Option<bool> {
        match self.filter.as_deref().map(|f| f.trim().to_lowercase()) {
            Some(f) if f == "active" => Some(true),
            Some(f) if f == "inactive" => Some(false),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
}

impl PageRequest {
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        let page = page.filter(|p| *p > 0).unwrap_or(DEFAULT_PAGE);
        let limit = limit.filter(|l| *l > 0).unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
        Self { page, limit }
    }

    /// Saturates for absurd page numbers, which then simply yield no rows.
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

/// List envelope: `{data, total, page, limit}` and, for some resources, `totalPages`.
#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    #[serde(rename = "totalPages", skip_serializing_if = "Option::is_none")]
    pub total_pages: Option<i64>,
}

impl<T> Paginated<T> {
    pub fn new(data: Vec<T>, total: i64, req: PageRequest) -> Self {
        Self {
            data,
            total,
            page: req.page,
            limit: req.limit,
            total_pages: None,
        }
    }

    pub fn with_total_pages(mut self) -> Self {
        let pages = if self.limit > 0 {
            (self.total + self.limit - 1) / self.limit
        } else {
            0
        };
        self.total_pages = Some(pages);
        self
    }
}

pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_and_bounds() {
        assert_eq!(PageRequest::new(None, None), PageRequest { page: 1, limit: 10 });
        assert_eq!(PageRequest::new(Some(0), Some(-3)), PageRequest { page: 1, limit: 10 });
        assert_eq!(PageRequest::new(Some(3), Some(500)).limit, MAX_LIMIT);
        assert_eq!(PageRequest::new(Some(2), Some(5)).offset(), 5);
    }

    #[test]
    fn huge_page_numbers_saturate() {
        let req = PageRequest::new(Some(i64::MAX), Some(10));
        assert_eq!(req.offset(), i64::MAX);
        assert!(req.offset() >= 0);
    }

    #[test]
    fn total_pages_rounds_up() {
        let p = Paginated::new(vec![1, 2], 11, PageRequest::new(Some(1), Some(5))).with_total_pages();
        assert_eq!(p.total_pages, Some(3));

        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["totalPages"], 3);
    }

    #[test]
    fn plain_envelope_omits_total_pages() {
        let p = Paginated::new(Vec::<i32>::new(), 0, PageRequest::new(None, None));
        let json = serde_json::to_value(&p).unwrap();
        assert!(json.get("totalPages").is_none());
        assert_eq!(json["limit"], 10);
    }

    #[test]
    fn filter_and_search_parsing() {
        let params = ListParams {
            search: Some("  shirt ".into()),
            filter: Some("Inactive".into()),
            ..Default::default()
        };
        assert_eq!(params.search_term().as_deref(), Some("%shirt%"));
        assert_eq!(params.active_filter(), Some(false));

        let blank = ListParams {
            search: Some("   ".into()),
            ..Default::default()
        };
        assert_eq!(blank.search_term(), None);
        assert_eq!(blank.active_filter(), None);
    }
}
