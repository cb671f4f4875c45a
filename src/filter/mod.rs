//! Pagination and sorting for list endpoints.

use serde::Serialize;

use crate::validator::Validator;

#[derive(Debug, Clone)]
pub struct Filters {
    pub page: u32,
    pub page_size: u32,
    pub sort: String,
    pub sort_safelist: &'static [&'static str],
}

impl Filters {
    pub const MAX_PAGE: u32 = 10_000_000;
    pub const MAX_PAGE_SIZE: u32 = 100;

    pub fn validate(&self, v: &mut Validator) {
        v.check(self.page > 0, "page", "must be greater than zero");
        v.check(self.page <= Self::MAX_PAGE, "page", "must be a maximum of 10 million");
        v.check(self.page_size > 0, "page_size", "must be greater than zero");
        v.check(self.page_size <= Self::MAX_PAGE_SIZE, "page_size", "must be a maximum of 100");
        v.check(
            Validator::permitted_value(self.sort.as_str(), self.sort_safelist),
            "sort",
            "invalid sort value",
        );
    }

    /// Column to order by. Only returns names present in the safelist, so the
    /// result can be interpolated into SQL.
    pub fn sort_column(&self) -> &'static str {
        self.sort_safelist
            .iter()
            .find(|safe| **safe == self.sort)
            .map(|safe| safe.trim_start_matches('-'))
            .unwrap_or("id")
    }

    pub fn descending(&self) -> bool {
        self.sort.starts_with('-')
    }

    pub fn sort_direction(&self) -> &'static str {
        if self.descending() {
            "DESC"
        } else {
            "ASC"
        }
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.page_size)
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page.saturating_sub(1)) * i64::from(self.page_size)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Metadata {
    #[serde(skip_serializing_if = "is_zero")]
    pub current_page: u32,
    #[serde(skip_serializing_if = "is_zero")]
    pub page_size: u32,
    #[serde(skip_serializing_if = "is_zero")]
    pub first_page: u32,
    #[serde(skip_serializing_if = "is_zero")]
    pub last_page: u32,
    #[serde(skip_serializing_if = "is_zero")]
    pub total_records: u32,
}

impl Metadata {
    pub fn calculate(total_records: u32, page: u32, page_size: u32) -> Self {
        if total_records == 0 || page_size == 0 {
            return Metadata::default();
        }
        Metadata {
            current_page: page,
            page_size,
            first_page: 1,
            last_page: total_records.div_ceil(page_size),
            total_records,
        }
    }
}

fn is_zero(n: &u32) -> bool {
    *n == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAFELIST: &[&str] = &["id", "title", "-id", "-title"];

    fn filters(page: u32, page_size: u32, sort: &str) -> Filters {
        Filters {
            page,
            page_size,
            sort: sort.to_string(),
            sort_safelist: SAFELIST,
        }
    }

    #[test]
    fn computes_offset_and_direction() {
        let f = filters(3, 20, "-title");
        assert_eq!(f.offset(), 40);
        assert_eq!(f.limit(), 20);
        assert_eq!(f.sort_column(), "title");
        assert_eq!(f.sort_direction(), "DESC");
    }

    #[test]
    fn rejects_unlisted_sort_and_bad_pages() {
        let mut v = Validator::new();
        filters(0, 500, "password").validate(&mut v);
        let errors = v.into_errors();
        assert!(errors.contains_key("page"));
        assert!(errors.contains_key("page_size"));
        assert!(errors.contains_key("sort"));
    }

    #[test]
    fn unlisted_sort_never_reaches_sql() {
        assert_eq!(filters(1, 20, "id; DROP TABLE movies").sort_column(), "id");
    }

    #[test]
    fn metadata_rounds_last_page_up() {
        let m = Metadata::calculate(41, 2, 20);
        assert_eq!(m.last_page, 3);
        assert_eq!(m.first_page, 1);
        assert_eq!(Metadata::calculate(0, 1, 20), Metadata::default());
        assert_eq!(serde_json::to_string(&Metadata::default()).unwrap(), "{}");
    }
}
