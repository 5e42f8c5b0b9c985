//! Filter → sort → paginate pipeline behind `GET /experiences`.
//!
//! Both stores share the types here so that ordering, clamping and page
//! arithmetic are defined once.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::repo_types::Experience;

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Newest first.
    #[default]
    Recent,
    Oldest,
    /// Company A→Z, newest first within a company.
    Company,
}

impl SortOrder {
    pub const NAMES: &'static [&'static str] = &["recent", "oldest", "company"];

    /// `ORDER BY` clause over `experiences e`. Record id breaks every tie.
    pub fn order_by(self) -> &'static str {
        match self {
            SortOrder::Recent => "e.created_at DESC, e.id DESC",
            SortOrder::Oldest => "e.created_at ASC, e.id DESC",
            SortOrder::Company => "e.company ASC, e.created_at DESC, e.id DESC",
        }
    }

    /// In-process equivalent of [`SortOrder::order_by`].
    ///
    /// Company names compare bytewise, as the `company` column's `C`
    /// collation does, so upper-case names sort before lower-case ones.
    pub fn compare(self, a: &Experience, b: &Experience) -> Ordering {
        let primary = match self {
            SortOrder::Recent => b.created_at.cmp(&a.created_at),
            SortOrder::Oldest => a.created_at.cmp(&b.created_at),
            SortOrder::Company => a
                .company
                .cmp(&b.company)
                .then_with(|| b.created_at.cmp(&a.created_at)),
        };
        primary.then_with(|| b.id.cmp(&a.id))
    }
}

/// Exact-match filter. Matching is case-sensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListFilter {
    pub company: Option<String>,
    pub role: Option<String>,
}

impl ListFilter {
    /// Empty strings mean "no filter".
    pub fn new(company: Option<String>, role: Option<String>) -> Self {
        Self {
            company: company.filter(|c| !c.is_empty()),
            role: role.filter(|r| !r.is_empty()),
        }
    }

    pub fn matches(&self, e: &Experience) -> bool {
        self.company.as_ref().map_or(true, |c| *c == e.company)
            && self.role.as_ref().map_or(true, |r| *r == e.role)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub filter: ListFilter,
    pub page: u32,
    pub page_size: u32,
    pub sort: SortOrder,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            filter: ListFilter::default(),
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            sort: SortOrder::default(),
        }
    }
}

impl ListQuery {
    /// Build from raw query text. Values with no leading digits, or zero, fall
    /// back to the defaults, then `page` is raised to 1 and `limit` clamped to
    /// `1..=50`.
    pub fn from_raw(
        filter: ListFilter,
        page: Option<&str>,
        limit: Option<&str>,
        sort: Option<SortOrder>,
    ) -> Self {
        let page = parse_or(page, 1).clamp(1, i64::from(u32::MAX));
        let page_size = parse_or(limit, i64::from(DEFAULT_PAGE_SIZE))
            .clamp(1, i64::from(MAX_PAGE_SIZE));
        Self {
            filter,
            page: u32::try_from(page).unwrap_or(1),
            page_size: u32::try_from(page_size).unwrap_or(DEFAULT_PAGE_SIZE),
            sort: sort.unwrap_or_default(),
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.page_size)
    }
}

/// Reads the leading integer of `raw` the way browsers' `parseInt` does:
/// `"2abc"` is 2, `"3.9"` is 3, `"abc"` has none.
fn leading_int(raw: &str) -> Option<i64> {
    let s = raw.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    let n = digits[..end].parse::<i64>().unwrap_or(i64::MAX);
    Some(if negative { -n } else { n })
}

fn parse_or(raw: Option<&str>, default: i64) -> i64 {
    match raw.and_then(leading_int) {
        Some(n) if n != 0 => n,
        _ => default,
    }
}

/// One page of results plus counts for the whole filtered set.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    /// Never 0, so "page 1 of 1" renders for an empty result.
    pub total_pages: u64,
    pub page: u32,
    pub page_size: u32,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64, query: &ListQuery) -> Self {
        Self {
            items,
            total,
            total_pages: total_pages(total, query.page_size),
            page: query.page,
            page_size: query.page_size,
        }
    }
}

pub fn total_pages(total: u64, page_size: u32) -> u64 {
    total.div_ceil(u64::from(page_size.max(1))).max(1)
}
