//! Page links for listing views

use serde::Serialize;
use utoipa::ToSchema;

/// One numbered link below a listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct PageLink {
    /// Page number, starting at 1
    pub num: u64,
    /// Query string for the page, e.g. `?filter=overdue&search=tolkien&page=2`
    pub href: String,
}

/// Number of pages needed to show `result_count` records
pub fn total_pages(result_count: u64, page_size: u64) -> u64 {
    result_count.div_ceil(page_size.max(1))
}

/// Build the links for every page of a listing.
///
/// An empty listing gets no links at all rather than a single dead page 1.
pub fn pagination_links(
    result_count: u64,
    page_size: u64,
    filter: Option<&str>,
    search: Option<&str>,
) -> Vec<PageLink> {
    (1..=total_pages(result_count, page_size))
        .map(|num| PageLink {
            num,
            href: build_link(filter, search, Some(num)),
        })
        .collect()
}

/// Query string carrying `filter`, `search` and `page`, always in that order.
///
/// Blank parts are left out and values are percent-encoded.
pub fn build_link(filter: Option<&str>, search: Option<&str>, page: Option<u64>) -> String {
    let mut parts = Vec::with_capacity(3);

    if let Some(filter) = filter.filter(|f| !f.is_empty()) {
        parts.push(format!("filter={}", urlencoding::encode(filter)));
    }
    if let Some(search) = search.filter(|s| !s.is_empty()) {
        parts.push(format!("search={}", urlencoding::encode(search)));
    }
    if let Some(page) = page {
        parts.push(format!("page={}", page));
    }

    format!("?{}", parts.join("&"))
}
