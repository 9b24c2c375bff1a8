//! Listing filters, search and page selection.
//!
//! Listing requests are turned into criteria values here. Each criteria type
//! carries a `matches` predicate describing exactly which records belong to
//! the listing; store implementations either evaluate it directly or render
//! the same conditions as SQL.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::models::{Book, LoanDetails, Patron};

/// Listing query parameters: `filter`, `page` and `search`
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListParams {
    /// `overdue` or `checked`; anything else lists everything
    pub filter: Option<String>,
    /// Page number, starting at 1
    pub page: Option<String>,
    /// Case-insensitive text search
    pub search: Option<String>,
}

impl ListParams {
    pub fn filter(&self) -> ListFilter {
        ListFilter::parse(self.filter.as_deref())
    }

    /// Search term with surrounding whitespace removed; empty when absent
    pub fn search(&self) -> &str {
        self.search.as_deref().map(str::trim).unwrap_or_default()
    }

    /// Requested page number; unparsable or missing pages read as 1
    pub fn page_number(&self) -> i64 {
        self.page
            .as_deref()
            .and_then(|p| p.trim().parse::<i64>().ok())
            .unwrap_or(1)
    }
}

/// Loan state filter shared by the book and loan listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ListFilter {
    All,
    Overdue,
    Checked,
}

impl ListFilter {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("overdue") => ListFilter::Overdue,
            Some("checked") => ListFilter::Checked,
            _ => ListFilter::All,
        }
    }

    /// Value echoed back in page links
    pub fn as_param(&self) -> Option<&'static str> {
        match self {
            ListFilter::All => None,
            ListFilter::Overdue => Some("overdue"),
            ListFilter::Checked => Some("checked"),
        }
    }

    /// Loan state matching this filter on `today`
    pub fn loan_state(&self, today: NaiveDate) -> LoanState {
        match self {
            ListFilter::All => LoanState::Any,
            ListFilter::Overdue => LoanState::Overdue { today },
            ListFilter::Checked => LoanState::CheckedOut,
        }
    }
}

/// Limit/offset window for one listing page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// Page number after clamping, starting at 1
    pub number: i64,
    pub limit: i64,
    pub offset: i64,
}

impl PageRequest {
    /// Page numbers below 1 are clamped to 1
    pub fn new(number: i64, page_size: u64) -> Self {
        let number = number.max(1);
        let limit = i64::try_from(page_size.max(1)).unwrap_or(i64::MAX);
        Self {
            number,
            limit,
            offset: (number - 1).saturating_mul(limit),
        }
    }

    /// Slice an already ordered sequence down to this page
    pub fn slice<T>(&self, items: Vec<T>) -> Vec<T> {
        let offset = usize::try_from(self.offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(self.limit).unwrap_or(usize::MAX);
        items.into_iter().skip(offset).take(limit).collect()
    }
}

/// Case-insensitive substring test; an empty needle matches everything
pub fn contains_ci(haystack: &str, needle: &str) -> bool {
    needle.is_empty() || haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Books whose title or author contains the search term
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookCriteria {
    pub search: String,
}

impl BookCriteria {
    pub fn new(search: &str) -> Self {
        Self {
            search: search.to_string(),
        }
    }

    pub fn matches(&self, book: &Book) -> bool {
        contains_ci(&book.title, &self.search) || contains_ci(&book.author, &self.search)
    }
}

/// Patrons whose first name, last name, library id or email contains the term
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatronCriteria {
    pub search: String,
}

impl PatronCriteria {
    pub fn new(search: &str) -> Self {
        Self {
            search: search.to_string(),
        }
    }

    pub fn matches(&self, patron: &Patron) -> bool {
        [&patron.first_name, &patron.last_name, &patron.library_id, &patron.email]
            .iter()
            .any(|field| contains_ci(field, &self.search))
    }
}

/// Return state of a loan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoanState {
    Any,
    /// `returned_on` is absent
    CheckedOut,
    /// `returned_on` is absent and `return_by < today`
    Overdue { today: NaiveDate },
}

/// Which joined columns a loan search looks at
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoanSearch {
    /// Book title or author, used when the book listing is filtered by loans
    Book(String),
    /// Book title, patron first name or patron last name
    BookOrPatron(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoanCriteria {
    pub state: LoanState,
    pub book_id: Option<i32>,
    pub patron_id: Option<i32>,
    pub search: Option<LoanSearch>,
}

impl Default for LoanCriteria {
    fn default() -> Self {
        Self {
            state: LoanState::Any,
            book_id: None,
            patron_id: None,
            search: None,
        }
    }
}

impl LoanCriteria {
    pub fn with_state(state: LoanState) -> Self {
        Self {
            state,
            ..Default::default()
        }
    }

    /// All loans of one book
    pub fn for_book(book_id: i32) -> Self {
        Self {
            book_id: Some(book_id),
            ..Default::default()
        }
    }

    /// All loans of one patron
    pub fn for_patron(patron_id: i32) -> Self {
        Self {
            patron_id: Some(patron_id),
            ..Default::default()
        }
    }

    pub fn search(mut self, search: Option<LoanSearch>) -> Self {
        self.search = search.filter(|s| !s.term().is_empty());
        self
    }

    pub fn matches(&self, details: &LoanDetails) -> bool {
        let loan = &details.loan;

        let state_ok = match self.state {
            LoanState::Any => true,
            LoanState::CheckedOut => loan.is_checked_out(),
            LoanState::Overdue { today } => loan.is_overdue(today),
        };

        let search_ok = match &self.search {
            None => true,
            Some(LoanSearch::Book(term)) => {
                contains_ci(&details.book.title, term) || contains_ci(&details.book.author, term)
            }
            Some(LoanSearch::BookOrPatron(term)) => {
                contains_ci(&details.book.title, term)
                    || contains_ci(&details.patron.first_name, term)
                    || contains_ci(&details.patron.last_name, term)
            }
        };

        state_ok
            && search_ok
            && self.book_id.map_or(true, |id| loan.book_id == id)
            && self.patron_id.map_or(true, |id| loan.patron_id == id)
    }
}

impl LoanSearch {
    pub fn term(&self) -> &str {
        match self {
            LoanSearch::Book(term) | LoanSearch::BookOrPatron(term) => term,
        }
    }
}
