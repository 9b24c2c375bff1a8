//! View parameters handed to the page renderer.
//!
//! Every page gets a `title`, the entity or list it shows, the field `errors`
//! of a rejected submission and, for listings, the page `links`.

use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    models::{Book, BookForm, LoanDetails, LoanForm, Patron, PatronForm, ReturnLoanForm},
    pagination::PageLink,
    query::ListFilter,
    services::Listing,
    validation::ValidationErrors,
};

/// Book listing page
#[derive(Debug, Serialize, ToSchema)]
pub struct BooksView {
    pub title: String,
    pub books: Vec<Book>,
    pub total: i64,
    pub page: i64,
    pub links: Vec<PageLink>,
}

impl BooksView {
    pub fn new(filter: ListFilter, listing: Listing<Book>) -> Self {
        let title = match filter {
            ListFilter::All => "Books",
            ListFilter::Overdue => "Overdue Books",
            ListFilter::Checked => "Checked Out Books",
        };
        Self {
            title: title.to_string(),
            books: listing.items,
            total: listing.total,
            page: listing.page,
            links: listing.links,
        }
    }
}

/// New book form page
#[derive(Debug, Serialize, ToSchema)]
pub struct BookFormView {
    pub title: String,
    pub book: BookForm,
    #[serde(skip_serializing_if = "ValidationErrors::is_empty")]
    #[schema(value_type = Object)]
    pub errors: ValidationErrors,
}

/// Book detail page with its loan history
#[derive(Debug, Serialize, ToSchema)]
pub struct BookDetailView {
    pub title: String,
    pub book: BookForm,
    pub loans: Vec<LoanDetails>,
    #[serde(skip_serializing_if = "ValidationErrors::is_empty")]
    #[schema(value_type = Object)]
    pub errors: ValidationErrors,
}

/// Loan listing page
#[derive(Debug, Serialize, ToSchema)]
pub struct LoansView {
    pub title: String,
    pub loans: Vec<LoanDetails>,
    pub total: i64,
    pub page: i64,
    pub links: Vec<PageLink>,
}

impl LoansView {
    pub fn new(filter: ListFilter, listing: Listing<LoanDetails>) -> Self {
        let title = match filter {
            ListFilter::All => "Loans",
            ListFilter::Overdue => "Overdue Loans",
            ListFilter::Checked => "Checked Out Loans",
        };
        Self {
            title: title.to_string(),
            loans: listing.items,
            total: listing.total,
            page: listing.page,
            links: listing.links,
        }
    }
}

/// Checkout form page, with every book and patron to choose from
#[derive(Debug, Serialize, ToSchema)]
pub struct LoanFormView {
    pub title: String,
    pub loan: LoanForm,
    pub books: Vec<Book>,
    pub patrons: Vec<Patron>,
    #[serde(skip_serializing_if = "ValidationErrors::is_empty")]
    #[schema(value_type = Object)]
    pub errors: ValidationErrors,
}

/// Return-book page
#[derive(Debug, Serialize, ToSchema)]
pub struct ReturnLoanView {
    pub title: String,
    pub loan: LoanDetails,
    pub form: ReturnLoanForm,
    #[serde(skip_serializing_if = "ValidationErrors::is_empty")]
    #[schema(value_type = Object)]
    pub errors: ValidationErrors,
}

/// Patron listing page
#[derive(Debug, Serialize, ToSchema)]
pub struct PatronsView {
    pub title: String,
    pub patrons: Vec<Patron>,
    pub total: i64,
    pub page: i64,
    pub links: Vec<PageLink>,
}

impl From<Listing<Patron>> for PatronsView {
    fn from(listing: Listing<Patron>) -> Self {
        Self {
            title: "Patrons".to_string(),
            patrons: listing.items,
            total: listing.total,
            page: listing.page,
            links: listing.links,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PatronFormView {
    pub title: String,
    pub patron: PatronForm,
    #[serde(skip_serializing_if = "ValidationErrors::is_empty")]
    #[schema(value_type = Object)]
    pub errors: ValidationErrors,
}

/// Patron detail page with their loan history
#[derive(Debug, Serialize, ToSchema)]
pub struct PatronDetailView {
    pub title: String,
    pub patron: PatronForm,
    pub loans: Vec<LoanDetails>,
    #[serde(skip_serializing_if = "ValidationErrors::is_empty")]
    #[schema(value_type = Object)]
    pub errors: ValidationErrors,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errors_are_omitted_when_empty() {
        let view = BookFormView {
            title: "New Book".to_string(),
            book: BookForm::default(),
            errors: ValidationErrors::new(),
        };
        let json = serde_json::to_value(&view).unwrap();
        assert!(json.get("errors").is_none());

        let mut errors = ValidationErrors::new();
        errors.add("title", "Title is required");
        let view = BookFormView { errors, ..view };
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["errors"]["title"], "Title is required");
    }

    #[test]
    fn test_listing_titles() {
        let listing = Listing {
            items: Vec::new(),
            total: 0,
            page: 1,
            links: Vec::new(),
        };
        assert_eq!(BooksView::new(ListFilter::Overdue, listing.clone()).title, "Overdue Books");
        assert_eq!(BooksView::new(ListFilter::Checked, listing).title, "Checked Out Books");
    }
}
