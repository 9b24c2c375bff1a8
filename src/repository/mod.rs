//! Repository layer: the Entity Store owning books, patrons and loans

pub mod memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    error::AppResult,
    models::{Book, Loan, LoanDetails, NewBook, NewLoan, NewPatron, Patron},
    query::{BookCriteria, LoanCriteria, PageRequest, PatronCriteria},
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Persistence contract used by the services.
///
/// Listings are ordered by primary key ascending. `find_and_count_*` return
/// the page of records together with the number of matches before slicing.
/// Updates report `AppError::NotFound` when the record has disappeared.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Store: Send + Sync {
    async fn find_book(&self, id: i32) -> AppResult<Option<Book>>;
    async fn find_all_books(&self) -> AppResult<Vec<Book>>;
    async fn find_and_count_books(
        &self,
        criteria: &BookCriteria,
        page: &PageRequest,
    ) -> AppResult<(Vec<Book>, i64)>;
    async fn create_book(&self, book: &NewBook) -> AppResult<Book>;
    async fn update_book(&self, book: &Book) -> AppResult<Book>;

    async fn find_patron(&self, id: i32) -> AppResult<Option<Patron>>;
    async fn find_all_patrons(&self) -> AppResult<Vec<Patron>>;
    async fn find_and_count_patrons(
        &self,
        criteria: &PatronCriteria,
        page: &PageRequest,
    ) -> AppResult<(Vec<Patron>, i64)>;
    async fn create_patron(&self, patron: &NewPatron) -> AppResult<Patron>;
    async fn update_patron(&self, patron: &Patron) -> AppResult<Patron>;

    async fn find_loan(&self, id: i32) -> AppResult<Option<LoanDetails>>;
    async fn find_all_loans(&self, criteria: &LoanCriteria) -> AppResult<Vec<LoanDetails>>;
    async fn find_and_count_loans(
        &self,
        criteria: &LoanCriteria,
        page: &PageRequest,
    ) -> AppResult<(Vec<LoanDetails>, i64)>;
    async fn create_loan(&self, loan: &NewLoan) -> AppResult<Loan>;
    async fn update_loan(&self, loan: &Loan) -> AppResult<Loan>;

    /// Connectivity probe for the readiness endpoint
    async fn ping(&self) -> AppResult<()>;
}

/// Store handle shared by all services
pub type SharedStore = Arc<dyn Store>;
