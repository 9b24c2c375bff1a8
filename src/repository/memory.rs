//! In-process store kept behind a tokio `RwLock`.
//!
//! Mirrors the Postgres schema constraints that matter to the services:
//! unique ids, loans referencing existing books and patrons, and primary key
//! ordering for every listing.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::Store;
use crate::{
    error::{AppError, AppResult},
    models::{Book, Loan, LoanDetails, NewBook, NewLoan, NewPatron, Patron},
    query::{BookCriteria, LoanCriteria, PageRequest, PatronCriteria},
};

#[derive(Debug, Default)]
struct Tables {
    books: BTreeMap<i32, Book>,
    patrons: BTreeMap<i32, Patron>,
    loans: BTreeMap<i32, Loan>,
}

impl Tables {
    fn details(&self, loan: &Loan) -> AppResult<LoanDetails> {
        let book = self.books.get(&loan.book_id).cloned().ok_or_else(|| {
            AppError::Internal(format!("Loan {} references missing book {}", loan.id, loan.book_id))
        })?;
        let patron = self.patrons.get(&loan.patron_id).cloned().ok_or_else(|| {
            AppError::Internal(format!(
                "Loan {} references missing patron {}",
                loan.id, loan.patron_id
            ))
        })?;
        Ok(LoanDetails {
            loan: loan.clone(),
            book,
            patron,
        })
    }

    fn matching_loans(&self, criteria: &LoanCriteria) -> AppResult<Vec<LoanDetails>> {
        let mut matching = Vec::new();
        for loan in self.loans.values() {
            let details = self.details(loan)?;
            if criteria.matches(&details) {
                matching.push(details);
            }
        }
        Ok(matching)
    }
}

/// Pick the requested id, or one past the current maximum
fn assign_id<T>(table: &BTreeMap<i32, T>, requested: Option<i32>, kind: &str) -> AppResult<i32> {
    match requested {
        Some(id) if table.contains_key(&id) => {
            Err(AppError::Conflict(format!("{} {} already exists", kind, id)))
        }
        Some(id) => Ok(id),
        None => match table.keys().next_back() {
            None => Ok(1),
            Some(max) => max
                .checked_add(1)
                .ok_or_else(|| AppError::Conflict(format!("No {} ids left after {}", kind, max))),
        },
    }
}

fn page_of<T>(matching: Vec<T>, page: &PageRequest) -> (Vec<T>, i64) {
    let total = matching.len() as i64;
    (page.slice(matching), total)
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_book(&self, id: i32) -> AppResult<Option<Book>> {
        Ok(self.tables.read().await.books.get(&id).cloned())
    }

    async fn find_all_books(&self) -> AppResult<Vec<Book>> {
        Ok(self.tables.read().await.books.values().cloned().collect())
    }

    async fn find_and_count_books(
        &self,
        criteria: &BookCriteria,
        page: &PageRequest,
    ) -> AppResult<(Vec<Book>, i64)> {
        let tables = self.tables.read().await;
        let matching: Vec<Book> = tables
            .books
            .values()
            .filter(|book| criteria.matches(book))
            .cloned()
            .collect();
        Ok(page_of(matching, page))
    }

    async fn create_book(&self, book: &NewBook) -> AppResult<Book> {
        let mut tables = self.tables.write().await;
        let id = assign_id(&tables.books, book.id, "Book")?;
        let record = Book {
            id,
            title: book.title.clone(),
            author: book.author.clone(),
            genre: book.genre.clone(),
            first_published: book.first_published,
        };
        tables.books.insert(id, record.clone());
        Ok(record)
    }

    async fn update_book(&self, book: &Book) -> AppResult<Book> {
        let mut tables = self.tables.write().await;
        let slot = tables
            .books
            .get_mut(&book.id)
            .ok_or_else(|| AppError::NotFound(format!("Book {} not found", book.id)))?;
        *slot = book.clone();
        Ok(book.clone())
    }

    async fn find_patron(&self, id: i32) -> AppResult<Option<Patron>> {
        Ok(self.tables.read().await.patrons.get(&id).cloned())
    }

    async fn find_all_patrons(&self) -> AppResult<Vec<Patron>> {
        Ok(self.tables.read().await.patrons.values().cloned().collect())
    }

    async fn find_and_count_patrons(
        &self,
        criteria: &PatronCriteria,
        page: &PageRequest,
    ) -> AppResult<(Vec<Patron>, i64)> {
        let tables = self.tables.read().await;
        let matching: Vec<Patron> = tables
            .patrons
            .values()
            .filter(|patron| criteria.matches(patron))
            .cloned()
            .collect();
        Ok(page_of(matching, page))
    }

    async fn create_patron(&self, patron: &NewPatron) -> AppResult<Patron> {
        let mut tables = self.tables.write().await;
        let id = assign_id(&tables.patrons, patron.id, "Patron")?;
        let record = Patron {
            id,
            first_name: patron.first_name.clone(),
            last_name: patron.last_name.clone(),
            address: patron.address.clone(),
            email: patron.email.clone(),
            library_id: patron.library_id.clone(),
            zip_code: patron.zip_code,
        };
        tables.patrons.insert(id, record.clone());
        Ok(record)
    }

    async fn update_patron(&self, patron: &Patron) -> AppResult<Patron> {
        let mut tables = self.tables.write().await;
        let slot = tables
            .patrons
            .get_mut(&patron.id)
            .ok_or_else(|| AppError::NotFound(format!("Patron {} not found", patron.id)))?;
        *slot = patron.clone();
        Ok(patron.clone())
    }

    async fn find_loan(&self, id: i32) -> AppResult<Option<LoanDetails>> {
        let tables = self.tables.read().await;
        tables.loans.get(&id).map(|loan| tables.details(loan)).transpose()
    }

    async fn find_all_loans(&self, criteria: &LoanCriteria) -> AppResult<Vec<LoanDetails>> {
        self.tables.read().await.matching_loans(criteria)
    }

    async fn find_and_count_loans(
        &self,
        criteria: &LoanCriteria,
        page: &PageRequest,
    ) -> AppResult<(Vec<LoanDetails>, i64)> {
        let matching = self.tables.read().await.matching_loans(criteria)?;
        Ok(page_of(matching, page))
    }

    async fn create_loan(&self, loan: &NewLoan) -> AppResult<Loan> {
        let mut tables = self.tables.write().await;

        if !tables.books.contains_key(&loan.book_id) {
            return Err(AppError::BadRequest(format!("Book {} does not exist", loan.book_id)));
        }
        if !tables.patrons.contains_key(&loan.patron_id) {
            return Err(AppError::BadRequest(format!(
                "Patron {} does not exist",
                loan.patron_id
            )));
        }

        let id = assign_id(&tables.loans, loan.id, "Loan")?;
        let record = Loan {
            id,
            book_id: loan.book_id,
            patron_id: loan.patron_id,
            loaned_on: loan.loaned_on,
            return_by: loan.return_by,
            returned_on: loan.returned_on,
        };
        tables.loans.insert(id, record.clone());
        Ok(record)
    }

    async fn update_loan(&self, loan: &Loan) -> AppResult<Loan> {
        let mut tables = self.tables.write().await;
        let slot = tables
            .loans
            .get_mut(&loan.id)
            .ok_or_else(|| AppError::NotFound(format!("Loan {} not found", loan.id)))?;
        *slot = loan.clone();
        Ok(loan.clone())
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}
