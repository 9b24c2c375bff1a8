//! Loan management service

use std::sync::Arc;

use super::{Clock, Listing};
use crate::{
    config::LibraryConfig,
    error::{AppError, AppResult},
    models::{Book, Loan, LoanDetails, LoanForm, Patron, ReturnLoanForm},
    query::{ListParams, LoanCriteria, LoanSearch, PageRequest},
    repository::SharedStore,
    validation::ValidationErrors,
};

#[derive(Clone)]
pub struct LoansService {
    store: SharedStore,
    library: LibraryConfig,
    clock: Arc<dyn Clock>,
}

impl LoansService {
    pub fn new(store: SharedStore, library: LibraryConfig, clock: Arc<dyn Clock>) -> Self {
        Self { store, library, clock }
    }

    /// List loans filtered by state and searched by book title or patron name
    pub async fn list(&self, params: &ListParams) -> AppResult<Listing<LoanDetails>> {
        let filter = params.filter();
        let search = params.search();
        let page = PageRequest::new(params.page_number(), self.library.page_size);

        let criteria = LoanCriteria::with_state(filter.loan_state(self.clock.today()))
            .search(Some(LoanSearch::BookOrPatron(search.to_string())));
        let (loans, total) = self.store.find_and_count_loans(&criteria, &page).await?;

        tracing::debug!(?filter, search, page = page.number, total, "Listed loans");

        Ok(Listing::new(loans, total, &page, &self.library, filter, search))
    }

    /// Get a loan with its book and patron
    pub async fn get(&self, id: i32) -> AppResult<LoanDetails> {
        self.store
            .find_loan(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan {} not found", id)))
    }

    /// Blank checkout form: loaned today, due after the configured loan period
    pub fn checkout_form(&self) -> LoanForm {
        LoanForm::prefilled(self.clock.today(), self.library.loan_period_days)
    }

    /// Books and patrons offered on the checkout form
    pub async fn choices(&self) -> AppResult<(Vec<Book>, Vec<Patron>)> {
        let books = self.store.find_all_books().await?;
        let patrons = self.store.find_all_patrons().await?;
        Ok((books, patrons))
    }

    /// Check out a book to a patron
    pub async fn create(&self, form: &LoanForm) -> AppResult<Loan> {
        let fields = form.validate()?;

        let mut errors = ValidationErrors::new();
        if self.store.find_book(fields.book_id).await?.is_none() {
            errors.add("book_id", format!("Book {} does not exist", fields.book_id));
        }
        if self.store.find_patron(fields.patron_id).await?.is_none() {
            errors.add("patron_id", format!("Patron {} does not exist", fields.patron_id));
        }
        if let Some(id) = fields.id {
            if self.store.find_loan(id).await?.is_some() {
                errors.add("id", format!("A loan with id {} already exists", id));
            }
        }
        errors.into_result()?;

        let loan = self.store.create_loan(&fields).await?;
        tracing::info!(
            loan_id = loan.id,
            book_id = loan.book_id,
            patron_id = loan.patron_id,
            return_by = %loan.return_by,
            "Loan created"
        );
        Ok(loan)
    }

    /// Return form for a loan, pre-filled with today's date
    pub async fn return_form(&self, id: i32) -> AppResult<(LoanDetails, ReturnLoanForm)> {
        let details = self.get(id).await?;
        Ok((details, ReturnLoanForm::prefilled(self.clock.today())))
    }

    /// Record the return of a book: load the loan, report `NotFound` if absent,
    /// else set `returned_on` from the validated form
    pub async fn record_return(&self, id: i32, form: &ReturnLoanForm) -> AppResult<Loan> {
        let mut loan = self.get(id).await?.loan;
        let returned_on = form.validate()?;
        loan.returned_on = Some(returned_on);

        let loan = self.store.update_loan(&loan).await?;
        tracing::info!(loan_id = loan.id, returned_on = %returned_on, "Loan returned");
        Ok(loan)
    }
}
