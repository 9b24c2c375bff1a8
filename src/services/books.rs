//! Book catalog service

use std::sync::Arc;

use super::{Clock, Listing};
use crate::{
    config::LibraryConfig,
    error::{AppError, AppResult},
    models::{Book, BookForm, LoanDetails},
    query::{BookCriteria, ListFilter, ListParams, LoanCriteria, LoanSearch, PageRequest},
    repository::SharedStore,
    validation::ValidationErrors,
};

#[derive(Clone)]
pub struct BooksService {
    store: SharedStore,
    library: LibraryConfig,
    clock: Arc<dyn Clock>,
}

impl BooksService {
    pub fn new(store: SharedStore, library: LibraryConfig, clock: Arc<dyn Clock>) -> Self {
        Self { store, library, clock }
    }

    /// List books, optionally restricted to books on overdue or checked out loans.
    ///
    /// Filtered listings yield one entry per matching loan, so a book lent
    /// twice appears twice.
    pub async fn list(&self, params: &ListParams) -> AppResult<Listing<Book>> {
        let filter = params.filter();
        let search = params.search();
        let page = PageRequest::new(params.page_number(), self.library.page_size);

        let (books, total) = match filter {
            ListFilter::All => {
                self.store
                    .find_and_count_books(&BookCriteria::new(search), &page)
                    .await?
            }
            ListFilter::Overdue | ListFilter::Checked => {
                let criteria = LoanCriteria::with_state(filter.loan_state(self.clock.today()))
                    .search(Some(LoanSearch::Book(search.to_string())));
                let (loans, total) = self.store.find_and_count_loans(&criteria, &page).await?;
                (loans.into_iter().map(|details| details.book).collect(), total)
            }
        };

        tracing::debug!(?filter, search, page = page.number, total, "Listed books");

        Ok(Listing::new(books, total, &page, &self.library, filter, search))
    }

    /// Get a book by ID
    pub async fn get(&self, id: i32) -> AppResult<Book> {
        self.store
            .find_book(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book {} not found", id)))
    }

    /// Every loan of a book, returned or not
    pub async fn loans(&self, book_id: i32) -> AppResult<Vec<LoanDetails>> {
        self.store.find_all_loans(&LoanCriteria::for_book(book_id)).await
    }

    /// Get a book together with its loan history
    pub async fn details(&self, id: i32) -> AppResult<(Book, Vec<LoanDetails>)> {
        let book = self.get(id).await?;
        let loans = self.loans(book.id).await?;
        Ok((book, loans))
    }

    /// Create a book from a submitted form
    pub async fn create(&self, form: &BookForm) -> AppResult<Book> {
        let fields = form.validate()?;

        if let Some(id) = fields.id {
            if self.store.find_book(id).await?.is_some() {
                let mut errors = ValidationErrors::new();
                errors.add("id", format!("A book with id {} already exists", id));
                return Err(errors.into());
            }
        }

        let book = self.store.create_book(&fields).await?;
        tracing::info!(book_id = book.id, title = %book.title, "Book created");
        Ok(book)
    }

    /// Update a book: load it, report `NotFound` if absent, else apply the validated form
    pub async fn update(&self, id: i32, form: &BookForm) -> AppResult<Book> {
        let mut book = self.get(id).await?;
        let fields = form.validate()?;
        book.apply(fields);

        let book = self.store.update_book(&book).await?;
        tracing::info!(book_id = book.id, "Book updated");
        Ok(book)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::{book_form, loan_form, patron_form, services_on};

    fn params(filter: Option<&str>, search: Option<&str>, page: Option<&str>) -> ListParams {
        ListParams {
            filter: filter.map(String::from),
            search: search.map(String::from),
            page: page.map(String::from),
        }
    }

    #[tokio::test]
    async fn test_list_paginates_by_five() {
        let services = services_on("2020-01-10");
        for i in 1..=12 {
            services
                .books
                .create(&book_form(&format!("Book {}", i), "Anon"))
                .await
                .unwrap();
        }

        let listing = services.books.list(&params(None, None, Some("3"))).await.unwrap();
        assert_eq!(listing.total, 12);
        assert_eq!(listing.items.iter().map(|b| b.id).collect::<Vec<_>>(), vec![11, 12]);
        assert_eq!(listing.links.len(), 3);
        assert_eq!(listing.links[2].href, "?page=3");

        let clamped = services.books.list(&params(None, None, Some("0"))).await.unwrap();
        assert_eq!(clamped.page, 1);
        assert_eq!(clamped.items.len(), 5);
    }

    #[tokio::test]
    async fn test_list_searches_title_and_author() {
        let services = services_on("2020-01-10");
        services.books.create(&book_form("The Hobbit", "J.R.R. Tolkien")).await.unwrap();
        services.books.create(&book_form("Emma", "Jane Austen")).await.unwrap();
        services.books.create(&book_form("Tolkien: A Biography", "Humphrey Carpenter")).await.unwrap();

        let listing = services.books.list(&params(None, Some("TOLKIEN"), None)).await.unwrap();
        assert_eq!(listing.total, 2);
        assert_eq!(listing.links[0].href, "?search=TOLKIEN&page=1");
    }

    #[tokio::test]
    async fn test_overdue_and_checked_filters() {
        let services = services_on("2020-01-10");
        let hobbit = services.books.create(&book_form("The Hobbit", "Tolkien")).await.unwrap();
        let emma = services.books.create(&book_form("Emma", "Austen")).await.unwrap();
        let dracula = services.books.create(&book_form("Dracula", "Stoker")).await.unwrap();
        let patron = services.patrons.create(&patron_form("Ann", "Reader")).await.unwrap();

        // overdue
        services.loans.create(&loan_form(hobbit.id, patron.id, "2020-01-01", "2020-01-08")).await.unwrap();
        // due today, checked out but not overdue
        services.loans.create(&loan_form(emma.id, patron.id, "2020-01-03", "2020-01-10")).await.unwrap();
        // returned
        let returned = services
            .loans
            .create(&loan_form(dracula.id, patron.id, "2020-01-01", "2020-01-02"))
            .await
            .unwrap();
        services
            .loans
            .record_return(
                returned.id,
                &crate::models::ReturnLoanForm { returned_on: Some("2020-01-05".to_string()) },
            )
            .await
            .unwrap();

        let overdue = services.books.list(&params(Some("overdue"), None, None)).await.unwrap();
        assert_eq!(overdue.items, vec![hobbit.clone()]);
        assert_eq!(overdue.links[0].href, "?filter=overdue&page=1");

        let checked = services.books.list(&params(Some("checked"), None, None)).await.unwrap();
        assert_eq!(checked.items, vec![hobbit, emma]);

        let searched = services
            .books
            .list(&params(Some("checked"), Some("austen"), None))
            .await
            .unwrap();
        assert_eq!(searched.total, 1);
    }

    #[tokio::test]
    async fn test_create_with_empty_title_persists_nothing() {
        let services = services_on("2020-01-10");
        let err = services.books.create(&book_form("", "Anon")).await.unwrap_err();

        match err {
            AppError::Validation(errors) => {
                assert_eq!(errors.len(), 1);
                assert!(errors.contains("title"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(services.books.list(&ListParams::default()).await.unwrap().total, 0);
    }

    #[tokio::test]
    async fn test_create_rejects_taken_id() {
        let services = services_on("2020-01-10");
        let mut form = book_form("Emma", "Austen");
        form.id = Some("4".to_string());
        assert_eq!(services.books.create(&form).await.unwrap().id, 4);

        let err = services.books.create(&form).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(ref e) if e.contains("id")));
    }

    #[tokio::test]
    async fn test_update_unknown_book_is_not_found() {
        let services = services_on("2020-01-10");
        let err = services.books.update(42, &book_form("Emma", "Austen")).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(services.books.list(&ListParams::default()).await.unwrap().total, 0);
    }

    #[tokio::test]
    async fn test_update_is_idempotent() {
        let services = services_on("2020-01-10");
        let book = services.books.create(&book_form("Emma", "Austen")).await.unwrap();

        let mut form = book_form("Emma", "Jane Austen");
        form.first_published = Some("1815".to_string());

        let first = services.books.update(book.id, &form).await.unwrap();
        let second = services.books.update(book.id, &form).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(services.books.get(book.id).await.unwrap(), second);
        assert_eq!(second.first_published, Some(1815));
    }

    #[tokio::test]
    async fn test_invalid_update_leaves_record_unchanged() {
        let services = services_on("2020-01-10");
        let book = services.books.create(&book_form("Emma", "Austen")).await.unwrap();

        let err = services.books.update(book.id, &book_form("Emma", " ")).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(ref e) if e.contains("author")));
        assert_eq!(services.books.get(book.id).await.unwrap(), book);
    }
}
