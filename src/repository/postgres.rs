//! Postgres-backed store

use async_trait::async_trait;
use sqlx::{
    postgres::{PgPoolOptions, PgRow},
    Pool, Postgres, QueryBuilder, Row,
};

use super::Store;
use crate::{
    config::DatabaseConfig,
    error::{AppError, AppResult},
    models::{Book, Loan, LoanDetails, NewBook, NewLoan, NewPatron, Patron},
    query::{BookCriteria, LoanCriteria, LoanSearch, LoanState, PageRequest, PatronCriteria},
};

const LOAN_SELECT: &str = r#"
    SELECT l.id, l.book_id, l.patron_id, l.loaned_on, l.return_by, l.returned_on,
           b.title, b.author, b.genre, b.first_published,
           p.first_name, p.last_name, p.address, p.email, p.library_id, p.zip_code
    FROM loans l
    JOIN books b ON b.id = l.book_id
    JOIN patrons p ON p.id = l.patron_id
"#;

const LOAN_COUNT: &str = r#"
    SELECT COUNT(*)
    FROM loans l
    JOIN books b ON b.id = l.book_id
    JOIN patrons p ON p.id = l.patron_id
"#;

/// `%term%` for ILIKE with the pattern metacharacters escaped
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

fn push_loan_filters(builder: &mut QueryBuilder<'static, Postgres>, criteria: &LoanCriteria) {
    builder.push(" WHERE TRUE");

    match criteria.state {
        LoanState::Any => {}
        LoanState::CheckedOut => {
            builder.push(" AND l.returned_on IS NULL");
        }
        LoanState::Overdue { today } => {
            builder
                .push(" AND l.returned_on IS NULL AND l.return_by < ")
                .push_bind(today);
        }
    }

    if let Some(book_id) = criteria.book_id {
        builder.push(" AND l.book_id = ").push_bind(book_id);
    }
    if let Some(patron_id) = criteria.patron_id {
        builder.push(" AND l.patron_id = ").push_bind(patron_id);
    }

    match &criteria.search {
        None => {}
        Some(LoanSearch::Book(term)) => {
            let pattern = like_pattern(term);
            builder
                .push(" AND (b.title ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR b.author ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        Some(LoanSearch::BookOrPatron(term)) => {
            let pattern = like_pattern(term);
            builder
                .push(" AND (b.title ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR p.first_name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR p.last_name ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
    }
}

fn loan_details_from_row(row: &PgRow) -> Result<LoanDetails, sqlx::Error> {
    let book_id: i32 = row.try_get("book_id")?;
    let patron_id: i32 = row.try_get("patron_id")?;

    Ok(LoanDetails {
        loan: Loan {
            id: row.try_get("id")?,
            book_id,
            patron_id,
            loaned_on: row.try_get("loaned_on")?,
            return_by: row.try_get("return_by")?,
            returned_on: row.try_get("returned_on")?,
        },
        book: Book {
            id: book_id,
            title: row.try_get("title")?,
            author: row.try_get("author")?,
            genre: row.try_get("genre")?,
            first_published: row.try_get("first_published")?,
        },
        patron: Patron {
            id: patron_id,
            first_name: row.try_get("first_name")?,
            last_name: row.try_get("last_name")?,
            address: row.try_get("address")?,
            email: row.try_get("email")?,
            library_id: row.try_get("library_id")?,
            zip_code: row.try_get("zip_code")?,
        },
    })
}

/// Translate constraint violations on insert into request-level errors
fn insert_error(kind: &str, err: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return AppError::Conflict(format!("{} already exists", kind));
        }
        if db.is_foreign_key_violation() {
            return AppError::BadRequest(format!("{} references a missing record", kind));
        }
        // sequence_generator_limit_exceeded: the identity reached i32::MAX
        if db.code().as_deref() == Some("2200H") {
            return AppError::Conflict(format!("No {} ids left", kind));
        }
    }
    AppError::Database(err)
}

#[derive(Clone)]
pub struct PgStore {
    pool: Pool<Postgres>,
}

impl PgStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Open a connection pool and bring the schema up to date
    pub async fn connect(config: &DatabaseConfig) -> AppResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .connect(&config.url)
            .await?;

        tracing::info!("Connected to database");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| AppError::Internal(format!("Database migrations failed: {}", e)))?;

        tracing::info!("Database migrations completed");

        Ok(Self::new(pool))
    }

    /// Move the identity sequence past explicitly inserted ids
    async fn sync_identity(
        tx: &mut sqlx::Transaction<'_, Postgres>,
        table: &'static str,
    ) -> AppResult<()> {
        let statement = format!(
            "SELECT setval(pg_get_serial_sequence('{table}', 'id'), (SELECT MAX(id) FROM {table}))"
        );
        sqlx::query(&statement).execute(&mut **tx).await?;
        Ok(())
    }
}

#[async_trait]
impl Store for PgStore {
    async fn find_book(&self, id: i32) -> AppResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(book)
    }

    async fn find_all_books(&self) -> AppResult<Vec<Book>> {
        let books = sqlx::query_as::<_, Book>("SELECT * FROM books ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(books)
    }

    async fn find_and_count_books(
        &self,
        criteria: &BookCriteria,
        page: &PageRequest,
    ) -> AppResult<(Vec<Book>, i64)> {
        let pattern = like_pattern(&criteria.search);

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM books WHERE title ILIKE $1 OR author ILIKE $1",
        )
        .bind(&pattern)
        .fetch_one(&self.pool)
        .await?;

        let books = sqlx::query_as::<_, Book>(
            r#"
            SELECT * FROM books
            WHERE title ILIKE $1 OR author ILIKE $1
            ORDER BY id
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(&pattern)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;

        Ok((books, total))
    }

    async fn create_book(&self, book: &NewBook) -> AppResult<Book> {
        let mut tx = self.pool.begin().await?;

        let created = match book.id {
            Some(id) => sqlx::query_as::<_, Book>(
                r#"
                INSERT INTO books (id, title, author, genre, first_published)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING *
                "#,
            )
            .bind(id),
            None => sqlx::query_as::<_, Book>(
                r#"
                INSERT INTO books (title, author, genre, first_published)
                VALUES ($1, $2, $3, $4)
                RETURNING *
                "#,
            ),
        }
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.genre)
        .bind(book.first_published)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| insert_error("Book", e))?;

        if book.id.is_some() {
            Self::sync_identity(&mut tx, "books").await?;
        }
        tx.commit().await?;

        Ok(created)
    }

    async fn update_book(&self, book: &Book) -> AppResult<Book> {
        sqlx::query_as::<_, Book>(
            r#"
            UPDATE books SET title = $1, author = $2, genre = $3, first_published = $4
            WHERE id = $5
            RETURNING *
            "#,
        )
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.genre)
        .bind(book.first_published)
        .bind(book.id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Book {} not found", book.id)))
    }

    async fn find_patron(&self, id: i32) -> AppResult<Option<Patron>> {
        let patron = sqlx::query_as::<_, Patron>("SELECT * FROM patrons WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(patron)
    }

    async fn find_all_patrons(&self) -> AppResult<Vec<Patron>> {
        let patrons = sqlx::query_as::<_, Patron>("SELECT * FROM patrons ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(patrons)
    }

    async fn find_and_count_patrons(
        &self,
        criteria: &PatronCriteria,
        page: &PageRequest,
    ) -> AppResult<(Vec<Patron>, i64)> {
        let pattern = like_pattern(&criteria.search);
        let condition = "first_name ILIKE $1 OR last_name ILIKE $1 OR library_id ILIKE $1 OR email ILIKE $1";

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM patrons WHERE {}", condition))
            .bind(&pattern)
            .fetch_one(&self.pool)
            .await?;

        let patrons = sqlx::query_as::<_, Patron>(&format!(
            "SELECT * FROM patrons WHERE {} ORDER BY id LIMIT $2 OFFSET $3",
            condition
        ))
        .bind(&pattern)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;

        Ok((patrons, total))
    }

    async fn create_patron(&self, patron: &NewPatron) -> AppResult<Patron> {
        let mut tx = self.pool.begin().await?;

        let created = match patron.id {
            Some(id) => sqlx::query_as::<_, Patron>(
                r#"
                INSERT INTO patrons (id, first_name, last_name, address, email, library_id, zip_code)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                RETURNING *
                "#,
            )
            .bind(id),
            None => sqlx::query_as::<_, Patron>(
                r#"
                INSERT INTO patrons (first_name, last_name, address, email, library_id, zip_code)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING *
                "#,
            ),
        }
        .bind(&patron.first_name)
        .bind(&patron.last_name)
        .bind(&patron.address)
        .bind(&patron.email)
        .bind(&patron.library_id)
        .bind(patron.zip_code)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| insert_error("Patron", e))?;

        if patron.id.is_some() {
            Self::sync_identity(&mut tx, "patrons").await?;
        }
        tx.commit().await?;

        Ok(created)
    }

    async fn update_patron(&self, patron: &Patron) -> AppResult<Patron> {
        sqlx::query_as::<_, Patron>(
            r#"
            UPDATE patrons
            SET first_name = $1, last_name = $2, address = $3, email = $4,
                library_id = $5, zip_code = $6
            WHERE id = $7
            RETURNING *
            "#,
        )
        .bind(&patron.first_name)
        .bind(&patron.last_name)
        .bind(&patron.address)
        .bind(&patron.email)
        .bind(&patron.library_id)
        .bind(patron.zip_code)
        .bind(patron.id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Patron {} not found", patron.id)))
    }

    async fn find_loan(&self, id: i32) -> AppResult<Option<LoanDetails>> {
        let mut builder = QueryBuilder::<Postgres>::new(LOAN_SELECT);
        builder.push(" WHERE l.id = ").push_bind(id);

        let row = builder.build().fetch_optional(&self.pool).await?;
        Ok(row.as_ref().map(loan_details_from_row).transpose()?)
    }

    async fn find_all_loans(&self, criteria: &LoanCriteria) -> AppResult<Vec<LoanDetails>> {
        let mut builder = QueryBuilder::<Postgres>::new(LOAN_SELECT);
        push_loan_filters(&mut builder, criteria);
        builder.push(" ORDER BY l.id");

        let rows = builder.build().fetch_all(&self.pool).await?;
        Ok(rows
            .iter()
            .map(loan_details_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn find_and_count_loans(
        &self,
        criteria: &LoanCriteria,
        page: &PageRequest,
    ) -> AppResult<(Vec<LoanDetails>, i64)> {
        let mut count = QueryBuilder::<Postgres>::new(LOAN_COUNT);
        push_loan_filters(&mut count, criteria);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut builder = QueryBuilder::<Postgres>::new(LOAN_SELECT);
        push_loan_filters(&mut builder, criteria);
        builder
            .push(" ORDER BY l.id LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset);

        let rows = builder.build().fetch_all(&self.pool).await?;
        let loans = rows
            .iter()
            .map(loan_details_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok((loans, total))
    }

    async fn create_loan(&self, loan: &NewLoan) -> AppResult<Loan> {
        let mut tx = self.pool.begin().await?;

        let created = match loan.id {
            Some(id) => sqlx::query_as::<_, Loan>(
                r#"
                INSERT INTO loans (id, book_id, patron_id, loaned_on, return_by, returned_on)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING *
                "#,
            )
            .bind(id),
            None => sqlx::query_as::<_, Loan>(
                r#"
                INSERT INTO loans (book_id, patron_id, loaned_on, return_by, returned_on)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING *
                "#,
            ),
        }
        .bind(loan.book_id)
        .bind(loan.patron_id)
        .bind(loan.loaned_on)
        .bind(loan.return_by)
        .bind(loan.returned_on)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| insert_error("Loan", e))?;

        if loan.id.is_some() {
            Self::sync_identity(&mut tx, "loans").await?;
        }
        tx.commit().await?;

        Ok(created)
    }

    async fn update_loan(&self, loan: &Loan) -> AppResult<Loan> {
        sqlx::query_as::<_, Loan>(
            r#"
            UPDATE loans
            SET book_id = $1, patron_id = $2, loaned_on = $3, return_by = $4, returned_on = $5
            WHERE id = $6
            RETURNING *
            "#,
        )
        .bind(loan.book_id)
        .bind(loan.patron_id)
        .bind(loan.loaned_on)
        .bind(loan.return_by)
        .bind(loan.returned_on)
        .bind(loan.id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Loan {} not found", loan.id)))
    }

    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("tolkien"), "%tolkien%");
        assert_eq!(like_pattern(""), "%%");
        assert_eq!(like_pattern("100%_real\\"), "%100\\%\\_real\\\\%");
    }

    #[test]
    fn test_loan_filters_sql() {
        let today = chrono::NaiveDate::from_ymd_opt(2020, 1, 2).unwrap();
        let criteria = LoanCriteria::with_state(LoanState::Overdue { today })
            .search(Some(LoanSearch::Book("poe".to_string())));

        let mut builder = QueryBuilder::<Postgres>::new(LOAN_COUNT);
        push_loan_filters(&mut builder, &criteria);
        let sql = builder.sql();

        assert!(sql.contains("l.returned_on IS NULL AND l.return_by < $1"));
        assert!(sql.contains("(b.title ILIKE $2 OR b.author ILIKE $3)"));
        assert!(!sql.contains("p.first_name"));
    }

    #[test]
    fn test_checked_filter_has_no_date_bound() {
        let mut builder = QueryBuilder::<Postgres>::new(LOAN_COUNT);
        push_loan_filters(&mut builder, &LoanCriteria::with_state(LoanState::CheckedOut));
        let sql = builder.sql();
        assert!(sql.contains("l.returned_on IS NULL"));
        assert!(!sql.contains("return_by <"));
    }
}
