//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{books, health, loans, patrons};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Bookkeep",
        version = "0.1.0",
        description = "Library books, patrons and loans"
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Books
        books::list_books,
        books::new_book_form,
        books::create_book,
        books::get_book,
        books::update_book,
        // Loans
        loans::list_loans,
        loans::new_loan_form,
        loans::create_loan,
        loans::return_loan_form,
        loans::return_loan,
        // Patrons
        patrons::list_patrons,
        patrons::new_patron_form,
        patrons::create_patron,
        patrons::get_patron,
        patrons::update_patron,
    ),
    components(
        schemas(
            crate::models::Book,
            crate::models::BookForm,
            crate::models::Patron,
            crate::models::PatronForm,
            crate::models::Loan,
            crate::models::LoanDetails,
            crate::models::LoanForm,
            crate::models::ReturnLoanForm,
            crate::pagination::PageLink,
            crate::views::BooksView,
            crate::views::BookFormView,
            crate::views::BookDetailView,
            crate::views::LoansView,
            crate::views::LoanFormView,
            crate::views::ReturnLoanView,
            crate::views::PatronsView,
            crate::views::PatronFormView,
            crate::views::PatronDetailView,
            health::HealthResponse,
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "books", description = "Book catalog"),
        (name = "loans", description = "Checkouts and returns"),
        (name = "patrons", description = "Library patrons")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
