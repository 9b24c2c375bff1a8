//! Request handlers for Bookkeep pages

pub mod books;
pub mod health;
pub mod loans;
pub mod openapi;
pub mod patrons;

use axum::{routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::AppState;

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let pages = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Books
        .route("/books", get(books::list_books))
        .route("/books/add", get(books::new_book_form).post(books::create_book))
        .route("/books/:id", get(books::get_book).post(books::update_book))
        // Loans
        .route("/loans", get(loans::list_loans))
        .route("/loans/add", get(loans::new_loan_form).post(loans::create_loan))
        .route("/loans/:id", get(loans::return_loan_form).post(loans::return_loan))
        // Patrons
        .route("/patrons", get(patrons::list_patrons))
        .route("/patrons/add", get(patrons::new_patron_form).post(patrons::create_patron))
        .route("/patrons/:id", get(patrons::get_patron).post(patrons::update_patron))
        .with_state(state);

    Router::new()
        .merge(pages)
        .merge(openapi::create_openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
