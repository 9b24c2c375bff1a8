//! Book pages

use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
    Form, Json,
};

use crate::{
    error::{AppError, AppResult},
    models::BookForm,
    query::ListParams,
    validation::ValidationErrors,
    views::{BookDetailView, BookFormView, BooksView},
    AppState,
};

/// List books
#[utoipa::path(
    get,
    path = "/books",
    tag = "books",
    params(ListParams),
    responses(
        (status = 200, description = "Page of books", body = BooksView)
    )
)]
pub async fn list_books(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> AppResult<Json<BooksView>> {
    let listing = state.services.books.list(&params).await?;
    Ok(Json(BooksView::new(params.filter(), listing)))
}

/// Empty new book form
#[utoipa::path(
    get,
    path = "/books/add",
    tag = "books",
    responses(
        (status = 200, description = "New book form", body = BookFormView)
    )
)]
pub async fn new_book_form() -> Json<BookFormView> {
    Json(BookFormView {
        title: "New Book".to_string(),
        book: BookForm::default(),
        errors: ValidationErrors::new(),
    })
}

/// Create a book
#[utoipa::path(
    post,
    path = "/books/add",
    tag = "books",
    request_body(content = BookForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Created, redirects to /books"),
        (status = 200, description = "Form re-rendered with field errors", body = BookFormView)
    )
)]
pub async fn create_book(
    State(state): State<AppState>,
    Form(form): Form<BookForm>,
) -> AppResult<Response> {
    match state.services.books.create(&form).await {
        Ok(_) => Ok(Redirect::to("/books").into_response()),
        Err(AppError::Validation(errors)) => Ok(Json(BookFormView {
            title: "New Book".to_string(),
            book: form,
            errors,
        })
        .into_response()),
        Err(e) => Err(e),
    }
}

/// Book details with its loans
#[utoipa::path(
    get,
    path = "/books/{id}",
    tag = "books",
    params(("id" = i32, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Book details", body = BookDetailView),
        (status = 404, description = "Book not found")
    )
)]
pub async fn get_book(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<BookDetailView>> {
    let (book, loans) = state.services.books.details(id).await?;

    Ok(Json(BookDetailView {
        title: book.title.clone(),
        book: (&book).into(),
        loans,
        errors: ValidationErrors::new(),
    }))
}

/// Update a book
#[utoipa::path(
    post,
    path = "/books/{id}",
    tag = "books",
    params(("id" = i32, Path, description = "Book ID")),
    request_body(content = BookForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Updated, redirects to /books"),
        (status = 200, description = "Details re-rendered with field errors", body = BookDetailView),
        (status = 404, description = "Book not found")
    )
)]
pub async fn update_book(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Form(form): Form<BookForm>,
) -> AppResult<Response> {
    match state.services.books.update(id, &form).await {
        Ok(_) => Ok(Redirect::to("/books").into_response()),
        Err(AppError::Validation(errors)) => {
            let (book, loans) = state.services.books.details(id).await?;
            Ok(Json(BookDetailView {
                title: book.title,
                book: form,
                loans,
                errors,
            })
            .into_response())
        }
        Err(e) => Err(e),
    }
}
