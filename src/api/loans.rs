//! Loan pages: listing, checkout and return

use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
    Form, Json,
};

use crate::{
    error::{AppError, AppResult},
    models::{LoanForm, ReturnLoanForm},
    query::ListParams,
    validation::ValidationErrors,
    views::{LoanFormView, LoansView, ReturnLoanView},
    AppState,
};

/// List loans
#[utoipa::path(
    get,
    path = "/loans",
    tag = "loans",
    params(ListParams),
    responses(
        (status = 200, description = "Page of loans", body = LoansView)
    )
)]
pub async fn list_loans(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> AppResult<Json<LoansView>> {
    let listing = state.services.loans.list(&params).await?;
    Ok(Json(LoansView::new(params.filter(), listing)))
}

async fn loan_form_view(
    state: &AppState,
    loan: LoanForm,
    errors: ValidationErrors,
) -> AppResult<LoanFormView> {
    let (books, patrons) = state.services.loans.choices().await?;
    Ok(LoanFormView {
        title: "New Loan".to_string(),
        loan,
        books,
        patrons,
        errors,
    })
}

/// Checkout form, loaned today and due after the loan period
#[utoipa::path(
    get,
    path = "/loans/add",
    tag = "loans",
    responses(
        (status = 200, description = "New loan form", body = LoanFormView)
    )
)]
pub async fn new_loan_form(State(state): State<AppState>) -> AppResult<Json<LoanFormView>> {
    let form = state.services.loans.checkout_form();
    Ok(Json(loan_form_view(&state, form, ValidationErrors::new()).await?))
}

/// Check out a book
#[utoipa::path(
    post,
    path = "/loans/add",
    tag = "loans",
    request_body(content = LoanForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Created, redirects to /loans"),
        (status = 200, description = "Form re-rendered with field errors", body = LoanFormView)
    )
)]
pub async fn create_loan(
    State(state): State<AppState>,
    Form(form): Form<LoanForm>,
) -> AppResult<Response> {
    match state.services.loans.create(&form).await {
        Ok(_) => Ok(Redirect::to("/loans").into_response()),
        Err(AppError::Validation(errors)) => {
            Ok(Json(loan_form_view(&state, form, errors).await?).into_response())
        }
        Err(e) => Err(e),
    }
}

/// Return-book form for a loan
#[utoipa::path(
    get,
    path = "/loans/{id}",
    tag = "loans",
    params(("id" = i32, Path, description = "Loan ID")),
    responses(
        (status = 200, description = "Return form", body = ReturnLoanView),
        (status = 404, description = "Loan not found")
    )
)]
pub async fn return_loan_form(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<ReturnLoanView>> {
    let (loan, form) = state.services.loans.return_form(id).await?;

    Ok(Json(ReturnLoanView {
        title: "Patron: Return Book".to_string(),
        loan,
        form,
        errors: ValidationErrors::new(),
    }))
}

/// Record a book return
#[utoipa::path(
    post,
    path = "/loans/{id}",
    tag = "loans",
    params(("id" = i32, Path, description = "Loan ID")),
    request_body(content = ReturnLoanForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Returned, redirects to /loans"),
        (status = 200, description = "Form re-rendered with field errors", body = ReturnLoanView),
        (status = 404, description = "Loan not found")
    )
)]
pub async fn return_loan(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Form(form): Form<ReturnLoanForm>,
) -> AppResult<Response> {
    match state.services.loans.record_return(id, &form).await {
        Ok(_) => Ok(Redirect::to("/loans").into_response()),
        Err(AppError::Validation(errors)) => {
            let loan = state.services.loans.get(id).await?;
            Ok(Json(ReturnLoanView {
                title: "Patron: Return Book".to_string(),
                loan,
                form,
                errors,
            })
            .into_response())
        }
        Err(e) => Err(e),
    }
}
