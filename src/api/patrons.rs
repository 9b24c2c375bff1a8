//! Patron pages

use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
    Form, Json,
};

use crate::{
    error::{AppError, AppResult},
    models::PatronForm,
    query::ListParams,
    validation::ValidationErrors,
    views::{PatronDetailView, PatronFormView, PatronsView},
    AppState,
};

/// List patrons
#[utoipa::path(
    get,
    path = "/patrons",
    tag = "patrons",
    params(ListParams),
    responses(
        (status = 200, description = "Page of patrons", body = PatronsView)
    )
)]
pub async fn list_patrons(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> AppResult<Json<PatronsView>> {
    let listing = state.services.patrons.list(&params).await?;
    Ok(Json(listing.into()))
}

#[utoipa::path(
    get,
    path = "/patrons/add",
    tag = "patrons",
    responses(
        (status = 200, description = "New patron form", body = PatronFormView)
    )
)]
pub async fn new_patron_form() -> Json<PatronFormView> {
    Json(PatronFormView {
        title: "New Patron".to_string(),
        patron: PatronForm::default(),
        errors: ValidationErrors::new(),
    })
}

#[utoipa::path(
    post,
    path = "/patrons/add",
    tag = "patrons",
    request_body(content = PatronForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Created, redirects to /patrons"),
        (status = 200, description = "Form re-rendered with field errors", body = PatronFormView)
    )
)]
pub async fn create_patron(
    State(state): State<AppState>,
    Form(form): Form<PatronForm>,
) -> AppResult<Response> {
    match state.services.patrons.create(&form).await {
        Ok(_) => Ok(Redirect::to("/patrons").into_response()),
        Err(AppError::Validation(errors)) => Ok(Json(PatronFormView {
            title: "New Patron".to_string(),
            patron: form,
            errors,
        })
        .into_response()),
        Err(e) => Err(e),
    }
}

/// Patron details with their loans
#[utoipa::path(
    get,
    path = "/patrons/{id}",
    tag = "patrons",
    params(("id" = i32, Path, description = "Patron ID")),
    responses(
        (status = 200, description = "Patron details", body = PatronDetailView),
        (status = 404, description = "Patron not found")
    )
)]
pub async fn get_patron(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<PatronDetailView>> {
    let (patron, loans) = state.services.patrons.details(id).await?;

    Ok(Json(PatronDetailView {
        title: patron.full_name(),
        patron: (&patron).into(),
        loans,
        errors: ValidationErrors::new(),
    }))
}

#[utoipa::path(
    post,
    path = "/patrons/{id}",
    tag = "patrons",
    params(("id" = i32, Path, description = "Patron ID")),
    request_body(content = PatronForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Updated, redirects to /patrons"),
        (status = 200, description = "Details re-rendered with field errors", body = PatronDetailView),
        (status = 404, description = "Patron not found")
    )
)]
pub async fn update_patron(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Form(form): Form<PatronForm>,
) -> AppResult<Response> {
    match state.services.patrons.update(id, &form).await {
        Ok(_) => Ok(Redirect::to("/patrons").into_response()),
        Err(AppError::Validation(errors)) => {
            let (patron, loans) = state.services.patrons.details(id).await?;
            Ok(Json(PatronDetailView {
                title: patron.full_name(),
                patron: form,
                loans,
                errors,
            })
            .into_response())
        }
        Err(e) => Err(e),
    }
}
