//! Patron management service

use super::Listing;
use crate::{
    config::LibraryConfig,
    error::{AppError, AppResult},
    models::{LoanDetails, Patron, PatronForm},
    query::{ListFilter, ListParams, LoanCriteria, PageRequest, PatronCriteria},
    repository::SharedStore,
    validation::ValidationErrors,
};

#[derive(Clone)]
pub struct PatronsService {
    store: SharedStore,
    library: LibraryConfig,
}

impl PatronsService {
    pub fn new(store: SharedStore, library: LibraryConfig) -> Self {
        Self { store, library }
    }

    /// List patrons matching the search; the patron listing has no loan filter
    pub async fn list(&self, params: &ListParams) -> AppResult<Listing<Patron>> {
        let search = params.search();
        let page = PageRequest::new(params.page_number(), self.library.page_size);

        let (patrons, total) = self
            .store
            .find_and_count_patrons(&PatronCriteria::new(search), &page)
            .await?;

        tracing::debug!(search, page = page.number, total, "Listed patrons");

        Ok(Listing::new(patrons, total, &page, &self.library, ListFilter::All, search))
    }

    pub async fn get(&self, id: i32) -> AppResult<Patron> {
        self.store
            .find_patron(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Patron {} not found", id)))
    }

    /// Get a patron together with every loan they made
    pub async fn details(&self, id: i32) -> AppResult<(Patron, Vec<LoanDetails>)> {
        let patron = self.get(id).await?;
        let loans = self.loans(patron.id).await?;
        Ok((patron, loans))
    }

    pub async fn loans(&self, patron_id: i32) -> AppResult<Vec<LoanDetails>> {
        self.store
            .find_all_loans(&LoanCriteria::for_patron(patron_id))
            .await
    }

    pub async fn create(&self, form: &PatronForm) -> AppResult<Patron> {
        let fields = form.validate()?;

        if let Some(id) = fields.id {
            if self.store.find_patron(id).await?.is_some() {
                let mut errors = ValidationErrors::new();
                errors.add("id", format!("A patron with id {} already exists", id));
                return Err(errors.into());
            }
        }

        let patron = self.store.create_patron(&fields).await?;
        tracing::info!(patron_id = patron.id, library_id = %patron.library_id, "Patron created");
        Ok(patron)
    }

    /// Update a patron: load it, report `NotFound` if absent, else apply the validated form
    pub async fn update(&self, id: i32, form: &PatronForm) -> AppResult<Patron> {
        let mut patron = self.get(id).await?;
        let fields = form.validate()?;
        patron.apply(fields);

        let patron = self.store.update_patron(&patron).await?;
        tracing::info!(patron_id = patron.id, "Patron updated");
        Ok(patron)
    }
}
