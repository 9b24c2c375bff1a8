//! Business logic services

pub mod books;
pub mod loans;
pub mod patrons;

use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;

use crate::{
    config::LibraryConfig,
    error::AppResult,
    pagination::{self, PageLink},
    query::{ListFilter, PageRequest},
    repository::SharedStore,
};

/// Source of the current calendar date used by the overdue filter and form defaults
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Local calendar date of the server
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        chrono::Local::now().date_naive()
    }
}

/// Clock pinned to one day
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

/// One page of a listing with the links to every page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Listing<T> {
    pub items: Vec<T>,
    /// Matching records before page slicing
    pub total: i64,
    /// Current page number
    pub page: i64,
    pub links: Vec<PageLink>,
}

impl<T> Listing<T> {
    fn new(
        items: Vec<T>,
        total: i64,
        page: &PageRequest,
        library: &LibraryConfig,
        filter: ListFilter,
        search: &str,
    ) -> Self {
        let count = u64::try_from(total).unwrap_or(0);
        Self {
            items,
            total,
            page: page.number,
            links: pagination::pagination_links(
                count,
                library.page_size,
                filter.as_param(),
                Some(search),
            ),
        }
    }
}

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub books: books::BooksService,
    pub loans: loans::LoansService,
    pub patrons: patrons::PatronsService,
    store: SharedStore,
}

impl Services {
    /// Create all services over one store
    pub fn new(store: SharedStore, library: LibraryConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            books: books::BooksService::new(store.clone(), library, clock.clone()),
            loans: loans::LoansService::new(store.clone(), library, clock),
            patrons: patrons::PatronsService::new(store.clone(), library),
            store,
        }
    }

    /// Check the store is reachable
    pub async fn ping(&self) -> AppResult<()> {
        self.store.ping().await
    }
}
