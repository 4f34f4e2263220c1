use serde_json::Value;
use shared::domain::{CanonicalFilter, CompanyRecord, Pagination};
use tracing::debug;

use crate::{
    dispatch::{action_for, QueryDispatcher},
    encoder::{encode, SearchForm},
    error::QueryError,
    normalize::{normalize, NormalizedPage},
};

/// Runs a search end to end: encode, choose the action, dispatch, normalize.
pub struct PartnerSearch {
    dispatcher: QueryDispatcher,
}

impl PartnerSearch {
    pub fn new(dispatcher: QueryDispatcher) -> Self {
        Self { dispatcher }
    }

    pub fn dispatcher(&self) -> &QueryDispatcher {
        &self.dispatcher
    }

    pub async fn run(&self, form: &SearchForm) -> Result<NormalizedPage, QueryError> {
        self.run_filter(&encode(form), form.pagination()).await
    }

    pub async fn run_filter(
        &self,
        filter: &CanonicalFilter,
        pagination: Pagination,
    ) -> Result<NormalizedPage, QueryError> {
        let action = action_for(filter);
        let response = self.dispatcher.dispatch(action, filter, pagination).await?;
        let page = normalize(response);
        debug!(%action, records = page.records.len(), total = page.total, "search completed");
        Ok(page)
    }
}

/// Identifies the search a completion belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchTicket(u64);

/// Result, error and loading state of the search view.
#[derive(Debug, Default)]
pub struct SearchSession {
    records: Vec<Value>,
    total: u64,
    error: Option<String>,
    loading: bool,
    selected: Option<usize>,
    latest: u64,
}

impl SearchSession {
    pub fn begin(&mut self) -> SearchTicket {
        self.latest += 1;
        self.loading = true;
        self.error = None;
        self.selected = None;
        SearchTicket(self.latest)
    }

    /// Stale completions are still applied; the newest search does not
    /// cancel older ones.
    pub fn complete(&mut self, ticket: SearchTicket, outcome: Result<NormalizedPage, QueryError>) {
        if ticket.0 != self.latest {
            debug!(ticket = ticket.0, latest = self.latest, "applying stale search completion");
        }
        match outcome {
            Ok(page) => {
                self.records = page.records;
                self.total = page.total;
            }
            Err(error) => self.error = Some(error.to_string()),
        }
        self.loading = false;
    }

    pub fn records(&self) -> &[Value] {
        &self.records
    }

    /// Records read through the lenient company view.
    pub fn companies(&self) -> Vec<CompanyRecord> {
        self.records.iter().map(CompanyRecord::from_raw).collect()
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Nothing searched yet, or the last search found nothing.
    pub fn is_idle(&self) -> bool {
        !self.loading && self.error.is_none() && self.records.is_empty() && self.total == 0
    }

    pub fn select(&mut self, index: usize) -> Option<&Value> {
        if index >= self.records.len() {
            return None;
        }
        self.selected = Some(index);
        self.records.get(index)
    }

    pub fn selected(&self) -> Option<&Value> {
        self.selected.and_then(|index| self.records.get(index))
    }

    pub fn close_detail(&mut self) {
        self.selected = None;
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
