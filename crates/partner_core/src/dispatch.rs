use std::sync::Arc;

use reqwest::Client;
use shared::{
    domain::{CanonicalFilter, Pagination},
    protocol::{Action, PredictInput, PredictScoreResponse, RawQueryResponse},
};
use tracing::{debug, info};

use crate::{
    config::Settings,
    error::QueryError,
    source::{ActionEndpoint, QuerySource, RelationalReadModel},
};

/// `search_company` when the filter carries any criterion, `list_companies`
/// otherwise.
pub fn action_for(filter: &CanonicalFilter) -> Action {
    if filter.is_empty() {
        Action::ListCompanies
    } else {
        Action::SearchCompany
    }
}

/// Routes each action to exactly one backend. The listing backend is chosen
/// once at construction; read model failures are returned as-is and never
/// retried against the action endpoint.
pub struct QueryDispatcher {
    endpoint: Arc<ActionEndpoint>,
    listing: Arc<dyn QuerySource>,
    read_model: Option<Arc<RelationalReadModel>>,
}

impl QueryDispatcher {
    pub fn new(endpoint: ActionEndpoint, read_model: Option<RelationalReadModel>) -> Self {
        let endpoint = Arc::new(endpoint);
        let read_model = read_model.map(Arc::new);
        let listing: Arc<dyn QuerySource> = match &read_model {
            Some(read_model) => read_model.clone() as Arc<dyn QuerySource>,
            None => endpoint.clone() as Arc<dyn QuerySource>,
        };
        Self {
            endpoint,
            listing,
            read_model,
        }
    }

    /// Uses `listing` for listing actions regardless of configured credentials.
    pub fn with_listing_source(endpoint: ActionEndpoint, listing: Arc<dyn QuerySource>) -> Self {
        Self {
            endpoint: Arc::new(endpoint),
            listing,
            read_model: None,
        }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, QueryError> {
        let api_base = settings.api_base_url()?;
        let credentials = settings.read_model_credentials()?;
        let http = Client::builder()
            .build()
            .map_err(|error| QueryError::config(format!("failed to build HTTP client: {error}")))?;

        let endpoint = ActionEndpoint::new(http.clone(), api_base);
        let read_model = credentials.map(|credentials| RelationalReadModel::new(http, credentials));
        let dispatcher = Self::new(endpoint, read_model);
        info!(
            api_base = %dispatcher.endpoint.base_url(),
            listing_backend = dispatcher.listing_backend(),
            "query dispatcher ready"
        );
        Ok(dispatcher)
    }

    pub fn listing_backend(&self) -> &'static str {
        self.listing.name()
    }

    pub async fn dispatch(
        &self,
        action: Action,
        filter: &CanonicalFilter,
        pagination: Pagination,
    ) -> Result<RawQueryResponse, QueryError> {
        let source: &dyn QuerySource = if action.is_listing() {
            self.listing.as_ref()
        } else {
            self.endpoint.as_ref()
        };
        debug!(%action, backend = source.name(), "dispatching query");
        source.fetch(action, filter, pagination).await
    }

    pub async fn predict_score(
        &self,
        input: &PredictInput,
    ) -> Result<PredictScoreResponse, QueryError> {
        debug!(backend = self.endpoint.name(), "dispatching predict_score");
        self.endpoint.predict_score(input).await
    }

    /// Empty when no read model is configured.
    pub async fn industry_sectors(&self, max: u32) -> Result<Vec<String>, QueryError> {
        match &self.read_model {
            Some(read_model) => read_model.industry_sectors(max).await,
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
#[path = "tests/dispatch_tests.rs"]
mod tests;
