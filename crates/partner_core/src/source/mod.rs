use async_trait::async_trait;
use shared::{
    domain::{CanonicalFilter, Pagination},
    protocol::{Action, RawQueryResponse},
};

use crate::error::QueryError;

pub mod endpoint;
pub mod read_model;

pub use endpoint::ActionEndpoint;
pub use read_model::RelationalReadModel;

/// A backend able to answer listing and search actions.
#[async_trait]
pub trait QuerySource: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch(
        &self,
        action: Action,
        filter: &CanonicalFilter,
        pagination: Pagination,
    ) -> Result<RawQueryResponse, QueryError>;
}
