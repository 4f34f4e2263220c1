use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::Value;
use shared::{
    domain::{CanonicalFilter, Pagination},
    error::EndpointErrorBody,
    protocol::{Action, PredictInput, PredictScoreResponse, QueryRequest, RawQueryResponse},
};
use tracing::debug;

use super::QuerySource;
use crate::error::QueryError;

/// The generic `POST /query` action endpoint.
#[derive(Debug, Clone)]
pub struct ActionEndpoint {
    http: Client,
    base_url: String,
}

impl ActionEndpoint {
    pub fn new(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn post<P: Serialize + Sync>(
        &self,
        request: &QueryRequest<P>,
    ) -> Result<Value, QueryError> {
        let res = self
            .http
            .post(format!("{}/query", self.base_url))
            .json(request)
            .send()
            .await
            .map_err(|error| QueryError::backend(&self.base_url, error.to_string()))?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(QueryError::backend(
                &self.base_url,
                describe_failure(status, &body),
            ));
        }

        res.json::<Value>()
            .await
            .map_err(|error| QueryError::decode(&self.base_url, error.to_string()))
    }

    pub async fn predict_score(
        &self,
        input: &PredictInput,
    ) -> Result<PredictScoreResponse, QueryError> {
        let body = self
            .post(&QueryRequest {
                action: Action::PredictScore,
                params: input,
                pagination: None,
            })
            .await?;
        serde_json::from_value(body)
            .map_err(|error| QueryError::decode(&self.base_url, error.to_string()))
    }
}

fn describe_failure(status: StatusCode, body: &str) -> String {
    match serde_json::from_str::<EndpointErrorBody>(body) {
        Ok(parsed) => format!("HTTP {status}: {}", parsed.summary()),
        Err(_) if body.trim().is_empty() => format!("HTTP {status}"),
        Err(_) => format!("HTTP {status}: {}", body.trim()),
    }
}

#[async_trait]
impl QuerySource for ActionEndpoint {
    fn name(&self) -> &'static str {
        "action_endpoint"
    }

    async fn fetch(
        &self,
        action: Action,
        filter: &CanonicalFilter,
        pagination: Pagination,
    ) -> Result<RawQueryResponse, QueryError> {
        debug!(%action, base_url = %self.base_url, "posting query action");
        let body = self
            .post(&QueryRequest {
                action,
                params: filter,
                pagination: Some(pagination),
            })
            .await?;
        Ok(RawQueryResponse::from_value(body))
    }
}
