use std::collections::BTreeSet;

use async_trait::async_trait;
use reqwest::{header::CONTENT_RANGE, Client, Response};
use serde_json::Value;
use shared::{
    domain::{CanonicalFilter, Pagination},
    error::RemoteQueryError,
    protocol::{Action, RawQueryResponse},
};
use tracing::{debug, warn};

use super::QuerySource;
use crate::{
    adapter::{adapt, JoinedRow},
    config::ReadModelCredentials,
    error::QueryError,
};

const REST_PREFIX: &str = "/rest/v1";
const COMPANY_COLUMNS: &str = "id,name,website,employee_band,revenue_band";
const LOCATION_JOIN: &str = "company_location!inner(address_type,location_master!inner(city,country,region,global_region,state))";
const SCORE_JOIN: &str = "score(relevance,partner_classification)";

/// Company read model behind a PostgREST-style API. Joins are embedded in
/// the `select` clause and filters are pushed down onto joined columns.
#[derive(Debug, Clone)]
pub struct RelationalReadModel {
    http: Client,
    base_url: String,
    key: String,
}

struct Rows {
    rows: Vec<Value>,
    total: Option<u64>,
}

impl RelationalReadModel {
    pub fn new(http: Client, credentials: ReadModelCredentials) -> Self {
        Self {
            http,
            base_url: credentials.url,
            key: credentials.key,
        }
    }

    pub async fn fetch_companies(
        &self,
        filter: &CanonicalFilter,
        pagination: Pagination,
    ) -> Result<RawQueryResponse, QueryError> {
        let mut query = vec![("select".to_string(), select_clause(filter))];
        query.extend(filter_predicates(filter));

        let Rows { rows, total } = self
            .get_rows("company", &query, Some(pagination.row_range()))
            .await?;
        debug!(rows = rows.len(), ?total, "read model returned companies");

        let results = rows
            .into_iter()
            .map(|row| serde_json::to_value(adapt(JoinedRow::from_value(row))))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|error| QueryError::decode(&self.base_url, error.to_string()))?;

        Ok(match total {
            Some(total) => RawQueryResponse::Results {
                results,
                total: Some(total),
            },
            None => RawQueryResponse::Sequence(results),
        })
    }

    /// Distinct sectors, sorted. Derived from `company_industry` when
    /// `industry_master` cannot be read directly.
    pub async fn industry_sectors(&self, max: u32) -> Result<Vec<String>, QueryError> {
        let limit = max.to_string();
        let primary = self
            .get_rows(
                "industry_master",
                &[
                    ("select".to_string(), "sector".to_string()),
                    ("limit".to_string(), limit.clone()),
                ],
                None,
            )
            .await;

        let sectors: Vec<Value> = match primary {
            Ok(Rows { rows, .. }) => rows,
            Err(error) => {
                warn!(%error, "industry_master lookup failed; deriving sectors from company_industry");
                let Rows { rows, .. } = self
                    .get_rows(
                        "company_industry",
                        &[
                            ("select".to_string(), "industry_master!inner(sector)".to_string()),
                            ("limit".to_string(), limit),
                        ],
                        None,
                    )
                    .await?;
                rows.into_iter()
                    .filter_map(|mut row| row.get_mut("industry_master").map(Value::take))
                    .flat_map(|master| match master {
                        Value::Array(masters) => masters,
                        other => vec![other],
                    })
                    .collect()
            }
        };

        let unique: BTreeSet<String> = sectors
            .iter()
            .filter_map(|row| row.get("sector").and_then(Value::as_str))
            .filter(|sector| !sector.is_empty())
            .map(str::to_string)
            .collect();
        Ok(unique.into_iter().collect())
    }

    async fn get_rows(
        &self,
        table: &str,
        query: &[(String, String)],
        range: Option<(u64, u64)>,
    ) -> Result<Rows, QueryError> {
        let mut request = self
            .http
            .get(format!("{}{REST_PREFIX}/{table}", self.base_url))
            .query(query)
            .header("apikey", &self.key)
            .bearer_auth(&self.key);
        if let Some((from, to)) = range {
            request = request
                .header("Range-Unit", "items")
                .header("Range", format!("{from}-{to}"))
                .header("Prefer", "count=exact");
        }

        let res = request
            .send()
            .await
            .map_err(|error| QueryError::backend(&self.base_url, error.to_string()))?;

        if !res.status().is_success() {
            return Err(remote_error(res).await.into());
        }

        let total = res
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_content_range_total);
        let rows = res
            .json::<Vec<Value>>()
            .await
            .map_err(|error| QueryError::decode(&self.base_url, error.to_string()))?;
        Ok(Rows { rows, total })
    }
}

async fn remote_error(res: Response) -> RemoteQueryError {
    let status = res.status();
    let body = res.text().await.unwrap_or_default();
    serde_json::from_str::<RemoteQueryError>(&body).unwrap_or_else(|_| RemoteQueryError {
        code: None,
        message: format!("HTTP {status}"),
        details: Some(body.trim().to_string()).filter(|body| !body.is_empty()),
        hint: None,
    })
}

/// `0-49/1234` → 1234. Unknown totals (`*`) yield `None`.
pub fn parse_content_range_total(header: &str) -> Option<u64> {
    header.rsplit_once('/')?.1.trim().parse().ok()
}

/// Inner joins are used for the collections a filter targets so that
/// companies without a match are excluded rather than returned with an
/// empty collection.
pub fn select_clause(filter: &CanonicalFilter) -> String {
    let industry = if filter.industry.is_some() {
        "company_industry!inner(industry_master!inner(sector,detail))"
    } else {
        "company_industry(industry_master(sector,detail))"
    };
    let classification = if filter.segment.is_some() {
        "partner_classification!inner(classification)"
    } else {
        "partner_classification(classification)"
    };
    [COMPANY_COLUMNS, LOCATION_JOIN, industry, classification, SCORE_JOIN].join(",")
}

pub fn filter_predicates(filter: &CanonicalFilter) -> Vec<(String, String)> {
    let mut predicates = Vec::new();
    let mut push = |column: &str, predicate: String| {
        debug!(column, %predicate, "pushing down read model filter");
        predicates.push((column.to_string(), predicate));
    };

    if let Some(name) = &filter.client_name {
        push("name", format!("ilike.*{name}*"));
    }
    if let Some(industry) = &filter.industry {
        push("company_industry.industry_master.sector", format!("eq.{industry}"));
    }
    if let Some(segment) = filter.segment {
        push("partner_classification.classification", format!("eq.{segment}"));
    }
    if let Some(territory) = &filter.territory {
        if let Some(country) = &territory.country {
            push("company_location.location_master.country", format!("eq.{country}"));
        }
        if let Some(region) = &territory.region {
            push(
                "company_location.location_master.global_region",
                format!("eq.{region}"),
            );
        }
        if let Some(city) = &territory.city {
            push("company_location.location_master.city", format!("eq.{city}"));
        }
    }
    predicates
}

#[async_trait]
impl QuerySource for RelationalReadModel {
    fn name(&self) -> &'static str {
        "read_model"
    }

    async fn fetch(
        &self,
        action: Action,
        filter: &CanonicalFilter,
        pagination: Pagination,
    ) -> Result<RawQueryResponse, QueryError> {
        if !action.is_listing() {
            return Err(QueryError::config(format!(
                "{action} cannot be served by the read model"
            )));
        }
        self.fetch_companies(filter, pagination).await
    }
}

#[cfg(test)]
#[path = "../tests/read_model_tests.rs"]
mod tests;
