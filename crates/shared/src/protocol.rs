use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::Pagination;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    ListCompanies,
    SearchCompany,
    PredictScore,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ListCompanies => "list_companies",
            Self::SearchCompany => "search_company",
            Self::PredictScore => "predict_score",
        }
    }

    /// Actions the relational read model is able to answer.
    pub fn is_listing(self) -> bool {
        matches!(self, Self::ListCompanies | Self::SearchCompany)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of `POST /query`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest<P> {
    pub action: Action,
    pub params: P,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

/// Accepted response shapes, in decode precedence order.
#[derive(Debug, Clone, PartialEq)]
pub enum RawQueryResponse {
    Sequence(Vec<Value>),
    Results {
        results: Vec<Value>,
        total: Option<u64>,
    },
    Items {
        items: Vec<Value>,
        count: Option<u64>,
    },
    Data(Value),
    Unrecognized(Value),
}

impl RawQueryResponse {
    /// First matching shape wins: bare sequence, `results`, `items`, `data`.
    /// A list field only matches when it holds an array; `data` matches any
    /// value other than `null`, `false`, `0` or `""`.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Array(records) => Self::Sequence(records),
            Value::Object(obj) => Self::from_object(obj),
            other => Self::Unrecognized(other),
        }
    }

    fn from_object(mut obj: Map<String, Value>) -> Self {
        if let Some(results) = take_array(&mut obj, "results") {
            let total = obj.get("total").and_then(whole_count);
            return Self::Results { results, total };
        }

        if let Some(items) = take_array(&mut obj, "items") {
            let count = obj.get("count").and_then(whole_count);
            return Self::Items { items, count };
        }

        match obj.remove("data") {
            Some(data) if !is_falsy(&data) => Self::Data(data),
            Some(data) => {
                obj.insert("data".to_string(), data);
                Self::Unrecognized(Value::Object(obj))
            }
            None => Self::Unrecognized(Value::Object(obj)),
        }
    }
}

/// Non-negative integers, including integral floats such as `42.0`.
fn whole_count(value: &Value) -> Option<u64> {
    if let Some(count) = value.as_u64() {
        return Some(count);
    }
    value
        .as_f64()
        .filter(|count| *count >= 0.0 && count.fract() == 0.0 && *count <= u64::MAX as f64)
        .map(|count| count as u64)
}

// `null`, `false`, `0` and `""` carry no records.
fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(flag) => !flag,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

fn take_array(obj: &mut Map<String, Value>, key: &str) -> Option<Vec<Value>> {
    match obj.remove(key)? {
        Value::Array(items) => Some(items),
        other => {
            obj.insert(key.to_string(), other);
            None
        }
    }
}

/// Fields of the score prediction form. Blank strings are left off the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_id: Option<i64>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub revenue_band: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub employee_band: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub years_in_business_band: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub global_region: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub industry_detail_customer: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cloud_coverage: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub technology_scope: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub partner_classification: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictScoreResponse {
    pub model_used: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prediction_proba: Option<Vec<Vec<f64>>>,
}

impl PredictScoreResponse {
    /// Positive-class probability of the first prediction row.
    pub fn positive_probability(&self) -> Option<f64> {
        self.prediction_proba
            .as_ref()
            .and_then(|rows| rows.first())
            .and_then(|row| row.get(1))
            .copied()
    }
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
