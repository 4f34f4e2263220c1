use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CompanyId {
    Int(i64),
    Text(String),
}

impl fmt::Display for CompanyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(id) => write!(f, "{id}"),
            Self::Text(id) => f.write_str(id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Segment {
    Enterprise,
    MidMarket,
    Territory,
}

impl Segment {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Enterprise => "Enterprise",
            Self::MidMarket => "MidMarket",
            Self::Territory => "Territory",
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown segment '{0}', expected Enterprise, MidMarket or Territory")]
pub struct UnknownSegment(pub String);

impl FromStr for Segment {
    type Err = UnknownSegment;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let folded: String = raw
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
            .collect::<String>()
            .to_ascii_lowercase();
        match folded.as_str() {
            "enterprise" => Ok(Self::Enterprise),
            "midmarket" => Ok(Self::MidMarket),
            "territory" => Ok(Self::Territory),
            _ => Err(UnknownSegment(raw.to_string())),
        }
    }
}

/// Territory part of a search filter. A field is `Some` only when it holds a
/// non-blank value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Territory {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
}

impl Territory {
    pub fn is_empty(&self) -> bool {
        [&self.country, &self.region, &self.city]
            .into_iter()
            .all(|field| is_blank(field.as_deref()))
    }
}

/// Backend-agnostic search criteria, serialized with the camelCase keys the
/// action endpoint expects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub territory: Option<Territory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segment: Option<Segment>,
}

impl CanonicalFilter {
    /// True when no key carries a usable value; such a filter means "list all".
    pub fn is_empty(&self) -> bool {
        self.territory.as_ref().map_or(true, Territory::is_empty)
            && is_blank(self.client_name.as_deref())
            && is_blank(self.industry.as_deref())
            && self.segment.is_none()
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub limit: u32,
    pub offset: u64,
}

impl Pagination {
    pub const DEFAULT_LIMIT: u32 = 50;
    pub const MAX_LIMIT: u32 = 500;

    /// Out-of-range or missing limits fall back to [`Pagination::DEFAULT_LIMIT`].
    pub fn new(limit: Option<i64>, offset: u64) -> Self {
        let limit = limit
            .filter(|limit| (1..=i64::from(Self::MAX_LIMIT)).contains(limit))
            .map_or(Self::DEFAULT_LIMIT, |limit| limit as u32);
        Self { limit, offset }
    }

    /// Inclusive row range `[offset, offset + limit - 1]`.
    pub fn row_range(&self) -> (u64, u64) {
        let end = self.offset + u64::from(self.limit.max(1)) - 1;
        (self.offset, end)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: Self::DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanyTerritory {
    pub country: Option<String>,
    pub region: Option<String>,
    pub global_region: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
}

/// UI-facing company shape. Records are built fresh for every response and
/// never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanyRecord {
    pub id: Option<CompanyId>,
    pub name: Option<String>,
    pub website: Option<String>,
    pub employee_band: Option<String>,
    pub revenue_band: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partner_score: Option<f64>,
    #[serde(default)]
    pub territory: CompanyTerritory,
    pub industry: Option<String>,
    #[serde(default)]
    pub industry_details: Vec<String>,
    pub segment: Option<String>,
    #[serde(default)]
    pub classifications: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

const KNOWN_FIELDS: &[&str] = &[
    "id",
    "name",
    "website",
    "employee_band",
    "revenue_band",
    "partner_score",
    "territory",
    "industry",
    "industry_details",
    "segment",
    "classifications",
];

impl CompanyRecord {
    /// Reads any normalized record leniently: fields with an unexpected JSON
    /// type are treated as absent, unknown fields land in `extra`.
    pub fn from_raw(raw: &Value) -> Self {
        let Some(obj) = raw.as_object() else {
            return Self::default();
        };

        let id = match obj.get("id") {
            Some(Value::Number(n)) => n.as_i64().map(CompanyId::Int),
            Some(Value::String(s)) => Some(CompanyId::Text(s.clone())),
            _ => None,
        };

        let partner_score = obj
            .get("partner_score")
            .and_then(Value::as_f64)
            .or_else(|| obj.get("score").and_then(Value::as_f64));

        let territory = match obj.get("territory").and_then(Value::as_object) {
            Some(territory) => territory_from(territory),
            None => territory_from(obj),
        };

        let extra = obj
            .iter()
            .filter(|(key, _)| !KNOWN_FIELDS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        Self {
            id,
            name: string_field(obj, "name"),
            website: string_field(obj, "website"),
            employee_band: string_field(obj, "employee_band"),
            revenue_band: string_field(obj, "revenue_band"),
            partner_score,
            territory,
            industry: string_field(obj, "industry"),
            industry_details: string_list(obj, "industry_details"),
            segment: string_field(obj, "segment"),
            classifications: string_list(obj, "classifications"),
            extra,
        }
    }
}

fn territory_from(obj: &Map<String, Value>) -> CompanyTerritory {
    CompanyTerritory {
        country: string_field(obj, "country"),
        region: string_field(obj, "region"),
        global_region: string_field(obj, "global_region"),
        city: string_field(obj, "city"),
        state: string_field(obj, "state"),
    }
}

fn string_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key)
        .and_then(Value::as_str)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn string_list(obj: &Map<String, Value>, key: &str) -> Vec<String> {
    obj.get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
#[path = "tests/domain_tests.rs"]
mod tests;
