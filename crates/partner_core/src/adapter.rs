use serde::{de::DeserializeOwned, Deserialize, Deserializer};
use serde_json::{Map, Value};
use shared::domain::{CompanyId, CompanyRecord, CompanyTerritory};

const JOIN_SEPARATOR: &str = " | ";

/// Holds `Some` only when the JSON value decodes as `T`. A malformed or null
/// join decodes to `None` instead of failing the whole row.
#[derive(Debug, Clone, PartialEq)]
pub struct Lenient<T>(pub Option<T>);

impl<T> Default for Lenient<T> {
    fn default() -> Self {
        Self(None)
    }
}

impl<T> Lenient<T> {
    pub fn get(&self) -> Option<&T> {
        self.0.as_ref()
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Lenient<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Self(serde_json::from_value(value).ok()))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LocationMaster {
    #[serde(default)]
    pub country: Lenient<String>,
    #[serde(default)]
    pub region: Lenient<String>,
    #[serde(default)]
    pub global_region: Lenient<String>,
    #[serde(default)]
    pub city: Lenient<String>,
    #[serde(default)]
    pub state: Lenient<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompanyLocation {
    #[serde(default)]
    pub address_type: Lenient<String>,
    #[serde(default)]
    pub location_master: Lenient<LocationMaster>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IndustryMaster {
    #[serde(default)]
    pub sector: Lenient<String>,
    #[serde(default)]
    pub detail: Lenient<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompanyIndustry {
    #[serde(default)]
    pub industry_master: Lenient<IndustryMaster>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PartnerClassification {
    #[serde(default)]
    pub classification: Lenient<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScoreEntry {
    #[serde(default)]
    pub relevance: Lenient<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ScoreField {
    Entries(Vec<Lenient<ScoreEntry>>),
    Single(ScoreEntry),
    Plain(f64),
}

/// One `company` row with its embedded joins, as the read model returns it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JoinedRow {
    #[serde(default)]
    pub id: Lenient<CompanyId>,
    #[serde(default)]
    pub name: Lenient<String>,
    #[serde(default)]
    pub website: Lenient<String>,
    #[serde(default)]
    pub employee_band: Lenient<String>,
    #[serde(default)]
    pub revenue_band: Lenient<String>,
    #[serde(default)]
    pub company_location: Lenient<Vec<Lenient<CompanyLocation>>>,
    #[serde(default)]
    pub company_industry: Lenient<Vec<Lenient<CompanyIndustry>>>,
    #[serde(default)]
    pub partner_classification: Lenient<Vec<Lenient<PartnerClassification>>>,
    #[serde(default)]
    pub score: Lenient<ScoreField>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl JoinedRow {
    /// Anything that is not a JSON object becomes an empty row.
    pub fn from_value(value: Value) -> Self {
        serde_json::from_value(value).unwrap_or_default()
    }
}

pub fn adapt(row: JoinedRow) -> CompanyRecord {
    let industries = industry_masters(&row);
    let sectors = present(industries.iter().copied().map(|m| &m.sector));
    let industry_details = present(industries.iter().copied().map(|m| &m.detail));
    let industry = if sectors.is_empty() {
        industry_details.first().cloned()
    } else {
        Some(sectors.join(JOIN_SEPARATOR))
    };

    let classifications = present(
        items(&row.partner_classification)
            .into_iter()
            .map(|c| &c.classification),
    );
    let segment = (!classifications.is_empty()).then(|| classifications.join(JOIN_SEPARATOR));
    let partner_score = partner_score(&row.score);
    let territory = territory(&row);

    CompanyRecord {
        id: row.id.0,
        name: row.name.0,
        website: row.website.0,
        employee_band: row.employee_band.0,
        revenue_band: row.revenue_band.0,
        partner_score,
        territory,
        industry,
        industry_details,
        segment,
        classifications,
        extra: row.extra,
    }
}

fn items<T>(collection: &Lenient<Vec<Lenient<T>>>) -> Vec<&T> {
    collection
        .get()
        .map(|entries| entries.iter().filter_map(Lenient::get).collect())
        .unwrap_or_default()
}

/// Non-empty strings, in order.
fn present<'a>(values: impl Iterator<Item = &'a Lenient<String>>) -> Vec<String> {
    values
        .filter_map(Lenient::get)
        .filter(|value| !value.is_empty())
        .cloned()
        .collect()
}

fn industry_masters(row: &JoinedRow) -> Vec<&IndustryMaster> {
    items(&row.company_industry)
        .into_iter()
        .filter_map(|link| link.industry_master.get())
        .collect()
}

// Multiple locations collapse to the first one.
fn territory(row: &JoinedRow) -> CompanyTerritory {
    let first = row
        .company_location
        .get()
        .and_then(|locations| locations.first())
        .and_then(Lenient::get)
        .and_then(|location| location.location_master.get());

    let Some(master) = first else {
        return CompanyTerritory::default();
    };

    let field = |value: &Lenient<String>| value.get().filter(|v| !v.is_empty()).cloned();
    CompanyTerritory {
        country: field(&master.country),
        region: field(&master.region),
        global_region: field(&master.global_region),
        city: field(&master.city),
        state: field(&master.state),
    }
}

fn partner_score(score: &Lenient<ScoreField>) -> Option<f64> {
    match score.get()? {
        ScoreField::Entries(entries) => {
            let relevances: Vec<f64> = entries
                .iter()
                .filter_map(Lenient::get)
                .filter_map(|entry| entry.relevance.get().copied())
                .collect();
            if relevances.is_empty() {
                return None;
            }
            Some(relevances.iter().sum::<f64>() / relevances.len() as f64)
        }
        // A single zero relevance means unscored.
        ScoreField::Single(entry) => entry.relevance.get().copied().filter(|r| *r != 0.0),
        ScoreField::Plain(score) => Some(*score),
    }
}

#[cfg(test)]
#[path = "tests/adapter_tests.rs"]
mod tests;
