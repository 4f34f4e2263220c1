use shared::domain::{CanonicalFilter, Pagination, Segment, Territory};
use tracing::warn;

/// Raw search form input, as typed by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchForm {
    pub country: String,
    pub region: String,
    pub city: String,
    pub client_name: String,
    pub industry: String,
    pub segment: String,
    pub limit: String,
}

impl Default for SearchForm {
    fn default() -> Self {
        Self {
            country: String::new(),
            region: String::new(),
            city: String::new(),
            client_name: String::new(),
            industry: String::new(),
            segment: String::new(),
            limit: Pagination::DEFAULT_LIMIT.to_string(),
        }
    }
}

impl SearchForm {
    /// A fresh search always starts at offset 0.
    pub fn pagination(&self) -> Pagination {
        Pagination::new(coerce_limit(&self.limit), 0)
    }
}

pub fn encode(form: &SearchForm) -> CanonicalFilter {
    let territory = Territory {
        country: non_blank(&form.country),
        region: non_blank(&form.region),
        city: non_blank(&form.city),
    };

    CanonicalFilter {
        territory: (!territory.is_empty()).then_some(territory),
        client_name: non_blank(&form.client_name),
        industry: non_blank(&form.industry),
        segment: encode_segment(&form.segment),
    }
}

fn encode_segment(raw: &str) -> Option<Segment> {
    let raw = non_blank(raw)?;
    match raw.parse() {
        Ok(segment) => Some(segment),
        Err(error) => {
            warn!(%error, "ignoring segment filter");
            None
        }
    }
}

fn non_blank(raw: &str) -> Option<String> {
    (!raw.trim().is_empty()).then(|| raw.to_string())
}

/// Integers pass through, finite decimals truncate, anything else is unset.
pub fn coerce_limit(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if let Ok(limit) = raw.parse::<i64>() {
        return Some(limit);
    }
    raw.parse::<f64>()
        .ok()
        .filter(|limit| limit.is_finite())
        .map(|limit| limit.trunc() as i64)
}

#[cfg(test)]
#[path = "tests/encoder_tests.rs"]
mod tests;
