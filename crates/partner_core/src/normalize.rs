use serde_json::Value;
use shared::protocol::RawQueryResponse;
use tracing::warn;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedPage {
    pub records: Vec<Value>,
    pub total: u64,
}

pub fn normalize(response: RawQueryResponse) -> NormalizedPage {
    let (records, total) = match response {
        RawQueryResponse::Sequence(records) => {
            let total = records.len() as u64;
            (records, total)
        }
        RawQueryResponse::Results { results, total } => {
            let total = total.unwrap_or(results.len() as u64);
            (results, total)
        }
        RawQueryResponse::Items { items, count } => {
            let total = count.unwrap_or(items.len() as u64);
            (items, total)
        }
        RawQueryResponse::Data(data) => {
            let records = match data {
                Value::Array(records) => records,
                single => vec![single],
            };
            let total = records.len() as u64;
            (records, total)
        }
        RawQueryResponse::Unrecognized(payload) => {
            warn!(
                shape = shape_hint(&payload),
                "unrecognized query response shape; treating as no results"
            );
            (Vec::new(), 0)
        }
    };

    NormalizedPage { records, total }
}

pub fn normalize_value(response: Value) -> NormalizedPage {
    normalize(RawQueryResponse::from_value(response))
}

fn shape_hint(payload: &Value) -> String {
    match payload {
        Value::Object(obj) => {
            let keys: Vec<&str> = obj.keys().map(String::as_str).take(8).collect();
            format!("object{{{}}}", keys.join(","))
        }
        Value::Null => "null".into(),
        Value::Bool(_) => "bool".into(),
        Value::Number(_) => "number".into(),
        Value::String(_) => "string".into(),
        Value::Array(_) => "array".into(),
    }
}

#[cfg(test)]
#[path = "tests/normalize_tests.rs"]
mod tests;
