use std::fmt::Write as _;

use serde_json::Value;
use shared::{domain::CompanyRecord, protocol::PredictScoreResponse};

const INDUSTRY_BADGE_MAX: usize = 28;
const SEGMENT_BADGE_MAX: usize = 26;
const BADGES_PER_KIND: usize = 2;

const DEFAULT_BREAKDOWN: [(&str, &str, f64); 4] = [
    ("Industry focus", "industry_focus", 7.5),
    ("Relationship", "relationship", 6.0),
    ("Sales history", "sales_history", 5.0),
    ("Certifications", "certifications", 8.0),
];

pub fn format_score(score: Option<f64>) -> String {
    match score {
        Some(score) if score.is_finite() => format!("{score:.1}"),
        _ => "N/A".into(),
    }
}

/// `[####------]` with `value / max` of the slots filled.
pub fn bar(value: f64, max: f64, width: usize) -> String {
    let ratio = if max > 0.0 { (value / max).clamp(0.0, 1.0) } else { 0.0 };
    let filled = (ratio * width as f64).round() as usize;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(width - filled))
}

fn truncate(label: &str, max: usize) -> String {
    if label.chars().count() <= max {
        return label.to_string();
    }
    let kept: String = label.chars().take(max - 3).collect();
    format!("{kept}…")
}

fn territory_badge(record: &CompanyRecord) -> Option<String> {
    let territory = &record.territory;
    match (&territory.city, &territory.country) {
        (Some(city), Some(country)) => Some(format!("{city}, {country}")),
        (Some(place), None) | (None, Some(place)) => Some(place.clone()),
        (None, None) => None,
    }
}

fn badges(labels: &[String], max_len: usize, overflow_suffix: &str) -> Vec<String> {
    let mut out: Vec<String> = labels
        .iter()
        .take(BADGES_PER_KIND)
        .map(|label| truncate(label, max_len))
        .collect();
    if labels.len() > BADGES_PER_KIND {
        out.push(format!("+{} {overflow_suffix}", labels.len() - BADGES_PER_KIND));
    }
    out
}

pub fn render_list(companies: &[CompanyRecord], total: u64) -> String {
    if companies.is_empty() {
        return "No results. Try adjusting the filters.\n".into();
    }

    let mut out = format!("Found {} partner(s)", companies.len());
    if total > companies.len() as u64 {
        let _ = write!(out, " of {total}");
    }
    out.push('\n');

    for (index, company) in companies.iter().enumerate() {
        let name = company.name.as_deref().unwrap_or("Unnamed");
        let score = format_score(company.partner_score);
        let _ = writeln!(out, "\n[{index}] {name}  {score}");
        let _ = writeln!(out, "    {}", bar(company.partner_score.unwrap_or(0.0), 100.0, 20));

        let mut line: Vec<String> = Vec::new();
        if let Some(territory) = territory_badge(company) {
            line.push(format!("@ {territory}"));
        }
        line.extend(badges(&company.industry_details, INDUSTRY_BADGE_MAX, "ind."));
        line.extend(badges(&company.classifications, SEGMENT_BADGE_MAX, "seg."));
        if !line.is_empty() {
            let _ = writeln!(out, "    {}", line.join("  "));
        }
    }
    out
}

fn breakdown(record: &CompanyRecord) -> Vec<(String, f64)> {
    if let Some(Value::Object(entries)) = record.extra.get("score_breakdown") {
        return entries
            .iter()
            .map(|(label, value)| (label.clone(), value.as_f64().unwrap_or(0.0)))
            .collect();
    }
    DEFAULT_BREAKDOWN
        .iter()
        .map(|(label, field, default)| {
            let value = record
                .extra
                .get(*field)
                .and_then(Value::as_f64)
                .unwrap_or(*default);
            (label.to_string(), value)
        })
        .collect()
}

fn or_na(value: Option<&str>) -> &str {
    value.unwrap_or("N/A")
}

fn chips(labels: &[String]) -> String {
    if labels.is_empty() {
        "No data".into()
    } else {
        labels.join(", ")
    }
}

pub fn render_detail(record: &CompanyRecord) -> String {
    let mut out = String::new();
    let territory = &record.territory;
    let _ = writeln!(out, "{}", record.name.as_deref().unwrap_or("Unnamed partner"));
    let _ = writeln!(
        out,
        "Partner score: {}  {}",
        format_score(record.partner_score),
        bar(record.partner_score.unwrap_or(0.0), 100.0, 30)
    );

    out.push_str("\nScore breakdown\n");
    for (label, value) in breakdown(record) {
        let _ = writeln!(out, "  {label:<20} {value:>4.1} / 10.0 {}", bar(value, 10.0, 10));
    }

    out.push_str("\nGeneral\n");
    let region = territory.global_region.as_deref().or(territory.region.as_deref());
    let status = record.extra.get("status").and_then(Value::as_str);
    for (label, value) in [
        ("Country", or_na(territory.country.as_deref())),
        ("Region", or_na(region)),
        ("City", or_na(territory.city.as_deref())),
        ("Industry", or_na(record.industry.as_deref())),
        ("Segment", or_na(record.segment.as_deref())),
        ("Status", status.unwrap_or("Active")),
    ] {
        let _ = writeln!(out, "  {label:<10} {value}");
    }

    let _ = writeln!(out, "\nIndustries: {}", chips(&record.industry_details));
    let _ = writeln!(out, "Classifications: {}", chips(&record.classifications));

    out.push_str("\nFull record\n");
    match serde_json::to_string_pretty(record) {
        Ok(json) => out.push_str(&json),
        Err(error) => {
            let _ = write!(out, "<unprintable: {error}>");
        }
    }
    out.push('\n');
    out
}

pub fn render_prediction(response: &PredictScoreResponse) -> String {
    match response.positive_probability() {
        Some(probability) => format!(
            "Model: {}\nScore: {:.1}% {}\n",
            response.model_used,
            probability * 100.0,
            bar(probability, 1.0, 20)
        ),
        None => format!("Model: {}\nScore: N/A\n", response.model_used),
    }
}

pub fn render_sectors(sectors: &[String]) -> String {
    if sectors.is_empty() {
        return "No sectors available.\n".into();
    }
    let mut out = String::new();
    for sector in sectors {
        let _ = writeln!(out, "{sector}");
    }
    out
}

#[cfg(test)]
#[path = "tests/view_tests.rs"]
mod tests;
