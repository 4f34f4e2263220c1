use std::{fs, io, path::Path};

use serde::Deserialize;
use url::Url;

use crate::error::QueryError;

pub const SETTINGS_FILE: &str = "partner.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_base: String,
    pub read_model_url: Option<String>,
    pub read_model_key: Option<String>,
    pub default_limit: i64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base: "http://localhost:8000".into(),
            read_model_url: None,
            read_model_key: None,
            default_limit: 50,
        }
    }
}

/// Credentials for the relational read model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadModelCredentials {
    pub url: String,
    pub key: String,
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    api_base: Option<String>,
    read_model_url: Option<String>,
    read_model_key: Option<String>,
    default_limit: Option<i64>,
}

pub fn load_settings() -> Result<Settings, QueryError> {
    load_settings_from(Path::new(SETTINGS_FILE))
}

/// Defaults, then the TOML file at `path` when it exists, then the process
/// environment.
pub fn load_settings_from(path: &Path) -> Result<Settings, QueryError> {
    let mut settings = Settings::default();
    apply_file(&mut settings, path)?;
    apply_env(&mut settings, |name| std::env::var(name).ok());
    Ok(settings)
}

fn apply_file(settings: &mut Settings, path: &Path) -> Result<(), QueryError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(error) => {
            return Err(QueryError::config(format!(
                "failed to read '{}': {error}",
                path.display()
            )))
        }
    };

    let file_cfg: FileSettings = toml::from_str(&raw).map_err(|error| {
        QueryError::config(format!("invalid settings file '{}': {error}", path.display()))
    })?;

    if let Some(v) = file_cfg.api_base {
        settings.api_base = v;
    }
    if let Some(v) = file_cfg.read_model_url {
        settings.read_model_url = Some(v);
    }
    if let Some(v) = file_cfg.read_model_key {
        settings.read_model_key = Some(v);
    }
    if let Some(v) = file_cfg.default_limit {
        settings.default_limit = v;
    }
    Ok(())
}

pub fn apply_env(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    let last = |names: &[&str]| names.iter().filter_map(|name| lookup(*name)).last();

    if let Some(v) = last(&["VITE_API_BASE", "PARTNER_API_BASE", "APP__API_BASE"]) {
        settings.api_base = v;
    }
    if let Some(v) = last(&["VITE_SUPABASE_URL", "SUPABASE_URL", "APP__READ_MODEL_URL"]) {
        settings.read_model_url = Some(v);
    }
    if let Some(v) = last(&[
        "VITE_SUPABASE_ANON_KEY",
        "SUPABASE_ANON_KEY",
        "APP__READ_MODEL_KEY",
    ]) {
        settings.read_model_key = Some(v);
    }
    if let Some(v) = last(&["APP__DEFAULT_LIMIT"]) {
        if let Ok(parsed) = v.trim().parse::<i64>() {
            settings.default_limit = parsed;
        }
    }
}

impl Settings {
    /// Absolute http(s) base URL of the action endpoint, without a trailing `/`.
    pub fn api_base_url(&self) -> Result<String, QueryError> {
        normalize_base_url("api_base", &self.api_base)
    }

    /// `None` when neither credential is set; exactly one is a configuration
    /// error.
    pub fn read_model_credentials(&self) -> Result<Option<ReadModelCredentials>, QueryError> {
        let url = blank_to_none(self.read_model_url.as_deref());
        let key = blank_to_none(self.read_model_key.as_deref());
        match (url, key) {
            (None, None) => Ok(None),
            (Some(url), Some(key)) => Ok(Some(ReadModelCredentials {
                url: normalize_base_url("read_model_url", url)?,
                key: key.to_string(),
            })),
            (Some(_), None) => Err(QueryError::config(
                "read_model_url is set but read_model_key is missing",
            )),
            (None, Some(_)) => Err(QueryError::config(
                "read_model_key is set but read_model_url is missing",
            )),
        }
    }

    pub fn validate(&self) -> Result<(), QueryError> {
        self.api_base_url()?;
        self.read_model_credentials()?;
        Ok(())
    }
}

fn blank_to_none(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn normalize_base_url(name: &str, raw: &str) -> Result<String, QueryError> {
    let raw = raw.trim();
    let parsed = Url::parse(raw)
        .map_err(|error| QueryError::config(format!("{name} '{raw}' is not a valid URL: {error}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(QueryError::config(format!(
            "{name} '{raw}' must use http or https"
        )));
    }
    Ok(raw.trim_end_matches('/').to_string())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
