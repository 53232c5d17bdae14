//! Tap configuration: JSON file with `${VAR}` environment substitution.

use std::borrow::Cow;
use std::fmt;
use std::path::Path;
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::{Result, TapError};

/// Rescue API root used when `base_url` is not configured.
pub const DEFAULT_BASE_URL: &str = "https://secure.logmeinrescue.com/API";

/// Keys that must be present and non-empty.
pub const REQUIRED_KEYS: [&str; 3] = ["username", "password", "start_date"];

static ENV_VAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid env var regex"));

/// Connection and sync-window settings.
#[derive(Clone, Deserialize)]
pub struct Config {
    /// Rescue account e-mail.
    pub username: String,
    pub password: String,
    /// Earliest report date when a stream has no bookmark.
    #[serde(deserialize_with = "deserialize_start_date")]
    pub start_date: DateTime<Utc>,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("start_date", &self.start_date)
            .field("base_url", &self.base_url)
            .field("user_agent", &self.user_agent)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

/// Parse `start_date` as RFC 3339, or as a bare `YYYY-MM-DD` at midnight UTC.
pub(crate) fn parse_start_date(raw: &str) -> std::result::Result<DateTime<Utc>, String> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|ndt| ndt.and_utc())
        .ok_or_else(|| format!("start_date '{raw}' is neither RFC 3339 nor YYYY-MM-DD"))
}

fn deserialize_start_date<'de, D>(deserializer: D) -> std::result::Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_start_date(&raw).map_err(serde::de::Error::custom)
}

fn expand<'a>(input: &'a str, missing: &mut Vec<String>) -> Cow<'a, str> {
    ENV_VAR_RE.replace_all(input, |cap: &regex::Captures<'_>| {
        std::env::var(&cap[1]).unwrap_or_else(|_| {
            missing.push(cap[1].to_string());
            String::new()
        })
    })
}

/// Substitute `${VAR_NAME}` inside every string of a parsed document.
/// Keys and non-string values are left alone, so substituted values never
/// need JSON escaping.
///
/// # Errors
///
/// Returns [`TapError::Config`] naming every referenced variable that is not set.
pub fn substitute_env_vars_in_value(value: &mut Value) -> Result<()> {
    fn walk(value: &mut Value, missing: &mut Vec<String>) {
        match value {
            Value::String(s) => *s = expand(s, missing).into_owned(),
            Value::Array(items) => items.iter_mut().for_each(|v| walk(v, missing)),
            Value::Object(map) => map.values_mut().for_each(|v| walk(v, missing)),
            Value::Null | Value::Bool(_) | Value::Number(_) => {}
        }
    }

    let mut missing = Vec::new();
    walk(value, &mut missing);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(TapError::Config(format!(
            "missing environment variable(s): {}",
            missing.join(", ")
        )))
    }
}

fn is_missing(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    }
}

impl Config {
    /// Build a config from an already-parsed JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`TapError::MissingConfigKeys`] listing every absent required
    /// key, or [`TapError::Config`] if a value is malformed.
    pub fn from_value(value: Value) -> Result<Self> {
        if !value.is_object() {
            return Err(TapError::Config("config must be a JSON object".to_string()));
        }

        let missing: Vec<String> = REQUIRED_KEYS
            .iter()
            .filter(|key| is_missing(value.get(**key)))
            .map(|key| (*key).to_string())
            .collect();
        if !missing.is_empty() {
            return Err(TapError::MissingConfigKeys(missing));
        }

        let config: Self =
            serde_json::from_value(value).map_err(|e| TapError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a config document, then substitute env vars in its strings.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is invalid, substitution fails, or a
    /// required key is missing.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let mut value: Value = serde_json::from_str(raw)
            .map_err(|e| TapError::Config(format!("config is not valid JSON: {e}")))?;
        substitute_env_vars_in_value(&mut value)?;
        Self::from_value(value)
    }

    /// Read and parse a config file.
    ///
    /// # Errors
    ///
    /// Returns [`TapError::Io`] if the file can't be read, otherwise the
    /// errors of [`Config::from_json_str`].
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        if !(self.base_url.starts_with("https://") || self.base_url.starts_with("http://")) {
            errors.push(format!("base_url '{}' must be an http(s) URL", self.base_url));
        }
        if self.request_timeout_secs == 0 {
            errors.push("request_timeout_secs must be > 0".to_string());
        }
        if self.start_date > Utc::now() {
            errors.push(format!("start_date {} is in the future", self.start_date.to_rfc3339()));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(TapError::Config(errors.join("; ")))
        }
    }
}
