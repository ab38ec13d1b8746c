//! Gateway configuration
//!
//! Read from the process environment (after `.env` is loaded by the
//! binary). Every setting has a default except the generation API key,
//! which only the `query` path requires.

use crate::error::{PipelineError, Result};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// History page size when the caller gives none
pub const DEFAULT_HISTORY_LIMIT: usize = 10;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_base_url: String,
    pub generation_timeout: Duration,
    pub execution_timeout: Duration,
    pub databases_dir: PathBuf,
    pub store_read_only: bool,
    /// `memory`, a `postgres://` URL, or a SQLite file path
    pub audit_database_url: String,
    pub permissions_file: Option<PathBuf>,
    pub principals_file: Option<PathBuf>,
    pub history_max_limit: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            openai_model: "gpt-4o".to_string(),
            openai_base_url: "https://api.openai.com/v1".to_string(),
            generation_timeout: Duration::from_secs(60),
            execution_timeout: Duration::from_secs(30),
            databases_dir: PathBuf::from("databases"),
            store_read_only: true,
            audit_database_url: "audit.db".to_string(),
            permissions_file: None,
            principals_file: None,
            history_max_limit: 100,
        }
    }
}

impl PipelineConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key -> value source; unset and blank values fall
    /// back to the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let history_max_limit = parse_or(&get, "HISTORY_MAX_LIMIT", defaults.history_max_limit)?;
        if history_max_limit == 0 {
            return Err(PipelineError::Config(
                "HISTORY_MAX_LIMIT must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            openai_api_key: get("OPENAI_API_KEY"),
            openai_model: get("OPENAI_MODEL").unwrap_or(defaults.openai_model),
            openai_base_url: get("OPENAI_BASE_URL").unwrap_or(defaults.openai_base_url),
            generation_timeout: seconds(&get, "GENERATION_TIMEOUT_SECS", defaults.generation_timeout)?,
            execution_timeout: seconds(&get, "EXECUTION_TIMEOUT_SECS", defaults.execution_timeout)?,
            databases_dir: get("DATABASES_DIR").map(PathBuf::from).unwrap_or(defaults.databases_dir),
            store_read_only: boolean(&get, "STORE_READ_ONLY", defaults.store_read_only)?,
            audit_database_url: get("AUDIT_DATABASE_URL").unwrap_or(defaults.audit_database_url),
            permissions_file: get("PERMISSIONS_FILE").map(PathBuf::from),
            principals_file: get("PRINCIPALS_FILE").map(PathBuf::from),
            history_max_limit,
        })
    }

    pub fn require_api_key(&self) -> Result<&str> {
        self.openai_api_key
            .as_deref()
            .ok_or_else(|| PipelineError::Config("OPENAI_API_KEY is not set".to_string()))
    }
}

fn parse_or<T: FromStr>(get: &dyn Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match get(key) {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|e| PipelineError::Config(format!("Invalid {} '{}': {}", key, raw, e))),
    }
}

fn seconds(get: &dyn Fn(&str) -> Option<String>, key: &str, default: Duration) -> Result<Duration> {
    let secs: f64 = parse_or(get, key, default.as_secs_f64())?;
    if !secs.is_finite() || secs <= 0.0 {
        return Err(PipelineError::Config(format!("{} must be a positive number of seconds", key)));
    }
    Duration::try_from_secs_f64(secs)
        .map_err(|e| PipelineError::Config(format!("Invalid {} '{}': {}", key, secs, e)))
}

fn boolean(get: &dyn Fn(&str) -> Option<String>, key: &str, default: bool) -> Result<bool> {
    match get(key).map(|v| v.to_lowercase()) {
        None => Ok(default),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(PipelineError::Config(format!("Invalid {} '{}': expected true or false", key, v))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<PipelineConfig> {
        let vars: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        PipelineConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.openai_model, "gpt-4o");
        assert_eq!(cfg.generation_timeout, Duration::from_secs(60));
        assert_eq!(cfg.execution_timeout, Duration::from_secs(30));
        assert!(cfg.store_read_only);
        assert_eq!(cfg.audit_database_url, "audit.db");
        assert!(cfg.require_api_key().is_err());
    }

    #[test]
    fn test_overrides() {
        let cfg = config(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("GENERATION_TIMEOUT_SECS", "2.5"),
            ("STORE_READ_ONLY", "No"),
            ("AUDIT_DATABASE_URL", "memory"),
            ("HISTORY_MAX_LIMIT", "25"),
            ("PERMISSIONS_FILE", "  "),
        ])
        .unwrap();
        assert_eq!(cfg.require_api_key().unwrap(), "sk-test");
        assert_eq!(cfg.generation_timeout, Duration::from_millis(2500));
        assert!(!cfg.store_read_only);
        assert_eq!(cfg.audit_database_url, "memory");
        assert!(cfg.permissions_file.is_none());
        assert_eq!(cfg.history_max_limit, 25);
    }

    #[test]
    fn test_invalid_values() {
        for vars in [
            [("EXECUTION_TIMEOUT_SECS", "soon")],
            [("EXECUTION_TIMEOUT_SECS", "0")],
            [("STORE_READ_ONLY", "maybe")],
            [("HISTORY_MAX_LIMIT", "-1")],
            [("HISTORY_MAX_LIMIT", "0")],
            [("GENERATION_TIMEOUT_SECS", "1e300")],
            [("EXECUTION_TIMEOUT_SECS", "inf")],
        ] {
            assert!(matches!(config(&vars), Err(PipelineError::Config(_))));
        }
    }
}
