//! Config Loader (§4.10, §9): YAML + env merged once at startup into one
//! validated value type. No runtime attribute lookup — every field is
//! coerced and checked exactly once, here.

use flagfarm_protocol::{defaults, teams::expand_teams};
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required config key: {0}")]
    MissingKey(String),
    #[error("invalid value for config key {key}: {value}")]
    InvalidValue { key: String, value: String },
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// The materialized server configuration. Built once, handed around as
/// `Arc<Config>`, never re-derived at request time.
#[derive(Debug, Clone)]
pub struct Config {
    pub password: String,
    pub teams: Vec<String>,
    pub system_url: String,
    pub team_token: String,
    pub system_type: String,
    pub flag_format: String,
    pub flag_regex: RegexWrapper,
    pub flag_lifetime_ticks: i64,
    pub tick_duration_secs: i64,
    pub submit_period_secs: i64,
    pub submit_timeout_secs: u64,
    pub batch_limit: i64,
    pub database: String,
    pub address: String,
    pub port: u16,
    pub secret_key: String,
}

/// `Regex` doesn't implement `Debug`/`Clone` compatibly with deriving on
/// `Config` out of the box in every version, so wrap it thinly.
#[derive(Clone)]
pub struct RegexWrapper(pub Regex);

impl std::fmt::Debug for RegexWrapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Regex({})", self.0.as_str())
    }
}

impl Config {
    pub fn lifetime_secs(&self) -> i64 {
        self.flag_lifetime_ticks * self.tick_duration_secs
    }
}

const REQUIRED_KEYS: &[&str] = &["password", "teams", "system_url", "team_token", "secret_key"];

/// Loads `farm.yml` (if it exists) and overlays `FARM_<KEY>` environment
/// variables (env wins over YAML, YAML wins over built-in defaults), then
/// builds the validated `Config`.
pub fn load(yaml_path: &Path) -> Result<Config, ConfigError> {
    let mut raw = default_map();

    if yaml_path.exists() {
        let text = std::fs::read_to_string(yaml_path).map_err(|source| ConfigError::Read {
            path: yaml_path.display().to_string(),
            source,
        })?;
        let value: serde_yaml::Value = serde_yaml::from_str(&text)?;
        if let serde_yaml::Value::Mapping(map) = value {
            for (k, v) in map {
                if let Some(key) = k.as_str() {
                    raw.insert(key.to_ascii_lowercase(), yaml_scalar_to_string(&v));
                }
            }
        }
    }

    for key in all_keys() {
        let env_key = format!("FARM_{}", key.to_ascii_uppercase());
        if let Ok(value) = std::env::var(&env_key) {
            raw.insert(key.to_string(), value);
        }
    }

    from_raw(raw)
}

fn yaml_scalar_to_string(value: &serde_yaml::Value) -> String {
    match value {
        serde_yaml::Value::String(s) => s.clone(),
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::Bool(b) => b.to_string(),
        other => serde_yaml::to_string(other).unwrap_or_default().trim().to_string(),
    }
}

fn default_map() -> HashMap<String, String> {
    let mut m = HashMap::new();
    m.insert("system_type".to_string(), defaults::DEFAULT_SYSTEM_TYPE.to_string());
    m.insert("flag_format".to_string(), defaults::DEFAULT_FLAG_FORMAT.to_string());
    m.insert(
        "flag_lifetime".to_string(),
        defaults::DEFAULT_FLAG_LIFETIME_TICKS.to_string(),
    );
    m.insert(
        "tick_duration".to_string(),
        defaults::DEFAULT_TICK_DURATION_SECS.to_string(),
    );
    m.insert(
        "submit_period".to_string(),
        defaults::DEFAULT_SUBMIT_PERIOD_SECS.to_string(),
    );
    m.insert(
        "submit_timeout".to_string(),
        defaults::DEFAULT_SUBMIT_TIMEOUT_SECS.to_string(),
    );
    m.insert("batch_limit".to_string(), defaults::DEFAULT_BATCH_LIMIT.to_string());
    m.insert("database".to_string(), defaults::DEFAULT_DATABASE.to_string());
    m.insert("address".to_string(), defaults::DEFAULT_ADDRESS.to_string());
    m.insert("port".to_string(), defaults::DEFAULT_PORT.to_string());
    m
}

fn all_keys() -> Vec<&'static str> {
    vec![
        "password",
        "teams",
        "system_url",
        "team_token",
        "system_type",
        "flag_format",
        "flag_lifetime",
        "tick_duration",
        "submit_period",
        "submit_timeout",
        "batch_limit",
        "database",
        "address",
        "port",
        "secret_key",
    ]
}

fn required(raw: &HashMap<String, String>, key: &str) -> Result<String, ConfigError> {
    raw.get(key)
        .cloned()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ConfigError::MissingKey(key.to_string()))
}

fn parse_i64(raw: &HashMap<String, String>, key: &str) -> Result<i64, ConfigError> {
    let value = required(raw, key)?;
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value,
    })
}

fn from_raw(raw: HashMap<String, String>) -> Result<Config, ConfigError> {
    for key in REQUIRED_KEYS {
        required(&raw, key)?;
    }

    let flag_format = required(&raw, "flag_format")?;
    let flag_regex = Regex::new(&format!("^{flag_format}$")).map_err(|_| ConfigError::InvalidValue {
        key: "flag_format".to_string(),
        value: flag_format.clone(),
    })?;

    let port_str = required(&raw, "port")?;
    let port: u16 = port_str.parse().map_err(|_| ConfigError::InvalidValue {
        key: "port".to_string(),
        value: port_str,
    })?;

    Ok(Config {
        password: required(&raw, "password")?,
        teams: expand_teams(&required(&raw, "teams")?),
        system_url: required(&raw, "system_url")?,
        team_token: required(&raw, "team_token")?,
        system_type: required(&raw, "system_type")?,
        flag_format,
        flag_regex: RegexWrapper(flag_regex),
        flag_lifetime_ticks: parse_i64(&raw, "flag_lifetime")?,
        tick_duration_secs: parse_i64(&raw, "tick_duration")?,
        submit_period_secs: parse_i64(&raw, "submit_period")?,
        submit_timeout_secs: parse_i64(&raw, "submit_timeout")? as u64,
        batch_limit: parse_i64(&raw, "batch_limit")?,
        database: required(&raw, "database")?,
        address: required(&raw, "address")?,
        port,
        secret_key: required(&raw, "secret_key")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_raw() -> HashMap<String, String> {
        let mut raw = default_map();
        raw.insert("password".into(), "hunter2".into());
        raw.insert("teams".into(), "10.0.0.{1..3}".into());
        raw.insert("system_url".into(), "http://game.ctf/flags".into());
        raw.insert("team_token".into(), "tok".into());
        raw.insert("secret_key".into(), "s3cr3t".into());
        raw
    }

    #[test]
    fn builds_config_from_minimal_overlay() {
        let cfg = from_raw(minimal_raw()).unwrap();
        assert_eq!(cfg.teams, vec!["10.0.0.1", "10.0.0.2", "10.0.0.3"]);
        assert_eq!(cfg.lifetime_secs(), defaults::DEFAULT_FLAG_LIFETIME_TICKS * defaults::DEFAULT_TICK_DURATION_SECS);
        assert!(cfg.flag_regex.0.is_match("AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA="));
    }

    #[test]
    fn missing_required_key_is_fatal() {
        let mut raw = minimal_raw();
        raw.remove("password");
        let err = from_raw(raw).unwrap_err();
        assert!(matches!(err, ConfigError::MissingKey(k) if k == "password"));
    }

    #[test]
    fn flag_regex_is_anchored() {
        let cfg = from_raw(minimal_raw()).unwrap();
        assert!(!cfg.flag_regex.0.is_match("xAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA=x"));
    }
}
