//! Runtime configuration loaded from environment variables.

use crate::error::ConfigError;
use crate::fix::RetryPolicy;
use std::str::FromStr;
use std::time::Duration;

/// Checker configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// BIM portal base URL serving IDS documents.
    pub portal_host: String,
    /// Project whose IDS document is fetched with `--fetch`.
    pub project_guid: Option<String>,
    /// Bearer token for the portal, if it requires one.
    pub portal_token: Option<String>,
    /// Without a key explanations are mocked and suggestions rule-based.
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_base_url: String,
    /// Tracker bridge endpoint for BCF issues.
    pub tracker_url: String,
    /// Refresh period of the status reconciler.
    pub reconcile_interval: Duration,
    pub recommend_max_attempts: u32,
    pub recommend_backoff: Duration,
    /// Author written into generated issues.
    pub issue_author: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup`, falling back to defaults for
    /// unset or blank keys.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let text = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        Ok(Self {
            portal_host: text("IDS_PORTAL_HOST", "https://via.bund.de/bim/"),
            project_guid: get("IDS_PROJECT_GUID"),
            portal_token: get("IDS_PORTAL_TOKEN"),
            openai_api_key: get("OPENAI_API_KEY"),
            openai_model: text("OPENAI_MODEL", "gpt-3.5-turbo"),
            openai_base_url: text("OPENAI_BASE_URL", "https://api.openai.com/v1"),
            tracker_url: text("TRACKER_URL", "http://localhost:5001/api/jira/issue"),
            reconcile_interval: Duration::from_millis(parse_positive(
                "RECONCILE_INTERVAL_MS",
                get("RECONCILE_INTERVAL_MS"),
                100,
            )?),
            recommend_max_attempts: parse_positive(
                "RECOMMEND_MAX_ATTEMPTS",
                get("RECOMMEND_MAX_ATTEMPTS"),
                10,
            )?,
            recommend_backoff: Duration::from_millis(parse(
                "RECOMMEND_BACKOFF_MS",
                get("RECOMMEND_BACKOFF_MS"),
                0,
            )?),
            issue_author: text("ISSUE_AUTHOR", "BIM Analyst"),
        })
    }

    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.recommend_max_attempts,
            backoff: self.recommend_backoff,
        }
    }
}

fn parse<T: FromStr>(key: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError> {
    match value {
        None => Ok(default),
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::InvalidValue { key, value }),
    }
}

/// Like [`parse`], but zero is rejected too.
fn parse_positive<T>(key: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr + Default + PartialEq,
{
    let raw = value.clone();
    let parsed = parse(key, value, default)?;
    if parsed == T::default() {
        return Err(ConfigError::InvalidValue {
            key,
            value: raw.unwrap_or_default(),
        });
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = config(&[("OPENAI_API_KEY", "  ")]).unwrap();
        assert_eq!(config.portal_host, "https://via.bund.de/bim/");
        assert_eq!(config.openai_api_key, None);
        assert_eq!(config.openai_model, "gpt-3.5-turbo");
        assert_eq!(config.reconcile_interval, Duration::from_millis(100));
        assert_eq!(config.retry_policy(), RetryPolicy::default());
    }

    #[test]
    fn overrides_are_parsed() {
        let config = config(&[
            ("IDS_PROJECT_GUID", "abc"),
            ("RECONCILE_INTERVAL_MS", "250"),
            ("RECOMMEND_MAX_ATTEMPTS", "3"),
            ("RECOMMEND_BACKOFF_MS", "500"),
        ])
        .unwrap();
        assert_eq!(config.project_guid.as_deref(), Some("abc"));
        assert_eq!(config.reconcile_interval, Duration::from_millis(250));
        assert_eq!(
            config.retry_policy(),
            RetryPolicy {
                max_attempts: 3,
                backoff: Duration::from_millis(500),
            }
        );
    }

    #[test]
    fn zero_interval_and_attempts_are_rejected() {
        let err = config(&[("RECONCILE_INTERVAL_MS", "0")]).unwrap_err();
        assert_eq!(err.to_string(), "invalid value '0' for RECONCILE_INTERVAL_MS");

        let err = config(&[("RECOMMEND_MAX_ATTEMPTS", "0")]).unwrap_err();
        assert_eq!(err.to_string(), "invalid value '0' for RECOMMEND_MAX_ATTEMPTS");

        // No backoff is a valid setting
        let config = config(&[("RECOMMEND_BACKOFF_MS", "0")]).unwrap();
        assert_eq!(config.recommend_backoff, Duration::ZERO);
    }

    #[test]
    fn invalid_numbers_are_rejected() {
        let err = config(&[("RECOMMEND_MAX_ATTEMPTS", "many")]).unwrap_err();
        assert_eq!(err.to_string(), "invalid value 'many' for RECOMMEND_MAX_ATTEMPTS");
    }
}
