//! Remote store configuration.

use crate::error::{CloudError, CloudResult};
use serde::{Deserialize, Serialize};

/// Configuration for the Workers KV client.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KvConfig {
    /// Base URL for the REST API (e.g., "https://api.cloudflare.com/client/v4").
    pub api_base_url: String,

    pub account_id: String,

    /// KV namespace holding the catalog.
    pub namespace_id: String,

    /// API token, or the global API key when `account_email` is set.
    pub api_token: String,

    /// Switches to legacy `X-Auth-Email`/`X-Auth-Key` authentication.
    pub account_email: Option<String>,

    /// Keys requested per listing page (the API caps this at 1000).
    pub page_size: u32,

    pub request_timeout_secs: u64,

    /// Public front end that resolves ids, used to build share links.
    pub public_base_url: Option<String>,
}

impl Default for KvConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.cloudflare.com/client/v4".to_string(),
            account_id: String::new(),
            namespace_id: String::new(),
            api_token: String::new(),
            account_email: None,
            page_size: 1000,
            request_timeout_secs: 30,
            public_base_url: None,
        }
    }
}

impl KvConfig {
    /// Reads configuration from `CDNMANAGER_*` environment variables, falling
    /// back to the variable names used by earlier releases.
    pub fn from_env() -> CloudResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> CloudResult<Self> {
        let var = |primary: &str, legacy: &str| {
            lookup(primary)
                .or_else(|| lookup(legacy))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let required = |primary: &str, legacy: &str| {
            var(primary, legacy)
                .ok_or_else(|| CloudError::Config(format!("{primary} (or {legacy}) is not set")))
        };

        let defaults = Self::default();
        let page_size = match var("CDNMANAGER_PAGE_SIZE", "page_size") {
            Some(raw) => raw
                .parse()
                .map_err(|_| CloudError::Config(format!("invalid page size `{raw}`")))?,
            None => defaults.page_size,
        };

        let config = Self {
            api_base_url: var("CDNMANAGER_API_BASE_URL", "cloudflare_api_base_url")
                .unwrap_or(defaults.api_base_url),
            account_id: required("CDNMANAGER_ACCOUNT_ID", "account_id")?,
            namespace_id: required("CDNMANAGER_NAMESPACE_ID", "namespace_id")?,
            api_token: required("CDNMANAGER_API_TOKEN", "cloudflare_api_key")?,
            account_email: var("CDNMANAGER_ACCOUNT_EMAIL", "cloudflare_email"),
            page_size,
            request_timeout_secs: defaults.request_timeout_secs,
            public_base_url: var("CDNMANAGER_PUBLIC_BASE_URL", "domain").map(with_scheme),
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks that the config can address a namespace.
    pub fn validate(&self) -> CloudResult<()> {
        if self.account_id.is_empty() {
            return Err(CloudError::Config("missing account_id".into()));
        }
        if self.namespace_id.is_empty() {
            return Err(CloudError::Config("missing namespace_id".into()));
        }
        if !(1..=1000).contains(&self.page_size) {
            return Err(CloudError::Config(format!(
                "page_size must be between 1 and 1000, got {}",
                self.page_size
            )));
        }
        Ok(())
    }

    /// Share link for an entry, if a public base URL is configured.
    pub fn share_url(&self, id: &str) -> Option<String> {
        self.public_base_url
            .as_deref()
            .map(|base| format!("{}/?id={id}", base.trim_end_matches('/')))
    }
}

/// Older configs stored a bare domain.
fn with_scheme(domain: String) -> String {
    if domain.starts_with("http://") || domain.starts_with("https://") {
        domain
    } else {
        format!("https://{domain}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn from_lookup_reads_primary_names() {
        let config = KvConfig::from_lookup(lookup(&[
            ("CDNMANAGER_ACCOUNT_ID", "acc"),
            ("CDNMANAGER_NAMESPACE_ID", "ns"),
            ("CDNMANAGER_API_TOKEN", "tok"),
            ("CDNMANAGER_PAGE_SIZE", "50"),
        ]))
        .unwrap();
        assert_eq!(config.account_id, "acc");
        assert_eq!(config.namespace_id, "ns");
        assert_eq!(config.api_token, "tok");
        assert_eq!(config.page_size, 50);
        assert_eq!(config.account_email, None);
        assert_eq!(config.api_base_url, "https://api.cloudflare.com/client/v4");
    }

    #[test]
    fn from_lookup_falls_back_to_legacy_names() {
        let config = KvConfig::from_lookup(lookup(&[
            ("account_id", "acc"),
            ("namespace_id", "ns"),
            ("cloudflare_api_key", "key"),
            ("cloudflare_email", "me@example.com"),
            ("domain", "cdn.example.com"),
        ]))
        .unwrap();
        assert_eq!(config.account_email.as_deref(), Some("me@example.com"));
        assert_eq!(config.public_base_url.as_deref(), Some("https://cdn.example.com"));
    }

    #[test]
    fn from_lookup_requires_namespace() {
        let err = KvConfig::from_lookup(lookup(&[
            ("account_id", "acc"),
            ("cloudflare_api_key", "key"),
        ]))
        .unwrap_err();
        assert!(matches!(err, CloudError::Config(msg) if msg.contains("NAMESPACE")));
    }

    #[test]
    fn page_size_out_of_range_is_rejected() {
        let config = KvConfig {
            account_id: "a".into(),
            namespace_id: "n".into(),
            page_size: 5000,
            ..KvConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn share_url_joins_base_and_id() {
        let config = KvConfig {
            public_base_url: Some("https://cdn.example.com/".into()),
            ..KvConfig::default()
        };
        assert_eq!(
            config.share_url("abc").as_deref(),
            Some("https://cdn.example.com/?id=abc")
        );
        assert_eq!(KvConfig::default().share_url("abc"), None);
    }
}
