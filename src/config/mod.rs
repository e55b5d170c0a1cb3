#[cfg(feature = "cli")]
pub mod cli;

use crate::utils::error::{ProviderError, Result};
use crate::utils::validation::{validate_secret, validate_url, Validate};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::Path;

pub const TOKEN_ENV: &str = "UPLOADTHING_TOKEN";
pub const API_URL_ENV: &str = "UPLOADTHING_API_URL";
pub const DEFAULT_API_URL: &str = "https://api.uploadthing.com";

#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub token: Option<String>,
    /// `None` means "not chosen"; [`ProviderConfig::api_url`] resolves it to the public API.
    #[serde(default)]
    pub api_url: Option<String>,
}

// tokens are credentials; keep them out of debug logs
impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("api_url", &self.api_url)
            .finish()
    }
}

impl ProviderConfig {
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            ..Default::default()
        }
    }

    pub fn api_url(&self) -> &str {
        self.api_url.as_deref().unwrap_or(DEFAULT_API_URL)
    }

    pub fn from_env() -> Self {
        Self::default().with_env_fallback()
    }

    /// Fills unset fields from `UPLOADTHING_TOKEN` / `UPLOADTHING_API_URL`.
    /// Explicit values always win.
    pub fn with_env_fallback(self) -> Self {
        self.with_fallback_from(|name| env::var(name).ok())
    }

    pub(crate) fn with_fallback_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.token.is_none() {
            self.token = lookup(TOKEN_ENV);
        }
        if self.api_url.is_none() {
            self.api_url = lookup(API_URL_ENV);
        }
        self
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: ProviderConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ProviderError::ConfigError {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;
        Self::from_toml_str(&content)
    }
}

impl Validate for ProviderConfig {
    fn validate(&self) -> Result<()> {
        validate_url("api_url", self.api_url())?;

        // an absent token is allowed; it fails on the first remote call
        if let Some(token) = &self.token {
            validate_secret("token", token)?;
        }

        tracing::debug!("Provider configuration validation passed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_explicit_token_wins_over_env() {
        let config = ProviderConfig::with_token("explicit")
            .with_fallback_from(lookup_from(&[(TOKEN_ENV, "from-env")]));
        assert_eq!(config.token.as_deref(), Some("explicit"));
    }

    #[test]
    fn test_env_fills_missing_fields() {
        let config = ProviderConfig::default().with_fallback_from(lookup_from(&[
            (TOKEN_ENV, "from-env"),
            (API_URL_ENV, "http://localhost:9000"),
        ]));
        assert_eq!(config.token.as_deref(), Some("from-env"));
        assert_eq!(config.api_url(), "http://localhost:9000");
    }

    #[test]
    fn test_no_env_leaves_token_unset() {
        let config = ProviderConfig::default().with_fallback_from(lookup_from(&[]));
        assert!(config.token.is_none());
        assert!(config.api_url.is_none());
        assert_eq!(config.api_url(), DEFAULT_API_URL);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_explicit_default_api_url_is_not_overridden() {
        let config = ProviderConfig {
            token: None,
            api_url: Some(DEFAULT_API_URL.to_string()),
        }
        .with_fallback_from(lookup_from(&[(API_URL_ENV, "http://localhost:9000")]));
        assert_eq!(config.api_url(), DEFAULT_API_URL);
    }

    #[test]
    fn test_validation_rejects_blank_token_and_bad_url() {
        assert!(ProviderConfig::with_token("  ").validate().is_err());

        let config = ProviderConfig {
            token: None,
            api_url: Some("ftp://example.com".to_string()),
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_toml_str() {
        let config = ProviderConfig::from_toml_str(
            r#"
token = "abc"
api_url = "http://localhost:3000"
"#,
        )
        .unwrap();
        assert_eq!(config.token.as_deref(), Some("abc"));
        assert_eq!(config.api_url(), "http://localhost:3000");

        let defaults = ProviderConfig::from_toml_str("").unwrap();
        assert_eq!(defaults, ProviderConfig::default());
    }

    #[test]
    fn test_debug_redacts_token() {
        let rendered = format!("{:?}", ProviderConfig::with_token("secret-token"));
        assert!(!rendered.contains("secret-token"));
        assert!(rendered.contains("<redacted>"));
    }
}
