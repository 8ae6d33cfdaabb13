//! Environment-driven configuration for the external collaborators.
//!
//! Variables:
//! - `GEMINI_API_KEY` (or `GOOGLE_API_KEY`): required for the Gemini backend
//! - `GEMINI_MODEL`: model name (default: `gemini-2.5-flash`)
//! - `GEMINI_BASE_URL`: API root (default: the public v1beta endpoint)
//! - `PLAID_CLIENT_ID`, `PLAID_SECRET`: required for the transaction feed
//! - `PLAID_ENV`: `sandbox` (default), `development` or `production`

use serde::{Deserialize, Serialize};

use crate::error::{InsightError, Result};

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const PLAID_API_VERSION: &str = "2020-09-14";

#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

impl std::fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_GEMINI_MODEL.to_string(),
            base_url: GEMINI_BASE_URL.to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = non_empty(&lookup, "GEMINI_API_KEY")
            .or_else(|| non_empty(&lookup, "GOOGLE_API_KEY"))
            .ok_or_else(|| {
                InsightError::Config("GEMINI_API_KEY or GOOGLE_API_KEY must be set".to_string())
            })?;

        let mut config = Self::new(api_key);
        if let Some(model) = non_empty(&lookup, "GEMINI_MODEL") {
            config.model = model;
        }
        if let Some(base_url) = non_empty(&lookup, "GEMINI_BASE_URL") {
            config.base_url = base_url;
        }
        Ok(config)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaidEnvironment {
    Sandbox,
    Development,
    Production,
}

impl PlaidEnvironment {
    pub fn host(&self) -> &'static str {
        match self {
            Self::Sandbox => "https://sandbox.plaid.com",
            Self::Development => "https://development.plaid.com",
            Self::Production => "https://production.plaid.com",
        }
    }
}

impl std::str::FromStr for PlaidEnvironment {
    type Err = InsightError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sandbox" => Ok(Self::Sandbox),
            "development" => Ok(Self::Development),
            "production" => Ok(Self::Production),
            other => Err(InsightError::Config(format!(
                "Unknown PLAID_ENV '{}': expected sandbox, development or production",
                other
            ))),
        }
    }
}

#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaidConfig {
    pub client_id: String,
    pub secret: String,
    pub environment: PlaidEnvironment,
    /// Overrides the environment host, e.g. for a local mock.
    pub base_url: Option<String>,
}

impl std::fmt::Debug for PlaidConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaidConfig")
            .field("client_id", &self.client_id)
            .field("secret", &"<redacted>")
            .field("environment", &self.environment)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl PlaidConfig {
    pub fn new(client_id: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            secret: secret.into(),
            environment: PlaidEnvironment::Sandbox,
            base_url: None,
        }
    }

    pub fn with_environment(mut self, environment: PlaidEnvironment) -> Self {
        self.environment = environment;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn host(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.environment.host())
            .trim_end_matches('/')
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let client_id = non_empty(&lookup, "PLAID_CLIENT_ID")
            .ok_or_else(|| InsightError::Config("PLAID_CLIENT_ID must be set".to_string()))?;
        let secret = non_empty(&lookup, "PLAID_SECRET")
            .ok_or_else(|| InsightError::Config("PLAID_SECRET must be set".to_string()))?;
        let environment = match non_empty(&lookup, "PLAID_ENV") {
            Some(value) => value.parse()?,
            None => PlaidEnvironment::Sandbox,
        };

        Ok(Self::new(client_id, secret).with_environment(environment))
    }
}

fn non_empty<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).filter(|value| !value.trim().is_empty())
}
