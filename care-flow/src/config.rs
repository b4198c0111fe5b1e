use std::fmt;
use std::time::Duration;

use crate::error::{FlowError, Result};

pub const API_KEY_VAR: &str = "OPENROUTER_API_KEY";
pub const MODEL_VAR: &str = "CARE_FLOW_MODEL";
pub const TIMEOUT_VAR: &str = "CARE_FLOW_TIMEOUT_SECS";

pub const DEFAULT_MODEL: &str = "google/gemini-2.5-flash";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Process-wide settings, built once at startup and passed by reference.
#[derive(Clone)]
pub struct PipelineConfig {
    pub api_key: String,
    pub model: String,
    pub request_timeout: Duration,
}

impl PipelineConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Read settings from the environment, loading `.env` first when present.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_key = lookup(API_KEY_VAR)
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                FlowError::Configuration(format!(
                    "{API_KEY_VAR} not found. Set it as an environment variable or in a .env file"
                ))
            })?;

        let mut config = Self::new(api_key.trim());

        if let Some(model) = lookup(MODEL_VAR).filter(|m| !m.trim().is_empty()) {
            config.model = model.trim().to_string();
        }

        if let Some(secs) = lookup(TIMEOUT_VAR) {
            let secs = secs.trim().parse::<u64>().map_err(|e| {
                FlowError::Configuration(format!("{TIMEOUT_VAR} must be a whole number of seconds: {e}"))
            })?;
            config = config.with_timeout_secs(secs)?;
        }

        Ok(config)
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the per-call timeout in seconds. Zero would fail every call, so it
    /// is rejected.
    pub fn with_timeout_secs(self, secs: u64) -> Result<Self> {
        if secs == 0 {
            return Err(FlowError::Configuration(format!(
                "{TIMEOUT_VAR} must be at least 1 second"
            )));
        }
        Ok(self.with_request_timeout(Duration::from_secs(secs)))
    }
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}
