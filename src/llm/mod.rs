pub mod chat;

use crate::errors::ConfigError;
use std::fmt;
use url::Url;

#[derive(Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub completion_model: String,
    pub base_url: Url,
}

impl LlmConfig {
    pub fn new(api_key: &str, model: &str, base_url: &str) -> Result<Self, ConfigError> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        let base_url = Url::parse(base_url.trim()).map_err(|source| ConfigError::InvalidBaseUrl {
            url: base_url.to_string(),
            source,
        })?;
        Ok(Self {
            api_key: api_key.to_string(),
            completion_model: model.trim().to_string(),
            base_url,
        })
    }
}

impl fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmConfig")
            .field("api_key", &"<redacted>")
            .field("completion_model", &self.completion_model)
            .field("base_url", &self.base_url.as_str())
            .finish()
    }
}
