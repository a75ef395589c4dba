use crate::error::{Error, Result};
use std::time::Duration;

pub const DEFAULT_AZURE_API_VERSION: &str = "2024-11-30";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Loads `.env` from the working directory, if present. Real environment variables win.
pub fn load_env() {
    let _ = dotenvy::dotenv();
}

fn required(name: &'static str) -> Result<String> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(Error::Config(name)),
    }
}

fn optional(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

#[derive(Debug, Clone)]
pub struct AzureConfig {
    pub endpoint: String,
    pub key: String,
    pub api_version: String,
}

impl AzureConfig {
    pub fn from_env() -> Result<Self> {
        load_env();
        let endpoint = required("AZURE_OCR_ENDPOINT")?;
        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            key: required("AZURE_OCR_KEY")?,
            api_version: optional("AZURE_OCR_API_VERSION", DEFAULT_AZURE_API_VERSION),
        })
    }

    pub fn analyze_url(&self) -> String {
        format!(
            "{}/documentintelligence/documentModels/prebuilt-invoice:analyze?api-version={}",
            self.endpoint, self.api_version
        )
    }
}

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

impl OpenAiConfig {
    pub fn from_env() -> Result<Self> {
        load_env();
        Ok(Self {
            api_key: required("OPENAI_API_KEY")?,
            model: optional("OPENAI_MODEL", DEFAULT_OPENAI_MODEL),
            base_url: optional("OPENAI_BASE_URL", DEFAULT_OPENAI_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
        })
    }

    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

/// HTTP timeout and long-running-operation polling for the OCR call.
#[derive(Debug, Clone, Copy)]
pub struct HttpSettings {
    pub timeout: Duration,
    pub poll_interval: Duration,
    pub max_polls: u32,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(120),
            poll_interval: Duration::from_secs(2),
            max_polls: 60,
        }
    }
}
