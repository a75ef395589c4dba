use crate::config::{AzureConfig, HttpSettings};
use crate::error::{Error, Result, UsageError};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Used when neither `--url` nor `--file` is given.
pub const SAMPLE_INVOICE_URL: &str = "https://raw.githubusercontent.com/Azure-Samples/cognitive-services-REST-api-samples/master/curl/form-recognizer/invoice_sample.jpg";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentSource {
    Url(String),
    File(PathBuf),
}

impl DocumentSource {
    /// At most one of `url` / `file`; a file must exist. Neither means the sample invoice.
    pub fn resolve(url: Option<&str>, file: Option<&Path>) -> Result<Self> {
        match (url, file) {
            (Some(_), Some(_)) => Err(UsageError::ConflictingSources.into()),
            (Some(url), None) => Ok(Self::Url(url.to_string())),
            (None, Some(path)) if path.exists() => Ok(Self::File(path.to_path_buf())),
            (None, Some(path)) => Err(UsageError::FileNotFound(path.to_path_buf()).into()),
            (None, None) => Ok(Self::Url(SAMPLE_INVOICE_URL.to_string())),
        }
    }

    pub fn is_sample(&self) -> bool {
        matches!(self, Self::Url(url) if url == SAMPLE_INVOICE_URL)
    }
}

impl fmt::Display for DocumentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url(url) => write!(f, "URL: {url}"),
            Self::File(path) => write!(f, "file: {}", path.display()),
        }
    }
}

/// Document analysis service. Returns the provider's raw `analyzeResult` payload.
pub trait OcrService {
    fn analyze(&self, source: &DocumentSource) -> Result<serde_json::Value>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    url_source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    base64_source: Option<String>,
}

impl AnalyzeRequest {
    fn for_source(source: &DocumentSource) -> Result<Self> {
        match source {
            DocumentSource::Url(url) => Ok(Self {
                url_source: Some(url.clone()),
                base64_source: None,
            }),
            DocumentSource::File(path) => {
                let bytes = fs::read(path).map_err(|e| {
                    Error::OcrService(if e.kind() == std::io::ErrorKind::NotFound {
                        "File not found.".to_string()
                    } else {
                        format!("Could not read file: {}", e)
                    })
                })?;
                Ok(Self {
                    url_source: None,
                    base64_source: Some(BASE64.encode(&bytes)),
                })
            }
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeOperation {
    #[serde(default)]
    status: String,
    analyze_result: Option<serde_json::Value>,
    error: Option<ServiceError>,
}

#[derive(Debug, Deserialize)]
struct ServiceError {
    code: Option<String>,
    message: Option<String>,
}

#[derive(Debug)]
enum PollOutcome {
    Pending,
    Succeeded(serde_json::Value),
}

fn interpret(operation: AnalyzeOperation) -> Result<PollOutcome> {
    match operation.status.as_str() {
        "succeeded" => operation
            .analyze_result
            .map(PollOutcome::Succeeded)
            .ok_or_else(|| Error::OcrService("No analyzeResult".to_string())),
        "failed" => {
            let (code, message) = operation
                .error
                .map(|e| (e.code, e.message))
                .unwrap_or((None, None));
            let message = message.unwrap_or_else(|| "Unknown error".to_string());
            Err(Error::OcrService(match code {
                Some(code) => format!("analysis failed ({code}): {message}"),
                None => format!("analysis failed: {message}"),
            }))
        }
        _ => Ok(PollOutcome::Pending),
    }
}

fn network_error(e: reqwest::Error) -> Error {
    Error::OcrService(
        if e.is_connect() || e.is_timeout() {
            "Check your internet connection and try again.".to_string()
        } else {
            format!("Network error: {e}")
        },
    )
}

/// Azure Document Intelligence `prebuilt-invoice` client.
pub struct AzureOcrClient {
    client: Client,
    settings: HttpSettings,
}

impl AzureOcrClient {
    pub fn new(settings: HttpSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| Error::OcrService(e.to_string()))?;
        Ok(Self { client, settings })
    }
}

impl OcrService for AzureOcrClient {
    fn analyze(&self, source: &DocumentSource) -> Result<serde_json::Value> {
        let config = AzureConfig::from_env()?;
        let request = AnalyzeRequest::for_source(source)?;
        info!(%source, "submitting document to prebuilt-invoice");

        let response = self
            .client
            .post(config.analyze_url())
            .header("Ocp-Apim-Subscription-Key", &config.key)
            .json(&request)
            .send()
            .map_err(network_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(Error::OcrService(format!(
                "request rejected ({}): {}",
                status,
                if body.is_empty() {
                    "Invalid key or endpoint?"
                } else {
                    body.as_str()
                }
            )));
        }

        let operation_url = response
            .headers()
            .get("Operation-Location")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| Error::OcrService("No Operation-Location in response".to_string()))?
            .to_string();

        for attempt in 1..=self.settings.max_polls {
            std::thread::sleep(self.settings.poll_interval);
            let operation: AnalyzeOperation = self
                .client
                .get(&operation_url)
                .header("Ocp-Apim-Subscription-Key", &config.key)
                .send()
                .map_err(network_error)?
                .json()
                .map_err(|e| Error::OcrService(format!("Invalid JSON: {}", e)))?;
            debug!(attempt, status = %operation.status, "polled analyze operation");
            if let PollOutcome::Succeeded(result) = interpret(operation)? {
                return Ok(result);
            }
        }
        Err(Error::OcrService("OCR timed out. Try again.".to_string()))
    }
}
