use std::path::PathBuf;

use thiserror::Error;

/// Bad command-line input, caught before any service is contacted.
#[derive(Debug, Error)]
pub enum UsageError {
    #[error("please provide either --url or --file, not both")]
    ConflictingSources,
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Usage(#[from] UsageError),
    #[error("{0} not set in .env")]
    Config(&'static str),
    #[error("OCR failed: {0}")]
    OcrService(String),
    #[error("malformed analysis result: {0}")]
    MalformedResult(String),
    #[error("enhancement failed: {0}")]
    EnhancementService(String),
    #[error("could not write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not serialize invoice: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("could not write to console: {0}")]
    Console(#[source] std::io::Error),
}

impl Error {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Usage(_) => "usage_error",
            Self::Config(_) => "config_error",
            Self::OcrService(_) => "ocr_service_error",
            Self::MalformedResult(_) => "malformed_result",
            Self::EnhancementService(_) => "enhancement_service_error",
            Self::Io { .. } => "io_error",
            Self::Serialize(_) => "serialize_error",
            Self::Console(_) => "console_error",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_follow_variants() {
        assert_eq!(Error::from(UsageError::ConflictingSources).code(), "usage_error");
        assert_eq!(Error::MalformedResult("x".into()).code(), "malformed_result");
        assert_eq!(Error::Config("AZURE_OCR_KEY").code(), "config_error");
    }

    #[test]
    fn usage_errors_print_without_prefix() {
        assert_eq!(
            Error::from(UsageError::ConflictingSources).to_string(),
            "please provide either --url or --file, not both"
        );
        assert_eq!(
            Error::OcrService("HTTP 401".into()).to_string(),
            "OCR failed: HTTP 401"
        );
    }

    #[test]
    fn config_message_names_the_variable() {
        assert_eq!(
            Error::Config("AZURE_OCR_ENDPOINT").to_string(),
            "AZURE_OCR_ENDPOINT not set in .env"
        );
    }
}
