//! Invoice processing pipeline: Azure Document Intelligence OCR, field
//! normalization, OpenAI enhancement and timestamped JSON output.

pub mod analysis;
pub mod cli;
pub mod config;
pub mod enhance;
pub mod error;
pub mod normalize;
pub mod ocr;
pub mod pipeline;
pub mod report;
pub mod types;

pub use analysis::{DocumentAnalysisResult, DocumentField, FieldValue};
pub use enhance::{Enhancer, OpenAiEnhancer};
pub use error::{Error, Result, UsageError};
pub use normalize::{normalize, normalize_value};
pub use ocr::{AzureOcrClient, DocumentSource, OcrService};
pub use pipeline::{PipelineEvent, RunReport, Stage};
pub use types::{FieldKey, LineItem, NormalizedField, NormalizedInvoice};
