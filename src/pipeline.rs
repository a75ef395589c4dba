//! OCR -> normalize -> save -> enhance -> save, strictly in that order.

use crate::analysis::DocumentAnalysisResult;
use crate::enhance::Enhancer;
use crate::error::Result;
use crate::normalize::normalize;
use crate::ocr::{DocumentSource, OcrService};
use crate::report::{Reporter, ENHANCED_TAG, OCR_TAG};
use crate::types::NormalizedInvoice;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Ocr,
    Extraction,
    Enhancement,
    Summary,
}

impl Stage {
    pub fn number(self) -> u8 {
        match self {
            Stage::Ocr => 1,
            Stage::Extraction => 2,
            Stage::Enhancement => 3,
            Stage::Summary => 4,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Stage::Ocr => "Azure OCR Processing",
            Stage::Extraction => "Extracting Structured Data",
            Stage::Enhancement => "AI Enhancement with OpenAI",
            Stage::Summary => "Results Summary",
        }
    }
}

/// Progress notifications; the caller decides how to show them.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    StageStarted(Stage),
    SourceResolved(DocumentSource),
    OcrCompleted,
    Normalized { fields: usize, line_items: usize },
    FileWritten { tag: &'static str, path: PathBuf },
    EnhancementStarted,
    EnhancementCompleted { fields: usize },
    EnhancementFailed(String),
}

#[derive(Debug)]
pub struct RunReport {
    pub analysis: DocumentAnalysisResult,
    pub ocr: NormalizedInvoice,
    pub enhanced: Option<NormalizedInvoice>,
    pub output_dir: PathBuf,
    pub ocr_file: PathBuf,
    pub enhanced_file: Option<PathBuf>,
}

/// Runs one document through the pipeline.
///
/// OCR, shape and write errors end the run. An enhancement error is reported
/// through `on_event` and the run finishes with the OCR result only.
pub fn run(
    source: &DocumentSource,
    reporter: &Reporter,
    ocr: &dyn OcrService,
    enhancer: &dyn Enhancer,
    on_event: &mut dyn FnMut(PipelineEvent),
) -> Result<RunReport> {
    on_event(PipelineEvent::StageStarted(Stage::Ocr));
    on_event(PipelineEvent::SourceResolved(source.clone()));
    let raw = ocr.analyze(source)?;
    on_event(PipelineEvent::OcrCompleted);

    on_event(PipelineEvent::StageStarted(Stage::Extraction));
    let analysis = DocumentAnalysisResult::from_value(raw)?;
    let ocr_invoice = normalize(&analysis);
    info!(
        fields = ocr_invoice.fields.len(),
        line_items = ocr_invoice.line_items.len(),
        "normalized OCR result"
    );
    on_event(PipelineEvent::Normalized {
        fields: ocr_invoice.fields.len(),
        line_items: ocr_invoice.line_items.len(),
    });
    let ocr_file = reporter.write(OCR_TAG, &ocr_invoice)?;
    on_event(PipelineEvent::FileWritten {
        tag: OCR_TAG,
        path: ocr_file.clone(),
    });

    on_event(PipelineEvent::StageStarted(Stage::Enhancement));
    on_event(PipelineEvent::EnhancementStarted);
    let enhanced = enhancer
        .enhance(&ocr_invoice)
        .and_then(|invoice| {
            let path = reporter.write(ENHANCED_TAG, &invoice)?;
            Ok((invoice, path))
        });
    let (enhanced, enhanced_file) = match enhanced {
        Ok((invoice, path)) => {
            on_event(PipelineEvent::EnhancementCompleted {
                fields: invoice.fields.len(),
            });
            on_event(PipelineEvent::FileWritten {
                tag: ENHANCED_TAG,
                path: path.clone(),
            });
            (Some(invoice), Some(path))
        }
        Err(e) => {
            warn!(code = e.code(), error = %e, "enhancement skipped, continuing with OCR data");
            on_event(PipelineEvent::EnhancementFailed(e.to_string()));
            (None, None)
        }
    };

    on_event(PipelineEvent::StageStarted(Stage::Summary));
    Ok(RunReport {
        analysis,
        ocr: ocr_invoice,
        enhanced,
        output_dir: reporter.dir().to_path_buf(),
        ocr_file,
        enhanced_file,
    })
}
