use crate::enhance::Enhancer;
use crate::error::{Error, Result};
use crate::ocr::{DocumentSource, OcrService};
use crate::pipeline::{self, PipelineEvent, RunReport, Stage};
use crate::report::{AnalysisDetails, Reporter, RunStamp, Summary, DOUBLE_RULE, OCR_TAG, RULE};
use clap::Parser;
use std::io::{self, Write};
use std::path::PathBuf;

const EXAMPLES: &str = "Examples:
  invoice-pipeline
  invoice-pipeline --url https://example.com/invoice.pdf
  invoice-pipeline --file ./invoices/invoice_001.pdf
  invoice-pipeline --file invoice.jpg --verbose
  invoice-pipeline --url https://example.com/invoice.pdf --output results";

#[derive(Debug, Parser)]
#[command(
    name = "invoice-pipeline",
    version,
    about = "Invoice Processing Pipeline with Azure OCR and OpenAI",
    after_help = EXAMPLES
)]
pub struct Cli {
    /// URL of the invoice document to process.
    #[arg(long)]
    pub url: Option<String>,

    /// Path to local invoice document.
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Output directory for results.
    #[arg(long, default_value = "output")]
    pub output: PathBuf,

    /// Print detailed OCR output.
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn source(&self) -> Result<DocumentSource> {
        DocumentSource::resolve(self.url.as_deref(), self.file.as_deref())
    }
}

fn render_event(out: &mut dyn Write, event: &PipelineEvent) -> io::Result<()> {
    match event {
        PipelineEvent::StageStarted(Stage::Summary) => writeln!(
            out,
            "\nStep {}: {}\n{DOUBLE_RULE}",
            Stage::Summary.number(),
            Stage::Summary.title()
        ),
        PipelineEvent::StageStarted(stage) => {
            writeln!(out, "\nStep {}: {}\n{RULE}", stage.number(), stage.title())
        }
        PipelineEvent::SourceResolved(source) if source.is_sample() => {
            writeln!(out, "No document provided, using sample invoice")
        }
        PipelineEvent::SourceResolved(source) => writeln!(out, "Processing {source}"),
        PipelineEvent::OcrCompleted => writeln!(out, "OCR completed successfully"),
        PipelineEvent::Normalized { fields, line_items } => writeln!(
            out,
            "Data extraction completed ({fields} fields, {line_items} line items)"
        ),
        PipelineEvent::FileWritten { tag, path } => {
            let what = if *tag == OCR_TAG { "OCR data" } else { "enhanced data" };
            writeln!(out, "Saved {what} to: {}", path.display())
        }
        PipelineEvent::EnhancementStarted => {
            writeln!(out, "Sending data to OpenAI for enhancement...")
        }
        PipelineEvent::EnhancementCompleted { .. } => writeln!(out, "AI enhancement completed"),
        PipelineEvent::EnhancementFailed(message) => writeln!(
            out,
            "OpenAI enhancement failed: {message}\nContinuing with OCR data only..."
        ),
    }
}

/// Resolves the source, runs the pipeline and prints the summary.
pub fn run(
    cli: &Cli,
    ocr: &dyn OcrService,
    enhancer: &dyn Enhancer,
    out: &mut dyn Write,
) -> Result<RunReport> {
    let source = cli.source()?;
    writeln!(out, "\n{DOUBLE_RULE}\nINVOICE PROCESSING PIPELINE\n{DOUBLE_RULE}")
        .map_err(Error::Console)?;
    let reporter = Reporter::create(&cli.output, RunStamp::now())?;

    // The pipeline keeps going on a console failure; the first one is reported afterwards.
    let mut console_error: Option<io::Error> = None;
    let report = pipeline::run(&source, &reporter, ocr, enhancer, &mut |event: PipelineEvent| {
        tracing::debug!(?event, "pipeline event");
        if console_error.is_none() {
            console_error = render_event(out, &event).err();
        }
    })?;
    if let Some(e) = console_error {
        return Err(Error::Console(e));
    }

    if cli.verbose {
        writeln!(out, "\nDetailed OCR Output:\n{}", AnalysisDetails(&report.analysis))
            .map_err(Error::Console)?;
    }
    writeln!(out, "\n{}\n", Summary(&report)).map_err(Error::Console)?;
    Ok(report)
}

/// Process exit code for one invocation: 0 on success (with or without enhancement), 1 otherwise.
pub fn execute(
    cli: &Cli,
    ocr: &dyn OcrService,
    enhancer: &dyn Enhancer,
    out: &mut dyn Write,
) -> u8 {
    match run(cli, ocr, enhancer, out) {
        Ok(_) => 0,
        Err(Error::Usage(e)) => {
            tracing::error!(code = "usage_error", "{e}");
            if let Err(write_error) = writeln!(out, "Error: {e}") {
                tracing::warn!(error = %write_error, "could not print usage error");
            }
            1
        }
        Err(e) => {
            tracing::error!(code = e.code(), "{e}");
            if let Err(write_error) = writeln!(out, "\nFatal error: {:?}", anyhow::Error::from(e)) {
                tracing::warn!(error = %write_error, "could not print fatal error");
            }
            1
        }
    }
}

/// Message and exit code for a run cut short by Ctrl-C.
pub fn interrupted(out: &mut dyn Write) -> u8 {
    tracing::warn!("interrupted by user");
    if let Err(e) = writeln!(out, "\n\nProcess interrupted by user") {
        tracing::warn!(error = %e, "could not print interrupt notice");
    }
    1
}
