use std::io;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use invoice_pipeline::cli::{execute, interrupted, Cli};
use invoice_pipeline::config::HttpSettings;
use invoice_pipeline::{AzureOcrClient, OpenAiEnhancer};
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "invoice_pipeline=debug"
    } else {
        "invoice_pipeline=warn"
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .without_time()
        .init();
}

fn build_services(settings: HttpSettings) -> anyhow::Result<(AzureOcrClient, OpenAiEnhancer)> {
    let ocr = AzureOcrClient::new(settings).context("failed to build OCR client")?;
    let enhancer = OpenAiEnhancer::new(settings).context("failed to build enhancement client")?;
    Ok((ocr, enhancer))
}

/// Ctrl-C ends the run at once with exit code 1; files already written stay.
fn install_interrupt_handler() -> anyhow::Result<()> {
    ctrlc::set_handler(|| {
        let code = interrupted(&mut io::stdout());
        std::process::exit(i32::from(code));
    })
    .context("failed to install Ctrl-C handler")
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(error) => {
            // --help and --version are not failures.
            let code = u8::from(error.use_stderr());
            let _ = error.print();
            return ExitCode::from(code);
        }
    };
    init_tracing(cli.verbose);
    if let Err(error) = install_interrupt_handler() {
        tracing::warn!("{error:#}");
    }

    match build_services(HttpSettings::default()) {
        Ok((ocr, enhancer)) => ExitCode::from(execute(&cli, &ocr, &enhancer, &mut io::stdout())),
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::from(1)
        }
    }
}
