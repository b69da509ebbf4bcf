// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Fieldscan: Invoice field extraction from OCR output
//
// Entry point. Initialises logging, loads configuration, and dispatches the
// `extract` and `scan` subcommands. Logs go to stderr; results go to stdout
// or the `--output` file.

mod services;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::{error, info};

use fieldscan_core::config::AppConfig;
use fieldscan_core::error::{FieldscanError, Result};
use fieldscan_core::types::ExtractedField;
use fieldscan_extract::{
    ExtractionReport, FieldExtractor, OcrEngine, OcrPage, ReplayEngine, to_csv, to_json,
};
use fieldscan_render::BlankSurface;

use services::session::ScanSession;

#[derive(Parser, Debug)]
#[command(name = "fieldscan")]
#[command(version, about = "Extract invoice fields from OCR output", long_about = None)]
struct Cli {
    /// JSON configuration file (defaults apply when omitted)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Extract fields from one recorded OCR dump
    Extract {
        /// OCR dump (JSON with optional `words`, `lines`, `paragraphs`)
        dump: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Json)]
        format: Format,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Scan recorded OCR dumps as pages of one document, through the render queue
    Scan {
        /// One OCR dump per page, in page order
        #[arg(required = true)]
        dumps: Vec<PathBuf>,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
enum Format {
    Json,
    Csv,
}

/// One scanned page in `scan` output.
#[derive(Debug, Serialize)]
struct PageReport {
    page: u32,
    source: String,
    #[serde(flatten)]
    report: ExtractionReport,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "fieldscan failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Extract {
            dump,
            format,
            output,
        } => {
            let fields = extract_dump(&dump, &config)?;
            emit(&render_fields(&fields, format)?, output.as_deref())
        }
        Commands::Scan { dumps, output } => {
            let reports = scan_dumps(&dumps, &config).await?;
            emit(&serde_json::to_string_pretty(&reports)?, output.as_deref())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    match path {
        Some(path) => {
            let config = AppConfig::load(path)?;
            info!(path = %path.display(), "configuration loaded");
            Ok(config)
        }
        None => Ok(AppConfig::default()),
    }
}

fn extract_dump(dump: &Path, config: &AppConfig) -> Result<Vec<ExtractedField>> {
    let page = OcrPage::from_json(&std::fs::read_to_string(dump)?)?;
    let extractor = FieldExtractor::new(config.extraction.clone())?;
    Ok(extractor.extract(&page))
}

fn render_fields(fields: &[ExtractedField], format: Format) -> Result<String> {
    match format {
        Format::Json => to_json(fields),
        Format::Csv => Ok(to_csv(fields)),
    }
}

/// Run every dump through one scan session; dump `i` is page `i + 1`.
async fn scan_dumps(dumps: &[PathBuf], config: &AppConfig) -> Result<Vec<PageReport>> {
    let page_count = u32::try_from(dumps.len())
        .map_err(|_| FieldscanError::Config(format!("too many pages: {}", dumps.len())))?;
    let session = ScanSession::open(BlankSurface::letter(page_count), config)?;

    let mut reports = Vec::with_capacity(dumps.len());
    for (page, dump) in (1..).zip(dumps) {
        let engine: Arc<dyn OcrEngine> = Arc::new(ReplayEngine::from_file(dump)?);
        let report = session.scan_page(page, engine).await?;
        reports.push(PageReport {
            page,
            source: dump.display().to_string(),
            report,
        });
    }

    session.close().await?;
    Ok(reports)
}

fn emit(payload: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, payload)?;
            info!(path = %path.display(), bytes = payload.len(), "output written");
        }
        None => println!("{payload}"),
    }
    Ok(())
}
