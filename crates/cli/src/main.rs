use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tokio::task::JoinSet;
use tracing_subscriber::EnvFilter;

use provena_calibration::{CalibrationSettings, Calibrator};
use provena_core::Money;
use provena_extract::{DocumentAnalysis, DocumentHints, DocumentPipeline};
use provena_reconcile::SemanticHint;

#[derive(Parser, Debug)]
#[command(name = "provena", version, about = "Extract and reconcile receipt fields from OCR text")]
struct Cli {
    /// TOML file with a `[calibration]` table.
    #[arg(long, env = "PROVENA_CONFIG")]
    config: Option<PathBuf>,
    /// Total proposed by a semantic reader.
    #[arg(long, value_parser = parse_money)]
    semantic_total: Option<Money>,
    #[arg(long, requires = "semantic_total", default_value_t = 0.0)]
    semantic_confidence: f32,
    /// OCR quality in [0, 1].
    #[arg(long)]
    ocr_confidence: Option<f32>,
    #[arg(long)]
    pretty: bool,
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

fn parse_money(raw: &str) -> Result<Money, String> {
    Money::parse(raw).ok_or_else(|| format!("not an amount: '{raw}'"))
}

impl Cli {
    fn hints(&self) -> DocumentHints {
        DocumentHints {
            semantic: self
                .semantic_total
                .map(|t| SemanticHint::new(Some(t), self.semantic_confidence)),
            ocr_confidence: self.ocr_confidence,
            ..Default::default()
        }
    }

    fn pipeline(&self) -> Result<DocumentPipeline> {
        match &self.config {
            Some(path) => DocumentPipeline::from_config_file(path)
                .with_context(|| format!("loading {}", path.display())),
            None => {
                let settings = CalibrationSettings::default().with_env_overrides()?;
                Ok(DocumentPipeline::new(Calibrator::new(settings)))
            }
        }
    }
}

fn render(analysis: &DocumentAnalysis, pretty: bool) -> Result<String> {
    let map = analysis.to_map()?;
    Ok(if pretty {
        serde_json::to_string_pretty(&map)?
    } else {
        serde_json::to_string(&map)?
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let pipeline = cli.pipeline()?;
    let hints = cli.hints();

    let mut tasks = JoinSet::new();
    for (index, path) in cli.files.iter().cloned().enumerate() {
        let pipeline = pipeline.clone();
        let hints = hints.clone();
        tasks.spawn(async move {
            let result = pipeline.process_file(&path, &hints).await;
            (index, path, result)
        });
    }

    let mut outputs = Vec::with_capacity(cli.files.len());
    while let Some(joined) = tasks.join_next().await {
        outputs.push(joined.context("document task panicked")?);
    }
    outputs.sort_by_key(|(index, _, _)| *index);

    let mut failed = 0usize;
    for (_, path, result) in outputs {
        match result {
            Ok(analysis) => println!("{}", render(&analysis, cli.pretty)?),
            Err(e) => {
                tracing::error!(path = %path.display(), "{e}");
                failed += 1;
            }
        }
    }

    if failed > 0 {
        bail!("{failed} of {} documents failed", cli.files.len());
    }
    Ok(())
}
