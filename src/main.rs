use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use vcode_finder::{AnalysisConfig, AudioFormat, VoiceAnalyzer};

#[derive(Parser)]
#[command(
    name = "vcode-finder",
    about = "Find out which season your voice belongs to"
)]
struct Cli {
    /// Voice recording to analyze (mp3, wav or m4a)
    file: PathBuf,

    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Format hint overriding the file extension
    #[arg(short, long)]
    format: Option<String>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AnalysisConfig::load_from_file(path)
            .with_context(|| format!("failed to load config from {:?}", path))?,
        None => AnalysisConfig::default(),
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let hint = match &cli.format {
        Some(format) => format.clone(),
        None => cli
            .file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default(),
    };

    if AudioFormat::from_hint(&hint).is_none() {
        let accepted: Vec<&str> = AudioFormat::ALL.iter().map(|f| f.extension()).collect();
        tracing::warn!(
            "{:?} is not one of the accepted formats ({})",
            hint,
            accepted.join(", ")
        );
    }

    let bytes = std::fs::read(&cli.file)
        .with_context(|| format!("failed to read {:?}", cli.file))?;

    let analyzer = VoiceAnalyzer::new(config);
    let report = analyzer
        .classify(bytes, &hint)
        .with_context(|| format!("failed to analyze {:?}", cli.file))?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report.to_json())?);
    } else {
        println!("---");
        println!("{}", report.title());
        println!("{}", report.description());
        println!("---");
        println!("{}", report.recommendation());
        println!("{}", report.metrics_caption());
    }

    Ok(())
}
