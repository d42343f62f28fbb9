use anyhow::Result;
use clap::Parser;
use std::path::{Path, PathBuf};

use crate::config::RuntimeConfig;
use crate::output::JsonlWriter;
use crate::pipeline::{index_extract, score_extract};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Input PBF file
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output JSONL file, or '-' for stdout
    #[arg(short, long, default_value = "-")]
    pub output: PathBuf,

    /// Runtime configuration file (YAML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Also classify hiking/cycling networks and bus membership for path ways
    #[arg(long)]
    pub classify_paths: bool,

    /// Number of threads (default: all cores)
    #[arg(short, long)]
    pub threads: Option<usize>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

pub fn run(cli: &Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => RuntimeConfig::load(path)?,
        None => RuntimeConfig::default(),
    };

    let start = std::time::Instant::now();

    let extract = index_extract(&cli.input, &config)?;
    tracing::info!(
        "Candidates: {} stations, {} paths",
        extract.stations.len(),
        extract.paths.len()
    );

    let writer = if cli.output == Path::new("-") {
        tracing::info!("Sink: jsonl -> stdout");
        JsonlWriter::stdout()
    } else {
        tracing::info!("Sink: jsonl -> {:?}", cli.output);
        JsonlWriter::create(&cli.output)?
    };

    let row_count = score_extract(&extract, cli.classify_paths, writer)?;

    let elapsed = start.elapsed();
    tracing::info!(
        "Done! Wrote {} rows in {:.2}s",
        row_count,
        elapsed.as_secs_f64()
    );

    Ok(())
}
