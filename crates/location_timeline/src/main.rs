use std::fs;

use anyhow::Context;
use clap::Parser;
use stop_detection::{StopDetector, assemble};
use tracing::{error, info, warn};

use crate::{cli::Cli, config::Config};

mod acquire;
mod cli;
mod config;
mod logging;
mod report;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let cli = Cli::parse();

	fs::create_dir_all(&cli.output_dir)
		.with_context(|| format!("Failed to create output directory {}", cli.output_dir.display()))?;
	let action_log = logging::init(&cli.output_dir)?;

	info!("✅ Starting location timeline extraction");
	let output_dir = cli.output_dir.canonicalize().unwrap_or_else(|_| cli.output_dir.clone());
	info!(
		command = %logging::command_line(std::env::args()),
		output_dir = %output_dir.display(),
		"Invocation recorded"
	);

	let result = run(&cli).await;
	if let Err(error) = &result {
		error!("❌ {error:#}");
	}
	info!(action_log = %action_log.display(), "Action log completed");

	result
}

async fn run(cli: &Cli) -> anyhow::Result<()> {
	let config = match &cli.config {
		Some(path) => Config::load(path).context("Failed to load configuration")?,
		None => Config::default(),
	};
	info!("✅ Configuration loaded");

	let source = acquire::select_source(cli, &config).await?;
	info!(source = source.name(), from = %source.describe(), "Loading location records");

	let extraction = source.load(&cli.output_dir, &config.database).await.context("Extraction failed")?;
	info!(
		samples = extraction.samples.len(),
		dropped_invalid = extraction.dropped_invalid,
		skipped_incomplete = extraction.skipped_incomplete,
		"✅ Location records extracted"
	);
	if extraction.samples.is_empty() {
		warn!("No location samples in range; writing empty reports");
	}

	let stops = StopDetector::new(config.detection).detect(&extraction.samples);
	let timeline = assemble(&extraction.samples, &stops);
	info!(stops = stops.len(), transits = timeline.transits().count(), "✅ Timeline assembled");

	let artifacts = report::generate_all(&timeline, &cli.output_dir, &config.report, &extraction.database)?;
	info!(
		timeline = %artifacts.timeline_csv.display(),
		map = %artifacts.map_html.display(),
		hashes = %artifacts.hashes_csv.display(),
		"✅ Reports written"
	);

	Ok(())
}
