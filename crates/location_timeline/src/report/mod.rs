//! Report artifacts written to the output directory.

mod csv;
mod hashes;
mod map;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use stop_detection::Timeline;
use tracing::info;

use crate::config::ReportConfig;

pub const TIMELINE_FILE: &str = "timeline.csv";
pub const MAP_FILE: &str = "map.html";
pub const HASHES_FILE: &str = "hashes.csv";

#[derive(Debug, Clone)]
pub struct ReportArtifacts {
	pub timeline_csv: PathBuf,
	pub map_html: PathBuf,
	pub hashes_csv: PathBuf,
}

/// Writes the timeline, the map and a hash manifest covering both plus `database`.
pub fn generate_all(
	timeline: &Timeline,
	output_dir: &Path,
	report: &ReportConfig,
	database: &Path,
) -> anyhow::Result<ReportArtifacts> {
	info!(output_dir = %output_dir.display(), "Generating reports");

	let timeline_csv = output_dir.join(TIMELINE_FILE);
	write(&timeline_csv, &csv::render(timeline))?;
	info!(entries = timeline.len(), "Generated {TIMELINE_FILE}");

	let map_html = output_dir.join(MAP_FILE);
	write(&map_html, &map::render(timeline, report)?)?;
	info!(stops = timeline.stops().count(), "Generated {MAP_FILE}");

	let hashes_csv = output_dir.join(HASHES_FILE);
	let manifest = hashes::render(&[timeline_csv.as_path(), map_html.as_path(), database])?;
	write(&hashes_csv, &manifest)?;
	info!("Generated {HASHES_FILE}");

	Ok(ReportArtifacts { timeline_csv, map_html, hashes_csv })
}

fn write(path: &Path, content: &str) -> anyhow::Result<()> {
	fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}

/// Quotes a CSV field when it contains a delimiter, quote or line break.
fn escape_field(field: &str) -> String {
	if field.contains([',', '"', '\n', '\r']) {
		format!("\"{}\"", field.replace('"', "\"\""))
	} else {
		field.to_string()
	}
}
