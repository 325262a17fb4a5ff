use std::path::PathBuf;

use clap::Parser;

/// Builds a stop/transit timeline from an Android location database.
#[derive(Debug, Parser)]
#[command(name = "location_timeline", version, about)]
pub struct Cli {
	/// Directory receiving the timeline, map, hash manifest and action log
	#[arg(long)]
	pub output_dir: PathBuf,

	/// Read this database file instead of pulling one from a device
	#[arg(long)]
	pub db_path: Option<PathBuf>,

	/// ADB serial of the device to pull from
	#[arg(long, conflicts_with = "db_path")]
	pub device_id: Option<String>,

	/// TOML configuration file
	#[arg(long)]
	pub config: Option<PathBuf>,
}
