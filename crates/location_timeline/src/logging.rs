use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Context;
use chrono::Utc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

pub const ACTION_LOG_FILE: &str = "action_log.txt";

/// Installs console logging plus a plain-text copy of every event in `output_dir`.
pub fn init(output_dir: &Path) -> anyhow::Result<PathBuf> {
	let path = output_dir.join(ACTION_LOG_FILE);
	let mut file = File::create(&path).with_context(|| format!("Failed to create {}", path.display()))?;
	write_header(&mut file)?;

	tracing_subscriber::registry()
		.with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
		.with(fmt::layer())
		.with(fmt::layer().with_ansi(false).with_target(false).with_writer(Mutex::new(file)))
		.try_init()
		.context("Failed to install tracing subscriber")?;

	Ok(path)
}

/// Shell-style rendering of `args` for the log, quoting arguments that contain whitespace.
pub fn command_line(args: impl IntoIterator<Item = String>) -> String {
	args.into_iter()
		.map(|arg| if arg.is_empty() || arg.contains(char::is_whitespace) { format!("'{arg}'") } else { arg })
		.collect::<Vec<_>>()
		.join(" ")
}

fn write_header(out: &mut impl Write) -> anyhow::Result<()> {
	let rule = "=".repeat(70);
	writeln!(out, "Location Timeline Extractor - Action Log")?;
	writeln!(out, "{rule}")?;
	writeln!(out, "Started at: {}", Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true))?;
	writeln!(out, "{rule}")?;
	writeln!(out)?;
	Ok(())
}
