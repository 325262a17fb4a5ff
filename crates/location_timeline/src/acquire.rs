use anyhow::{Context, bail};
use record_sources::{AdbBridge, DeviceChoice, RecordSource, SourceTarget, choose_device, create_source, resolve_selection};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use crate::cli::Cli;
use crate::config::Config;

/// Resolves the record source from the command line: a database file, or a connected device.
pub async fn select_source(cli: &Cli, config: &Config) -> anyhow::Result<Box<dyn RecordSource>> {
	if let Some(path) = &cli.db_path {
		return Ok(create_source(SourceTarget::File(path.clone())));
	}

	let bridge = AdbBridge::new(config.bridge.clone());
	let connected = bridge.devices().await.context("Failed to list ADB devices")?;

	let serial = match choose_device(&connected, cli.device_id.as_deref())? {
		DeviceChoice::Selected(serial) => serial,
		DeviceChoice::Ambiguous(candidates) => prompt_for_device(&candidates).await?,
	};
	info!(device = %serial, "Selected device");

	Ok(create_source(SourceTarget::Device { serial, bridge: config.bridge.clone() }))
}

async fn prompt_for_device(candidates: &[String]) -> anyhow::Result<String> {
	println!("Multiple devices connected:");
	for (index, id) in candidates.iter().enumerate() {
		println!("  {}. {id}", index + 1);
	}

	let mut stdin = BufReader::new(tokio::io::stdin());
	loop {
		println!("Select a device by number or id:");

		let mut line = String::new();
		if stdin.read_line(&mut line).await.context("Failed to read device selection")? == 0 {
			bail!("No device selected; pass --device-id");
		}

		match resolve_selection(&line, candidates) {
			Some(serial) => return Ok(serial),
			None => println!("'{}' is not one of the listed devices", line.trim()),
		}
	}
}
