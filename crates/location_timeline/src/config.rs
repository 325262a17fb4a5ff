use std::fs;
use std::path::Path;

use anyhow::{Context, bail};
use record_sources::{BridgeConfig, DatabaseSchema};
use serde::Deserialize;
use stop_detection::{GeoPoint, StopDetectionConfig};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
	pub detection: StopDetectionConfig,
	pub database: DatabaseSchema,
	pub bridge: BridgeConfig,
	pub report: ReportConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReportConfig {
	/// Map centre `[latitude, longitude]` when the timeline has no points.
	pub default_center: [f64; 2],
	pub zoom: u8,
}

impl Default for ReportConfig {
	fn default() -> Self {
		Self { default_center: [37.7749, -122.4194], zoom: 12 }
	}
}

impl ReportConfig {
	pub const fn default_center(&self) -> GeoPoint {
		GeoPoint::new(self.default_center[0], self.default_center[1])
	}
}

impl Config {
	pub fn load(path: &Path) -> anyhow::Result<Self> {
		let content =
			fs::read_to_string(path).with_context(|| format!("Failed to read config file: {}", path.display()))?;

		let config: Self = toml::from_str(&content).context("Failed to parse config file")?;
		config.validate()?;

		Ok(config)
	}

	pub fn validate(&self) -> anyhow::Result<()> {
		self.database.validate()?;

		if self.bridge.timeout_secs == 0 {
			bail!("bridge.timeout_secs must be greater than zero");
		}

		if self.bridge.remote_paths.is_empty() {
			bail!("bridge.remote_paths must list at least one device path");
		}

		if !self.report.default_center().is_valid() {
			bail!("report.default_center {:?} is not a valid [latitude, longitude]", self.report.default_center);
		}

		if !(1..=19).contains(&self.report.zoom) {
			bail!("report.zoom must be between 1 and 19, got {}", self.report.zoom);
		}

		Ok(())
	}
}
