use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_MAX_STOP_RADIUS_METERS: f64 = 50.0;
pub const DEFAULT_MIN_STOP_DURATION_SECONDS: f64 = 300.0;
pub const DEFAULT_MAX_SAMPLE_GAP_SECONDS: f64 = 1800.0;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
	#[error("{name} must be a positive finite number, got {value}")]
	NotPositive { name: &'static str, value: f64 },
}

/// Thresholds for stop detection.
///
/// Only constructible through [`StopDetectionConfig::new`] (or deserialisation, which goes
/// through it), so a value of this type always holds positive finite thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(try_from = "RawStopDetectionConfig")]
pub struct StopDetectionConfig {
	max_stop_radius_meters: f64,
	min_stop_duration_seconds: f64,
	max_sample_gap_seconds: f64,
}

impl StopDetectionConfig {
	pub fn new(
		max_stop_radius_meters: f64,
		min_stop_duration_seconds: f64,
		max_sample_gap_seconds: f64,
	) -> Result<Self, ConfigError> {
		Ok(Self {
			max_stop_radius_meters: positive("max_stop_radius_meters", max_stop_radius_meters)?,
			min_stop_duration_seconds: positive("min_stop_duration_seconds", min_stop_duration_seconds)?,
			max_sample_gap_seconds: positive("max_sample_gap_seconds", max_sample_gap_seconds)?,
		})
	}

	#[must_use]
	pub const fn max_stop_radius_meters(&self) -> f64 {
		self.max_stop_radius_meters
	}

	#[must_use]
	pub const fn min_stop_duration_seconds(&self) -> f64 {
		self.min_stop_duration_seconds
	}

	#[must_use]
	pub const fn max_sample_gap_seconds(&self) -> f64 {
		self.max_sample_gap_seconds
	}
}

impl Default for StopDetectionConfig {
	fn default() -> Self {
		Self {
			max_stop_radius_meters: DEFAULT_MAX_STOP_RADIUS_METERS,
			min_stop_duration_seconds: DEFAULT_MIN_STOP_DURATION_SECONDS,
			max_sample_gap_seconds: DEFAULT_MAX_SAMPLE_GAP_SECONDS,
		}
	}
}

fn positive(name: &'static str, value: f64) -> Result<f64, ConfigError> {
	if value.is_finite() && value > 0.0 { Ok(value) } else { Err(ConfigError::NotPositive { name, value }) }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawStopDetectionConfig {
	max_stop_radius_meters: f64,
	min_stop_duration_seconds: f64,
	max_sample_gap_seconds: f64,
}

impl Default for RawStopDetectionConfig {
	fn default() -> Self {
		Self {
			max_stop_radius_meters: DEFAULT_MAX_STOP_RADIUS_METERS,
			min_stop_duration_seconds: DEFAULT_MIN_STOP_DURATION_SECONDS,
			max_sample_gap_seconds: DEFAULT_MAX_SAMPLE_GAP_SECONDS,
		}
	}
}

impl TryFrom<RawStopDetectionConfig> for StopDetectionConfig {
	type Error = ConfigError;

	fn try_from(raw: RawStopDetectionConfig) -> Result<Self, Self::Error> {
		Self::new(raw.max_stop_radius_meters, raw.min_stop_duration_seconds, raw.max_sample_gap_seconds)
	}
}
