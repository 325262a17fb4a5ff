//! Stop detection over location history.
//!
//! [`detect`] turns a sequence of [`LocationSample`]s into [`StopInterval`]s; [`assemble`]
//! fills the spans between them with [`TransitSegment`]s to form a gap-free [`Timeline`].
//! Both are pure functions over their inputs.

mod config;
mod detector;
pub mod geo;
mod samples;
mod timeline;
mod types;

pub use config::{
	ConfigError, DEFAULT_MAX_SAMPLE_GAP_SECONDS, DEFAULT_MAX_STOP_RADIUS_METERS, DEFAULT_MIN_STOP_DURATION_SECONDS,
	StopDetectionConfig,
};
pub use detector::StopDetector;
pub use samples::{chronological, retain_valid};
pub use timeline::assemble;
pub use types::{
	EntryKind, GeoPoint, LocationSample, SampleSource, StopInterval, Timeline, TimelineEntry, TransitSegment,
	seconds_between,
};

/// Detects stops in `samples` using `config`.
#[must_use]
pub fn detect(samples: &[LocationSample], config: &StopDetectionConfig) -> Vec<StopInterval> {
	StopDetector::new(*config).detect(samples)
}
