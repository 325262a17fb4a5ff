use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleSource {
	Gps,
	Network,
	Fused,
	#[default]
	Unknown,
}

impl SampleSource {
	/// Maps an Android location provider name onto a sample source.
	#[must_use]
	pub fn from_provider(provider: &str) -> Self {
		match provider.trim().to_ascii_lowercase().as_str() {
			"gps" => Self::Gps,
			"network" => Self::Network,
			"fused" => Self::Fused,
			_ => Self::Unknown,
		}
	}
}

impl std::fmt::Display for SampleSource {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Gps => write!(f, "gps"),
			Self::Network => write!(f, "network"),
			Self::Fused => write!(f, "fused"),
			Self::Unknown => write!(f, "unknown"),
		}
	}
}

/// A position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
	pub latitude: f64,
	pub longitude: f64,
}

impl GeoPoint {
	#[must_use]
	pub const fn new(latitude: f64, longitude: f64) -> Self {
		Self { latitude, longitude }
	}

	#[must_use]
	pub fn is_valid(&self) -> bool {
		self.latitude.is_finite()
			&& self.longitude.is_finite()
			&& (-90.0..=90.0).contains(&self.latitude)
			&& (-180.0..=180.0).contains(&self.longitude)
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationSample {
	pub timestamp: DateTime<Utc>,
	pub latitude: f64,
	pub longitude: f64,
	pub accuracy_meters: Option<f64>,
	pub source: SampleSource,
}

impl LocationSample {
	#[must_use]
	pub const fn new(timestamp: DateTime<Utc>, latitude: f64, longitude: f64) -> Self {
		Self { timestamp, latitude, longitude, accuracy_meters: None, source: SampleSource::Unknown }
	}

	#[must_use]
	pub const fn with_accuracy(mut self, accuracy_meters: f64) -> Self {
		self.accuracy_meters = Some(accuracy_meters);
		self
	}

	#[must_use]
	pub const fn with_source(mut self, source: SampleSource) -> Self {
		self.source = source;
		self
	}

	#[must_use]
	pub const fn point(&self) -> GeoPoint {
		GeoPoint::new(self.latitude, self.longitude)
	}

	#[must_use]
	pub fn has_valid_coordinates(&self) -> bool {
		self.point().is_valid()
	}
}

/// A period during which the device stayed within a bounded radius.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StopInterval {
	pub start: DateTime<Utc>,
	pub end: DateTime<Utc>,
	pub centroid: GeoPoint,
	pub sample_count: usize,
	/// Largest distance from the centroid to any member sample.
	pub radius_meters: f64,
}

impl StopInterval {
	#[must_use]
	pub fn duration(&self) -> Duration {
		self.end - self.start
	}

	#[must_use]
	pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
		self.start <= timestamp && timestamp <= self.end
	}
}

/// Movement between stops, or before the first / after the last one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransitSegment {
	pub start: DateTime<Utc>,
	pub end: DateTime<Utc>,
	pub start_point: GeoPoint,
	pub end_point: GeoPoint,
	pub distance_meters: f64,
	pub avg_speed_mps: f64,
	/// Samples carried by this segment (not claimed by any stop).
	pub sample_count: usize,
	pub path: Vec<GeoPoint>,
}

impl TransitSegment {
	#[must_use]
	pub fn duration(&self) -> Duration {
		self.end - self.start
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
	Stop,
	Transit,
}

impl std::fmt::Display for EntryKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Stop => write!(f, "stop"),
			Self::Transit => write!(f, "transit"),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "payload", rename_all = "lowercase")]
pub enum TimelineEntry {
	Stop(StopInterval),
	Transit(TransitSegment),
}

impl TimelineEntry {
	#[must_use]
	pub const fn kind(&self) -> EntryKind {
		match self {
			Self::Stop(_) => EntryKind::Stop,
			Self::Transit(_) => EntryKind::Transit,
		}
	}

	#[must_use]
	pub const fn start(&self) -> DateTime<Utc> {
		match self {
			Self::Stop(stop) => stop.start,
			Self::Transit(transit) => transit.start,
		}
	}

	#[must_use]
	pub const fn end(&self) -> DateTime<Utc> {
		match self {
			Self::Stop(stop) => stop.end,
			Self::Transit(transit) => transit.end,
		}
	}

	#[must_use]
	pub fn duration(&self) -> Duration {
		self.end() - self.start()
	}
}

/// Chronological, gap-free sequence of stops and transit segments.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Timeline {
	entries: Vec<TimelineEntry>,
}

impl Timeline {
	#[must_use]
	pub(crate) const fn from_entries(entries: Vec<TimelineEntry>) -> Self {
		Self { entries }
	}

	#[must_use]
	pub fn entries(&self) -> &[TimelineEntry] {
		&self.entries
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn stops(&self) -> impl Iterator<Item = &StopInterval> {
		self.entries.iter().filter_map(|entry| match entry {
			TimelineEntry::Stop(stop) => Some(stop),
			TimelineEntry::Transit(_) => None,
		})
	}

	pub fn transits(&self) -> impl Iterator<Item = &TransitSegment> {
		self.entries.iter().filter_map(|entry| match entry {
			TimelineEntry::Transit(transit) => Some(transit),
			TimelineEntry::Stop(_) => None,
		})
	}

	/// First and last instant covered by the timeline.
	#[must_use]
	pub fn span(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
		Some((self.entries.first()?.start(), self.entries.last()?.end()))
	}
}

/// Elapsed seconds from `from` to `to`, millisecond precision.
#[must_use]
pub fn seconds_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
	(to - from).num_milliseconds() as f64 / 1000.0
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_provider_mapping() {
		assert_eq!(SampleSource::from_provider("gps"), SampleSource::Gps);
		assert_eq!(SampleSource::from_provider(" Network "), SampleSource::Network);
		assert_eq!(SampleSource::from_provider("fused"), SampleSource::Fused);
		assert_eq!(SampleSource::from_provider("passive"), SampleSource::Unknown);
	}

	#[test]
	fn test_coordinate_validity() {
		assert!(GeoPoint::new(90.0, -180.0).is_valid());
		assert!(GeoPoint::new(-90.0, 180.0).is_valid());
		assert!(!GeoPoint::new(90.5, 0.0).is_valid());
		assert!(!GeoPoint::new(0.0, 180.1).is_valid());
		assert!(!GeoPoint::new(f64::NAN, 0.0).is_valid());
	}

	#[test]
	fn test_entry_serializes_with_kind_tag() {
		let start = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
		let entry = TimelineEntry::Stop(StopInterval {
			start,
			end: start + Duration::minutes(10),
			centroid: GeoPoint::new(1.0, 2.0),
			sample_count: 3,
			radius_meters: 4.0,
		});

		let json = serde_json::to_value(&entry).unwrap();
		assert_eq!(json["kind"], "stop");
		assert_eq!(json["payload"]["sample_count"], 3);
		assert_eq!(json["payload"]["centroid"]["latitude"], 1.0);
	}
}
