use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use serde::Deserialize;
use stop_detection::{LocationSample, SampleSource};
use tracing::{debug, info, warn};

use crate::error::ExtractionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimestampUnit {
	#[default]
	Milliseconds,
	Seconds,
}

/// How latitude/longitude are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoordinateEncoding {
	#[default]
	Degrees,
	/// Integer degrees scaled by 10^7.
	E7,
}

impl CoordinateEncoding {
	fn decode(self, raw: f64) -> f64 {
		match self {
			Self::Degrees => raw,
			Self::E7 => raw / 1e7,
		}
	}
}

/// Table and column layout of a location database.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseSchema {
	pub table: String,
	pub timestamp_column: String,
	pub latitude_column: String,
	pub longitude_column: String,
	/// Read only when the column exists in the table.
	pub accuracy_column: Option<String>,
	/// Read only when the column exists in the table.
	pub provider_column: Option<String>,
	pub timestamp_unit: TimestampUnit,
	pub coordinates: CoordinateEncoding,
	/// Only rows from the last N days are read; 0 reads everything.
	pub lookback_days: u32,
}

impl Default for DatabaseSchema {
	fn default() -> Self {
		Self {
			table: String::from("locations"),
			timestamp_column: String::from("timestamp"),
			latitude_column: String::from("latitude"),
			longitude_column: String::from("longitude"),
			accuracy_column: Some(String::from("accuracy")),
			provider_column: Some(String::from("provider")),
			timestamp_unit: TimestampUnit::Milliseconds,
			coordinates: CoordinateEncoding::Degrees,
			lookback_days: 7,
		}
	}
}

impl DatabaseSchema {
	pub fn validate(&self) -> Result<(), ExtractionError> {
		let required = [&self.table, &self.timestamp_column, &self.latitude_column, &self.longitude_column];
		let optional = [&self.accuracy_column, &self.provider_column];

		for name in required.into_iter().chain(optional.into_iter().flatten()) {
			if !is_identifier(name) {
				return Err(ExtractionError::InvalidSchema(format!("'{name}' is not a valid SQL identifier")));
			}
		}

		Ok(())
	}

	fn cutoff(&self, now: DateTime<Utc>) -> i64 {
		if self.lookback_days == 0 {
			return i64::MIN;
		}

		let cutoff = now - Duration::days(i64::from(self.lookback_days));
		match self.timestamp_unit {
			TimestampUnit::Milliseconds => cutoff.timestamp_millis(),
			TimestampUnit::Seconds => cutoff.timestamp(),
		}
	}

	fn decode_timestamp(&self, raw: f64) -> Option<DateTime<Utc>> {
		if !raw.is_finite() {
			return None;
		}

		let millis = match self.timestamp_unit {
			TimestampUnit::Milliseconds => raw,
			TimestampUnit::Seconds => raw * 1000.0,
		};
		DateTime::from_timestamp_millis(millis as i64)
	}
}

fn is_identifier(name: &str) -> bool {
	let mut chars = name.chars();
	chars.next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
		&& chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Samples read from a location database, with counts of rejected rows.
#[derive(Debug, Clone)]
pub struct Extraction {
	pub database: PathBuf,
	pub samples: Vec<LocationSample>,
	/// Rows whose coordinates were outside the valid ranges.
	pub dropped_invalid: usize,
	/// Rows with a missing or unreadable timestamp or coordinate.
	pub skipped_incomplete: usize,
}

/// Reads location rows from the SQLite database at `path`.
///
/// The database is opened read-only. `now` anchors the look-back window.
pub fn extract(path: &Path, schema: &DatabaseSchema, now: DateTime<Utc>) -> Result<Extraction, ExtractionError> {
	schema.validate()?;

	if !path.is_file() {
		return Err(ExtractionError::DatabaseMissing(path.to_path_buf()));
	}

	let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX)?;

	let columns = table_columns(&conn, &schema.table)?;
	if columns.is_empty() {
		return Err(ExtractionError::MissingTable(schema.table.clone()));
	}

	for required in [&schema.timestamp_column, &schema.latitude_column, &schema.longitude_column] {
		if !columns.iter().any(|c| c.eq_ignore_ascii_case(required)) {
			return Err(ExtractionError::InvalidSchema(format!(
				"column '{required}' not found in table '{}'",
				schema.table
			)));
		}
	}

	let optional_column = |column: &Option<String>| -> String {
		match column {
			Some(name) if columns.iter().any(|c| c.eq_ignore_ascii_case(name)) => quoted(name),
			Some(name) => {
				debug!(column = %name, table = %schema.table, "Optional column absent, skipping");
				String::from("NULL")
			},
			None => String::from("NULL"),
		}
	};

	let query = format!(
		"SELECT {ts}, {lat}, {lon}, {acc}, {provider} FROM {table} WHERE {ts} IS NULL OR {ts} >= ?1 ORDER BY {ts} ASC",
		ts = quoted(&schema.timestamp_column),
		lat = quoted(&schema.latitude_column),
		lon = quoted(&schema.longitude_column),
		acc = optional_column(&schema.accuracy_column),
		provider = optional_column(&schema.provider_column),
		table = quoted(&schema.table),
	);

	info!(
		table = %schema.table,
		lookback_days = schema.lookback_days,
		database = %path.display(),
		"Querying location rows"
	);

	let mut stmt = conn.prepare(&query)?;
	let rows = stmt.query_map([schema.cutoff(now)], |row| {
		Ok(RawRow {
			timestamp: number(row.get_ref(0)?),
			latitude: number(row.get_ref(1)?),
			longitude: number(row.get_ref(2)?),
			accuracy: number(row.get_ref(3)?),
			provider: text(row.get_ref(4)?),
		})
	})?;

	let mut samples = Vec::new();
	let mut dropped_invalid = 0;
	let mut skipped_incomplete = 0;

	for row in rows {
		let row = row?;
		let (Some(raw_ts), Some(raw_lat), Some(raw_lon)) = (row.timestamp, row.latitude, row.longitude) else {
			skipped_incomplete += 1;
			continue;
		};

		let Some(timestamp) = schema.decode_timestamp(raw_ts) else {
			warn!(value = raw_ts, "Could not convert timestamp, skipping row");
			skipped_incomplete += 1;
			continue;
		};

		let mut sample = LocationSample::new(
			timestamp,
			schema.coordinates.decode(raw_lat),
			schema.coordinates.decode(raw_lon),
		);
		if !sample.has_valid_coordinates() {
			dropped_invalid += 1;
			continue;
		}

		if let Some(accuracy) = row.accuracy.filter(|a| a.is_finite() && *a >= 0.0) {
			sample = sample.with_accuracy(accuracy);
		}
		if let Some(provider) = row.provider.as_deref() {
			sample = sample.with_source(SampleSource::from_provider(provider));
		}

		samples.push(sample);
	}

	if dropped_invalid > 0 {
		warn!(count = dropped_invalid, "Dropped rows with out-of-range coordinates");
	}
	if skipped_incomplete > 0 {
		warn!(count = skipped_incomplete, "Skipped rows with missing timestamp or coordinates");
	}
	info!(count = samples.len(), database = %path.display(), "Extracted location samples");

	Ok(Extraction { database: path.to_path_buf(), samples, dropped_invalid, skipped_incomplete })
}

struct RawRow {
	timestamp: Option<f64>,
	latitude: Option<f64>,
	longitude: Option<f64>,
	accuracy: Option<f64>,
	provider: Option<String>,
}

/// Cell as a number; `None` for NULL or anything that does not parse as one.
fn number(value: ValueRef<'_>) -> Option<f64> {
	match value {
		ValueRef::Integer(i) => Some(i as f64),
		ValueRef::Real(f) => Some(f),
		ValueRef::Text(t) => std::str::from_utf8(t).ok()?.trim().parse().ok(),
		ValueRef::Null | ValueRef::Blob(_) => None,
	}
}

fn text(value: ValueRef<'_>) -> Option<String> {
	match value {
		ValueRef::Text(t) => Some(String::from_utf8_lossy(t).into_owned()),
		_ => None,
	}
}

/// Validated identifiers contain no quotes, so wrapping is enough.
fn quoted(name: &str) -> String {
	format!("\"{name}\"")
}

fn table_columns(conn: &Connection, table: &str) -> Result<Vec<String>, ExtractionError> {
	let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", quoted(table)))?;
	let columns = stmt.query_map([], |row| row.get::<_, String>(1))?.collect::<Result<Vec<_>, _>>()?;
	Ok(columns)
}
