//! Acquisition of raw location records: from a database file, or pulled from an Android
//! device over ADB, then parsed into [`LocationSample`](stop_detection::LocationSample)s.

mod device;
mod error;
mod extractor;
mod file;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;

pub use device::{
	AdbBridge, BridgeConfig, DEFAULT_REMOTE_PATHS, DeviceChoice, DeviceSource, choose_device, parse_device_list,
	resolve_selection,
};
pub use error::ExtractionError;
pub use extractor::{CoordinateEncoding, DatabaseSchema, Extraction, TimestampUnit, extract};
pub use file::FileSource;

/// Where location records come from.
#[async_trait]
pub trait RecordSource: Send + Sync {
	fn name(&self) -> &'static str;

	fn describe(&self) -> String;

	/// Makes the location database available locally and returns its path.
	async fn acquire(&self, workdir: &Path) -> Result<PathBuf, ExtractionError>;

	/// Acquires the database and reads its samples.
	async fn load(&self, workdir: &Path, schema: &DatabaseSchema) -> Result<Extraction, ExtractionError> {
		let database = self.acquire(workdir).await?;
		let schema = schema.clone();

		tokio::task::spawn_blocking(move || extract(&database, &schema, Utc::now()))
			.await
			.map_err(|error| ExtractionError::Worker(error.to_string()))?
	}
}

#[derive(Debug, Clone)]
pub enum SourceTarget {
	File(PathBuf),
	Device { serial: String, bridge: BridgeConfig },
}

#[must_use]
pub fn create_source(target: SourceTarget) -> Box<dyn RecordSource> {
	match target {
		SourceTarget::File(path) => Box::new(FileSource::new(path)),
		SourceTarget::Device { serial, bridge } => Box::new(DeviceSource::new(AdbBridge::new(bridge), serial)),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rusqlite::Connection;

	#[tokio::test]
	async fn test_file_source_loads_samples() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("locations.db");
		let conn = Connection::open(&path).unwrap();
		conn.execute_batch(
			"CREATE TABLE locations (timestamp INTEGER, latitude REAL, longitude REAL);
			 INSERT INTO locations VALUES (1700000000000, 37.7749, -122.4194);
			 INSERT INTO locations VALUES (1700000060000, 37.7750, -122.4195);",
		)
		.unwrap();
		drop(conn);

		let source = create_source(SourceTarget::File(path.clone()));
		assert_eq!(source.name(), "file");

		let schema = DatabaseSchema { lookback_days: 0, ..DatabaseSchema::default() };
		let extraction = source.load(dir.path(), &schema).await.unwrap();
		assert_eq!(extraction.database, path);
		assert_eq!(extraction.samples.len(), 2);
	}

	#[test]
	fn test_device_source_description() {
		let source = create_source(SourceTarget::Device { serial: "emulator-5554".into(), bridge: BridgeConfig::default() });
		assert_eq!(source.name(), "adb");
		assert_eq!(source.describe(), "device 'emulator-5554'");
	}
}
