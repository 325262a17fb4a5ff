use std::path::PathBuf;

use thiserror::Error;

/// Failure to obtain a sample sequence from a record source.
#[derive(Debug, Error)]
pub enum ExtractionError {
	#[error("adb executable not found at '{}'; install platform-tools or set bridge.adb_path", path.display())]
	BridgeUnavailable { path: PathBuf },

	#[error("no ADB devices connected; enable USB debugging or pass --db-path")]
	NoDevices,

	#[error("device '{0}' is not connected")]
	DeviceNotFound(String),

	#[error("permission denied: {0}")]
	PermissionDenied(String),

	#[error("remote path not found: {0}")]
	RemotePathMissing(String),

	#[error("`{command}` failed (exit code {code:?}): {detail}")]
	CommandFailed { command: String, code: Option<i32>, detail: String },

	#[error("`{command}` timed out after {seconds}s")]
	Timeout { command: String, seconds: u64 },

	#[error(
		"could not pull a location database from '{device}' ({attempted} candidate paths tried); \
		 non-rooted devices usually deny access, try an emulator or pass --db-path"
	)]
	TransferFailed { device: String, attempted: usize },

	#[error("database file '{}' does not exist", .0.display())]
	DatabaseMissing(PathBuf),

	#[error("table '{0}' not found in database")]
	MissingTable(String),

	#[error("invalid database schema: {0}")]
	InvalidSchema(String),

	#[error("SQLite error: {0}")]
	Sqlite(#[from] rusqlite::Error),

	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	#[error("extraction worker failed: {0}")]
	Worker(String),
}

impl ExtractionError {
	/// Whether retrying the same bridge command may succeed.
	#[must_use]
	pub const fn is_transient(&self) -> bool {
		matches!(self, Self::Timeout { .. } | Self::CommandFailed { .. })
	}
}
