use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::info;

use crate::RecordSource;
use crate::error::ExtractionError;

/// A location database already on disk.
pub struct FileSource {
	path: PathBuf,
}

impl FileSource {
	#[must_use]
	pub const fn new(path: PathBuf) -> Self {
		Self { path }
	}
}

#[async_trait]
impl RecordSource for FileSource {
	fn name(&self) -> &'static str {
		"file"
	}

	fn describe(&self) -> String {
		format!("file '{}'", self.path.display())
	}

	async fn acquire(&self, _workdir: &Path) -> Result<PathBuf, ExtractionError> {
		if !self.path.is_file() {
			return Err(ExtractionError::DatabaseMissing(self.path.clone()));
		}

		info!(path = %self.path.display(), "Using local location database");
		Ok(self.path.clone())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn test_acquire_existing_file() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("locations.db");
		std::fs::write(&path, b"").unwrap();

		let source = FileSource::new(path.clone());
		assert_eq!(source.acquire(dir.path()).await.unwrap(), path);
	}

	#[tokio::test]
	async fn test_acquire_rejects_directories_and_missing_paths() {
		let dir = tempfile::tempdir().unwrap();

		let missing = FileSource::new(dir.path().join("absent.db"));
		assert!(matches!(missing.acquire(dir.path()).await, Err(ExtractionError::DatabaseMissing(_))));

		let directory = FileSource::new(dir.path().to_path_buf());
		assert!(matches!(directory.acquire(dir.path()).await, Err(ExtractionError::DatabaseMissing(_))));
	}
}
