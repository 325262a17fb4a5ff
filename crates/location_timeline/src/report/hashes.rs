use std::fs::File;
use std::io;
use std::path::Path;

use anyhow::Context;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use super::escape_field;

/// Hex-encoded SHA-256 of the file at `path`.
pub fn sha256_file(path: &Path) -> io::Result<String> {
	let mut file = File::open(path)?;
	let mut hasher = Sha256::new();
	io::copy(&mut file, &mut hasher)?;
	Ok(format!("{:x}", hasher.finalize()))
}

/// `filename,sha256_hash` manifest for `files`. Missing files are logged and left out.
pub(super) fn render(files: &[&Path]) -> anyhow::Result<String> {
	let mut out = String::from("filename,sha256_hash\n");

	for path in files {
		if !path.is_file() {
			warn!(path = %path.display(), "Skipping hash of missing file");
			continue;
		}

		let hash = sha256_file(path).with_context(|| format!("Failed to hash {}", path.display()))?;
		let name = path.file_name().map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
		info!(file = %name, sha256 = %hash, "Hashed artifact");

		out.push_str(&escape_field(&name));
		out.push(',');
		out.push_str(&hash);
		out.push('\n');
	}

	Ok(out)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_known_digest() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("abc.txt");
		std::fs::write(&path, "abc").unwrap();

		assert_eq!(sha256_file(&path).unwrap(), "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad");
	}

	#[test]
	fn test_empty_file_digest() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("empty");
		std::fs::write(&path, "").unwrap();

		assert_eq!(sha256_file(&path).unwrap(), "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855");
	}

	#[test]
	fn test_manifest_skips_missing_files() {
		let dir = tempfile::tempdir().unwrap();
		let present = dir.path().join("timeline.csv");
		std::fs::write(&present, "abc").unwrap();
		let missing = dir.path().join("map.html");

		let manifest = render(&[present.as_path(), missing.as_path()]).unwrap();
		assert_eq!(
			manifest,
			"filename,sha256_hash\ntimeline.csv,ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad\n"
		);
	}
}
