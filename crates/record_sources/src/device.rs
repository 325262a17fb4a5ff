use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::RecordSource;
use crate::error::ExtractionError;

pub const DEFAULT_REMOTE_PATHS: [&str; 2] = [
	"/data/data/com.google.android.gms/databases/locations.db",
	"/data/data/com.google.android.gms/databases/cache.db",
];

/// How the ADB executable is invoked.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeConfig {
	pub adb_path: PathBuf,
	/// Per-command timeout.
	pub timeout_secs: u64,
	/// Extra attempts after a timeout or an unclassified failure.
	pub retries: u32,
	/// Candidate database paths on the device, tried in order.
	pub remote_paths: Vec<String>,
}

impl Default for BridgeConfig {
	fn default() -> Self {
		Self {
			adb_path: PathBuf::from("adb"),
			timeout_secs: 120,
			retries: 1,
			remote_paths: DEFAULT_REMOTE_PATHS.iter().map(|p| (*p).to_string()).collect(),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceChoice {
	Selected(String),
	/// Several devices are connected and none was requested.
	Ambiguous(Vec<String>),
}

/// Picks the device to read from.
pub fn choose_device(connected: &[String], requested: Option<&str>) -> Result<DeviceChoice, ExtractionError> {
	if connected.is_empty() {
		return Err(ExtractionError::NoDevices);
	}

	match requested {
		Some(id) if connected.iter().any(|d| d == id) => Ok(DeviceChoice::Selected(id.to_string())),
		Some(id) => Err(ExtractionError::DeviceNotFound(id.to_string())),
		None if connected.len() == 1 => Ok(DeviceChoice::Selected(connected[0].clone())),
		None => Ok(DeviceChoice::Ambiguous(connected.to_vec())),
	}
}

/// Resolves an interactive answer: a 1-based index into `candidates` or an exact device id.
#[must_use]
pub fn resolve_selection(input: &str, candidates: &[String]) -> Option<String> {
	let input = input.trim();
	if let Ok(index) = input.parse::<usize>() {
		return index.checked_sub(1).and_then(|i| candidates.get(i)).cloned();
	}
	candidates.iter().find(|c| *c == input).cloned()
}

/// Parses `adb devices` output into the ids of devices in the `device` state.
#[must_use]
pub fn parse_device_list(output: &str) -> Vec<String> {
	output
		.lines()
		.filter(|line| !line.starts_with("List of devices"))
		.filter_map(|line| {
			let mut fields = line.split_whitespace();
			let id = fields.next()?;
			(fields.next() == Some("device")).then(|| id.to_string())
		})
		.collect()
}

#[derive(Debug, Clone)]
pub struct AdbBridge {
	config: BridgeConfig,
}

impl AdbBridge {
	#[must_use]
	pub const fn new(config: BridgeConfig) -> Self {
		Self { config }
	}

	#[must_use]
	pub const fn config(&self) -> &BridgeConfig {
		&self.config
	}

	pub async fn devices(&self) -> Result<Vec<String>, ExtractionError> {
		info!("Checking for connected ADB devices");
		let output = self.run(&["devices"]).await?;
		let devices = parse_device_list(&output);

		if devices.is_empty() {
			warn!("No ADB devices found");
		} else {
			info!(count = devices.len(), devices = %devices.join(", "), "Found ADB devices");
		}

		Ok(devices)
	}

	/// Copies the first readable candidate database from `serial` into `workdir`.
	pub async fn pull(&self, serial: &str, workdir: &Path) -> Result<PathBuf, ExtractionError> {
		info!(device = %serial, "Pulling location database");

		for remote in &self.config.remote_paths {
			let file_name = remote.rsplit('/').next().filter(|n| !n.is_empty()).unwrap_or("locations.db");
			let local = workdir.join(file_name);
			// A failed attempt must never touch an existing copy
			let partial = workdir.join(format!("{file_name}.partial"));
			let partial_arg = partial.to_string_lossy().into_owned();

			debug!(remote = %remote, local = %local.display(), "Trying remote path");
			let result = self.run(&["-s", serial, "pull", remote.as_str(), partial_arg.as_str()]).await;

			match result {
				Ok(_) if partial.is_file() => {
					tokio::fs::rename(&partial, &local).await?;
					info!(remote = %remote, local = %local.display(), "Pulled location database");
					return Ok(local);
				},
				Ok(_) => {
					warn!(remote = %remote, "Pull reported success but no file was written");
				},
				Err(error @ (ExtractionError::DeviceNotFound(_) | ExtractionError::BridgeUnavailable { .. })) => {
					discard(&partial).await;
					return Err(error);
				},
				Err(error) => {
					warn!(remote = %remote, %error, "Pull failed, trying next path");
				},
			}

			discard(&partial).await;
		}

		warn!(device = %serial, "No candidate path could be pulled; non-rooted devices usually deny access");
		Err(ExtractionError::TransferFailed { device: serial.to_string(), attempted: self.config.remote_paths.len() })
	}

	async fn run(&self, args: &[&str]) -> Result<String, ExtractionError> {
		let mut attempt = 0;
		loop {
			match self.run_once(args).await {
				Err(error) if error.is_transient() && attempt < self.config.retries => {
					attempt += 1;
					warn!(%error, attempt, "ADB command failed, retrying");
				},
				result => return result,
			}
		}
	}

	async fn run_once(&self, args: &[&str]) -> Result<String, ExtractionError> {
		let command = format!("adb {}", args.join(" "));
		debug!(command = %command, "Running ADB command");

		let child = Command::new(&self.config.adb_path)
			.args(args)
			.stdin(Stdio::null())
			.stdout(Stdio::piped())
			.stderr(Stdio::piped())
			.kill_on_drop(true)
			.spawn()
			.map_err(|error| match error.kind() {
				std::io::ErrorKind::NotFound => {
					ExtractionError::BridgeUnavailable { path: self.config.adb_path.clone() }
				},
				_ => ExtractionError::Io(error),
			})?;

		let timeout = Duration::from_secs(self.config.timeout_secs);
		let output = tokio::time::timeout(timeout, child.wait_with_output())
			.await
			.map_err(|_| ExtractionError::Timeout { command: command.clone(), seconds: self.config.timeout_secs })??;

		let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
		let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

		if output.status.success() {
			return Ok(stdout);
		}

		let detail = if stderr.is_empty() { stdout } else { stderr };
		Err(classify_failure(command, output.status.code(), detail))
	}
}

async fn discard(partial: &Path) {
	if partial.exists() {
		if let Err(error) = tokio::fs::remove_file(partial).await {
			warn!(path = %partial.display(), %error, "Could not remove partial file");
		}
	}
}

fn classify_failure(command: String, code: Option<i32>, detail: String) -> ExtractionError {
	if detail.contains("Permission denied") {
		ExtractionError::PermissionDenied(detail)
	} else if ["failed to stat", "No such file", "does not exist"].iter().any(|m| detail.contains(m)) {
		ExtractionError::RemotePathMissing(detail)
	} else if detail.contains("device") && detail.contains("not found") {
		ExtractionError::DeviceNotFound(detail)
	} else {
		ExtractionError::CommandFailed { command, code, detail }
	}
}

/// Pulls the location database from a connected device.
pub struct DeviceSource {
	bridge: AdbBridge,
	serial: String,
}

impl DeviceSource {
	#[must_use]
	pub const fn new(bridge: AdbBridge, serial: String) -> Self {
		Self { bridge, serial }
	}
}

#[async_trait]
impl RecordSource for DeviceSource {
	fn name(&self) -> &'static str {
		"adb"
	}

	fn describe(&self) -> String {
		format!("device '{}'", self.serial)
	}

	async fn acquire(&self, workdir: &Path) -> Result<PathBuf, ExtractionError> {
		self.bridge.pull(&self.serial, workdir).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn ids(list: &[&str]) -> Vec<String> {
		list.iter().map(|s| (*s).to_string()).collect()
	}

	#[test]
	fn test_parse_device_list() {
		let output = "List of devices attached\nemulator-5554\tdevice\nR58M123ABC\tunauthorized\n0123456789ABCDEF\tdevice product:x model:y\n\n";
		assert_eq!(parse_device_list(output), ids(&["emulator-5554", "0123456789ABCDEF"]));
		assert!(parse_device_list("List of devices attached\n").is_empty());
	}

	#[test]
	fn test_choose_device() {
		assert!(matches!(choose_device(&[], None), Err(ExtractionError::NoDevices)));

		let one = ids(&["emulator-5554"]);
		assert_eq!(choose_device(&one, None).unwrap(), DeviceChoice::Selected("emulator-5554".into()));
		assert!(matches!(choose_device(&one, Some("other")), Err(ExtractionError::DeviceNotFound(id)) if id == "other"));

		let two = ids(&["a", "b"]);
		assert_eq!(choose_device(&two, None).unwrap(), DeviceChoice::Ambiguous(two.clone()));
		assert_eq!(choose_device(&two, Some("b")).unwrap(), DeviceChoice::Selected("b".into()));
	}

	#[test]
	fn test_resolve_selection() {
		let candidates = ids(&["emulator-5554", "R58M123ABC"]);
		assert_eq!(resolve_selection("2\n", &candidates), Some("R58M123ABC".into()));
		assert_eq!(resolve_selection(" emulator-5554 ", &candidates), Some("emulator-5554".into()));
		assert_eq!(resolve_selection("0", &candidates), None);
		assert_eq!(resolve_selection("3", &candidates), None);
		assert_eq!(resolve_selection("pixel", &candidates), None);
	}

	#[test]
	fn test_classify_failure() {
		let classify = |detail: &str| classify_failure("adb pull".into(), Some(1), detail.into());

		assert!(matches!(
			classify("adb: error: failed to stat remote object '/data/x': Permission denied"),
			ExtractionError::PermissionDenied(_)
		));
		assert!(matches!(
			classify("adb: error: failed to stat remote object '/data/x': No such file or directory"),
			ExtractionError::RemotePathMissing(_)
		));
		assert!(matches!(classify("error: device 'abc' not found"), ExtractionError::DeviceNotFound(_)));
		assert!(classify("protocol fault (couldn't read status)").is_transient());
	}

	#[tokio::test]
	async fn test_missing_executable() {
		let bridge = AdbBridge::new(BridgeConfig {
			adb_path: PathBuf::from("/nonexistent/platform-tools/adb"),
			..BridgeConfig::default()
		});

		assert!(matches!(bridge.devices().await, Err(ExtractionError::BridgeUnavailable { .. })));
	}

	#[cfg(unix)]
	mod fake_adb {
		use super::*;
		use std::os::unix::fs::PermissionsExt;

		// Writing an executable while another test forks can fail with ETXTBSY
		static SERIAL: tokio::sync::Mutex<()> = tokio::sync::Mutex::const_new(());

		fn install(dir: &Path, body: &str) -> PathBuf {
			let path = dir.join("adb");
			std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
			std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
			path
		}

		fn bridge(adb_path: PathBuf, timeout_secs: u64) -> AdbBridge {
			AdbBridge::new(BridgeConfig { adb_path, timeout_secs, retries: 1, ..BridgeConfig::default() })
		}

		#[tokio::test]
		async fn test_lists_devices() {
			let _guard = SERIAL.lock().await;
			let dir = tempfile::tempdir().unwrap();
			let adb = install(dir.path(), "printf 'List of devices attached\\nemulator-5554\\tdevice\\n'");

			assert_eq!(bridge(adb, 5).devices().await.unwrap(), ids(&["emulator-5554"]));
		}

		#[tokio::test]
		async fn test_pull_falls_back_to_next_path() {
			let _guard = SERIAL.lock().await;
			let dir = tempfile::tempdir().unwrap();
			let adb = install(
				dir.path(),
				r#"case "$4" in
  *locations.db) echo "adb: error: failed to stat remote object '$4': Permission denied" >&2; exit 1 ;;
  *) echo data > "$5"; echo "$4: 1 file pulled" ;;
esac"#,
			);

			let workdir = tempfile::tempdir().unwrap();
			let pulled = bridge(adb, 5).pull("emulator-5554", workdir.path()).await.unwrap();

			assert_eq!(pulled, workdir.path().join("cache.db"));
			assert!(pulled.is_file());
			assert!(!workdir.path().join("locations.db").exists());
			assert!(!workdir.path().join("cache.db.partial").exists());
		}

		#[tokio::test]
		async fn test_pull_fails_when_every_path_denied() {
			let _guard = SERIAL.lock().await;
			let dir = tempfile::tempdir().unwrap();
			let adb = install(dir.path(), r#"echo "adb: error: failed to stat remote object '$4': Permission denied" >&2; exit 1"#);

			let workdir = tempfile::tempdir().unwrap();
			let result = bridge(adb, 5).pull("emulator-5554", workdir.path()).await;

			assert!(matches!(result, Err(ExtractionError::TransferFailed { attempted: 2, .. })));
		}

		#[tokio::test]
		async fn test_failed_pull_keeps_existing_copy() {
			let _guard = SERIAL.lock().await;
			let dir = tempfile::tempdir().unwrap();
			let adb = install(
				dir.path(),
				r#"echo partial > "$5"; echo "adb: error: failed to stat remote object '$4': Permission denied" >&2; exit 1"#,
			);

			let workdir = tempfile::tempdir().unwrap();
			let previous = workdir.path().join("locations.db");
			std::fs::write(&previous, "earlier acquisition").unwrap();

			let result = bridge(adb, 5).pull("emulator-5554", workdir.path()).await;

			assert!(matches!(result, Err(ExtractionError::TransferFailed { .. })));
			assert_eq!(std::fs::read_to_string(&previous).unwrap(), "earlier acquisition");
			assert!(!workdir.path().join("locations.db.partial").exists());
			assert!(!workdir.path().join("cache.db.partial").exists());
		}

		#[tokio::test]
		async fn test_timeout_is_retried_once() {
			let _guard = SERIAL.lock().await;
			let dir = tempfile::tempdir().unwrap();
			let calls = dir.path().join("calls");
			let adb = install(dir.path(), &format!("echo call >> '{}'\nexec sleep 10", calls.display()));

			let result = bridge(adb, 1).devices().await;

			assert!(matches!(result, Err(ExtractionError::Timeout { seconds: 1, .. })));
			let invocations = std::fs::read_to_string(&calls).unwrap();
			assert_eq!(invocations.lines().count(), 2);
		}
	}
}
