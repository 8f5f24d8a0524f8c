//! Config file and state directory resolution.
//!
//! Config lives at `<config dir>/wallet-session/config.json`, the session
//! record under `<state dir>/wallet-session/`, with the platform directories
//! from `dirs` (`$XDG_CONFIG_HOME` and `$XDG_STATE_HOME` on Linux).
//! `--config` and `--state-dir` override them.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;
use wallet::SessionConfig;

use crate::error::{CliError, Result};

const APP_DIR: &str = "wallet-session";
const CONFIG_FILE: &str = "config.json";

pub const DEFAULT_LISTEN_HOST: &str = "127.0.0.1";
pub const DEFAULT_LISTEN_PORT: u16 = 9271;

/// Host settings. Session settings are flattened in, so one file covers both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CliConfig {
	#[serde(flatten)]
	pub session: SessionConfig,
	pub listen_host: String,
	pub listen_port: u16,
	/// Wallet to connect through when nothing is restored: a name such as
	/// `MetaMask`, or an injection path such as `phantom.solana`.
	pub preferred_wallet: Option<String>,
	/// Prompt for a connection when restore finds nothing.
	pub auto_connect: bool,
}

impl Default for CliConfig {
	fn default() -> Self {
		Self {
			session: SessionConfig::default(),
			listen_host: DEFAULT_LISTEN_HOST.to_string(),
			listen_port: DEFAULT_LISTEN_PORT,
			preferred_wallet: None,
			auto_connect: true,
		}
	}
}

impl CliConfig {
	/// Loads `path`. A missing file yields defaults unless it was named explicitly.
	pub fn load(path: &Path, explicit: bool) -> Result<Self> {
		let text = match fs::read_to_string(path) {
			Ok(text) => text,
			Err(err) if err.kind() == std::io::ErrorKind::NotFound && !explicit => {
				debug!(target = "wallet.config", path = %path.display(), "no config file; using defaults");
				return Ok(Self::default());
			}
			Err(source) => {
				return Err(CliError::ConfigRead {
					path: path.to_path_buf(),
					source,
				});
			}
		};
		serde_json::from_str(&text).map_err(|source| CliError::ConfigParse {
			path: path.to_path_buf(),
			source,
		})
	}
}

/// Where the config file and session state live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatePaths {
	pub config_file: PathBuf,
	pub state_dir: PathBuf,
}

impl StatePaths {
	/// Resolves paths from the platform directories and CLI overrides.
	///
	/// Platforms without a state directory (macOS, Windows) keep the session
	/// record under the local data directory.
	pub fn resolve(config_override: Option<&Path>, state_override: Option<&Path>) -> Result<Self> {
		let state_base = dirs::state_dir().or_else(dirs::data_local_dir);
		Self::resolve_with(dirs::config_dir(), state_base, config_override, state_override)
	}

	fn resolve_with(
		config_base: Option<PathBuf>,
		state_base: Option<PathBuf>,
		config_override: Option<&Path>,
		state_override: Option<&Path>,
	) -> Result<Self> {
		let config_file = match config_override {
			Some(path) => path.to_path_buf(),
			None => config_base
				.map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
				.unwrap_or_else(|| PathBuf::from(CONFIG_FILE)),
		};

		let state_dir = match state_override {
			Some(path) => path.to_path_buf(),
			None => state_base.map(|dir| dir.join(APP_DIR)).ok_or(CliError::NoStateDir)?,
		};

		Ok(Self { config_file, state_dir })
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn platform_dirs_get_app_subdirectory() {
		let paths = StatePaths::resolve_with(
			Some(PathBuf::from("/home/u/.config")),
			Some(PathBuf::from("/home/u/.local/state")),
			None,
			None,
		)
		.unwrap();
		assert_eq!(paths.config_file, PathBuf::from("/home/u/.config/wallet-session/config.json"));
		assert_eq!(paths.state_dir, PathBuf::from("/home/u/.local/state/wallet-session"));
	}

	#[test]
	fn overrides_win_and_missing_state_dir_is_an_error() {
		let paths = StatePaths::resolve_with(None, None, Some(Path::new("c.json")), Some(Path::new("/tmp/s"))).unwrap();
		assert_eq!(paths.config_file, PathBuf::from("c.json"));
		assert_eq!(paths.state_dir, PathBuf::from("/tmp/s"));

		assert!(matches!(StatePaths::resolve_with(None, None, None, None), Err(CliError::NoStateDir)));
	}

	#[test]
	fn missing_config_dir_falls_back_to_working_directory() {
		let paths = StatePaths::resolve_with(None, Some(PathBuf::from("/state")), None, None).unwrap();
		assert_eq!(paths.config_file, PathBuf::from(CONFIG_FILE));
		assert_eq!(paths.state_dir, PathBuf::from("/state/wallet-session"));
	}

	#[test]
	fn partial_config_keeps_defaults() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("config.json");
		fs::write(&path, r#"{ "sessionLifetimeSecs": 14400, "listenPort": 9000 }"#).unwrap();

		let config = CliConfig::load(&path, true).unwrap();
		assert_eq!(config.session.session_lifetime_secs, 14_400);
		assert_eq!(config.session.connect_timeout_ms, 3_000);
		assert_eq!(config.listen_port, 9000);
		assert_eq!(config.listen_host, DEFAULT_LISTEN_HOST);
		assert!(config.auto_connect);
	}

	#[test]
	fn missing_config_is_an_error_only_when_named() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("absent.json");
		assert_eq!(CliConfig::load(&path, false).unwrap(), CliConfig::default());
		assert!(matches!(CliConfig::load(&path, true), Err(CliError::ConfigRead { .. })));
	}

	#[test]
	fn malformed_config_is_reported() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("config.json");
		fs::write(&path, "{ not json").unwrap();
		assert!(matches!(CliConfig::load(&path, false), Err(CliError::ConfigParse { .. })));
	}
}
