//! Key/value backends for the session record.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use parking_lot::Mutex;

use crate::error::{Error, Result};

/// Durable string storage addressed by key, in the manner of `localStorage`.
pub trait SessionStorage: Send + Sync {
	fn get(&self, key: &str) -> Result<Option<String>>;
	fn set(&self, key: &str, value: &str) -> Result<()>;
	/// Removes `key`; removing an absent key is not an error.
	fn remove(&self, key: &str) -> Result<()>;
}

/// One JSON file per key under a state directory.
///
/// Files are written owner-only on unix since they identify the wallet owner.
#[derive(Debug, Clone)]
pub struct FileStorage {
	dir: PathBuf,
}

impl FileStorage {
	pub fn new(dir: impl Into<PathBuf>) -> Self {
		Self { dir: dir.into() }
	}

	/// Path backing `key`.
	pub fn path_for(&self, key: &str) -> PathBuf {
		let file: String = key
			.chars()
			.map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' { c } else { '_' })
			.collect();
		self.dir.join(format!("{file}.json"))
	}
}

fn storage_err(key: &str) -> impl FnOnce(std::io::Error) -> Error + '_ {
	move |source| Error::Storage {
		key: key.to_string(),
		source,
	}
}

impl SessionStorage for FileStorage {
	fn get(&self, key: &str) -> Result<Option<String>> {
		match fs::read_to_string(self.path_for(key)) {
			Ok(content) => Ok(Some(content)),
			Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
			Err(err) => Err(storage_err(key)(err)),
		}
	}

	fn set(&self, key: &str, value: &str) -> Result<()> {
		let path = self.path_for(key);
		fs::create_dir_all(&self.dir).map_err(storage_err(key))?;
		fs::write(&path, value).map_err(storage_err(key))?;
		#[cfg(unix)]
		{
			use std::os::unix::fs::PermissionsExt;
			fs::set_permissions(&path, fs::Permissions::from_mode(0o600)).map_err(storage_err(key))?;
		}
		Ok(())
	}

	fn remove(&self, key: &str) -> Result<()> {
		match fs::remove_file(self.path_for(key)) {
			Ok(()) => Ok(()),
			Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
			Err(err) => Err(storage_err(key)(err)),
		}
	}
}

/// In-process storage; nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStorage {
	entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
	pub fn new() -> Self {
		Self::default()
	}
}

impl SessionStorage for MemoryStorage {
	fn get(&self, key: &str) -> Result<Option<String>> {
		Ok(self.entries.lock().get(key).cloned())
	}

	fn set(&self, key: &str, value: &str) -> Result<()> {
		self.entries.lock().insert(key.to_string(), value.to_string());
		Ok(())
	}

	fn remove(&self, key: &str) -> Result<()> {
		self.entries.lock().remove(key);
		Ok(())
	}
}
