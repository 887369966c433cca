//! JSON-file [`CredentialPersistence`] for desktop tools and long-running agents.

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	store::{CredentialPersistence, PersistedIdentity, StoreError, StoreFuture},
};

/// Persists the identity to a JSON file, replacing it atomically on every write.
#[derive(Clone, Debug)]
pub struct FilePersistence {
	path: PathBuf,
	lock: Arc<Mutex<()>>,
}
impl FilePersistence {
	/// Uses `path` as the backing file, creating its parent directory when missing.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		Ok(Self { path, lock: Arc::new(Mutex::new(())) })
	}

	/// Location of the backing file.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn read_now(path: &Path) -> Result<Option<PersistedIdentity>, StoreError> {
		if !path.exists() {
			return Ok(None);
		}

		let bytes = fs::read(path).map_err(|e| StoreError::Backend {
			message: format!("Failed to read {}: {e}", path.display()),
		})?;

		if bytes.is_empty() {
			return Ok(None);
		}

		serde_json::from_slice(&bytes).map(Some).map_err(|e| StoreError::Serialization {
			message: format!("Failed to parse {}: {e}", path.display()),
		})
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
				message: format!("Failed to create store directory {}: {e}", parent.display()),
			})?;
		}

		Ok(())
	}

	fn write_now(path: &Path, identity: &PersistedIdentity) -> Result<(), StoreError> {
		Self::ensure_parent_exists(path)?;

		let serialized =
			serde_json::to_vec_pretty(identity).map_err(|e| StoreError::Serialization {
				message: format!("Failed to serialize persisted identity: {e}"),
			})?;
		let mut tmp_path = path.to_path_buf();

		tmp_path.set_extension("tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| StoreError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(&serialized).map_err(|e| StoreError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| StoreError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, path).map_err(|e| StoreError::Backend {
			message: format!("Failed to replace {}: {e}", path.display()),
		})
	}

	fn remove_now(path: &Path) -> Result<(), StoreError> {
		match fs::remove_file(path) {
			Ok(()) => Ok(()),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
			Err(e) => Err(StoreError::Backend {
				message: format!("Failed to remove {}: {e}", path.display()),
			}),
		}
	}
}
impl CredentialPersistence for FilePersistence {
	fn load(&self) -> StoreFuture<'_, Option<PersistedIdentity>> {
		Box::pin(async move {
			let _guard = self.lock.lock();

			Self::read_now(&self.path)
		})
	}

	fn save(&self, identity: PersistedIdentity) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			let _guard = self.lock.lock();

			Self::write_now(&self.path, &identity)
		})
	}

	fn clear(&self) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			let _guard = self.lock.lock();

			Self::remove_now(&self.path)
		})
	}
}
