//! In-process credential store plus the persistence contract and built-in backends.

pub mod file;
pub mod memory;

pub use file::FilePersistence;
pub use memory::MemoryPersistence;

// self
use crate::{
	_prelude::*,
	auth::{CredentialSet, IdentityParams},
};

/// Boxed future returned by [`CredentialPersistence`] implementations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Durable storage for the last identity parameters and exchange result.
///
/// The gate reads it on [`restore`](crate::gate::Gate::restore), writes it after every
/// successful exchange, and clears it on sign-out.
pub trait CredentialPersistence
where
	Self: Send + Sync,
{
	/// Loads the persisted identity, if any.
	fn load(&self) -> StoreFuture<'_, Option<PersistedIdentity>>;

	/// Persists or replaces the identity.
	fn save(&self, identity: PersistedIdentity) -> StoreFuture<'_, ()>;

	/// Removes any persisted identity.
	fn clear(&self) -> StoreFuture<'_, ()>;
}

/// Error type produced by [`CredentialPersistence`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Identity parameters and the credentials they were exchanged for.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PersistedIdentity {
	/// Parameters sent to the identity service.
	#[serde(rename = "cognito-identity.params")]
	pub params: IdentityParams,
	/// Exchange result.
	#[serde(rename = "cognito-identity.data")]
	pub credentials: CredentialSet,
}

/// Holds the active credential set.
///
/// Sets are swapped wholesale; readers receive an `Arc` snapshot that stays valid after a
/// concurrent replacement.
#[derive(Debug, Default)]
pub struct CredentialStore(RwLock<Option<Arc<CredentialSet>>>);
impl CredentialStore {
	/// Returns the current credential set.
	pub fn get(&self) -> Option<Arc<CredentialSet>> {
		self.0.read().clone()
	}

	/// Replaces the current credential set, returning the installed snapshot.
	pub fn set(&self, credentials: CredentialSet) -> Arc<CredentialSet> {
		let credentials = Arc::new(credentials);

		*self.0.write() = Some(credentials.clone());

		credentials
	}

	/// Drops the current credential set.
	pub fn clear(&self) {
		*self.0.write() = None;
	}

	/// Returns `true` when nothing is stored or the stored set expires before `now + offset`.
	pub fn is_expired_at(&self, now: OffsetDateTime, offset: Duration) -> bool {
		self.0.read().as_ref().is_none_or(|credentials| credentials.is_expired_at(now, offset))
	}

	/// Checks expiry against the current UTC clock.
	pub fn is_expired(&self, offset: Duration) -> bool {
		self.is_expired_at(OffsetDateTime::now_utc(), offset)
	}
}
