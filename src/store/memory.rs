//! Thread-safe in-memory [`CredentialPersistence`] for tests and short-lived processes.

// self
use crate::{
	_prelude::*,
	store::{CredentialPersistence, PersistedIdentity, StoreError, StoreFuture},
};

type Slot = Arc<RwLock<Option<PersistedIdentity>>>;

/// Keeps the persisted identity in-process.
#[derive(Clone, Debug, Default)]
pub struct MemoryPersistence(Slot);
impl MemoryPersistence {
	/// Creates a backend pre-seeded with `identity`.
	pub fn with_identity(identity: PersistedIdentity) -> Self {
		Self(Arc::new(RwLock::new(Some(identity))))
	}

	fn replace_now(slot: Slot, identity: Option<PersistedIdentity>) -> Result<(), StoreError> {
		*slot.write() = identity;

		Ok(())
	}
}
impl CredentialPersistence for MemoryPersistence {
	fn load(&self) -> StoreFuture<'_, Option<PersistedIdentity>> {
		let slot = self.0.clone();

		Box::pin(async move { Ok(slot.read().clone()) })
	}

	fn save(&self, identity: PersistedIdentity) -> StoreFuture<'_, ()> {
		let slot = self.0.clone();

		Box::pin(async move { Self::replace_now(slot, Some(identity)) })
	}

	fn clear(&self) -> StoreFuture<'_, ()> {
		let slot = self.0.clone();

		Box::pin(async move { Self::replace_now(slot, None) })
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::auth::{CredentialSet, IdentityId, IdentityParams, IdentityToken};

	fn identity() -> PersistedIdentity {
		let identity_id =
			IdentityId::new("eu-west-1:abc").expect("Identity fixture should be valid.");
		let credentials = CredentialSet::builder(identity_id.clone())
			.access_key_id("ASIAEXAMPLE")
			.secret_access_key("secret")
			.expires_in(Duration::hours(1))
			.build()
			.expect("Credential fixture should build.");

		PersistedIdentity {
			params: IdentityParams::from(&IdentityToken::new(identity_id, "token")),
			credentials,
		}
	}

	#[tokio::test]
	async fn save_load_and_clear() {
		let backend = MemoryPersistence::default();
		let fixture = identity();

		assert!(backend.load().await.expect("Empty load should succeed.").is_none());

		backend.save(fixture.clone()).await.expect("Save should succeed.");

		let loaded = backend
			.load()
			.await
			.expect("Load should succeed.")
			.expect("Saved identity should be returned.");

		assert_eq!(loaded, fixture);

		backend.clear().await.expect("Clear should succeed.");

		assert!(backend.load().await.expect("Load after clear should succeed.").is_none());
	}

	#[tokio::test]
	async fn clones_share_the_same_slot() {
		let backend = MemoryPersistence::with_identity(identity());
		let clone = backend.clone();

		clone.clear().await.expect("Clear should succeed.");

		assert!(backend.load().await.expect("Load should succeed.").is_none());
	}
}
