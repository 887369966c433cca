mod common;

// std
use std::time::Duration as StdDuration;
// crates.io
use time::{Duration, OffsetDateTime};
// self
use sigv4_broker::{
	auth::{IdentityId, IdentityToken},
	gate::{Gate, RefreshState},
	store::{CredentialPersistence, FilePersistence, MemoryPersistence},
};
use common::*;

fn token(value: &str) -> IdentityToken {
	IdentityToken::new(IdentityId::new(IDENTITY).expect("Identity fixture should be valid."), value)
}

#[tokio::test]
async fn sign_in_installs_and_persists_credentials() {
	let transport = ScriptedTransport::new(StdDuration::ZERO);
	let exchange = StaticExchange::default();
	let persistence = MemoryPersistence::default();
	let gate: Gate<ScriptedTransport> =
		Gate::with_transport(config(), transport.clone(), exchange.clone())
			.with_persistence(persistence.clone());
	let installed = gate.sign_in(token("open-id-login")).await.expect("Sign-in should succeed.");

	assert_eq!(installed.access_key_id.as_ref(), "ASIAFRESH1");
	assert_eq!(exchange.tokens(), vec!["open-id-login".to_owned()]);

	let persisted = persistence
		.load()
		.await
		.expect("Persistence load should succeed.")
		.expect("Sign-in should persist the identity.");

	assert_eq!(persisted.credentials, *installed);
	assert_eq!(persisted.params.identity_id.as_ref(), IDENTITY);

	gate.admit(api_request("/a")).await.expect("Admission should succeed.");

	assert_eq!(transport.refresh_calls(), 0);
	assert_eq!(signing_key_id(&transport.api_requests()[0]).as_deref(), Some("ASIAFRESH1"));

	gate.sign_out().await.expect("Sign-out should succeed.");

	assert!(gate.credentials().get().is_none());
	assert!(persistence.load().await.expect("Persistence load should succeed.").is_none());
}

#[tokio::test]
async fn restore_seeds_a_new_gate_from_persistence() {
	let transport = ScriptedTransport::new(StdDuration::ZERO);
	let exchange = StaticExchange::default();
	let persistence = MemoryPersistence::default();
	let first = refreshing_gate(&transport, &exchange).with_persistence(persistence.clone());

	first.admit(api_request("/a")).await.expect("Refreshing admission should succeed.");

	let second = refreshing_gate(&transport, &exchange).with_persistence(persistence.clone());

	assert!(second.restore().await.expect("Restore should succeed."));

	second.admit(api_request("/b")).await.expect("Restored admission should succeed.");

	assert_eq!(transport.refresh_calls(), 1, "Restored credentials should be reused.");
	assert_eq!(signing_key_id(&transport.api_requests()[1]).as_deref(), Some("ASIAFRESH1"));
}

#[tokio::test]
async fn refresh_after_restore_persists_the_new_set() {
	let dir = std::env::temp_dir().join(format!("sigv4-broker-session-{}", std::process::id()));
	let path = dir.join("identity.json");
	let persistence = FilePersistence::open(&path).expect("File persistence should open.");
	let transport = ScriptedTransport::new(StdDuration::ZERO);
	let exchange = StaticExchange::default();
	let seed: Gate<ScriptedTransport> =
		Gate::with_transport(config(), transport.clone(), exchange.clone())
			.with_persistence(persistence.clone());

	seed.sign_in(token("open-id-seed")).await.expect("Seeding sign-in should succeed.");

	let gate = refreshing_gate(&transport, &exchange)
		.with_persistence(FilePersistence::open(&path).expect("File persistence should reopen."));

	assert!(gate.restore().await.expect("Restore should succeed."));

	let restored = gate.credentials().get().expect("Restored credentials should be stored.");

	assert_eq!(restored.access_key_id.as_ref(), "ASIAFRESH1");

	// Expire the restored set to force the admission to refresh.
	gate.credentials()
		.set(credentials("ASIASTALE", OffsetDateTime::now_utc() - Duration::minutes(1)));
	gate.admit(api_request("/a")).await.expect("Admission should succeed.");

	assert_eq!(transport.refresh_calls(), 1);
	assert_eq!(gate.refresh_state(), RefreshState::Idle);

	let persisted = persistence
		.load()
		.await
		.expect("Persistence load should succeed.")
		.expect("Refreshed identity should be persisted.");

	assert_eq!(persisted.credentials.access_key_id.as_ref(), "ASIAFRESH2");

	let _ = std::fs::remove_dir_all(dir);
}

#[tokio::test]
async fn restore_without_persistence_is_a_no_op() {
	let transport = ScriptedTransport::new(StdDuration::ZERO);
	let gate = refreshing_gate(&transport, &StaticExchange::default());

	assert!(!gate.restore().await.expect("Restore should succeed."));
	assert!(gate.credentials().get().is_none());
}
