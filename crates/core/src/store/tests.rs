use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use wallet_protocol::{ChainId, WalletKind};

use super::*;
use crate::clock::ManualClock;

const DAY: Duration = Duration::from_secs(24 * 60 * 60);

fn memory_store(clock: Arc<ManualClock>) -> (SessionStore, Arc<MemoryStorage>) {
	let storage = Arc::new(MemoryStorage::new());
	let store = SessionStore::new(storage.clone(), clock, SESSION_KEY, DAY);
	(store, storage)
}

#[test]
fn save_then_load_returns_equal_record() {
	let clock = Arc::new(ManualClock::new(1_700_000_000_000));
	let (store, _) = memory_store(clock);

	let session = store.new_session("0xABC", ChainId::from("0x1"), WalletKind::Ethereum);
	store.save(&session).unwrap();

	assert_eq!(store.load().unwrap(), Some(session));
}

#[test]
fn load_returns_none_at_expiry_and_removes_record() {
	let clock = Arc::new(ManualClock::new(10_000));
	let (store, storage) = memory_store(clock.clone());

	let session = store.new_session("0xABC", ChainId::from("0x1"), WalletKind::Ethereum);
	store.save(&session).unwrap();

	clock.set(session.expires_at_ms - 1);
	assert!(store.load().unwrap().is_some());

	clock.set(session.expires_at_ms);
	assert_eq!(store.load().unwrap(), None);
	assert_eq!(storage.get(SESSION_KEY).unwrap(), None);
}

#[test]
fn default_lifetime_is_one_day() {
	let clock = Arc::new(ManualClock::new(0));
	let (store, _) = memory_store(clock);
	let session = store.new_session("0xABC", ChainId::Number(1), WalletKind::Ethereum);
	assert_eq!(session.expires_at_ms - session.connected_at_ms, DAY.as_millis() as u64);
}

#[test]
fn save_overwrites_prior_record() {
	let clock = Arc::new(ManualClock::new(0));
	let (store, _) = memory_store(clock);

	store.save(&store.new_session("0xAAA", ChainId::Number(1), WalletKind::Ethereum)).unwrap();
	let second = store.new_session("7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU", ChainId::from("mainnet-beta"), WalletKind::Solana);
	store.save(&second).unwrap();

	assert_eq!(store.load().unwrap(), Some(second));
}

#[test]
fn record_without_schema_version_is_removed() {
	let clock = Arc::new(ManualClock::new(0));
	let (store, storage) = memory_store(clock);
	let session = store.new_session("0xABC", ChainId::Number(1), WalletKind::Ethereum);
	storage.set(SESSION_KEY, &serde_json::to_string(&session).unwrap()).unwrap();

	assert_eq!(store.load().unwrap(), None);
	assert_eq!(storage.get(SESSION_KEY).unwrap(), None);
}

#[test]
fn record_with_unknown_schema_version_is_removed() {
	let clock = Arc::new(ManualClock::new(0));
	let (store, storage) = memory_store(clock);
	let session = store.new_session("0xABC", ChainId::Number(1), WalletKind::Ethereum);
	let mut value = serde_json::to_value(&session).unwrap();
	value["schemaVersion"] = serde_json::json!(99);
	storage.set(SESSION_KEY, &value.to_string()).unwrap();

	assert_eq!(store.load().unwrap(), None);
	assert_eq!(storage.get(SESSION_KEY).unwrap(), None);
}

#[test]
fn garbage_record_is_removed() {
	let clock = Arc::new(ManualClock::new(0));
	let (store, storage) = memory_store(clock);
	storage.set(SESSION_KEY, "not json").unwrap();

	assert_eq!(store.load().unwrap(), None);
	assert_eq!(storage.get(SESSION_KEY).unwrap(), None);
}

#[test]
fn record_violating_expiry_invariant_is_removed() {
	let clock = Arc::new(ManualClock::new(0));
	let (store, storage) = memory_store(clock);
	let record = serde_json::json!({
		"schemaVersion": SESSION_SCHEMA_VERSION,
		"address": "0xABC",
		"chainId": "0x1",
		"walletKind": "ethereum",
		"connectedAtMs": 500,
		"expiresAtMs": 500
	});
	storage.set(SESSION_KEY, &record.to_string()).unwrap();

	assert_eq!(store.load().unwrap(), None);
	assert_eq!(storage.get(SESSION_KEY).unwrap(), None);
}

#[test]
fn update_address_keeps_timestamps() {
	let clock = Arc::new(ManualClock::new(100));
	let (store, _) = memory_store(clock.clone());
	let session = store.new_session("0xAAA", ChainId::Number(1), WalletKind::Ethereum);
	store.save(&session).unwrap();

	clock.advance(Duration::from_secs(60));
	let updated = store.update_address("0xBBB").unwrap().unwrap();
	assert_eq!(updated.address, "0xBBB");
	assert_eq!(updated.connected_at_ms, session.connected_at_ms);
	assert_eq!(updated.expires_at_ms, session.expires_at_ms);
	assert_eq!(store.load().unwrap(), Some(updated));
}

#[test]
fn update_without_session_is_noop() {
	let clock = Arc::new(ManualClock::new(0));
	let (store, storage) = memory_store(clock);
	assert_eq!(store.update_chain(ChainId::from("0x89")).unwrap(), None);
	assert_eq!(storage.get(SESSION_KEY).unwrap(), None);
}

#[test]
fn file_backed_store_survives_reopen() {
	let tmp = TempDir::new().unwrap();
	let clock = Arc::new(ManualClock::new(1_000));

	let first = SessionStore::new(Arc::new(FileStorage::new(tmp.path())), clock.clone(), SESSION_KEY, DAY);
	let session = first.new_session("0xABC", ChainId::from("0x1"), WalletKind::Ethereum);
	first.save(&session).unwrap();

	let reopened = SessionStore::new(Arc::new(FileStorage::new(tmp.path())), clock, SESSION_KEY, DAY);
	assert_eq!(reopened.load().unwrap(), Some(session));

	reopened.clear().unwrap();
	assert_eq!(first.load().unwrap(), None);
}

#[test]
fn huge_lifetime_saturates_expiry() {
	let clock = Arc::new(ManualClock::new(5_000));
	let store = SessionStore::new(Arc::new(MemoryStorage::new()), clock, SESSION_KEY, Duration::from_secs(u64::MAX));

	let session = store.new_session("0xABC", ChainId::from("0x1"), WalletKind::Ethereum);
	assert_eq!(session.expires_at_ms, u64::MAX);
	store.save(&session).unwrap();
	assert_eq!(store.load().unwrap(), Some(session));
}
