use std::sync::Arc;

use serde_json::json;
use tokio::sync::mpsc;
use wallet_protocol::{BridgeMessage, HostMessage, InjectedProvider, ProviderFlags, RpcError};

use super::*;

fn create_test_connection() -> (Arc<BridgeConnection>, mpsc::UnboundedReceiver<HostMessage>) {
	let (tx, rx) = mpsc::unbounded_channel();
	(Arc::new(BridgeConnection::new(tx)), rx)
}

fn request_id(msg: HostMessage) -> u64 {
	match msg {
		HostMessage::Request { id, .. } => id,
		other => panic!("expected request, got {other:?}"),
	}
}

#[tokio::test]
async fn test_request_ids_increment() {
	let (conn, mut rx) = create_test_connection();

	let c1 = Arc::clone(&conn);
	let first = tokio::spawn(async move { c1.send_request("ethereum", "eth_accounts", Value::Null).await });
	let id1 = request_id(rx.recv().await.unwrap());

	let c2 = Arc::clone(&conn);
	let second = tokio::spawn(async move { c2.send_request("ethereum", "eth_chainId", Value::Null).await });
	let id2 = request_id(rx.recv().await.unwrap());

	assert_eq!(id2, id1 + 1);
	assert_eq!(conn.pending_requests(), 2);

	conn.close();
	assert!(first.await.unwrap().is_err());
	assert!(second.await.unwrap().is_err());
}

#[tokio::test]
async fn test_dispatch_response_success() {
	let (conn, mut rx) = create_test_connection();

	let c = Arc::clone(&conn);
	let call = tokio::spawn(async move { c.send_request("ethereum", "eth_requestAccounts", Value::Null).await });

	let msg = rx.recv().await.unwrap();
	match &msg {
		HostMessage::Request { path, method, .. } => {
			assert_eq!(path, "ethereum");
			assert_eq!(method, "eth_requestAccounts");
		}
		other => panic!("expected request, got {other:?}"),
	}
	let id = request_id(msg);

	conn.dispatch(BridgeMessage::Response {
		id,
		result: Some(json!(["0xabc"])),
		error: None,
	})
	.unwrap();

	let result = call.await.unwrap().unwrap();
	assert_eq!(result, json!(["0xabc"]));
	assert_eq!(conn.pending_requests(), 0);
}

#[tokio::test]
async fn test_dispatch_response_error() {
	let (conn, mut rx) = create_test_connection();

	let c = Arc::clone(&conn);
	let call = tokio::spawn(async move { c.send_request("ethereum", "eth_requestAccounts", Value::Null).await });
	let id = request_id(rx.recv().await.unwrap());

	conn.dispatch(BridgeMessage::Response {
		id,
		result: None,
		error: Some(RpcError {
			code: 4001,
			message: "User rejected the request.".into(),
		}),
	})
	.unwrap();

	let err = call.await.unwrap().unwrap_err();
	assert!(err.is_user_rejected());
}

#[test]
fn test_response_for_unknown_id_is_protocol_error() {
	let (conn, _rx) = create_test_connection();
	let err = conn
		.dispatch(BridgeMessage::Response {
			id: 99,
			result: Some(Value::Null),
			error: None,
		})
		.unwrap_err();
	assert!(matches!(err, Error::Protocol(_)));
}

#[tokio::test]
async fn test_dropped_request_removes_callback() {
	let (conn, mut rx) = create_test_connection();

	let c = Arc::clone(&conn);
	let call = tokio::spawn(async move { c.send_request("solana", "connect", json!({"onlyIfTrusted": true})).await });
	let _ = rx.recv().await.unwrap();
	assert_eq!(conn.pending_requests(), 1);

	call.abort();
	let _ = call.await;
	assert_eq!(conn.pending_requests(), 0);
}

#[tokio::test]
async fn test_requests_after_close_report_provider_gone() {
	let (conn, _rx) = create_test_connection();
	conn.close();
	let err = conn.send_request("ethereum", "eth_accounts", Value::Null).await.unwrap_err();
	assert!(matches!(err, Error::ProviderGone(ref p) if p == "ethereum"));
	assert!(err.is_disconnected());
}

#[tokio::test]
async fn test_events_route_by_path_in_order() {
	let (conn, _rx) = create_test_connection();
	let mut eth = conn.subscribe("ethereum");
	let mut sol = conn.subscribe("solana");

	for addr in ["0x1", "0x2"] {
		conn.dispatch(BridgeMessage::Event {
			path: "ethereum".into(),
			name: "accountsChanged".into(),
			payload: json!([addr]),
		})
		.unwrap();
	}

	assert_eq!(eth.recv().await.unwrap().payload, json!(["0x1"]));
	assert_eq!(eth.recv().await.unwrap().payload, json!(["0x2"]));
	assert!(sol.try_recv().is_err());

	conn.close();
	assert!(matches!(eth.recv().await, Err(broadcast::error::RecvError::Closed)));
}

#[test]
fn test_host_shares_handle_for_same_object() {
	let (conn, _rx) = create_test_connection();
	let host = BridgeHost::new(
		conn,
		vec![
			InjectedProvider {
				path: "solana".into(),
				object_id: 3,
				flags: ProviderFlags {
					is_phantom: true,
					..Default::default()
				},
			},
			InjectedProvider {
				path: "phantom.solana".into(),
				object_id: 3,
				flags: ProviderFlags {
					is_phantom: true,
					..Default::default()
				},
			},
		],
	);

	let a = host.probe("solana").unwrap();
	let b = host.probe("phantom.solana").unwrap();
	assert!(Arc::ptr_eq(&a.handle, &b.handle));
	assert_eq!(a.handle.path(), "solana");
	assert!(host.probe("ethereum").is_none());
	assert_eq!(host.paths(), vec!["phantom.solana", "solana"]);
}
