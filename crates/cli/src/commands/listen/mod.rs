//! WebSocket server the page bridge connects to.
//!
//! # Protocol
//!
//! 1. Bridge connects and sends `hello { token, providers }`
//! 2. Server validates the token and responds with `welcome` or `rejected`
//! 3. Server restores the stored session through the bridge, or connects
//!    through the preferred wallet when there is nothing to restore
//! 4. Server sends `request`s; the bridge answers with `response`s and
//!    forwards provider `event`s until the page goes away
//!
//! Only one bridge is attached at a time; the session manager is shared.


use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use futures::SinkExt;
use futures::stream::StreamExt;
use rand::RngCore;
use rand::rngs::OsRng;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, warn};
use wallet::{ProviderDescriptor, RestoreOutcome, SessionManager};
use wallet_protocol::{BridgeMessage, HostMessage};
use wallet_runtime::{BridgeConnection, BridgeHost};

use crate::cli::ListenArgs;
use crate::config::CliConfig;
use crate::error::{CliError, Result};
use crate::output::{self, EventLine, OutputFormat, RestoreLine};

const TOKEN_BYTES: usize = 16;

/// Sink for progress lines; printing in the binary, collecting in tests.
pub type Report = Arc<dyn Fn(EventLine) + Send + Sync>;

/// What to do when there is no session to restore.
#[derive(Debug, Clone, Default)]
pub struct ConnectPolicy {
	/// Wallet name (case-insensitive) or exact injection path.
	pub preferred: Option<String>,
	pub auto_connect: bool,
}

impl ConnectPolicy {
	/// Picks the descriptor to connect through.
	///
	/// With a preference set, only a matching provider qualifies; otherwise
	/// the first detected one does.
	pub fn choose<'a>(&self, descriptors: &'a [ProviderDescriptor]) -> Option<&'a ProviderDescriptor> {
		match &self.preferred {
			Some(wanted) => descriptors
				.iter()
				.find(|d| d.path == *wanted || d.name.eq_ignore_ascii_case(wanted)),
			None => descriptors.first(),
		}
	}
}

#[derive(Clone)]
struct ListenState {
	token: String,
	manager: Arc<SessionManager>,
	policy: ConnectPolicy,
	attached: Arc<Mutex<()>>,
	report: Report,
}

/// Runs the listener until Ctrl+C.
pub async fn run(args: ListenArgs, config: CliConfig, manager: Arc<SessionManager>, format: OutputFormat) -> Result<()> {
	let host = args.host.unwrap_or(config.listen_host);
	let port = args.port.unwrap_or(config.listen_port);
	let token = args.token.unwrap_or_else(generate_token);

	let report: Report = Arc::new(move |line: EventLine| output::print_event(&line, format));

	let mut events = manager.subscribe();
	let wallet_report = Arc::clone(&report);
	tokio::spawn(async move {
		while let Some(event) = events.recv().await {
			wallet_report(EventLine::Wallet { event });
		}
	});

	let state = ListenState {
		token: token.clone(),
		manager,
		policy: ConnectPolicy {
			preferred: args.wallet.or(config.preferred_wallet),
			auto_connect: config.auto_connect && !args.no_connect,
		},
		attached: Arc::new(Mutex::new(())),
		report,
	};

	let app = Router::new().route("/", get(ws_handler)).with_state(state);

	let addr = format!("{host}:{port}");
	let listener = tokio::net::TcpListener::bind(&addr)
		.await
		.map_err(|source| CliError::Bind {
			addr: addr.clone(),
			source,
		})?;

	let banner = format!("Listening for the page bridge on ws://{addr}/\n\nToken: {token}\n\nPress Ctrl+C to stop.\n");
	// keep stdout machine-readable in json modes
	if format == OutputFormat::Text {
		println!("{banner}");
	} else {
		eprintln!("{banner}");
	}
	info!(target = "wallet.listen", %addr, "listening");

	axum::serve(listener, app)
		.with_graceful_shutdown(async {
			let _ = tokio::signal::ctrl_c().await;
		})
		.await
		.with_context(|| format!("serving ws://{addr}/"))
		.map_err(CliError::Server)?;

	Ok(())
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<ListenState>) -> impl IntoResponse {
	ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: ListenState) {
	let (mut sender, mut receiver) = socket.split();
	let (out_tx, mut out_rx) = mpsc::unbounded_channel::<HostMessage>();
	let (in_tx, in_rx) = mpsc::unbounded_channel::<BridgeMessage>();

	let writer = tokio::spawn(async move {
		while let Some(msg) = out_rx.recv().await {
			let json = match serde_json::to_string(&msg) {
				Ok(json) => json,
				Err(err) => {
					warn!(target = "wallet.listen", error = %err, "failed to encode host message");
					continue;
				}
			};
			if sender.send(Message::Text(json.into())).await.is_err() {
				break;
			}
		}
		let _ = sender.close().await;
	});

	let reader = tokio::spawn(async move {
		while let Some(msg) = receiver.next().await {
			let text = match msg {
				Ok(Message::Text(t)) => t,
				Ok(Message::Close(_)) => break,
				Err(err) => {
					debug!(target = "wallet.listen", error = %err, "websocket error");
					break;
				}
				_ => continue,
			};
			match serde_json::from_str::<BridgeMessage>(&text) {
				Ok(msg) => {
					if in_tx.send(msg).is_err() {
						break;
					}
				}
				Err(err) => warn!(target = "wallet.listen", error = %err, "invalid bridge message"),
			}
		}
	});

	let attached = serve_bridge(&state, in_rx, out_tx).await;
	reader.abort();
	if attached {
		// the session's provider handle keeps a sender alive; the page is gone
		writer.abort();
	} else {
		// flush the rejection
		let _ = writer.await;
	}
}

/// Drives one bridge connection from handshake to close.
///
/// Returns whether the bridge was accepted.
async fn serve_bridge(state: &ListenState, mut inbound: mpsc::UnboundedReceiver<BridgeMessage>, outbound: mpsc::UnboundedSender<HostMessage>) -> bool {
	let providers = match inbound.recv().await {
		Some(BridgeMessage::Hello { token, providers }) if token == state.token => providers,
		Some(BridgeMessage::Hello { .. }) => {
			info!(target = "wallet.listen", "bridge rejected: invalid token");
			let _ = outbound.send(HostMessage::Rejected {
				reason: "Invalid token".into(),
			});
			return false;
		}
		Some(_) => {
			let _ = outbound.send(HostMessage::Rejected {
				reason: "Expected hello".into(),
			});
			return false;
		}
		None => return false,
	};

	let Ok(_attached) = state.attached.try_lock() else {
		let _ = outbound.send(HostMessage::Rejected {
			reason: "Another page bridge is attached".into(),
		});
		return false;
	};

	let _ = outbound.send(HostMessage::Welcome {
		version: env!("CARGO_PKG_VERSION").into(),
	});

	let conn = Arc::new(BridgeConnection::new(outbound));
	let host = BridgeHost::new(Arc::clone(&conn), providers);
	debug!(target = "wallet.listen", paths = ?host.paths(), "bridge announced injection paths");
	let detected = state.manager.detect(&host);
	(state.report)(EventLine::Bridge {
		providers: detected.iter().map(|d| format!("{} ({})", d.name, d.path)).collect(),
	});

	let session_task = {
		let manager = Arc::clone(&state.manager);
		let policy = state.policy.clone();
		let report = Arc::clone(&state.report);
		tokio::spawn(async move { establish(&manager, &host, &policy, &report).await })
	};

	while let Some(msg) = inbound.recv().await {
		if let BridgeMessage::Hello { .. } = msg {
			debug!(target = "wallet.listen", "ignoring repeated hello");
			continue;
		}
		if let Err(err) = conn.dispatch(msg) {
			warn!(target = "wallet.listen", error = %err, "bridge message not handled");
		}
	}

	conn.close();
	let _ = session_task.await;
	(state.report)(EventLine::BridgeClosed);
	true
}

/// Restores the stored session, falling back to a fresh connect.
async fn establish(manager: &SessionManager, host: &BridgeHost, policy: &ConnectPolicy, report: &Report) {
	match manager.restore(host).await {
		Ok(outcome) => {
			let restored = matches!(outcome, RestoreOutcome::Restored(_));
			report(EventLine::Restore {
				outcome: RestoreLine::from(&outcome),
			});
			if restored {
				return;
			}
		}
		Err(err) => warn!(target = "wallet.listen", error = %err, "restore failed"),
	}

	if !policy.auto_connect {
		return;
	}
	let descriptors = manager.detect(host);
	let result = manager.connect(policy.choose(&descriptors)).await;
	report(EventLine::Connect { result });
}

/// Hex-encoded token from the OS random source.
fn generate_token() -> String {
	let mut bytes = [0u8; TOKEN_BYTES];
	OsRng.fill_bytes(&mut bytes);
	hex::encode(bytes)
}
