//! Connection lifecycle orchestration.
//!
//! [`ConnectionManager`] owns the only mutable [`ConnectionState`]. Every
//! other component reads it or asks the manager to move it. Transitions:
//!
//! ```text
//! start ──restore──────────────────────────────▶ Connected
//!   └──▶ Discovering ──embedded──▶ AwaitingPairing(None) ──▶ Connected
//!              │      └─remote───▶ AwaitingPairing(link) ──▶ Connected
//!              └──failure / cancel / pairing lost / disconnect ──▶ Disconnected
//! ```
//!
//! Each connection attempt gets a number. Async steps (registry fetch,
//! pairing) only apply their result while their attempt is still current,
//! so a cancelled attempt can never resurrect itself.

use std::collections::HashSet;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::task::AbortHandle;
use tonlink_protocol::{ConnectionCapability, ConnectionSource, RemoteSource, Session, WalletAccount, WalletDescriptor};
use tracing::{debug, info, warn};

use crate::config::ConnectorConfig;
use crate::error::{ConnectError, Result};
use crate::registry::{HttpWalletRegistry, WalletRegistry};
use crate::state::ConnectionState;
use crate::status::{StatusBus, StatusSubscription};
use crate::store::{FileSessionStore, MemorySessionStore, SessionStore, now_ts};
use crate::strategy::{StrategyInput, select_strategy};
use crate::transport::{PairingTransport, TransportError};

/// Outcome of [`ConnectionManager::connect`]: the state the attempt settled in.
pub type ConnectResult = std::result::Result<ConnectionState, ConnectError>;

struct Machine {
	state: ConnectionState,
	attempt: u64,
	pending: Option<AbortHandle>,
	disposed: bool,
}

struct Inner {
	config: ConnectorConfig,
	registry: Arc<dyn WalletRegistry>,
	store: Arc<dyn SessionStore>,
	transport: Arc<dyn PairingTransport>,
	machine: Mutex<Machine>,
	/// Held across state change and fan-out so listeners see transition order.
	emit_order: Mutex<()>,
	wallets: Mutex<Vec<WalletDescriptor>>,
	last_error: Mutex<Option<ConnectError>>,
	/// Sessions with a signing request outstanding.
	in_flight: Arc<Mutex<HashSet<Session>>>,
	status: StatusBus,
}

impl Inner {
	/// Runs `f` against the machine and notifies listeners if the state changed.
	fn update<R>(&self, f: impl FnOnce(&mut Machine) -> R) -> R {
		let _order = self.emit_order.lock();
		let (result, changed) = {
			let mut machine = self.machine.lock();
			let before = machine.state.clone();
			let result = f(&mut machine);
			let changed = (machine.state != before).then(|| machine.state.clone());
			(result, changed)
		};
		if let Some(state) = changed {
			debug!(target = "tonlink.session", state = state.label(), "connection state changed");
			self.status.emit(&state);
		}
		result
	}

	fn current_state(&self) -> ConnectionState {
		self.machine.lock().state.clone()
	}

	/// Moves `Disconnected` to `Discovering` under a fresh attempt number.
	fn begin_attempt(&self) -> Option<u64> {
		self.update(|m| {
			if m.disposed || m.state != ConnectionState::Disconnected {
				return None;
			}
			m.attempt += 1;
			*self.last_error.lock() = None;
			m.state = ConnectionState::Discovering;
			Some(m.attempt)
		})
	}

	/// Applies `next` while `attempt` is current.
	fn advance(&self, attempt: u64, next: ConnectionState) -> bool {
		self.update(|m| {
			if m.attempt != attempt {
				return false;
			}
			m.state = next;
			true
		})
	}

	/// Ends `attempt` in `Disconnected` and records why.
	fn fail(&self, attempt: u64, err: ConnectError) -> ConnectResult {
		let applied = self.update(|m| {
			if m.attempt != attempt {
				return false;
			}
			m.pending = None;
			*self.last_error.lock() = Some(err.clone());
			m.state = ConnectionState::Disconnected;
			true
		});
		if !applied {
			debug!(target = "tonlink.session", attempt, error = %err, "ignoring failure of superseded attempt");
			return Ok(self.current_state());
		}
		warn!(target = "tonlink.session", attempt, error = %err, "connection attempt failed");
		Err(err)
	}

	/// Enters `Connected` for `attempt` and persists the session.
	fn establish(&self, attempt: u64, session: Session) -> ConnectResult {
		let store = Arc::clone(&self.store);
		let applied = self.update(|m| {
			if m.attempt != attempt {
				return false;
			}
			m.pending = None;
			if let Err(err) = store.save(&session) {
				warn!(target = "tonlink.session", error = %err, "failed to persist session");
			}
			m.state = ConnectionState::Connected { session: session.clone() };
			true
		});
		if applied {
			info!(
				target = "tonlink.session",
				wallet = %session.wallet_name,
				address = %session.account_address,
				"wallet connected"
			);
		} else {
			debug!(target = "tonlink.session", attempt, "pairing completed for superseded attempt");
		}
		Ok(self.current_state())
	}

	fn finish_remote(&self, attempt: u64, remote: &RemoteSource, result: std::result::Result<WalletAccount, TransportError>) {
		let outcome = match result {
			Ok(account) => {
				let fallback = remote_wallet_name(&self.wallets.lock(), remote);
				self.establish(attempt, Session::from_account(account, &fallback, now_ts()))
			}
			Err(err) => self.fail(attempt, ConnectError::PairingFailed(err.to_string())),
		};
		if let Err(err) = outcome {
			debug!(target = "tonlink.session", attempt, error = %err, "remote pairing ended without a session");
		}
	}

	/// Cancels discovery or pairing. Returns `true` if anything was cancelled.
	fn cancel(&self) -> bool {
		self.update(|m| match m.state {
			ConnectionState::Discovering | ConnectionState::AwaitingPairing { .. } => {
				m.attempt += 1;
				if let Some(handle) = m.pending.take() {
					handle.abort();
				}
				m.state = ConnectionState::Disconnected;
				true
			}
			_ => false,
		})
	}
}

impl Drop for Inner {
	fn drop(&mut self) {
		if let Some(handle) = self.machine.get_mut().pending.take() {
			handle.abort();
		}
	}
}

/// Owner of the connection state machine.
///
/// Cheap to clone; clones share one state. Dropping the last clone aborts any
/// pending remote pairing.
#[derive(Clone)]
pub struct ConnectionManager {
	inner: Arc<Inner>,
}

impl ConnectionManager {
	/// Creates a manager in `Disconnected`; call [`start`](Self::start) next.
	pub fn new(
		config: ConnectorConfig,
		registry: Arc<dyn WalletRegistry>,
		store: Arc<dyn SessionStore>,
		transport: Arc<dyn PairingTransport>,
	) -> Self {
		Self {
			inner: Arc::new(Inner {
				config,
				registry,
				store,
				transport,
				machine: Mutex::new(Machine {
					state: ConnectionState::Disconnected,
					attempt: 0,
					pending: None,
					disposed: false,
				}),
				emit_order: Mutex::new(()),
				wallets: Mutex::new(Vec::new()),
				last_error: Mutex::new(None),
				in_flight: Arc::new(Mutex::new(HashSet::new())),
				status: StatusBus::new(),
			}),
		}
	}

	/// Builds the default stack: HTTP registry plus a file store at the
	/// resolved session path (in-memory when the platform has none).
	pub fn from_config(config: ConnectorConfig, transport: Arc<dyn PairingTransport>) -> Result<Self> {
		config.validate()?;
		let registry = Arc::new(HttpWalletRegistry::from_config(&config)?);
		let store: Arc<dyn SessionStore> = match config.resolved_session_path() {
			Some(path) => Arc::new(FileSessionStore::new(path).with_ttl(config.session_ttl())),
			None => Arc::new(MemorySessionStore::new().with_ttl(config.session_ttl())),
		};
		Ok(Self::new(config, registry, store, transport))
	}

	/// Restores the last session or, failing that, runs discovery.
	///
	/// A restored session goes straight to `Connected` without touching the
	/// registry or the strategy selector.
	pub async fn start(&self) -> ConnectResult {
		let store = Arc::clone(&self.inner.store);
		let restored = self.inner.update(|m| {
			if m.disposed || m.state != ConnectionState::Disconnected {
				return None;
			}
			let session = store.try_restore()?;
			m.attempt += 1;
			m.state = ConnectionState::Connected { session: session.clone() };
			Some(session)
		});

		if let Some(session) = restored {
			info!(
				target = "tonlink.session",
				wallet = %session.wallet_name,
				address = %session.account_address,
				"restored previous session"
			);
			return Ok(self.current_state());
		}

		self.connect().await
	}

	/// Starts a fresh attempt from `Disconnected`.
	///
	/// Returns the state the attempt settled in: `Connected` for embedded
	/// wallets, `AwaitingPairing` with a link for remote ones. Outside
	/// `Disconnected` this is a no-op returning the current state.
	pub async fn connect(&self) -> ConnectResult {
		let Some(attempt) = self.inner.begin_attempt() else {
			debug!(target = "tonlink.session", state = self.current_state().label(), "connect ignored; attempt already active");
			return Ok(self.current_state());
		};
		debug!(target = "tonlink.session", attempt, "discovering wallets");

		let wallets = match self.inner.registry.fetch_wallets().await {
			Ok(wallets) => wallets,
			Err(err) => return self.inner.fail(attempt, err.into_connect_error()),
		};
		*self.inner.wallets.lock() = wallets.clone();

		let source = match select_strategy(StrategyInput {
			descriptors: &wallets,
			default_remote: self.inner.config.default_remote.as_ref(),
		}) {
			Ok(source) => source,
			Err(err) => return self.inner.fail(attempt, err.into_connect_error()),
		};
		debug!(target = "tonlink.session", attempt, source = source.kind(), wallets = wallets.len(), "selected connection source");

		match source {
			ConnectionSource::Embedded { wallet_name, bridge_key } => self.pair_embedded(attempt, wallet_name, bridge_key).await,
			ConnectionSource::Remote(remote) => self.begin_remote_pairing(attempt, remote),
		}
	}

	async fn pair_embedded(&self, attempt: u64, wallet_name: String, bridge_key: String) -> ConnectResult {
		if !self.inner.advance(attempt, ConnectionState::AwaitingPairing { pending_link: None }) {
			return Ok(self.current_state());
		}

		match self.inner.transport.pair_embedded(&bridge_key, &self.inner.config.manifest_url).await {
			Ok(account) => self.inner.establish(attempt, Session::from_account(account, &wallet_name, now_ts())),
			Err(err) => self.inner.fail(attempt, ConnectError::PairingFailed(err.to_string())),
		}
	}

	fn begin_remote_pairing(&self, attempt: u64, remote: RemoteSource) -> ConnectResult {
		let link = match self.inner.transport.universal_link(&remote, &self.inner.config.manifest_url) {
			Ok(link) => link,
			Err(err) => return self.inner.fail(attempt, ConnectError::PairingFailed(err.to_string())),
		};

		if !self.inner.advance(attempt, ConnectionState::AwaitingPairing { pending_link: Some(link.clone()) }) {
			return Ok(self.current_state());
		}
		info!(target = "tonlink.session", relay = %remote.relay_url, %link, "awaiting remote pairing");

		let weak: Weak<Inner> = Arc::downgrade(&self.inner);
		let transport = Arc::clone(&self.inner.transport);
		let task = tokio::spawn(async move {
			let result = transport.await_remote_pairing(&remote).await;
			if let Some(inner) = weak.upgrade() {
				inner.finish_remote(attempt, &remote, result);
			}
		});

		// The waiter may already have settled or been cancelled by now.
		let handle = task.abort_handle();
		let mut machine = self.inner.machine.lock();
		if machine.attempt != attempt {
			handle.abort();
		} else if matches!(machine.state, ConnectionState::AwaitingPairing { .. }) {
			machine.pending = Some(handle);
		}
		drop(machine);

		Ok(self.current_state())
	}

	/// Abandons discovery or a pending pairing and discards the link.
	pub fn cancel_pairing(&self) -> bool {
		let cancelled = self.inner.cancel();
		if cancelled {
			info!(target = "tonlink.session", "pairing cancelled");
		}
		cancelled
	}

	/// Drops the current session (or cancels pairing) and forgets the
	/// persisted record.
	pub async fn disconnect(&self) {
		if self.cancel_pairing() {
			return;
		}

		let store = Arc::clone(&self.inner.store);
		let session = self.inner.update(|m| {
			let ConnectionState::Connected { session } = &m.state else {
				return None;
			};
			let session = session.clone();
			m.attempt += 1;
			if let Err(err) = store.clear() {
				warn!(target = "tonlink.session", error = %err, "failed to clear persisted session");
			}
			m.state = ConnectionState::Disconnected;
			Some(session)
		});

		let Some(session) = session else {
			return;
		};
		info!(target = "tonlink.session", wallet = %session.wallet_name, "wallet disconnected");
		if let Err(err) = self.inner.transport.disconnect(&session).await {
			warn!(target = "tonlink.session", error = %err, "wallet was not notified of disconnect");
		}
	}

	/// Handles loss of the underlying pairing (wallet revoked, bridge gone).
	pub fn report_pairing_lost(&self) -> bool {
		let store = Arc::clone(&self.inner.store);
		let lost = self.inner.update(|m| {
			if !m.state.is_connected() {
				return false;
			}
			m.attempt += 1;
			if let Err(err) = store.clear() {
				warn!(target = "tonlink.session", error = %err, "failed to clear persisted session");
			}
			m.state = ConnectionState::Disconnected;
			true
		});
		if lost {
			warn!(target = "tonlink.session", "pairing lost");
		}
		lost
	}

	/// Tears the manager down: cancels pending work, moves to `Disconnected`
	/// (the persisted session is kept for the next start), and drops every
	/// listener. Later `start`/`connect` calls are no-ops.
	pub fn dispose(&self) {
		self.inner.update(|m| {
			m.disposed = true;
			m.attempt += 1;
			if let Some(handle) = m.pending.take() {
				handle.abort();
			}
			m.state = ConnectionState::Disconnected;
		});
		self.inner.status.clear();
		debug!(target = "tonlink.session", "connection manager disposed");
	}

	pub fn current_state(&self) -> ConnectionState {
		self.inner.current_state()
	}

	pub fn current_session(&self) -> Option<Session> {
		self.inner.machine.lock().state.session().cloned()
	}

	/// Connected account address or [`NOT_CONNECTED`](crate::state::NOT_CONNECTED).
	pub fn wallet_address(&self) -> String {
		self.inner.machine.lock().state.wallet_address().to_string()
	}

	pub fn pending_link(&self) -> Option<String> {
		self.inner.machine.lock().state.pending_link().map(str::to_string)
	}

	/// Last registry snapshot fetched by this manager.
	///
	/// Empty after a restored start, since restoring never runs discovery.
	/// Call [`refresh_wallets`](Self::refresh_wallets) to list wallets then.
	pub fn wallets(&self) -> Vec<WalletDescriptor> {
		self.inner.wallets.lock().clone()
	}

	/// Fetches a fresh registry snapshot without touching the connection state.
	pub async fn refresh_wallets(&self) -> Result<Vec<WalletDescriptor>> {
		let wallets = self.inner.registry.fetch_wallets().await?;
		debug!(target = "tonlink.registry", count = wallets.len(), "wallet snapshot refreshed");
		*self.inner.wallets.lock() = wallets.clone();
		Ok(wallets)
	}

	/// Reason the most recent attempt ended in `Disconnected`, if it failed.
	pub fn last_error(&self) -> Option<ConnectError> {
		self.inner.last_error.lock().clone()
	}

	pub fn subscribe(&self) -> StatusSubscription {
		self.inner.status.subscribe()
	}

	pub fn on_status_change<F>(&self, callback: F) -> StatusSubscription
	where
		F: Fn(&ConnectionState) + Send + Sync + 'static,
	{
		self.inner.status.on_status_change(callback)
	}

	pub fn config(&self) -> &ConnectorConfig {
		&self.inner.config
	}

	pub(crate) fn transport(&self) -> &Arc<dyn PairingTransport> {
		&self.inner.transport
	}

	pub(crate) fn in_flight(&self) -> &Arc<Mutex<HashSet<Session>>> {
		&self.inner.in_flight
	}
}

impl std::fmt::Debug for ConnectionManager {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ConnectionManager")
			.field("state", &self.current_state().label())
			.field("listeners", &self.inner.status.listener_count())
			.finish()
	}
}

/// Name for a session paired over `remote`: the registry wallet using that
/// relay and link base, else the link base itself.
fn remote_wallet_name(wallets: &[WalletDescriptor], remote: &RemoteSource) -> String {
	wallets
		.iter()
		.find(|w| matches!(&w.capability, ConnectionCapability::Remote(source) if source == remote))
		.map(|w| w.name.clone())
		.unwrap_or_else(|| remote.universal_link_base.clone())
}
