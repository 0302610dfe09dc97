#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tonlink::protocol::{
	ConnectRequest, ConnectionCapability, RemoteSource, SendTransactionResponse, SendTransactionRpc, Session, WalletAccount,
	WalletDescriptor, universal_link,
};
use tonlink::{
	ConnectionManager, ConnectionState, ConnectorConfig, Error, MemorySessionStore, PairingTransport, Result, SessionStore,
	StatusSubscription, TransportError, WalletRegistry,
};

pub const MANIFEST_URL: &str = "https://myapp.com/assets/tonconnect-manifest.json";
pub const TONKEEPER_LINK: &str = "https://app.tonkeeper.com/ton-connect";
pub const TONAPI_BRIDGE: &str = "https://bridge.tonapi.io/bridge";
pub const ACCOUNT: &str = "0:83dfd552e63729b472fcbcc8c45ebcc6691702558b68ec7527e1ba403a0f31a8";

pub fn tonkeeper_remote() -> RemoteSource {
	RemoteSource::new(TONKEEPER_LINK, TONAPI_BRIDGE)
}

pub fn embedded_wallet(name: &str, key: &str) -> WalletDescriptor {
	WalletDescriptor {
		name: name.into(),
		icon_ref: format!("https://example.com/{key}.png"),
		capability: ConnectionCapability::Embedded { bridge_key: key.into() },
	}
}

pub fn session() -> Session {
	Session {
		account_address: ACCOUNT.into(),
		wallet_name: "Tonkeeper".into(),
		established_at: tonlink::store::now_ts(),
	}
}

/// Registry returning a scripted result and counting calls.
pub struct CountingRegistry {
	wallets: Option<Vec<WalletDescriptor>>,
	pub calls: AtomicUsize,
}

impl CountingRegistry {
	pub fn with(wallets: Vec<WalletDescriptor>) -> Arc<Self> {
		Arc::new(Self {
			wallets: Some(wallets),
			calls: AtomicUsize::new(0),
		})
	}

	pub fn unavailable() -> Arc<Self> {
		Arc::new(Self {
			wallets: None,
			calls: AtomicUsize::new(0),
		})
	}

	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl WalletRegistry for CountingRegistry {
	async fn fetch_wallets(&self) -> Result<Vec<WalletDescriptor>> {
		self.calls.fetch_add(1, Ordering::SeqCst);
		self.wallets
			.clone()
			.ok_or_else(|| Error::RegistryUnavailable("registry.example.com: connection refused".into()))
	}
}

/// Transport whose every answer is scripted by the test.
pub struct ScriptedTransport {
	embedded_result: Mutex<Option<std::result::Result<WalletAccount, TransportError>>>,
	embedded_gate: Option<Arc<Notify>>,
	/// Completions keyed by the order in which remote waits started.
	remote_results: Mutex<HashMap<usize, std::result::Result<WalletAccount, TransportError>>>,
	remote_ready: Notify,
	remote_calls: AtomicUsize,
	remote_completions: AtomicUsize,
	/// Remote waits currently pending; drops to zero when a waiter is aborted.
	pub remote_waiting: Arc<AtomicUsize>,
	responses: Mutex<VecDeque<std::result::Result<SendTransactionResponse, TransportError>>>,
	gate: Option<Arc<Notify>>,
	pub sent: Mutex<Vec<SendTransactionRpc>>,
	pub embedded_calls: AtomicUsize,
	pub send_calls: AtomicUsize,
	pub disconnects: AtomicUsize,
	active_sends: AtomicUsize,
	pub max_concurrent_sends: AtomicUsize,
}

impl ScriptedTransport {
	pub fn new() -> Self {
		Self {
			embedded_result: Mutex::new(None),
			embedded_gate: None,
			remote_results: Mutex::new(HashMap::new()),
			remote_ready: Notify::new(),
			remote_calls: AtomicUsize::new(0),
			remote_completions: AtomicUsize::new(0),
			remote_waiting: Arc::new(AtomicUsize::new(0)),
			responses: Mutex::new(VecDeque::new()),
			gate: None,
			sent: Mutex::new(Vec::new()),
			embedded_calls: AtomicUsize::new(0),
			send_calls: AtomicUsize::new(0),
			disconnects: AtomicUsize::new(0),
			active_sends: AtomicUsize::new(0),
			max_concurrent_sends: AtomicUsize::new(0),
		}
	}

	/// Holds every `send_transaction` until the returned notify is signalled.
	pub fn gated() -> (Self, Arc<Notify>) {
		let gate = Arc::new(Notify::new());
		let mut transport = Self::new();
		transport.gate = Some(Arc::clone(&gate));
		(transport, gate)
	}

	/// Holds every `pair_embedded` until the returned notify is signalled.
	pub fn gated_embedded() -> (Self, Arc<Notify>) {
		let gate = Arc::new(Notify::new());
		let mut transport = Self::new();
		transport.embedded_gate = Some(Arc::clone(&gate));
		(transport, gate)
	}

	pub fn fail_embedded(self, err: TransportError) -> Self {
		*self.embedded_result.lock() = Some(Err(err));
		self
	}

	pub fn respond(&self, response: std::result::Result<SendTransactionResponse, TransportError>) {
		self.responses.lock().push_back(response);
	}

	/// Simulates the remote wallet finishing (or failing) the next pairing wait.
	pub fn complete_remote(&self, result: std::result::Result<WalletAccount, TransportError>) {
		let call = self.remote_completions.fetch_add(1, Ordering::SeqCst);
		self.complete_remote_call(call, result);
	}

	/// Completes the `call`-th remote wait (zero based), whether or not it is still pending.
	pub fn complete_remote_call(&self, call: usize, result: std::result::Result<WalletAccount, TransportError>) {
		self.remote_results.lock().insert(call, result);
		self.remote_ready.notify_waiters();
	}

	pub fn remote_calls(&self) -> usize {
		self.remote_calls.load(Ordering::SeqCst)
	}

	pub fn remote_waiting(&self) -> usize {
		self.remote_waiting.load(Ordering::SeqCst)
	}

	pub fn send_calls(&self) -> usize {
		self.send_calls.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl PairingTransport for ScriptedTransport {
	async fn pair_embedded(&self, _bridge_key: &str, _manifest_url: &str) -> std::result::Result<WalletAccount, TransportError> {
		self.embedded_calls.fetch_add(1, Ordering::SeqCst);
		if let Some(gate) = &self.embedded_gate {
			gate.notified().await;
		}
		self.embedded_result.lock().take().unwrap_or_else(|| Ok(WalletAccount::new(ACCOUNT)))
	}

	fn universal_link(&self, source: &RemoteSource, manifest_url: &str) -> std::result::Result<String, TransportError> {
		universal_link(&source.universal_link_base, "5f1a2b", &ConnectRequest::address_only(manifest_url))
			.map_err(|e| TransportError::Other(e.to_string()))
	}

	async fn await_remote_pairing(&self, _source: &RemoteSource) -> std::result::Result<WalletAccount, TransportError> {
		let call = self.remote_calls.fetch_add(1, Ordering::SeqCst);
		let _waiting = WaitingGuard::enter(&self.remote_waiting);
		loop {
			let ready = self.remote_ready.notified();
			let completed = self.remote_results.lock().remove(&call);
			if let Some(result) = completed {
				return result;
			}
			ready.await;
		}
	}

	async fn send_transaction(
		&self,
		_session: &Session,
		rpc: SendTransactionRpc,
	) -> std::result::Result<SendTransactionResponse, TransportError> {
		self.send_calls.fetch_add(1, Ordering::SeqCst);
		let active = self.active_sends.fetch_add(1, Ordering::SeqCst) + 1;
		self.max_concurrent_sends.fetch_max(active, Ordering::SeqCst);
		let id = rpc.id.clone();
		self.sent.lock().push(rpc);

		if let Some(gate) = &self.gate {
			gate.notified().await;
		}

		self.active_sends.fetch_sub(1, Ordering::SeqCst);
		self.responses
			.lock()
			.pop_front()
			.unwrap_or_else(|| Ok(SendTransactionResponse::success(id, "te6cckEBAQEAAgAAAEysuc0=")))
	}

	async fn disconnect(&self, _session: &Session) -> std::result::Result<(), TransportError> {
		self.disconnects.fetch_add(1, Ordering::SeqCst);
		Ok(())
	}
}

struct WaitingGuard(Arc<AtomicUsize>);

impl WaitingGuard {
	fn enter(counter: &Arc<AtomicUsize>) -> Self {
		counter.fetch_add(1, Ordering::SeqCst);
		Self(Arc::clone(counter))
	}
}

impl Drop for WaitingGuard {
	fn drop(&mut self) {
		self.0.fetch_sub(1, Ordering::SeqCst);
	}
}

pub struct Harness {
	pub manager: ConnectionManager,
	pub registry: Arc<CountingRegistry>,
	pub store: Arc<MemorySessionStore>,
	pub transport: Arc<ScriptedTransport>,
}

impl Harness {
	pub fn new(registry: Arc<CountingRegistry>, store: MemorySessionStore, transport: ScriptedTransport, default_remote: Option<RemoteSource>) -> Self {
		let mut config = ConnectorConfig::new(MANIFEST_URL);
		config.default_remote = default_remote;
		let store = Arc::new(store);
		let transport = Arc::new(transport);
		let manager = ConnectionManager::new(
			config,
			Arc::clone(&registry) as Arc<dyn WalletRegistry>,
			Arc::clone(&store) as Arc<dyn SessionStore>,
			Arc::clone(&transport) as Arc<dyn PairingTransport>,
		);
		Self {
			manager,
			registry,
			store,
			transport,
		}
	}

	pub fn embedded() -> Self {
		Self::new(
			CountingRegistry::with(vec![embedded_wallet("TonkeeperEmbedded", "tk1")]),
			MemorySessionStore::new(),
			ScriptedTransport::new(),
			Some(tonkeeper_remote()),
		)
	}

	pub fn remote() -> Self {
		Self::new(
			CountingRegistry::with(vec![]),
			MemorySessionStore::new(),
			ScriptedTransport::new(),
			Some(tonkeeper_remote()),
		)
	}
}

/// Receives the next state or panics after two seconds.
pub async fn next_state(sub: &mut StatusSubscription) -> ConnectionState {
	within(sub.recv()).await.expect("status bus closed")
}

pub async fn within<F: Future>(fut: F) -> F::Output {
	tokio::time::timeout(Duration::from_secs(2), fut).await.expect("timed out")
}

/// Yields until `cond` holds, for at most two seconds.
pub async fn wait_until(mut cond: impl FnMut() -> bool) {
	within(async {
		while !cond() {
			tokio::task::yield_now().await;
		}
	})
	.await
}
