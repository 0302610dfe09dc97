//! Status-change notifications.
//!
//! Listeners come in two shapes:
//!
//! 1. **Streams**: [`StatusBus::subscribe`] returns a handle with its own
//!    unbounded queue, so no state is ever coalesced or dropped.
//! 2. **Callbacks**: [`StatusBus::on_status_change`] runs a closure inline
//!    on every transition.
//!
//! Both return a [`StatusSubscription`]; dropping it (or calling
//! [`unsubscribe`](StatusSubscription::unsubscribe)) removes the listener.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::state::ConnectionState;

type Callback = Arc<dyn Fn(&ConnectionState) + Send + Sync>;

enum Listener {
	Channel(mpsc::UnboundedSender<ConnectionState>),
	Callback(Callback),
}

#[derive(Default)]
struct Listeners {
	next_id: u64,
	entries: Vec<(u64, Listener)>,
}

impl Listeners {
	fn insert(&mut self, listener: Listener) -> u64 {
		let id = self.next_id;
		self.next_id += 1;
		self.entries.push((id, listener));
		id
	}

	fn remove(&mut self, id: u64) {
		self.entries.retain(|(entry_id, _)| *entry_id != id);
	}
}

/// Fan-out of connection states to registered listeners.
#[derive(Clone, Default)]
pub struct StatusBus {
	listeners: Arc<Mutex<Listeners>>,
}

impl StatusBus {
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers a stream listener. States emitted before this call are not
	/// delivered.
	pub fn subscribe(&self) -> StatusSubscription {
		let (tx, rx) = mpsc::unbounded_channel();
		let id = self.listeners.lock().insert(Listener::Channel(tx));
		StatusSubscription {
			id,
			bus: Arc::downgrade(&self.listeners),
			rx: Some(rx),
		}
	}

	/// Registers a callback invoked inline for every transition.
	///
	/// The callback may read state but must not start another transition
	/// synchronously; spawn a task for that.
	pub fn on_status_change<F>(&self, callback: F) -> StatusSubscription
	where
		F: Fn(&ConnectionState) + Send + Sync + 'static,
	{
		let id = self.listeners.lock().insert(Listener::Callback(Arc::new(callback)));
		StatusSubscription {
			id,
			bus: Arc::downgrade(&self.listeners),
			rx: None,
		}
	}

	/// Delivers `state` to every listener once, in registration order.
	///
	/// Callers serialize emits so listeners observe transition order.
	pub(crate) fn emit(&self, state: &ConnectionState) {
		let callbacks: Vec<Callback> = {
			let mut listeners = self.listeners.lock();
			let mut callbacks = Vec::new();
			listeners.entries.retain(|(_, listener)| match listener {
				Listener::Channel(tx) => tx.send(state.clone()).is_ok(),
				Listener::Callback(cb) => {
					callbacks.push(Arc::clone(cb));
					true
				}
			});
			callbacks
		};
		for callback in callbacks {
			callback(state);
		}
	}

	/// Drops every listener; outstanding stream handles then drain and end.
	pub(crate) fn clear(&self) {
		self.listeners.lock().entries.clear();
	}

	pub fn listener_count(&self) -> usize {
		self.listeners.lock().entries.len()
	}
}

impl std::fmt::Debug for StatusBus {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("StatusBus").field("listeners", &self.listener_count()).finish()
	}
}

/// RAII handle for a status listener.
pub struct StatusSubscription {
	id: u64,
	bus: Weak<Mutex<Listeners>>,
	rx: Option<mpsc::UnboundedReceiver<ConnectionState>>,
}

impl StatusSubscription {
	/// Waits for the next state. Returns `None` for callback handles and once
	/// the bus is gone and the queue is drained.
	pub async fn recv(&mut self) -> Option<ConnectionState> {
		match self.rx.as_mut() {
			Some(rx) => rx.recv().await,
			None => None,
		}
	}

	/// Returns the next queued state without waiting.
	pub fn try_recv(&mut self) -> Option<ConnectionState> {
		self.rx.as_mut().and_then(|rx| rx.try_recv().ok())
	}

	/// Drains every queued state.
	pub fn drain(&mut self) -> Vec<ConnectionState> {
		std::iter::from_fn(|| self.try_recv()).collect()
	}

	/// Removes the listener; equivalent to dropping the handle.
	pub fn unsubscribe(self) {}
}

impl Drop for StatusSubscription {
	fn drop(&mut self) {
		if let Some(listeners) = self.bus.upgrade() {
			listeners.lock().remove(self.id);
		}
	}
}

impl std::fmt::Debug for StatusSubscription {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("StatusSubscription")
			.field("id", &self.id)
			.field("active", &(self.bus.strong_count() > 0))
			.finish()
	}
}
