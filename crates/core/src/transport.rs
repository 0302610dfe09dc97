//! Seam to the pairing transport (bridge relay or injected JS bridge).
//!
//! The connector never speaks the bridge protocol itself. Implementations
//! own key exchange, relay polling, link encoding, and message encryption.

use async_trait::async_trait;
use thiserror::Error;
use tonlink_protocol::{RemoteSource, SendTransactionResponse, SendTransactionRpc, Session, WalletAccount};

/// Failure reported by a transport, before any wallet response exists.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
	/// Relay or bridge unreachable, request timed out, or similar.
	#[error("network error: {0}")]
	Network(String),
	/// Bridge connection closed underneath the call.
	#[error("bridge connection closed")]
	Closed,
	/// The user declined in the wallet UI.
	#[error("rejected by user: {0}")]
	Rejected(String),
	#[error("{0}")]
	Other(String),
}

#[async_trait]
pub trait PairingTransport: Send + Sync {
	/// Pairs with an in-page wallet injected under `bridge_key`.
	async fn pair_embedded(&self, bridge_key: &str, manifest_url: &str) -> Result<WalletAccount, TransportError>;

	/// Builds the out-of-band link the user opens (or scans) to pair.
	fn universal_link(&self, source: &RemoteSource, manifest_url: &str) -> Result<String, TransportError>;

	/// Waits for the remote wallet to complete pairing through the relay.
	///
	/// May stay pending indefinitely; the manager cancels it by aborting the
	/// task that polls it.
	async fn await_remote_pairing(&self, source: &RemoteSource) -> Result<WalletAccount, TransportError>;

	/// Forwards a signing request to the wallet bound to `session`.
	async fn send_transaction(&self, session: &Session, rpc: SendTransactionRpc) -> Result<SendTransactionResponse, TransportError>;

	/// Notifies the wallet that the app is dropping the session.
	async fn disconnect(&self, _session: &Session) -> Result<(), TransportError> {
		Ok(())
	}
}
