//! Connection state as observed by the presentation layer.

use serde::Serialize;
use tonlink_protocol::Session;

/// Address shown when no wallet is connected.
pub const NOT_CONNECTED: &str = "Not connected";

/// Authoritative connection state; exactly one variant is active.
///
/// A session and a pending link never coexist: the link lives only in
/// [`AwaitingPairing`](Self::AwaitingPairing) and the session only in
/// [`Connected`](Self::Connected).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ConnectionState {
	Disconnected,
	Discovering,
	/// Pairing in progress. `pending_link` is set only for remote wallets
	/// until the user completes pairing.
	AwaitingPairing {
		#[serde(rename = "pendingLink")]
		pending_link: Option<String>,
	},
	Connected { session: Session },
}

impl ConnectionState {
	pub fn is_connected(&self) -> bool {
		matches!(self, ConnectionState::Connected { .. })
	}

	pub fn session(&self) -> Option<&Session> {
		match self {
			ConnectionState::Connected { session } => Some(session),
			_ => None,
		}
	}

	pub fn pending_link(&self) -> Option<&str> {
		match self {
			ConnectionState::AwaitingPairing { pending_link } => pending_link.as_deref(),
			_ => None,
		}
	}

	/// Connected account address, or [`NOT_CONNECTED`].
	pub fn wallet_address(&self) -> &str {
		self.session().map_or(NOT_CONNECTED, |s| s.account_address.as_str())
	}

	/// Short label for logs.
	pub fn label(&self) -> &'static str {
		match self {
			ConnectionState::Disconnected => "disconnected",
			ConnectionState::Discovering => "discovering",
			ConnectionState::AwaitingPairing { .. } => "awaiting_pairing",
			ConnectionState::Connected { .. } => "connected",
		}
	}
}
