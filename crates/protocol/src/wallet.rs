//! Wallet registry entries and pairing sources.
//!
//! The registry publishes [`WalletsListEntry`] records (TON wallets-list v2
//! format). Each connectable entry is reduced to a [`WalletDescriptor`], and the
//! strategy selector turns one descriptor (or the configured fallback) into a
//! [`ConnectionSource`].

use serde::{Deserialize, Serialize};

/// Relay endpoint plus the universal-link base used to reach a bridge wallet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteSource {
	/// Base URL the pairing parameters are appended to.
	pub universal_link_base: String,
	/// Message relay the wallet and the app exchange pairing traffic through.
	pub relay_url: String,
}

impl RemoteSource {
	pub fn new(universal_link_base: impl Into<String>, relay_url: impl Into<String>) -> Self {
		Self {
			universal_link_base: universal_link_base.into(),
			relay_url: relay_url.into(),
		}
	}
}

/// How a wallet can be reached from the current environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConnectionCapability {
	/// In-page signer injected under `bridge_key`.
	Embedded {
		#[serde(rename = "bridgeKey")]
		bridge_key: String,
	},
	/// Signer reachable only through a relay and a universal link.
	Remote(RemoteSource),
}

impl ConnectionCapability {
	pub fn is_embedded(&self) -> bool {
		matches!(self, ConnectionCapability::Embedded { .. })
	}
}

/// A wallet app able to connect, as resolved from one registry snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletDescriptor {
	/// Display name, unique within a snapshot.
	pub name: String,
	/// Icon URL.
	pub icon_ref: String,
	pub capability: ConnectionCapability,
}

/// Pairing target chosen for one connection attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConnectionSource {
	Embedded {
		#[serde(rename = "walletName")]
		wallet_name: String,
		#[serde(rename = "bridgeKey")]
		bridge_key: String,
	},
	Remote(RemoteSource),
}

impl ConnectionSource {
	/// Returns a short label for logs.
	pub fn kind(&self) -> &'static str {
		match self {
			ConnectionSource::Embedded { .. } => "embedded",
			ConnectionSource::Remote(_) => "remote",
		}
	}
}

/// Bridge declaration inside a wallets-list entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BridgeEntry {
	/// HTTP bridge relaying over server-sent events.
	Sse { url: String },
	/// JavaScript bridge injected into the page under `key`.
	Js { key: String },
	#[serde(other)]
	Unknown,
}

/// Raw record from the public wallets list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletsListEntry {
	pub app_name: String,
	pub name: String,
	pub image: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub about_url: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub universal_url: Option<String>,
	#[serde(default)]
	pub bridge: Vec<BridgeEntry>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub platforms: Vec<String>,
}

impl WalletsListEntry {
	/// Reduces the entry to a descriptor, or `None` when the wallet cannot be
	/// reached from this environment.
	///
	/// A `js` bridge wins when `is_injected` reports its key as present;
	/// otherwise an `sse` bridge with a universal URL yields a remote wallet.
	pub fn into_descriptor(self, is_injected: impl Fn(&str) -> bool) -> Option<WalletDescriptor> {
		let injected_key = self.bridge.iter().find_map(|bridge| match bridge {
			BridgeEntry::Js { key } if is_injected(key) => Some(key.clone()),
			_ => None,
		});

		let capability = match injected_key {
			Some(bridge_key) => ConnectionCapability::Embedded { bridge_key },
			None => {
				let relay_url = self.bridge.iter().find_map(|bridge| match bridge {
					BridgeEntry::Sse { url } => Some(url.clone()),
					_ => None,
				})?;
				let universal_link_base = self.universal_url.clone()?;
				ConnectionCapability::Remote(RemoteSource {
					universal_link_base,
					relay_url,
				})
			}
		};

		Some(WalletDescriptor {
			name: self.name,
			icon_ref: self.image,
			capability,
		})
	}
}
