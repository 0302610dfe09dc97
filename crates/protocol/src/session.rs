//! Connected-session data.

use serde::{Deserialize, Serialize};

/// Account details reported by a wallet when pairing completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletAccount {
	/// Raw account address (`workchain:hex`).
	pub address: String,
	/// Wallet app name from the device info, when the wallet sent one.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub wallet_name: Option<String>,
	/// Network id (`-239` mainnet, `-3` testnet).
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub chain: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub public_key: Option<String>,
}

impl WalletAccount {
	pub fn new(address: impl Into<String>) -> Self {
		Self {
			address: address.into(),
			wallet_name: None,
			chain: None,
			public_key: None,
		}
	}

	pub fn with_wallet_name(mut self, name: impl Into<String>) -> Self {
		self.wallet_name = Some(name.into());
		self
	}
}

/// Live binding between the app and one wallet account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
	pub account_address: String,
	pub wallet_name: String,
	/// Unix epoch seconds.
	pub established_at: u64,
}

impl Session {
	/// Builds a session from a pairing result.
	///
	/// The wallet-reported name wins over `fallback_name`, which is the
	/// descriptor name for embedded pairing and a generic label for relays.
	pub fn from_account(account: WalletAccount, fallback_name: &str, established_at: u64) -> Self {
		Self {
			account_address: account.address,
			wallet_name: account.wallet_name.unwrap_or_else(|| fallback_name.to_string()),
			established_at,
		}
	}

	/// `false` when the address or wallet name is blank.
	pub fn is_well_formed(&self) -> bool {
		!self.account_address.trim().is_empty() && !self.wallet_name.trim().is_empty()
	}
}
