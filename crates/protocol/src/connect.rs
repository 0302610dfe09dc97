//! Pairing request and universal-link construction.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{ProtocolError, Result};

/// Data item requested from the wallet during pairing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum ConnectItem {
	TonAddr,
	TonProof { payload: String },
}

/// Pairing request handed to the wallet through the universal link or the
/// injected bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectRequest {
	/// App manifest; the wallet fetches it, the core only passes it through.
	pub manifest_url: String,
	pub items: Vec<ConnectItem>,
}

impl ConnectRequest {
	/// Requests only the account address.
	pub fn address_only(manifest_url: impl Into<String>) -> Self {
		Self {
			manifest_url: manifest_url.into(),
			items: vec![ConnectItem::TonAddr],
		}
	}
}

/// Protocol version advertised in universal links.
pub const PROTOCOL_VERSION: u8 = 2;

/// Builds `<base>?v=2&id=<client_id>&r=<request json>&ret=none`.
///
/// Existing query parameters on `base` are kept.
pub fn universal_link(base: &str, client_id: &str, request: &ConnectRequest) -> Result<String> {
	let mut url = Url::parse(base).map_err(|source| ProtocolError::InvalidLinkBase {
		base: base.to_string(),
		source,
	})?;
	let payload = serde_json::to_string(request)?;
	url.query_pairs_mut()
		.append_pair("v", &PROTOCOL_VERSION.to_string())
		.append_pair("id", client_id)
		.append_pair("r", &payload)
		.append_pair("ret", "none");
	Ok(url.into())
}
