//! `sendTransaction` request and response types.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{ProtocolError, Result};

/// One transfer inside a [`TransactionRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionMessage {
	/// Destination address.
	pub address: String,
	/// Amount in nanotons. Sent as a decimal string.
	#[serde(serialize_with = "serialize_amount", deserialize_with = "deserialize_amount")]
	pub amount: u64,
	/// Base64 BOC body.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub payload: Option<String>,
	/// Base64 BOC state init for deploying the destination.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub state_init: Option<String>,
}

impl TransactionMessage {
	pub fn new(address: impl Into<String>, amount: u64) -> Self {
		Self {
			address: address.into(),
			amount,
			payload: None,
			state_init: None,
		}
	}

	pub fn with_payload(mut self, payload: impl Into<String>) -> Self {
		self.payload = Some(payload.into());
		self
	}

	pub fn with_state_init(mut self, state_init: impl Into<String>) -> Self {
		self.state_init = Some(state_init.into());
		self
	}
}

/// Signing request submitted to a connected wallet.
///
/// Immutable once built; the submitter forwards it exactly as constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawTransactionRequest")]
pub struct TransactionRequest {
	valid_until: u64,
	messages: Vec<TransactionMessage>,
}

/// Wire shape of [`TransactionRequest`] before validation.
#[derive(Deserialize)]
struct RawTransactionRequest {
	valid_until: u64,
	messages: Vec<TransactionMessage>,
}

impl TryFrom<RawTransactionRequest> for TransactionRequest {
	type Error = ProtocolError;

	fn try_from(raw: RawTransactionRequest) -> Result<Self> {
		Self::new(raw.valid_until, raw.messages)
	}
}

impl TransactionRequest {
	/// Builds a request that expires at `valid_until` (Unix epoch seconds).
	pub fn new(valid_until: u64, messages: Vec<TransactionMessage>) -> Result<Self> {
		if messages.is_empty() {
			return Err(ProtocolError::EmptyMessages);
		}
		Ok(Self { valid_until, messages })
	}

	pub fn valid_until(&self) -> u64 {
		self.valid_until
	}

	pub fn messages(&self) -> &[TransactionMessage] {
		&self.messages
	}

	/// Returns `true` while the request has not yet expired at `now`.
	pub fn is_live_at(&self, now: u64) -> bool {
		self.valid_until > now
	}

	/// Total nanotons across all messages, saturating on overflow.
	pub fn total_amount(&self) -> u64 {
		self.messages.iter().fold(0u64, |acc, m| acc.saturating_add(m.amount))
	}
}

/// JSON-RPC envelope carried over the bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendTransactionRpc {
	pub method: String,
	/// Single element: the request serialized as a JSON string.
	pub params: Vec<String>,
	pub id: String,
}

impl SendTransactionRpc {
	pub const METHOD: &'static str = "sendTransaction";

	pub fn new(id: impl Into<String>, request: &TransactionRequest) -> Result<Self> {
		Ok(Self {
			method: Self::METHOD.to_string(),
			params: vec![serde_json::to_string(request)?],
			id: id.into(),
		})
	}

	/// Decodes the request carried in `params`.
	pub fn request(&self) -> Result<Option<TransactionRequest>> {
		match self.params.first() {
			Some(raw) => Ok(Some(serde_json::from_str(raw)?)),
			None => Ok(None),
		}
	}
}

/// Wallet-side error codes for `sendTransaction`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalletErrorCode {
	Unknown,
	BadRequest,
	UnknownApp,
	UserRejected,
	MethodNotSupported,
	Other(u16),
}

impl From<u16> for WalletErrorCode {
	fn from(code: u16) -> Self {
		match code {
			0 => WalletErrorCode::Unknown,
			1 => WalletErrorCode::BadRequest,
			100 => WalletErrorCode::UnknownApp,
			300 => WalletErrorCode::UserRejected,
			400 => WalletErrorCode::MethodNotSupported,
			other => WalletErrorCode::Other(other),
		}
	}
}

/// Error body of a failed wallet response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletRpcError {
	pub code: u16,
	#[serde(default)]
	pub message: String,
}

impl WalletRpcError {
	pub fn kind(&self) -> WalletErrorCode {
		WalletErrorCode::from(self.code)
	}
}

/// Wallet response to [`SendTransactionRpc`]; exactly one of `result`/`error` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendTransactionResponse {
	pub id: String,
	/// Signed BOC, base64.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub result: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error: Option<WalletRpcError>,
}

impl SendTransactionResponse {
	pub fn success(id: impl Into<String>, boc: impl Into<String>) -> Self {
		Self {
			id: id.into(),
			result: Some(boc.into()),
			error: None,
		}
	}

	pub fn failure(id: impl Into<String>, code: u16, message: impl Into<String>) -> Self {
		Self {
			id: id.into(),
			result: None,
			error: Some(WalletRpcError {
				code,
				message: message.into(),
			}),
		}
	}
}

fn serialize_amount<S>(amount: &u64, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
	S: Serializer,
{
	serializer.collect_str(amount)
}

fn deserialize_amount<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
	D: Deserializer<'de>,
{
	struct AmountVisitor;

	impl Visitor<'_> for AmountVisitor {
		type Value = u64;

		fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
			f.write_str("a nanoton amount as a decimal string or unsigned integer")
		}

		fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<u64, E> {
			Ok(v)
		}

		fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<u64, E> {
			u64::try_from(v).map_err(|_| E::custom(format!("negative amount {v}")))
		}

		fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<u64, E> {
			v.trim().parse().map_err(|_| E::custom(format!("invalid amount {v:?}")))
		}
	}

	deserializer.deserialize_any(AmountVisitor)
}
