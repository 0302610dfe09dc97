use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
	#[error("wallet registry unavailable: {0}")]
	RegistryUnavailable(String),

	#[error("no connection strategy available: no embedded wallet and no default remote source configured")]
	NoStrategyAvailable,

	#[error("pairing failed: {0}")]
	PairingFailed(String),

	#[error("wallet discovery failed: {0}")]
	DiscoveryFailed(String),

	#[error("invalid configuration: {0}")]
	Config(String),

	#[error(transparent)]
	Protocol(#[from] tonlink_protocol::ProtocolError),

	#[error(transparent)]
	Io(#[from] std::io::Error),

	#[error(transparent)]
	Json(#[from] serde_json::Error),
}

/// Reason the last connection attempt ended in `Disconnected`.
///
/// Attempts are never retried by the manager; the reason is kept so the
/// presentation layer can decide what to offer next.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectError {
	#[error("wallet discovery failed: {0}")]
	DiscoveryFailed(String),

	#[error("no connection strategy available")]
	NoStrategyAvailable,

	#[error("pairing failed: {0}")]
	PairingFailed(String),
}

impl From<ConnectError> for Error {
	fn from(err: ConnectError) -> Self {
		match err {
			ConnectError::DiscoveryFailed(msg) => Error::DiscoveryFailed(msg),
			ConnectError::NoStrategyAvailable => Error::NoStrategyAvailable,
			ConnectError::PairingFailed(msg) => Error::PairingFailed(msg),
		}
	}
}

impl Error {
	/// Maps an attempt-level failure to the reason recorded by the manager.
	///
	/// Registry outages surface as `DiscoveryFailed`; everything else that can
	/// end a pairing attempt is a `PairingFailed`.
	pub fn into_connect_error(self) -> ConnectError {
		match self {
			Error::NoStrategyAvailable => ConnectError::NoStrategyAvailable,
			Error::RegistryUnavailable(msg) | Error::DiscoveryFailed(msg) => ConnectError::DiscoveryFailed(msg),
			Error::PairingFailed(msg) => ConnectError::PairingFailed(msg),
			other => ConnectError::PairingFailed(other.to_string()),
		}
	}
}
