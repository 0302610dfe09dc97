use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProtocolError>;

#[derive(Debug, Error)]
pub enum ProtocolError {
	#[error("transaction request must contain at least one message")]
	EmptyMessages,

	#[error("invalid universal link base {base:?}: {source}")]
	InvalidLinkBase {
		base: String,
		#[source]
		source: url::ParseError,
	},

	#[error(transparent)]
	Json(#[from] serde_json::Error),
}
