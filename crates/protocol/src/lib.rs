//! Wire types for TON Connect wallet pairing.
//!
//! This crate contains the serde-serializable types shared between the
//! connection core and the pairing transports: wallet registry entries,
//! pairing sources, sessions, and the `sendTransaction` request/response
//! envelopes.
//!
//! Types in this crate are:
//! - **Pure data**: no I/O, no clocks, no async
//! - **1:1 with the wire**: field names follow the TON Connect JSON schema
//!
//! Orchestration (discovery, pairing, submission) lives in `tonlink`.

pub mod connect;
pub mod error;
pub mod session;
pub mod transaction;
pub mod wallet;

pub use connect::{ConnectItem, ConnectRequest, universal_link};
pub use error::{ProtocolError, Result};
pub use session::{Session, WalletAccount};
pub use transaction::{
	SendTransactionRpc, SendTransactionResponse, TransactionMessage, TransactionRequest, WalletErrorCode, WalletRpcError,
};
pub use wallet::{BridgeEntry, ConnectionCapability, ConnectionSource, RemoteSource, WalletDescriptor, WalletsListEntry};
