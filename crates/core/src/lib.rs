//! Client-side TON Connect session manager.
//!
//! Establishes and maintains a connection to an external signing wallet,
//! either embedded in the page or paired through a bridge relay, and
//! submits signing requests over it.
//!
//! # Components
//!
//! - [`WalletRegistry`] - lists wallets able to connect
//! - [`select_strategy`] - embedded wallet first, configured relay otherwise
//! - [`SessionStore`] - best-effort restore of the last session
//! - [`ConnectionManager`] - the connection state machine and status notifications
//! - [`TransactionSubmitter`] - one-at-a-time signing requests with classified outcomes
//!
//! The pairing transport itself (relay protocol, link encoding, injected
//! bridge calls) stays outside this crate behind [`PairingTransport`].

pub mod config;
pub mod error;
pub mod logging;
pub mod manager;
pub mod registry;
pub mod state;
pub mod status;
pub mod store;
pub mod strategy;
pub mod submitter;
pub mod transport;

pub use config::ConnectorConfig;
pub use error::{ConnectError, Error, Result};
pub use manager::{ConnectResult, ConnectionManager};
pub use registry::{HttpWalletRegistry, StaticWalletRegistry, WalletRegistry};
pub use state::{ConnectionState, NOT_CONNECTED};
pub use status::{StatusBus, StatusSubscription};
pub use store::{FileSessionStore, MemorySessionStore, SessionStore};
pub use strategy::{StrategyInput, select_strategy};
pub use submitter::{FailureReason, NoticeLevel, RejectReason, SignedTransaction, TransactionOutcome, TransactionSubmitter};
pub use tonlink_protocol as protocol;
pub use transport::{PairingTransport, TransportError};
