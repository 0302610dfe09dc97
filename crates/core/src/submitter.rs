//! Transaction submission against the connected session.
//!
//! Submission never fails with an error: every path ends in a
//! [`TransactionOutcome`]. Only one request may be outstanding per session;
//! a concurrent second call is turned away with
//! [`FailureReason::SubmissionInProgress`] rather than queued.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use serde::Serialize;
use tonlink_protocol::{SendTransactionResponse, SendTransactionRpc, Session, TransactionRequest, WalletErrorCode};
use tracing::{debug, info, warn};

use crate::manager::ConnectionManager;
use crate::store::now_ts;
use crate::transport::TransportError;

/// Signed transaction returned by the wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignedTransaction {
	/// Base64 BOC of the signed external message.
	pub boc: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
	UserRejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
	NetworkError,
	NotConnected,
	SubmissionInProgress,
	/// `valid_until` was not in the future when submitted.
	Expired,
	Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum TransactionOutcome {
	Accepted(SignedTransaction),
	Rejected(RejectReason),
	Failed(FailureReason),
}

/// Severity a presentation layer should give an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
	Success,
	Info,
	Error,
}

impl TransactionOutcome {
	pub fn is_accepted(&self) -> bool {
		matches!(self, TransactionOutcome::Accepted(_))
	}

	pub fn is_user_rejection(&self) -> bool {
		matches!(self, TransactionOutcome::Rejected(RejectReason::UserRejected))
	}

	/// User-facing notice. Rejection is informational, never an error.
	pub fn notice(&self) -> (NoticeLevel, &'static str) {
		match self {
			TransactionOutcome::Accepted(_) => (NoticeLevel::Success, "Transaction sent successfully!"),
			TransactionOutcome::Rejected(RejectReason::UserRejected) => (NoticeLevel::Info, "You rejected the transaction."),
			TransactionOutcome::Failed(FailureReason::NotConnected) => (NoticeLevel::Error, "Please connect wallet first!"),
			TransactionOutcome::Failed(FailureReason::SubmissionInProgress) => {
				(NoticeLevel::Error, "A transaction is already awaiting confirmation.")
			}
			TransactionOutcome::Failed(FailureReason::Expired) => (NoticeLevel::Error, "The transaction request has expired."),
			TransactionOutcome::Failed(FailureReason::NetworkError) => (NoticeLevel::Error, "Network error while contacting the wallet."),
			TransactionOutcome::Failed(FailureReason::Unknown) => (NoticeLevel::Error, "Unknown error occurred."),
		}
	}
}

/// Marks a session busy until dropped, including when the submit future is
/// cancelled mid-flight.
struct InFlightGuard {
	slots: Arc<Mutex<HashSet<Session>>>,
	session: Session,
}

impl InFlightGuard {
	fn acquire(slots: &Arc<Mutex<HashSet<Session>>>, session: &Session) -> Option<Self> {
		if !slots.lock().insert(session.clone()) {
			return None;
		}
		Some(Self {
			slots: Arc::clone(slots),
			session: session.clone(),
		})
	}
}

impl Drop for InFlightGuard {
	fn drop(&mut self) {
		self.slots.lock().remove(&self.session);
	}
}

/// Builds and submits signing requests over the manager's current session.
#[derive(Debug, Clone)]
pub struct TransactionSubmitter {
	manager: ConnectionManager,
	next_id: Arc<AtomicU64>,
}

impl TransactionSubmitter {
	pub fn new(manager: ConnectionManager) -> Self {
		Self {
			manager,
			next_id: Arc::new(AtomicU64::new(1)),
		}
	}

	/// Submits `request` exactly as built and classifies the wallet's answer.
	///
	/// Without a connected session, or with an expired request, the wallet is
	/// never contacted.
	pub async fn submit(&self, request: &TransactionRequest) -> TransactionOutcome {
		let Some(session) = self.manager.current_session() else {
			debug!(target = "tonlink.tx", "submit refused; no connected wallet");
			return TransactionOutcome::Failed(FailureReason::NotConnected);
		};

		if !request.is_live_at(now_ts()) {
			debug!(target = "tonlink.tx", valid_until = request.valid_until(), "submit refused; request expired");
			return TransactionOutcome::Failed(FailureReason::Expired);
		}

		let Some(_guard) = InFlightGuard::acquire(self.manager.in_flight(), &session) else {
			debug!(target = "tonlink.tx", wallet = %session.wallet_name, "submit refused; another request in flight");
			return TransactionOutcome::Failed(FailureReason::SubmissionInProgress);
		};

		let id = self.next_id.fetch_add(1, Ordering::Relaxed).to_string();
		let rpc = match SendTransactionRpc::new(id.clone(), request) {
			Ok(rpc) => rpc,
			Err(err) => {
				warn!(target = "tonlink.tx", error = %err, "failed to encode transaction request");
				return TransactionOutcome::Failed(FailureReason::Unknown);
			}
		};

		debug!(
			target = "tonlink.tx",
			%id,
			messages = request.messages().len(),
			total = request.total_amount(),
			"sending transaction to wallet"
		);
		let result = self.manager.transport().send_transaction(&session, rpc).await;
		let outcome = classify(result);
		match &outcome {
			TransactionOutcome::Accepted(_) => info!(target = "tonlink.tx", %id, "transaction signed"),
			TransactionOutcome::Rejected(_) => info!(target = "tonlink.tx", %id, "transaction rejected by user"),
			TransactionOutcome::Failed(reason) => warn!(target = "tonlink.tx", %id, ?reason, "transaction failed"),
		}
		outcome
	}
}

/// Maps a raw transport result onto the outcome taxonomy.
pub fn classify(result: Result<SendTransactionResponse, TransportError>) -> TransactionOutcome {
	match result {
		Ok(SendTransactionResponse { error: Some(err), .. }) => match err.kind() {
			WalletErrorCode::UserRejected => TransactionOutcome::Rejected(RejectReason::UserRejected),
			_ => TransactionOutcome::Failed(FailureReason::Unknown),
		},
		Ok(SendTransactionResponse {
			result: Some(boc), error: None, ..
		}) => TransactionOutcome::Accepted(SignedTransaction { boc }),
		Ok(_) => TransactionOutcome::Failed(FailureReason::Unknown),
		Err(TransportError::Rejected(_)) => TransactionOutcome::Rejected(RejectReason::UserRejected),
		Err(TransportError::Network(_) | TransportError::Closed) => TransactionOutcome::Failed(FailureReason::NetworkError),
		Err(TransportError::Other(_)) => TransactionOutcome::Failed(FailureReason::Unknown),
	}
}
