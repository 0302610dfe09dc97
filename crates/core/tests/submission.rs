mod common;

use std::sync::atomic::Ordering;

use common::*;
use tonlink::protocol::{SendTransactionResponse, TransactionMessage, TransactionRequest};
use tonlink::store::now_ts;
use tonlink::{
	FailureReason, MemorySessionStore, RejectReason, SignedTransaction, TransactionOutcome, TransactionSubmitter, TransportError,
};

const RECIPIENT_A: &str = "0:412410771DA82CBA306A55FA9E0D43C9D245E38133CB58F1457DFB8D5CD8892F";
const RECIPIENT_B: &str = "0:E69F10CC84877ABF539F83F879291E5CA169451BA7BCE91A37A5CED3AB8080D3";

/// Two transfers of 0.02 and 0.06 TON, valid for a minute.
fn two_transfers() -> TransactionRequest {
	TransactionRequest::new(
		now_ts() + 60,
		vec![
			TransactionMessage::new(RECIPIENT_A, 20_000_000),
			TransactionMessage::new(RECIPIENT_B, 60_000_000).with_payload("te6ccsEBAQEADAAMABQAAAAASGVsbG8hCaTc/g=="),
		],
	)
	.unwrap()
}

async fn connected(transport: ScriptedTransport) -> Harness {
	let h = Harness::new(
		CountingRegistry::with(vec![]),
		MemorySessionStore::with_session(session()),
		transport,
		None,
	);
	assert!(h.manager.start().await.unwrap().is_connected());
	h
}

#[tokio::test]
async fn disconnected_submit_never_reaches_wallet() {
	let h = Harness::embedded();
	let submitter = TransactionSubmitter::new(h.manager.clone());

	let outcome = submitter.submit(&two_transfers()).await;

	assert_eq!(outcome, TransactionOutcome::Failed(FailureReason::NotConnected));
	assert_eq!(h.transport.send_calls(), 0);
}

#[tokio::test]
async fn request_is_forwarded_unchanged() {
	let h = connected(ScriptedTransport::new()).await;
	let submitter = TransactionSubmitter::new(h.manager.clone());
	let request = two_transfers();

	let outcome = submitter.submit(&request).await;

	assert!(outcome.is_accepted(), "{outcome:?}");
	let sent = h.transport.sent.lock().clone();
	assert_eq!(sent.len(), 1);
	assert_eq!(sent[0].method, "sendTransaction");
	assert_eq!(sent[0].request().unwrap(), Some(request.clone()));
	assert_eq!(request.total_amount(), 80_000_000);
}

#[tokio::test]
async fn wallet_cancellation_is_a_rejection() {
	let h = connected(ScriptedTransport::new()).await;
	h.transport.respond(Ok(SendTransactionResponse::failure("1", 300, "Reject request")));
	let submitter = TransactionSubmitter::new(h.manager.clone());

	let outcome = submitter.submit(&two_transfers()).await;

	assert_eq!(outcome, TransactionOutcome::Rejected(RejectReason::UserRejected));
	assert!(outcome.is_user_rejection());
	// The session survives a rejection.
	assert!(h.manager.current_state().is_connected());
}

#[tokio::test]
async fn signed_boc_is_returned() {
	let h = connected(ScriptedTransport::new()).await;
	h.transport.respond(Ok(SendTransactionResponse::success("1", "te6cckEBAgEAhwABRYgA")));
	let submitter = TransactionSubmitter::new(h.manager.clone());

	let outcome = submitter.submit(&two_transfers()).await;

	assert_eq!(
		outcome,
		TransactionOutcome::Accepted(SignedTransaction {
			boc: "te6cckEBAgEAhwABRYgA".into()
		})
	);
}

#[tokio::test]
async fn network_failure_is_classified() {
	let h = connected(ScriptedTransport::new()).await;
	h.transport.respond(Err(TransportError::Network("bridge unreachable".into())));
	let submitter = TransactionSubmitter::new(h.manager.clone());

	assert_eq!(submitter.submit(&two_transfers()).await, TransactionOutcome::Failed(FailureReason::NetworkError));
}

#[tokio::test]
async fn expired_request_is_not_sent() {
	let h = connected(ScriptedTransport::new()).await;
	let submitter = TransactionSubmitter::new(h.manager.clone());
	let stale = TransactionRequest::new(now_ts().saturating_sub(1), vec![TransactionMessage::new(RECIPIENT_A, 1)]).unwrap();

	assert_eq!(submitter.submit(&stale).await, TransactionOutcome::Failed(FailureReason::Expired));
	assert_eq!(h.transport.send_calls(), 0);
}

#[tokio::test]
async fn second_concurrent_submit_is_turned_away() {
	let (transport, gate) = ScriptedTransport::gated();
	let h = connected(transport).await;
	let submitter = TransactionSubmitter::new(h.manager.clone());

	let first = {
		let submitter = submitter.clone();
		tokio::spawn(async move { submitter.submit(&two_transfers()).await })
	};
	let transport = h.transport.clone();
	wait_until(|| transport.send_calls() == 1).await;

	let second = submitter.submit(&two_transfers()).await;
	assert_eq!(second, TransactionOutcome::Failed(FailureReason::SubmissionInProgress));

	gate.notify_one();
	let first = within(first).await.unwrap();
	assert!(first.is_accepted(), "{first:?}");
	assert_eq!(h.transport.max_concurrent_sends.load(Ordering::SeqCst), 1);

	// The slot is free again once the first request settles.
	gate.notify_one();
	assert!(submitter.submit(&two_transfers()).await.is_accepted());
	assert_eq!(h.transport.send_calls(), 2);
}

#[tokio::test]
async fn aborted_submit_releases_slot() {
	let (transport, gate) = ScriptedTransport::gated();
	let h = connected(transport).await;
	let submitter = TransactionSubmitter::new(h.manager.clone());

	let stuck = {
		let submitter = submitter.clone();
		tokio::spawn(async move { submitter.submit(&two_transfers()).await })
	};
	let transport = h.transport.clone();
	wait_until(|| transport.send_calls() == 1).await;
	stuck.abort();
	assert!(within(stuck).await.unwrap_err().is_cancelled());

	gate.notify_one();
	assert!(submitter.submit(&two_transfers()).await.is_accepted());
}

#[tokio::test]
async fn empty_request_from_json_never_reaches_wallet() {
	let h = connected(ScriptedTransport::new()).await;
	let raw = serde_json::json!({ "valid_until": now_ts() + 60, "messages": [] });

	let parsed = serde_json::from_value::<TransactionRequest>(raw);

	assert!(parsed.is_err(), "{parsed:?}");
	assert_eq!(h.transport.send_calls(), 0);
}
