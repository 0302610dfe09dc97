//! Last-session persistence.
//!
//! Restoration is best-effort: a missing, corrupt, outdated, or expired
//! record reads as "no session" so a fresh connection can always proceed.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tonlink_protocol::Session;
use tracing::{debug, warn};

use crate::error::Result;

/// Current on-disk schema version for persisted sessions.
pub const SESSION_RECORD_SCHEMA_VERSION: u32 = 1;

pub trait SessionStore: Send + Sync {
	/// Returns the persisted session when one is present and usable.
	fn try_restore(&self) -> Option<Session>;

	fn save(&self, session: &Session) -> Result<()>;

	fn clear(&self) -> Result<()>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionRecord {
	schema_version: u32,
	session: Session,
	/// Unix epoch seconds.
	saved_at: u64,
}

/// JSON file store.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
	path: PathBuf,
	ttl: Option<Duration>,
}

impl FileSessionStore {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into(), ttl: None }
	}

	/// Records older than `ttl` (by `establishedAt`) are discarded on restore.
	pub fn with_ttl(mut self, ttl: Option<Duration>) -> Self {
		self.ttl = ttl;
		self
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	fn load_record(&self) -> Option<SessionRecord> {
		let content = match fs::read_to_string(&self.path) {
			Ok(c) => c,
			Err(err) if err.kind() == std::io::ErrorKind::NotFound => return None,
			Err(err) => {
				warn!(target = "tonlink.session", path = %self.path.display(), error = %err, "failed to read persisted session");
				return None;
			}
		};

		let record: SessionRecord = match serde_json::from_str(&content) {
			Ok(record) => record,
			Err(err) => {
				debug!(target = "tonlink.session", path = %self.path.display(), error = %err, "discarding malformed session record");
				self.discard();
				return None;
			}
		};

		if record.schema_version != SESSION_RECORD_SCHEMA_VERSION {
			debug!(
				target = "tonlink.session",
				path = %self.path.display(),
				schema_version = record.schema_version,
				"discarding session record with unsupported schema"
			);
			self.discard();
			return None;
		}

		if !record.session.is_well_formed() {
			debug!(target = "tonlink.session", path = %self.path.display(), "discarding session record with blank account");
			self.discard();
			return None;
		}

		Some(record)
	}

	fn discard(&self) {
		let _ = fs::remove_file(&self.path);
	}
}

impl SessionStore for FileSessionStore {
	fn try_restore(&self) -> Option<Session> {
		let record = self.load_record()?;
		if is_expired(&record.session, self.ttl, now_ts()) {
			debug!(target = "tonlink.session", wallet = %record.session.wallet_name, "discarding expired session record");
			self.discard();
			return None;
		}
		Some(record.session)
	}

	fn save(&self, session: &Session) -> Result<()> {
		if let Some(parent) = self.path.parent() {
			fs::create_dir_all(parent)?;
		}
		let record = SessionRecord {
			schema_version: SESSION_RECORD_SCHEMA_VERSION,
			session: session.clone(),
			saved_at: now_ts(),
		};
		fs::write(&self.path, serde_json::to_string_pretty(&record)?)?;
		Ok(())
	}

	fn clear(&self) -> Result<()> {
		match fs::remove_file(&self.path) {
			Ok(()) => Ok(()),
			Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
			Err(err) => Err(err.into()),
		}
	}
}

/// In-process store, for hosts without a filesystem and for tests.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
	session: Mutex<Option<Session>>,
	ttl: Option<Duration>,
}

impl MemorySessionStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_session(session: Session) -> Self {
		Self {
			session: Mutex::new(Some(session)),
			ttl: None,
		}
	}

	pub fn with_ttl(mut self, ttl: Option<Duration>) -> Self {
		self.ttl = ttl;
		self
	}

	/// Returns the stored session without expiry checks.
	pub fn peek(&self) -> Option<Session> {
		self.session.lock().clone()
	}
}

impl SessionStore for MemorySessionStore {
	fn try_restore(&self) -> Option<Session> {
		let mut slot = self.session.lock();
		if slot.as_ref().is_some_and(|s| is_expired(s, self.ttl, now_ts())) {
			*slot = None;
		}
		slot.clone()
	}

	fn save(&self, session: &Session) -> Result<()> {
		*self.session.lock() = Some(session.clone());
		Ok(())
	}

	fn clear(&self) -> Result<()> {
		*self.session.lock() = None;
		Ok(())
	}
}

fn is_expired(session: &Session, ttl: Option<Duration>, now: u64) -> bool {
	match ttl {
		Some(ttl) => session.established_at.saturating_add(ttl.as_secs()) <= now,
		None => false,
	}
}

/// Current Unix timestamp in seconds.
pub fn now_ts() -> u64 {
	std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).unwrap_or_default().as_secs()
}
