//! Connector configuration.
//!
//! Loaded from a JSON file (camelCase keys) or built in code. Only
//! `manifestUrl` is required; everything else has a working default.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tonlink_protocol::RemoteSource;
use url::Url;

use crate::error::{Error, Result};

/// Schema version for config files.
pub const CONFIG_SCHEMA_VERSION: u32 = 1;

/// Public TON wallets list.
pub const DEFAULT_WALLETS_LIST_URL: &str = "https://raw.githubusercontent.com/ton-blockchain/wallets-list/main/wallets-v2.json";

/// Registry request timeout when none is configured.
pub const DEFAULT_REGISTRY_TIMEOUT_MS: u64 = 5_000;

fn config_schema_version() -> u32 {
	CONFIG_SCHEMA_VERSION
}

fn default_wallets_list_url() -> String {
	DEFAULT_WALLETS_LIST_URL.to_string()
}

fn default_registry_timeout_ms() -> u64 {
	DEFAULT_REGISTRY_TIMEOUT_MS
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectorConfig {
	#[serde(default = "config_schema_version")]
	pub schema: u32,
	/// App manifest URL handed to wallets during pairing.
	pub manifest_url: String,
	#[serde(default = "default_wallets_list_url")]
	pub wallets_list_url: String,
	/// Fallback relay used when no embedded wallet is present.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub default_remote: Option<RemoteSource>,
	/// Where the last session is persisted; see [`default_session_path`].
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub session_path: Option<PathBuf>,
	/// Persisted sessions older than this are discarded on restore.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub session_ttl_secs: Option<u64>,
	#[serde(default = "default_registry_timeout_ms")]
	pub registry_timeout_ms: u64,
}

impl ConnectorConfig {
	pub fn new(manifest_url: impl Into<String>) -> Self {
		Self {
			schema: CONFIG_SCHEMA_VERSION,
			manifest_url: manifest_url.into(),
			wallets_list_url: default_wallets_list_url(),
			default_remote: None,
			session_path: None,
			session_ttl_secs: None,
			registry_timeout_ms: DEFAULT_REGISTRY_TIMEOUT_MS,
		}
	}

	pub fn with_default_remote(mut self, remote: RemoteSource) -> Self {
		self.default_remote = Some(remote);
		self
	}

	pub fn with_wallets_list_url(mut self, url: impl Into<String>) -> Self {
		self.wallets_list_url = url.into();
		self
	}

	pub fn with_session_path(mut self, path: impl Into<PathBuf>) -> Self {
		self.session_path = Some(path.into());
		self
	}

	pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
		self.session_ttl_secs = Some(ttl.as_secs());
		self
	}

	/// Loads and validates a config file.
	pub fn load(path: &Path) -> Result<Self> {
		let content = fs::read_to_string(path)?;
		let config: Self = serde_json::from_str(&content)?;
		if config.schema != CONFIG_SCHEMA_VERSION {
			return Err(Error::Config(format!(
				"unsupported config schema {} (expected {CONFIG_SCHEMA_VERSION})",
				config.schema
			)));
		}
		config.validate()?;
		Ok(config)
	}

	/// Checks that every configured URL parses.
	pub fn validate(&self) -> Result<()> {
		parse_url("manifestUrl", &self.manifest_url)?;
		parse_url("walletsListUrl", &self.wallets_list_url)?;
		if let Some(remote) = &self.default_remote {
			parse_url("defaultRemote.universalLinkBase", &remote.universal_link_base)?;
			parse_url("defaultRemote.relayUrl", &remote.relay_url)?;
		}
		if self.registry_timeout_ms == 0 {
			return Err(Error::Config("registryTimeoutMs must be greater than zero".into()));
		}
		Ok(())
	}

	pub fn registry_timeout(&self) -> Duration {
		Duration::from_millis(self.registry_timeout_ms)
	}

	pub fn session_ttl(&self) -> Option<Duration> {
		self.session_ttl_secs.map(Duration::from_secs)
	}

	/// Configured session path, falling back to the per-user data directory.
	pub fn resolved_session_path(&self) -> Option<PathBuf> {
		self.session_path.clone().or_else(default_session_path)
	}
}

/// `<data_dir>/tonlink/session.json`, when the platform has a data directory.
pub fn default_session_path() -> Option<PathBuf> {
	dirs::data_dir().map(|dir| dir.join("tonlink").join("session.json"))
}

fn parse_url(field: &str, value: &str) -> Result<Url> {
	Url::parse(value).map_err(|e| Error::Config(format!("{field} is not a valid URL ({value:?}): {e}")))
}
