//! Wallet discovery.
//!
//! A registry returns the wallets able to connect from the current
//! environment. Results are never cached here; the manager keeps the last
//! snapshot and decides when to fetch again.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use tonlink_protocol::{WalletDescriptor, WalletsListEntry};
use tracing::debug;

use crate::config::ConnectorConfig;
use crate::error::{Error, Result};

#[async_trait]
pub trait WalletRegistry: Send + Sync {
	/// Fetches a full snapshot. Fails with [`Error::RegistryUnavailable`] when
	/// the discovery source cannot be reached.
	async fn fetch_wallets(&self) -> Result<Vec<WalletDescriptor>>;
}

/// Registry backed by the HTTP wallets list.
pub struct HttpWalletRegistry {
	client: reqwest::Client,
	url: String,
	injected_keys: HashSet<String>,
}

impl HttpWalletRegistry {
	pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
		let client = reqwest::Client::builder()
			.timeout(timeout)
			.build()
			.map_err(|e| Error::Config(format!("failed to create HTTP client: {e}")))?;
		Ok(Self {
			client,
			url: url.into(),
			injected_keys: HashSet::new(),
		})
	}

	pub fn from_config(config: &ConnectorConfig) -> Result<Self> {
		Self::new(config.wallets_list_url.clone(), config.registry_timeout())
	}

	/// Declares which JS bridge keys are injected in the hosting page.
	pub fn with_injected_keys<I, S>(mut self, keys: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.injected_keys = keys.into_iter().map(Into::into).collect();
		self
	}
}

#[async_trait]
impl WalletRegistry for HttpWalletRegistry {
	async fn fetch_wallets(&self) -> Result<Vec<WalletDescriptor>> {
		let response = self
			.client
			.get(&self.url)
			.send()
			.await
			.map_err(|e| Error::RegistryUnavailable(format!("{}: {e}", self.url)))?;

		if !response.status().is_success() {
			return Err(Error::RegistryUnavailable(format!("{}: unexpected status {}", self.url, response.status())));
		}

		let entries: Vec<serde_json::Value> = response
			.json()
			.await
			.map_err(|e| Error::RegistryUnavailable(format!("failed to parse wallets list: {e}")))?;

		let wallets = descriptors_from_entries(entries, |key| self.injected_keys.contains(key));
		debug!(target = "tonlink.registry", url = %self.url, count = wallets.len(), "fetched wallets list");
		Ok(wallets)
	}
}

/// Registry returning a fixed snapshot.
#[derive(Debug, Clone, Default)]
pub struct StaticWalletRegistry {
	wallets: Vec<WalletDescriptor>,
}

impl StaticWalletRegistry {
	pub fn new(wallets: Vec<WalletDescriptor>) -> Self {
		Self { wallets }
	}
}

#[async_trait]
impl WalletRegistry for StaticWalletRegistry {
	async fn fetch_wallets(&self) -> Result<Vec<WalletDescriptor>> {
		Ok(self.wallets.clone())
	}
}

/// Converts raw wallets-list records into a snapshot.
///
/// Malformed records are skipped rather than failing the whole list, and
/// only the first wallet with a given name is kept.
pub fn descriptors_from_entries(entries: Vec<serde_json::Value>, is_injected: impl Fn(&str) -> bool) -> Vec<WalletDescriptor> {
	let mut seen = HashSet::new();
	let mut wallets = Vec::with_capacity(entries.len());

	for raw in entries {
		let entry: WalletsListEntry = match serde_json::from_value(raw) {
			Ok(entry) => entry,
			Err(err) => {
				debug!(target = "tonlink.registry", error = %err, "skipping malformed wallets list entry");
				continue;
			}
		};
		let app_name = entry.app_name.clone();
		let Some(descriptor) = entry.into_descriptor(&is_injected) else {
			debug!(target = "tonlink.registry", app = %app_name, "wallet has no reachable bridge");
			continue;
		};
		if !seen.insert(descriptor.name.clone()) {
			debug!(target = "tonlink.registry", name = %descriptor.name, "duplicate wallet name dropped");
			continue;
		}
		wallets.push(descriptor);
	}

	wallets
}
