//! Pure connection strategy selection.

use tonlink_protocol::{ConnectionCapability, ConnectionSource, RemoteSource, WalletDescriptor};

use crate::error::{Error, Result};

/// Inputs used to select a [`ConnectionSource`].
#[derive(Debug, Clone, Copy)]
pub struct StrategyInput<'a> {
	/// Current registry snapshot, in registry order.
	pub descriptors: &'a [WalletDescriptor],
	/// App-configured relay used when nothing is embedded.
	pub default_remote: Option<&'a RemoteSource>,
}

/// Picks the pairing target for one attempt.
///
/// The first embedded wallet always wins: the signer is already in the page
/// and pairing needs no user action. Remote descriptors from the registry are
/// never chosen here; without an embedded wallet the configured default relay
/// is used so the user can open or scan one universal link.
pub fn select_strategy(input: StrategyInput<'_>) -> Result<ConnectionSource> {
	let embedded = input.descriptors.iter().find_map(|descriptor| match &descriptor.capability {
		ConnectionCapability::Embedded { bridge_key } => Some(ConnectionSource::Embedded {
			wallet_name: descriptor.name.clone(),
			bridge_key: bridge_key.clone(),
		}),
		ConnectionCapability::Remote(_) => None,
	});

	if let Some(source) = embedded {
		return Ok(source);
	}

	input
		.default_remote
		.cloned()
		.map(ConnectionSource::Remote)
		.ok_or(Error::NoStrategyAvailable)
}
