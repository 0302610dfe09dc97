use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Filter directives for a verbosity level when `RUST_LOG` is unset.
///
/// Events carry a `target` field (`tonlink.session`, `tonlink.registry`,
/// `tonlink.tx`) for structured output; filtering goes by module path.
pub fn default_directives(verbosity: u8) -> &'static str {
	match verbosity {
		0 => "error",
		// connection lifecycle and transaction outcomes; registry parsing stays quiet
		1 => "warn,tonlink::manager=info,tonlink::submitter=info,tonlink::registry=warn",
		2 => "warn,tonlink=debug,tonlink_protocol=debug",
		_ => "debug,tonlink=trace",
	}
}

/// Installs a stderr `fmt` subscriber for apps embedding the connector.
///
/// `RUST_LOG` wins over `verbosity` when set. Returns `false` when a global
/// subscriber was already installed.
pub fn init_logging(verbosity: u8) -> bool {
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives(verbosity)));

	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr.with_max_level(tracing::Level::TRACE))
		.with_target(true)
		.compact()
		.try_init()
		.is_ok()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn every_level_yields_valid_directives() {
		for verbosity in 0..=3 {
			let directives = default_directives(verbosity);
			assert!(EnvFilter::try_new(directives).is_ok(), "{verbosity}: {directives}");
		}
		assert!(default_directives(1).contains("tonlink::manager=info"));
	}

	#[test]
	fn second_init_reports_existing_subscriber() {
		init_logging(2);
		assert!(!init_logging(0));
	}
}
