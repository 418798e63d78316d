// crates.io
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
// self
use crate::_prelude::*;

/// Subscriber options for the bridge binary.
#[derive(Clone, Debug)]
pub struct TracingConfig {
	/// Filter directive used when `RUST_LOG` is unset.
	pub default_directive: String,
	/// Emit one JSON object per event instead of the human-readable format.
	pub json: bool,
	/// Include file and line numbers.
	pub file_line: bool,
}
impl TracingConfig {
	/// Production preset: JSON lines without source locations.
	pub fn production() -> Self {
		Self { json: true, file_line: false, ..Default::default() }
	}
}
impl Default for TracingConfig {
	fn default() -> Self {
		Self { default_directive: "info".into(), json: false, file_line: true }
	}
}

/// Subscriber installation failure.
#[derive(Debug, ThisError)]
pub enum SubscriberError {
	/// A global subscriber was already installed.
	#[error("Tracing subscriber already initialized.")]
	AlreadyInitialized,
}

/// Installs the global subscriber. `RUST_LOG` wins over [`TracingConfig::default_directive`].
///
/// Safe to call more than once; later calls report [`SubscriberError::AlreadyInitialized`].
pub fn try_init_subscriber(config: &TracingConfig) -> Result<(), SubscriberError> {
	let env_filter = EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| EnvFilter::new(&config.default_directive));
	let json_layer = config.json.then(|| {
		fmt::layer().json().with_file(config.file_line).with_line_number(config.file_line)
	});
	let text_layer = (!config.json)
		.then(|| fmt::layer().with_file(config.file_line).with_line_number(config.file_line));

	tracing_subscriber::registry()
		.with(env_filter)
		.with(json_layer)
		.with(text_layer)
		.try_init()
		.map_err(|_| SubscriberError::AlreadyInitialized)
}
