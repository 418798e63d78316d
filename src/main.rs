//! Bridge server: link game players to chat users and relay game messages as direct messages.

// std
use std::process::ExitCode;
// crates.io
use dm_bridge::{
	api,
	config::AppConfig,
	obs::{self, TracingConfig},
};

#[tokio::main]
async fn main() -> ExitCode {
	let config = AppConfig::from_env();
	let tracing_config = match &config {
		Ok(config) if config.log_json => TracingConfig::production(),
		_ => TracingConfig::default(),
	};

	if let Err(e) = obs::try_init_subscriber(&tracing_config) {
		eprintln!("{e}");
	}

	let result = match config {
		Ok(config) => api::serve(config).await,
		Err(e) => Err(e),
	};

	match result {
		Ok(()) => ExitCode::SUCCESS,
		Err(e) => {
			tracing::error!(error = ?e, "Bridge exited with an error.");

			ExitCode::FAILURE
		},
	}
}
