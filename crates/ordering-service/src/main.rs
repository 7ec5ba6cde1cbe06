//! Main entry point for the ordering CLI.
//!
//! Loads configuration, builds the ordering engine from the configured
//! storage, draft store and catalog implementations, and runs one command
//! against it. Results are printed to stdout as JSON.

use clap::Parser;
use ordering_config::Config;
use std::path::PathBuf;

mod commands;
mod factory_registry;

use commands::Command;
use factory_registry::FactoryRegistry;

/// Command-line arguments for the ordering CLI.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config/ordering.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,

	#[command(subcommand)]
	command: Command,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	use tracing_subscriber::{fmt, EnvFilter};

	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

	// Logs go to stderr so stdout stays valid JSON
	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.with_writer(std::io::stderr)
		.init();

	let config = Config::from_file(&args.config).await?;
	tracing::info!(config = %args.config.display(), "Loaded configuration");

	let engine = FactoryRegistry::with_defaults().build_engine(config)?;
	engine.initialize().await;

	let output = commands::run(&engine, args.command).await?;
	println!("{}", serde_json::to_string_pretty(&output)?);

	Ok(())
}
