pub mod audio;
pub mod breathing;
pub mod catalog;
pub mod cli;
pub mod clock;
pub mod config;
pub mod duration;
pub mod events;
pub mod insight;
pub mod llm;
pub mod models;
pub mod session;

#[cfg(test)]
mod test_utils;

use clap::Parser;
use config::AppConfig;
use tracing::error;

const DEFAULT_LOG_FILTER: &str = "mindful_moments_lib=info";

pub fn run() {
  // Load environment variables from .env file
  dotenvy::dotenv().ok();
  init_logging();

  let args = cli::Args::parse();
  let config = match AppConfig::from_env() {
    Ok(config) => config,
    Err(e) => {
      error!("Failed to load configuration: {}", e);
      std::process::exit(2);
    }
  };

  let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
    Ok(runtime) => runtime,
    Err(e) => {
      error!("Failed to start async runtime: {}", e);
      std::process::exit(1);
    }
  };

  if let Err(e) = runtime.block_on(cli::run(args, config)) {
    error!("Session failed: {}", e);
    std::process::exit(1);
  }
}

/// Log to stderr so session output on stdout stays clean
fn init_logging() {
  use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

  tracing_subscriber::registry()
    .with(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
    )
    .with(
      tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false),
    )
    .init();
}
