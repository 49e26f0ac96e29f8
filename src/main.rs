use anyhow::{Context, Result};
use chatlog_viewer::{CliOptions, Config, run};
use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let options = CliOptions::parse();
    let config = Config::from_env().context("Invalid configuration")?;

    init_tracing(&config.log.rust_log);

    tracing::info!("Starting chatlog-viewer against {}", config.server.base_url);

    run::run(options, config).await
}

fn init_tracing(default_filter: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .with_file(true)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}
