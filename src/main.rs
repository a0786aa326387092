//! DEX Scanner - graduated-token evaluation and deduplication engine

use anyhow::{Context, Result};
use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use dex_scanner::adapters::cli::{self, CliApp};
use dex_scanner::config::{load_config, LoggingSection};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (secrets go here, not in the config file)
    dotenvy::dotenv().ok();

    let app = CliApp::parse();
    let config_path = app.command.config_path().to_path_buf();
    let loaded = load_config(&config_path);

    let logging = match &loaded {
        Ok(config) => config.logging.clone(),
        Err(_) => LoggingSection::default(),
    };
    // Dropping the guard stops the file writer, so it lives until exit
    let _guard = init_logging(app.verbose, app.debug, &logging)?;

    let config = loaded
        .with_context(|| format!("Failed to load configuration from {}", config_path.display()))?;

    cli::execute(app.command, config).await
}

fn init_logging(verbose: bool, debug: bool, logging: &LoggingSection) -> Result<Option<WorkerGuard>> {
    let level = if debug {
        "debug"
    } else if verbose {
        "info"
    } else {
        logging.level.as_str()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let (file_layer, guard) = if logging.log_to_file {
        let dir = logging.log_path();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
        let appender = tracing_appender::rolling::daily(dir, "dex-scanner.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let layer = fmt::layer().with_writer(writer).with_ansi(false);
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(file_layer)
        .init();

    Ok(guard)
}
