//! Subtrans - subtitle line translation adapter
//!
//! Entry point invoked as a subprocess by the subtitle pipeline. Stdout
//! carries exactly one JSON document; everything else goes to stderr.

use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;
use tokio::io::AsyncReadExt;
use tracing::{debug, error, info, warn, Level};
use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use subtrans::adapter;
use subtrans::cli::Args;
use subtrans::config::{BackendConfig, Config, LoggingConfig};
use subtrans::error::SubtransError;
use subtrans::payload;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Parse command line arguments
    let args = Args::parse();

    // Load configuration; a broken config file still gets console logging
    let config = Config::discover(args.config.as_deref());
    let logging = config.as_ref().map(|c| c.logging.clone()).unwrap_or_default();

    // Keep the file writer alive until the response is written
    let _guard = match setup_logging(args.verbose, &logging) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Logging disabled: {}", e);
            None
        }
    };

    if let Err(e) = &config {
        warn!("Configuration not loaded, only needed for translation: {}", e);
    }

    // Config errors only matter once a backend has to be built
    let backend_override = args.backend;
    let load_backend = move || -> subtrans::error::Result<BackendConfig> {
        let mut backend = config?.backend;
        if let Some(kind) = backend_override {
            backend.kind = kind;
        }
        Ok(backend)
    };

    match translate_stdin(&args, load_backend).await.and_then(|lines| payload::render(&lines)) {
        Ok(rendered) => {
            println!("{}", rendered);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{} ({})", e, e.kind());
            println!("{}", payload::render_error(&e));
            ExitCode::from(1)
        }
    }
}

async fn translate_stdin<F>(args: &Args, load_backend: F) -> subtrans::error::Result<Vec<serde_json::Value>>
where
    F: FnOnce() -> subtrans::error::Result<BackendConfig>,
{
    let mut raw = Vec::new();
    tokio::io::stdin()
        .read_to_end(&mut raw)
        .await
        .map_err(|e| SubtransError::InvalidInput(format!("Failed to read stdin: {}", e)))?;
    debug!("Read {} bytes from stdin", raw.len());

    let lines = adapter::run(&args.source, &args.target, &raw, load_backend).await?;
    info!("Produced {} lines for {}->{}", lines.len(), args.source, args.target);
    Ok(lines)
}

/// Setup logging to stderr and, when configured, a daily log file
fn setup_logging(verbose: bool, logging: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    // Determine log level
    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    // Console layer on stderr; stdout is reserved for the JSON response
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_file(true)
        .with_line_number(true);

    // Optional file layer with daily rotation
    let (file_layer, guard) = match &logging.directory {
        Some(log_dir) => {
            std::fs::create_dir_all(log_dir)?;
            let file_appender = rolling::daily(log_dir, "subtrans.log");
            let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

            let layer = fmt::layer()
                .with_writer(non_blocking_file)
                .with_target(false)
                .with_file(true)
                .with_line_number(true)
                .with_ansi(false); // No ANSI colors in file

            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    debug!("Logging initialized at {}", log_level);
    Ok(guard)
}
