//! streamkit console application.
//!
//! Wires the id issuer, the media engine and the pipeline service together
//! and drives the service from stdin.

mod commands;

pub use commands::{describe_event, parse_command, run_console, ConsoleCommand};

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use streamkit_engine::{create_service, Pipeline, PipelineConfig, PipelineContext};
use streamkit_ipc::{command_channel, event_channel, ids::id_channel, IdClient, IdIssuer, IdServer};
use streamkit_media::{MediaEngine, MemoryEngine};

#[derive(Parser, Debug)]
#[command(name = "streamkit")]
#[command(about = "Keeps one streaming pipeline alive across restarts", long_about = None)]
pub struct Args {
    /// Application data directory (store documents live in its Config/)
    #[arg(long, env = "STREAMKIT_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// JSON configuration file
    #[arg(long, env = "STREAMKIT_CONFIG")]
    pub config: Option<PathBuf>,

    /// How long to wait for the id issuer, in milliseconds
    #[arg(long, env = "STREAMKIT_ID_TIMEOUT_MS")]
    pub id_timeout_ms: Option<u64>,
}

/// Initialize logging.
fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "streamkit=debug,streamkit_lib=debug,streamkit_engine=debug,streamkit_media=debug,streamkit_store=debug,streamkit_ipc=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

/// Read the configuration file, if any, and apply command-line overrides.
pub fn load_config(args: &Args) -> Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            PipelineConfig::from_json(&text)
                .with_context(|| format!("Failed to parse config {}", path.display()))?
        }
        None => PipelineConfig::default(),
    };

    if let Some(ref data_dir) = args.data_dir {
        config.data_dir = data_dir.clone();
    }
    if let Some(timeout) = args.id_timeout_ms {
        config.id_timeout_ms = timeout;
    }
    Ok(config)
}

/// Run the application until the console quits.
pub fn run(args: Args) -> Result<()> {
    init_logging();
    let config = load_config(&args)?;
    info!(data_dir = %config.data_dir.display(), "streamkit starting");

    let (id_tx, id_rx) = id_channel();
    let id_server = IdServer::spawn(id_rx);

    let pipeline = {
        let engine: Arc<dyn MediaEngine> = Arc::new(MemoryEngine::new());
        let ids: Arc<dyn IdIssuer> = Arc::new(IdClient::new(id_tx, config.id_timeout()));
        let ctx = PipelineContext::new(engine, ids, &config.data_dir);
        Pipeline::new(&ctx, config.defaults.clone()).context("Failed to open pipeline stores")?
    };

    let (command_tx, command_rx) = command_channel();
    let (event_tx, event_rx) = event_channel();

    let service = thread::spawn(move || {
        info!("Pipeline thread starting");
        let mut service = create_service(pipeline, command_rx, event_tx);
        service.run();
        info!("Pipeline thread stopped");
    });

    let printer = thread::spawn(move || {
        for event in event_rx.iter() {
            println!("{}", describe_event(&event));
        }
    });

    let console = run_console(io::stdin().lock(), &command_tx);
    drop(command_tx);

    service
        .join()
        .map_err(|_| anyhow!("Pipeline thread panicked"))?;
    printer
        .join()
        .map_err(|_| anyhow!("Event printer panicked"))?;
    id_server.join();

    info!("streamkit stopped");
    console
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "id_timeout_ms": 100, "data_dir": "/from/file" }"#).unwrap();

        let args = Args {
            data_dir: Some(PathBuf::from("/from/flag")),
            config: Some(path),
            id_timeout_ms: None,
        };
        let config = load_config(&args).unwrap();

        assert_eq!(config.data_dir, PathBuf::from("/from/flag"));
        assert_eq!(config.id_timeout_ms, 100);
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let args = Args {
            data_dir: None,
            config: Some(PathBuf::from("/nonexistent/streamkit.json")),
            id_timeout_ms: None,
        };
        let err = load_config(&args).unwrap_err();
        assert!(err.to_string().contains("Failed to read config"));
    }
}
