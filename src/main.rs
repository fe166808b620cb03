// src/main.rs

//! The main entry point for the standalone RetroLink client.

use anyhow::{Result, anyhow};
use retrolink::config::Config;
use retrolink::core::HandlerRegistry;
use retrolink::watcher::{self, DetachedHost};
use std::env;
use std::sync::Arc;
use tokio::signal::unix::{SignalKind, signal};
use tracing::{error, info};
use tracing_subscriber::filter::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    run_app().await
}

async fn run_app() -> Result<()> {
    const VERSION: &str = env!("RETROLINK_BUILD_VERSION");

    let args: Vec<String> = env::args().collect();

    if args.contains(&"--version".to_string()) {
        println!("RetroLink version {VERSION}");
        return Ok(());
    }

    // Without --config the built-in defaults are used.
    let mut config = match args
        .iter()
        .position(|arg| arg == "--config")
        .map(|i| args.get(i + 1))
    {
        Some(Some(path)) => match Config::from_file(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("Failed to load configuration from \"{path}\": {e:#}");
                std::process::exit(1);
            }
        },
        Some(None) => {
            eprintln!("--config flag requires a value");
            std::process::exit(1);
        }
        None => Config::default(),
    };

    if let Some(host) = flag_value(&args, "--host") {
        config.host = host.to_string();
    }
    if let Some(port_str) = flag_value(&args, "--port") {
        match port_str.parse::<u16>() {
            Ok(port) if port != 0 => config.port = port,
            _ => {
                eprintln!("Invalid port number: {port_str}");
                std::process::exit(1);
            }
        }
    }

    let log_level = env::var("RUST_LOG").unwrap_or_else(|_| config.log_level.clone());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(log_level))
        .compact()
        .with_ansi(true)
        .init();

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {:#}", e);
        return Err(e);
    }

    info!("Starting RetroLink {}...", VERSION);

    // Game handlers are linked in by applications embedding the library; the
    // standalone binary only keeps the emulator link alive and reports status.
    let registry = Arc::new(HandlerRegistry::new());
    let (task, handle) = watcher::spawn(&config, registry, Box::new(DetachedHost));

    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow!("Failed to register SIGINT handler: {}", e))?;
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow!("Failed to register SIGTERM handler: {}", e))?;

    let mut states = handle.state_changes();
    loop {
        tokio::select! {
            _ = sigint.recv() => {
                info!("SIGINT received, shutting down.");
                break;
            }
            _ = sigterm.recv() => {
                info!("SIGTERM received, shutting down.");
                break;
            }
            Ok(()) = states.changed() => {
                info!("Emulator link: {}", *states.borrow_and_update());
            }
        }
    }

    handle.shutdown();
    if let Err(e) = task.await {
        error!("Watcher task failed: {e:?}");
    }
    Ok(())
}

/// Returns the value following `flag`, exiting if the flag is present without one.
fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    let index = args.iter().position(|arg| arg == flag)?;
    match args.get(index + 1) {
        Some(value) => Some(value.as_str()),
        None => {
            eprintln!("{flag} flag requires a value");
            std::process::exit(1);
        }
    }
}
