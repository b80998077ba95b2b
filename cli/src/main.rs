//! CLI entrypoint for luaext
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Result, anyhow};
use clap::{CommandFactory, Parser};
use luaext_application::{ModuleLoader, RuntimeLifecycle};
use luaext_infrastructure::{
    ConfigLoader, FileConfig, JsonFileStorage, JsonSettingsStore, LuaRuntimeFactory,
    ReqwestFetcher, StandaloneHost, core_manifest, resource_source,
};
use luaext_presentation::{Cli, CommandSurface, ConsoleNotifier};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.show_config {
        print_config_sources(&cli);
        return Ok(());
    }

    let config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_ref())
            .map_err(|e| anyhow!("failed to load configuration: {}", e))?
    };

    let _log_guard = init_tracing(cli.verbose, config.logging.directory.as_deref());
    for issue in config.validate() {
        warn!("Configuration: {}", issue);
    }

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    // === Dependency Injection ===
    let host = Arc::new(build_host(&config)?);
    let factory = Arc::new(LuaRuntimeFactory::new(host.clone())?);
    let loader = ModuleLoader::new(resource_source(config.resources.directory.clone()));
    let lifecycle = Arc::new(RuntimeLifecycle::new(
        host.clone(),
        factory,
        loader,
        core_manifest()?,
    ));

    let emit_host = host.clone();
    let surface = CommandSurface::new(host.clone(), lifecycle.clone())
        .with_emitter(Box::new(move |event| emit_host.emit(event)));

    let result = surface.run(command).await;

    if lifecycle.is_ready() {
        if let Err(e) = lifecycle.shutdown().await {
            warn!("Shutdown failed: {}", e);
        }
    }
    host.close().await;

    let output = result?;
    if !output.is_empty() {
        println!("{}", output);
    }
    Ok(())
}

fn build_host(config: &FileConfig) -> Result<StandaloneHost> {
    let settings_path = config.storage.settings_path();
    info!(path = %settings_path.display(), "Opening settings");
    let settings = JsonSettingsStore::open(
        settings_path,
        config.capabilities.seed_settings(),
        config.settings.debounce(),
    )?;
    let storage = JsonFileStorage::open(config.storage.storage_path())?;

    Ok(StandaloneHost::new(
        settings,
        storage,
        ReqwestFetcher::new()?,
        Arc::new(ConsoleNotifier::new()),
    ))
}

/// Console logging goes to stderr so stdout carries only command output.
fn init_tracing(verbose: u8, log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter = match verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"), // -vvv or more
    };

    let console = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    let (file, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "luaext.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .init();

    guard
}

fn print_config_sources(cli: &Cli) {
    println!("Configuration sources (highest priority first):");
    for (label, path, found) in ConfigLoader::config_sources(cli.config.as_ref()) {
        let status = if cli.no_config {
            "disabled"
        } else if found {
            "found"
        } else {
            "not found"
        };
        println!("  {:<9} {} ({})", label, path.display(), status);
    }
}
