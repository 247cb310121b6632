//! Command-line probe for Koru widget authorization
//!
//! Loads a provider config, resolves it once (optionally reloading) and
//! prints what a consumer would see.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use koru_auth_core::prelude::*;
use serde_json::json;
use tracing::info;

#[derive(Parser)]
#[command(name = "koru-probe")]
#[command(about = "Check a Koru website/app authorization", long_about = None)]
struct Cli {
    /// Provider config file (YAML)
    #[arg(short, long, default_value = "koru.yaml")]
    config: PathBuf,

    /// Persist the cache in this directory instead of memory
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Purge the cached authorization and resolve again after the first pass
    #[arg(long)]
    reload: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = ProviderConfig::load(&cli.config)?;

    let log_level = if cli.verbose || config.options.debug {
        "debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt().with_env_filter(log_level).init();

    let cache = match &cli.cache_dir {
        Some(dir) => CacheStore::new(FileStore::new(dir)),
        None => CacheStore::new(MemoryStore::new()),
    };
    let resolver = Resolver::new(cache);

    let registry = ProviderRegistry::new();
    let (provider, task) = AuthProvider::mount(resolver, config.into_params());
    let scope = registry.mount(provider);
    task.await.context("Authorization task panicked")?;

    if cli.reload {
        info!("Reloading authorization");
        registry.provider(&scope)?.reload().await;
    }

    let state = registry.provider(&scope)?.state();
    let view = registry.use_auth(&scope)?;
    let output = json!({
        "gate": gate(&state).select("loading", "fallback", "content"),
        "isAuthorized": view.is_authorized,
        "loading": view.loading,
        "error": view.error.as_ref().map(|e| e.to_string()),
        "token": view.token,
        "config": view.config,
        "authData": view.auth_data.as_deref(),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);

    registry.unmount(&scope);
    Ok(())
}
