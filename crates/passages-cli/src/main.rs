//! passages - loads the waste-collection passages dataset.
//!
//! Downloads every passage from the public API (or serves the local copy when
//! it is less than a day old), shows progress on stderr and optionally writes
//! the records to a JSON file.

mod args;

use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use passages_core::fetch::concurrency;
use passages_core::{Acquirer, ApiClient, CacheStore, Config, PreloadHandle, ProgressEvent, Record};

use args::Args;

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();
    init_tracing();

    let args = match Args::parse(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{}\n\n{}", e, args::USAGE);
            std::process::exit(2);
        }
    };
    if args.help {
        println!("{}", args::USAGE);
        return Ok(());
    }

    let mut config = Config::load().context("Failed to load config")?;
    config.apply_env();
    config.validate()?;

    let cache_dir = config.cache_dir()?;
    let cache = CacheStore::open(cache_dir.clone())
        .with_context(|| format!("Failed to open cache directory {}", cache_dir.display()))?;

    if args.clear_cache {
        cache.clear();
        eprintln!("Cache cleared");
        return Ok(());
    }
    if args.cache_info {
        print_cache_info(&cache);
        return Ok(());
    }

    let client = ApiClient::from_config(&config)?;
    info!(url = %client.pages_url(), "Passages loader starting");

    let records = if args.legacy {
        let loaded = tokio::time::timeout(config.timeout(), client.fetch_legacy()).await;
        match loaded {
            Ok(Ok(records)) => records,
            Ok(Err(e)) => fallback(&e),
            Err(_) => fallback(&format!("Loading took longer than {:?}", config.timeout())),
        }
    } else {
        load(config, client, cache, &args).await
    };

    if let Some(path) = &args.output {
        let contents = serde_json::to_string(&records)?;
        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        eprintln!("Wrote {} passages to {}", records.len(), path.display());
    } else {
        println!("{} passages loaded", records.len());
    }

    info!("Passages loader done");
    Ok(())
}

/// Acquire the dataset, falling back to an empty one on any failure.
async fn load(config: Config, client: ApiClient, cache: CacheStore, args: &Args) -> Vec<Record> {
    let use_cache = config.use_cache && !args.no_cache;
    let timeout = config.timeout();

    // Fire page 1 before the engine is built unless the cache will answer
    let preload = if args.refresh || !use_cache || !cache.is_valid() {
        PreloadHandle::spawn(client.clone(), config.page_size)
    } else {
        PreloadHandle::none()
    };

    let acquirer = Arc::new(
        Acquirer::new(client, config.page_size)
            .with_cache(cache)
            .with_preload(preload)
            .with_concurrency(concurrency::from_network(config.network_class))
            .with_deferred_writes(true),
    );

    let from_cache = AtomicBool::new(false);
    let on_progress = |event: &ProgressEvent| {
        if event.from_cache {
            from_cache.store(true, Ordering::Relaxed);
        }
        render_progress(event);
    };

    let result = if args.refresh {
        tokio::time::timeout(timeout, acquirer.refresh(Some(&on_progress)))
            .await
            .unwrap_or(Err(passages_core::FetchError::Timeout(timeout)))
    } else {
        acquirer
            .acquire_with_timeout(use_cache, Some(&on_progress), timeout)
            .await
    };
    eprintln!();

    let records = match result {
        Ok(records) => records,
        Err(e) => fallback(&e),
    };

    if from_cache.load(Ordering::Relaxed) {
        refresh_in_background(&acquirer, timeout).await;
    }

    let stored = acquirer.flush_writes().await;
    debug!(stored = stored, "Cache writes flushed");
    records
}

/// Refresh the cached copy; the process waits for it at most `timeout`.
async fn refresh_in_background(acquirer: &Arc<Acquirer<ApiClient>>, timeout: Duration) {
    let refresh = acquirer.spawn_refresh();
    if tokio::time::timeout(timeout, refresh).await.is_err() {
        warn!(timeout = ?timeout, "Background refresh still running at exit, abandoning it");
    }
}

fn fallback(error: &dyn std::fmt::Display) -> Vec<Record> {
    eprintln!("Error: {}", error);
    eprintln!("Continuing with an empty dataset");
    Vec::new()
}

fn render_progress(event: &ProgressEvent) {
    let percent = event
        .percent()
        .unwrap_or_else(|| event.page.map_or(5, |page| (5 + page * 15).min(95) as u8));
    let total = if event.total > 0 {
        event.total.to_string()
    } else {
        "?".to_string()
    };
    let source = if event.from_cache { " (cache)" } else { "" };

    let mut stderr = io::stderr();
    let _ = write!(stderr, "\rLoading... ({}/{}) {:>3}%{}", event.current, total, percent, source);
    let _ = stderr.flush();
}

fn print_cache_info(cache: &CacheStore) {
    match cache.entry() {
        Some(entry) => println!(
            "Cache: {} passages, updated {} (version {})",
            entry.data.len(),
            entry.age_display(),
            entry.version
        ),
        None => match cache.age_hours() {
            Some(hours) => println!("Cache: unusable entry, {}h old", hours),
            None => println!("Cache: empty"),
        },
    }
}
