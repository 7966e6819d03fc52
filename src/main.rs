// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use anyhow::Context;
use clap::Parser;
use object_sync::{LocalFsStore, StoreRef, SyncConfig, Syncer};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "object-sync")]
#[command(about = "Copy objects missing at the destination from the source store", long_about = None)]
struct Args {
    /// Source store (file://PATH or a bare path)
    source: String,

    /// Destination store (file://PATH or a bare path), created if absent
    destination: String,

    /// Only sync keys strictly after this marker
    #[arg(long)]
    start: Option<String>,

    /// Only sync keys strictly before this key (empty for no bound)
    #[arg(long)]
    end: Option<String>,

    /// Number of replication workers
    #[arg(short = 'p', long)]
    threads: Option<usize>,

    /// Log every object (disables the progress bar)
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log warnings and errors (disables the progress bar)
    #[arg(short, long)]
    quiet: bool,

    /// JSON config file; flags override its values
    #[arg(long)]
    config: Option<PathBuf>,
}

fn store_path(location: &str) -> PathBuf {
    PathBuf::from(location.strip_prefix("file://").unwrap_or(location))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose {
        "object_sync=debug"
    } else if args.quiet {
        "object_sync=warn"
    } else {
        "object_sync=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut config = match &args.config {
        Some(path) => SyncConfig::from_json_file(path)?,
        None => SyncConfig::default(),
    };
    if let Some(start) = args.start {
        config.marker = start;
    }
    if args.end.is_some() {
        config.end = args.end;
    }
    if let Some(threads) = args.threads {
        config.threads = threads;
    }
    config.progress.enabled = std::io::stdout().is_terminal() && !args.verbose && !args.quiet;

    let source_root = store_path(&args.source);
    if !source_root.is_dir() {
        anyhow::bail!("Source {} is not a directory", source_root.display());
    }
    let source: StoreRef = Arc::new(LocalFsStore::new(source_root));
    let destination: StoreRef = Arc::new(
        LocalFsStore::create(store_path(&args.destination))
            .await
            .with_context(|| format!("Can't open destination {}", args.destination))?,
    );

    let syncer = Syncer::new(source, destination, config);
    let shutdown = syncer.shutdown_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, finishing in-flight objects");
            shutdown.trigger();
        }
    });

    match syncer.run().await {
        Ok(_) => Ok(()),
        Err(e) if e.is_fatal() => {
            tracing::error!(error = %e, "Fatal error, aborting");
            std::process::exit(2);
        }
        Err(e) => Err(e.into()),
    }
}
