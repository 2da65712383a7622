//! Startup sequence: purge, initial load, then optional live updates

use crate::config::{Slicer, SyncConfig};
use anyhow::Context;
use spoolsync_client::{subscribe, SpoolmanClient, FILAMENT_PATH, SPOOL_PATH};
use spoolsync_core::{Filament, Spool};
use spoolsync_engine::{purge_dir, EventRouter, FsStore, Inbound, ProgramInfo, Reconciler, TemplateSet};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Everything `run` needs, resolved from the command line and config file.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub dir: PathBuf,
    pub slicer: Slicer,
    pub url: String,
    pub updates: bool,
    pub delete_all: bool,
    /// Defaults to `templates-<slicer>`.
    pub template_dir: Option<PathBuf>,
    pub program: ProgramInfo,
    pub config: SyncConfig,
}

impl RunOptions {
    pub fn template_dir(&self) -> PathBuf {
        self.template_dir
            .clone()
            .unwrap_or_else(|| self.slicer.default_template_dir())
    }
}

/// Validate the slicer, optionally purge the output dir and wire up the engine.
/// Nothing is fetched yet.
pub async fn prepare(opts: &RunOptions) -> anyhow::Result<EventRouter> {
    let suffixes = opts.slicer.suffix_set()?;
    let template_dir = opts.template_dir();
    info!(
        "Writing {} configs to {} using templates in {}",
        opts.slicer,
        opts.dir.display(),
        template_dir.display()
    );

    if opts.delete_all {
        let removed = purge_dir(&opts.dir, &suffixes)
            .await
            .with_context(|| format!("Failed to clean {}", opts.dir.display()))?;
        info!("Deleted {} existing configs", removed);
    }

    let templates = TemplateSet::from_dir(&template_dir, opts.program.clone());
    let engine = Reconciler::new(suffixes, opts.dir.clone(), templates, Arc::new(FsStore));
    Ok(EventRouter::new(engine))
}

pub async fn run(opts: RunOptions) -> anyhow::Result<()> {
    let mut router = prepare(&opts).await?;

    let client = SpoolmanClient::new(opts.url.as_str(), opts.config.fetch_timeout())?;
    let spools = client
        .fetch_spools()
        .await
        .with_context(|| format!("Could not connect to Spoolman at {}", client.base_url()))?;
    router.load_inventory(&spools).await?;
    info!(
        "Initial load done: {} files in {}",
        router.engine().tracked_files().len(),
        opts.dir.display()
    );

    if !opts.updates {
        return Ok(());
    }
    follow_updates(router, &client, &opts.config).await
}

/// Stream spool and filament changes into the router until ctrl-c, or until
/// the router hits a fatal error.
async fn follow_updates(
    router: EventRouter,
    client: &SpoolmanClient,
    config: &SyncConfig,
) -> anyhow::Result<()> {
    let (tx, rx) = mpsc::channel(config.queue_capacity());
    let cancel = CancellationToken::new();

    let producers = [
        tokio::spawn(subscribe::<Spool, Inbound>(
            client.ws_endpoint(SPOOL_PATH)?,
            config.reconnect.clone(),
            tx.clone(),
            Inbound::Spool,
            cancel.clone(),
        )),
        tokio::spawn(subscribe::<Filament, Inbound>(
            client.ws_endpoint(FILAMENT_PATH)?,
            config.reconnect.clone(),
            tx,
            Inbound::Filament,
            cancel.clone(),
        )),
    ];

    let mut worker = tokio::spawn(router.run(rx));
    let finished = tokio::select! {
        joined = &mut worker => joined,
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, draining queued updates");
            cancel.cancel();
            worker.await
        }
    };

    cancel.cancel();
    for producer in producers {
        producer.await?;
    }

    finished??;
    info!("Stopped");
    Ok(())
}
