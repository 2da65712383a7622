//! spoolsync: Spoolman to slicer filament config sync
//!
//! Usage:
//!   spoolsync -d ~/.config/SuperSlicer/filament              one-shot sync
//!   spoolsync -d ./filament -s orcaslicer -U                 sync, then follow updates
//!   spoolsync -d ./filament -D -u http://spoolman:7912      purge old configs first
//!   spoolsync --dump-config                                  print default tuning file

use anyhow::anyhow;
use clap::Parser;
use spoolsync::{run, RunOptions, Slicer, SyncConfig};
use spoolsync_engine::ProgramInfo;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(
    name = "spoolsync",
    about = "Generate slicer filament configs from Spoolman and keep them updated",
    version = env!("CARGO_PKG_VERSION")
)]
struct Cli {
    /// Slicer filament config directory
    #[arg(short, long, required_unless_present = "dump_config")]
    dir: Option<PathBuf>,

    /// Slicer to generate configs for
    #[arg(short, long, value_enum, default_value_t = Slicer::Superslicer)]
    slicer: Slicer,

    /// Spoolman base URL
    #[arg(short, long, default_value = "http://mainsailos.local:7912")]
    url: String,

    /// Keep running and apply spool/filament updates as they happen
    #[arg(short = 'U', long, default_value_t = false)]
    updates: bool,

    /// Delete every existing config with a matching suffix before the initial load
    #[arg(short = 'D', long, default_value_t = false)]
    delete_all: bool,

    /// Log template selection and rendered fields
    #[arg(short, long, default_value_t = false)]
    verbose: bool,

    /// Template directory (default: templates-<slicer>)
    #[arg(long)]
    template_dir: Option<PathBuf>,

    /// Path to tuning config file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Dump default config as TOML and exit
    #[arg(long)]
    dump_config: bool,

    /// Write logs to a file (in addition to stdout)
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.dump_config {
        println!("{}", SyncConfig::default().to_toml());
        return Ok(());
    }

    let _guard = init_tracing(cli.verbose, cli.log_file.as_deref())?;

    let config = cli
        .config
        .as_deref()
        .map(SyncConfig::load)
        .unwrap_or_default();
    let dir = cli.dir.ok_or_else(|| anyhow!("--dir is required"))?;

    run(RunOptions {
        dir,
        slicer: cli.slicer,
        url: cli.url,
        updates: cli.updates,
        delete_all: cli.delete_all,
        template_dir: cli.template_dir,
        program: ProgramInfo::new("spoolsync", env!("CARGO_PKG_VERSION")),
        config,
    })
    .await
}

/// Console logging plus an optional plain-text file. The returned guard
/// flushes the file writer on drop and must live until exit.
fn init_tracing(verbose: bool, log_file: Option<&Path>) -> anyhow::Result<Option<WorkerGuard>> {
    let default_filter = if verbose { "spoolsync=debug" } else { "spoolsync=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let file_name = path
                .file_name()
                .ok_or_else(|| anyhow!("--log-file needs a file name: {}", path.display()))?;
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .init();
    Ok(guard)
}
