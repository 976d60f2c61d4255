//! # sonicshift
//!
//! Command-line front end: registers files, converts them concurrently while
//! printing progress, then exports the results into a directory.

#![deny(unsafe_code)]

mod render;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use sonicshift_core::{AudioFormat, FileStatus, RawFile};
use sonicshift_runtime::{Converter, ExportOutcome, FormatChange, FsDownloadSink};
use sonicshift_settings::SonicShiftSettings;

use render::{ProgressRenderer, summary_line};

/// Batch audio format conversion.
#[derive(Parser, Debug)]
#[command(name = "sonicshift", version, about = "Batch audio format conversion")]
struct Cli {
    /// Settings file (defaults to `~/.sonicshift/settings.json`).
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Log filter when `RUST_LOG` is unset (overrides settings).
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert files and export the results.
    Convert {
        /// Input files.
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Target format for every file.
        #[arg(long, short, default_value_t = AudioFormat::Mp3)]
        format: AudioFormat,

        /// Output directory.
        #[arg(long, short, default_value = ".")]
        out: PathBuf,

        /// Skip the AI description request.
        #[arg(long)]
        no_describe: bool,
    },
    /// List supported output formats.
    Formats,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = match &cli.settings {
        Some(path) => sonicshift_settings::load_settings_from_path(path),
        None => sonicshift_settings::load_settings(),
    };
    let (mut settings, settings_error) = match loaded {
        Ok(s) => (s, None),
        Err(e) => (SonicShiftSettings::default(), Some(e)),
    };

    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| settings.logging.level.clone());
    if settings.logging.json {
        sonicshift_core::logging::init_json_subscriber(&level);
    } else {
        sonicshift_core::logging::init_subscriber(&level);
    }
    if let Some(e) = settings_error {
        warn!(error = %e, "failed to load settings, using defaults");
    }

    match cli.command {
        Command::Formats => {
            for format in AudioFormat::ALL {
                println!("{format}\t{}", format.mime_type());
            }
            Ok(())
        }
        Command::Convert {
            files,
            format,
            out,
            no_describe,
        } => {
            if no_describe {
                settings.describe.enabled = false;
            }
            convert(&settings, &files, format, &out).await
        }
    }
}

async fn read_input(path: &Path) -> Result<RawFile> {
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .with_context(|| format!("Not a file path: {}", path.display()))?;
    let raw = RawFile::from_name(name, data);
    if !raw.matches_picker_filter() {
        warn!(name = %raw.name, mime_type = %raw.mime_type, "file is not audio, converting anyway");
    }
    Ok(raw)
}

async fn convert(
    settings: &SonicShiftSettings,
    paths: &[PathBuf],
    format: AudioFormat,
    out: &Path,
) -> Result<()> {
    let mut inputs = Vec::with_capacity(paths.len());
    for path in paths {
        inputs.push(read_input(path).await?);
    }

    let converter = Converter::new(settings);
    let mut rx = converter.subscribe();
    let mut renderer = ProgressRenderer::new();

    let ids = converter.add_files(inputs);
    for id in &ids {
        if let FormatChange::Locked(status) = converter.set_format(id, format) {
            bail!("format of {id} is locked ({status})");
        }
    }
    let handles = converter.start_all();

    let work = async {
        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "conversion task failed");
            }
        }
        converter.settle_descriptions().await;
    };
    tokio::pin!(work);

    loop {
        tokio::select! {
            () = &mut work => break,
            event = rx.recv() => match event {
                Ok(event) => {
                    if let Some(line) = renderer.render(&event) {
                        println!("{line}");
                    }
                }
                Err(RecvError::Lagged(n)) => warn!(skipped = n, "progress output lagged"),
                Err(RecvError::Closed) => break,
            },
            result = tokio::signal::ctrl_c() => {
                result.context("Failed to listen for ctrl-c")?;
                let cancelled = converter.driver().cancel_all();
                warn!(cancelled, "interrupted, running conversions marked failed");
            }
        }
    }
    while let Ok(event) = rx.try_recv() {
        if let Some(line) = renderer.render(&event) {
            println!("{line}");
        }
    }

    println!();
    let snapshot = converter.registry().snapshot();
    for file in &snapshot {
        println!("{}", summary_line(file));
    }
    let failed = snapshot
        .iter()
        .filter(|f| f.status == FileStatus::Error)
        .count();

    let sink = FsDownloadSink::new(out);
    match converter.export_all(&sink).await.context("Export failed")? {
        ExportOutcome::Nothing => println!("Nothing to export."),
        ExportOutcome::Single { file_name } => {
            println!("Saved {}", sink.path_for(&file_name).display());
        }
        ExportOutcome::Archive { file_name, entries } => {
            println!(
                "Saved {} ({} files)",
                sink.path_for(&file_name).display(),
                entries.len()
            );
        }
    }

    info!(
        total = snapshot.len(),
        completed = converter.registry().completed_count(),
        failed,
        "run finished"
    );
    if failed > 0 {
        bail!("{failed} file(s) failed to convert");
    }
    Ok(())
}
