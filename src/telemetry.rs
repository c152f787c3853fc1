use std::cmp::Reverse;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result};
use chrono::Utc;
use once_cell::sync::OnceCell;
use tracing::{debug, subscriber};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt};

use crate::config::TraceSettings;

const TRACE_SUFFIX: &str = ".trace.jsonl";

static TRACE_GUARD: OnceCell<WorkerGuard> = OnceCell::new();
static TRACING_INITIALIZED: OnceCell<()> = OnceCell::new();

/// Install the stderr subscriber, plus a JSON trace file when enabled.
pub fn init_tracing(service: &str, verbose: bool, traces: &TraceSettings) -> Result<()> {
    if TRACING_INITIALIZED.get().is_some() {
        return Ok(());
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose { "mcuuid=debug" } else { "mcuuid=info" })
    });
    let stderr_layer = fmt::layer().with_target(false).with_writer(std::io::stderr);

    let (file_layer, trace_path) = match build_trace_file_layer(service, traces)? {
        Some((writer, guard, path)) => {
            let _ = TRACE_GUARD.set(guard);
            let layer = fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(true)
                .with_file(true)
                .with_line_number(true)
                .with_writer(writer)
                .with_filter(LevelFilter::TRACE);
            (Some(layer), Some(path))
        }
        None => (None, None),
    };

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer);
    subscriber::set_global_default(subscriber)?;
    let _ = TRACING_INITIALIZED.set(());

    if let Some(path) = trace_path {
        debug!(path = %path.display(), "recording traces");
    }
    Ok(())
}

fn build_trace_file_layer(
    service: &str,
    settings: &TraceSettings,
) -> Result<Option<(NonBlocking, WorkerGuard, PathBuf)>> {
    if !settings.enabled {
        return Ok(None);
    }

    let directory = settings.resolve_directory()?;
    fs::create_dir_all(&directory)
        .with_context(|| format!("Failed to create trace directory {}", directory.display()))?;

    let (file, path) = create_trace_file(service, &directory)?;
    prune_old_traces(&directory, settings.max_files, &path)?;

    let (writer, guard) = tracing_appender::non_blocking(file);

    Ok(Some((writer, guard, path)))
}

fn create_trace_file(service: &str, directory: &Path) -> Result<(fs::File, PathBuf)> {
    let timestamp = Utc::now().format("%Y%m%dT%H%M%SZ");
    let mut candidate = directory.join(format!("{service}-{timestamp}{TRACE_SUFFIX}"));
    let mut counter = 0;
    while candidate.exists() {
        counter += 1;
        candidate = directory.join(format!("{service}-{timestamp}-{counter}{TRACE_SUFFIX}"));
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&candidate)
        .with_context(|| format!("Failed to open trace file {}", candidate.display()))?;
    Ok((file, candidate))
}

/// Keep the newest `max_files` traces, counting `keep`. Zero disables pruning.
fn prune_old_traces(directory: &Path, max_files: usize, keep: &Path) -> Result<()> {
    if max_files == 0 || !directory.exists() {
        return Ok(());
    }

    let mut entries: Vec<(SystemTime, PathBuf)> = Vec::new();
    for entry in fs::read_dir(directory)
        .with_context(|| format!("Failed to read trace directory {}", directory.display()))?
    {
        let entry = entry?;
        let path = entry.path();
        if path == keep || !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|value| value.to_str()) else {
            continue;
        };
        if !name.ends_with(TRACE_SUFFIX) {
            continue;
        }
        let Ok(modified) = entry.metadata().and_then(|metadata| metadata.modified()) else {
            continue;
        };
        entries.push((modified, path));
    }

    entries.sort_by_key(|(modified, _)| Reverse(*modified));

    let retain = max_files.saturating_sub(1);
    for (_, path) in entries.into_iter().skip(retain) {
        let _ = fs::remove_file(&path);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::tempdir;

    fn write_trace(dir: &Path, name: &str, age_secs: u64) -> PathBuf {
        let path = dir.join(name);
        let file = fs::File::create(&path).unwrap();
        file.set_modified(SystemTime::now() - Duration::from_secs(age_secs))
            .unwrap();
        path
    }

    #[test]
    fn trace_file_names_carry_service_and_suffix() {
        let dir = tempdir().unwrap();
        let (_file, first) = create_trace_file("mcuuid", dir.path()).unwrap();
        let (_file, second) = create_trace_file("mcuuid", dir.path()).unwrap();

        let name = first.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("mcuuid-"));
        assert!(name.ends_with(TRACE_SUFFIX));
        assert_ne!(first, second);
    }

    #[test]
    fn prune_keeps_newest_traces() {
        let dir = tempdir().unwrap();
        let oldest = write_trace(dir.path(), "mcuuid-a.trace.jsonl", 300);
        let older = write_trace(dir.path(), "mcuuid-b.trace.jsonl", 200);
        let newer = write_trace(dir.path(), "mcuuid-c.trace.jsonl", 100);
        let unrelated = write_trace(dir.path(), "notes.txt", 1000);
        let current = write_trace(dir.path(), "mcuuid-d.trace.jsonl", 0);

        prune_old_traces(dir.path(), 2, &current).unwrap();

        assert!(current.exists());
        assert!(newer.exists());
        assert!(!older.exists());
        assert!(!oldest.exists());
        assert!(unrelated.exists());
    }

    #[test]
    fn zero_max_files_disables_pruning() {
        let dir = tempdir().unwrap();
        let old = write_trace(dir.path(), "mcuuid-a.trace.jsonl", 300);
        let current = write_trace(dir.path(), "mcuuid-b.trace.jsonl", 0);

        prune_old_traces(dir.path(), 0, &current).unwrap();
        assert!(old.exists());
    }

    #[test]
    fn disabled_traces_build_no_layer() {
        let settings = TraceSettings::default();
        assert!(build_trace_file_layer("mcuuid", &settings).unwrap().is_none());
    }
}
