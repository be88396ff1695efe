//! Async filesystem helpers consumed by the mapper and the audit builder.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::fs;
use tokio::time::{Instant, sleep};
use tracing::warn;

use crate::error::{AuditError, AuditResult};

/// Read and deserialise a JSON file.
pub async fn read_json<T: DeserializeOwned>(path: &Path) -> AuditResult<T> {
  let content = fs::read_to_string(path)
    .await
    .map_err(|_| AuditError::FileNotFound {
      path: path.to_path_buf(),
    })?;
  serde_json::from_str(&content).map_err(|source| AuditError::Parse {
    path: path.to_path_buf(),
    source,
  })
}

/// Serialise `value` as pretty-printed JSON (two space indentation) into `path`.
pub async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> AuditResult<()> {
  let json = serde_json::to_string_pretty(value).map_err(|source| AuditError::Serialize {
    path: path.to_path_buf(),
    source,
  })?;
  fs::write(path, json)
    .await
    .map_err(|source| AuditError::io(path, source))
}

/// Create `dir` and its parents when it does not exist yet.
pub async fn ensure_dir(dir: &Path) -> AuditResult<()> {
  if directory_exists(dir).await {
    return Ok(());
  }
  fs::create_dir_all(dir)
    .await
    .map_err(|source| AuditError::io(dir, source))
}

/// Returns `true` when `path` exists and is a directory.
pub async fn directory_exists(path: &Path) -> bool {
  fs::metadata(path)
    .await
    .is_ok_and(|metadata| metadata.is_dir())
}

/// Returns `true` when `path` exists and is a regular file.
pub async fn file_exists(path: &Path) -> bool {
  fs::metadata(path)
    .await
    .is_ok_and(|metadata| metadata.is_file())
}

/// Recursively list files below `dir` whose name ends with `extension` (for example `.json`).
///
/// Only a failure to read `dir` itself is an error. Subdirectories and entries that cannot be
/// read are logged and skipped. The listing is sorted so callers see a stable order.
pub async fn collect_files(dir: &Path, extension: &str) -> AuditResult<Vec<PathBuf>> {
  let mut files = Vec::new();
  let mut pending = Vec::new();

  let root = fs::read_dir(dir)
    .await
    .map_err(|source| AuditError::io(dir, source))?;
  scan_directory(dir, root, extension, &mut files, &mut pending).await;

  while let Some(current) = pending.pop() {
    match fs::read_dir(&current).await {
      Ok(entries) => scan_directory(&current, entries, extension, &mut files, &mut pending).await,
      Err(err) => warn!(dir = %current.display(), error = %err, "skipping unreadable directory"),
    }
  }

  files.sort();
  Ok(files)
}

async fn scan_directory(
  dir: &Path,
  mut entries: fs::ReadDir,
  extension: &str,
  files: &mut Vec<PathBuf>,
  pending: &mut Vec<PathBuf>,
) {
  loop {
    let entry = match entries.next_entry().await {
      Ok(Some(entry)) => entry,
      Ok(None) => return,
      Err(err) => {
        warn!(dir = %dir.display(), error = %err, "stopped listing directory");
        return;
      }
    };

    let path = entry.path();
    match entry.file_type().await {
      Ok(file_type) if file_type.is_dir() => pending.push(path),
      Ok(_) => {
        if path.to_string_lossy().ends_with(extension) {
          files.push(path);
        }
      }
      Err(err) => warn!(file = %path.display(), error = %err, "skipping unreadable entry"),
    }
  }
}

/// Poll for `path` every `interval` until it exists or `timeout` elapses.
pub async fn wait_for_file(path: &Path, timeout: Duration, interval: Duration) -> AuditResult<()> {
  let started = Instant::now();
  loop {
    if fs::try_exists(path).await.unwrap_or(false) {
      return Ok(());
    }
    if started.elapsed() >= timeout {
      return Err(AuditError::WaitTimeout {
        path: path.to_path_buf(),
        timeout,
      });
    }
    sleep(interval).await;
  }
}
