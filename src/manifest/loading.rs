//! Loading the route and client manifests produced by the application build.

use std::path::Path;
use std::time::Duration;

use tracing::debug;

use crate::error::AuditResult;
use crate::files::{read_json, wait_for_file};
use crate::models::{AssetManifest, RouteManifest};

/// Both manifests required for an audit run.
#[derive(Debug, Clone, Default)]
pub struct BuildManifests {
  /// Server route manifest.
  pub routes: RouteManifest,
  /// Client asset manifest.
  pub assets: AssetManifest,
}

/// Polling parameters used when manifests are produced concurrently with the audit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManifestWait {
  /// Maximum time to wait for each manifest.
  pub timeout: Duration,
  /// Delay between existence checks.
  pub interval: Duration,
}

impl Default for ManifestWait {
  fn default() -> Self {
    Self {
      timeout: Duration::from_millis(20_000),
      interval: Duration::from_millis(500),
    }
  }
}

/// Read both manifests, optionally waiting for them to appear first.
///
/// Missing or malformed manifests are fatal for the run.
pub async fn load_manifests(
  route_manifest_path: &Path,
  client_manifest_path: &Path,
  wait: Option<ManifestWait>,
) -> AuditResult<BuildManifests> {
  if let Some(wait) = wait {
    debug!(
      routes = %route_manifest_path.display(),
      client = %client_manifest_path.display(),
      timeout_ms = wait.timeout.as_millis() as u64,
      "waiting for manifests"
    );
    let (routes_ready, client_ready) = tokio::join!(
      wait_for_file(route_manifest_path, wait.timeout, wait.interval),
      wait_for_file(client_manifest_path, wait.timeout, wait.interval),
    );
    routes_ready?;
    client_ready?;
  }

  let (routes, assets) = tokio::join!(
    read_json::<RouteManifest>(route_manifest_path),
    read_json::<AssetManifest>(client_manifest_path),
  );

  Ok(BuildManifests {
    routes: routes?,
    assets: assets?,
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::AuditError;
  use tempfile::tempdir;

  #[tokio::test]
  async fn loads_both_manifests() {
    let dir = tempdir().unwrap();
    let routes = dir.path().join("manifest.json");
    let client = dir.path().join("client.json");
    std::fs::write(&routes, r#"{"routes": {"r1": {"file": "f1.js", "id": "r1"}}}"#).unwrap();
    std::fs::write(&client, r#"{"f1.js": {"src": "f1.js", "file": "out1.js"}}"#).unwrap();

    let manifests = load_manifests(&routes, &client, None).await.unwrap();

    assert_eq!(manifests.routes.routes["r1"].entry_file, "f1.js");
    assert_eq!(manifests.assets["f1.js"].output_file, "out1.js");
  }

  #[tokio::test]
  async fn missing_manifest_is_fatal() {
    let dir = tempdir().unwrap();
    let client = dir.path().join("client.json");
    std::fs::write(&client, "{}").unwrap();

    let err = load_manifests(&dir.path().join("absent.json"), &client, None)
      .await
      .unwrap_err();

    assert!(matches!(err, AuditError::FileNotFound { .. }));
  }

  #[tokio::test]
  async fn malformed_manifest_is_reported() {
    let dir = tempdir().unwrap();
    let routes = dir.path().join("manifest.json");
    let client = dir.path().join("client.json");
    std::fs::write(&routes, r#"{"routes": {"r1": {"id": "r1"}}}"#).unwrap();
    std::fs::write(&client, "{}").unwrap();

    let err = load_manifests(&routes, &client, None).await.unwrap_err();
    assert!(matches!(err, AuditError::Parse { .. }));
  }

  #[tokio::test]
  async fn waiting_times_out_for_absent_manifests() {
    let dir = tempdir().unwrap();
    let wait = ManifestWait {
      timeout: Duration::from_millis(60),
      interval: Duration::from_millis(10),
    };

    let err = load_manifests(
      &dir.path().join("routes.json"),
      &dir.path().join("client.json"),
      Some(wait),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, AuditError::WaitTimeout { .. }));
  }
}
