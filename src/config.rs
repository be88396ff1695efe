//! Audit configuration loader describing manifest locations, allow-lists and output paths.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{AuditError, AuditResult};
use crate::manifest::ManifestWait;
use crate::models::AllowList;

const DEFAULT_CONFIG_FILES: &[&str] = &["csp-audit.config.json", "csp-audit.config.yaml"];

/// Name of the route asset report written to the output directory.
pub const ROUTE_ASSETS_FILE: &str = "route-assets.json";
/// Name of the synthesized header file written to the output directory.
pub const CSP_HEADER_FILE: &str = "csp-header.json";

/// Discoverable configuration for an audit run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AuditConfig {
  /// Path to the server route manifest.
  pub remix_manifest_path: PathBuf,
  /// Path to the client asset manifest.
  pub client_manifest_path: PathBuf,
  /// Directory holding translation JSON files whose URLs are always admitted.
  pub translation_dir: PathBuf,
  /// Directory bundled client assets are read from.
  #[serde(alias = "clientJSDir")]
  pub client_js_dir: PathBuf,
  /// Directory the route report and header are written to.
  pub output_dir: PathBuf,
  /// Domains whose URLs (including subdomains) are admitted.
  pub allowed_domains: Vec<String>,
  /// URLs admitted by exact match.
  pub allowed_urls: Vec<String>,
  /// Poll for the manifests before reading them.
  pub wait_for_manifests: bool,
  /// Log the removed URLs of every route.
  pub print_removed_urls: bool,
  /// Maximum wait for each manifest in milliseconds.
  pub manifest_timeout_ms: u64,
  /// Delay between manifest existence checks in milliseconds.
  pub manifest_poll_interval_ms: u64,
}

impl Default for AuditConfig {
  fn default() -> Self {
    Self {
      remix_manifest_path: "build/manifest.json".into(),
      client_manifest_path: "build/client/.vite/manifest.json".into(),
      translation_dir: "public/locales".into(),
      client_js_dir: "build/client".into(),
      output_dir: "build/csp".into(),
      allowed_domains: Vec::new(),
      allowed_urls: Vec::new(),
      wait_for_manifests: false,
      print_removed_urls: false,
      manifest_timeout_ms: 20_000,
      manifest_poll_interval_ms: 500,
    }
  }
}

impl AuditConfig {
  /// Look for a configuration file in `dir`, falling back to defaults when none exists.
  ///
  /// A configuration file that exists but fails to parse is an error rather than a silent
  /// fallback.
  pub fn discover(dir: &Path) -> AuditResult<Self> {
    for name in DEFAULT_CONFIG_FILES {
      let candidate = dir.join(name);
      if candidate.is_file() {
        return Self::from_path(&candidate);
      }
    }
    Ok(Self::default())
  }

  /// Read configuration from a JSON or YAML file, chosen by extension.
  pub fn from_path(path: &Path) -> AuditResult<Self> {
    let content = fs::read_to_string(path).map_err(|source| AuditError::io(path, source))?;
    let is_yaml = path
      .extension()
      .and_then(|ext| ext.to_str())
      .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));

    if is_yaml {
      serde_yaml::from_str(&content).map_err(|err| AuditError::ConfigParse {
        path: path.to_path_buf(),
        message: err.to_string(),
      })
    } else {
      serde_json::from_str(&content).map_err(|err| AuditError::ConfigParse {
        path: path.to_path_buf(),
        message: err.to_string(),
      })
    }
  }

  /// Allow-list built from the configured domains and URLs.
  pub fn allow_list(&self) -> AllowList {
    AllowList::new(
      self.allowed_domains.iter().cloned(),
      self.allowed_urls.iter().cloned(),
    )
  }

  /// Polling parameters when manifest waiting is enabled.
  pub fn manifest_wait(&self) -> Option<ManifestWait> {
    self.wait_for_manifests.then(|| ManifestWait {
      timeout: Duration::from_millis(self.manifest_timeout_ms),
      interval: Duration::from_millis(self.manifest_poll_interval_ms),
    })
  }

  /// Path of the route asset report.
  pub fn route_assets_path(&self) -> PathBuf {
    self.output_dir.join(ROUTE_ASSETS_FILE)
  }

  /// Path of the synthesized header file.
  pub fn csp_header_path(&self) -> PathBuf {
    self.output_dir.join(CSP_HEADER_FILE)
  }
}
