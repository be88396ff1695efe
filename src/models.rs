//! Data structures read from the build manifests and produced by the audit.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::urls::normalise_url;

/// Server route manifest emitted by the application build.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RouteManifest {
  /// Routes keyed by their unique route identifier.
  #[serde(default)]
  pub routes: BTreeMap<String, RouteEntry>,
}

/// Single route descriptor inside the [`RouteManifest`].
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteEntry {
  /// Source file the route is rendered from.
  #[serde(rename = "file", alias = "entryFile")]
  pub entry_file: String,
  /// Route identifier.
  pub id: String,
  /// Optional URL path pattern.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub path: Option<String>,
}

/// Client build manifest keyed by artifact key.
pub type AssetManifest = BTreeMap<String, AssetRecord>;

/// Build artifact emitted for one source file.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AssetRecord {
  /// Source identifier the artifact was produced from.
  #[serde(rename = "src")]
  pub source_id: String,
  /// Output file name of the artifact.
  #[serde(rename = "file")]
  pub output_file: String,
  /// Source identifiers imported by the artifact. Missing and empty are equivalent.
  #[serde(rename = "imports", default)]
  pub import_ids: Vec<String>,
}

/// Audit outcome for one route.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteAssets {
  /// Output files reachable from the route, in discovery order.
  pub assets: Vec<String>,
  /// External URLs admitted by the allow-lists or translation exemptions.
  pub external_urls: BTreeSet<String>,
  /// External URLs rejected by the allow-lists.
  pub removed_urls: BTreeSet<String>,
}

/// Caller supplied admission rules for external URLs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowList {
  /// Domains admitted exactly or through any dot-subdomain.
  pub domains: BTreeSet<String>,
  /// URLs admitted by exact match.
  pub urls: BTreeSet<String>,
}

impl AllowList {
  /// Build an allow-list, trimming entries and discarding empty values.
  ///
  /// URLs are normalised the same way extracted URLs are, so `https://host` matches `https://host/`.
  pub fn new(
    domains: impl IntoIterator<Item = String>,
    urls: impl IntoIterator<Item = String>,
  ) -> Self {
    Self {
      domains: normalise_domains(domains),
      urls: urls
        .into_iter()
        .filter_map(|value| {
          let value = value.trim();
          if value.is_empty() {
            return None;
          }
          Some(normalise_url(value).unwrap_or_else(|| value.to_string()))
        })
        .collect(),
    }
  }
}

/// Convert raw domain entries into a sorted, de-duplicated set of lowercase hosts.
fn normalise_domains(values: impl IntoIterator<Item = String>) -> BTreeSet<String> {
  values
    .into_iter()
    .map(|value| value.trim().trim_start_matches('.').to_ascii_lowercase())
    .filter(|value| !value.is_empty())
    .collect()
}
