//! Route to asset mapping: resolves each route's artifacts and audits the URLs they reference.

use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures::future::join_all;
use tracing::{debug, warn};

use crate::files::{collect_files, directory_exists, file_exists};
use crate::manifest::AssetGraph;
use crate::models::{AllowList, AssetManifest, RouteAssets, RouteManifest};
use crate::urls::{extract_external_urls, extract_json_urls, filter_urls};

/// Source of asset text scanned for external URLs.
#[async_trait]
pub trait AssetSource: Send + Sync {
  /// Load the content of `asset`, returning `Ok(None)` when no backing file exists.
  ///
  /// Content that is not text (images, fonts) may be reported as an empty string.
  async fn load(&self, asset: &str) -> io::Result<Option<String>>;
}

/// [`AssetSource`] reading assets relative to a build output directory.
#[derive(Debug, Clone)]
pub struct DirectoryAssetSource {
  base_dir: PathBuf,
}

impl DirectoryAssetSource {
  /// Read assets below `base_dir`.
  pub fn new(base_dir: impl Into<PathBuf>) -> Self {
    Self {
      base_dir: base_dir.into(),
    }
  }

  fn asset_path(&self, asset: &str) -> PathBuf {
    self.base_dir.join(asset.trim_start_matches('/'))
  }
}

#[async_trait]
impl AssetSource for DirectoryAssetSource {
  async fn load(&self, asset: &str) -> io::Result<Option<String>> {
    let path = self.asset_path(asset);
    if !file_exists(&path).await {
      return Ok(None);
    }
    let bytes = tokio::fs::read(&path).await?;
    match String::from_utf8(bytes) {
      Ok(content) => Ok(Some(content)),
      Err(_) => {
        debug!(asset, "asset is not utf-8 text; nothing to scan");
        Ok(Some(String::new()))
      }
    }
  }
}

/// Maps every route in the route manifest to its reachable assets and audited URLs.
pub struct RouteAssetMapper<'a, S> {
  routes: &'a RouteManifest,
  graph: AssetGraph<'a>,
  translation_dir: Option<&'a Path>,
  source: S,
  allow: &'a AllowList,
}

impl<'a, S: AssetSource> RouteAssetMapper<'a, S> {
  /// Create a mapper over the provided manifests.
  pub fn new(
    routes: &'a RouteManifest,
    assets: &'a AssetManifest,
    source: S,
    allow: &'a AllowList,
  ) -> Self {
    Self {
      routes,
      graph: AssetGraph::new(assets),
      translation_dir: None,
      source,
      allow,
    }
  }

  /// Exempt every URL mentioned in the `.json` files below `dir`.
  pub fn with_translation_dir(mut self, dir: &'a Path) -> Self {
    self.translation_dir = Some(dir);
    self
  }

  /// Produce the audit result for every route, keyed by route key.
  ///
  /// Translation files are scanned to completion before any route is processed. Routes and the
  /// assets within a route are then processed concurrently.
  pub async fn map_routes_to_assets(&self) -> BTreeMap<String, RouteAssets> {
    let exempt = self.collect_exempt_urls().await;
    debug!(count = exempt.len(), "collected exempt urls");

    let routes = self.routes.routes.iter().map(|(key, route)| {
      let exempt = &exempt;
      async move {
        let result = self.map_route(&route.entry_file, exempt).await;
        (key.clone(), result)
      }
    });

    join_all(routes).await.into_iter().collect()
  }

  /// Union of the URLs found in every translation file.
  pub async fn collect_exempt_urls(&self) -> BTreeSet<String> {
    let Some(dir) = self.translation_dir else {
      return BTreeSet::new();
    };
    if !directory_exists(dir).await {
      debug!(dir = %dir.display(), "translation directory missing; no exemptions");
      return BTreeSet::new();
    }

    let files = match collect_files(dir, ".json").await {
      Ok(files) => files,
      Err(err) => {
        warn!(dir = %dir.display(), error = %err, "failed to list translation files");
        return BTreeSet::new();
      }
    };

    let scans = files.iter().map(|path| async move {
      match tokio::fs::read_to_string(path).await {
        Ok(content) => extract_json_urls(&content),
        Err(err) => {
          warn!(file = %path.display(), error = %err, "failed to read translation file");
          BTreeSet::new()
        }
      }
    });

    join_all(scans).await.into_iter().flatten().collect()
  }

  async fn map_route(&self, entry_file: &str, exempt: &BTreeSet<String>) -> RouteAssets {
    let assets = self.graph.collect(entry_file);
    let scans = assets.iter().map(|asset| self.scan_asset(asset));
    let batches = join_all(scans).await;

    let mut external_urls = BTreeSet::new();
    let mut removed_urls = BTreeSet::new();
    for urls in batches.into_iter().flatten() {
      let filtered = filter_urls(&urls, exempt, self.allow);
      external_urls.extend(filtered.kept);
      removed_urls.extend(filtered.removed);
    }

    RouteAssets {
      assets,
      external_urls,
      removed_urls,
    }
  }

  /// URLs referenced by one asset, or `None` when its content could not be read.
  async fn scan_asset(&self, asset: &str) -> Option<BTreeSet<String>> {
    match self.source.load(asset).await {
      Ok(Some(content)) => Some(extract_external_urls(&content)),
      Ok(None) => {
        debug!(asset, "asset content unavailable; scanning identifier");
        Some(extract_external_urls(asset))
      }
      Err(err) => {
        warn!(asset, error = %err, "failed to read asset content");
        None
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::{AssetRecord, RouteEntry};
  use std::collections::HashMap;
  use tempfile::tempdir;

  #[derive(Default)]
  struct MemorySource {
    files: HashMap<String, io::Result<String>>,
  }

  impl MemorySource {
    fn with(mut self, asset: &str, content: &str) -> Self {
      self.files.insert(asset.to_string(), Ok(content.to_string()));
      self
    }

    fn failing(mut self, asset: &str) -> Self {
      self.files.insert(
        asset.to_string(),
        Err(io::Error::new(io::ErrorKind::InvalidData, "not utf-8")),
      );
      self
    }
  }

  #[async_trait]
  impl AssetSource for MemorySource {
    async fn load(&self, asset: &str) -> io::Result<Option<String>> {
      match self.files.get(asset) {
        Some(Ok(content)) => Ok(Some(content.clone())),
        Some(Err(err)) => Err(io::Error::new(err.kind(), err.to_string())),
        None => Ok(None),
      }
    }
  }

  fn routes(entries: &[(&str, &str)]) -> RouteManifest {
    RouteManifest {
      routes: entries
        .iter()
        .map(|(key, file)| {
          (key.to_string(), RouteEntry {
            entry_file: file.to_string(),
            id: key.to_string(),
            path: None,
          })
        })
        .collect(),
    }
  }

  fn record(source: &str, output: &str, imports: &[&str]) -> (String, AssetRecord) {
    (source.to_string(), AssetRecord {
      source_id: source.to_string(),
      output_file: output.to_string(),
      import_ids: imports.iter().map(|value| value.to_string()).collect(),
    })
  }

  fn two_file_manifest() -> AssetManifest {
    [
      record("f1.js", "out1.js", &["f2.js"]),
      record("f2.js", "out2.js", &[]),
    ]
    .into_iter()
    .collect()
  }

  #[tokio::test]
  async fn disallowed_urls_are_reported_as_removed() {
    let routes = routes(&[("r1", "f1.js")]);
    let assets = two_file_manifest();
    let allow = AllowList::default();
    let source = MemorySource::default().with("out1.js", r#"import "https://cdn.example.com/lib.js""#);

    let result = RouteAssetMapper::new(&routes, &assets, source, &allow)
      .map_routes_to_assets()
      .await;

    let route = &result["r1"];
    assert_eq!(route.assets, vec!["out1.js".to_string(), "out2.js".to_string()]);
    assert!(route.removed_urls.contains("https://cdn.example.com/lib.js"));
    assert!(route.external_urls.is_empty());
  }

  #[tokio::test]
  async fn allowed_urls_are_kept_per_route() {
    let routes = routes(&[("r1", "f1.js"), ("r2", "f2.js")]);
    let assets = two_file_manifest();
    let allow = AllowList::new(vec!["example.com".to_string()], Vec::new());
    let source = MemorySource::default()
      .with("out1.js", r#"fetch('https://api.example.com/data?x=1')"#)
      .with("out2.js", "see https://elsewhere.io/about");

    let result = RouteAssetMapper::new(&routes, &assets, source, &allow)
      .map_routes_to_assets()
      .await;

    assert_eq!(
      result["r1"].external_urls,
      BTreeSet::from(["https://api.example.com/data".to_string()])
    );
    assert_eq!(
      result["r1"].removed_urls,
      BTreeSet::from(["https://elsewhere.io/about".to_string()])
    );
    assert_eq!(result["r2"].assets, vec!["out1.js".to_string(), "out2.js".to_string()]);
  }

  #[tokio::test]
  async fn missing_content_falls_back_to_identifier() {
    let routes = routes(&[("r1", "entry.js")]);
    let assets: AssetManifest = [record("entry.js", "https://cdn.other.io/widget.js", &[])]
      .into_iter()
      .collect();
    let allow = AllowList::default();

    let result = RouteAssetMapper::new(&routes, &assets, MemorySource::default(), &allow)
      .map_routes_to_assets()
      .await;

    assert_eq!(
      result["r1"].removed_urls,
      BTreeSet::from(["https://cdn.other.io/widget.js".to_string()])
    );
  }

  #[tokio::test]
  async fn read_failures_only_drop_the_failing_asset() {
    let routes = routes(&[("r1", "f1.js")]);
    let assets = two_file_manifest();
    let allow = AllowList::default();
    let source = MemorySource::default()
      .failing("out1.js")
      .with("out2.js", "https://cdn.example.org/x.css");

    let result = RouteAssetMapper::new(&routes, &assets, source, &allow)
      .map_routes_to_assets()
      .await;

    let route = &result["r1"];
    assert_eq!(route.assets.len(), 2);
    assert_eq!(
      route.removed_urls,
      BTreeSet::from(["https://cdn.example.org/x.css".to_string()])
    );
  }

  #[tokio::test]
  async fn translation_urls_are_exempt() {
    let dir = tempdir().unwrap();
    let locales = dir.path().join("locales");
    std::fs::create_dir_all(locales.join("de")).unwrap();
    std::fs::write(
      locales.join("en.json"),
      r#"{"help": "Visit https://help.vendor.com/faq?lang=en"}"#,
    )
    .unwrap();
    std::fs::write(
      locales.join("de/common.json"),
      r#"{"logo": "https://img.vendor.com/logo.png"}"#,
    )
    .unwrap();

    let routes = routes(&[("r1", "f1.js")]);
    let assets = two_file_manifest();
    let allow = AllowList::default();
    let source = MemorySource::default().with(
      "out1.js",
      "https://help.vendor.com/faq https://img.vendor.com/logo.png https://tracker.io/t",
    );

    let mapper = RouteAssetMapper::new(&routes, &assets, source, &allow).with_translation_dir(&locales);
    let result = mapper.map_routes_to_assets().await;

    let route = &result["r1"];
    assert_eq!(
      route.external_urls,
      BTreeSet::from([
        "https://help.vendor.com/faq".to_string(),
        "https://img.vendor.com/logo.png".to_string(),
      ])
    );
    assert_eq!(route.removed_urls, BTreeSet::from(["https://tracker.io/t".to_string()]));
  }

  #[tokio::test]
  async fn escaped_translation_markup_still_exempts_urls() {
    let dir = tempdir().unwrap();
    let locales = dir.path().join("locales");
    std::fs::create_dir_all(&locales).unwrap();
    std::fs::write(
      locales.join("en.json"),
      r#"{"faq": "<a href=\"https://help.vendor.com/faq\">FAQ</a>", "logo": "https:\/\/img.vendor.com\/logo.png"}"#,
    )
    .unwrap();

    let routes = routes(&[("r1", "f1.js")]);
    let assets = two_file_manifest();
    let allow = AllowList::default();
    let source = MemorySource::default().with(
      "out1.js",
      "fetch('https://help.vendor.com/faq');img('https://img.vendor.com/logo.png')",
    );

    let mapper = RouteAssetMapper::new(&routes, &assets, source, &allow).with_translation_dir(&locales);
    let result = mapper.map_routes_to_assets().await;

    assert_eq!(
      result["r1"].external_urls,
      BTreeSet::from([
        "https://help.vendor.com/faq".to_string(),
        "https://img.vendor.com/logo.png".to_string(),
      ])
    );
    assert!(result["r1"].removed_urls.is_empty());
  }

  #[tokio::test]
  async fn missing_translation_dir_means_no_exemptions() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("nope");
    let routes = routes(&[]);
    let assets = AssetManifest::new();
    let allow = AllowList::default();

    let mapper = RouteAssetMapper::new(&routes, &assets, MemorySource::default(), &allow)
      .with_translation_dir(&missing);

    assert!(mapper.collect_exempt_urls().await.is_empty());
    assert!(mapper.map_routes_to_assets().await.is_empty());
  }

  #[tokio::test]
  async fn directory_source_reads_files_below_base() {
    let dir = tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("assets")).unwrap();
    std::fs::write(dir.path().join("assets/app.js"), "https://a.io/").unwrap();
    let source = DirectoryAssetSource::new(dir.path());

    assert_eq!(
      source.load("/assets/app.js").await.unwrap().as_deref(),
      Some("https://a.io/")
    );
    assert_eq!(source.load("assets/missing.js").await.unwrap(), None);
  }

  #[tokio::test]
  async fn directory_source_treats_binary_assets_as_empty() {
    let dir = tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("assets")).unwrap();
    std::fs::write(dir.path().join("assets/logo.png"), [0x89, b'P', b'N', b'G', 0xff, 0xfe, 0x00]).unwrap();
    std::fs::write(dir.path().join("assets/app.js"), "load('https://cdn.other.io/lib.js')").unwrap();
    let source = DirectoryAssetSource::new(dir.path());

    assert_eq!(source.load("assets/logo.png").await.unwrap().as_deref(), Some(""));

    let routes = routes(&[("r1", "app.tsx")]);
    let assets: AssetManifest = [
      record("app.tsx", "assets/app.js", &["logo.png"]),
      record("logo.png", "assets/logo.png", &[]),
    ]
    .into_iter()
    .collect();
    let allow = AllowList::default();

    let result = RouteAssetMapper::new(&routes, &assets, source, &allow)
      .map_routes_to_assets()
      .await;

    assert_eq!(result["r1"].assets, vec![
      "assets/app.js".to_string(),
      "assets/logo.png".to_string(),
    ]);
    assert_eq!(
      result["r1"].removed_urls,
      BTreeSet::from(["https://cdn.other.io/lib.js".to_string()])
    );
  }
}
