//! Audit orchestrator: loads the build manifests, maps routes and persists the results.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::info;

use crate::config::AuditConfig;
use crate::csp::generate_csp_header;
use crate::error::AuditResult;
use crate::files::{ensure_dir, write_json};
use crate::manifest::load_manifests;
use crate::mapper::{DirectoryAssetSource, RouteAssetMapper};
use crate::models::RouteAssets;

/// Everything produced by one audit run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditArtifacts {
  /// Audit result per route key.
  pub route_assets: BTreeMap<String, RouteAssets>,
  /// Header covering the assets and kept URLs of every route.
  pub csp_header: String,
  /// Header per route key.
  pub route_headers: BTreeMap<String, String>,
}

#[derive(Serialize)]
struct CspHeaderFile<'a> {
  #[serde(rename = "Content-Security-Policy")]
  header: &'a str,
  routes: &'a BTreeMap<String, String>,
}

/// High-level helper running the audit described by an [`AuditConfig`].
pub struct CspAuditor {
  config: AuditConfig,
}

impl CspAuditor {
  /// Create an auditor for the provided configuration.
  pub fn new(config: AuditConfig) -> Self {
    Self { config }
  }

  /// Load the manifests, audit every route and synthesize the headers.
  pub async fn run(&self) -> AuditResult<AuditArtifacts> {
    let config = &self.config;
    let manifests = load_manifests(
      &config.remix_manifest_path,
      &config.client_manifest_path,
      config.manifest_wait(),
    )
    .await?;

    let allow = config.allow_list();
    let source = DirectoryAssetSource::new(&config.client_js_dir);
    let route_assets = RouteAssetMapper::new(&manifests.routes, &manifests.assets, source, &allow)
      .with_translation_dir(&config.translation_dir)
      .map_routes_to_assets()
      .await;

    if config.print_removed_urls {
      for (route, assets) in &route_assets {
        let removed: Vec<&str> = assets.removed_urls.iter().map(String::as_str).collect();
        info!(route = %route, removed = %removed.join(", "), "removed urls");
      }
    }

    let route_headers = route_assets
      .iter()
      .map(|(route, assets)| {
        (
          route.clone(),
          generate_csp_header(&assets.assets, &assets.external_urls),
        )
      })
      .collect();
    let csp_header = render_combined_header(&route_assets);

    info!(
      routes = route_assets.len(),
      kept = route_assets.values().map(|r| r.external_urls.len()).sum::<usize>(),
      removed = route_assets.values().map(|r| r.removed_urls.len()).sum::<usize>(),
      "audited routes"
    );

    Ok(AuditArtifacts {
      route_assets,
      csp_header,
      route_headers,
    })
  }

  /// Write `route-assets.json` and `csp-header.json` into the configured output directory.
  pub async fn write(&self, artifacts: &AuditArtifacts) -> AuditResult<()> {
    ensure_dir(&self.config.output_dir).await?;

    let route_assets_path = self.config.route_assets_path();
    write_json(&route_assets_path, &artifacts.route_assets).await?;

    let header_path = self.config.csp_header_path();
    write_json(&header_path, &CspHeaderFile {
      header: &artifacts.csp_header,
      routes: &artifacts.route_headers,
    })
    .await?;

    info!(
      route_assets = %route_assets_path.display(),
      csp_header = %header_path.display(),
      "wrote audit output"
    );
    Ok(())
  }

  /// Run the audit and persist its output.
  pub async fn build(&self) -> AuditResult<AuditArtifacts> {
    let artifacts = self.run().await?;
    self.write(&artifacts).await?;
    Ok(artifacts)
  }
}

/// Header over every route: assets in route order without repeats, kept URLs sorted.
fn render_combined_header(route_assets: &BTreeMap<String, RouteAssets>) -> String {
  let mut seen = BTreeSet::new();
  let mut assets: Vec<&String> = Vec::new();
  let mut external_urls: BTreeSet<&String> = BTreeSet::new();

  for route in route_assets.values() {
    for asset in &route.assets {
      if seen.insert(asset) {
        assets.push(asset);
      }
    }
    external_urls.extend(route.external_urls.iter());
  }

  generate_csp_header(assets, external_urls)
}
