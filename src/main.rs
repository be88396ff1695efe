//! `csp-audit`: audit route assets and write Content-Security-Policy headers.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use csp_asset_auditor::{AuditConfig, CspAuditor};

/// Audit the external URLs reachable from each route and synthesize CSP headers.
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
struct Cli {
  /// Configuration file (JSON or YAML). Defaults to csp-audit.config.{json,yaml} if present.
  #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
  config: Option<PathBuf>,

  /// Server route manifest path
  #[arg(long, value_hint = clap::ValueHint::FilePath)]
  route_manifest: Option<PathBuf>,

  /// Client asset manifest path
  #[arg(long, value_hint = clap::ValueHint::FilePath)]
  client_manifest: Option<PathBuf>,

  /// Directory of translation JSON files whose URLs are always allowed
  #[arg(long, value_hint = clap::ValueHint::DirPath)]
  translation_dir: Option<PathBuf>,

  /// Directory bundled client assets are read from
  #[arg(long, value_hint = clap::ValueHint::DirPath)]
  asset_dir: Option<PathBuf>,

  /// Directory route-assets.json and csp-header.json are written to
  #[arg(short, long, value_hint = clap::ValueHint::DirPath)]
  output_dir: Option<PathBuf>,

  /// Allowed domain (repeatable); subdomains are allowed too
  #[arg(long = "allow-domain")]
  allowed_domains: Vec<String>,

  /// Allowed exact URL (repeatable)
  #[arg(long = "allow-url")]
  allowed_urls: Vec<String>,

  /// Poll for the manifests before reading them
  #[arg(long)]
  wait_for_manifests: bool,

  /// Log removed URLs for every route
  #[arg(long)]
  print_removed_urls: bool,

  /// Enable debug logging
  #[arg(short, long)]
  verbose: bool,
}

impl Cli {
  fn load_config(&self) -> Result<AuditConfig> {
    let config = match &self.config {
      Some(path) => AuditConfig::from_path(path)
        .with_context(|| format!("failed to load configuration from {}", path.display()))?,
      None => {
        let cwd = std::env::current_dir().context("failed to resolve working directory")?;
        AuditConfig::discover(&cwd)?
      }
    };
    Ok(self.apply_overrides(config))
  }

  fn apply_overrides(&self, mut config: AuditConfig) -> AuditConfig {
    if let Some(path) = &self.route_manifest {
      config.remix_manifest_path = path.clone();
    }
    if let Some(path) = &self.client_manifest {
      config.client_manifest_path = path.clone();
    }
    if let Some(dir) = &self.translation_dir {
      config.translation_dir = dir.clone();
    }
    if let Some(dir) = &self.asset_dir {
      config.client_js_dir = dir.clone();
    }
    if let Some(dir) = &self.output_dir {
      config.output_dir = dir.clone();
    }
    config.allowed_domains.extend(self.allowed_domains.iter().cloned());
    config.allowed_urls.extend(self.allowed_urls.iter().cloned());
    config.wait_for_manifests |= self.wait_for_manifests;
    config.print_removed_urls |= self.print_removed_urls;
    config
  }
}

fn init_tracing(verbose: bool) {
  let default_level = if verbose { "debug" } else { "info" };
  let filter =
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_target(false)
    .init();
}

#[tokio::main]
async fn main() -> Result<()> {
  let cli = Cli::parse();
  init_tracing(cli.verbose);

  let config = cli.load_config()?;
  CspAuditor::new(config)
    .build()
    .await
    .context("csp audit failed")?;
  Ok(())
}
