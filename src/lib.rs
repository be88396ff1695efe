#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

pub mod builder;
pub mod config;
pub mod csp;
pub mod error;
pub mod files;
pub mod manifest;
pub mod mapper;
pub mod models;
pub mod urls;

pub use builder::{AuditArtifacts, CspAuditor};
pub use config::AuditConfig;
pub use csp::generate_csp_header;
pub use error::{AuditError, AuditResult};
pub use mapper::{AssetSource, DirectoryAssetSource, RouteAssetMapper};
pub use models::{AllowList, AssetManifest, AssetRecord, RouteAssets, RouteEntry, RouteManifest};
