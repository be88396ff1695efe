//! Build manifest handling: loading from disk and resolving reachable artifacts.

mod graph;
mod loading;

pub use graph::{AssetGraph, collect_route_assets};
pub use loading::{BuildManifests, ManifestWait, load_manifests};
