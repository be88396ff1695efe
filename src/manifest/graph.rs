//! Reachability over the client manifest import graph.

use std::collections::{BTreeSet, HashMap};

use crate::models::{AssetManifest, AssetRecord};

/// Index over an [`AssetManifest`] answering "which artifacts touch this source file".
///
/// An artifact touches a file when its source id equals the file or its imports list it.
/// Artifacts are addressed by their position in manifest order so traversal output is stable.
#[derive(Debug)]
pub struct AssetGraph<'a> {
  records: Vec<&'a AssetRecord>,
  touching: HashMap<&'a str, Vec<usize>>,
}

impl<'a> AssetGraph<'a> {
  /// Build the index for the provided manifest.
  pub fn new(manifest: &'a AssetManifest) -> Self {
    let records: Vec<&AssetRecord> = manifest.values().collect();
    let mut touching: HashMap<&str, Vec<usize>> = HashMap::new();

    for (index, record) in records.iter().copied().enumerate() {
      let mut keys: Vec<&str> = Vec::with_capacity(record.import_ids.len() + 1);
      keys.push(&record.source_id);
      keys.extend(record.import_ids.iter().map(String::as_str));
      keys.sort_unstable();
      keys.dedup();

      for key in keys {
        touching.entry(key).or_default().push(index);
      }
    }

    Self { records, touching }
  }

  /// Output files reachable from `entry_file`, in discovery order and without duplicates.
  ///
  /// Files already visited are skipped, which terminates traversal on cyclic imports. An entry
  /// file unknown to the manifest yields an empty list.
  pub fn collect(&self, entry_file: &str) -> Vec<String> {
    let mut collector = AssetCollector::default();
    self.visit(entry_file, &mut collector);
    collector.finish()
  }

  fn visit<'g>(&'g self, file: &'g str, collector: &mut AssetCollector<'g>) {
    if !collector.visited.insert(file) {
      return;
    }

    let Some(indices) = self.touching.get(file) else {
      return;
    };

    for &index in indices {
      let record = self.records[index];
      collector.push(&record.output_file);
      for imported in &record.import_ids {
        self.visit(imported, collector);
      }
    }
  }
}

#[derive(Default)]
struct AssetCollector<'g> {
  visited: BTreeSet<&'g str>,
  seen: BTreeSet<&'g str>,
  result: Vec<String>,
}

impl<'g> AssetCollector<'g> {
  fn push(&mut self, output_file: &'g str) {
    if self.seen.insert(output_file) {
      self.result.push(output_file.to_string());
    }
  }

  fn finish(self) -> Vec<String> {
    self.result
  }
}

/// Convenience wrapper resolving a single entry file without keeping the index around.
pub fn collect_route_assets(entry_file: &str, manifest: &AssetManifest) -> Vec<String> {
  AssetGraph::new(manifest).collect(entry_file)
}
