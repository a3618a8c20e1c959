// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Identifier-scoped bundle entries and the global path to identifier index.

use crate::record::AssetRecord;
use primus_core::asset::{AssetBundleData, AssetBundleEntry, AssetPath, PrimaryAssetId};
use std::collections::{HashMap, HashSet};

/// Bundle entries keyed by the identifier that declares them, plus the reverse
/// index from storage path to identifier used for recursive expansion.
#[derive(Debug, Default)]
pub struct BundleIndex {
    entries: HashMap<PrimaryAssetId, Vec<AssetBundleEntry>>,
    path_index: HashMap<AssetPath, PrimaryAssetId>,
}

impl BundleIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces every entry scoped to `scope` with the entries of `data`.
    ///
    /// Entries are rescoped to `scope`; unnamed entries are dropped.
    pub fn set_bundles(&mut self, scope: &PrimaryAssetId, mut data: AssetBundleData) {
        self.entries.remove(scope);

        data.normalize();
        data.set_scope(scope);
        if !data.is_empty() {
            self.entries.insert(scope.clone(), data.bundles);
        }
    }

    /// Removes every entry scoped to `scope`.
    pub fn remove_scope(&mut self, scope: &PrimaryAssetId) -> bool {
        self.entries.remove(scope).is_some()
    }

    /// Returns the entries scoped to `scope`.
    pub fn bundle_entries(&self, scope: &PrimaryAssetId) -> Option<&[AssetBundleEntry]> {
        self.entries.get(scope).map(Vec::as_slice)
    }

    /// Returns the entry named `name` scoped to `scope`.
    pub fn bundle_entry(&self, scope: &PrimaryAssetId, name: &str) -> Option<&AssetBundleEntry> {
        self.entries
            .get(scope)?
            .iter()
            .find(|entry| entry.name == name)
    }

    /// Returns the number of scopes with at least one entry.
    pub fn scope_count(&self) -> usize {
        self.entries.len()
    }

    /// Rebuilds the path to identifier index from `records`.
    pub fn rebuild_path_index<'a>(&mut self, records: impl IntoIterator<Item = &'a AssetRecord>) {
        self.path_index.clear();
        for record in records {
            if record.path.is_valid() {
                self.path_index.insert(record.path.clone(), record.id.clone());
            }
        }
        log::trace!(
            "BundleIndex: rebuilt path index with {} entries",
            self.path_index.len()
        );
    }

    /// Returns the identifier whose primary object lives at `path`.
    pub fn id_for_path(&self, path: &AssetPath) -> Option<&PrimaryAssetId> {
        self.path_index.get(path)
    }

    /// Expands every entry of `data` through the same-named bundles of the
    /// primary assets it references, transitively.
    ///
    /// Each referenced path that is the primary object of a known identifier
    /// merges in that identifier's entry of the same name. Every identifier is
    /// expanded at most once per entry, so cyclic references terminate.
    pub fn expand_recursively(&self, data: &mut AssetBundleData) {
        for entry in &mut data.bundles {
            let mut visited: HashSet<PrimaryAssetId> = HashSet::new();
            if entry.scope.is_valid() {
                visited.insert(entry.scope.clone());
            }

            let mut frontier: Vec<AssetPath> = entry.asset_paths.iter().cloned().collect();
            while let Some(path) = frontier.pop() {
                let Some(id) = self.id_for_path(&path) else {
                    continue;
                };
                if !visited.insert(id.clone()) {
                    continue;
                }
                let Some(referenced) = self.bundle_entry(id, &entry.name) else {
                    continue;
                };
                for referenced_path in &referenced.asset_paths {
                    if entry.asset_paths.insert(referenced_path.clone()) {
                        frontier.push(referenced_path.clone());
                    }
                }
            }
        }
    }
}
