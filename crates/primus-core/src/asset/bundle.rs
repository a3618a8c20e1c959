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

use super::{AssetPath, PrimaryAssetId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The symbolic name of a bundle, e.g. `UI` or `Game`.
pub type BundleName = String;

/// A named set of asset paths that can be loaded or unloaded as a unit.
///
/// Entries are scoped to the primary asset that defines them, so two unrelated
/// assets can both declare a `UI` bundle without colliding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetBundleEntry {
    /// The primary asset owning this entry.
    #[serde(default)]
    pub scope: PrimaryAssetId,
    /// The bundle name.
    pub name: BundleName,
    /// The referenced asset paths.
    #[serde(default)]
    pub asset_paths: BTreeSet<AssetPath>,
}

impl AssetBundleEntry {
    /// Creates an empty entry.
    pub fn new(scope: PrimaryAssetId, name: impl Into<BundleName>) -> Self {
        Self {
            scope,
            name: name.into(),
            asset_paths: BTreeSet::new(),
        }
    }

    /// An entry is valid when it has a name.
    pub fn is_valid(&self) -> bool {
        !self.name.is_empty()
    }
}

/// The full set of bundle entries declared by one primary asset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetBundleData {
    /// The entries, at most one per bundle name.
    #[serde(default)]
    pub bundles: Vec<AssetBundleEntry>,
}

impl AssetBundleData {
    /// Creates empty bundle data.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if no bundle is declared.
    pub fn is_empty(&self) -> bool {
        self.bundles.is_empty()
    }

    /// Finds the entry for `name`.
    pub fn find_entry(&self, name: &str) -> Option<&AssetBundleEntry> {
        self.bundles.iter().find(|entry| entry.name == name)
    }

    fn entry_mut(&mut self, name: &str) -> &mut AssetBundleEntry {
        let index = match self.bundles.iter().position(|entry| entry.name == name) {
            Some(index) => index,
            None => {
                let scope = self
                    .bundles
                    .first()
                    .map(|entry| entry.scope.clone())
                    .unwrap_or_default();
                self.bundles.push(AssetBundleEntry::new(scope, name));
                self.bundles.len() - 1
            }
        };
        &mut self.bundles[index]
    }

    /// Adds `path` to the bundle `name`, creating the entry if needed.
    pub fn add_bundle_asset(&mut self, name: &str, path: AssetPath) {
        if !path.is_valid() {
            return;
        }
        self.entry_mut(name).asset_paths.insert(path);
    }

    /// Adds every path in `paths` to the bundle `name`.
    pub fn add_bundle_assets(&mut self, name: &str, paths: impl IntoIterator<Item = AssetPath>) {
        let entry = self.entry_mut(name);
        entry
            .asset_paths
            .extend(paths.into_iter().filter(AssetPath::is_valid));
    }

    /// Assigns `scope` to every entry.
    pub fn set_scope(&mut self, scope: &PrimaryAssetId) {
        for entry in &mut self.bundles {
            entry.scope = scope.clone();
        }
    }

    /// Merges entries with the same name and drops unnamed ones.
    pub fn normalize(&mut self) {
        let mut merged: Vec<AssetBundleEntry> = Vec::with_capacity(self.bundles.len());
        for entry in self.bundles.drain(..).filter(AssetBundleEntry::is_valid) {
            match merged.iter_mut().find(|existing| existing.name == entry.name) {
                Some(existing) => existing.asset_paths.extend(entry.asset_paths),
                None => merged.push(entry),
            }
        }
        self.bundles = merged;
    }

    /// Returns the union of every entry's paths.
    pub fn all_paths(&self) -> BTreeSet<AssetPath> {
        self.bundles
            .iter()
            .flat_map(|entry| entry.asset_paths.iter().cloned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_creates_and_extends_entries() {
        let mut data = AssetBundleData::new();
        data.add_bundle_asset("UI", AssetPath::new("/Game/UI/Icon.Icon"));
        data.add_bundle_asset("UI", AssetPath::new("/Game/UI/Frame.Frame"));
        data.add_bundle_asset("UI", AssetPath::new("/Game/UI/Icon.Icon"));
        data.add_bundle_asset("Game", AssetPath::new("/Game/Mesh/Hero.Hero"));

        assert_eq!(data.bundles.len(), 2);
        assert_eq!(data.find_entry("UI").unwrap().asset_paths.len(), 2);
        assert_eq!(data.all_paths().len(), 3);
    }

    #[test]
    fn invalid_paths_are_ignored() {
        let mut data = AssetBundleData::new();
        data.add_bundle_asset("UI", AssetPath::default());
        assert!(data.is_empty());
    }

    #[test]
    fn normalize_merges_duplicate_names() {
        let mut data = AssetBundleData {
            bundles: vec![
                AssetBundleEntry {
                    scope: PrimaryAssetId::invalid(),
                    name: "UI".into(),
                    asset_paths: [AssetPath::new("/Game/A.A")].into(),
                },
                AssetBundleEntry::new(PrimaryAssetId::invalid(), ""),
                AssetBundleEntry {
                    scope: PrimaryAssetId::invalid(),
                    name: "UI".into(),
                    asset_paths: [AssetPath::new("/Game/B.B")].into(),
                },
            ],
        };
        data.normalize();
        assert_eq!(data.bundles.len(), 1);
        assert_eq!(data.bundles[0].asset_paths.len(), 2);
    }

    #[test]
    fn set_scope_applies_to_all_entries() {
        let mut data = AssetBundleData::new();
        data.add_bundle_asset("UI", AssetPath::new("/Game/A.A"));
        data.add_bundle_asset("Game", AssetPath::new("/Game/B.B"));
        let scope = PrimaryAssetId::new("Hero", "Knight");
        data.set_scope(&scope);
        assert!(data.bundles.iter().all(|entry| entry.scope == scope));
    }
}
