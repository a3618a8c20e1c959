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

use primus_core::asset::{BundleName, PrimaryAssetId};
use primus_data::AssetRecordStore;
use std::collections::{BTreeMap, BTreeSet};

/// The effective bundle set of every loaded identifier at one point in time.
///
/// Captured before entering a simulation and replayed when leaving it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BundleStateSnapshot {
    states: BTreeMap<PrimaryAssetId, BTreeSet<BundleName>>,
}

impl BundleStateSnapshot {
    /// Captures the effective state of every record with a valid state.
    pub fn capture(store: &AssetRecordStore) -> Self {
        let states = store
            .records()
            .filter_map(|record| {
                let effective = record.effective_state();
                effective
                    .is_valid()
                    .then(|| (record.id.clone(), effective.bundle_names.clone()))
            })
            .collect();
        Self { states }
    }

    /// Returns the number of captured identifiers.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Returns `true` if nothing was loaded.
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Returns `true` if `id` was loaded.
    pub fn contains(&self, id: &PrimaryAssetId) -> bool {
        self.states.contains_key(id)
    }

    /// Returns the bundle set `id` was loaded with.
    pub fn bundles(&self, id: &PrimaryAssetId) -> Option<&BTreeSet<BundleName>> {
        self.states.get(id)
    }

    /// Groups the captured identifiers by bundle set.
    pub fn by_bundle_set(&self) -> BTreeMap<BTreeSet<BundleName>, Vec<PrimaryAssetId>> {
        let mut groups: BTreeMap<_, Vec<_>> = BTreeMap::new();
        for (id, bundles) in &self.states {
            groups.entry(bundles.clone()).or_default().push(id.clone());
        }
        groups
    }
}
