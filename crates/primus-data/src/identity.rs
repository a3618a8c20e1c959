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

//! Strategies deriving a primary asset identifier from a scanned descriptor.

use crate::bundle_index::BundleIndex;
use primus_core::asset::{AssetDescriptor, PrimaryAssetId, PrimaryAssetType};
use primus_core::settings::IdentifierStrategyKind;
use std::fmt::Debug;

/// Derives the identifier of a descriptor found while scanning for `scan_type`.
///
/// Implementations must be deterministic: the same descriptor and index always
/// yield the same identifier. The invalid sentinel means "not a primary asset".
pub trait IdentifierStrategy: Debug + Send + Sync {
    /// Returns the identifier of `descriptor`, or the invalid sentinel.
    fn derive(
        &self,
        descriptor: &AssetDescriptor,
        scan_type: &PrimaryAssetType,
        index: &BundleIndex,
    ) -> PrimaryAssetId;
}

/// Accepts only descriptors that carry explicit identifier tags.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaggedIdentifierStrategy;

impl IdentifierStrategy for TaggedIdentifierStrategy {
    fn derive(
        &self,
        descriptor: &AssetDescriptor,
        _scan_type: &PrimaryAssetType,
        _index: &BundleIndex,
    ) -> PrimaryAssetId {
        descriptor.primary_asset_id()
    }
}

/// Falls back to `ScanType:ShortName` for untagged descriptors.
///
/// A path already known under another identifier keeps that identifier, so the
/// fallback never fabricates a second identifier for the same asset.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicIdentifierStrategy;

impl IdentifierStrategy for HeuristicIdentifierStrategy {
    fn derive(
        &self,
        descriptor: &AssetDescriptor,
        scan_type: &PrimaryAssetType,
        index: &BundleIndex,
    ) -> PrimaryAssetId {
        let tagged = descriptor.primary_asset_id();
        if tagged.is_valid() {
            return tagged;
        }

        if let Some(known) = index.id_for_path(&descriptor.path) {
            return known.clone();
        }

        let name = descriptor.path.asset_name();
        if !scan_type.is_valid() || name.is_empty() {
            return PrimaryAssetId::invalid();
        }
        PrimaryAssetId::new(scan_type.clone(), name)
    }
}

/// Returns the strategy selected by `kind`.
pub fn strategy_for(kind: IdentifierStrategyKind) -> Box<dyn IdentifierStrategy> {
    match kind {
        IdentifierStrategyKind::Tagged => Box::new(TaggedIdentifierStrategy),
        IdentifierStrategyKind::Heuristic => Box::new(HeuristicIdentifierStrategy),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::AssetRecord;

    fn untagged() -> AssetDescriptor {
        AssetDescriptor::new("/Game/Maps/Arena.Arena", "MapAsset")
    }

    #[test]
    fn tagged_strategy_requires_tags() {
        let index = BundleIndex::new();
        let strategy = strategy_for(IdentifierStrategyKind::Tagged);
        assert!(!strategy
            .derive(&untagged(), &"Map".into(), &index)
            .is_valid());

        let id = PrimaryAssetId::new("Map", "Colosseum");
        let tagged = untagged().with_primary_asset_id(&id);
        assert_eq!(strategy.derive(&tagged, &"Map".into(), &index), id);
    }

    #[test]
    fn heuristic_strategy_falls_back_to_short_name() {
        let index = BundleIndex::new();
        let strategy = strategy_for(IdentifierStrategyKind::Heuristic);
        assert_eq!(
            strategy.derive(&untagged(), &"Map".into(), &index),
            PrimaryAssetId::new("Map", "Arena")
        );
    }

    #[test]
    fn heuristic_strategy_reuses_known_identifier() {
        let known = PrimaryAssetId::new("Level", "Arena");
        let mut index = BundleIndex::new();
        index.rebuild_path_index(&[AssetRecord::new(
            known.clone(),
            "/Game/Maps/Arena.Arena".into(),
            None,
        )]);

        let strategy = HeuristicIdentifierStrategy;
        assert_eq!(strategy.derive(&untagged(), &"Map".into(), &index), known);
    }
}
