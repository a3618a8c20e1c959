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

use super::{AssetBundleData, AssetPath, PrimaryAssetId, PrimaryAssetType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Tag holding the primary asset type of a descriptor.
pub const PRIMARY_ASSET_TYPE_TAG: &str = "PrimaryAssetType";
/// Tag holding the primary asset name of a descriptor.
pub const PRIMARY_ASSET_NAME_TAG: &str = "PrimaryAssetName";
/// Tag holding the RON-encoded [`AssetBundleData`] of a descriptor.
pub const ASSET_BUNDLE_DATA_TAG: &str = "AssetBundleData";

/// A registry record describing one asset on disk, as returned by a scan service.
///
/// The tag map is opaque to the scan service; the asset manager reads the
/// primary asset tags and the bundle definition tag from it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetDescriptor {
    /// The canonical storage path.
    pub path: AssetPath,
    /// The class (category) of the stored object.
    pub class_name: String,
    /// Arbitrary key/value tags.
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl AssetDescriptor {
    /// Creates a descriptor with no tags.
    pub fn new(path: impl Into<AssetPath>, class_name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            class_name: class_name.into(),
            tags: BTreeMap::new(),
        }
    }

    /// Adds a tag.
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Tags the descriptor with an explicit primary asset identifier.
    pub fn with_primary_asset_id(self, id: &PrimaryAssetId) -> Self {
        self.with_tag(PRIMARY_ASSET_TYPE_TAG, id.asset_type.as_str())
            .with_tag(PRIMARY_ASSET_NAME_TAG, id.name.as_str())
    }

    /// Encodes `data` into the bundle definition tag.
    pub fn with_bundle_data(mut self, data: &AssetBundleData) -> Self {
        match ron::to_string(data) {
            Ok(encoded) => {
                self.tags.insert(ASSET_BUNDLE_DATA_TAG.to_string(), encoded);
            }
            Err(e) => log::error!("Failed to encode bundle data for '{}': {e}", self.path),
        }
        self
    }

    /// Returns the value of a tag.
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    /// Returns the explicitly tagged identifier, or the invalid sentinel.
    pub fn primary_asset_id(&self) -> PrimaryAssetId {
        match (
            self.tag(PRIMARY_ASSET_TYPE_TAG),
            self.tag(PRIMARY_ASSET_NAME_TAG),
        ) {
            (Some(asset_type), Some(name)) if !asset_type.is_empty() && !name.is_empty() => {
                PrimaryAssetId::new(PrimaryAssetType::new(asset_type), name)
            }
            _ => PrimaryAssetId::invalid(),
        }
    }

    /// Decodes the bundle definition tag and scopes every entry to `scope`.
    ///
    /// A missing tag yields empty data. A malformed tag is logged and also
    /// yields empty data.
    pub fn bundle_data(&self, scope: &PrimaryAssetId) -> AssetBundleData {
        let Some(encoded) = self.tag(ASSET_BUNDLE_DATA_TAG) else {
            return AssetBundleData::default();
        };

        match ron::from_str::<AssetBundleData>(encoded) {
            Ok(mut data) => {
                data.normalize();
                data.set_scope(scope);
                data
            }
            Err(e) => {
                log::warn!("Ignoring malformed bundle data on '{}': {e}", self.path);
                AssetBundleData::default()
            }
        }
    }
}
