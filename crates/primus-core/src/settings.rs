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

//! Persisted configuration consumed by the asset manager at startup.
//!
//! Settings are usually read from a TOML file:
//!
//! ```toml
//! identifier_strategy = "Heuristic"
//! duplicate_policy = "Reject"
//!
//! [[primary_asset_types_to_scan]]
//! primary_asset_type = "Map"
//! asset_base_class = "MapAsset"
//! directories = ["/Game/Maps"]
//!
//! [primary_asset_id_redirects]
//! "Map:OldArena" = "Map:Arena"
//! ```

use crate::error::SettingsError;
use crate::streaming::LoadPriority;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fs, path::Path};

/// Per-type rules applied to every asset of a type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrimaryAssetRules {
    /// Load priority for assets of this type; `None` uses the manager default.
    pub priority: Option<i32>,
    /// Expand bundles recursively whenever assets of this type are loaded.
    pub apply_recursively: bool,
}

/// Configuration of one primary asset type to register and scan at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrimaryAssetTypeConfig {
    /// The type name.
    pub primary_asset_type: String,
    /// The class every asset of this type must be (or derive from).
    pub asset_base_class: String,
    /// Also accept classes derived from `asset_base_class`.
    pub has_derived_variants: bool,
    /// Assets of this type only exist in editor builds.
    pub is_editor_only: bool,
    /// Assets are registered programmatically instead of scanned.
    pub is_dynamic: bool,
    /// Directories to scan.
    pub directories: Vec<String>,
    /// Rules applied to the type.
    pub rules: PrimaryAssetRules,
}

/// How identifiers are derived from scanned descriptors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdentifierStrategyKind {
    /// Only descriptors carrying explicit identifier tags are accepted.
    #[default]
    Tagged,
    /// Untagged descriptors fall back to `ScanType:ShortName`.
    Heuristic,
}

/// What happens when a second path claims an already registered identifier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DuplicatePolicy {
    /// The newer registration replaces the older one; the conflict is reported.
    #[default]
    LastWriteWins,
    /// The newer registration is rejected; the conflict is reported.
    Reject,
}

/// The asset manager's startup configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetManagerSettings {
    /// Types registered and scanned by `scan_primary_asset_types_from_config`.
    pub primary_asset_types_to_scan: Vec<PrimaryAssetTypeConfig>,
    /// Deprecated identifier (`Type:Name`) to current identifier.
    pub primary_asset_id_redirects: BTreeMap<String, String>,
    /// Deprecated type name to current type name.
    pub primary_asset_type_redirects: BTreeMap<String, String>,
    /// Deprecated asset path to current asset path.
    pub asset_path_redirects: BTreeMap<String, String>,
    /// Identifier derivation strategy.
    pub identifier_strategy: IdentifierStrategyKind,
    /// Resolution of identifier conflicts.
    pub duplicate_policy: DuplicatePolicy,
    /// Block the calling thread on every load request.
    pub force_synchronous_loads: bool,
    /// Expand bundles through referenced primary assets on every load.
    pub expand_bundles_recursively: bool,
    /// Priority for loads that specify none.
    pub default_priority: i32,
}

impl Default for AssetManagerSettings {
    fn default() -> Self {
        Self {
            primary_asset_types_to_scan: Vec::new(),
            primary_asset_id_redirects: BTreeMap::new(),
            primary_asset_type_redirects: BTreeMap::new(),
            asset_path_redirects: BTreeMap::new(),
            identifier_strategy: IdentifierStrategyKind::Tagged,
            duplicate_policy: DuplicatePolicy::LastWriteWins,
            force_synchronous_loads: false,
            expand_bundles_recursively: false,
            default_priority: LoadPriority::DEFAULT.0,
        }
    }
}

impl AssetManagerSettings {
    /// Parses settings from TOML text and validates the redirect tables.
    pub fn from_toml_str(text: &str) -> Result<Self, SettingsError> {
        let settings: Self = toml::from_str(text)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reads settings from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file '{}'", path.display()))?;
        Self::from_toml_str(&text)
            .with_context(|| format!("Failed to parse settings from '{}'", path.display()))
    }

    /// Checks that every redirect entry is well formed.
    pub fn validate(&self) -> Result<(), SettingsError> {
        crate::redirect::RedirectTable::from_settings(self).map(|_| ())
    }

    /// Returns the default load priority.
    pub fn default_load_priority(&self) -> LoadPriority {
        LoadPriority(self.default_priority)
    }
}
