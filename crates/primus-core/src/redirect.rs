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

//! Resolution of deprecated identifiers, types and paths to their current equivalents.
//!
//! The three tables are populated once from [`AssetManagerSettings`] and are
//! read-only afterwards. Every lookup is a single-hop map read with no side
//! effects; a miss is signalled by an invalid sentinel, never an error.

use crate::asset::{AssetPath, PrimaryAssetId, PrimaryAssetType};
use crate::error::SettingsError;
use crate::settings::AssetManagerSettings;
use std::collections::{BTreeSet, HashMap};

/// The identifier, type and path redirect tables.
#[derive(Debug, Clone, Default)]
pub struct RedirectTable {
    identifiers: HashMap<PrimaryAssetId, PrimaryAssetId>,
    types: HashMap<PrimaryAssetType, PrimaryAssetType>,
    paths: HashMap<AssetPath, AssetPath>,
}

impl RedirectTable {
    /// Creates empty tables.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the tables from the redirect sections of `settings`.
    pub fn from_settings(settings: &AssetManagerSettings) -> Result<Self, SettingsError> {
        let mut table = Self::new();

        for (old, new) in &settings.primary_asset_id_redirects {
            let parse = |text: &str| {
                text.parse::<PrimaryAssetId>()
                    .ok()
                    .filter(PrimaryAssetId::is_valid)
            };
            match (parse(old), parse(new)) {
                (Some(old_id), Some(new_id)) => table.add_identifier_redirect(old_id, new_id),
                _ => {
                    return Err(SettingsError::InvalidRedirect {
                        old: old.clone(),
                        new: new.clone(),
                        reason: "identifier redirects must both be 'Type:Name'".to_string(),
                    })
                }
            }
        }

        for (old, new) in &settings.primary_asset_type_redirects {
            if old.is_empty() || new.is_empty() {
                return Err(SettingsError::InvalidRedirect {
                    old: old.clone(),
                    new: new.clone(),
                    reason: "type redirects must not be empty".to_string(),
                });
            }
            table.add_type_redirect(old.as_str().into(), new.as_str().into());
        }

        for (old, new) in &settings.asset_path_redirects {
            if old.is_empty() || new.is_empty() {
                return Err(SettingsError::InvalidRedirect {
                    old: old.clone(),
                    new: new.clone(),
                    reason: "path redirects must not be empty".to_string(),
                });
            }
            table.add_path_redirect(old.as_str().into(), new.as_str().into());
        }

        log::debug!(
            "RedirectTable: {} identifier, {} type, {} path redirects",
            table.identifiers.len(),
            table.types.len(),
            table.paths.len()
        );

        Ok(table)
    }

    /// Adds an identifier redirect.
    pub fn add_identifier_redirect(&mut self, old: PrimaryAssetId, new: PrimaryAssetId) {
        self.identifiers.insert(old, new);
    }

    /// Adds a type redirect.
    pub fn add_type_redirect(&mut self, old: PrimaryAssetType, new: PrimaryAssetType) {
        self.types.insert(old, new);
    }

    /// Adds a path redirect.
    pub fn add_path_redirect(&mut self, old: AssetPath, new: AssetPath) {
        self.paths.insert(old, new);
    }

    /// Returns `true` if no table holds an entry.
    pub fn is_empty(&self) -> bool {
        self.identifiers.is_empty() && self.types.is_empty() && self.paths.is_empty()
    }

    /// Resolves a deprecated identifier.
    ///
    /// A direct identifier redirect wins; otherwise a type redirect rewrites the
    /// type and keeps the name. Returns the invalid sentinel if neither applies.
    pub fn resolve_identifier(&self, old: &PrimaryAssetId) -> PrimaryAssetId {
        if let Some(new) = self.identifiers.get(old) {
            return new.clone();
        }

        match self.resolve_type(&old.asset_type) {
            Some(new_type) => PrimaryAssetId::new(new_type, old.name.clone()),
            None => PrimaryAssetId::invalid(),
        }
    }

    /// Resolves a deprecated type.
    pub fn resolve_type(&self, old: &PrimaryAssetType) -> Option<PrimaryAssetType> {
        self.types.get(old).cloned()
    }

    /// Resolves a deprecated path, or returns an invalid (empty) path.
    pub fn resolve_path(&self, old: &AssetPath) -> AssetPath {
        self.paths.get(old).cloned().unwrap_or_default()
    }

    /// Returns every identifier that resolves to `new`.
    pub fn find_previous_identifiers(&self, new: &PrimaryAssetId) -> BTreeSet<PrimaryAssetId> {
        let mut previous: BTreeSet<PrimaryAssetId> = self
            .identifiers
            .iter()
            .filter(|(_, target)| *target == new)
            .map(|(old, _)| old.clone())
            .collect();

        for (old_type, new_type) in &self.types {
            if *new_type == new.asset_type {
                let candidate = PrimaryAssetId::new(old_type.clone(), new.name.clone());
                if !self.identifiers.contains_key(&candidate) {
                    previous.insert(candidate);
                }
            }
        }

        previous
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(text: &str) -> PrimaryAssetId {
        text.parse().unwrap()
    }

    fn table() -> RedirectTable {
        let mut settings = AssetManagerSettings::default();
        settings
            .primary_asset_id_redirects
            .insert("Map:OldArena".into(), "Map:Arena".into());
        settings
            .primary_asset_id_redirects
            .insert("Map:Colosseum".into(), "Map:Arena".into());
        settings
            .primary_asset_id_redirects
            .insert("Hero:Paladin".into(), "Hero:Knight".into());
        settings
            .primary_asset_type_redirects
            .insert("Level".into(), "Map".into());
        settings
            .asset_path_redirects
            .insert("/Game/Old/A.A".into(), "/Game/New/A.A".into());
        RedirectTable::from_settings(&settings).unwrap()
    }

    #[test]
    fn identifier_redirects_round_trip() {
        let table = table();
        for (old, new) in [
            ("Map:OldArena", "Map:Arena"),
            ("Map:Colosseum", "Map:Arena"),
            ("Hero:Paladin", "Hero:Knight"),
        ] {
            assert_eq!(table.resolve_identifier(&id(old)), id(new));
            assert!(table.find_previous_identifiers(&id(new)).contains(&id(old)));
        }
    }

    #[test]
    fn identifier_falls_back_to_type_redirect() {
        let table = table();
        assert_eq!(table.resolve_identifier(&id("Level:Dune")), id("Map:Dune"));
        assert!(table
            .find_previous_identifiers(&id("Map:Dune"))
            .contains(&id("Level:Dune")));
    }

    #[test]
    fn misses_return_invalid_sentinels() {
        let table = table();
        assert!(!table.resolve_identifier(&id("Hero:Rogue")).is_valid());
        assert!(table.resolve_type(&"Hero".into()).is_none());
        assert!(!table.resolve_path(&"/Game/Nope.Nope".into()).is_valid());
    }

    #[test]
    fn path_redirect_is_single_hop() {
        let mut table = table();
        table.add_path_redirect("/Game/New/A.A".into(), "/Game/Newer/A.A".into());
        assert_eq!(
            table.resolve_path(&"/Game/Old/A.A".into()),
            AssetPath::new("/Game/New/A.A")
        );
    }

    #[test]
    fn invalid_identifier_redirect_is_rejected() {
        let mut settings = AssetManagerSettings::default();
        settings
            .primary_asset_id_redirects
            .insert("Map:Old".into(), "".into());
        assert!(RedirectTable::from_settings(&settings).is_err());
    }
}
