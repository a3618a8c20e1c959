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

//! The registry of primary asset types and the records each type owns.

use crate::record::AssetRecord;
use primus_core::asset::{PrimaryAssetId, PrimaryAssetType};
use primus_core::error::RegistryError;
use primus_core::settings::{PrimaryAssetRules, PrimaryAssetTypeConfig};
use std::collections::{BTreeMap, HashMap};

/// Flags fixed for the lifetime of a type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct TypeFlags {
    /// Records are registered programmatically; the type is never scanned.
    pub is_dynamic: bool,
    /// Records only exist in editor builds.
    pub is_editor_only: bool,
    /// Scans also accept classes derived from the base class.
    pub has_derived_variants: bool,
}

/// The constraint a type is registered with.
///
/// Registering the same type twice requires an identical constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct TypeConstraint {
    /// The class every asset of the type must be, or derive from.
    pub base_class: String,
    /// The type flags.
    pub flags: TypeFlags,
}

impl TypeConstraint {
    /// Creates a constraint for a scanned type.
    pub fn scanned(base_class: impl Into<String>) -> Self {
        Self {
            base_class: base_class.into(),
            flags: TypeFlags::default(),
        }
    }

    /// Creates a constraint for a dynamic type.
    pub fn dynamic(base_class: impl Into<String>) -> Self {
        Self {
            base_class: base_class.into(),
            flags: TypeFlags {
                is_dynamic: true,
                ..TypeFlags::default()
            },
        }
    }

    /// Returns the constraint described by a settings entry.
    pub fn from_config(config: &PrimaryAssetTypeConfig) -> Self {
        Self {
            base_class: config.asset_base_class.clone(),
            flags: TypeFlags {
                is_dynamic: config.is_dynamic,
                is_editor_only: config.is_editor_only,
                has_derived_variants: config.has_derived_variants,
            },
        }
    }

    fn mismatch(&self, other: &TypeConstraint) -> Option<String> {
        if self.base_class != other.base_class {
            return Some(format!(
                "base class '{}' != '{}'",
                self.base_class, other.base_class
            ));
        }
        if self.flags != other.flags {
            return Some(format!("flags {:?} != {:?}", self.flags, other.flags));
        }
        None
    }
}

/// One registered primary asset type.
#[derive(Debug, Clone)]
pub struct TypeInfo {
    name: PrimaryAssetType,
    constraint: TypeConstraint,
    rules: PrimaryAssetRules,
    directories: Vec<String>,
    assets: HashMap<String, AssetRecord>,
}

impl TypeInfo {
    fn new(name: PrimaryAssetType, constraint: TypeConstraint) -> Self {
        Self {
            name,
            constraint,
            rules: PrimaryAssetRules::default(),
            directories: Vec::new(),
            assets: HashMap::new(),
        }
    }

    /// Returns the type name.
    pub fn name(&self) -> &PrimaryAssetType {
        &self.name
    }

    /// Returns the registration constraint.
    pub fn constraint(&self) -> &TypeConstraint {
        &self.constraint
    }

    /// Returns the base class constraint.
    pub fn base_class(&self) -> &str {
        &self.constraint.base_class
    }

    /// Returns the type flags.
    pub fn flags(&self) -> TypeFlags {
        self.constraint.flags
    }

    /// Returns `true` if records are registered programmatically.
    pub fn is_dynamic(&self) -> bool {
        self.constraint.flags.is_dynamic
    }

    /// Returns the rules applied to every asset of the type.
    pub fn rules(&self) -> PrimaryAssetRules {
        self.rules
    }

    /// Replaces the rules.
    pub fn set_rules(&mut self, rules: PrimaryAssetRules) {
        self.rules = rules;
    }

    /// Returns the directories the type has been scanned in.
    pub fn directories(&self) -> &[String] {
        &self.directories
    }

    /// Records `directories` as search paths, skipping known ones.
    pub fn add_directories<'a>(&mut self, directories: impl IntoIterator<Item = &'a String>) {
        for directory in directories {
            if !self.directories.contains(directory) {
                self.directories.push(directory.clone());
            }
        }
    }

    /// Returns the number of records of the type.
    pub fn asset_count(&self) -> usize {
        self.assets.len()
    }

    /// Returns the record named `name`.
    pub fn record(&self, name: &str) -> Option<&AssetRecord> {
        self.assets.get(name)
    }

    /// Returns every record of the type, in no particular order.
    pub fn records(&self) -> impl Iterator<Item = &AssetRecord> {
        self.assets.values()
    }
}

/// Every registered primary asset type, ordered by name.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    types: BTreeMap<PrimaryAssetType, TypeInfo>,
}

impl TypeRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `asset_type`, or returns the existing entry.
    ///
    /// Registering an existing type with a different constraint is rejected and
    /// leaves the existing entry untouched.
    pub fn register_type(
        &mut self,
        asset_type: PrimaryAssetType,
        constraint: TypeConstraint,
    ) -> Result<&mut TypeInfo, RegistryError> {
        if !asset_type.is_valid() {
            return Err(RegistryError::UnknownType(asset_type));
        }

        if let Some(existing) = self.types.get(&asset_type) {
            if let Some(details) = existing.constraint.mismatch(&constraint) {
                return Err(RegistryError::TypeMismatch {
                    asset_type,
                    details,
                });
            }
        }

        Ok(self
            .types
            .entry(asset_type.clone())
            .or_insert_with(|| {
                log::debug!("TypeRegistry: registered primary asset type '{asset_type}'");
                TypeInfo::new(asset_type, constraint)
            }))
    }

    /// Returns the entry for `asset_type`.
    pub fn get(&self, asset_type: &PrimaryAssetType) -> Option<&TypeInfo> {
        self.types.get(asset_type)
    }

    /// Returns the mutable entry for `asset_type`.
    pub fn get_mut(&mut self, asset_type: &PrimaryAssetType) -> Option<&mut TypeInfo> {
        self.types.get_mut(asset_type)
    }

    /// Returns every type, ordered by name.
    pub fn list(&self) -> impl Iterator<Item = &TypeInfo> {
        self.types.values()
    }

    /// Returns the record for `id`.
    pub fn record(&self, id: &PrimaryAssetId) -> Option<&AssetRecord> {
        self.types.get(&id.asset_type)?.assets.get(&id.name)
    }

    /// Returns the mutable record for `id`.
    pub fn record_mut(&mut self, id: &PrimaryAssetId) -> Option<&mut AssetRecord> {
        self.types.get_mut(&id.asset_type)?.assets.get_mut(&id.name)
    }

    /// Returns every record of every type.
    pub fn records(&self) -> impl Iterator<Item = &AssetRecord> {
        self.types.values().flat_map(TypeInfo::records)
    }

    /// Returns every record of every type, mutably.
    pub fn records_mut(&mut self) -> impl Iterator<Item = &mut AssetRecord> {
        self.types
            .values_mut()
            .flat_map(|info| info.assets.values_mut())
    }

    /// Inserts `record`, replacing any record with the same identifier.
    ///
    /// Returns the replaced record. Fails if the record's type is not registered.
    pub fn insert_record(
        &mut self,
        record: AssetRecord,
    ) -> Result<Option<AssetRecord>, RegistryError> {
        let info = self
            .types
            .get_mut(&record.id.asset_type)
            .ok_or_else(|| RegistryError::UnknownType(record.id.asset_type.clone()))?;
        Ok(info.assets.insert(record.id.name.clone(), record))
    }

    /// Removes and returns the record for `id`.
    pub fn remove_record(&mut self, id: &PrimaryAssetId) -> Option<AssetRecord> {
        self.types.get_mut(&id.asset_type)?.assets.remove(&id.name)
    }
}
