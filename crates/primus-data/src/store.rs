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

//! The store of asset records: scanning, metadata updates and dynamic registration.

use crate::bundle_index::BundleIndex;
use crate::identity::{strategy_for, IdentifierStrategy};
use crate::record::AssetRecord;
use crate::type_registry::{TypeConstraint, TypeInfo, TypeRegistry};
use primus_core::asset::{
    AssetBundleData, AssetBundleEntry, AssetDescriptor, AssetPath, PrimaryAssetId,
    PrimaryAssetType,
};
use primus_core::error::{BulkScanError, RegistryError};
use primus_core::event::{AssetManagerEvent, EventBus};
use primus_core::scan::{ScanFilter, ScanService};
use primus_core::settings::{AssetManagerSettings, DuplicatePolicy, PrimaryAssetTypeConfig};

/// A request to scan directories for assets of one primary asset type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRequest {
    /// The type to populate.
    pub asset_type: PrimaryAssetType,
    /// The directories to scan; empty scans the whole registry.
    pub directories: Vec<String>,
    /// The class every scanned asset must be.
    pub base_class: String,
    /// Also accept classes derived from `base_class`.
    pub has_derived_variants: bool,
    /// The type only exists in editor builds.
    pub is_editor_only: bool,
    /// Include sub-directories.
    pub recursive: bool,
}

impl ScanRequest {
    /// Creates a recursive scan request.
    pub fn new(
        asset_type: impl Into<PrimaryAssetType>,
        directories: Vec<String>,
        base_class: impl Into<String>,
    ) -> Self {
        Self {
            asset_type: asset_type.into(),
            directories,
            base_class: base_class.into(),
            has_derived_variants: false,
            is_editor_only: false,
            recursive: true,
        }
    }

    /// Sets whether derived classes are accepted.
    pub fn with_derived_variants(mut self, has_derived_variants: bool) -> Self {
        self.has_derived_variants = has_derived_variants;
        self
    }

    /// Sets whether sub-directories are scanned.
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Returns the request described by a settings entry.
    pub fn from_config(config: &PrimaryAssetTypeConfig) -> Self {
        Self {
            asset_type: config.primary_asset_type.as_str().into(),
            directories: config.directories.clone(),
            base_class: config.asset_base_class.clone(),
            has_derived_variants: config.has_derived_variants,
            is_editor_only: config.is_editor_only,
            recursive: true,
        }
    }

    /// Returns the constraint the scanned type is registered with.
    pub fn constraint(&self) -> TypeConstraint {
        let mut constraint = TypeConstraint::scanned(self.base_class.clone());
        constraint.flags.has_derived_variants = self.has_derived_variants;
        constraint.flags.is_editor_only = self.is_editor_only;
        constraint
    }

    fn filter(&self) -> ScanFilter {
        ScanFilter {
            package_paths: self.directories.clone(),
            class_names: if self.base_class.is_empty() {
                Vec::new()
            } else {
                vec![self.base_class.clone()]
            },
            recursive_paths: self.recursive,
            recursive_classes: self.has_derived_variants,
        }
    }
}

/// Two distinct paths claiming the same identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifierConflict {
    /// The contested identifier.
    pub id: PrimaryAssetId,
    /// The path registered first.
    pub existing_path: AssetPath,
    /// The path registered second.
    pub new_path: AssetPath,
    /// Whether the second registration replaced the first.
    pub accepted: bool,
}

/// Owns the type registry and bundle index, and keeps them consistent.
///
/// Outside bulk-scan mode every mutation rebuilds the path index immediately.
/// Inside it, rebuilds are deferred to [`end_bulk`](Self::end_bulk).
#[derive(Debug)]
pub struct AssetRecordStore {
    types: TypeRegistry,
    bundles: BundleIndex,
    strategy: Box<dyn IdentifierStrategy>,
    duplicate_policy: DuplicatePolicy,
    in_bulk_scan: bool,
    conflicts: Vec<IdentifierConflict>,
    events: Option<EventBus<AssetManagerEvent>>,
}

impl AssetRecordStore {
    /// Creates an empty store.
    pub fn new(strategy: Box<dyn IdentifierStrategy>, duplicate_policy: DuplicatePolicy) -> Self {
        Self {
            types: TypeRegistry::new(),
            bundles: BundleIndex::new(),
            strategy,
            duplicate_policy,
            in_bulk_scan: false,
            conflicts: Vec::new(),
            events: None,
        }
    }

    /// Creates an empty store configured by `settings`.
    pub fn from_settings(settings: &AssetManagerSettings) -> Self {
        Self::new(
            strategy_for(settings.identifier_strategy),
            settings.duplicate_policy,
        )
    }

    /// Publishes conflicts and scan results on `events`.
    pub fn with_events(mut self, events: EventBus<AssetManagerEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Returns the type registry.
    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    /// Returns the bundle index.
    pub fn bundles(&self) -> &BundleIndex {
        &self.bundles
    }

    /// Returns the duplicate identifier policy.
    pub fn duplicate_policy(&self) -> DuplicatePolicy {
        self.duplicate_policy
    }

    /// Registers a type, or returns the existing entry.
    pub fn register_type(
        &mut self,
        asset_type: PrimaryAssetType,
        constraint: TypeConstraint,
    ) -> Result<&mut TypeInfo, RegistryError> {
        self.types.register_type(asset_type, constraint)
    }

    /// Returns the entry for `asset_type`.
    pub fn type_info(&self, asset_type: &PrimaryAssetType) -> Option<&TypeInfo> {
        self.types.get(asset_type)
    }

    /// Queries `scan` and adds or refreshes a record for every matching descriptor.
    ///
    /// The type is registered with the request's constraint first. Descriptors
    /// whose identifier is invalid or of another type are skipped. Returns the
    /// number of records added or updated.
    pub fn scan_paths(
        &mut self,
        scan: &dyn ScanService,
        request: &ScanRequest,
    ) -> Result<usize, RegistryError> {
        if self
            .types
            .get(&request.asset_type)
            .is_some_and(TypeInfo::is_dynamic)
        {
            return Err(RegistryError::ScanDynamicType(request.asset_type.clone()));
        }

        self.types
            .register_type(request.asset_type.clone(), request.constraint())?
            .add_directories(&request.directories);

        let mut count = 0;
        for descriptor in scan.query(&request.filter()) {
            let id = self
                .strategy
                .derive(&descriptor, &request.asset_type, &self.bundles);
            if !id.is_valid() {
                log::trace!(
                    "AssetRecordStore: '{}' is not a primary asset, skipping",
                    descriptor.path
                );
                continue;
            }
            if id.asset_type != request.asset_type {
                log::warn!(
                    "AssetRecordStore: '{}' resolves to '{id}', which is not of scanned type '{}'",
                    descriptor.path,
                    request.asset_type
                );
                continue;
            }

            match self.apply_update(id, descriptor, false) {
                Ok(()) => count += 1,
                Err(e) => log::debug!("AssetRecordStore: skipped scanned asset: {e}"),
            }
        }

        self.index_changed();
        log::info!(
            "AssetRecordStore: scanned {count} '{}' asset(s) in {:?}",
            request.asset_type,
            request.directories
        );
        self.publish(AssetManagerEvent::ScanCompleted {
            asset_type: request.asset_type.to_string(),
            count,
        });

        Ok(count)
    }

    /// Replaces the metadata of `id` with `descriptor`, creating the record if needed.
    ///
    /// If another path is already registered for `id` the conflict is reported,
    /// unless `allow_duplicates` is set, and resolved by the duplicate policy.
    /// Bundle entries of `id` are rebuilt from the descriptor's tags.
    pub fn update_record(
        &mut self,
        id: PrimaryAssetId,
        descriptor: AssetDescriptor,
        allow_duplicates: bool,
    ) -> Result<(), RegistryError> {
        self.apply_update(id, descriptor, allow_duplicates)?;
        self.index_changed();
        Ok(())
    }

    fn apply_update(
        &mut self,
        id: PrimaryAssetId,
        descriptor: AssetDescriptor,
        allow_duplicates: bool,
    ) -> Result<(), RegistryError> {
        if !id.is_valid() {
            return Err(RegistryError::InvalidIdentifier(id));
        }
        if self.types.get(&id.asset_type).is_none() {
            return Err(RegistryError::UnknownType(id.asset_type));
        }

        let new_path = descriptor.path.clone();
        let existing_path = self.types.record(&id).map(|record| record.path.clone());
        if let Some(existing_path) = existing_path {
            if existing_path.is_valid() && existing_path != new_path {
                if allow_duplicates {
                    log::debug!(
                        "AssetRecordStore: '{id}' moved from '{existing_path}' to '{new_path}'"
                    );
                } else {
                    let accepted = self.duplicate_policy == DuplicatePolicy::LastWriteWins;
                    self.report_conflict(IdentifierConflict {
                        id: id.clone(),
                        existing_path: existing_path.clone(),
                        new_path: new_path.clone(),
                        accepted,
                    });
                    if !accepted {
                        return Err(RegistryError::DuplicateIdentifier {
                            id,
                            existing_path,
                            new_path,
                        });
                    }
                }
            }
        }

        let bundle_data = descriptor.bundle_data(&id);
        match self.types.record_mut(&id) {
            Some(record) => {
                record.path = new_path;
                record.descriptor = Some(descriptor);
            }
            None => {
                self.types
                    .insert_record(AssetRecord::new(id.clone(), new_path, Some(descriptor)))?;
            }
        }
        self.bundles.set_bundles(&id, bundle_data);

        Ok(())
    }

    /// Adds or overwrites a record of a dynamic type.
    pub fn register_dynamic(
        &mut self,
        id: PrimaryAssetId,
        path: AssetPath,
        bundle_data: AssetBundleData,
    ) -> Result<(), RegistryError> {
        if !id.is_valid() {
            return Err(RegistryError::InvalidIdentifier(id));
        }
        match self.types.get(&id.asset_type) {
            None => return Err(RegistryError::UnknownType(id.asset_type)),
            Some(info) if !info.is_dynamic() => {
                return Err(RegistryError::NotDynamic(id.asset_type))
            }
            Some(_) => {}
        }

        match self.types.record_mut(&id) {
            Some(record) => {
                record.path = path;
                record.descriptor = None;
            }
            None => {
                self.types
                    .insert_record(AssetRecord::new(id.clone(), path, None))?;
            }
        }
        self.bundles.set_bundles(&id, bundle_data);
        self.index_changed();

        log::debug!("AssetRecordStore: registered dynamic asset '{id}'");
        Ok(())
    }

    /// Removes the record of `id` and every bundle entry scoped to it.
    ///
    /// The record's load states are returned untouched; callers unload first.
    pub fn remove_record(&mut self, id: &PrimaryAssetId) -> Option<AssetRecord> {
        let record = self.types.remove_record(id)?;
        self.bundles.remove_scope(id);
        self.index_changed();
        log::debug!("AssetRecordStore: removed '{id}'");
        Some(record)
    }

    /// Derives the identifier a descriptor would be registered under.
    ///
    /// The scan type used by heuristic derivation is the type already known for
    /// the descriptor's path, or else the scanned type whose base class and
    /// directories match it.
    pub fn derive_identifier(&self, descriptor: &AssetDescriptor) -> PrimaryAssetId {
        let scan_type = match self.bundles.id_for_path(&descriptor.path) {
            Some(known) => Some(known.asset_type.clone()),
            None => self
                .types
                .list()
                .find(|info| {
                    !info.is_dynamic()
                        && info.base_class() == descriptor.class_name
                        && info
                            .directories()
                            .iter()
                            .any(|directory| descriptor.path.is_under(directory, true))
                })
                .map(|info| info.name().clone()),
        };

        self.strategy
            .derive(descriptor, &scan_type.unwrap_or_default(), &self.bundles)
    }

    /// Enters bulk-scan mode, deferring path index rebuilds.
    pub fn begin_bulk(&mut self) -> Result<(), BulkScanError> {
        if self.in_bulk_scan {
            return Err(BulkScanError::AlreadyInBulkScan);
        }
        self.in_bulk_scan = true;
        Ok(())
    }

    /// Leaves bulk-scan mode and rebuilds the path index.
    pub fn end_bulk(&mut self) -> Result<(), BulkScanError> {
        if !self.in_bulk_scan {
            return Err(BulkScanError::NotInBulkScan);
        }
        self.in_bulk_scan = false;
        self.rebuild_path_index();
        Ok(())
    }

    /// Returns `true` inside bulk-scan mode.
    pub fn is_in_bulk_scan(&self) -> bool {
        self.in_bulk_scan
    }

    /// Rebuilds the path to identifier index from every record.
    pub fn rebuild_path_index(&mut self) {
        self.bundles.rebuild_path_index(self.types.records());
    }

    fn index_changed(&mut self) {
        if !self.in_bulk_scan {
            self.rebuild_path_index();
        }
    }

    fn report_conflict(&mut self, conflict: IdentifierConflict) {
        log::warn!(
            "AssetRecordStore: duplicate primary asset id '{}' at '{}' and '{}', {}",
            conflict.id,
            conflict.existing_path,
            conflict.new_path,
            if conflict.accepted {
                "keeping the newer path"
            } else {
                "rejecting the newer path"
            }
        );
        self.publish(AssetManagerEvent::DuplicateIdentifier {
            id: conflict.id.clone(),
            existing_path: conflict.existing_path.clone(),
            new_path: conflict.new_path.clone(),
            accepted: conflict.accepted,
        });
        self.conflicts.push(conflict);
    }

    fn publish(&self, event: AssetManagerEvent) {
        if let Some(events) = &self.events {
            events.publish(event);
        }
    }

    /// Returns every conflict reported so far.
    pub fn conflicts(&self) -> &[IdentifierConflict] {
        &self.conflicts
    }

    /// Returns the record for `id`.
    pub fn record(&self, id: &PrimaryAssetId) -> Option<&AssetRecord> {
        self.types.record(id)
    }

    /// Returns the mutable record for `id`.
    pub fn record_mut(&mut self, id: &PrimaryAssetId) -> Option<&mut AssetRecord> {
        self.types.record_mut(id)
    }

    /// Returns every record.
    pub fn records(&self) -> impl Iterator<Item = &AssetRecord> {
        self.types.records()
    }

    /// Returns every record, mutably.
    pub fn records_mut(&mut self) -> impl Iterator<Item = &mut AssetRecord> {
        self.types.records_mut()
    }

    /// Returns the sorted identifiers of every record of `asset_type`.
    pub fn id_list(&self, asset_type: &PrimaryAssetType) -> Vec<PrimaryAssetId> {
        let mut ids: Vec<_> = self
            .types
            .get(asset_type)
            .into_iter()
            .flat_map(TypeInfo::records)
            .map(|record| record.id.clone())
            .collect();
        ids.sort();
        ids
    }

    /// Returns the storage path of `id`.
    pub fn path(&self, id: &PrimaryAssetId) -> Option<&AssetPath> {
        self.types.record(id).map(|record| &record.path)
    }

    /// Returns the identifier whose primary object lives at `path`.
    pub fn id_for_path(&self, path: &AssetPath) -> Option<&PrimaryAssetId> {
        self.bundles.id_for_path(path)
    }

    /// Returns the bundle entries scoped to `id`.
    pub fn bundle_entries(&self, id: &PrimaryAssetId) -> Option<&[AssetBundleEntry]> {
        self.bundles.bundle_entries(id)
    }

    /// Returns the entry named `name` scoped to `id`.
    pub fn bundle_entry(&self, id: &PrimaryAssetId, name: &str) -> Option<&AssetBundleEntry> {
        self.bundles.bundle_entry(id, name)
    }
}
