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

//! The [`AssetManager`] façade.

use super::snapshot::BundleStateSnapshot;
use crate::streaming_agent::{BundleChange, StreamingStateMachine};
use primus_core::asset::{
    Asset, AssetBundleData, AssetBundleEntry, AssetDescriptor, AssetHandle, AssetPath,
    BundleName, LoadedAsset, PrimaryAssetId, PrimaryAssetType,
};
use primus_core::error::SettingsError;
use primus_core::event::{AssetManagerEvent, EventBus};
use primus_core::redirect::RedirectTable;
use primus_core::scan::ScanService;
use primus_core::settings::AssetManagerSettings;
use primus_core::streaming::{CompletionCallback, StreamableHandle, StreamingEngine};
use primus_data::{
    AssetRecord, AssetRecordStore, IdentifierConflict, ScanRequest, TypeConstraint, TypeInfo,
};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Coordinates scanning, lookups, bundle loads and simulate-mode state capture.
///
/// Every method runs on the owner thread. Loads complete asynchronously: call
/// [`process_completions`](Self::process_completions) regularly (once per frame
/// in a game loop) to promote finished loads to the current state.
pub struct AssetManager {
    settings: AssetManagerSettings,
    redirects: RedirectTable,
    store: AssetRecordStore,
    streaming: StreamingStateMachine,
    scan: Arc<dyn ScanService>,
    engine: Arc<dyn StreamingEngine>,
    events: EventBus<AssetManagerEvent>,
    deferred_scans: Vec<ScanRequest>,
    simulate_snapshot: Option<BundleStateSnapshot>,
}

impl fmt::Debug for AssetManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetManager")
            .field("types", &self.store.types().list().count())
            .field("records", &self.store.records().count())
            .field("deferred_scans", &self.deferred_scans.len())
            .field("simulating", &self.simulate_snapshot.is_some())
            .finish_non_exhaustive()
    }
}

fn bundle_set(bundles: &[&str]) -> BTreeSet<BundleName> {
    bundles.iter().map(|name| name.to_string()).collect()
}

impl AssetManager {
    /// Creates a manager over `scan` and `engine`, configured by `settings`.
    ///
    /// Fails if a redirect entry is malformed. No type is registered or scanned
    /// yet; call [`Self::scan_primary_asset_types_from_config`] for that.
    pub fn new(
        settings: AssetManagerSettings,
        scan: Arc<dyn ScanService>,
        engine: Arc<dyn StreamingEngine>,
    ) -> Result<Self, SettingsError> {
        let redirects = RedirectTable::from_settings(&settings)?;
        let events = EventBus::new();
        let store = AssetRecordStore::from_settings(&settings).with_events(events.clone());
        let streaming = StreamingStateMachine::new(&settings).with_events(events.clone());

        log::info!(
            "AssetManager: initialized with {} configured type(s), {:?} ids, {:?} duplicates",
            settings.primary_asset_types_to_scan.len(),
            settings.identifier_strategy,
            settings.duplicate_policy
        );

        Ok(Self {
            settings,
            redirects,
            store,
            streaming,
            scan,
            engine,
            events,
            deferred_scans: Vec::new(),
            simulate_snapshot: None,
        })
    }

    /// Returns the settings.
    pub fn settings(&self) -> &AssetManagerSettings {
        &self.settings
    }

    /// Returns the redirect tables.
    pub fn redirects(&self) -> &RedirectTable {
        &self.redirects
    }

    /// Returns the record store.
    pub fn store(&self) -> &AssetRecordStore {
        &self.store
    }

    /// Returns the event bus listeners drain.
    pub fn events(&self) -> &EventBus<AssetManagerEvent> {
        &self.events
    }

    /// Returns every identifier conflict reported so far.
    pub fn conflicts(&self) -> &[IdentifierConflict] {
        self.store.conflicts()
    }

    // --- Identifier resolution ---

    fn resolve(&self, id: &PrimaryAssetId) -> Option<PrimaryAssetId> {
        if self.store.record(id).is_some() {
            return Some(id.clone());
        }
        let redirected = self.redirects.resolve_identifier(id);
        if redirected.is_valid() && self.store.record(&redirected).is_some() {
            log::debug!("AssetManager: '{id}' redirected to '{redirected}'");
            return Some(redirected);
        }
        None
    }

    fn resolve_all(&self, ids: &[PrimaryAssetId]) -> Vec<PrimaryAssetId> {
        ids.iter()
            .map(|id| self.resolve(id).unwrap_or_else(|| id.clone()))
            .collect()
    }

    fn resolve_type(&self, asset_type: &PrimaryAssetType) -> PrimaryAssetType {
        if self.store.type_info(asset_type).is_some() {
            return asset_type.clone();
        }
        self.redirects
            .resolve_type(asset_type)
            .unwrap_or_else(|| asset_type.clone())
    }

    fn record(&self, id: &PrimaryAssetId) -> Option<&AssetRecord> {
        self.store.record(&self.resolve(id)?)
    }

    // --- Types and scanning ---

    /// Registers a type without scanning it, typically a dynamic one.
    pub fn register_primary_asset_type(
        &mut self,
        asset_type: impl Into<PrimaryAssetType>,
        constraint: TypeConstraint,
    ) -> bool {
        match self.store.register_type(asset_type.into(), constraint) {
            Ok(_) => true,
            Err(e) => {
                log::error!("AssetManager: {e}");
                false
            }
        }
    }

    /// Scans for assets of `request.asset_type` and returns the number of records
    /// added or updated.
    ///
    /// If the scan service is still indexing, a synchronous request waits for
    /// it, and an asynchronous one is queued for
    /// [`on_scan_service_ready`](Self::on_scan_service_ready) and returns `0`.
    pub fn scan_paths(&mut self, request: ScanRequest, synchronous: bool) -> usize {
        if !self.scan.is_ready() {
            if !synchronous {
                log::info!(
                    "AssetManager: scan service not ready, deferring scan of '{}'",
                    request.asset_type
                );
                self.deferred_scans.push(request);
                return 0;
            }
            self.scan.wait_until_ready();
        }
        self.run_scan(&request)
    }

    fn run_scan(&mut self, request: &ScanRequest) -> usize {
        match self.store.scan_paths(self.scan.as_ref(), request) {
            Ok(count) => count,
            Err(e) => {
                log::error!("AssetManager: scan of '{}' failed: {e}", request.asset_type);
                0
            }
        }
    }

    /// Returns the number of scans waiting for the scan service.
    pub fn deferred_scan_count(&self) -> usize {
        self.deferred_scans.len()
    }

    /// Replays every deferred scan inside one bulk scan.
    pub fn on_scan_service_ready(&mut self) -> usize {
        let queued = std::mem::take(&mut self.deferred_scans);
        if queued.is_empty() {
            return 0;
        }

        log::info!("AssetManager: replaying {} deferred scan(s)", queued.len());
        let bulk = self.start_owned_bulk_scan();
        let count = queued.iter().map(|request| self.run_scan(request)).sum();
        if bulk {
            self.stop_bulk_scanning();
        }
        count
    }

    /// Registers and scans every type listed in the settings, inside one bulk scan.
    ///
    /// Dynamic types are only registered. Returns the number of scanned records.
    pub fn scan_primary_asset_types_from_config(&mut self) -> usize {
        let configs = self.settings.primary_asset_types_to_scan.clone();
        let bulk = self.start_owned_bulk_scan();

        let mut count = 0;
        for config in &configs {
            let asset_type = PrimaryAssetType::new(config.primary_asset_type.as_str());
            match self
                .store
                .register_type(asset_type, TypeConstraint::from_config(config))
            {
                Ok(info) => info.set_rules(config.rules),
                Err(e) => {
                    log::error!("AssetManager: skipping configured type: {e}");
                    continue;
                }
            }
            if !config.is_dynamic {
                count += self.scan_paths(ScanRequest::from_config(config), false);
            }
        }

        if bulk {
            self.stop_bulk_scanning();
        }
        count
    }

    /// Enters bulk-scan mode unless a caller already did.
    ///
    /// Returns `true` if this call owns the bulk scan and must stop it.
    fn start_owned_bulk_scan(&mut self) -> bool {
        !self.store.is_in_bulk_scan() && self.start_bulk_scanning()
    }

    /// Enters bulk-scan mode. Returns `false`, logging, if already inside one.
    pub fn start_bulk_scanning(&mut self) -> bool {
        match self.store.begin_bulk() {
            Ok(()) => true,
            Err(e) => {
                log::error!("AssetManager: {e}");
                false
            }
        }
    }

    /// Leaves bulk-scan mode and rebuilds the path index.
    pub fn stop_bulk_scanning(&mut self) -> bool {
        match self.store.end_bulk() {
            Ok(()) => true,
            Err(e) => {
                log::error!("AssetManager: {e}");
                false
            }
        }
    }

    // --- Registration ---

    /// Adds or overwrites a record of a dynamic type.
    pub fn add_dynamic_asset(
        &mut self,
        id: PrimaryAssetId,
        path: AssetPath,
        bundle_data: AssetBundleData,
    ) -> bool {
        match self.store.register_dynamic(id, path, bundle_data) {
            Ok(()) => true,
            Err(e) => {
                log::error!("AssetManager: {e}");
                false
            }
        }
    }

    /// Replaces the metadata of `id` with `descriptor`.
    pub fn update_primary_asset(
        &mut self,
        id: PrimaryAssetId,
        descriptor: AssetDescriptor,
        allow_duplicates: bool,
    ) -> bool {
        match self.store.update_record(id, descriptor, allow_duplicates) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("AssetManager: {e}");
                false
            }
        }
    }

    /// Unloads `id` and removes its record and bundle entries.
    pub fn remove_primary_asset(&mut self, id: &PrimaryAssetId) -> bool {
        let Some(id) = self.resolve(id) else {
            log::debug!("AssetManager: cannot remove unknown primary asset '{id}'");
            return false;
        };
        self.streaming.unload(&mut self.store, std::slice::from_ref(&id));
        self.store.remove_record(&id).is_some()
    }

    /// Refreshes the record backed by `descriptor` after its content changed.
    ///
    /// A descriptor that now derives a different identifier replaces the record
    /// previously registered for its path.
    pub fn on_asset_updated(&mut self, descriptor: &AssetDescriptor) -> bool {
        let id = self.store.derive_identifier(descriptor);
        if let Some(previous) = self.store.id_for_path(&descriptor.path).cloned() {
            if previous != id {
                log::info!(
                    "AssetManager: '{}' changed identifier from '{previous}' to '{id}'",
                    descriptor.path
                );
                self.remove_primary_asset(&previous);
            }
        }
        self.refresh(id, descriptor, false)
    }

    /// Moves the record of the asset previously stored at `old_path`.
    pub fn on_asset_renamed(&mut self, descriptor: &AssetDescriptor, old_path: &AssetPath) -> bool {
        let new_id = self.store.derive_identifier(descriptor);
        if let Some(old_id) = self.store.id_for_path(old_path).cloned() {
            if old_id != new_id {
                log::info!("AssetManager: '{old_id}' renamed to '{new_id}'");
                self.remove_primary_asset(&old_id);
            }
        }
        self.refresh(new_id, descriptor, true)
    }

    fn refresh(&mut self, id: PrimaryAssetId, descriptor: &AssetDescriptor, moved: bool) -> bool {
        if !id.is_valid() {
            log::trace!("AssetManager: '{}' is not a primary asset", descriptor.path);
            return false;
        }
        match self.store.type_info(&id.asset_type) {
            Some(info) if !info.is_dynamic() => {}
            _ => {
                log::debug!("AssetManager: '{id}' is not of a scanned type, ignoring update");
                return false;
            }
        }
        self.update_primary_asset(id, descriptor.clone(), moved)
    }

    // --- Queries ---

    /// Returns the registered types, ordered by name.
    pub fn get_primary_asset_type_info_list(&self) -> Vec<&TypeInfo> {
        self.store.types().list().collect()
    }

    /// Returns the entry of `asset_type`, following type redirects.
    pub fn get_primary_asset_type_info(&self, asset_type: &PrimaryAssetType) -> Option<&TypeInfo> {
        self.store.type_info(&self.resolve_type(asset_type))
    }

    /// Returns the sorted identifiers of `asset_type`.
    pub fn get_primary_asset_id_list(&self, asset_type: &PrimaryAssetType) -> Vec<PrimaryAssetId> {
        self.store.id_list(&self.resolve_type(asset_type))
    }

    /// Returns the scan metadata of `id`.
    ///
    /// Dynamic records have none of their own; the scan service is asked for
    /// the descriptor at their path instead.
    pub fn get_primary_asset_data(&self, id: &PrimaryAssetId) -> Option<AssetDescriptor> {
        let record = self.record(id)?;
        record
            .descriptor
            .clone()
            .or_else(|| self.scan.descriptor_for_path(&record.path))
    }

    /// Returns the scan metadata of every record of `asset_type`.
    pub fn get_primary_asset_data_list(
        &self,
        asset_type: &PrimaryAssetType,
    ) -> Vec<AssetDescriptor> {
        self.get_primary_asset_id_list(asset_type)
            .iter()
            .filter_map(|id| self.get_primary_asset_data(id))
            .collect()
    }

    /// Returns the storage path of `id`, or an invalid path.
    pub fn get_primary_asset_path(&self, id: &PrimaryAssetId) -> AssetPath {
        self.record(id)
            .map(|record| record.path.clone())
            .unwrap_or_default()
    }

    /// Returns the storage paths of every record of `asset_type`.
    pub fn get_primary_asset_path_list(&self, asset_type: &PrimaryAssetType) -> Vec<AssetPath> {
        self.get_primary_asset_id_list(asset_type)
            .iter()
            .map(|id| self.get_primary_asset_path(id))
            .filter(AssetPath::is_valid)
            .collect()
    }

    /// Returns the identifier whose primary object lives at `path`, following
    /// path redirects, or the invalid sentinel.
    pub fn get_primary_asset_id_for_path(&self, path: &AssetPath) -> PrimaryAssetId {
        if let Some(id) = self.store.id_for_path(path) {
            return id.clone();
        }
        let redirected = self.redirects.resolve_path(path);
        if redirected.is_valid() {
            if let Some(id) = self.store.id_for_path(&redirected) {
                return id.clone();
            }
        }
        PrimaryAssetId::invalid()
    }

    /// Returns the loaded primary object of `id`, if it is in memory.
    pub fn get_primary_asset_object(&self, id: &PrimaryAssetId) -> Option<LoadedAsset> {
        let record = self.record(id)?;
        [&record.current, &record.pending]
            .into_iter()
            .filter_map(|state| state.handle.as_ref())
            .find_map(|handle| handle.loaded_asset(&record.path))
            .or_else(|| self.engine.find_object(&record.path))
    }

    /// Returns the loaded primary object of `id` as a `T`.
    pub fn get_primary_asset_object_as<T: Asset>(
        &self,
        id: &PrimaryAssetId,
    ) -> Option<AssetHandle<T>> {
        self.get_primary_asset_object(id)?.downcast::<T>()
    }

    /// Returns every loaded primary object of `asset_type`.
    pub fn get_primary_asset_object_list(&self, asset_type: &PrimaryAssetType) -> Vec<LoadedAsset> {
        self.get_primary_asset_id_list(asset_type)
            .iter()
            .filter_map(|id| self.get_primary_asset_object(id))
            .collect()
    }

    /// Returns the bundle entries declared by `id`.
    pub fn get_asset_bundle_entries(&self, id: &PrimaryAssetId) -> Vec<AssetBundleEntry> {
        self.resolve(id)
            .and_then(|id| self.store.bundle_entries(&id).map(<[_]>::to_vec))
            .unwrap_or_default()
    }

    /// Returns the entry named `name` declared by `id`.
    pub fn get_asset_bundle_entry(
        &self,
        id: &PrimaryAssetId,
        name: &str,
    ) -> Option<AssetBundleEntry> {
        let id = self.resolve(id)?;
        self.store.bundle_entry(&id, name).cloned()
    }

    /// Returns the bundle set of `id`: the requested one, or the loaded one when
    /// `force_current` is set. `None` if nothing is loaded or requested.
    pub fn get_primary_asset_load_set(
        &self,
        id: &PrimaryAssetId,
        force_current: bool,
    ) -> Option<Vec<BundleName>> {
        let record = self.record(id)?;
        let state = if force_current {
            &record.current
        } else {
            record.effective_state()
        };
        state.is_valid().then(|| state.sorted_bundles())
    }

    /// Returns the sorted identifiers whose requested bundle set contains every
    /// name in `required` and none in `excluded`.
    ///
    /// An empty `types` matches every type.
    pub fn get_primary_assets_with_bundle_state(
        &self,
        required: &[&str],
        excluded: &[&str],
        types: &[PrimaryAssetType],
    ) -> Vec<PrimaryAssetId> {
        let required = bundle_set(required);
        let excluded = bundle_set(excluded);
        let mut ids: Vec<_> = self
            .store
            .records()
            .filter(|record| types.is_empty() || types.contains(&record.id.asset_type))
            .filter(|record| {
                let state = record.effective_state();
                state.is_valid()
                    && state.bundle_names.is_superset(&required)
                    && state.bundle_names.is_disjoint(&excluded)
            })
            .map(|record| record.id.clone())
            .collect();
        ids.sort();
        ids
    }

    /// Returns the handle loading `id`: pending unless `prefer_current` is set.
    pub fn get_primary_asset_handle(
        &self,
        id: &PrimaryAssetId,
        prefer_current: bool,
    ) -> Option<StreamableHandle> {
        let id = self.resolve(id)?;
        self.streaming.handle_for(&self.store, &id, prefer_current)
    }

    // --- Loading ---

    /// Applies `change` to every identifier in `ids`.
    pub fn change_bundle_state(
        &mut self,
        ids: &[PrimaryAssetId],
        change: &BundleChange,
        on_complete: Option<CompletionCallback>,
    ) -> Option<StreamableHandle> {
        let ids = self.resolve_all(ids);
        self.streaming.change_bundle_state(
            &mut self.store,
            self.engine.as_ref(),
            &ids,
            change,
            on_complete,
        )
    }

    /// Adds `add` and removes `remove` from the bundle sets of `ids`, or replaces
    /// them with `add` when `replace_all` is set.
    pub fn change_bundle_state_for_primary_assets(
        &mut self,
        ids: &[PrimaryAssetId],
        add: &[&str],
        remove: &[&str],
        replace_all: bool,
        on_complete: Option<CompletionCallback>,
    ) -> Option<StreamableHandle> {
        let change = BundleChange {
            add: bundle_set(add),
            remove: bundle_set(remove),
            replace_all,
            ..BundleChange::default()
        };
        self.change_bundle_state(ids, &change, on_complete)
    }

    /// Swaps `old` for `new` on every identifier whose requested set contains
    /// all of `old`.
    pub fn change_bundle_state_for_matching_primary_assets(
        &mut self,
        new: &[&str],
        old: &[&str],
        on_complete: Option<CompletionCallback>,
    ) -> Option<StreamableHandle> {
        let matching = self.get_primary_assets_with_bundle_state(old, &[], &[]);
        log::debug!(
            "AssetManager: swapping {old:?} for {new:?} on {} asset(s)",
            matching.len()
        );
        let change = BundleChange::modify(new.iter().copied(), old.iter().copied());
        self.change_bundle_state(&matching, &change, on_complete)
    }

    /// Loads `id` with exactly `bundles`.
    pub fn load_primary_asset(
        &mut self,
        id: &PrimaryAssetId,
        bundles: &[&str],
        on_complete: Option<CompletionCallback>,
    ) -> Option<StreamableHandle> {
        self.load_primary_assets(std::slice::from_ref(id), bundles, on_complete)
    }

    /// Loads every identifier in `ids` with exactly `bundles`.
    pub fn load_primary_assets(
        &mut self,
        ids: &[PrimaryAssetId],
        bundles: &[&str],
        on_complete: Option<CompletionCallback>,
    ) -> Option<StreamableHandle> {
        let change = BundleChange::replace(bundles.iter().copied());
        self.change_bundle_state(ids, &change, on_complete)
    }

    /// Loads every identifier of `asset_type` with exactly `bundles`.
    pub fn load_primary_assets_with_type(
        &mut self,
        asset_type: &PrimaryAssetType,
        bundles: &[&str],
        on_complete: Option<CompletionCallback>,
    ) -> Option<StreamableHandle> {
        let ids = self.get_primary_asset_id_list(asset_type);
        self.load_primary_assets(&ids, bundles, on_complete)
    }

    /// Loads the paths `ids` would load with `bundles` without changing their state.
    pub fn preload_primary_assets(
        &self,
        ids: &[PrimaryAssetId],
        bundles: &[&str],
        recursive: bool,
        on_complete: Option<CompletionCallback>,
    ) -> Option<StreamableHandle> {
        let ids = self.resolve_all(ids);
        self.streaming.preload(
            &self.store,
            self.engine.as_ref(),
            &ids,
            &bundle_set(bundles),
            recursive,
            on_complete,
        )
    }

    /// Unloads `id`. Returns `1` if it had a valid state.
    pub fn unload_primary_asset(&mut self, id: &PrimaryAssetId) -> usize {
        self.unload_primary_assets(std::slice::from_ref(id))
    }

    /// Unloads every identifier in `ids`. Returns how many had a valid state.
    pub fn unload_primary_assets(&mut self, ids: &[PrimaryAssetId]) -> usize {
        let ids = self.resolve_all(ids);
        self.streaming.unload(&mut self.store, &ids)
    }

    /// Unloads every identifier of `asset_type`.
    pub fn unload_primary_assets_with_type(&mut self, asset_type: &PrimaryAssetType) -> usize {
        let ids = self.get_primary_asset_id_list(asset_type);
        self.unload_primary_assets(&ids)
    }

    /// Promotes every pending state whose load has completed.
    pub fn process_completions(&mut self) -> usize {
        self.streaming.process_completions(&mut self.store)
    }

    // --- Simulate mode ---

    /// Captures the bundle state of every loaded identifier before a simulation.
    pub fn begin_simulate(&mut self) -> bool {
        if self.simulate_snapshot.is_some() {
            log::error!("AssetManager: already simulating, keeping the first snapshot");
            return false;
        }
        let snapshot = BundleStateSnapshot::capture(&self.store);
        log::info!(
            "AssetManager: captured bundle state of {} asset(s)",
            snapshot.len()
        );
        self.simulate_snapshot = Some(snapshot);
        true
    }

    /// Returns `true` between [`begin_simulate`](Self::begin_simulate) and
    /// [`end_simulate`](Self::end_simulate).
    pub fn is_simulating(&self) -> bool {
        self.simulate_snapshot.is_some()
    }

    /// Restores the bundle state captured by [`begin_simulate`](Self::begin_simulate).
    ///
    /// Every captured identifier gets exactly its captured bundle set back, and
    /// every other loaded identifier is unloaded.
    pub fn end_simulate(&mut self) -> bool {
        let Some(snapshot) = self.simulate_snapshot.take() else {
            log::error!("AssetManager: end_simulate called outside a simulation");
            return false;
        };

        for (bundles, ids) in snapshot.by_bundle_set() {
            let change = BundleChange {
                add: bundles,
                replace_all: true,
                ..BundleChange::default()
            };
            self.change_bundle_state(&ids, &change, None);
        }

        let loaded_since: Vec<PrimaryAssetId> = self
            .store
            .records()
            .filter(|record| record.has_valid_state() && !snapshot.contains(&record.id))
            .map(|record| record.id.clone())
            .collect();
        let unloaded = self.unload_primary_assets(&loaded_since);

        log::info!(
            "AssetManager: restored bundle state of {} asset(s), unloaded {unloaded}",
            snapshot.len()
        );
        true
    }
}
