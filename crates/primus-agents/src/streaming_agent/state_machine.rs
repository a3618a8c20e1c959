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

use crossbeam_channel::{Receiver, Sender};
use primus_core::asset::{AssetBundleData, AssetPath, BundleName, PrimaryAssetId};
use primus_core::event::{AssetManagerEvent, EventBus};
use primus_core::settings::AssetManagerSettings;
use primus_core::streaming::{
    CompletionCallback, HandleId, LoadPriority, LoadRequest, StreamableHandle, StreamingEngine,
};
use primus_data::{AssetRecord, AssetRecordStore, LoadState};
use std::collections::BTreeSet;

/// A requested change of the bundle state of a set of identifiers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BundleChange {
    /// Bundles to add.
    pub add: BTreeSet<BundleName>,
    /// Bundles to remove; ignored when `replace_all` is set.
    pub remove: BTreeSet<BundleName>,
    /// Replace the whole bundle set with `add`.
    pub replace_all: bool,
    /// Block until the load has finished.
    pub synchronous: bool,
    /// Overrides the type and manager default priorities.
    pub priority: Option<LoadPriority>,
}

impl BundleChange {
    /// Sets the bundle set to exactly `bundles`.
    pub fn replace<I, S>(bundles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<BundleName>,
    {
        Self {
            add: bundles.into_iter().map(Into::into).collect(),
            replace_all: true,
            ..Self::default()
        }
    }

    /// Adds `add` and removes `remove` from the current bundle set.
    pub fn modify<A, R, S, T>(add: A, remove: R) -> Self
    where
        A: IntoIterator<Item = S>,
        R: IntoIterator<Item = T>,
        S: Into<BundleName>,
        T: Into<BundleName>,
    {
        Self {
            add: add.into_iter().map(Into::into).collect(),
            remove: remove.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Sets whether the load blocks.
    pub fn synchronous(mut self, synchronous: bool) -> Self {
        self.synchronous = synchronous;
        self
    }

    /// Sets the load priority.
    pub fn with_priority(mut self, priority: LoadPriority) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Returns the bundle set an identifier currently holding `effective` ends up with.
    pub fn apply_to(&self, effective: &BTreeSet<BundleName>) -> BTreeSet<BundleName> {
        if self.replace_all {
            return self.add.clone();
        }
        effective
            .difference(&self.remove)
            .chain(self.add.iter())
            .cloned()
            .collect()
    }
}

/// The completion of a pending load, sent to the owner thread.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Completion {
    id: PrimaryAssetId,
    handle: HandleId,
}

/// Drives the current/pending load states of every asset record.
///
/// All state lives in the [`AssetRecordStore`] passed to each call; the machine
/// itself only holds the completion channel and the load configuration.
#[derive(Debug)]
pub struct StreamingStateMachine {
    completion_sender: Sender<Completion>,
    completion_receiver: Receiver<Completion>,
    force_synchronous: bool,
    expand_recursively: bool,
    default_priority: LoadPriority,
    events: Option<EventBus<AssetManagerEvent>>,
}

impl Default for StreamingStateMachine {
    fn default() -> Self {
        Self::new(&AssetManagerSettings::default())
    }
}

impl StreamingStateMachine {
    /// Creates a state machine configured by `settings`.
    pub fn new(settings: &AssetManagerSettings) -> Self {
        let (completion_sender, completion_receiver) = crossbeam_channel::unbounded();
        Self {
            completion_sender,
            completion_receiver,
            force_synchronous: settings.force_synchronous_loads,
            expand_recursively: settings.expand_bundles_recursively,
            default_priority: settings.default_load_priority(),
            events: None,
        }
    }

    /// Publishes committed bundle states and unloads on `events`.
    pub fn with_events(mut self, events: EventBus<AssetManagerEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Changes the bundle state of every identifier in `ids`.
    ///
    /// Unknown identifiers are skipped. Returns the handle tracking every load
    /// involved, combined if there is more than one, and runs `on_complete` once
    /// that handle completes. With no handle at all, `on_complete` runs before
    /// returning and `None` is returned.
    pub fn change_bundle_state(
        &mut self,
        store: &mut AssetRecordStore,
        engine: &dyn StreamingEngine,
        ids: &[PrimaryAssetId],
        change: &BundleChange,
        on_complete: Option<CompletionCallback>,
    ) -> Option<StreamableHandle> {
        let mut handles = Vec::new();
        for id in ids {
            if let Some(handle) = self.change_one(store, engine, id, change) {
                handles.push(handle);
            }
        }

        let debug_name = debug_name("ChangeBundleStateForPrimaryAssets", ids);
        finish(engine, &debug_name, handles, on_complete)
    }

    fn change_one(
        &mut self,
        store: &mut AssetRecordStore,
        engine: &dyn StreamingEngine,
        id: &PrimaryAssetId,
        change: &BundleChange,
    ) -> Option<StreamableHandle> {
        let Some(record) = store.record_mut(id) else {
            log::warn!("StreamingStateMachine: unknown primary asset '{id}', skipping");
            return None;
        };

        let effective = record.effective_state();
        let current_set = if effective.is_valid() {
            effective.bundle_names.clone()
        } else {
            BTreeSet::new()
        };
        let new_set = change.apply_to(&current_set);

        if record.pending.is_valid() {
            if record.pending.bundle_names == new_set {
                log::trace!("StreamingStateMachine: '{id}' already requested {new_set:?}");
                return record.pending.handle.clone();
            }
            log::trace!("StreamingStateMachine: superseding pending state of '{id}'");
            record.pending.reset(true);
        }
        if record.current.is_valid() && record.current.bundle_names == new_set {
            log::trace!("StreamingStateMachine: '{id}' already loaded with {new_set:?}");
            return record.current.handle.clone();
        }

        let paths = self.collect_paths(store, id, &new_set, false);
        let priority = self.priority_for(store, id, change.priority);
        let debug_name = format!("ChangeBundleStateForPrimaryAssets({id})");
        let request = LoadRequest::new(paths, debug_name)
            .synchronous(change.synchronous || self.force_synchronous)
            .with_priority(priority);
        let handle = engine.request_load(request);

        let record = store.record_mut(id)?;
        if handle.has_load_completed() {
            commit(record, LoadState::new(new_set, handle.clone()));
            self.publish_state(record);
        } else if handle.is_loading() {
            record.pending = LoadState::new(new_set, handle.clone());
            let sender = self.completion_sender.clone();
            let completion = Completion {
                id: id.clone(),
                handle: handle.id(),
            };
            handle.bind_completion(move || {
                if sender.send(completion).is_err() {
                    log::debug!("StreamingStateMachine: state machine dropped, completion lost");
                }
            });
        } else {
            log::warn!(
                "StreamingStateMachine: load for '{id}' was canceled before it started"
            );
            return None;
        }

        Some(handle)
    }

    /// Promotes the pending state of every identifier whose load has completed.
    ///
    /// Completions of handles that are no longer the pending handle of their
    /// identifier are ignored. Returns the number of promoted states.
    pub fn process_completions(&mut self, store: &mut AssetRecordStore) -> usize {
        let mut promoted = 0;
        while let Ok(Completion { id, handle }) = self.completion_receiver.try_recv() {
            let Some(record) = store.record_mut(&id) else {
                log::debug!("StreamingStateMachine: completion for removed asset '{id}'");
                continue;
            };
            if !record.pending.holds(handle) {
                log::trace!("StreamingStateMachine: ignoring stale completion {handle} for '{id}'");
                continue;
            }

            let pending = std::mem::take(&mut record.pending);
            commit(record, pending);
            self.publish_state(record);
            promoted += 1;
        }
        promoted
    }

    /// Loads the paths `ids` would load with `bundles` without touching their states.
    ///
    /// The caller owns the returned handle; dropping it lets the data go.
    pub fn preload(
        &self,
        store: &AssetRecordStore,
        engine: &dyn StreamingEngine,
        ids: &[PrimaryAssetId],
        bundles: &BTreeSet<BundleName>,
        recursive: bool,
        on_complete: Option<CompletionCallback>,
    ) -> Option<StreamableHandle> {
        let mut paths = BTreeSet::new();
        let mut priority = None;
        for id in ids {
            if store.record(id).is_none() {
                log::warn!("StreamingStateMachine: unknown primary asset '{id}', not preloading");
                continue;
            }
            paths.extend(self.collect_paths(store, id, bundles, recursive));
            priority = priority.max(Some(self.priority_for(store, id, None)));
        }

        let Some(priority) = priority else {
            return finish(engine, "PreloadPrimaryAssets", Vec::new(), on_complete);
        };

        let request = LoadRequest::new(
            paths.into_iter().collect(),
            debug_name("PreloadPrimaryAssets", ids),
        )
        .synchronous(self.force_synchronous)
        .with_priority(priority);
        let handle = engine.request_load(request);
        finish(engine, "PreloadPrimaryAssets", vec![handle], on_complete)
    }

    /// Cancels and clears both states of every identifier in `ids`.
    ///
    /// Returns the number of identifiers that had a valid state.
    pub fn unload(&mut self, store: &mut AssetRecordStore, ids: &[PrimaryAssetId]) -> usize {
        let mut unloaded = 0;
        for id in ids {
            let Some(record) = store.record_mut(id) else {
                log::debug!("StreamingStateMachine: unknown primary asset '{id}', not unloading");
                continue;
            };
            let had_state = record.has_valid_state();
            record.current.reset(true);
            record.pending.reset(true);
            if had_state {
                unloaded += 1;
                self.publish(AssetManagerEvent::Unloaded { id: id.clone() });
            }
        }
        unloaded
    }

    /// Returns the handle of `id`: pending if valid and `prefer_current` is unset,
    /// else current if valid.
    pub fn handle_for(
        &self,
        store: &AssetRecordStore,
        id: &PrimaryAssetId,
        prefer_current: bool,
    ) -> Option<StreamableHandle> {
        let record = store.record(id)?;
        if !prefer_current && record.pending.is_valid() {
            return record.pending.handle.clone();
        }
        if record.current.is_valid() {
            return record.current.handle.clone();
        }
        None
    }

    /// Returns the primary path of `id` plus every path of its `bundles`.
    ///
    /// Bundles are expanded through referenced primary assets when `recursive`
    /// is set, the manager expands everything, or the type's rules ask for it.
    pub fn collect_paths(
        &self,
        store: &AssetRecordStore,
        id: &PrimaryAssetId,
        bundles: &BTreeSet<BundleName>,
        recursive: bool,
    ) -> Vec<AssetPath> {
        let Some(record) = store.record(id) else {
            return Vec::new();
        };

        let mut data = AssetBundleData {
            bundles: store
                .bundle_entries(id)
                .unwrap_or_default()
                .iter()
                .filter(|entry| bundles.contains(&entry.name))
                .cloned()
                .collect(),
        };

        let type_recursive = store
            .type_info(&id.asset_type)
            .is_some_and(|info| info.rules().apply_recursively);
        if recursive || self.expand_recursively || type_recursive {
            store.bundles().expand_recursively(&mut data);
        }

        let mut paths = data.all_paths();
        if record.path.is_valid() {
            paths.insert(record.path.clone());
        }
        paths.into_iter().collect()
    }

    fn priority_for(
        &self,
        store: &AssetRecordStore,
        id: &PrimaryAssetId,
        requested: Option<LoadPriority>,
    ) -> LoadPriority {
        requested
            .or_else(|| {
                store
                    .type_info(&id.asset_type)
                    .and_then(|info| info.rules().priority)
                    .map(LoadPriority)
            })
            .unwrap_or(self.default_priority)
    }

    fn publish_state(&self, record: &AssetRecord) {
        self.publish(AssetManagerEvent::BundleStateChanged {
            id: record.id.clone(),
            bundles: record.current.sorted_bundles(),
        });
    }

    fn publish(&self, event: AssetManagerEvent) {
        if let Some(events) = &self.events {
            events.publish(event);
        }
    }
}

/// Makes `state` the current state of `record`.
///
/// The replaced current handle is dropped, not canceled: callers that still
/// hold it keep its data resident.
fn commit(record: &mut AssetRecord, state: LoadState) {
    log::trace!(
        "StreamingStateMachine: '{}' now loaded with {:?}",
        record.id,
        state.bundle_names
    );
    record.current.reset(false);
    record.current = state;
    record.pending.reset(false);
}

fn finish(
    engine: &dyn StreamingEngine,
    debug_name: &str,
    mut handles: Vec<StreamableHandle>,
    on_complete: Option<CompletionCallback>,
) -> Option<StreamableHandle> {
    let handle = match handles.len() {
        0 => {
            if let Some(on_complete) = on_complete {
                on_complete();
            }
            return None;
        }
        1 => handles.pop()?,
        _ => engine.combine_handles(debug_name, handles),
    };

    if let Some(on_complete) = on_complete {
        if !handle.bind_completion(on_complete) {
            log::debug!("StreamingStateMachine: '{debug_name}' was canceled before completing");
        }
    }
    Some(handle)
}

fn debug_name(operation: &str, ids: &[PrimaryAssetId]) -> String {
    let ids: Vec<String> = ids.iter().map(ToString::to_string).collect();
    format!("{operation}({})", ids.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;
    use primus_core::asset::AssetDescriptor;
    use primus_core::settings::DuplicatePolicy;
    use primus_data::{strategy_for, TypeConstraint};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Records every request and leaves it loading.
    #[derive(Default)]
    struct RecordingEngine {
        requests: Mutex<Vec<StreamableHandle>>,
        complete_immediately: bool,
    }

    impl RecordingEngine {
        fn requests(&self) -> Vec<StreamableHandle> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl StreamingEngine for RecordingEngine {
        fn request_load(&self, request: LoadRequest) -> StreamableHandle {
            let handle =
                StreamableHandle::new(request.debug_name, request.paths, request.priority);
            if self.complete_immediately || request.synchronous {
                handle.complete(HashMap::new());
            }
            self.requests.lock().unwrap().push(handle.clone());
            handle
        }
    }

    fn id(name: &str) -> PrimaryAssetId {
        PrimaryAssetId::new("Hero", name)
    }

    fn store() -> AssetRecordStore {
        let mut store = AssetRecordStore::new(
            strategy_for(Default::default()),
            DuplicatePolicy::LastWriteWins,
        );
        store
            .register_type("Hero".into(), TypeConstraint::scanned("HeroData"))
            .unwrap();
        for name in ["Knight", "Rogue"] {
            let mut bundles = AssetBundleData::new();
            bundles.add_bundle_asset("UI", format!("/Game/UI/{name}Icon.{name}Icon").into());
            bundles.add_bundle_asset("Game", format!("/Game/Mesh/{name}.{name}").into());
            let descriptor = AssetDescriptor::new(
                format!("/Game/Heroes/{name}.{name}"),
                "HeroData",
            )
            .with_bundle_data(&bundles);
            store.update_record(id(name), descriptor, false).unwrap();
        }
        store
    }

    fn replace(
        machine: &mut StreamingStateMachine,
        store: &mut AssetRecordStore,
        engine: &RecordingEngine,
        name: &str,
        bundle: &str,
    ) -> Option<StreamableHandle> {
        machine.change_bundle_state(
            store,
            engine,
            &[id(name)],
            &BundleChange::replace([bundle]),
            None,
        )
    }

    fn effective(store: &AssetRecordStore, name: &str) -> Vec<BundleName> {
        store
            .record(&id(name))
            .unwrap()
            .effective_state()
            .sorted_bundles()
    }

    #[test]
    fn repeated_request_issues_one_load() {
        let mut store = store();
        let engine = RecordingEngine::default();
        let mut machine = StreamingStateMachine::default();
        let change = BundleChange::modify(["UI"], Vec::<String>::new());

        let ids = [id("Knight")];
        let first = machine.change_bundle_state(&mut store, &engine, &ids, &change, None);
        let second = machine.change_bundle_state(&mut store, &engine, &ids, &change, None);

        assert_eq!(engine.requests().len(), 1);
        assert_eq!(first, second);
    }

    #[test]
    fn load_requests_primary_and_bundle_paths() {
        let mut store = store();
        let engine = RecordingEngine::default();
        let mut machine = StreamingStateMachine::default();
        machine.change_bundle_state(
            &mut store,
            &engine,
            &[id("Knight")],
            &BundleChange::replace(["UI"]),
            None,
        );

        let requested = engine.requests()[0].requested_paths().to_vec();
        assert_eq!(
            requested,
            vec![
                AssetPath::new("/Game/Heroes/Knight.Knight"),
                AssetPath::new("/Game/UI/KnightIcon.KnightIcon"),
            ]
        );
    }

    #[test]
    fn stale_completion_is_ignored() {
        let mut store = store();
        let engine = RecordingEngine::default();
        let mut machine = StreamingStateMachine::default();

        let a = replace(&mut machine, &mut store, &engine, "Knight", "UI")
            .unwrap();
        let b = replace(&mut machine, &mut store, &engine, "Knight", "Game")
            .unwrap();

        assert!(a.was_canceled());
        a.complete(HashMap::new());
        assert_eq!(machine.process_completions(&mut store), 0);
        assert_eq!(effective(&store, "Knight"), vec!["Game"]);

        b.complete(HashMap::new());
        assert_eq!(machine.process_completions(&mut store), 1);
        let record = store.record(&id("Knight")).unwrap();
        assert!(!record.pending.is_valid());
        assert_eq!(record.current.sorted_bundles(), vec!["Game"]);
    }

    #[test]
    fn completed_load_commits_immediately() {
        let mut store = store();
        let engine = RecordingEngine {
            complete_immediately: true,
            ..Default::default()
        };
        let mut machine = StreamingStateMachine::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        machine.change_bundle_state(
            &mut store,
            &engine,
            &[id("Knight")],
            &BundleChange::replace(["UI"]),
            Some(Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })),
        );

        let record = store.record(&id("Knight")).unwrap();
        assert!(record.current.is_valid());
        assert!(!record.pending.is_valid());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn modify_diffs_against_pending_state() {
        let mut store = store();
        let engine = RecordingEngine::default();
        let mut machine = StreamingStateMachine::default();
        replace(&mut machine, &mut store, &engine, "Knight", "UI");
        machine.change_bundle_state(
            &mut store,
            &engine,
            &[id("Knight")],
            &BundleChange::modify(["Game"], Vec::<String>::new()),
            None,
        );
        assert_eq!(effective(&store, "Knight"), vec!["Game", "UI"]);

        machine.change_bundle_state(
            &mut store,
            &engine,
            &[id("Knight")],
            &BundleChange::modify(Vec::<String>::new(), ["UI"]),
            None,
        );
        assert_eq!(effective(&store, "Knight"), vec!["Game"]);
    }

    #[test]
    fn several_identifiers_share_a_combined_handle() {
        let mut store = store();
        let engine = RecordingEngine::default();
        let mut machine = StreamingStateMachine::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let combined = machine
            .change_bundle_state(
                &mut store,
                &engine,
                &[id("Knight"), id("Rogue")],
                &BundleChange::replace(["UI"]),
                Some(Box::new(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                })),
            )
            .unwrap();
        assert_eq!(combined.children().len(), 2);

        for handle in engine.requests() {
            handle.complete(HashMap::new());
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(machine.process_completions(&mut store), 2);
    }

    #[test]
    fn unknown_identifiers_complete_immediately() {
        let mut store = store();
        let engine = RecordingEngine::default();
        let mut machine = StreamingStateMachine::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let handle = machine.change_bundle_state(
            &mut store,
            &engine,
            &[id("Nobody")],
            &BundleChange::replace(["UI"]),
            Some(Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })),
        );
        assert!(handle.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(engine.requests().is_empty());
    }

    #[test]
    fn unload_cancels_both_states() {
        let mut store = store();
        let engine = RecordingEngine::default();
        let mut machine = StreamingStateMachine::default();
        let handle = replace(&mut machine, &mut store, &engine, "Knight", "UI")
            .unwrap();

        assert_eq!(machine.unload(&mut store, &[id("Knight"), id("Rogue")]), 1);
        assert!(handle.was_canceled());
        assert!(machine.handle_for(&store, &id("Knight"), false).is_none());
    }

    #[test]
    fn preload_leaves_states_untouched() {
        let store = store();
        let engine = RecordingEngine::default();
        let machine = StreamingStateMachine::default();
        let handle = machine
            .preload(
                &store,
                &engine,
                &[id("Knight"), id("Rogue")],
                &["Game".to_string()].into(),
                false,
                None,
            )
            .unwrap();

        assert_eq!(handle.requested_paths().len(), 4);
        assert!(!store.record(&id("Knight")).unwrap().has_valid_state());
    }

    #[test]
    fn handle_for_prefers_pending_unless_asked() {
        let mut store = store();
        let engine = RecordingEngine::default();
        let mut machine = StreamingStateMachine::default();
        let first = replace(&mut machine, &mut store, &engine, "Knight", "UI")
            .unwrap();
        first.complete(HashMap::new());
        machine.process_completions(&mut store);

        let second = replace(&mut machine, &mut store, &engine, "Knight", "Game")
            .unwrap();

        assert_eq!(machine.handle_for(&store, &id("Knight"), false), Some(second));
        assert_eq!(machine.handle_for(&store, &id("Knight"), true), Some(first));
    }
}
