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

use primus_core::asset::{Asset, AssetPath, LoadedAsset};
use primus_core::streaming::{LoadRequest, StreamableHandle, StreamingEngine};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// The object a [`ManualStreamingEngine`] produces for paths without a preset object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderAsset {
    /// The path the object was "loaded" from.
    pub path: AssetPath,
}

impl Asset for PlaceholderAsset {}

#[derive(Debug, Default)]
struct ManualState {
    requests: Vec<LoadRequest>,
    in_flight: Vec<StreamableHandle>,
    objects: HashMap<AssetPath, LoadedAsset>,
    resident: HashMap<AssetPath, LoadedAsset>,
}

/// A streaming engine whose loads complete only when told to.
///
/// Synchronous requests complete immediately. Asynchronous ones stay in flight
/// until [`complete`](Self::complete) or [`complete_all`](Self::complete_all)
/// is called, which makes load ordering and stale completions reproducible.
/// Every requested path resolves to its preset object if one was given with
/// [`set_object`](Self::set_object), and to a [`PlaceholderAsset`] otherwise.
#[derive(Debug, Default)]
pub struct ManualStreamingEngine {
    state: Mutex<ManualState>,
}

impl ManualStreamingEngine {
    /// Creates an engine with nothing in flight.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ManualState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sets the object loads of `path` produce.
    pub fn set_object(&self, path: impl Into<AssetPath>, object: LoadedAsset) {
        self.lock().objects.insert(path.into(), object);
    }

    /// Returns the number of requests received so far.
    pub fn request_count(&self) -> usize {
        self.lock().requests.len()
    }

    /// Returns every request received so far, oldest first.
    pub fn requests(&self) -> Vec<LoadRequest> {
        self.lock().requests.clone()
    }

    /// Returns the most recent request.
    pub fn last_request(&self) -> Option<LoadRequest> {
        self.lock().requests.last().cloned()
    }

    /// Returns the handles still loading, oldest first.
    pub fn in_flight(&self) -> Vec<StreamableHandle> {
        let mut state = self.lock();
        state.in_flight.retain(StreamableHandle::is_loading);
        state.in_flight.clone()
    }

    /// Completes `handle`. Returns `false` if it was not loading.
    pub fn complete(&self, handle: &StreamableHandle) -> bool {
        let loaded = {
            let mut state = self.lock();
            state.in_flight.retain(|h| h != handle);
            if !handle.is_loading() {
                return false;
            }
            let loaded = Self::produce(&state.objects, handle.requested_paths());
            state.resident.extend(loaded.clone());
            loaded
        };
        log::trace!("ManualStreamingEngine: completing {}", handle.debug_name());
        handle.complete(loaded)
    }

    /// Completes every in-flight handle, highest priority first.
    pub fn complete_all(&self) -> usize {
        let mut handles = self.in_flight();
        handles.sort_by_key(|handle| std::cmp::Reverse(handle.priority()));
        handles
            .iter()
            .filter(|handle| self.complete(handle))
            .count()
    }

    /// Drops every resident object.
    pub fn evict_all(&self) {
        self.lock().resident.clear();
    }

    fn produce(
        objects: &HashMap<AssetPath, LoadedAsset>,
        paths: &[AssetPath],
    ) -> HashMap<AssetPath, LoadedAsset> {
        paths
            .iter()
            .map(|path| {
                let object = objects.get(path).cloned().unwrap_or_else(|| {
                    LoadedAsset::new(PlaceholderAsset { path: path.clone() })
                });
                (path.clone(), object)
            })
            .collect()
    }
}

impl StreamingEngine for ManualStreamingEngine {
    fn request_load(&self, request: LoadRequest) -> StreamableHandle {
        let handle = StreamableHandle::new(
            request.debug_name.clone(),
            request.paths.clone(),
            request.priority,
        );
        log::debug!(
            "ManualStreamingEngine: {} requests {} path(s), priority {}",
            request.debug_name,
            request.paths.len(),
            request.priority.0
        );

        let synchronous = request.synchronous;
        {
            let mut state = self.lock();
            state.requests.push(request);
            state.in_flight.push(handle.clone());
        }
        if synchronous {
            self.complete(&handle);
        }
        handle
    }

    fn find_object(&self, path: &AssetPath) -> Option<LoadedAsset> {
        self.lock().resident.get(path).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use primus_core::streaming::LoadPriority;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn request(path: &str) -> LoadRequest {
        LoadRequest::new(vec![AssetPath::new(path)], "Test")
    }

    #[test]
    fn async_requests_wait_for_completion() {
        let engine = ManualStreamingEngine::new();
        let handle = engine.request_load(request("/Game/A.A"));

        assert!(handle.is_loading());
        assert_eq!(engine.in_flight().len(), 1);
        assert!(engine.complete(&handle));
        assert!(handle.has_load_completed());
        assert!(!engine.complete(&handle));
    }

    #[test]
    fn synchronous_requests_complete_immediately() {
        let engine = ManualStreamingEngine::new();
        let handle = engine.request_load(request("/Game/A.A").synchronous(true));
        assert!(handle.has_load_completed());
        assert!(engine.in_flight().is_empty());
    }

    #[test]
    fn placeholder_and_preset_objects() {
        #[derive(Debug)]
        struct Map;
        impl Asset for Map {}

        let engine = ManualStreamingEngine::new();
        engine.set_object("/Game/B.B", LoadedAsset::new(Map));
        let handle = engine.request_load(LoadRequest::new(
            vec![AssetPath::new("/Game/A.A"), AssetPath::new("/Game/B.B")],
            "Test",
        ));
        engine.complete(&handle);

        let a = handle.loaded_asset(&AssetPath::new("/Game/A.A")).unwrap();
        assert_eq!(
            a.downcast::<PlaceholderAsset>().unwrap().path,
            AssetPath::new("/Game/A.A")
        );
        assert!(handle
            .loaded_asset(&AssetPath::new("/Game/B.B"))
            .unwrap()
            .is::<Map>());
        assert!(engine.find_object(&AssetPath::new("/Game/B.B")).is_some());
    }

    #[test]
    fn complete_all_serves_high_priority_first() {
        let engine = ManualStreamingEngine::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        let low = engine.request_load(request("/Game/Low.Low"));
        let high =
            engine.request_load(request("/Game/High.High").with_priority(LoadPriority::HIGH));
        for (label, handle) in [("low", &low), ("high", &high)] {
            let order = Arc::clone(&order);
            handle.bind_completion(move || order.lock().unwrap().push(label));
        }

        assert_eq!(engine.complete_all(), 2);
        assert_eq!(*order.lock().unwrap(), vec!["high", "low"]);
    }

    #[test]
    fn canceled_handles_are_not_completed() {
        let engine = ManualStreamingEngine::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let handle = engine.request_load(request("/Game/A.A"));
        {
            let calls = Arc::clone(&calls);
            handle.bind_completion(move || {
                calls.fetch_add(1, Ordering::SeqCst);
            });
        }

        handle.cancel();
        assert_eq!(engine.complete_all(), 0);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(engine.request_count(), 1);
    }
}
