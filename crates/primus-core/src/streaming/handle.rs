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

use super::LoadPriority;
use crate::asset::{AssetPath, LoadedAsset};
use std::{
    collections::HashMap,
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, PoisonError, Weak,
    },
};

/// A callback run once when a handle completes.
pub type CompletionCallback = Box<dyn FnOnce() + Send + 'static>;

static NEXT_HANDLE_ID: AtomicU64 = AtomicU64::new(1);

/// A process-unique identifier of a [`StreamableHandle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HandleId(u64);

impl HandleId {
    fn next() -> Self {
        Self(NEXT_HANDLE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw value.
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The lifecycle of a [`StreamableHandle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandleStatus {
    /// The load is in flight.
    Loading,
    /// Every requested path has been loaded; the handle keeps the data resident.
    Completed,
    /// The load was canceled before completing; callbacks never run.
    Canceled,
    /// The load completed and its data was released.
    Released,
}

struct HandleState {
    status: HandleStatus,
    callbacks: Vec<CompletionCallback>,
    loaded: HashMap<AssetPath, LoadedAsset>,
    outstanding_children: usize,
    parents: Vec<Weak<HandleInner>>,
}

struct HandleInner {
    id: HandleId,
    debug_name: String,
    requested: Vec<AssetPath>,
    priority: LoadPriority,
    children: Vec<StreamableHandle>,
    state: Mutex<HandleState>,
}

impl HandleInner {
    fn lock(&self) -> MutexGuard<'_, HandleState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn child_settled(&self) {
        let (callbacks, parents) = {
            let mut state = self.lock();
            if state.status != HandleStatus::Loading {
                return;
            }
            state.outstanding_children = state.outstanding_children.saturating_sub(1);
            if state.outstanding_children > 0 {
                return;
            }
            state.status = HandleStatus::Completed;
            (
                std::mem::take(&mut state.callbacks),
                std::mem::take(&mut state.parents),
            )
        };
        log::trace!("StreamableHandle {}: combined load completed", self.id);
        settle(callbacks, parents);
    }
}

fn settle(callbacks: Vec<CompletionCallback>, parents: Vec<Weak<HandleInner>>) {
    for callback in callbacks {
        callback();
    }
    for parent in parents.iter().filter_map(Weak::upgrade) {
        parent.child_settled();
    }
}

/// A shared reference to one load operation, or to a combination of several.
///
/// The streaming engine completes a handle with [`complete`](Self::complete).
/// Callbacks bound with [`bind_completion`](Self::bind_completion) run exactly
/// once on completion, or immediately if the handle has already completed.
/// [`cancel`](Self::cancel) stops an in-flight load (callbacks never run) or
/// releases the data of a completed one. Clones share the same operation.
#[derive(Clone)]
pub struct StreamableHandle {
    inner: Arc<HandleInner>,
}

impl StreamableHandle {
    /// Creates a handle for an in-flight load of `requested`.
    pub fn new(
        debug_name: impl Into<String>,
        requested: Vec<AssetPath>,
        priority: LoadPriority,
    ) -> Self {
        Self::build(
            debug_name.into(),
            requested,
            priority,
            Vec::new(),
            HandleStatus::Loading,
            0,
        )
    }

    fn build(
        debug_name: String,
        requested: Vec<AssetPath>,
        priority: LoadPriority,
        children: Vec<StreamableHandle>,
        status: HandleStatus,
        outstanding_children: usize,
    ) -> Self {
        Self {
            inner: Arc::new(HandleInner {
                id: HandleId::next(),
                debug_name,
                requested,
                priority,
                children,
                state: Mutex::new(HandleState {
                    status,
                    callbacks: Vec::new(),
                    loaded: HashMap::new(),
                    outstanding_children,
                    parents: Vec::new(),
                }),
            }),
        }
    }

    /// Creates a handle that completes once every child has completed or been canceled.
    ///
    /// Canceling the combined handle cancels every child.
    pub fn combine(debug_name: &str, children: Vec<StreamableHandle>) -> Self {
        let requested = children
            .iter()
            .flat_map(|child| child.requested_paths().iter().cloned())
            .collect();
        let priority = children
            .iter()
            .map(StreamableHandle::priority)
            .max()
            .unwrap_or_default();

        // One extra count keeps the handle loading until every child is linked.
        let guard = children.len() + 1;
        let combined = Self::build(
            debug_name.to_string(),
            requested,
            priority,
            children,
            HandleStatus::Loading,
            guard,
        );

        for child in &combined.inner.children {
            let linked = {
                let mut state = child.inner.lock();
                if state.status == HandleStatus::Loading {
                    state.parents.push(Arc::downgrade(&combined.inner));
                    true
                } else {
                    false
                }
            };
            if !linked {
                combined.inner.child_settled();
            }
        }
        combined.inner.child_settled();

        combined
    }

    /// Returns the process-unique identifier.
    pub fn id(&self) -> HandleId {
        self.inner.id
    }

    /// Returns the label given at creation.
    pub fn debug_name(&self) -> &str {
        &self.inner.debug_name
    }

    /// Returns the requested paths, including those of children.
    pub fn requested_paths(&self) -> &[AssetPath] {
        &self.inner.requested
    }

    /// Returns the request priority.
    pub fn priority(&self) -> LoadPriority {
        self.inner.priority
    }

    /// Returns the children of a combined handle.
    pub fn children(&self) -> &[StreamableHandle] {
        &self.inner.children
    }

    /// Returns the current status.
    pub fn status(&self) -> HandleStatus {
        self.inner.lock().status
    }

    /// Returns `true` once the load has completed and was not released.
    pub fn has_load_completed(&self) -> bool {
        self.status() == HandleStatus::Completed
    }

    /// Returns `true` while the load is in flight.
    pub fn is_loading(&self) -> bool {
        self.status() == HandleStatus::Loading
    }

    /// Returns `true` if the load was canceled before completing.
    pub fn was_canceled(&self) -> bool {
        self.status() == HandleStatus::Canceled
    }

    /// Returns `true` while the load is in flight or holds completed data.
    pub fn is_active(&self) -> bool {
        matches!(
            self.status(),
            HandleStatus::Loading | HandleStatus::Completed
        )
    }

    /// Registers `callback` to run on completion.
    ///
    /// Runs `callback` immediately if the handle has already completed. Returns
    /// `false`, dropping the callback, if the handle was canceled or released.
    pub fn bind_completion(&self, callback: impl FnOnce() + Send + 'static) -> bool {
        let mut state = self.inner.lock();
        match state.status {
            HandleStatus::Loading => {
                state.callbacks.push(Box::new(callback));
                true
            }
            HandleStatus::Completed => {
                drop(state);
                callback();
                true
            }
            HandleStatus::Canceled | HandleStatus::Released => false,
        }
    }

    /// Marks the load as completed with `loaded` data and runs the callbacks.
    ///
    /// Called by the streaming engine on the owner thread. Returns `false` if the
    /// handle was not loading.
    pub fn complete(&self, loaded: HashMap<AssetPath, LoadedAsset>) -> bool {
        let (callbacks, parents) = {
            let mut state = self.inner.lock();
            if state.status != HandleStatus::Loading {
                return false;
            }
            state.status = HandleStatus::Completed;
            state.loaded = loaded;
            (
                std::mem::take(&mut state.callbacks),
                std::mem::take(&mut state.parents),
            )
        };
        log::trace!(
            "StreamableHandle {} '{}': load completed",
            self.inner.id,
            self.inner.debug_name
        );
        settle(callbacks, parents);
        true
    }

    /// Cancels an in-flight load or releases completed data, including children.
    pub fn cancel(&self) {
        let parents = {
            let mut state = self.inner.lock();
            state.status = match state.status {
                HandleStatus::Loading => HandleStatus::Canceled,
                HandleStatus::Completed => HandleStatus::Released,
                HandleStatus::Canceled | HandleStatus::Released => return,
            };
            state.loaded.clear();
            state.callbacks.clear();
            std::mem::take(&mut state.parents)
        };

        for child in &self.inner.children {
            child.cancel();
        }
        for parent in parents.iter().filter_map(Weak::upgrade) {
            parent.child_settled();
        }
    }

    /// Returns the loaded data for `path`, searching children too.
    pub fn loaded_asset(&self, path: &AssetPath) -> Option<LoadedAsset> {
        if let Some(asset) = self.inner.lock().loaded.get(path) {
            return Some(asset.clone());
        }
        self.inner
            .children
            .iter()
            .find_map(|child| child.loaded_asset(path))
    }

    /// Returns every loaded object held by this handle and its children.
    pub fn loaded_assets(&self) -> Vec<(AssetPath, LoadedAsset)> {
        let mut assets: Vec<_> = self
            .inner
            .lock()
            .loaded
            .iter()
            .map(|(path, asset)| (path.clone(), asset.clone()))
            .collect();
        for child in &self.inner.children {
            assets.extend(child.loaded_assets());
        }
        assets
    }
}

impl PartialEq for StreamableHandle {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for StreamableHandle {}

impl fmt::Debug for StreamableHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamableHandle")
            .field("id", &self.inner.id)
            .field("debug_name", &self.inner.debug_name)
            .field("status", &self.status())
            .field("requested", &self.inner.requested.len())
            .field("children", &self.inner.children.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::Asset;
    use std::sync::atomic::AtomicUsize;

    struct Blob;
    impl Asset for Blob {}

    fn handle(name: &str) -> StreamableHandle {
        StreamableHandle::new(
            name,
            vec![AssetPath::new(format!("/Game/{name}.{name}"))],
            LoadPriority::DEFAULT,
        )
    }

    fn counter() -> (Arc<AtomicUsize>, impl FnOnce() + Send + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let inner = count.clone();
        (count, move || {
            inner.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn completion_runs_bound_callbacks_once() {
        let h = handle("A");
        let (count, callback) = counter();
        assert!(h.bind_completion(callback));
        assert!(h.is_loading());

        assert!(h.complete(HashMap::new()));
        assert!(!h.complete(HashMap::new()));
        assert!(h.has_load_completed());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn binding_after_completion_runs_immediately() {
        let h = handle("A");
        h.complete(HashMap::new());
        let (count, callback) = counter();
        assert!(h.bind_completion(callback));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn canceled_handle_never_runs_callbacks() {
        let h = handle("A");
        let (count, callback) = counter();
        h.bind_completion(callback);
        h.cancel();

        assert!(h.was_canceled());
        assert!(!h.is_active());
        assert!(!h.complete(HashMap::new()));
        let (late, late_callback) = counter();
        assert!(!h.bind_completion(late_callback));
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(late.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn cancel_after_completion_releases_data() {
        let h = handle("A");
        let path = AssetPath::new("/Game/A.A");
        h.complete([(path.clone(), LoadedAsset::new(Blob))].into());
        assert!(h.loaded_asset(&path).is_some());

        h.cancel();
        assert_eq!(h.status(), HandleStatus::Released);
        assert!(h.loaded_asset(&path).is_none());
    }

    #[test]
    fn combined_handle_waits_for_every_child() {
        let a = handle("A");
        let b = handle("B");
        let combined = StreamableHandle::combine("AB", vec![a.clone(), b.clone()]);
        let (count, callback) = counter();
        combined.bind_completion(callback);

        assert_eq!(combined.requested_paths().len(), 2);
        a.complete(HashMap::new());
        assert!(combined.is_loading());
        b.complete(HashMap::new());
        assert!(combined.has_load_completed());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn combining_completed_children_completes_immediately() {
        let a = handle("A");
        a.complete(HashMap::new());
        let combined = StreamableHandle::combine("A", vec![a]);
        assert!(combined.has_load_completed());
    }

    #[test]
    fn canceling_combined_handle_cancels_children() {
        let a = handle("A");
        let b = handle("B");
        let combined = StreamableHandle::combine("AB", vec![a.clone(), b.clone()]);
        combined.cancel();
        assert!(a.was_canceled());
        assert!(b.was_canceled());
        assert!(combined.was_canceled());
    }

    #[test]
    fn canceled_child_settles_its_parent() {
        let a = handle("A");
        let b = handle("B");
        let combined = StreamableHandle::combine("AB", vec![a.clone(), b.clone()]);
        a.cancel();
        b.complete(HashMap::new());
        assert!(combined.has_load_completed());
    }

    #[test]
    fn nested_combinations_propagate() {
        let a = handle("A");
        let inner = StreamableHandle::combine("inner", vec![a.clone()]);
        let outer = StreamableHandle::combine("outer", vec![inner.clone()]);
        a.complete(HashMap::new());
        assert!(inner.has_load_completed());
        assert!(outer.has_load_completed());
    }

    #[test]
    fn loaded_assets_are_found_through_children() {
        let a = handle("A");
        let path = AssetPath::new("/Game/A.A");
        let combined = StreamableHandle::combine("A", vec![a.clone()]);
        a.complete([(path.clone(), LoadedAsset::new(Blob))].into());
        assert!(combined.loaded_asset(&path).is_some());
        assert_eq!(combined.loaded_assets().len(), 1);
    }
}
