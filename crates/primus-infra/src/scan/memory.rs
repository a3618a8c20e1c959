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

use crate::streaming::AssetSource;
use anyhow::{anyhow, Result};
use primus_core::asset::{AssetDescriptor, AssetPath};
use primus_core::scan::{ScanFilter, ScanService};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Condvar, Mutex, PoisonError, RwLock};

#[derive(Debug, Default)]
struct Entries {
    descriptors: BTreeMap<AssetPath, AssetDescriptor>,
    payloads: HashMap<AssetPath, Vec<u8>>,
}

/// An in-memory asset registry.
///
/// Descriptors are inserted directly. Classes may be declared with a parent so
/// that filters asking for derived classes match subclasses. The service can
/// start "not ready" to model a registry that is still indexing; it then
/// becomes ready on [`set_ready`](Self::set_ready).
#[derive(Debug)]
pub struct MemoryScanService {
    entries: RwLock<Entries>,
    class_parents: RwLock<HashMap<String, String>>,
    ready: Mutex<bool>,
    ready_signal: Condvar,
}

impl Default for MemoryScanService {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryScanService {
    /// Creates an empty, ready service.
    pub fn new() -> Self {
        Self::with_ready(true)
    }

    /// Creates an empty service that reports not-ready until [`set_ready`](Self::set_ready).
    pub fn deferred() -> Self {
        Self::with_ready(false)
    }

    fn with_ready(ready: bool) -> Self {
        Self {
            entries: RwLock::new(Entries::default()),
            class_parents: RwLock::new(HashMap::new()),
            ready: Mutex::new(ready),
            ready_signal: Condvar::new(),
        }
    }

    /// Marks the service as ready and wakes every waiting thread.
    pub fn set_ready(&self) {
        let mut ready = self.ready.lock().unwrap_or_else(PoisonError::into_inner);
        if !*ready {
            log::info!("MemoryScanService: ready with {} descriptor(s)", self.len());
        }
        *ready = true;
        self.ready_signal.notify_all();
    }

    /// Declares `class` as a direct subclass of `parent`.
    pub fn register_class(&self, class: impl Into<String>, parent: impl Into<String>) {
        self.class_parents
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(class.into(), parent.into());
    }

    /// Returns `true` if `class` is `base` or derives from it.
    pub fn is_class_of(&self, class: &str, base: &str) -> bool {
        let parents = self
            .class_parents
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let mut current = class;
        // Bounded by the number of classes so a cyclic declaration cannot hang.
        for _ in 0..=parents.len() {
            if current == base {
                return true;
            }
            match parents.get(current) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
        false
    }

    /// Inserts or replaces the descriptor stored at its path.
    pub fn insert(&self, descriptor: AssetDescriptor) -> Option<AssetDescriptor> {
        log::trace!("MemoryScanService: indexing '{}'", descriptor.path);
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries
            .descriptors
            .insert(descriptor.path.clone(), descriptor)
    }

    /// Inserts a descriptor together with the bytes a streaming engine reads for it.
    pub fn insert_with_payload(&self, descriptor: AssetDescriptor, payload: Vec<u8>) {
        let path = descriptor.path.clone();
        self.insert(descriptor);
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .payloads
            .insert(path, payload);
    }

    /// Removes the descriptor and payload stored at `path`.
    pub fn remove(&self, path: &AssetPath) -> Option<AssetDescriptor> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.payloads.remove(path);
        entries.descriptors.remove(path)
    }

    /// Removes every descriptor and payload.
    pub fn clear(&self) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.descriptors.clear();
        entries.payloads.clear();
    }

    /// Returns the number of indexed descriptors.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .descriptors
            .len()
    }

    /// Returns `true` if nothing is indexed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn matches(&self, descriptor: &AssetDescriptor, filter: &ScanFilter) -> bool {
        let path_matches = filter.package_paths.is_empty()
            || filter
                .package_paths
                .iter()
                .any(|dir| descriptor.path.is_under(dir, filter.recursive_paths));

        let class_matches = filter.class_names.is_empty()
            || filter.class_names.iter().any(|class| {
                if filter.recursive_classes {
                    self.is_class_of(&descriptor.class_name, class)
                } else {
                    descriptor.class_name == *class
                }
            });

        path_matches && class_matches
    }
}

impl ScanService for MemoryScanService {
    fn is_ready(&self) -> bool {
        *self.ready.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wait_until_ready(&self) {
        let mut ready = self.ready.lock().unwrap_or_else(PoisonError::into_inner);
        while !*ready {
            ready = self
                .ready_signal
                .wait(ready)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    fn query(&self, filter: &ScanFilter) -> Vec<AssetDescriptor> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .descriptors
            .values()
            .filter(|descriptor| self.matches(descriptor, filter))
            .cloned()
            .collect()
    }

    fn descriptor_for_path(&self, path: &AssetPath) -> Option<AssetDescriptor> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .descriptors
            .get(path)
            .cloned()
    }
}

impl AssetSource for MemoryScanService {
    fn class_name(&self, path: &AssetPath) -> Option<String> {
        self.descriptor_for_path(path)
            .map(|descriptor| descriptor.class_name)
    }

    fn read(&self, path: &AssetPath) -> Result<Vec<u8>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        if let Some(payload) = entries.payloads.get(path) {
            return Ok(payload.clone());
        }
        if entries.descriptors.contains_key(path) {
            return Ok(Vec::new());
        }
        Err(anyhow!("No asset indexed at '{path}'"))
    }
}
