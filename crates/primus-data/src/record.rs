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

//! Per-identifier records and their load states.

use primus_core::asset::{AssetDescriptor, AssetPath, BundleName, PrimaryAssetId};
use primus_core::streaming::{HandleId, StreamableHandle};
use std::collections::BTreeSet;

/// A bundle set paired with the streaming handle that loads it.
#[derive(Debug, Clone, Default)]
pub struct LoadState {
    /// The bundle names loaded (or being loaded) alongside the primary asset.
    pub bundle_names: BTreeSet<BundleName>,
    /// The handle keeping the load alive.
    pub handle: Option<StreamableHandle>,
}

impl LoadState {
    /// Creates a state for `bundle_names` tracked by `handle`.
    pub fn new(bundle_names: BTreeSet<BundleName>, handle: StreamableHandle) -> Self {
        Self {
            bundle_names,
            handle: Some(handle),
        }
    }

    /// A state is valid while its handle is loading or holds completed data.
    pub fn is_valid(&self) -> bool {
        self.handle.as_ref().is_some_and(StreamableHandle::is_active)
    }

    /// Returns `true` if this state is tracked by the handle `id`.
    pub fn holds(&self, id: HandleId) -> bool {
        self.handle.as_ref().is_some_and(|handle| handle.id() == id)
    }

    /// Clears the state, canceling its handle when `cancel` is set.
    ///
    /// Without `cancel` the handle is only dropped, so whoever else holds it keeps
    /// the data resident.
    pub fn reset(&mut self, cancel: bool) {
        if let Some(handle) = self.handle.take() {
            if cancel {
                handle.cancel();
            }
        }
        self.bundle_names.clear();
    }

    /// Returns the bundle names in sorted order.
    pub fn sorted_bundles(&self) -> Vec<BundleName> {
        self.bundle_names.iter().cloned().collect()
    }
}

/// Everything the manager knows about one primary asset.
#[derive(Debug, Clone)]
pub struct AssetRecord {
    /// The identifier.
    pub id: PrimaryAssetId,
    /// The resolved storage path of the primary object.
    pub path: AssetPath,
    /// The scan service metadata; `None` for dynamic registrations.
    pub descriptor: Option<AssetDescriptor>,
    /// What is loaded now.
    pub current: LoadState,
    /// What has been requested and is still in flight.
    pub pending: LoadState,
}

impl AssetRecord {
    /// Creates an unloaded record.
    pub fn new(id: PrimaryAssetId, path: AssetPath, descriptor: Option<AssetDescriptor>) -> Self {
        Self {
            id,
            path,
            descriptor,
            current: LoadState::default(),
            pending: LoadState::default(),
        }
    }

    /// Returns the most recently requested state: pending if valid, else current.
    pub fn effective_state(&self) -> &LoadState {
        if self.pending.is_valid() {
            &self.pending
        } else {
            &self.current
        }
    }

    /// Returns `true` if either state is valid.
    pub fn has_valid_state(&self) -> bool {
        self.current.is_valid() || self.pending.is_valid()
    }
}
