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

//! The contract of the external streaming engine that loads asset data.
//!
//! A streaming engine turns a [`LoadRequest`] into a [`StreamableHandle`] and
//! completes that handle once every requested path has been loaded. Engines that
//! run loads on worker threads must complete handles on the owner thread, which
//! keeps every completion callback on the thread that owns the asset records.

mod handle;

pub use handle::*;

use crate::asset::{AssetPath, LoadedAsset};

/// The priority of a load request. Higher values are served first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LoadPriority(pub i32);

impl LoadPriority {
    /// The priority of requests that specify none.
    pub const DEFAULT: LoadPriority = LoadPriority(0);
    /// The priority of requests that should jump the queue.
    pub const HIGH: LoadPriority = LoadPriority(100);
}

/// A request to load a set of asset paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    /// The paths to load.
    pub paths: Vec<AssetPath>,
    /// Block the calling thread until the load has finished.
    pub synchronous: bool,
    /// The request priority.
    pub priority: LoadPriority,
    /// A label for logs and tooling.
    pub debug_name: String,
}

impl LoadRequest {
    /// Creates an asynchronous request with default priority.
    pub fn new(paths: Vec<AssetPath>, debug_name: impl Into<String>) -> Self {
        Self {
            paths,
            synchronous: false,
            priority: LoadPriority::DEFAULT,
            debug_name: debug_name.into(),
        }
    }

    /// Sets whether the request blocks.
    pub fn synchronous(mut self, synchronous: bool) -> Self {
        self.synchronous = synchronous;
        self
    }

    /// Sets the request priority.
    pub fn with_priority(mut self, priority: LoadPriority) -> Self {
        self.priority = priority;
        self
    }
}

/// An asynchronous I/O and deserialization engine.
pub trait StreamingEngine: Send + Sync {
    /// Starts loading `request.paths` and returns the handle tracking the load.
    ///
    /// For synchronous requests the returned handle has already completed.
    fn request_load(&self, request: LoadRequest) -> StreamableHandle;

    /// Wraps `handles` in one handle that completes when all of them have.
    fn combine_handles(
        &self,
        debug_name: &str,
        handles: Vec<StreamableHandle>,
    ) -> StreamableHandle {
        StreamableHandle::combine(debug_name, handles)
    }

    /// Returns the object at `path` if it is resident in memory.
    fn find_object(&self, _path: &AssetPath) -> Option<LoadedAsset> {
        None
    }
}
