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

//! The contract of the external content registry that discovers assets on disk.

use crate::asset::{AssetDescriptor, AssetPath};

/// Restricts a [`ScanService::query`].
///
/// Empty `package_paths` or `class_names` do not restrict on that axis.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanFilter {
    /// Directories the package must live under.
    pub package_paths: Vec<String>,
    /// Classes the descriptor must have.
    pub class_names: Vec<String>,
    /// Include sub-directories of `package_paths`.
    pub recursive_paths: bool,
    /// Include classes derived from `class_names`.
    pub recursive_classes: bool,
}

impl ScanFilter {
    /// Returns `true` if the filter restricts neither paths nor classes.
    pub fn is_empty(&self) -> bool {
        self.package_paths.is_empty() && self.class_names.is_empty()
    }
}

/// A content registry that returns descriptors for a path or a query.
///
/// Implementations may index content in the background; until
/// [`is_ready`](Self::is_ready) reports `true`, queries can be incomplete.
pub trait ScanService: Send + Sync {
    /// Returns `true` once the registry has finished indexing.
    fn is_ready(&self) -> bool {
        true
    }

    /// Blocks until the registry has finished indexing.
    fn wait_until_ready(&self) {}

    /// Returns every descriptor matching `filter`.
    fn query(&self, filter: &ScanFilter) -> Vec<AssetDescriptor>;

    /// Returns the descriptor stored at `path`.
    fn descriptor_for_path(&self, path: &AssetPath) -> Option<AssetDescriptor>;
}
