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

use anyhow::Result;
use primus_core::asset::AssetPath;

/// The error type returned by asset loaders.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Raw storage read by a streaming engine.
///
/// A source knows the class of each stored asset, which selects the loader
/// decoding it, and can produce the raw bytes of the asset.
pub trait AssetSource: Send + Sync {
    /// Returns the class of the asset at `path`, if it exists.
    fn class_name(&self, path: &AssetPath) -> Option<String>;

    /// Reads the raw bytes of the asset at `path`.
    fn read(&self, path: &AssetPath) -> Result<Vec<u8>>;
}
