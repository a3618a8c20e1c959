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

//! Value types describing primary assets.
//!
//! The key components are:
//! - [`PrimaryAssetId`]: the stable `(type, name)` pair naming a coarse-grained asset
//!   independently of where its data lives.
//! - [`AssetPath`]: the storage path of an asset object.
//! - [`AssetDescriptor`]: the opaque record returned by a scan service.
//! - [`AssetBundleData`]: named, identifier-scoped subsets of referenced paths.
//! - [`LoadedAsset`] and [`AssetHandle`]: type-erased and typed access to loaded data.
//! - The reference traversal capability used to build bundle data from concrete types.

mod bundle;
mod descriptor;
mod handle;
mod id;
mod path;
mod reference;

pub use bundle::*;
pub use descriptor::*;
pub use handle::*;
pub use id::*;
pub use path::*;
pub use reference::*;
