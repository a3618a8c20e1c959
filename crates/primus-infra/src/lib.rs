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

//! # Primus Infra
//!
//! Concrete implementations of the collaborators the primary asset manager
//! talks to: scan services that index asset descriptors, and streaming engines
//! that load asset data.
//!
//! - [`MemoryScanService`] keeps descriptors in memory and understands a class
//!   hierarchy, which makes it the natural choice for tests and tools.
//! - [`FileSystemScanService`] indexes a content directory of `*.asset.ron`
//!   descriptor sidecars.
//! - [`ManualStreamingEngine`] completes loads only when told to, which makes
//!   load ordering fully deterministic.
//! - [`ThreadedStreamingEngine`] decodes payloads on a worker pool through an
//!   [`AssetLoaderRegistry`] and hands results back through [`ThreadedStreamingEngine::pump`].

#![warn(missing_docs)]

pub mod scan;
pub mod streaming;

pub use scan::{FileSystemScanService, MemoryScanService};
pub use streaming::{
    AssetLoader, AssetLoaderRegistry, AssetSource, BoxError, ManualStreamingEngine,
    PlaceholderAsset, RawAsset, RawAssetLoader, ThreadedStreamingEngine,
};
