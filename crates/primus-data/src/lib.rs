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

//! # Primus Data
//!
//! The data layouts of the primary asset manager, mutated only by the owner
//! thread:
//!
//! - [`TypeRegistry`]: one entry per primary asset type, owning that type's records.
//! - [`AssetRecord`] and [`LoadState`]: per-identifier metadata and the current/pending
//!   load state pair driven by the streaming state machine.
//! - [`BundleIndex`]: identifier-scoped bundle entries and the path to identifier index.
//! - [`AssetRecordStore`]: scanning, updating and registering records on top of the above.

#![warn(missing_docs)]

mod bundle_index;
mod identity;
mod record;
mod store;
mod type_registry;

pub use bundle_index::BundleIndex;
pub use identity::{
    strategy_for, HeuristicIdentifierStrategy, IdentifierStrategy, TaggedIdentifierStrategy,
};
pub use record::{AssetRecord, LoadState};
pub use store::{AssetRecordStore, IdentifierConflict, ScanRequest};
pub use type_registry::{TypeConstraint, TypeFlags, TypeInfo, TypeRegistry};
