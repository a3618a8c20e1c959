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

//! The public surface of the primary asset manager.
//!
//! [`AssetManager`] is an explicit context object: it is built once at startup
//! from settings, a scan service and a streaming engine, and passed by reference
//! to whatever needs it. It composes the record store, the redirect tables and the
//! streaming state machine, and never reports failures by panicking: unknown
//! identifiers and misuse yield empty results and log diagnostics.

mod manager;
mod snapshot;

pub use manager::AssetManager;
pub use snapshot::BundleStateSnapshot;
