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

//! # Primus Agents
//!
//! The logic that drives the primary asset data:
//!
//! - [`streaming_agent`]: the per-identifier streaming state machine that diffs
//!   requested bundle sets against what is loaded or in flight, requests loads and
//!   promotes pending states on completion.
//! - [`asset_manager`]: the [`AssetManager`](asset_manager::AssetManager) façade that
//!   composes scanning, lookups, loads and simulate-mode state capture.

#![warn(missing_docs)]

pub mod asset_manager;
pub mod streaming_agent;

pub use asset_manager::{AssetManager, BundleStateSnapshot};
pub use streaming_agent::{BundleChange, StreamingStateMachine};
