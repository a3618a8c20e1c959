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

//! # Primus Core
//!
//! Foundational crate containing the value types, collaborator contracts and
//! settings shared by every layer of the primary asset manager.
//!
//! Nothing in this crate owns asset records or drives loads. It defines the
//! "common language" used by `primus-data` (records and bundle indices) and
//! `primus-agents` (the streaming state machine and the manager façade), and the
//! interfaces that concrete scan services and streaming engines implement.

#![warn(missing_docs)]

pub mod asset;
pub mod error;
pub mod event;
pub mod redirect;
pub mod scan;
pub mod settings;
pub mod streaming;

pub use error::{BulkScanError, IdParseError, RegistryError, SettingsError};
pub use event::{AssetManagerEvent, EventBus};
pub use redirect::RedirectTable;
pub use settings::AssetManagerSettings;
