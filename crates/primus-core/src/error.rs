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

//! Defines the error types of the asset manager's data layer and settings.
//!
//! None of these cross the manager façade: the façade logs them and answers
//! with an empty or invalid result instead.

use crate::asset::{AssetPath, PrimaryAssetId, PrimaryAssetType};
use thiserror::Error;

/// Text that is not a valid `Type:Name` identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("'{0}' is not a valid primary asset id, expected 'Type:Name'")]
pub struct IdParseError(pub String);

/// A structural misuse or a data conflict reported by the type registry or record store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A type was registered again with a different constraint or flags.
    #[error("primary asset type '{asset_type}' re-registered with a different configuration: {details}")]
    TypeMismatch {
        /// The offending type.
        asset_type: PrimaryAssetType,
        /// Which field differs.
        details: String,
    },
    /// The type has never been registered.
    #[error("primary asset type '{0}' is not registered")]
    UnknownType(PrimaryAssetType),
    /// A dynamic registration targeted a scanned type.
    #[error("primary asset type '{0}' is not dynamic")]
    NotDynamic(PrimaryAssetType),
    /// A path scan targeted a dynamic type.
    #[error("primary asset type '{0}' is dynamic and cannot be scanned")]
    ScanDynamicType(PrimaryAssetType),
    /// The identifier is the invalid sentinel.
    #[error("invalid primary asset id '{0}'")]
    InvalidIdentifier(PrimaryAssetId),
    /// Two distinct paths claim the same identifier and duplicates are rejected.
    #[error("primary asset id '{id}' is already registered at '{existing_path}', rejected '{new_path}'")]
    DuplicateIdentifier {
        /// The contested identifier.
        id: PrimaryAssetId,
        /// The path already registered.
        existing_path: AssetPath,
        /// The path that was rejected.
        new_path: AssetPath,
    },
}

/// Misuse of bulk-scan mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BulkScanError {
    /// `begin_bulk` was called while already in bulk mode.
    #[error("bulk scan already in progress, nesting is not supported")]
    AlreadyInBulkScan,
    /// `end_bulk` was called outside bulk mode.
    #[error("no bulk scan in progress")]
    NotInBulkScan,
}

/// Failure to load or validate [`AssetManagerSettings`](crate::settings::AssetManagerSettings).
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The settings file could not be read.
    #[error("failed to read settings: {0}")]
    Io(#[from] std::io::Error),
    /// The settings text is not valid TOML for the settings schema.
    #[error("failed to parse settings: {0}")]
    Parse(#[from] toml::de::Error),
    /// A redirect entry is malformed.
    #[error("invalid redirect '{old}' -> '{new}': {reason}")]
    InvalidRedirect {
        /// The deprecated side.
        old: String,
        /// The current side.
        new: String,
        /// Why the entry was rejected.
        reason: String,
    },
}
