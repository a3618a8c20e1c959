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

use serde::{Deserialize, Serialize};
use std::fmt;

/// The storage path of a single asset object, e.g. `/Game/Maps/Arena.Arena`.
///
/// The part before the final `.` is the package name (the storage unit); the
/// part after it is the asset's short name. Paths without an object suffix use
/// their last segment as the short name. An empty path is the invalid sentinel.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetPath(String);

impl AssetPath {
    /// Creates a path from its textual form.
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// Returns the textual form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// A path is valid when it is non-empty.
    pub fn is_valid(&self) -> bool {
        !self.0.is_empty()
    }

    fn object_separator(&self) -> Option<usize> {
        let dot = self.0.rfind('.')?;
        match self.0.rfind('/') {
            Some(slash) if slash > dot => None,
            _ => Some(dot),
        }
    }

    /// Returns the package part, `/Game/Maps/Arena` for `/Game/Maps/Arena.Arena`.
    pub fn package_name(&self) -> &str {
        match self.object_separator() {
            Some(dot) => &self.0[..dot],
            None => &self.0,
        }
    }

    /// Returns the short asset name, `Arena` for `/Game/Maps/Arena.Arena`.
    pub fn asset_name(&self) -> &str {
        match self.object_separator() {
            Some(dot) => &self.0[dot + 1..],
            None => self.0.rsplit('/').next().unwrap_or(&self.0),
        }
    }

    /// Returns `true` if the package lives under `directory`.
    ///
    /// When `recursive` is `false` only direct children of `directory` match.
    pub fn is_under(&self, directory: &str, recursive: bool) -> bool {
        let directory = directory.trim_end_matches('/');
        let package = self.package_name();

        let Some(rest) = package.strip_prefix(directory) else {
            return false;
        };
        let Some(rest) = rest.strip_prefix('/') else {
            return false;
        };

        !rest.is_empty() && (recursive || !rest.contains('/'))
    }
}

impl From<&str> for AssetPath {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<String> for AssetPath {
    fn from(path: String) -> Self {
        Self(path)
    }
}

impl fmt::Display for AssetPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
