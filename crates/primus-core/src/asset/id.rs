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

use crate::error::IdParseError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, str::FromStr};

/// The symbolic name of a category of primary assets (e.g. `Map`, `Weapon`).
///
/// An empty type is the invalid sentinel.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrimaryAssetType(String);

impl PrimaryAssetType {
    /// Creates a type from its symbolic name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the symbolic name.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// A type is valid when it has a non-empty name.
    pub fn is_valid(&self) -> bool {
        !self.0.is_empty()
    }
}

impl From<&str> for PrimaryAssetType {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for PrimaryAssetType {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl fmt::Display for PrimaryAssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A stable logical identifier for a primary asset.
///
/// The identifier is a `(type, name)` pair, unique within its type and
/// independent of the asset's storage path, so assets can be moved without
/// breaking references to them. Its textual form is `Type:Name`.
///
/// `PrimaryAssetId::default()` is the explicitly invalid sentinel returned by
/// lookups that fail; callers check [`is_valid`](Self::is_valid) before use.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PrimaryAssetId {
    /// The category this asset belongs to.
    pub asset_type: PrimaryAssetType,
    /// The instance name, unique within `asset_type`.
    pub name: String,
}

impl PrimaryAssetId {
    /// Separator between the type and the name in the textual form.
    pub const SEPARATOR: char = ':';

    /// Creates an identifier from its type and name.
    pub fn new(asset_type: impl Into<PrimaryAssetType>, name: impl Into<String>) -> Self {
        Self {
            asset_type: asset_type.into(),
            name: name.into(),
        }
    }

    /// Returns the invalid sentinel.
    pub fn invalid() -> Self {
        Self::default()
    }

    /// An identifier is valid when both its type and name are non-empty.
    pub fn is_valid(&self) -> bool {
        self.asset_type.is_valid() && !self.name.is_empty()
    }
}

impl fmt::Display for PrimaryAssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "{}{}{}", self.asset_type, Self::SEPARATOR, self.name)
        } else {
            Ok(())
        }
    }
}

impl FromStr for PrimaryAssetId {
    type Err = IdParseError;

    /// Parses `Type:Name`. The empty string parses to the invalid sentinel.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Ok(Self::invalid());
        }

        match trimmed.split_once(Self::SEPARATOR) {
            Some((asset_type, name)) if !asset_type.is_empty() && !name.is_empty() => {
                Ok(Self::new(asset_type, name))
            }
            _ => Err(IdParseError(trimmed.to_string())),
        }
    }
}

impl Serialize for PrimaryAssetId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PrimaryAssetId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_and_parse_agree() {
        let id = PrimaryAssetId::new("Map", "Arena");
        assert_eq!(id.to_string(), "Map:Arena");
        assert_eq!("Map:Arena".parse::<PrimaryAssetId>().unwrap(), id);
    }

    #[test]
    fn empty_string_is_invalid_sentinel() {
        let id: PrimaryAssetId = "".parse().unwrap();
        assert!(!id.is_valid());
        assert_eq!(id, PrimaryAssetId::invalid());
        assert_eq!(id.to_string(), "");
    }

    #[test]
    fn malformed_text_is_rejected() {
        assert!("NoSeparator".parse::<PrimaryAssetId>().is_err());
        assert!(":Name".parse::<PrimaryAssetId>().is_err());
        assert!("Type:".parse::<PrimaryAssetId>().is_err());
    }

    #[test]
    fn name_may_contain_separator() {
        let id: PrimaryAssetId = "Quest:Chapter:One".parse().unwrap();
        assert_eq!(id.asset_type.as_str(), "Quest");
        assert_eq!(id.name, "Chapter:One");
    }

    #[test]
    fn ordering_is_type_then_name() {
        let mut ids = vec![
            PrimaryAssetId::new("Weapon", "Axe"),
            PrimaryAssetId::new("Map", "Zeta"),
            PrimaryAssetId::new("Map", "Alpha"),
        ];
        ids.sort();
        assert_eq!(
            ids.iter().map(ToString::to_string).collect::<Vec<_>>(),
            vec!["Map:Alpha", "Map:Zeta", "Weapon:Axe"]
        );
    }

    #[test]
    fn serde_uses_textual_form() {
        let id = PrimaryAssetId::new("Map", "Arena");
        let text = ron::to_string(&id).unwrap();
        assert_eq!(text, "\"Map:Arena\"");
        let back: PrimaryAssetId = ron::from_str(&text).unwrap();
        assert_eq!(back, id);
    }
}
