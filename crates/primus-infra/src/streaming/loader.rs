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

//! A registry of asset loaders, selecting a decoder by asset class name.

use super::BoxError;
use anyhow::{anyhow, Result};
use primus_core::asset::{Asset, LoadedAsset};
use std::collections::HashMap;
use std::marker::PhantomData;

/// Decodes raw bytes into an asset of type `A`.
///
/// Loaders run on streaming worker threads, so the work done here may be as
/// CPU-intensive as needed.
pub trait AssetLoader<A: Asset>: Send + Sync {
    /// Parses `bytes` into an `A`.
    fn load(&self, bytes: &[u8]) -> Result<A, BoxError>;
}

/// Type-erased loader stored in the registry.
trait AnyAssetLoader: Send + Sync {
    fn load_any(&self, bytes: &[u8]) -> Result<LoadedAsset, BoxError>;
}

struct AssetLoaderWrapper<A: Asset, L: AssetLoader<A>>(L, PhantomData<fn() -> A>);

impl<A: Asset, L: AssetLoader<A>> AnyAssetLoader for AssetLoaderWrapper<A, L> {
    fn load_any(&self, bytes: &[u8]) -> Result<LoadedAsset, BoxError> {
        self.0.load(bytes).map(LoadedAsset::new)
    }
}

/// The raw bytes of an asset no dedicated loader decodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawAsset(pub Vec<u8>);

impl Asset for RawAsset {}

/// Wraps the payload bytes in a [`RawAsset`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RawAssetLoader;

impl AssetLoader<RawAsset> for RawAssetLoader {
    fn load(&self, bytes: &[u8]) -> Result<RawAsset, BoxError> {
        Ok(RawAsset(bytes.to_vec()))
    }
}

/// Maps asset class names to loaders.
///
/// Classes without a registered loader fall back to the fallback loader, if
/// one is set.
#[derive(Default)]
pub struct AssetLoaderRegistry {
    loaders: HashMap<String, Box<dyn AnyAssetLoader>>,
    fallback: Option<Box<dyn AnyAssetLoader>>,
}

impl std::fmt::Debug for AssetLoaderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut classes: Vec<_> = self.loaders.keys().collect();
        classes.sort();
        f.debug_struct("AssetLoaderRegistry")
            .field("classes", &classes)
            .field("has_fallback", &self.fallback.is_some())
            .finish()
    }
}

impl AssetLoaderRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry that decodes every class as a [`RawAsset`].
    pub fn with_raw_fallback() -> Self {
        let mut registry = Self::new();
        registry.set_fallback(RawAssetLoader);
        registry
    }

    /// Registers `loader` for assets of class `class_name`.
    pub fn register<A: Asset>(
        &mut self,
        class_name: impl Into<String>,
        loader: impl AssetLoader<A> + 'static,
    ) {
        let class_name = class_name.into();
        log::debug!(
            "AssetLoaderRegistry: '{class_name}' decodes to {}",
            std::any::type_name::<A>()
        );
        let wrapped = AssetLoaderWrapper(loader, PhantomData);
        self.loaders.insert(class_name, Box::new(wrapped));
    }

    /// Sets the loader used for classes without a dedicated one.
    pub fn set_fallback<A: Asset>(&mut self, loader: impl AssetLoader<A> + 'static) {
        self.fallback = Some(Box::new(AssetLoaderWrapper(loader, PhantomData)));
    }

    /// Returns `true` if assets of `class_name` can be decoded.
    pub fn can_load(&self, class_name: &str) -> bool {
        self.fallback.is_some() || self.loaders.contains_key(class_name)
    }

    /// Decodes `bytes` with the loader registered for `class_name`.
    pub fn load(&self, class_name: &str, bytes: &[u8]) -> Result<LoadedAsset> {
        let loader = self
            .loaders
            .get(class_name)
            .or(self.fallback.as_ref())
            .ok_or_else(|| anyhow!("No loader registered for asset class '{class_name}'"))?;

        loader
            .load_any(bytes)
            .map_err(|e| anyhow!("Failed to decode '{class_name}' asset: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Text(String);

    impl Asset for Text {}

    struct TextLoader;

    impl AssetLoader<Text> for TextLoader {
        fn load(&self, bytes: &[u8]) -> Result<Text, BoxError> {
            Ok(Text(String::from_utf8(bytes.to_vec())?))
        }
    }

    #[test]
    fn registered_loader_decodes_its_class() {
        let mut registry = AssetLoaderRegistry::new();
        registry.register("Text", TextLoader);

        let loaded = registry.load("Text", b"hello").unwrap();
        let text = loaded.downcast::<Text>().unwrap();
        assert_eq!(*text, Text("hello".to_string()));
    }

    #[test]
    fn unknown_class_without_fallback_fails() {
        let registry = AssetLoaderRegistry::new();
        assert!(!registry.can_load("Text"));
        assert!(registry.load("Text", b"hello").is_err());
    }

    #[test]
    fn fallback_decodes_unknown_classes() {
        let registry = AssetLoaderRegistry::with_raw_fallback();
        let loaded = registry.load("Anything", b"\x01\x02").unwrap();
        let raw = loaded.downcast::<RawAsset>().unwrap();
        assert_eq!(*raw, RawAsset(vec![1, 2]));
    }

    #[test]
    fn decoder_errors_are_reported() {
        let mut registry = AssetLoaderRegistry::new();
        registry.register("Text", TextLoader);
        assert!(registry.load("Text", &[0xff, 0xfe]).is_err());
    }
}
