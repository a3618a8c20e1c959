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

use std::{
    any::{type_name, Any},
    fmt,
    ops::Deref,
    sync::{Arc, Weak},
};

/// A marker trait for types that can be produced by a streaming engine.
///
/// `Send` + `Sync` + `'static` allow loaded data to be produced on worker
/// threads and shared with the owner thread.
pub trait Asset: Send + Sync + 'static {}

/// A thread-safe, reference-counted, typed handle to loaded asset data.
///
/// Cloning is cheap and never duplicates the underlying data.
#[derive(Debug)]
pub struct AssetHandle<T: Asset>(Arc<T>);

impl<T: Asset> AssetHandle<T> {
    /// Takes ownership of `asset`.
    pub fn new(asset: T) -> Self {
        Self(Arc::new(asset))
    }
}

impl<T: Asset> Clone for AssetHandle<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T: Asset> Deref for AssetHandle<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Type-erased loaded asset data, as stored on a streaming handle.
///
/// Use [`downcast`](Self::downcast) to recover a typed [`AssetHandle`].
#[derive(Clone)]
pub struct LoadedAsset {
    data: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl LoadedAsset {
    /// Wraps freshly loaded data.
    pub fn new<T: Asset>(asset: T) -> Self {
        Self {
            data: Arc::new(asset),
            type_name: type_name::<T>(),
        }
    }

    /// Returns the Rust type name of the wrapped data.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns `true` if the wrapped data is a `T`.
    pub fn is<T: Asset>(&self) -> bool {
        self.data.is::<T>()
    }

    /// Returns a typed handle if the wrapped data is a `T`.
    pub fn downcast<T: Asset>(&self) -> Option<AssetHandle<T>> {
        self.data.clone().downcast::<T>().ok().map(AssetHandle)
    }

    /// Creates a non-owning reference that does not keep the data resident.
    pub fn downgrade(&self) -> WeakLoadedAsset {
        WeakLoadedAsset {
            data: Arc::downgrade(&self.data),
            type_name: self.type_name,
        }
    }

    /// Returns `true` if both values share the same allocation.
    pub fn ptr_eq(&self, other: &LoadedAsset) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }
}

impl fmt::Debug for LoadedAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedAsset")
            .field("type_name", &self.type_name)
            .finish()
    }
}

/// A non-owning reference to [`LoadedAsset`] data, used by resident-object caches.
#[derive(Clone)]
pub struct WeakLoadedAsset {
    data: Weak<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl WeakLoadedAsset {
    /// Returns the data if something still keeps it resident.
    pub fn upgrade(&self) -> Option<LoadedAsset> {
        self.data.upgrade().map(|data| LoadedAsset {
            data,
            type_name: self.type_name,
        })
    }

    /// Returns `true` while something still keeps the data resident.
    pub fn is_alive(&self) -> bool {
        self.data.strong_count() > 0
    }
}

impl fmt::Debug for WeakLoadedAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakLoadedAsset")
            .field("type_name", &self.type_name)
            .field("alive", &self.is_alive())
            .finish()
    }
}
