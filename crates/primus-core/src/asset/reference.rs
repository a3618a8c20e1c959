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

//! Explicit traversal of the asset references embedded in concrete data types.
//!
//! Types that embed asset references implement [`TraverseAssetReferences`] and
//! report each reference, and each nested structure, to an
//! [`AssetReferenceVisitor`] together with the bundle names declared at that
//! point. [`BundleCollector`] turns such a traversal into [`AssetBundleData`].

use super::{AssetBundleData, AssetPath, BundleName};
use std::collections::BTreeSet;

/// Receives the asset references of a traversed value.
pub trait AssetReferenceVisitor {
    /// Enters a nested structure declared with `bundles`.
    ///
    /// An empty slice means the nested structure declares no bundle of its own.
    fn enter_scope(&mut self, bundles: &[&str]);

    /// Leaves the innermost nested structure.
    fn leave_scope(&mut self);

    /// Reports one asset reference declared with `bundles`.
    fn visit_reference(&mut self, path: &AssetPath, bundles: &[&str]);
}

/// Implemented per concrete data type to expose its embedded asset references.
pub trait TraverseAssetReferences {
    /// Walks every asset reference of `self`, reporting them to `visitor`.
    fn traverse_asset_references(&self, visitor: &mut dyn AssetReferenceVisitor);
}

impl<T: TraverseAssetReferences> TraverseAssetReferences for [T] {
    fn traverse_asset_references(&self, visitor: &mut dyn AssetReferenceVisitor) {
        for item in self {
            item.traverse_asset_references(visitor);
        }
    }
}

impl<T: TraverseAssetReferences> TraverseAssetReferences for Vec<T> {
    fn traverse_asset_references(&self, visitor: &mut dyn AssetReferenceVisitor) {
        self.as_slice().traverse_asset_references(visitor);
    }
}

impl<T: TraverseAssetReferences> TraverseAssetReferences for Option<T> {
    fn traverse_asset_references(&self, visitor: &mut dyn AssetReferenceVisitor) {
        if let Some(inner) = self {
            inner.traverse_asset_references(visitor);
        }
    }
}

/// Builds [`AssetBundleData`] from a reference traversal.
///
/// Bundle names intersect across nesting: a reference belongs to a bundle only
/// if every enclosing scope that declares bundles also declares that one.
/// Scopes and references that declare nothing inherit their parent's set, and
/// references outside any declared bundle are not collected.
#[derive(Debug, Default)]
pub struct BundleCollector {
    scopes: Vec<Option<BTreeSet<BundleName>>>,
    data: AssetBundleData,
}

impl BundleCollector {
    /// Creates an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Traverses `instance` and returns the collected bundle data.
    pub fn collect(instance: &dyn TraverseAssetReferences) -> AssetBundleData {
        let mut collector = Self::new();
        instance.traverse_asset_references(&mut collector);
        collector.finish()
    }

    /// Returns the collected bundle data.
    pub fn finish(self) -> AssetBundleData {
        self.data
    }

    fn current(&self) -> Option<&BTreeSet<BundleName>> {
        self.scopes.last().and_then(Option::as_ref)
    }

    fn narrow(&self, bundles: &[&str]) -> Option<BTreeSet<BundleName>> {
        match (self.current(), bundles.is_empty()) {
            (None, true) => None,
            (None, false) => Some(bundles.iter().map(|name| name.to_string()).collect()),
            (Some(parent), true) => Some(parent.clone()),
            (Some(parent), false) => Some(
                parent
                    .iter()
                    .filter(|name| bundles.contains(&name.as_str()))
                    .cloned()
                    .collect(),
            ),
        }
    }
}

impl AssetReferenceVisitor for BundleCollector {
    fn enter_scope(&mut self, bundles: &[&str]) {
        let narrowed = self.narrow(bundles);
        self.scopes.push(narrowed);
    }

    fn leave_scope(&mut self) {
        self.scopes.pop();
    }

    fn visit_reference(&mut self, path: &AssetPath, bundles: &[&str]) {
        if let Some(names) = self.narrow(bundles) {
            for name in &names {
                self.data.add_bundle_asset(name, path.clone());
            }
        }
    }
}

impl AssetBundleData {
    /// Collects bundle data from the references of `instance`.
    pub fn from_traversal(instance: &dyn TraverseAssetReferences) -> Self {
        BundleCollector::collect(instance)
    }
}
