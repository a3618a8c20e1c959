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

use super::MemoryScanService;
use crate::streaming::AssetSource;
use anyhow::{anyhow, bail, Context, Result};
use primus_core::asset::{AssetBundleData, AssetDescriptor, AssetPath, PrimaryAssetId};
use primus_core::scan::{ScanFilter, ScanService};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use walkdir::WalkDir;

/// The file suffix of descriptor sidecars.
pub const SIDECAR_SUFFIX: &str = ".asset.ron";

/// The on-disk form of an asset descriptor.
///
/// ```ron
/// (
///     class_name: "MapAsset",
///     primary_asset_id: "Map:Arena",
///     bundles: { "UI": ["/Game/UI/ArenaIcon.ArenaIcon"] },
///     payload: "Arena.txt",
/// )
/// ```
///
/// The asset path is not stored: it is derived from the sidecar location.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DescriptorSidecar {
    /// The class of the stored object.
    pub class_name: String,
    /// The explicit identifier, written as `Type:Name`.
    pub primary_asset_id: PrimaryAssetId,
    /// Extra tags.
    pub tags: BTreeMap<String, String>,
    /// Bundle definitions, by bundle name.
    pub bundles: BTreeMap<String, Vec<AssetPath>>,
    /// A payload file, relative to the sidecar directory.
    pub payload: String,
}

impl DescriptorSidecar {
    /// Builds the descriptor of the asset stored at `path`.
    pub fn into_descriptor(self, path: AssetPath) -> AssetDescriptor {
        let mut descriptor = AssetDescriptor::new(path, self.class_name);
        descriptor.tags = self.tags;
        if self.primary_asset_id.is_valid() {
            descriptor = descriptor.with_primary_asset_id(&self.primary_asset_id);
        }
        if !self.bundles.is_empty() {
            let mut data = AssetBundleData::new();
            for (name, paths) in self.bundles {
                data.add_bundle_assets(&name, paths);
            }
            descriptor = descriptor.with_bundle_data(&data);
        }
        descriptor
    }
}

/// A scan service indexing `*.asset.ron` sidecars under a content directory.
///
/// The directory is mounted at a virtual root such as `/Game`: the sidecar
/// `<root>/Maps/Arena.asset.ron` describes the asset `/Game/Maps/Arena.Arena`.
#[derive(Debug)]
pub struct FileSystemScanService {
    root: PathBuf,
    mount: String,
    index: MemoryScanService,
    payload_files: RwLock<HashMap<AssetPath, PathBuf>>,
}

impl FileSystemScanService {
    /// Indexes every sidecar under `root`, mounted at `mount`.
    pub fn open(root: impl Into<PathBuf>, mount: impl Into<String>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            bail!("Content root '{}' is not a directory", root.display());
        }

        let service = Self {
            root,
            mount: mount.into().trim_end_matches('/').to_string(),
            index: MemoryScanService::new(),
            payload_files: RwLock::new(HashMap::new()),
        };
        service.rescan()?;
        Ok(service)
    }

    /// Returns the content directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the virtual root the directory is mounted at.
    pub fn mount(&self) -> &str {
        &self.mount
    }

    /// Declares `class` as a direct subclass of `parent`.
    pub fn register_class(&self, class: impl Into<String>, parent: impl Into<String>) {
        self.index.register_class(class, parent);
    }

    /// Re-reads every sidecar and returns the number indexed.
    ///
    /// Malformed sidecars are logged and skipped.
    pub fn rescan(&self) -> Result<usize> {
        self.index.clear();
        let mut payloads = HashMap::new();

        for entry in WalkDir::new(&self.root).follow_links(true) {
            let entry = entry
                .with_context(|| format!("Failed to walk '{}'", self.root.display()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let file = entry.path();
            let Some(path) = self.asset_path_for(file) else {
                continue;
            };

            match read_sidecar(file) {
                Ok(sidecar) => {
                    if !sidecar.payload.is_empty() {
                        let dir = file.parent().unwrap_or(&self.root);
                        payloads.insert(path.clone(), dir.join(&sidecar.payload));
                    }
                    self.index.insert(sidecar.into_descriptor(path));
                }
                Err(e) => log::warn!("FileSystemScanService: skipping sidecar: {e:#}"),
            }
        }

        let count = self.index.len();
        *self
            .payload_files
            .write()
            .unwrap_or_else(PoisonError::into_inner) = payloads;
        log::info!(
            "FileSystemScanService: indexed {count} asset(s) under '{}' as '{}'",
            self.root.display(),
            self.mount
        );
        Ok(count)
    }

    /// Maps a sidecar file to the path of the asset it describes.
    pub fn asset_path_for(&self, file: &Path) -> Option<AssetPath> {
        let relative = file.strip_prefix(&self.root).ok()?;
        let file_name = relative.file_name()?.to_str()?;
        let name = file_name.strip_suffix(SIDECAR_SUFFIX)?;
        if name.is_empty() {
            return None;
        }

        let mut package = self.mount.clone();
        if let Some(parent) = relative.parent() {
            for component in parent.components() {
                package.push('/');
                package.push_str(component.as_os_str().to_str()?);
            }
        }
        Some(AssetPath::new(format!("{package}/{name}.{name}")))
    }
}

fn read_sidecar(file: &Path) -> Result<DescriptorSidecar> {
    let text = fs::read_to_string(file)
        .with_context(|| format!("Failed to read '{}'", file.display()))?;
    ron::from_str(&text).with_context(|| format!("Failed to parse '{}'", file.display()))
}

impl ScanService for FileSystemScanService {
    fn query(&self, filter: &ScanFilter) -> Vec<AssetDescriptor> {
        self.index.query(filter)
    }

    fn descriptor_for_path(&self, path: &AssetPath) -> Option<AssetDescriptor> {
        self.index.descriptor_for_path(path)
    }
}

impl AssetSource for FileSystemScanService {
    fn class_name(&self, path: &AssetPath) -> Option<String> {
        self.index.class_name(path)
    }

    fn read(&self, path: &AssetPath) -> Result<Vec<u8>> {
        let payload = self
            .payload_files
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .cloned();
        match payload {
            Some(file) => fs::read(&file)
                .with_context(|| format!("Failed to read payload '{}'", file.display())),
            None if self.index.descriptor_for_path(path).is_some() => Ok(Vec::new()),
            None => Err(anyhow!("No asset indexed at '{path}'")),
        }
    }
}
