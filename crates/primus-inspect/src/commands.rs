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

use anyhow::{anyhow, bail, Context, Result};
use primus_agents::AssetManager;
use primus_core::asset::PrimaryAssetId;
use primus_core::settings::AssetManagerSettings;
use primus_infra::{AssetLoaderRegistry, FileSystemScanService, ThreadedStreamingEngine};
use std::path::Path;
use std::sync::Arc;

/// A scanned content root and the settings to drive it with.
pub struct Session {
    scan: Arc<FileSystemScanService>,
    settings: AssetManagerSettings,
}

impl Session {
    pub fn open(
        content: &Path,
        mount: &str,
        settings: Option<&Path>,
        classes: &[String],
    ) -> Result<Self> {
        let settings = match settings {
            Some(path) => AssetManagerSettings::load(path)?,
            None => {
                log::warn!("No settings file given, no primary asset type will be scanned");
                AssetManagerSettings::default()
            }
        };

        let scan = FileSystemScanService::open(content, mount)?;
        for relation in classes {
            let (class, parent) = relation
                .split_once('=')
                .ok_or_else(|| anyhow!("Expected CLASS=PARENT, got '{relation}'"))?;
            scan.register_class(class.trim(), parent.trim());
        }

        Ok(Self {
            scan: Arc::new(scan),
            settings,
        })
    }

    fn manager(&self, workers: usize) -> Result<(AssetManager, Arc<ThreadedStreamingEngine>)> {
        let engine = Arc::new(ThreadedStreamingEngine::new(
            self.scan.clone(),
            AssetLoaderRegistry::with_raw_fallback(),
            workers,
        )?);
        let mut manager =
            AssetManager::new(self.settings.clone(), self.scan.clone(), engine.clone())
                .context("Invalid redirect tables")?;
        let count = manager.scan_primary_asset_types_from_config();
        log::info!("Registered {count} primary asset(s) from '{}'", self.scan.root().display());
        Ok((manager, engine))
    }

    pub fn list(&self, only: Option<&str>) -> Result<()> {
        let (manager, _) = self.manager(1)?;

        for info in manager.get_primary_asset_type_info_list() {
            if only.is_some_and(|name| name != info.name().as_str()) {
                continue;
            }
            let kind = if info.is_dynamic() { "dynamic" } else { info.base_class() };
            let ids = manager.get_primary_asset_id_list(info.name());
            println!("{} ({kind}, {} asset(s))", info.name(), ids.len());
            for id in ids {
                println!("  {id}  {}", manager.get_primary_asset_path(&id));
            }
        }

        for conflict in manager.conflicts() {
            let outcome = if conflict.accepted { "replaced" } else { "kept" };
            println!(
                "conflict: {} at '{}' and '{}' ({outcome})",
                conflict.id, conflict.existing_path, conflict.new_path
            );
        }
        Ok(())
    }

    pub fn bundles(&self, id: &PrimaryAssetId, json: bool) -> Result<()> {
        let (manager, _) = self.manager(1)?;
        if manager.get_primary_asset_data(id).is_none() {
            bail!("Unknown primary asset '{id}'");
        }

        let entries = manager.get_asset_bundle_entries(id);
        if json {
            println!("{}", serde_json::to_string_pretty(&entries)?);
            return Ok(());
        }
        if entries.is_empty() {
            println!("{id} has no bundles");
        }
        for entry in entries {
            println!("{}", entry.name);
            for path in &entry.asset_paths {
                println!("  {path}");
            }
        }
        Ok(())
    }

    pub fn load(&self, ids: &[PrimaryAssetId], bundles: &[String], workers: usize) -> Result<()> {
        let (mut manager, engine) = self.manager(workers)?;
        let bundles: Vec<&str> = bundles.iter().map(String::as_str).collect();

        let handle = manager
            .load_primary_assets(ids, &bundles, None)
            .ok_or_else(|| anyhow!("None of the requested primary assets is known"))?;
        engine.wait(&handle)?;
        manager.process_completions();

        for id in ids {
            match manager.get_primary_asset_load_set(id, true) {
                Some(loaded) => {
                    let object = manager
                        .get_primary_asset_object(id)
                        .map_or("<none>", |object| object.type_name());
                    println!("{id}: bundles [{}], object {object}", loaded.join(", "));
                }
                None => println!("{id}: not loaded"),
            }
        }
        for (path, object) in handle.loaded_assets() {
            log::debug!("Resident: {path} ({})", object.type_name());
        }
        Ok(())
    }
}
