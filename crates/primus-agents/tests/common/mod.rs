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

//! Fixtures shared by the asset manager integration tests.

#![allow(dead_code)]

use primus_agents::AssetManager;
use primus_core::asset::{AssetBundleData, AssetDescriptor, AssetPath, PrimaryAssetId};
use primus_core::settings::AssetManagerSettings;
use primus_infra::{ManualStreamingEngine, MemoryScanService};
use std::sync::Arc;

pub const SETTINGS: &str = r#"
[[primary_asset_types_to_scan]]
primary_asset_type = "Map"
asset_base_class = "MapAsset"
directories = ["/Game/Maps"]

[[primary_asset_types_to_scan]]
primary_asset_type = "Hero"
asset_base_class = "HeroData"
has_derived_variants = true
directories = ["/Game/Heroes"]
rules = { priority = 5 }

[[primary_asset_types_to_scan]]
primary_asset_type = "Quest"
is_dynamic = true

[primary_asset_id_redirects]
"Map:OldArena" = "Map:Arena"

[primary_asset_type_redirects]
Level = "Map"

[asset_path_redirects]
"/Game/Maps/Old/Arena.Arena" = "/Game/Maps/Arena.Arena"
"#;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn id(asset_type: &str, name: &str) -> PrimaryAssetId {
    PrimaryAssetId::new(asset_type, name)
}

pub fn path(text: &str) -> AssetPath {
    AssetPath::new(text)
}

pub fn map(name: &str) -> AssetDescriptor {
    AssetDescriptor::new(format!("/Game/Maps/{name}.{name}"), "MapAsset")
        .with_primary_asset_id(&id("Map", name))
}

/// A hero with a `UI` bundle and a `Game` bundle of one path each.
pub fn hero(name: &str) -> AssetDescriptor {
    let mut bundles = AssetBundleData::new();
    bundles.add_bundle_asset("UI", path(&format!("/Game/UI/{name}Icon.{name}Icon")));
    bundles.add_bundle_asset("Game", path(&format!("/Game/Meshes/{name}.{name}")));
    AssetDescriptor::new(format!("/Game/Heroes/{name}.{name}"), "HeroData")
        .with_primary_asset_id(&id("Hero", name))
        .with_bundle_data(&bundles)
}

pub struct Fixture {
    pub manager: AssetManager,
    pub scan: Arc<MemoryScanService>,
    pub engine: Arc<ManualStreamingEngine>,
}

impl Fixture {
    /// A manager over an empty, ready registry with the shared settings.
    pub fn new() -> Self {
        Self::with_scan(MemoryScanService::new(), SETTINGS)
    }

    pub fn with_scan(scan: MemoryScanService, settings: &str) -> Self {
        init_logger();
        let settings = AssetManagerSettings::from_toml_str(settings).unwrap();
        let scan = Arc::new(scan);
        let engine = Arc::new(ManualStreamingEngine::new());
        let manager = AssetManager::new(settings, scan.clone(), engine.clone()).unwrap();
        Self {
            manager,
            scan,
            engine,
        }
    }

    /// Indexes three maps and two heroes, then scans every configured type.
    pub fn scanned() -> Self {
        let mut fixture = Self::new();
        for name in ["Arena", "Lobby", "Ruins"] {
            fixture.scan.insert(map(name));
        }
        for name in ["Knight", "Archer"] {
            fixture.scan.insert(hero(name));
        }
        assert_eq!(fixture.manager.scan_primary_asset_types_from_config(), 5);
        fixture
    }

    /// Completes every in-flight load and promotes the finished states.
    pub fn settle(&mut self) -> usize {
        self.engine.complete_all();
        self.manager.process_completions()
    }

    pub fn loaded(&self, id: &PrimaryAssetId) -> Option<Vec<String>> {
        self.manager.get_primary_asset_load_set(id, true)
    }
}
