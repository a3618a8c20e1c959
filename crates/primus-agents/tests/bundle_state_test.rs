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

mod common;

use common::{hero, id, path, Fixture, SETTINGS};
use primus_agents::BundleChange;
use primus_core::asset::{AssetBundleData, AssetDescriptor, AssetPath};
use primus_core::event::{AssetManagerEvent, DEFAULT_EVENT_CAPACITY};
use primus_infra::MemoryScanService;
use primus_core::streaming::{CompletionCallback, LoadPriority};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn bundles(names: &[&str]) -> Option<Vec<String>> {
    Some(names.iter().map(|name| name.to_string()).collect())
}

/// Knight's `UI` bundle references Squire, whose own `UI` bundle holds its icon.
fn squad(settings: &str) -> Fixture {
    let scan = MemoryScanService::new();
    let mut knight_bundles = AssetBundleData::new();
    knight_bundles.add_bundle_asset("UI", path("/Game/Heroes/Squire.Squire"));
    scan.insert(
        AssetDescriptor::new("/Game/Heroes/Knight.Knight", "HeroData")
            .with_primary_asset_id(&id("Hero", "Knight"))
            .with_bundle_data(&knight_bundles),
    );
    scan.insert(hero("Squire"));

    let mut fixture = Fixture::with_scan(scan, settings);
    assert_eq!(fixture.manager.scan_primary_asset_types_from_config(), 2);
    fixture
}

fn squad_paths(recursive: bool) -> Vec<AssetPath> {
    let mut paths = vec![
        path("/Game/Heroes/Knight.Knight"),
        path("/Game/Heroes/Squire.Squire"),
    ];
    if recursive {
        paths.push(path("/Game/UI/SquireIcon.SquireIcon"));
    }
    paths
}

fn counter() -> (Arc<AtomicUsize>, CompletionCallback) {
    let calls = Arc::new(AtomicUsize::new(0));
    let callback: CompletionCallback = {
        let calls = Arc::clone(&calls);
        Box::new(move || {
            calls.fetch_add(1, Ordering::SeqCst);
        })
    };
    (calls, callback)
}

#[test]
fn test_repeated_load_reuses_the_same_handle() {
    let mut f = Fixture::scanned();
    let knight = id("Hero", "Knight");

    let first = f.manager.load_primary_asset(&knight, &["UI"], None).unwrap();
    let again = f.manager.load_primary_asset(&knight, &["UI"], None).unwrap();
    assert_eq!(first, again);
    assert_eq!(f.engine.request_count(), 1);

    assert_eq!(f.settle(), 1);
    let loaded = f.manager.load_primary_asset(&knight, &["UI"], None).unwrap();
    assert_eq!(loaded, first);
    assert_eq!(f.engine.request_count(), 1);
    assert_eq!(f.loaded(&knight), bundles(&["UI"]));
}

#[test]
fn test_load_requests_primary_and_bundle_paths() {
    let mut f = Fixture::scanned();
    f.manager
        .load_primary_asset(&id("Hero", "Knight"), &["UI"], None)
        .unwrap();

    let request = f.engine.last_request().unwrap();
    assert_eq!(
        request.paths,
        vec![
            path("/Game/Heroes/Knight.Knight"),
            path("/Game/UI/KnightIcon.KnightIcon")
        ]
    );
    assert_eq!(
        request.debug_name,
        "ChangeBundleStateForPrimaryAssets(Hero:Knight)"
    );
}

#[test]
fn test_stale_completion_is_ignored() {
    let mut f = Fixture::scanned();
    let knight = id("Hero", "Knight");

    let first = f.manager.load_primary_asset(&knight, &["UI"], None).unwrap();
    // The first load finishes, but its completion is only processed after a
    // second, different request has replaced it.
    assert!(f.engine.complete(&first));
    let second = f
        .manager
        .load_primary_asset(&knight, &["UI", "Game"], None)
        .unwrap();
    assert_ne!(first, second);

    assert_eq!(f.manager.process_completions(), 0);
    assert_eq!(f.loaded(&knight), None);
    assert_eq!(
        f.manager.get_primary_asset_load_set(&knight, false),
        bundles(&["Game", "UI"])
    );

    assert_eq!(f.settle(), 1);
    assert_eq!(f.loaded(&knight), bundles(&["Game", "UI"]));
}

#[test]
fn test_superseded_load_is_canceled() {
    let mut f = Fixture::scanned();
    let knight = id("Hero", "Knight");

    let first = f.manager.load_primary_asset(&knight, &["UI"], None).unwrap();
    f.manager
        .load_primary_asset(&knight, &["Game"], None)
        .unwrap();

    assert!(first.was_canceled());
    assert!(!f.engine.complete(&first));
    assert_eq!(f.settle(), 1);
    assert_eq!(f.loaded(&knight), bundles(&["Game"]));
}

#[test]
fn test_add_and_remove_bundles() {
    let mut f = Fixture::scanned();
    let knight = id("Hero", "Knight");
    let ids = [knight.clone()];

    f.manager.load_primary_asset(&knight, &["UI"], None);
    f.settle();

    f.manager
        .change_bundle_state_for_primary_assets(&ids, &["Game"], &[], false, None);
    f.settle();
    assert_eq!(f.loaded(&knight), bundles(&["Game", "UI"]));

    f.manager
        .change_bundle_state_for_primary_assets(&ids, &[], &["UI"], false, None);
    f.settle();
    assert_eq!(f.loaded(&knight), bundles(&["Game"]));

    f.manager
        .change_bundle_state_for_primary_assets(&ids, &["UI"], &[], true, None);
    f.settle();
    assert_eq!(f.loaded(&knight), bundles(&["UI"]));
}

#[test]
fn test_multiple_loads_share_one_combined_handle() {
    let mut f = Fixture::scanned();
    let ids = [id("Hero", "Knight"), id("Hero", "Archer")];
    let (calls, callback) = counter();

    let handle = f
        .manager
        .load_primary_assets(&ids, &["UI"], Some(callback))
        .unwrap();
    assert_eq!(handle.children().len(), 2);
    assert_eq!(f.engine.request_count(), 2);
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    f.engine.complete_all();
    assert!(handle.has_load_completed());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(f.manager.process_completions(), 2);
}

#[test]
fn test_unknown_identifier_runs_callback_immediately() {
    let mut f = Fixture::scanned();
    let (calls, callback) = counter();

    let handle = f
        .manager
        .load_primary_asset(&id("Hero", "Nobody"), &["UI"], Some(callback));

    assert!(handle.is_none());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(f.engine.request_count(), 0);
}

#[test]
fn test_synchronous_change_commits_immediately() {
    let mut f = Fixture::scanned();
    let knight = id("Hero", "Knight");
    let change = BundleChange::replace(["UI"]).synchronous(true);

    let handle = f
        .manager
        .change_bundle_state(&[knight.clone()], &change, None)
        .unwrap();

    assert!(handle.has_load_completed());
    assert_eq!(f.loaded(&knight), bundles(&["UI"]));
    assert_eq!(f.manager.process_completions(), 0);
}

#[test]
fn test_load_priority_comes_from_request_then_type_rules() {
    let mut f = Fixture::scanned();

    f.manager
        .load_primary_asset(&id("Hero", "Knight"), &[], None);
    assert_eq!(f.engine.last_request().unwrap().priority, LoadPriority(5));

    f.manager.load_primary_asset(&id("Map", "Arena"), &[], None);
    assert_eq!(f.engine.last_request().unwrap().priority, LoadPriority::DEFAULT);

    let change = BundleChange::replace(["UI"]).with_priority(LoadPriority::HIGH);
    f.manager
        .change_bundle_state(&[id("Hero", "Archer")], &change, None);
    assert_eq!(f.engine.last_request().unwrap().priority, LoadPriority::HIGH);
}

#[test]
fn test_matching_assets_swap_bundles() {
    let mut f = Fixture::scanned();
    let knight = id("Hero", "Knight");
    let archer = id("Hero", "Archer");
    let arena = id("Map", "Arena");

    f.manager.load_primary_asset(&knight, &["UI"], None);
    f.manager.load_primary_asset(&archer, &["UI", "Game"], None);
    f.manager.load_primary_asset(&arena, &[], None);
    f.settle();

    f.manager
        .change_bundle_state_for_matching_primary_assets(&["Game"], &["UI"], None);
    f.settle();

    assert_eq!(f.loaded(&knight), bundles(&["Game"]));
    assert_eq!(f.loaded(&archer), bundles(&["Game"]));
    assert_eq!(f.loaded(&arena), bundles(&[]));
}

#[test]
fn test_query_by_bundle_state() {
    let mut f = Fixture::scanned();
    let knight = id("Hero", "Knight");
    let archer = id("Hero", "Archer");
    let arena = id("Map", "Arena");

    f.manager.load_primary_asset(&knight, &["UI"], None);
    f.manager.load_primary_asset(&archer, &["UI", "Game"], None);
    f.manager.load_primary_asset(&arena, &[], None);

    // Pending states count as requested.
    assert_eq!(
        f.manager.get_primary_assets_with_bundle_state(&["UI"], &[], &[]),
        vec![archer.clone(), knight.clone()]
    );
    assert_eq!(
        f.manager
            .get_primary_assets_with_bundle_state(&["UI"], &["Game"], &[]),
        vec![knight]
    );
    assert_eq!(
        f.manager
            .get_primary_assets_with_bundle_state(&[], &[], &["Map".into()]),
        vec![arena]
    );
}

#[test]
fn test_preload_leaves_states_untouched() {
    let f = Fixture::scanned();
    let knight = id("Hero", "Knight");

    let handle = f
        .manager
        .preload_primary_assets(&[knight.clone()], &["Game"], false, None)
        .unwrap();

    assert_eq!(
        handle.requested_paths(),
        &[
            path("/Game/Heroes/Knight.Knight"),
            path("/Game/Meshes/Knight.Knight")
        ]
    );
    assert_eq!(
        f.engine.last_request().unwrap().debug_name,
        "PreloadPrimaryAssets(Hero:Knight)"
    );
    assert_eq!(f.manager.get_primary_asset_load_set(&knight, false), None);
    assert!(f.manager.get_primary_asset_handle(&knight, false).is_none());
}

#[test]
fn test_handle_lookup_prefers_pending() {
    let mut f = Fixture::scanned();
    let knight = id("Hero", "Knight");

    let current = f.manager.load_primary_asset(&knight, &["UI"], None).unwrap();
    f.settle();
    let pending = f
        .manager
        .load_primary_asset(&knight, &["Game"], None)
        .unwrap();

    assert_eq!(f.manager.get_primary_asset_handle(&knight, false), Some(pending));
    assert_eq!(f.manager.get_primary_asset_handle(&knight, true), Some(current));
}

#[test]
fn test_unload_clears_both_states() {
    let mut f = Fixture::scanned();
    let knight = id("Hero", "Knight");

    let current = f.manager.load_primary_asset(&knight, &["UI"], None).unwrap();
    f.settle();
    let pending = f
        .manager
        .load_primary_asset(&knight, &["Game"], None)
        .unwrap();

    assert_eq!(f.manager.unload_primary_asset(&knight), 1);
    assert!(!current.is_active());
    assert!(pending.was_canceled());
    assert_eq!(f.manager.get_primary_asset_load_set(&knight, false), None);
    assert_eq!(f.manager.unload_primary_asset(&knight), 0);

    let events = f.manager.events().drain();
    assert!(events.contains(&AssetManagerEvent::Unloaded { id: knight }));
}

#[test]
fn test_load_and_unload_by_type() {
    let mut f = Fixture::scanned();

    let handle = f
        .manager
        .load_primary_assets_with_type(&"Map".into(), &[], None)
        .unwrap();
    assert_eq!(handle.children().len(), 3);
    f.settle();

    assert_eq!(
        f.manager
            .get_primary_asset_object_list(&"Map".into())
            .len(),
        3
    );
    assert_eq!(f.manager.unload_primary_assets_with_type(&"Map".into()), 3);
}

#[test]
fn test_committed_states_are_published() {
    let mut f = Fixture::scanned();
    let knight = id("Hero", "Knight");
    f.manager.events().drain();

    f.manager.load_primary_asset(&knight, &["UI"], None);
    assert!(f.manager.events().drain().is_empty());

    f.settle();
    assert_eq!(
        f.manager.events().drain(),
        vec![AssetManagerEvent::BundleStateChanged {
            id: knight,
            bundles: vec!["UI".to_string()],
        }]
    );
}

#[test]
fn test_bundles_are_not_expanded_by_default() {
    let mut f = squad(SETTINGS);
    f.manager.load_primary_asset(&id("Hero", "Knight"), &["UI"], None);

    assert_eq!(f.engine.last_request().unwrap().paths, squad_paths(false));
}

#[test]
fn test_type_rules_expand_bundles_through_references() {
    let settings = SETTINGS.replace(
        "rules = { priority = 5 }",
        "rules = { priority = 5, apply_recursively = true }",
    );
    let mut f = squad(&settings);
    f.manager.load_primary_asset(&id("Hero", "Knight"), &["UI"], None);

    assert_eq!(f.engine.last_request().unwrap().paths, squad_paths(true));
}

#[test]
fn test_manager_wide_expansion_follows_references() {
    let settings = format!("expand_bundles_recursively = true\n{SETTINGS}");
    let mut f = squad(&settings);
    f.manager.load_primary_asset(&id("Hero", "Knight"), &["UI"], None);

    assert_eq!(f.engine.last_request().unwrap().paths, squad_paths(true));
}

#[test]
fn test_recursive_preload_follows_references() {
    let f = squad(SETTINGS);
    let knight = id("Hero", "Knight");

    let shallow = f
        .manager
        .preload_primary_assets(&[knight.clone()], &["UI"], false, None)
        .unwrap();
    assert_eq!(shallow.requested_paths(), squad_paths(false).as_slice());

    let deep = f
        .manager
        .preload_primary_assets(&[knight], &["UI"], true, None)
        .unwrap();
    assert_eq!(deep.requested_paths(), squad_paths(true).as_slice());
}

#[test]
fn test_undrained_events_stay_bounded() {
    let mut f = Fixture::scanned();
    let knight = id("Hero", "Knight");

    for round in 0..3000 {
        let bundle = if round % 2 == 0 { "UI" } else { "Game" };
        f.manager.load_primary_asset(&knight, &[bundle], None);
        f.settle();
    }

    let events = f.manager.events();
    assert!(events.len() <= DEFAULT_EVENT_CAPACITY);
    // The newest events survive.
    assert_eq!(
        events.drain().last(),
        Some(&AssetManagerEvent::BundleStateChanged {
            id: knight,
            bundles: vec!["Game".to_string()],
        })
    );
}
