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

use common::{id, Fixture};

#[test]
fn test_end_simulate_restores_bundle_state() {
    let mut f = Fixture::scanned();
    let knight = id("Hero", "Knight");
    let archer = id("Hero", "Archer");
    let arena = id("Map", "Arena");

    f.manager.load_primary_asset(&knight, &["UI"], None);
    f.manager.load_primary_asset(&arena, &[], None);
    f.settle();

    assert!(f.manager.begin_simulate());
    assert!(f.manager.is_simulating());

    f.manager.load_primary_asset(&knight, &["Game"], None);
    f.manager.load_primary_asset(&archer, &["UI"], None);
    f.manager.unload_primary_asset(&arena);
    f.settle();
    assert_eq!(f.loaded(&knight), Some(vec!["Game".to_string()]));

    assert!(f.manager.end_simulate());
    f.settle();

    assert_eq!(f.loaded(&knight), Some(vec!["UI".to_string()]));
    assert_eq!(f.loaded(&arena), Some(Vec::new()));
    assert_eq!(f.loaded(&archer), None);
    assert!(!f.manager.is_simulating());
}

#[test]
fn test_snapshot_captures_pending_requests() {
    let mut f = Fixture::scanned();
    let knight = id("Hero", "Knight");

    // Still loading when the simulation starts.
    f.manager.load_primary_asset(&knight, &["UI", "Game"], None);
    assert!(f.manager.begin_simulate());
    f.manager.unload_primary_asset(&knight);

    assert!(f.manager.end_simulate());
    f.settle();
    assert_eq!(
        f.loaded(&knight),
        Some(vec!["Game".to_string(), "UI".to_string()])
    );
}

#[test]
fn test_simulate_calls_must_pair() {
    let mut f = Fixture::scanned();

    assert!(!f.manager.end_simulate());
    assert!(f.manager.begin_simulate());
    assert!(!f.manager.begin_simulate());
    assert!(f.manager.end_simulate());
    assert!(!f.manager.end_simulate());
}
