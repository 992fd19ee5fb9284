use bevy::math::Vec2;

use super::*;
use crate::actions::{ActionSource, LevelAction};
use crate::error::{Dependency, LevelError};
use crate::host::SimulationHost;
use crate::policy::DistrictFlags;
use crate::test_harness::{EngineFixture, TestHost};
use crate::types::{BuildingFlags, BuildingId, LevelCategory, PrefabId, Service};

const HOME: Vec2 = Vec2::new(10.0, 10.0);
const DISTRICT: u8 = 1;

/// Residential prefabs for every level at 2x2, one building at level 0.
fn residential() -> (EngineFixture, BuildingId, Vec<PrefabId>) {
    let mut host = TestHost::new();
    host.set_district_at(HOME, DISTRICT);
    let prefabs: Vec<PrefabId> = (0..5)
        .map(|level| host.add_prefab(Service::Residential, level, 2, 2))
        .collect();
    let id = host.spawn_building(prefabs[0], 0, HOME);
    (EngineFixture::new(host), id, prefabs)
}

// ---------------------------------------------------------------------------
// Forced level changes
// ---------------------------------------------------------------------------

#[test]
fn test_force_level_at_class_maximum_is_rejected() {
    let (mut fx, id, _) = residential();
    let before = fx.host.building_record(id).clone();

    let result = fx.engine().force_level(id, 5);
    assert_eq!(
        result,
        Err(LevelError::LevelOutOfRange {
            building: id,
            requested: 5,
            class_max: 5
        })
    );
    assert!(fx.engine().force_level(id, 200).is_err());
    assert_eq!(*fx.host.building_record(id), before);
    assert!(fx.host.commits.is_empty());
}

#[test]
fn test_force_level_rejected_while_upgrading() {
    let (mut fx, id, _) = residential();
    fx.host.building_record_mut(id).flags |= BuildingFlags::UPGRADING;
    assert_eq!(
        fx.engine().force_level(id, 2),
        Err(LevelError::UpgradeInProgress(id))
    );
    assert_eq!(fx.host.building_record(id).level, 0);
}

#[test]
fn test_force_level_swaps_prefab_and_recomputes_occupancy() {
    let (mut fx, id, prefabs) = residential();
    fx.host.building_record_mut(id).upgrade_progress = 7;

    let change = fx.engine().force_level(id, 3).expect("level 3 prefab exists");
    assert_eq!(
        change,
        LevelChange {
            building: id,
            from: 0,
            to: 3,
            prefab_swapped: true
        }
    );

    let record = fx.host.building_record(id).clone();
    assert_eq!(record.level, 3);
    assert_eq!(record.prefab, prefabs[3]);
    assert_eq!(record.upgrade_progress, 0);

    let info = fx.host.prefab(prefabs[3]).cloned().unwrap();
    let expected = fx.host.compute_occupancy(&info, 3, id.0 as u32, 2, 2);
    assert_eq!(record.occupancy, expected);
    assert_eq!(fx.host.commits, vec![(id, expected)]);
}

#[test]
fn test_force_level_downwards() {
    let (mut fx, id, prefabs) = residential();
    fx.engine().force_level(id, 4).unwrap();
    fx.engine().force_level(id, 1).unwrap();
    assert_eq!(fx.host.building_record(id).level, 1);
    assert_eq!(fx.host.building_record(id).prefab, prefabs[1]);
    assert_eq!(fx.host.commits.len(), 2);
}

#[test]
fn test_historical_building_keeps_prefab() {
    let (mut fx, id, prefabs) = residential();
    fx.host.building_record_mut(id).flags |= BuildingFlags::HISTORICAL;
    let change = fx.engine().force_level(id, 2).unwrap();
    assert!(!change.prefab_swapped);
    assert_eq!(fx.host.building_record(id).prefab, prefabs[0]);
    assert_eq!(fx.host.building_record(id).level, 2);
}

#[test]
fn test_externally_managed_building_keeps_prefab() {
    let (mut fx, id, prefabs) = residential();
    fx.exemption.install(move |b| b == id);
    fx.engine().force_level(id, 2).unwrap();
    assert_eq!(fx.host.building_record(id).prefab, prefabs[0]);
}

#[test]
fn test_missing_replacement_aborts_without_best_effort() {
    let mut host = TestHost::new();
    let p0 = host.add_prefab(Service::Residential, 0, 3, 3);
    let id = host.spawn_building(p0, 0, HOME);
    let mut fx = EngineFixture::new(host);

    assert_eq!(
        fx.engine().force_level(id, 2),
        Err(LevelError::MissingDependency {
            building: id,
            dependency: Dependency::ReplacementPrefab
        })
    );
    assert_eq!(fx.host.building_record(id).level, 0);

    fx.settings.keep_prefab_when_missing = true;
    let change = fx.engine().force_level(id, 2).unwrap();
    assert!(!change.prefab_swapped);
    assert_eq!(fx.host.building_record(id).level, 2);
}

#[test]
fn test_missing_ai_behaviour_aborts() {
    let (mut fx, id, prefabs) = residential();
    fx.host.prefab_mut(prefabs[0]).ai = None;
    assert_eq!(
        fx.engine().force_level(id, 1),
        Err(LevelError::MissingDependency {
            building: id,
            dependency: Dependency::AiBehavior
        })
    );
}

#[test]
fn test_released_building_is_not_found() {
    let (mut fx, id, _) = residential();
    fx.host.release_building(id);
    assert_eq!(
        fx.engine().force_level(id, 1),
        Err(LevelError::BuildingNotFound(id))
    );
    assert_eq!(
        fx.engine().upgrade(id),
        Err(LevelError::BuildingNotFound(id))
    );
}

#[test]
fn test_downgrade_at_level_zero_is_out_of_range() {
    let (mut fx, id, _) = residential();
    assert!(matches!(
        fx.engine().downgrade(id),
        Err(LevelError::LevelOutOfRange { requested: 0, .. })
    ));
}

#[test]
fn test_enforce_building_moves_into_range() {
    let (mut fx, id, _) = residential();
    fx.policy
        .districts
        .set_min_level(DISTRICT, LevelCategory::Residential, 2);
    assert_eq!(fx.engine().enforce_building(id).unwrap().map(|c| c.to), Some(2));
    assert_eq!(fx.engine().enforce_building(id), Ok(None));
}

// ---------------------------------------------------------------------------
// Natural growth
// ---------------------------------------------------------------------------

#[test]
fn test_clamp_level_up_caps_at_effective_max() {
    let (mut fx, id, _) = residential();
    fx.policy
        .districts
        .set_max_level(DISTRICT, LevelCategory::Residential, 2);
    let engine = fx.engine();
    assert_eq!(engine.clamp_level_up(id, 4), 2);
    assert_eq!(engine.clamp_level_up(id, 1), 1);
}

#[test]
fn test_upgrade_committing_takes_over_default_path() {
    let (mut fx, id, prefabs) = residential();
    fx.host.building_record_mut(id).flags |= BuildingFlags::UPGRADING;

    let outcome = fx.engine().upgrade_committing(id);
    assert!(matches!(outcome, UpgradeOutcome::Handled(c) if c.to == 1));
    let record = fx.host.building_record(id);
    assert_eq!(record.level, 1);
    assert_eq!(record.prefab, prefabs[1]);
    assert!(!record.is_upgrading());
}

#[test]
fn test_upgrade_committing_historical_does_not_double_increment() {
    let (mut fx, id, prefabs) = residential();
    {
        let record = fx.host.building_record_mut(id);
        record.flags |= BuildingFlags::HISTORICAL;
        record.level = 2;
    }
    let outcome = fx.engine().upgrade_committing(id);
    assert!(matches!(outcome, UpgradeOutcome::Handled(c) if c.to == 2));
    assert_eq!(fx.host.building_record(id).level, 2);
    assert_eq!(fx.host.building_record(id).prefab, prefabs[0]);
}

#[test]
fn test_upgrade_committing_blocked_by_policy_change() {
    let (mut fx, id, _) = residential();
    fx.host.building_record_mut(id).flags |= BuildingFlags::UPGRADING;
    fx.policy.buildings.set_max_level(id, 0, 4);

    assert_eq!(fx.engine().upgrade_committing(id), UpgradeOutcome::Blocked);
    let record = fx.host.building_record(id);
    assert_eq!(record.level, 0);
    assert!(!record.is_upgrading());
    assert!(fx.host.commits.is_empty());
}

#[test]
fn test_upgrade_committing_reverts_historical_level_above_maximum() {
    let (mut fx, id, prefabs) = residential();
    {
        let record = fx.host.building_record_mut(id);
        record.flags |= BuildingFlags::HISTORICAL | BuildingFlags::UPGRADING;
        record.level = 2;
    }
    fx.policy.buildings.set_max_level(id, 1, 4);

    let outcome = fx.engine().upgrade_committing(id);
    assert!(matches!(outcome, UpgradeOutcome::Handled(c) if c.to == 1));
    let record = fx.host.building_record(id);
    assert_eq!(record.level, 1);
    assert_eq!(record.prefab, prefabs[0]);
    assert!(!record.is_upgrading());
    assert_eq!(fx.host.commits.len(), 1);
}

#[test]
fn test_upgrade_committing_passes_through_other_buildings() {
    let mut host = TestHost::new();
    let park = host.add_prefab(Service::Other, 0, 1, 1);
    let id = host.spawn_building(park, 0, HOME);
    let mut fx = EngineFixture::new(host);
    assert_eq!(fx.engine().upgrade_committing(id), UpgradeOutcome::PassThrough);
    assert_eq!(
        fx.engine().upgrade_committing(BuildingId(77)),
        UpgradeOutcome::PassThrough
    );
}

#[test]
fn test_upgrade_below_floor_queues_exactly_one_correction() {
    let (mut fx, id, _) = residential();
    fx.policy.buildings.set_min_level(id, 3, 4);

    let outcome = fx.engine().upgrade_committing(id);
    assert!(matches!(outcome, UpgradeOutcome::Handled(c) if c.to == 1));
    // Only one step was applied synchronously.
    assert_eq!(fx.host.building_record(id).level, 1);
    assert_eq!(fx.queue.len(), 1);
    assert_eq!(
        fx.queue.front().map(|q| q.action),
        Some(LevelAction::Upgrade { building: id })
    );

    assert!(!fx.engine().post_upgrade_check(id));
    assert_eq!(fx.queue.len(), 1);
}

#[test]
fn test_upgrade_at_floor_queues_nothing() {
    let (mut fx, id, _) = residential();
    fx.policy.buildings.set_min_level(id, 1, 4);
    fx.engine().upgrade(id).unwrap();
    assert!(fx.queue.is_empty());
}

// ---------------------------------------------------------------------------
// Load validation and per-tick hooks
// ---------------------------------------------------------------------------

#[test]
fn test_building_loaded_clamps_to_class_maximum() {
    let (mut fx, id, _) = residential();
    fx.host.building_record_mut(id).level = 7;
    let change = fx.engine().building_loaded(id).expect("level repaired");
    assert_eq!(change.to, 4);
    assert_eq!(fx.host.building_record(id).level, 4);
    assert!(fx.engine().building_loaded(id).is_none());
}

#[test]
fn test_building_loaded_respects_validation_switch() {
    let (mut fx, id, _) = residential();
    fx.settings.validate_on_load = false;
    fx.host.building_record_mut(id).level = 5;
    assert!(fx.engine().building_loaded(id).is_none());
    assert_eq!(fx.host.building_record(id).level, 5);
}

#[test]
fn test_simulation_step_suppresses_abandonment() {
    let (mut fx, id, _) = residential();
    {
        let record = fx.host.building_record_mut(id);
        record.problem_timer = 40;
        record.flags |= BuildingFlags::ABANDONED;
    }
    assert!(!fx.engine().simulation_step(id));
    assert_eq!(fx.host.building_record(id).problem_timer, 40);

    fx.settings.no_abandonment_historical = true;
    assert!(!fx.engine().simulation_step(id));

    fx.host.building_record_mut(id).flags |= BuildingFlags::HISTORICAL;
    assert!(fx.engine().simulation_step(id));
    let record = fx.host.building_record(id);
    assert_eq!(record.problem_timer, 0);
    assert!(!record.flags.contains(BuildingFlags::ABANDONED));
    assert!(!fx.engine().simulation_step(id));
}

#[test]
fn test_clearing_historical_queues_enforcement() {
    let (mut fx, id, _) = residential();
    fx.engine().historical_changed(id, true);
    assert!(fx.host.building_record(id).is_historical());
    assert!(fx.queue.is_empty());

    fx.engine().historical_changed(id, false);
    assert!(!fx.host.building_record(id).is_historical());
    assert_eq!(
        fx.queue.front().map(|q| q.action),
        Some(LevelAction::EnforceBuilding { building: id })
    );
}

#[test]
fn test_building_created_drops_stale_override_and_applies_district_flag() {
    let (mut fx, id, _) = residential();
    fx.policy.buildings.set_min_level(id, 2, 4);
    fx.policy
        .districts
        .set_flag(DISTRICT, DistrictFlags::SPAWN_HISTORICAL, true);

    fx.engine().building_created(id);
    assert!(!fx.policy.buildings.contains(id));
    assert!(fx.host.building_record(id).is_historical());
}

#[test]
fn test_building_released_deletes_override() {
    let (mut fx, id, _) = residential();
    fx.policy.buildings.set_max_level(id, 1, 4);
    fx.queue.push(0, ActionSource::Player, LevelAction::Upgrade { building: id });
    fx.host.release_building(id);
    fx.engine().building_released(id);
    assert!(fx.policy.buildings.is_empty());
    assert!(fx.queue.is_empty());
}

#[test]
fn test_spawn_level_uses_district_floor() {
    let (mut fx, _, _) = residential();
    fx.policy
        .districts
        .set_min_level(DISTRICT, LevelCategory::Residential, 1);
    assert_eq!(
        fx.engine()
            .spawn_level(DISTRICT, LevelCategory::Residential, Vec2::new(3.0, 4.0)),
        1
    );
}
