use super::*;
use crate::error::{Dependency, LevelError};
use crate::test_harness::{EngineFixture, TestHost};
use crate::types::{BuildingFlags, BuildingId, LevelCategory, Service};
use bevy::math::Vec2;

fn fixture() -> (EngineFixture, BuildingId) {
    let mut host = TestHost::new();
    host.set_district_at(Vec2::ZERO, 3);
    for level in 0..3 {
        host.add_prefab(Service::Commercial, level, 1, 2);
    }
    let id = host.spawn_building(crate::types::PrefabId(0), 0, Vec2::ZERO);
    (EngineFixture::new(host), id)
}

#[test]
fn test_level_action_serialization() {
    let action = LevelAction::ForceLevel {
        building: BuildingId(12),
        level: 3,
    };
    let json = serde_json::to_string(&action).unwrap();
    let decoded: LevelAction = serde_json::from_str(&json).unwrap();
    assert_eq!(action, decoded);

    let action = LevelAction::EnforceDistrict { district: 127 };
    let json = serde_json::to_string(&action).unwrap();
    let decoded: LevelAction = serde_json::from_str(&json).unwrap();
    assert_eq!(action, decoded);
}

#[test]
fn test_action_result_serialization() {
    let res = ActionResult::PartiallyApplied {
        stuck: 2,
        examined: 5,
    };
    let json = serde_json::to_string(&res).unwrap();
    let decoded: ActionResult = serde_json::from_str(&json).unwrap();
    assert_eq!(res, decoded);
    assert!(decoded.is_success());
    assert_eq!(decoded.stuck_buildings(), 2);
    assert!(decoded.error().is_none());

    let res = ActionResult::Rejected(ActionError::UpgradeInProgress);
    assert!(!res.is_success());
    assert_eq!(res.error(), Some(&ActionError::UpgradeInProgress));
    assert_eq!(res.stuck_buildings(), 0);
}

#[test]
fn test_action_target_building() {
    assert_eq!(
        LevelAction::Upgrade {
            building: BuildingId(4)
        }
        .building(),
        Some(BuildingId(4))
    );
    assert_eq!(LevelAction::EnforceDistrict { district: 1 }.building(), None);
}

#[test]
fn test_level_errors_map_to_action_errors() {
    let id = BuildingId(1);
    assert_eq!(
        ActionError::from(&LevelError::BuildingNotFound(id)),
        ActionError::NotFound
    );
    assert_eq!(
        ActionError::from(&LevelError::MissingDependency {
            building: id,
            dependency: Dependency::ReplacementPrefab
        }),
        ActionError::DependencyMissing
    );
    assert_eq!(
        ActionError::from(&LevelError::LevelOutOfRange {
            building: id,
            requested: 9,
            class_max: 3
        }),
        ActionError::LevelOutOfRange
    );
}

#[test]
fn test_execute_force_level() {
    let (mut fx, id) = fixture();
    let result = execute_single(
        &LevelAction::ForceLevel {
            building: id,
            level: 2,
        },
        &mut fx.engine(),
    );
    assert_eq!(result, ActionResult::Applied);
    assert_eq!(fx.host.building_record(id).level, 2);
}

#[test]
fn test_execute_on_released_building_is_a_noop() {
    let (mut fx, id) = fixture();
    fx.host.release_building(id);
    let result = execute_single(&LevelAction::Upgrade { building: id }, &mut fx.engine());
    assert_eq!(result, ActionResult::Rejected(ActionError::NotFound));
    assert!(fx.host.commits.is_empty());
}

#[test]
fn test_execute_upgrade_and_downgrade() {
    let (mut fx, id) = fixture();
    let mut engine = fx.engine();
    assert!(execute_single(&LevelAction::Upgrade { building: id }, &mut engine).is_success());
    assert!(execute_single(&LevelAction::Upgrade { building: id }, &mut engine).is_success());
    assert_eq!(
        execute_single(&LevelAction::Upgrade { building: id }, &mut engine),
        ActionResult::Rejected(ActionError::LevelOutOfRange)
    );
    assert!(execute_single(&LevelAction::Downgrade { building: id }, &mut engine).is_success());
    assert_eq!(fx.host.building_record(id).level, 1);
}

#[test]
fn test_execute_enforce_district_reports_failures() {
    let (mut fx, id) = fixture();
    let other = fx
        .host
        .spawn_building(crate::types::PrefabId(2), 2, Vec2::ZERO);
    fx.host.building_record_mut(other).flags |= BuildingFlags::UPGRADING;
    fx.policy
        .districts
        .set_min_level(3, LevelCategory::Workplace, 1);
    fx.policy
        .districts
        .set_max_level(3, LevelCategory::Workplace, 1);

    let result = execute_single(
        &LevelAction::EnforceDistrict { district: 3 },
        &mut fx.engine(),
    );
    assert!(result.is_success());
    assert_eq!(
        result,
        ActionResult::PartiallyApplied {
            stuck: 1,
            examined: 2
        }
    );
    assert_eq!(fx.host.building_record(id).level, 1);
    assert_eq!(fx.host.building_record(other).level, 2);
}
