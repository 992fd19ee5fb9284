//! District-wide operations: enforcing a changed district policy on every
//! building in the district, and clearing a district's building overrides.

use bevy::prelude::*;

use crate::actions::{ActionSource, LevelAction, LevelActionQueue};
use crate::host::SimulationHost;
use crate::policy::LevelPolicy;
use crate::transition::LevelEngine;
use crate::types::{BuildingId, DistrictId};
use crate::TickCounter;

/// Sent whenever a district's level policy changes. Turned into a queued
/// [`LevelAction::EnforceDistrict`] so the bulk pass runs on the simulation
/// step, not in the caller's context.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct DistrictPolicyChanged {
    pub district: DistrictId,
}

/// Outcome of one bulk enforcement pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DistrictEnforcement {
    pub moved: usize,
    pub in_range: usize,
    pub failed: usize,
}

impl DistrictEnforcement {
    pub fn examined(&self) -> usize {
        self.moved + self.in_range + self.failed
    }
}

/// Live buildings currently standing in `district`.
pub fn buildings_in_district(host: &dyn SimulationHost, district: DistrictId) -> Vec<BuildingId> {
    host.building_ids()
        .into_iter()
        .filter(|&id| {
            host.building(id)
                .is_some_and(|b| b.exists() && host.district_at(b.position) == district)
        })
        .collect()
}

/// Move every building in `district` into its effective range.
///
/// Failures are per building; one building that cannot move does not stop
/// the rest.
pub fn enforce_district(engine: &mut LevelEngine<'_>, district: DistrictId) -> DistrictEnforcement {
    let mut report = DistrictEnforcement::default();
    for id in buildings_in_district(&*engine.host, district) {
        match engine.enforce_building(id) {
            Ok(Some(_)) => report.moved += 1,
            Ok(None) => report.in_range += 1,
            Err(err) => {
                debug!("District {} enforcement skipped building {}: {}", district, id.0, err);
                report.failed += 1;
            }
        }
    }
    info!(
        "District {} enforcement: {} moved, {} already in range, {} failed",
        district, report.moved, report.in_range, report.failed
    );
    report
}

/// Remove every building override in `district`. Safe to repeat.
pub fn clear_district_overrides(
    policy: &mut LevelPolicy,
    host: &dyn SimulationHost,
    district: DistrictId,
) -> usize {
    let removed = policy.buildings.clear_district(district, |id| {
        host.building(id)
            .filter(|b| b.exists())
            .map(|b| host.district_at(b.position))
    });
    if removed > 0 {
        info!("Cleared {} building overrides in district {}", removed, district);
    }
    removed
}

/// Queue one enforcement pass per changed district, collapsing repeats
/// within the same step.
pub fn queue_district_enforcement(
    mut events: EventReader<DistrictPolicyChanged>,
    mut queue: ResMut<LevelActionQueue>,
    tick: Res<TickCounter>,
) {
    let mut districts: Vec<DistrictId> = events.read().map(|e| e.district).collect();
    districts.sort_unstable();
    districts.dedup();
    for district in districts {
        queue.push(tick.0, ActionSource::Engine, LevelAction::EnforceDistrict { district });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_harness::{EngineFixture, TestHost};
    use crate::types::{LevelCategory, Service};
    use bevy::math::Vec2;

    fn district_fixture() -> (EngineFixture, Vec<BuildingId>, BuildingId) {
        let mut host = TestHost::new();
        let inside = Vec2::new(5.0, 5.0);
        let outside = Vec2::new(50.0, 50.0);
        host.set_district_at(inside, 7);
        let mut prefabs = Vec::new();
        for level in 0..5 {
            prefabs.push(host.add_prefab(Service::Residential, level, 1, 1));
        }
        let a = host.spawn_building(prefabs[0], 0, inside);
        let b = host.spawn_building(prefabs[3], 3, inside);
        let c = host.spawn_building(prefabs[4], 4, outside);
        (EngineFixture::new(host), vec![a, b], c)
    }

    #[test]
    fn test_buildings_in_district_filters_by_position() {
        let (mut fx, inside, outside) = district_fixture();
        fx.host.release_building(inside[0]);
        let found = buildings_in_district(&fx.host, 7);
        assert_eq!(found, vec![inside[1]]);
        assert_eq!(buildings_in_district(&fx.host, 0), vec![outside]);
    }

    #[test]
    fn test_enforce_district_moves_only_that_district() {
        let (mut fx, inside, outside) = district_fixture();
        fx.policy
            .districts
            .set_min_level(7, LevelCategory::Residential, 1);
        fx.policy
            .districts
            .set_max_level(7, LevelCategory::Residential, 2);

        let report = enforce_district(&mut fx.engine(), 7);
        assert_eq!(report.moved, 2);
        assert_eq!(report.failed, 0);
        assert_eq!(fx.host.building_record(inside[0]).level, 1);
        assert_eq!(fx.host.building_record(inside[1]).level, 2);
        assert_eq!(fx.host.building_record(outside).level, 4);
    }

    #[test]
    fn test_enforce_district_counts_failures() {
        let (mut fx, inside, _) = district_fixture();
        fx.host.building_record_mut(inside[1]).flags |= crate::types::BuildingFlags::UPGRADING;
        fx.policy
            .districts
            .set_max_level(7, LevelCategory::Residential, 1);

        let report = enforce_district(&mut fx.engine(), 7);
        assert_eq!(report.failed, 1);
        assert_eq!(report.in_range, 1);
        assert_eq!(report.examined(), 2);
    }

    #[test]
    fn test_clear_district_overrides_is_idempotent() {
        let (mut fx, inside, outside) = district_fixture();
        for &id in inside.iter().chain([outside].iter()) {
            fx.policy.buildings.set_min_level(id, 2, 4);
        }
        assert_eq!(clear_district_overrides(&mut fx.policy, &fx.host, 7), 2);
        assert_eq!(clear_district_overrides(&mut fx.policy, &fx.host, 7), 0);
        assert!(fx.policy.buildings.contains(outside));
        assert_eq!(fx.policy.buildings.len(), 1);
    }
}
