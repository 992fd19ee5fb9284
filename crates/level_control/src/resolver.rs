//! Effective level range resolution.
//!
//! Precedence: a building override (which always stores both bounds), then
//! the district default for the building's current district, then the
//! absolute category default. The result is further capped by the prefab
//! class ceiling. Nothing is cached; policy can change between any two ticks.

use crate::host::{live_building, SimulationHost};
use crate::policy::LevelPolicy;
use crate::types::{BuildingId, DistrictId, EffectiveLevelRange, LevelCategory};

pub struct LevelResolver<'a> {
    policy: &'a LevelPolicy,
    host: &'a dyn SimulationHost,
}

impl<'a> LevelResolver<'a> {
    pub fn new(policy: &'a LevelPolicy, host: &'a dyn SimulationHost) -> Self {
        Self { policy, host }
    }

    /// District the building currently stands in.
    pub fn district_of(&self, id: BuildingId) -> Option<DistrictId> {
        live_building(self.host, id).map(|b| self.host.district_at(b.position))
    }

    /// Policy category of the building's prefab.
    pub fn category_of(&self, id: BuildingId) -> Option<LevelCategory> {
        let building = live_building(self.host, id)?;
        let prefab = self.host.prefab(building.prefab)?;
        Some(prefab.service.category())
    }

    /// Class ceiling from the host, 1-based (a value of 3 allows levels 0..=2).
    pub fn absolute_max_for_class(&self, id: BuildingId) -> Option<u8> {
        let building = live_building(self.host, id)?;
        let prefab = self.host.prefab(building.prefab)?;
        Some(self.host.max_level_for_class(prefab))
    }

    /// Highest 0-based level the building's class allows.
    pub fn absolute_max_level(&self, id: BuildingId, category: LevelCategory) -> u8 {
        match self.absolute_max_for_class(id) {
            Some(max) => max.saturating_sub(1),
            None => category.absolute_default_max(),
        }
    }

    pub fn effective_max(&self, id: BuildingId, category: LevelCategory) -> u8 {
        let policy_max = match self.policy.buildings.get(id) {
            Some(o) => o.max_level,
            None => self
                .district_of(id)
                .and_then(|d| self.policy.districts.max_level(d, category))
                .unwrap_or_else(|| category.absolute_default_max()),
        };
        policy_max.min(self.absolute_max_level(id, category))
    }

    pub fn effective_min(&self, id: BuildingId, category: LevelCategory) -> u8 {
        let policy_min = match self.policy.buildings.get(id) {
            Some(o) => o.min_level,
            None => self
                .district_of(id)
                .and_then(|d| self.policy.districts.min_level(d, category))
                .unwrap_or(0),
        };
        policy_min.min(self.absolute_max_level(id, category))
    }

    /// Both bounds; a minimum above the maximum is pulled down to it.
    pub fn effective_range(&self, id: BuildingId, category: LevelCategory) -> EffectiveLevelRange {
        let max = self.effective_max(id, category);
        let min = self.effective_min(id, category).min(max);
        EffectiveLevelRange { min, max }
    }

    /// Range for a live building using its own category, if it can be read.
    pub fn range_for(&self, id: BuildingId) -> Option<EffectiveLevelRange> {
        let category = self.category_of(id)?;
        Some(self.effective_range(id, category))
    }
}
