//! Entry points for panels and other mods.
//!
//! Policy edits go through [`PolicyEditor`], which keeps min and max
//! consistent (lowering a max below the min pulls the min down, and raising
//! a min above the max pushes the max up). Building changes are never applied
//! from here; they are queued with [`enqueue_action`] and run on the next
//! simulation step.

use bevy::prelude::*;

use crate::actions::{ActionSource, LevelAction, LevelActionQueue};
use crate::district_ops::{clear_district_overrides, DistrictPolicyChanged};
use crate::error::LevelError;
use crate::exemption::PopulationExemption;
use crate::host::{live_building, SimHost, SimulationHost};
use crate::policy::{DistrictFlags, LevelPolicy};
use crate::prefab_select::PrefabTargetSelector;
use crate::resolver::LevelResolver;
use crate::settings::LevelSettings;
use crate::types::{BuildingId, DistrictId, EffectiveLevelRange, LevelCategory};
use crate::TickCounter;

pub struct PolicyEditor<'a> {
    policy: &'a mut LevelPolicy,
    host: &'a dyn SimulationHost,
    changed_districts: Vec<DistrictId>,
}

impl<'a> PolicyEditor<'a> {
    pub fn new(policy: &'a mut LevelPolicy, host: &'a dyn SimulationHost) -> Self {
        Self {
            policy,
            host,
            changed_districts: Vec::new(),
        }
    }

    /// Districts whose policy was edited through this editor.
    pub fn changed_districts(&self) -> &[DistrictId] {
        &self.changed_districts
    }

    fn building_bounds(&self, id: BuildingId) -> Result<(LevelCategory, u8), LevelError> {
        let resolver = LevelResolver::new(&*self.policy, self.host);
        let category = resolver
            .category_of(id)
            .ok_or(LevelError::BuildingNotFound(id))?;
        Ok((category, resolver.absolute_max_level(id, category)))
    }

    fn building_range(&self, id: BuildingId, category: LevelCategory) -> EffectiveLevelRange {
        LevelResolver::new(&*self.policy, self.host).effective_range(id, category)
    }

    // -----------------------------------------------------------------------
    // Buildings
    // -----------------------------------------------------------------------

    pub fn set_building_min(
        &mut self,
        id: BuildingId,
        level: u8,
    ) -> Result<EffectiveLevelRange, LevelError> {
        let (category, absolute_max) = self.building_bounds(id)?;
        let level = level.min(absolute_max);
        self.policy.buildings.set_min_level(id, level, absolute_max);
        if self
            .policy
            .buildings
            .get(id)
            .is_some_and(|o| o.max_level < level)
        {
            self.policy.buildings.set_max_level(id, level, absolute_max);
        }
        Ok(self.building_range(id, category))
    }

    pub fn set_building_max(
        &mut self,
        id: BuildingId,
        level: u8,
    ) -> Result<EffectiveLevelRange, LevelError> {
        let (category, absolute_max) = self.building_bounds(id)?;
        let level = level.min(absolute_max);
        self.policy.buildings.set_max_level(id, level, absolute_max);
        if self
            .policy
            .buildings
            .get(id)
            .is_some_and(|o| o.min_level > level)
        {
            self.policy.buildings.set_min_level(id, level, absolute_max);
        }
        Ok(self.building_range(id, category))
    }

    /// Pin a building to one level by setting both bounds to it.
    pub fn lock_building_level(
        &mut self,
        id: BuildingId,
        level: u8,
    ) -> Result<EffectiveLevelRange, LevelError> {
        self.set_building_max(id, level)?;
        self.set_building_min(id, level)
    }

    /// Drop any override; the building falls back to district policy.
    pub fn unlock_building(&mut self, id: BuildingId) -> bool {
        self.policy.buildings.delete(id)
    }

    // -----------------------------------------------------------------------
    // Districts
    // -----------------------------------------------------------------------

    pub fn set_district_min(&mut self, district: DistrictId, category: LevelCategory, level: u8) {
        let districts = &mut self.policy.districts;
        districts.set_min_level(district, category, level);
        let min = districts.min_level(district, category).unwrap_or(0);
        if districts
            .max_level(district, category)
            .is_some_and(|max| max < min)
        {
            districts.set_max_level(district, category, min);
        }
        self.mark_changed(district);
    }

    pub fn set_district_max(&mut self, district: DistrictId, category: LevelCategory, level: u8) {
        let districts = &mut self.policy.districts;
        districts.set_max_level(district, category, level);
        let max = districts
            .max_level(district, category)
            .unwrap_or_else(|| category.absolute_default_max());
        if districts
            .min_level(district, category)
            .is_some_and(|min| min > max)
        {
            districts.set_min_level(district, category, max);
        }
        self.mark_changed(district);
    }

    /// Flags only affect future spawns, so no enforcement is triggered.
    pub fn set_district_flag(&mut self, district: DistrictId, flag: DistrictFlags, enabled: bool) {
        self.policy.districts.set_flag(district, flag, enabled);
    }

    /// Remove every building override in `district`.
    pub fn clear_district(&mut self, district: DistrictId) -> usize {
        let removed = clear_district_overrides(self.policy, self.host, district);
        if removed > 0 {
            self.mark_changed(district);
        }
        removed
    }

    fn mark_changed(&mut self, district: DistrictId) {
        if !self.changed_districts.contains(&district) {
            self.changed_districts.push(district);
        }
    }
}

// ---------------------------------------------------------------------------
// UI availability
// ---------------------------------------------------------------------------

/// Whether a forced one-step upgrade of `id` would currently succeed.
pub fn can_upgrade(
    host: &dyn SimulationHost,
    settings: &LevelSettings,
    exemption: &PopulationExemption,
    id: BuildingId,
) -> bool {
    can_step(host, settings, exemption, id, true)
}

pub fn can_downgrade(
    host: &dyn SimulationHost,
    settings: &LevelSettings,
    exemption: &PopulationExemption,
    id: BuildingId,
) -> bool {
    can_step(host, settings, exemption, id, false)
}

fn can_step(
    host: &dyn SimulationHost,
    settings: &LevelSettings,
    exemption: &PopulationExemption,
    id: BuildingId,
    up: bool,
) -> bool {
    let Some(building) = live_building(host, id) else {
        return false;
    };
    if building.is_upgrading() {
        return false;
    }
    let Some(prefab) = host.prefab(building.prefab) else {
        return false;
    };
    if prefab.ai.is_none() {
        return false;
    }
    let target = if up {
        building.level.checked_add(1)
    } else {
        building.level.checked_sub(1)
    };
    let Some(target) = target else {
        return false;
    };
    if target >= host.max_level_for_class(prefab) {
        return false;
    }
    if building.is_historical() || exemption.is_exempt(id) || settings.keep_prefab_when_missing {
        return true;
    }
    PrefabTargetSelector::has_candidate(host, id, target)
}

// ---------------------------------------------------------------------------
// World-level helpers
// ---------------------------------------------------------------------------

/// Edit policy against the installed host, then announce every district whose
/// policy changed so its buildings are brought into range.
///
/// Returns `None` when no [`SimHost`] is installed.
pub fn edit_policy<R>(world: &mut World, f: impl FnOnce(&mut PolicyEditor<'_>) -> R) -> Option<R> {
    let (result, changed) = world.resource_scope(|world, mut policy: Mut<LevelPolicy>| {
        let host = world.get_resource::<SimHost>()?;
        let mut editor = PolicyEditor::new(&mut *policy, &*host.0);
        let result = f(&mut editor);
        Some((result, editor.changed_districts))
    })?;
    for district in changed {
        world.send_event(DistrictPolicyChanged { district });
    }
    Some(result)
}

/// Queue a level action for the next simulation step.
pub fn enqueue_action(world: &mut World, source: ActionSource, action: LevelAction) {
    let tick = world.get_resource::<TickCounter>().map_or(0, |t| t.0);
    world
        .resource_mut::<LevelActionQueue>()
        .push(tick, source, action);
}

/// `(can_upgrade, can_downgrade)` for a building, for enabling UI controls.
pub fn step_availability(world: &World, id: BuildingId) -> (bool, bool) {
    let Some(host) = world.get_resource::<SimHost>() else {
        return (false, false);
    };
    let settings = world.resource::<LevelSettings>();
    let exemption = world.resource::<PopulationExemption>();
    (
        can_upgrade(&*host.0, settings, exemption, id),
        can_downgrade(&*host.0, settings, exemption, id),
    )
}
