use bevy::math::Vec2;
use bevy::prelude::*;

use crate::actions::{ActionSource, LevelAction, LevelActionQueue};
use crate::error::{Dependency, LevelError};
use crate::exemption::PopulationExemption;
use crate::host::{live_building, SimulationHost};
use crate::policy::{DistrictFlags, LevelPolicy};
use crate::prefab_select::PrefabTargetSelector;
use crate::resolver::LevelResolver;
use crate::settings::LevelSettings;
use crate::spawn::choose_spawn_level;
use crate::types::{
    AiKind, BuildingFlags, BuildingId, DistrictId, EffectiveLevelRange, LevelCategory, PrefabId,
};

/// A committed level change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelChange {
    pub building: BuildingId,
    pub from: u8,
    pub to: u8,
    pub prefab_swapped: bool,
}

/// What the host should do with its own upgrade handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpgradeOutcome {
    /// The engine applied the upgrade; skip the host's default path.
    Handled(LevelChange),
    /// The upgrade would break policy and was cancelled; skip the default path.
    Blocked,
    /// Not a building the engine manages; run the host's default path.
    PassThrough,
}

/// Borrowed view of everything a level transition touches.
///
/// Built fresh for each batch of hook calls; holds no state of its own.
pub struct LevelEngine<'a> {
    pub policy: &'a mut LevelPolicy,
    pub settings: &'a LevelSettings,
    pub exemption: &'a PopulationExemption,
    pub selector: &'a mut PrefabTargetSelector,
    pub queue: &'a mut LevelActionQueue,
    pub host: &'a mut dyn SimulationHost,
    /// Tick stamped on actions the engine enqueues.
    pub tick: u64,
}

impl<'a> LevelEngine<'a> {
    pub fn resolver(&self) -> LevelResolver<'_> {
        LevelResolver::new(&*self.policy, &*self.host)
    }

    pub fn range_for(&self, id: BuildingId) -> Option<EffectiveLevelRange> {
        self.resolver().range_for(id)
    }

    /// Historical buildings and externally managed ones keep their prefab.
    pub fn is_exempt(&self, id: BuildingId) -> bool {
        live_building(&*self.host, id).is_some_and(|b| b.is_historical())
            || self.exemption.is_exempt(id)
    }

    // -----------------------------------------------------------------------
    // Hook entry points
    // -----------------------------------------------------------------------

    /// Initial level for a building about to spawn at `position`.
    pub fn spawn_level(&self, district: DistrictId, category: LevelCategory, position: Vec2) -> u8 {
        choose_spawn_level(&self.policy.districts, district, category, position)
    }

    /// A building was just placed. Ids are recycled, so anything left over
    /// from the previous occupant of the slot goes.
    pub fn building_created(&mut self, id: BuildingId) {
        if self.policy.buildings.delete(id) {
            debug!("Dropped stale level override on recycled building {}", id.0);
        }
        self.selector.forget(id);

        let Some(building) = live_building(&*self.host, id) else {
            return;
        };
        let district = self.host.district_at(building.position);
        if self
            .policy
            .districts
            .has_flag(district, DistrictFlags::SPAWN_HISTORICAL)
        {
            if let Some(b) = self.host.building_mut(id) {
                b.flags.insert(BuildingFlags::HISTORICAL);
            }
        }
    }

    /// The slot was emptied. Its override and any queued actions go with it.
    pub fn building_released(&mut self, id: BuildingId) {
        self.policy.buildings.delete(id);
        self.selector.forget(id);
        let dropped = self.queue.discard_for(id);
        if dropped > 0 {
            debug!("Dropped {} queued actions for released building {}", dropped, id.0);
        }
    }

    /// Cap the host's natural level-up target at the effective maximum.
    pub fn clamp_level_up(&self, id: BuildingId, proposed: u8) -> u8 {
        let Some(range) = self.range_for(id) else {
            return proposed;
        };
        if proposed > range.max {
            debug!(
                "Building {} level-up capped: {} -> {}",
                id.0, proposed, range.max
            );
            return range.max;
        }
        proposed
    }

    /// The host is about to apply its own upgrade of `id`.
    pub fn upgrade_committing(&mut self, id: BuildingId) -> UpgradeOutcome {
        let Some(building) = live_building(&*self.host, id) else {
            return UpgradeOutcome::PassThrough;
        };
        let Some(prefab) = self.host.prefab(building.prefab) else {
            return UpgradeOutcome::PassThrough;
        };
        if prefab.ai != Some(AiKind::PrivateZoned) {
            return UpgradeOutcome::PassThrough;
        }
        let historical = building.is_historical();
        let current = building.level;
        let current_prefab = building.prefab;
        let Some(range) = self.range_for(id) else {
            return UpgradeOutcome::PassThrough;
        };

        // Historical buildings arrive with the new level already applied.
        let target = if historical {
            current
        } else {
            current.saturating_add(1)
        };
        if target > range.max {
            error!(
                "Building {} upgrade to {} exceeds maximum {}; cancelled",
                id.0, target, range.max
            );
            if historical {
                // The host already wrote the level; put it back and rebuild occupancy.
                match self.commit_level(id, range.max, current_prefab) {
                    Ok(change) => return UpgradeOutcome::Handled(change),
                    Err(err) => warn!("Revert of building {} failed: {}", id.0, err),
                }
            }
            self.cancel_upgrade(id);
            return UpgradeOutcome::Blocked;
        }

        let prefab_id = match self.replacement_prefab(id, target) {
            Ok(p) => p,
            Err(err) => {
                warn!("Upgrade of building {} aborted: {}", id.0, err);
                self.cancel_upgrade(id);
                return UpgradeOutcome::Blocked;
            }
        };
        match self.commit_level(id, target, prefab_id) {
            Ok(change) => {
                self.post_upgrade_check(id);
                UpgradeOutcome::Handled(change)
            }
            Err(err) => {
                warn!("Upgrade of building {} aborted: {}", id.0, err);
                UpgradeOutcome::Blocked
            }
        }
    }

    /// Queue one more upgrade if `id` is still below its floor.
    ///
    /// Never upgrades synchronously; the queued action runs on a later step.
    /// Returns whether an upgrade was queued.
    pub fn post_upgrade_check(&mut self, id: BuildingId) -> bool {
        let Some(building) = live_building(&*self.host, id) else {
            return false;
        };
        let level = building.level;
        let Some(range) = self.range_for(id) else {
            return false;
        };
        if level >= range.min || self.queue.has_pending_upgrade(id) {
            return false;
        }
        debug!(
            "Building {} at level {} is below minimum {}; queueing upgrade",
            id.0, level, range.min
        );
        self.queue
            .push(self.tick, ActionSource::Engine, LevelAction::Upgrade { building: id });
        true
    }

    /// Repair a building read back from a save whose level is at or above
    /// its class ceiling.
    pub fn building_loaded(&mut self, id: BuildingId) -> Option<LevelChange> {
        if !self.settings.validate_on_load {
            return None;
        }
        let building = live_building(&*self.host, id)?;
        let prefab_id = building.prefab;
        let level = building.level;
        let prefab = self.host.prefab(prefab_id)?;
        let class_max = self.host.max_level_for_class(prefab);
        if level < class_max {
            return None;
        }
        let repaired = class_max.saturating_sub(1);
        error!(
            "Building {} loaded at level {} with class maximum {}; reset to {}",
            id.0, level, class_max, repaired
        );
        match self.commit_level(id, repaired, prefab_id) {
            Ok(change) => Some(change),
            Err(err) => {
                warn!("Could not repair loaded building {}: {}", id.0, err);
                None
            }
        }
    }

    /// Per-tick abandonment suppression. Returns whether anything was reset.
    pub fn simulation_step(&mut self, id: BuildingId) -> bool {
        let settings = self.settings;
        let Some(building) = self.host.building_mut(id) else {
            return false;
        };
        if !building.exists() || !settings.suppresses_abandonment(building.is_historical()) {
            return false;
        }
        let changed =
            building.problem_timer != 0 || building.flags.contains(BuildingFlags::ABANDONED);
        building.problem_timer = 0;
        building.flags.remove(BuildingFlags::ABANDONED);
        changed
    }

    /// Record a historical status change. A building that stops being
    /// historical may now swap prefab, so its range is enforced again.
    pub fn historical_changed(&mut self, id: BuildingId, historical: bool) {
        let Some(building) = self.host.building_mut(id) else {
            return;
        };
        if !building.exists() {
            return;
        }
        building.flags.set(BuildingFlags::HISTORICAL, historical);
        if !historical {
            self.queue.push(
                self.tick,
                ActionSource::Engine,
                LevelAction::EnforceBuilding { building: id },
            );
        }
    }

    // -----------------------------------------------------------------------
    // Forced changes
    // -----------------------------------------------------------------------

    /// Instant-set `id` to `target`, swapping prefab unless exempt.
    pub fn force_level(&mut self, id: BuildingId, target: u8) -> Result<LevelChange, LevelError> {
        let building =
            live_building(&*self.host, id).ok_or(LevelError::BuildingNotFound(id))?;
        let upgrading = building.is_upgrading();
        let prefab = self
            .host
            .prefab(building.prefab)
            .ok_or(LevelError::MissingDependency {
                building: id,
                dependency: Dependency::Prefab,
            })?;
        let class_max = self.host.max_level_for_class(prefab);
        let has_ai = prefab.ai.is_some();

        if target >= class_max {
            error!(
                "Building {} forced to level {} but class maximum is {}",
                id.0, target, class_max
            );
            return Err(LevelError::LevelOutOfRange {
                building: id,
                requested: target,
                class_max,
            });
        }
        if upgrading {
            return Err(LevelError::UpgradeInProgress(id));
        }
        if !has_ai {
            return Err(LevelError::MissingDependency {
                building: id,
                dependency: Dependency::AiBehavior,
            });
        }

        let prefab_id = self.replacement_prefab(id, target)?;
        self.commit_level(id, target, prefab_id)
    }

    /// One step up, then the floor check.
    pub fn upgrade(&mut self, id: BuildingId) -> Result<LevelChange, LevelError> {
        let level = live_building(&*self.host, id)
            .ok_or(LevelError::BuildingNotFound(id))?
            .level;
        let change = self.force_level(id, level.saturating_add(1))?;
        self.post_upgrade_check(id);
        Ok(change)
    }

    pub fn downgrade(&mut self, id: BuildingId) -> Result<LevelChange, LevelError> {
        let building =
            live_building(&*self.host, id).ok_or(LevelError::BuildingNotFound(id))?;
        let level = building.level;
        if level == 0 {
            let class_max = self
                .host
                .prefab(building.prefab)
                .map(|p| self.host.max_level_for_class(p))
                .unwrap_or(0);
            return Err(LevelError::LevelOutOfRange {
                building: id,
                requested: 0,
                class_max,
            });
        }
        self.force_level(id, level - 1)
    }

    /// Move `id` into its effective range. `Ok(None)` if already inside.
    pub fn enforce_building(&mut self, id: BuildingId) -> Result<Option<LevelChange>, LevelError> {
        let level = live_building(&*self.host, id)
            .ok_or(LevelError::BuildingNotFound(id))?
            .level;
        let range = self.range_for(id).ok_or(LevelError::MissingDependency {
            building: id,
            dependency: Dependency::Prefab,
        })?;
        if range.contains(level) {
            return Ok(None);
        }
        self.force_level(id, range.clamp(level)).map(Some)
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn replacement_prefab(&mut self, id: BuildingId, target: u8) -> Result<PrefabId, LevelError> {
        let exempt = self.is_exempt(id);
        let current = live_building(&*self.host, id)
            .ok_or(LevelError::BuildingNotFound(id))?
            .prefab;
        let found = self.selector.select_target(
            &*self.host,
            id,
            target,
            self.settings.randomize_levels,
            exempt,
        );
        match found {
            Some(p) => Ok(p),
            None if self.settings.keep_prefab_when_missing => {
                warn!(
                    "No prefab for building {} at level {}; keeping current prefab",
                    id.0, target
                );
                Ok(current)
            }
            None => Err(LevelError::MissingDependency {
                building: id,
                dependency: Dependency::ReplacementPrefab,
            }),
        }
    }

    /// Write level and prefab, then recompute occupancy at the new level.
    fn commit_level(
        &mut self,
        id: BuildingId,
        level: u8,
        prefab_id: PrefabId,
    ) -> Result<LevelChange, LevelError> {
        let info = self
            .host
            .prefab(prefab_id)
            .cloned()
            .ok_or(LevelError::MissingDependency {
                building: id,
                dependency: Dependency::ReplacementPrefab,
            })?;
        let building = self
            .host
            .building_mut(id)
            .filter(|b| b.exists())
            .ok_or(LevelError::BuildingNotFound(id))?;

        let from = building.level;
        let prefab_swapped = building.prefab != prefab_id;
        building.level = level;
        building.upgrade_progress = 0;
        building.flags.remove(BuildingFlags::UPGRADING);
        building.prefab = prefab_id;
        if prefab_swapped {
            building.width = info.width;
            building.length = info.length;
        }
        let (width, length) = (building.width, building.length);

        let occupancy = self
            .host
            .compute_occupancy(&info, level, id.0 as u32, width, length);
        if let Some(b) = self.host.building_mut(id) {
            b.occupancy = occupancy;
        }
        self.host.commit_capacity(id, &occupancy);

        info!(
            "Building {} level {} -> {}{}",
            id.0,
            from,
            level,
            if prefab_swapped { " (prefab replaced)" } else { "" }
        );
        Ok(LevelChange {
            building: id,
            from,
            to: level,
            prefab_swapped,
        })
    }

    fn cancel_upgrade(&mut self, id: BuildingId) {
        if let Some(b) = self.host.building_mut(id) {
            b.flags.remove(BuildingFlags::UPGRADING);
            b.upgrade_progress = 0;
        }
    }
}
