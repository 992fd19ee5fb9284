//! Sparse per-building level overrides.

use std::collections::HashMap;

use crate::types::{BuildingId, DistrictId};

/// Min/max override for one building. 0-based levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildingLevelOverride {
    pub min_level: u8,
    pub max_level: u8,
}

impl BuildingLevelOverride {
    /// Whether these values carry no information beyond "no override".
    pub fn is_noop(&self, absolute_max: u8) -> bool {
        self.min_level == 0 && self.max_level >= absolute_max
    }
}

/// Overrides keyed by building.
///
/// An entry exists only while `min_level > 0` or `max_level` is below the
/// building's absolute maximum; setters delete entries that collapse back to
/// the default, so lookups never have to scan for no-op entries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildingOverrides {
    entries: HashMap<BuildingId, BuildingLevelOverride>,
}

impl BuildingOverrides {
    pub fn get(&self, id: BuildingId) -> Option<BuildingLevelOverride> {
        self.entries.get(&id).copied()
    }

    pub fn contains(&self, id: BuildingId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (BuildingId, BuildingLevelOverride)> + '_ {
        self.entries.iter().map(|(&id, &o)| (id, o))
    }

    /// Set the minimum level. `absolute_max` is the building's 0-based ceiling.
    pub fn set_min_level(&mut self, id: BuildingId, min_level: u8, absolute_max: u8) {
        let min_level = min_level.min(absolute_max);
        match self.entries.get_mut(&id) {
            Some(entry) => {
                entry.min_level = min_level;
                if entry.is_noop(absolute_max) {
                    self.entries.remove(&id);
                }
            }
            None if min_level > 0 => {
                self.entries.insert(
                    id,
                    BuildingLevelOverride {
                        min_level,
                        max_level: absolute_max,
                    },
                );
            }
            None => {}
        }
    }

    /// Set the maximum level. `absolute_max` is the building's 0-based ceiling.
    pub fn set_max_level(&mut self, id: BuildingId, max_level: u8, absolute_max: u8) {
        let max_level = max_level.min(absolute_max);
        match self.entries.get_mut(&id) {
            Some(entry) => {
                entry.max_level = max_level;
                if entry.is_noop(absolute_max) {
                    self.entries.remove(&id);
                }
            }
            None if max_level < absolute_max => {
                self.entries.insert(
                    id,
                    BuildingLevelOverride {
                        min_level: 0,
                        max_level,
                    },
                );
            }
            None => {}
        }
    }

    /// Insert a persisted entry as-is. Used by the save codec only; the
    /// post-load prune drops entries that no longer mean anything.
    pub(crate) fn insert_raw(&mut self, id: BuildingId, entry: BuildingLevelOverride) {
        self.entries.insert(id, entry);
    }

    /// Returns whether an override was removed.
    pub fn delete(&mut self, id: BuildingId) -> bool {
        self.entries.remove(&id).is_some()
    }

    /// Remove every override whose building currently resolves to `district`.
    ///
    /// `district_of` returns `None` for buildings the host no longer knows.
    /// Returns the number of overrides removed.
    pub fn clear_district(
        &mut self,
        district: DistrictId,
        district_of: impl Fn(BuildingId) -> Option<DistrictId>,
    ) -> usize {
        let victims: Vec<BuildingId> = self
            .entries
            .keys()
            .copied()
            .filter(|&id| district_of(id) == Some(district))
            .collect();
        for id in &victims {
            self.entries.remove(id);
        }
        victims.len()
    }

    /// Remove overrides for buildings the host reports as gone.
    pub fn prune_dead(&mut self, exists: impl Fn(BuildingId) -> bool) -> usize {
        let before = self.entries.len();
        self.entries.retain(|&id, _| exists(id));
        before - self.entries.len()
    }

    /// Remove overrides that have collapsed to "no override" for their building.
    ///
    /// `absolute_max_of` returns the 0-based ceiling, or `None` when unknown
    /// (such entries are kept).
    pub fn prune_noops(&mut self, absolute_max_of: impl Fn(BuildingId) -> Option<u8>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|&id, entry| match absolute_max_of(id) {
            Some(max) => !entry.is_noop(max),
            None => true,
        });
        before - self.entries.len()
    }

    /// Flatten into three parallel columns (ids, mins, maxes), sorted by id.
    pub fn to_columns(&self) -> (Vec<u32>, Vec<u8>, Vec<u8>) {
        let mut sorted: Vec<(BuildingId, BuildingLevelOverride)> = self.iter().collect();
        sorted.sort_by_key(|(id, _)| *id);
        let ids = sorted.iter().map(|(id, _)| id.0 as u32).collect();
        let mins = sorted.iter().map(|(_, o)| o.min_level).collect();
        let maxes = sorted.iter().map(|(_, o)| o.max_level).collect();
        (ids, mins, maxes)
    }
}
