//! Dense per-district level defaults and flags.

use bevy::prelude::*;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::config::{MAX_DISTRICTS, MAX_RESIDENTIAL_LEVEL, MAX_WORKPLACE_LEVEL};
use crate::types::{DistrictId, LevelCategory};

bitflags! {
    /// Per-district behaviour switches, persisted as one byte per district.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct DistrictFlags: u8 {
        /// New buildings spawn at a random level inside the district range.
        const RANDOM_SPAWN_LEVELS = 1 << 0;
        /// New buildings spawn flagged historical.
        const SPAWN_HISTORICAL = 1 << 1;
    }
}

/// Parallel per-district arrays, always [`MAX_DISTRICTS`] long once initialized.
#[derive(Debug, Clone, PartialEq)]
pub struct DistrictLevelPolicies {
    pub min_res: Vec<u8>,
    pub max_res: Vec<u8>,
    pub min_work: Vec<u8>,
    pub max_work: Vec<u8>,
    pub flags: Vec<DistrictFlags>,
}

impl Default for DistrictLevelPolicies {
    fn default() -> Self {
        Self {
            min_res: vec![0; MAX_DISTRICTS],
            max_res: vec![MAX_RESIDENTIAL_LEVEL; MAX_DISTRICTS],
            min_work: vec![0; MAX_DISTRICTS],
            max_work: vec![MAX_WORKPLACE_LEVEL; MAX_DISTRICTS],
            flags: vec![DistrictFlags::empty(); MAX_DISTRICTS],
        }
    }
}

impl DistrictLevelPolicies {
    /// Arrays not yet populated; lookups fall through to absolute defaults.
    pub fn uninitialized() -> Self {
        Self {
            min_res: Vec::new(),
            max_res: Vec::new(),
            min_work: Vec::new(),
            max_work: Vec::new(),
            flags: Vec::new(),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.min_res.len() == MAX_DISTRICTS
            && self.max_res.len() == MAX_DISTRICTS
            && self.min_work.len() == MAX_DISTRICTS
            && self.max_work.len() == MAX_DISTRICTS
    }

    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }

    fn min_array(&self, category: LevelCategory) -> &[u8] {
        match category {
            LevelCategory::Residential => &self.min_res,
            LevelCategory::Workplace => &self.min_work,
        }
    }

    fn max_array(&self, category: LevelCategory) -> &[u8] {
        match category {
            LevelCategory::Residential => &self.max_res,
            LevelCategory::Workplace => &self.max_work,
        }
    }

    /// District minimum, or `None` while the arrays are uninitialized.
    pub fn min_level(&self, district: DistrictId, category: LevelCategory) -> Option<u8> {
        if !self.is_initialized() {
            return None;
        }
        self.min_array(category).get(district as usize).copied()
    }

    /// District maximum, or `None` while the arrays are uninitialized.
    pub fn max_level(&self, district: DistrictId, category: LevelCategory) -> Option<u8> {
        if !self.is_initialized() {
            return None;
        }
        self.max_array(category).get(district as usize).copied()
    }

    pub fn flags(&self, district: DistrictId) -> DistrictFlags {
        self.flags
            .get(district as usize)
            .copied()
            .unwrap_or_default()
    }

    pub fn has_flag(&self, district: DistrictId, flag: DistrictFlags) -> bool {
        self.flags(district).contains(flag)
    }

    pub fn set_min_level(&mut self, district: DistrictId, category: LevelCategory, level: u8) {
        let level = level.min(category.absolute_default_max());
        let array = match category {
            LevelCategory::Residential => &mut self.min_res,
            LevelCategory::Workplace => &mut self.min_work,
        };
        if let Some(slot) = array.get_mut(district as usize) {
            *slot = level;
        }
    }

    pub fn set_max_level(&mut self, district: DistrictId, category: LevelCategory, level: u8) {
        let level = level.min(category.absolute_default_max());
        let array = match category {
            LevelCategory::Residential => &mut self.max_res,
            LevelCategory::Workplace => &mut self.max_work,
        };
        if let Some(slot) = array.get_mut(district as usize) {
            *slot = level;
        }
    }

    pub fn set_flag(&mut self, district: DistrictId, flag: DistrictFlags, enabled: bool) {
        if let Some(slot) = self.flags.get_mut(district as usize) {
            slot.set(flag, enabled);
        }
    }

    /// Reset one district to defaults.
    pub fn reset_district(&mut self, district: DistrictId) {
        let defaults = Self::default();
        let i = district as usize;
        if i >= MAX_DISTRICTS || !self.is_initialized() {
            return;
        }
        self.min_res[i] = defaults.min_res[i];
        self.max_res[i] = defaults.max_res[i];
        self.min_work[i] = defaults.min_work[i];
        self.max_work[i] = defaults.max_work[i];
        if let Some(flags) = self.flags.get_mut(i) {
            *flags = DistrictFlags::empty();
        }
    }

    /// Regenerate any array that is not exactly [`MAX_DISTRICTS`] long.
    ///
    /// Short arrays are discarded outright rather than padded; long ones are
    /// truncated. Returns the names of the arrays that were regenerated.
    pub fn repair(&mut self) -> Vec<&'static str> {
        let defaults = Self::default();
        let mut repaired = Vec::new();

        repair_array(&mut self.min_res, &defaults.min_res, "min_res", &mut repaired);
        repair_array(&mut self.max_res, &defaults.max_res, "max_res", &mut repaired);
        repair_array(&mut self.min_work, &defaults.min_work, "min_work", &mut repaired);
        repair_array(&mut self.max_work, &defaults.max_work, "max_work", &mut repaired);
        repair_array(&mut self.flags, &defaults.flags, "flags", &mut repaired);

        for name in &repaired {
            error!("District level data: {} array was short, regenerated defaults", name);
        }
        repaired
    }
}

fn repair_array<T: Clone>(
    array: &mut Vec<T>,
    defaults: &[T],
    name: &'static str,
    repaired: &mut Vec<&'static str>,
) {
    if array.len() < MAX_DISTRICTS {
        *array = defaults.to_vec();
        repaired.push(name);
    } else if array.len() > MAX_DISTRICTS {
        array.truncate(MAX_DISTRICTS);
    }
}
