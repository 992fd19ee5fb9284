//! Plain data shared between the engine and the host simulation.
//!
//! Levels are 0-based everywhere in this crate (0..=4); the host's class
//! maximum query is the only 1-based value and is named as such.

use bevy::math::Vec2;
use bitcode::{Decode, Encode};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::config::{MAX_RESIDENTIAL_LEVEL, MAX_WORKPLACE_LEVEL, WORKPLACE_TIERS};

/// Handle into the host simulation's building table.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Encode, Decode,
)]
pub struct BuildingId(pub u16);

/// Index into the host's district table. District 0 is "no district".
pub type DistrictId = u8;

/// Handle into the host's prefab catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Encode, Decode)]
pub struct PrefabId(pub u32);

/// Architectural style assigned to a district by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StyleId(pub u16);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Service {
    Residential,
    Commercial,
    Industrial,
    Office,
    /// Anything that is not a zoned growable (services, parks, monuments).
    Other,
}

impl Service {
    pub fn category(self) -> LevelCategory {
        match self {
            Service::Residential => LevelCategory::Residential,
            _ => LevelCategory::Workplace,
        }
    }
}

/// Host-defined refinement of a service (low/high density, specialisations).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubService(pub u8);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ZoningMode {
    Straight,
    CornerLeft,
    CornerRight,
}

/// Which behaviour object drives a prefab in the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AiKind {
    /// Private zoned growth: residential, commercial, office, industrial.
    PrivateZoned,
    /// Any other behaviour; the host keeps its own upgrade path for these.
    Other,
}

/// Policy category a building's limits are read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LevelCategory {
    Residential,
    Workplace,
}

impl LevelCategory {
    /// Maximum used when neither a building override nor district policy applies.
    pub fn absolute_default_max(self) -> u8 {
        match self {
            LevelCategory::Residential => MAX_RESIDENTIAL_LEVEL,
            LevelCategory::Workplace => MAX_WORKPLACE_LEVEL,
        }
    }
}

/// Catalog entry describing one building prefab.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrefabInfo {
    pub id: PrefabId,
    pub service: Service,
    pub sub_service: SubService,
    pub level: u8,
    pub width: u8,
    pub length: u8,
    pub zoning_mode: ZoningMode,
    pub style: Option<StyleId>,
    /// `None` when the host failed to attach a behaviour object.
    pub ai: Option<AiKind>,
}

bitflags! {
    /// Lifecycle and state flags on a host building record.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct BuildingFlags: u32 {
        /// The slot holds a live building.
        const CREATED = 1 << 0;
        /// The host has started its own level-up animation.
        const UPGRADING = 1 << 1;
        /// Never swap the prefab on level changes.
        const HISTORICAL = 1 << 2;
        const ABANDONED = 1 << 3;
    }
}

/// Derived capacity of a building at a given level and lot size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Occupancy {
    /// Workplace slots per education tier, uneducated first.
    pub workplaces: [u16; WORKPLACE_TIERS],
    pub households: u16,
    pub visitors: u16,
}

/// The host's building record, as far as level handling is concerned.
///
/// Owned by the host; the engine reads it freely and writes it only from
/// the transition engine.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildingRecord {
    pub flags: BuildingFlags,
    pub level: u8,
    pub position: Vec2,
    pub prefab: PrefabId,
    pub width: u8,
    pub length: u8,
    /// Progress of an in-flight host upgrade.
    pub upgrade_progress: u8,
    /// Ticks of accumulated problems driving the host towards abandonment.
    pub problem_timer: u8,
    pub occupancy: Occupancy,
}

impl BuildingRecord {
    pub fn exists(&self) -> bool {
        self.flags.contains(BuildingFlags::CREATED)
    }

    pub fn is_upgrading(&self) -> bool {
        self.flags.contains(BuildingFlags::UPGRADING)
    }

    pub fn is_historical(&self) -> bool {
        self.flags.contains(BuildingFlags::HISTORICAL)
    }
}

/// Resolved `[min, max]` for one building at one moment. Never cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectiveLevelRange {
    pub min: u8,
    pub max: u8,
}

impl EffectiveLevelRange {
    pub fn contains(&self, level: u8) -> bool {
        level >= self.min && level <= self.max
    }

    pub fn clamp(&self, level: u8) -> u8 {
        level.clamp(self.min, self.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_categories() {
        assert_eq!(Service::Residential.category(), LevelCategory::Residential);
        assert_eq!(Service::Commercial.category(), LevelCategory::Workplace);
        assert_eq!(Service::Office.category(), LevelCategory::Workplace);
        assert_eq!(Service::Other.category(), LevelCategory::Workplace);
    }

    #[test]
    fn test_absolute_default_max() {
        assert_eq!(LevelCategory::Residential.absolute_default_max(), 4);
        assert_eq!(LevelCategory::Workplace.absolute_default_max(), 2);
    }

    #[test]
    fn test_range_clamp() {
        let range = EffectiveLevelRange { min: 1, max: 3 };
        assert_eq!(range.clamp(0), 1);
        assert_eq!(range.clamp(2), 2);
        assert_eq!(range.clamp(4), 3);
        assert!(range.contains(1));
        assert!(!range.contains(4));
    }
}
