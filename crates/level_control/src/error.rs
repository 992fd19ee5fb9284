// ---------------------------------------------------------------------------
// LevelError: typed failures of level operations
// ---------------------------------------------------------------------------
//
// None of these ever reach the host's per-tick loop. Hook entry points log
// them and leave the building untouched; queued actions record them in the
// ActionResultLog.

use std::fmt;

use crate::types::BuildingId;

/// Collaborator data a level operation could not obtain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dependency {
    /// The building's own prefab is not in the catalog.
    Prefab,
    /// No catalog prefab matches the requested level, lot and style.
    ReplacementPrefab,
    /// The prefab has no behaviour object attached.
    AiBehavior,
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dependency::Prefab => write!(f, "prefab"),
            Dependency::ReplacementPrefab => write!(f, "replacement prefab"),
            Dependency::AiBehavior => write!(f, "AI behaviour"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LevelError {
    /// The building slot is empty or was released before the operation ran.
    BuildingNotFound(BuildingId),
    /// The host is mid-way through its own upgrade of this building.
    UpgradeInProgress(BuildingId),
    /// Requested level is at or above the prefab class ceiling (1-based).
    LevelOutOfRange {
        building: BuildingId,
        requested: u8,
        class_max: u8,
    },
    MissingDependency {
        building: BuildingId,
        dependency: Dependency,
    },
    /// Persisted data could not be read back as written.
    CorruptPersistedState(String),
}

impl fmt::Display for LevelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LevelError::BuildingNotFound(id) => write!(f, "building {} does not exist", id.0),
            LevelError::UpgradeInProgress(id) => {
                write!(f, "building {} is already upgrading", id.0)
            }
            LevelError::LevelOutOfRange {
                building,
                requested,
                class_max,
            } => write!(
                f,
                "level {requested} is out of range for building {} (class maximum {class_max})",
                building.0
            ),
            LevelError::MissingDependency {
                building,
                dependency,
            } => write!(f, "building {} has no {dependency}", building.0),
            LevelError::CorruptPersistedState(msg) => write!(f, "corrupt level data: {msg}"),
        }
    }
}

impl std::error::Error for LevelError {}
