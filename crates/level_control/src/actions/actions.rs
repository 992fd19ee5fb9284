use bitcode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::types::{BuildingId, DistrictId};

/// A level change requested outside the simulation step.
///
/// UI and API callers never touch building records directly; they enqueue
/// one of these and the executor applies it on the simulation thread.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Encode, Decode)]
pub enum LevelAction {
    /// Instant-set the building to a 0-based level.
    ForceLevel { building: BuildingId, level: u8 },
    /// One level up from wherever the building is when the action runs.
    Upgrade { building: BuildingId },
    /// One level down from wherever the building is when the action runs.
    Downgrade { building: BuildingId },
    /// Move the building into its effective range, if it is outside it.
    EnforceBuilding { building: BuildingId },
    /// Move every building in the district into its effective range.
    EnforceDistrict { district: DistrictId },
}

impl LevelAction {
    /// Building the action targets, for single-building actions.
    pub fn building(&self) -> Option<BuildingId> {
        match *self {
            LevelAction::ForceLevel { building, .. }
            | LevelAction::Upgrade { building }
            | LevelAction::Downgrade { building }
            | LevelAction::EnforceBuilding { building } => Some(building),
            LevelAction::EnforceDistrict { .. } => None,
        }
    }
}
