use bitcode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::error::LevelError;

/// Outcome of one executed [`super::LevelAction`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Encode, Decode)]
pub enum ActionResult {
    /// The building is at a permitted level, whether or not it moved.
    Applied,
    /// District enforcement that left `stuck` of `examined` buildings out of range.
    PartiallyApplied { stuck: u32, examined: u32 },
    Rejected(ActionError),
}

impl ActionResult {
    /// `Applied` and `PartiallyApplied` both count.
    pub fn is_success(&self) -> bool {
        !matches!(self, ActionResult::Rejected(_))
    }

    /// Buildings a district pass could not move into range.
    pub fn stuck_buildings(&self) -> u32 {
        match self {
            ActionResult::PartiallyApplied { stuck, .. } => *stuck,
            _ => 0,
        }
    }

    pub fn error(&self) -> Option<&ActionError> {
        match self {
            ActionResult::Rejected(err) => Some(err),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Encode, Decode)]
pub enum ActionError {
    NotFound,
    UpgradeInProgress,
    LevelOutOfRange,
    DependencyMissing,
    CorruptState,
}

impl From<&LevelError> for ActionError {
    fn from(err: &LevelError) -> Self {
        match err {
            LevelError::BuildingNotFound(_) => ActionError::NotFound,
            LevelError::UpgradeInProgress(_) => ActionError::UpgradeInProgress,
            LevelError::LevelOutOfRange { .. } => ActionError::LevelOutOfRange,
            LevelError::MissingDependency { .. } => ActionError::DependencyMissing,
            LevelError::CorruptPersistedState(_) => ActionError::CorruptState,
        }
    }
}
