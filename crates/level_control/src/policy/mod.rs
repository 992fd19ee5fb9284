//! Level policy store: sparse per-building overrides and dense per-district
//! defaults.
//!
//! Pure data with accessors. Nothing here touches the host simulation except
//! through the lookup closures passed into the bulk operations.

pub mod districts;
pub mod overrides;


pub use districts::*;
pub use overrides::*;

use bevy::prelude::*;

/// The policy context owned by the App for one loaded city.
///
/// Created empty on a new game, replaced wholesale on load, reset on unload.
#[derive(Resource, Debug, Clone, Default, PartialEq)]
pub struct LevelPolicy {
    pub buildings: BuildingOverrides,
    pub districts: DistrictLevelPolicies,
    /// Set on load; overrides are untrusted until dead buildings are pruned.
    pub(crate) pending_prune: bool,
}

impl LevelPolicy {
    /// True while freshly loaded overrides still await the dead-building prune.
    pub fn is_pending_prune(&self) -> bool {
        self.pending_prune
    }

    /// True when nothing differs from a fresh city.
    pub fn is_default(&self) -> bool {
        self.buildings.is_empty() && self.districts.is_default()
    }
}
