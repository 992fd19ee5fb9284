//! Collaborator interface onto the host simulation.
//!
//! The engine never owns building state. Everything it reads or writes goes
//! through [`SimulationHost`], which the embedding game implements over its
//! own building table, district map, prefab catalog and occupancy formula.

use bevy::math::Vec2;
use bevy::prelude::*;

use crate::types::{
    BuildingId, BuildingRecord, DistrictId, Occupancy, PrefabId, PrefabInfo, Service, StyleId,
    SubService, ZoningMode,
};

/// Catalog lookup for a replacement prefab.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrefabQuery {
    pub service: Service,
    pub sub_service: SubService,
    pub level: u8,
    pub width: u8,
    pub length: u8,
    pub zoning_mode: ZoningMode,
    /// District style; `None` accepts any style.
    pub style: Option<StyleId>,
    pub seed: u32,
}

pub trait SimulationHost: Send + Sync + 'static {
    /// Building record for `id`, whether or not the slot is live.
    fn building(&self, id: BuildingId) -> Option<&BuildingRecord>;

    fn building_mut(&mut self, id: BuildingId) -> Option<&mut BuildingRecord>;

    /// Ids of all live buildings.
    fn building_ids(&self) -> Vec<BuildingId>;

    fn district_at(&self, position: Vec2) -> DistrictId;

    /// Architectural style the district enforces, if any.
    fn district_style(&self, _district: DistrictId) -> Option<StyleId> {
        None
    }

    fn prefab(&self, id: PrefabId) -> Option<&PrefabInfo>;

    /// Random catalog prefab matching every field of `query`.
    fn random_prefab(&self, query: &PrefabQuery) -> Option<PrefabId>;

    /// Number of levels the prefab's class supports (1-based ceiling).
    fn max_level_for_class(&self, prefab: &PrefabInfo) -> u8;

    /// The host's standard occupancy formula.
    fn compute_occupancy(
        &self,
        prefab: &PrefabInfo,
        level: u8,
        seed: u32,
        width: u8,
        length: u8,
    ) -> Occupancy;

    /// Apply recomputed capacity to the host's citizen-unit bookkeeping.
    fn commit_capacity(&mut self, id: BuildingId, occupancy: &Occupancy);
}

/// Live building record, filtering out released slots.
pub fn live_building(host: &dyn SimulationHost, id: BuildingId) -> Option<&BuildingRecord> {
    host.building(id).filter(|b| b.exists())
}

pub fn building_exists(host: &dyn SimulationHost, id: BuildingId) -> bool {
    live_building(host, id).is_some()
}

/// The host simulation, as installed into the App by the embedding game.
#[derive(Resource)]
pub struct SimHost(pub Box<dyn SimulationHost>);

impl SimHost {
    pub fn new(host: impl SimulationHost) -> Self {
        Self(Box::new(host))
    }
}
