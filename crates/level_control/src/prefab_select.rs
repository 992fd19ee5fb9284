//! Replacement prefab selection for level changes.

use std::collections::HashMap;

use bevy::prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use xxhash_rust::xxh32::xxh32;

use crate::host::{live_building, PrefabQuery, SimulationHost};
use crate::types::{BuildingId, PrefabId};

const JITTER_SEED: u32 = 0x1E7E_15E1;

/// Picks a catalog prefab for a building at a target level.
///
/// Keeps a per-building call counter so that jittered and catalog draws for
/// one building form a reproducible sequence that still changes from call to
/// call.
#[derive(Resource, Debug, Default)]
pub struct PrefabTargetSelector {
    call_counts: HashMap<BuildingId, u32>,
}

impl PrefabTargetSelector {
    /// Prefab to use for `id` at `target_level`.
    ///
    /// Exempt buildings always keep their current prefab. Returns `None` when
    /// the building is gone or the catalog has no match; the caller picks the
    /// fallback.
    pub fn select_target(
        &mut self,
        host: &dyn SimulationHost,
        id: BuildingId,
        target_level: u8,
        jitter: bool,
        exempt: bool,
    ) -> Option<PrefabId> {
        let building = live_building(host, id)?;
        if exempt {
            return Some(building.prefab);
        }
        let current = host.prefab(building.prefab)?;
        let class_max = host.max_level_for_class(current).saturating_sub(1);

        let count = self.next_call(id);
        let seed = call_seed(id, count);
        let level = if jitter {
            jittered_level(target_level, class_max, seed)
        } else {
            target_level.min(class_max)
        };

        let query = PrefabQuery {
            service: current.service,
            sub_service: current.sub_service,
            level,
            width: building.width,
            length: building.length,
            zoning_mode: current.zoning_mode,
            style: host.district_style(host.district_at(building.position)),
            seed,
        };
        let found = host.random_prefab(&query);
        if found.is_none() {
            debug!(
                "No prefab for building {} at level {} ({}x{})",
                id.0, level, building.width, building.length
            );
        }
        found
    }

    /// Whether a replacement exists at `target_level`, without advancing the
    /// building's draw sequence.
    pub fn has_candidate(host: &dyn SimulationHost, id: BuildingId, target_level: u8) -> bool {
        let Some(building) = live_building(host, id) else {
            return false;
        };
        let Some(current) = host.prefab(building.prefab) else {
            return false;
        };
        let query = PrefabQuery {
            service: current.service,
            sub_service: current.sub_service,
            level: target_level,
            width: building.width,
            length: building.length,
            zoning_mode: current.zoning_mode,
            style: host.district_style(host.district_at(building.position)),
            seed: 0,
        };
        host.random_prefab(&query).is_some()
    }

    /// Drop the draw sequence of a released building.
    pub fn forget(&mut self, id: BuildingId) {
        self.call_counts.remove(&id);
    }

    fn next_call(&mut self, id: BuildingId) -> u32 {
        let count = self.call_counts.entry(id).or_insert(0);
        let current = *count;
        *count = count.wrapping_add(1);
        current
    }
}

fn call_seed(id: BuildingId, count: u32) -> u32 {
    let mut bytes = [0u8; 6];
    bytes[..2].copy_from_slice(&id.0.to_le_bytes());
    bytes[2..].copy_from_slice(&count.to_le_bytes());
    xxh32(&bytes, JITTER_SEED)
}

/// `target` moved by one of {-1, 0, +1}, kept inside `[0, class_max]`.
fn jittered_level(target: u8, class_max: u8, seed: u32) -> u8 {
    let mut rng = ChaCha8Rng::seed_from_u64(seed as u64);
    let offset: i16 = rng.gen_range(-1..=1);
    (target as i16 + offset).clamp(0, class_max as i16) as u8
}
