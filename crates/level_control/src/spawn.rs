//! Initial level selection for newly created buildings.
//!
//! Spawns land on the district floor unless the district opts into random
//! spawn levels, in which case the level is drawn uniformly from the
//! district's `[min, max]` with a generator seeded from the spawn position.
//! The same position always yields the same level.

use bevy::math::Vec2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use xxhash_rust::xxh32::xxh32;

use crate::policy::{DistrictFlags, DistrictLevelPolicies};
use crate::types::{DistrictId, LevelCategory};

/// Seed for position hashing; fixed so saves replay identically.
const SPAWN_SEED: u32 = 0x5EED_1EE7;

/// Deterministic seed derived from a spawn position.
pub fn position_seed(position: Vec2) -> u64 {
    let mut bytes = [0u8; 8];
    bytes[..4].copy_from_slice(&position.x.to_bits().to_le_bytes());
    bytes[4..].copy_from_slice(&position.y.to_bits().to_le_bytes());
    let lo = xxh32(&bytes, SPAWN_SEED) as u64;
    let hi = xxh32(&bytes, SPAWN_SEED.rotate_left(16)) as u64;
    (hi << 32) | lo
}

pub fn choose_spawn_level(
    districts: &DistrictLevelPolicies,
    district: DistrictId,
    category: LevelCategory,
    position: Vec2,
) -> u8 {
    let Some(min) = districts.min_level(district, category) else {
        return 0;
    };

    if !districts.has_flag(district, DistrictFlags::RANDOM_SPAWN_LEVELS) {
        return min;
    }

    let max = districts
        .max_level(district, category)
        .unwrap_or_else(|| category.absolute_default_max());
    let range = max.saturating_sub(min);
    if range == 0 {
        return min;
    }

    let mut rng = ChaCha8Rng::seed_from_u64(position_seed(position));
    min + rng.gen_range(0..=range)
}
