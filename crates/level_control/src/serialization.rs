// ---------------------------------------------------------------------------
// serialization – persisted level policy blob
// ---------------------------------------------------------------------------
//
// Layout (all integers little-endian):
//   header (12 bytes)
//     [0..4]   Magic bytes: "LVLC"
//     [4..6]   Format version (u16)
//     [6..8]   Reserved (u16, zero)
//     [8..12]  xxHash32 checksum of everything after the header
//   u32 district block length | district block
//   u32 building block length | building block
//
// District block: four u32-length-prefixed byte sequences (minRes, maxRes,
// minWork, maxWork), a u16 block version, then the flags byte sequence.
// Saves written before district flags existed end after the fourth sequence.
//
// Building block: u32 count + count u32 ids, then u32-length-prefixed mins
// and maxes. The three columns must have equal length.
//
// Loading never fails the host's load. A damaged header yields a fresh
// policy; damaged blocks are repaired field by field.

use bevy::prelude::*;
use xxhash_rust::xxh32::xxh32;

use crate::config::{MAX_RESIDENTIAL_LEVEL, MAX_WORKPLACE_LEVEL};
use crate::error::LevelError;
use crate::policy::{
    BuildingLevelOverride, BuildingOverrides, DistrictFlags, DistrictLevelPolicies, LevelPolicy,
};
use crate::types::BuildingId;
use crate::Saveable;

pub const MAGIC: [u8; 4] = *b"LVLC";
pub const HEADER_SIZE: usize = 12;
pub const FORMAT_VERSION: u16 = 1;
/// Version tag written between the level arrays and the flags tail.
pub const DISTRICT_BLOCK_VERSION: u16 = 1;
const XXHASH_SEED: u32 = 0;

// ---------------------------------------------------------------------------
// Byte cursor helpers
// ---------------------------------------------------------------------------

#[derive(Default)]
struct BlobWriter {
    out: Vec<u8>,
}

impl BlobWriter {
    fn u16(&mut self, v: u16) {
        self.out.extend_from_slice(&v.to_le_bytes());
    }

    fn u32(&mut self, v: u32) {
        self.out.extend_from_slice(&v.to_le_bytes());
    }

    fn bytes(&mut self, data: &[u8]) {
        self.u32(data.len() as u32);
        self.out.extend_from_slice(data);
    }

    fn u32s(&mut self, data: &[u32]) {
        self.u32(data.len() as u32);
        for &v in data {
            self.u32(v);
        }
    }

    fn finish(self) -> Vec<u8> {
        self.out
    }
}

struct BlobReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BlobReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.data.len()
    }

    fn take(&mut self, n: usize) -> Option<&'a [u8]> {
        let end = self.pos.checked_add(n)?;
        let slice = self.data.get(self.pos..end)?;
        self.pos = end;
        Some(slice)
    }

    fn u16(&mut self) -> Option<u16> {
        let b = self.take(2)?;
        Some(u16::from_le_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Option<u32> {
        let b = self.take(4)?;
        Some(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn bytes(&mut self) -> Option<&'a [u8]> {
        let len = self.u32()? as usize;
        self.take(len)
    }

    fn u32s(&mut self) -> Option<Vec<u32>> {
        let len = self.u32()? as usize;
        let raw = self.take(len.checked_mul(4)?)?;
        Some(
            raw.chunks_exact(4)
                .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect(),
        )
    }
}

// ---------------------------------------------------------------------------
// Encode
// ---------------------------------------------------------------------------

pub fn encode_policy(policy: &LevelPolicy) -> Vec<u8> {
    let districts = encode_districts(&policy.districts);
    let buildings = encode_buildings(&policy.buildings);

    let mut payload = BlobWriter::default();
    payload.bytes(&districts);
    payload.bytes(&buildings);
    let payload = payload.finish();

    let mut out = Vec::with_capacity(HEADER_SIZE + payload.len());
    out.extend_from_slice(&MAGIC);
    out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&xxh32(&payload, XXHASH_SEED).to_le_bytes());
    out.extend_from_slice(&payload);
    out
}

fn encode_districts(districts: &DistrictLevelPolicies) -> Vec<u8> {
    let mut w = BlobWriter::default();
    w.bytes(&districts.min_res);
    w.bytes(&districts.max_res);
    w.bytes(&districts.min_work);
    w.bytes(&districts.max_work);
    w.u16(DISTRICT_BLOCK_VERSION);
    let flags: Vec<u8> = districts.flags.iter().map(|f| f.bits()).collect();
    w.bytes(&flags);
    w.finish()
}

fn encode_buildings(buildings: &BuildingOverrides) -> Vec<u8> {
    let (ids, mins, maxes) = buildings.to_columns();
    let mut w = BlobWriter::default();
    w.u32s(&ids);
    w.bytes(&mins);
    w.bytes(&maxes);
    w.finish()
}

// ---------------------------------------------------------------------------
// Decode
// ---------------------------------------------------------------------------

/// Validate the header and return the payload after it.
fn unwrap_header(bytes: &[u8]) -> Result<&[u8], LevelError> {
    if bytes.len() < HEADER_SIZE || bytes[..4] != MAGIC {
        return Err(LevelError::CorruptPersistedState(
            "missing LVLC header".to_string(),
        ));
    }
    let version = u16::from_le_bytes([bytes[4], bytes[5]]);
    if version > FORMAT_VERSION {
        return Err(LevelError::CorruptPersistedState(format!(
            "format version {} is newer than supported version {}",
            version, FORMAT_VERSION
        )));
    }
    let checksum = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);
    let payload = &bytes[HEADER_SIZE..];
    let computed = xxh32(payload, XXHASH_SEED);
    if computed != checksum {
        return Err(LevelError::CorruptPersistedState(format!(
            "checksum mismatch (expected {:#010X}, got {:#010X})",
            checksum, computed
        )));
    }
    Ok(payload)
}

/// Decode a policy blob. Only a damaged header is an error; damaged blocks
/// are repaired and logged.
pub fn decode_policy(bytes: &[u8]) -> Result<LevelPolicy, LevelError> {
    let payload = unwrap_header(bytes)?;
    let mut r = BlobReader::new(payload);

    let districts = match r.bytes() {
        Some(block) => decode_districts(block),
        None => {
            error!("Level data: district block missing, using defaults");
            DistrictLevelPolicies::default()
        }
    };
    let buildings = match r.bytes() {
        Some(block) => decode_buildings(block),
        None => {
            error!("Level data: building block missing, no overrides loaded");
            BuildingOverrides::default()
        }
    };

    Ok(LevelPolicy {
        buildings,
        districts,
        pending_prune: true,
    })
}

fn decode_districts(block: &[u8]) -> DistrictLevelPolicies {
    let mut r = BlobReader::new(block);
    let mut read_array = |name: &str, ceiling: u8| -> Vec<u8> {
        let Some(raw) = r.bytes() else {
            return Vec::new();
        };
        let mut clamped = 0usize;
        let values = raw
            .iter()
            .map(|&v| {
                if v > ceiling {
                    clamped += 1;
                }
                v.min(ceiling)
            })
            .collect();
        if clamped > 0 {
            error!(
                "Level data: {} district {} values above {} clamped",
                clamped, name, ceiling
            );
        }
        values
    };

    let mut districts = DistrictLevelPolicies::uninitialized();
    districts.min_res = read_array("min_res", MAX_RESIDENTIAL_LEVEL);
    districts.max_res = read_array("max_res", MAX_RESIDENTIAL_LEVEL);
    districts.min_work = read_array("min_work", MAX_WORKPLACE_LEVEL);
    districts.max_work = read_array("max_work", MAX_WORKPLACE_LEVEL);

    districts.flags = match read_flags(&mut r) {
        Some(flags) => flags,
        None => {
            info!("Level data: no district flags present, flags cleared");
            DistrictLevelPolicies::default().flags
        }
    };

    districts.repair();
    districts
}

fn read_flags(r: &mut BlobReader<'_>) -> Option<Vec<DistrictFlags>> {
    if r.is_at_end() {
        return None;
    }
    let version = r.u16()?;
    if version > DISTRICT_BLOCK_VERSION {
        warn!(
            "Level data: district block version {} is newer than {}, reading flags anyway",
            version, DISTRICT_BLOCK_VERSION
        );
    }
    let raw = r.bytes()?;
    Some(raw.iter().map(|&b| DistrictFlags::from_bits_truncate(b)).collect())
}

fn decode_buildings(block: &[u8]) -> BuildingOverrides {
    let mut overrides = BuildingOverrides::default();
    let mut r = BlobReader::new(block);
    let Some((ids, mins, maxes)) = read_columns(&mut r) else {
        error!("Level data: building block truncated, no overrides loaded");
        return overrides;
    };
    if ids.len() != mins.len() || ids.len() != maxes.len() {
        error!(
            "Level data: building column lengths differ (ids {}, mins {}, maxes {}), no overrides loaded",
            ids.len(),
            mins.len(),
            maxes.len()
        );
        return overrides;
    }

    for ((&raw_id, &min_level), &max_level) in ids.iter().zip(mins).zip(maxes) {
        let Ok(id) = u16::try_from(raw_id) else {
            warn!("Level data: building id {} out of range, skipped", raw_id);
            continue;
        };
        overrides.insert_raw(
            BuildingId(id),
            BuildingLevelOverride {
                min_level,
                max_level,
            },
        );
    }
    overrides
}

fn read_columns<'a>(r: &mut BlobReader<'a>) -> Option<(Vec<u32>, &'a [u8], &'a [u8])> {
    Some((r.u32s()?, r.bytes()?, r.bytes()?))
}

impl Saveable for LevelPolicy {
    const SAVE_KEY: &'static str = "level_policy";

    /// Always written, even at defaults, so every load of a city saved with
    /// level control runs the post-load prune and level validation.
    fn save_to_bytes(&self) -> Option<Vec<u8>> {
        Some(encode_policy(self))
    }

    fn load_from_bytes(bytes: &[u8]) -> Self {
        match decode_policy(bytes) {
            Ok(policy) => {
                info!(
                    "Loaded level policy: {} building overrides",
                    policy.buildings.len()
                );
                policy
            }
            Err(err) => {
                error!("{}; starting with default level policy", err);
                Self::load_missing()
            }
        }
    }

    /// A city saved without level control still has its buildings validated.
    fn load_missing() -> Self {
        LevelPolicy {
            pending_prune: true,
            ..Default::default()
        }
    }
}
