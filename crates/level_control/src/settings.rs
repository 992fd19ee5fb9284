//! Tunable engine behaviour.
//!
//! A single [`LevelSettings`] resource holds every switch the engine reads.
//! It persists with the save via `Saveable` and can be loaded from JSON for
//! host-side configuration files.

use bevy::prelude::*;
use bitcode::{Decode, Encode};
use serde::{Deserialize, Serialize};

#[derive(Resource, Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
#[serde(default)]
pub struct LevelSettings {
    /// Keep every building's abandonment timer at zero.
    pub no_abandonment: bool,
    /// Keep historical buildings' abandonment timers at zero.
    pub no_abandonment_historical: bool,
    /// Clamp loaded levels that exceed the prefab class ceiling.
    pub validate_on_load: bool,
    /// Jitter replacement prefab levels by one step either way.
    pub randomize_levels: bool,
    /// Commit level changes with the current prefab when no replacement exists.
    pub keep_prefab_when_missing: bool,
}

impl Default for LevelSettings {
    fn default() -> Self {
        Self {
            no_abandonment: false,
            no_abandonment_historical: false,
            validate_on_load: true,
            randomize_levels: false,
            keep_prefab_when_missing: false,
        }
    }
}

impl LevelSettings {
    /// Parse settings from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Whether abandonment should be suppressed for a building.
    pub fn suppresses_abandonment(&self, historical: bool) -> bool {
        self.no_abandonment || (self.no_abandonment_historical && historical)
    }
}

impl crate::Saveable for LevelSettings {
    const SAVE_KEY: &'static str = "level_settings";

    fn save_to_bytes(&self) -> Option<Vec<u8>> {
        if *self == Self::default() {
            return None;
        }
        Some(bitcode::encode(self))
    }

    fn load_from_bytes(bytes: &[u8]) -> Self {
        crate::decode_or_warn(Self::SAVE_KEY, bytes)
    }
}
