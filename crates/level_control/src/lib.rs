//! Building level arbitration and override engine.
//!
//! Decides, for every building at every simulation step, which levels it may
//! occupy (per-building overrides, per-district defaults, the prefab class
//! ceiling), and applies forced, natural and corrective level changes while
//! keeping derived occupancy in step. The host game is reached through
//! [`host::SimulationHost`]; engine state lives in Bevy resources installed by
//! [`plugin::LevelControlPlugin`].

use bevy::prelude::*;

pub mod actions;
pub mod api;
pub mod config;
pub mod context;
pub mod district_ops;
pub mod error;
pub mod exemption;
pub mod host;
pub mod plugin;
pub mod policy;
pub mod prefab_select;
pub mod resolver;
pub mod saveable;
pub mod serialization;
pub mod settings;
pub mod simulation_sets;
pub mod spawn;
pub mod transition;
pub mod types;

#[cfg(any(test, feature = "bench"))]
pub mod test_harness;

pub use error::LevelError;
pub use plugin::LevelControlPlugin;
pub use saveable::{decode_or_warn, Saveable, SaveableAppExt, SaveableRegistry};
pub use simulation_sets::SimulationSet;

// ---------------------------------------------------------------------------
// Core resources
// ---------------------------------------------------------------------------

/// Incremented each FixedUpdate; stamps queued actions.
#[derive(Resource, Default)]
pub struct TickCounter(pub u64);

pub fn advance_tick(mut tick: ResMut<TickCounter>) {
    tick.0 = tick.0.wrapping_add(1);
}
