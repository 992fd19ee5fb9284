//! Ordering of level-control systems within `FixedUpdate`.
//!
//! ```text
//! PreSim  →  Simulation  →  PostSim
//! ```
//!
//! * **PreSim** – tick counter, post-load pruning of stale overrides.
//! * **Simulation** – per-building per-step work (abandonment suppression).
//!   The host's natural growth runs alongside this phase.
//! * **PostSim** – queued level actions, after the step's natural processing.

use bevy::prelude::*;

/// Configured as a chain: `PreSim` → `Simulation` → `PostSim`.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum SimulationSet {
    PreSim,
    Simulation,
    PostSim,
}
