//! Level transitions: the hook entry points the host calls, and the one place
//! that writes level, prefab and occupancy into host building records.
//!
//! A building is either stable or upgrading (the host's own level-up in
//! flight). Forced changes are refused while upgrading. Upgrades the host is
//! about to commit are taken over entirely for zoned private buildings, and
//! any building still below its floor afterwards gets one corrective upgrade
//! queued for the next step.

mod engine;

pub use engine::{LevelChange, LevelEngine, UpgradeOutcome};

#[cfg(test)]
mod tests;
