//! Bevy wiring: resources, system ordering and save registration.

use bevy::prelude::*;

use crate::actions::{execute_level_actions, ActionResultLog, LevelActionQueue};
use crate::context::LevelContext;
use crate::district_ops::{queue_district_enforcement, DistrictPolicyChanged};
use crate::exemption::PopulationExemption;
use crate::host::{building_exists, live_building, SimulationHost};
use crate::policy::LevelPolicy;
use crate::prefab_select::PrefabTargetSelector;
use crate::settings::LevelSettings;
use crate::types::BuildingId;
use crate::{advance_tick, SaveableAppExt, SaveableRegistry, SimulationSet, TickCounter};

pub struct LevelControlPlugin;

impl Plugin for LevelControlPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<TickCounter>()
            .init_resource::<SaveableRegistry>()
            .init_resource::<LevelPolicy>()
            .init_resource::<LevelSettings>()
            .init_resource::<PopulationExemption>()
            .init_resource::<PrefabTargetSelector>()
            .init_resource::<LevelActionQueue>()
            .init_resource::<ActionResultLog>()
            .add_event::<DistrictPolicyChanged>()
            .register_saveable::<LevelPolicy>()
            .register_saveable::<LevelSettings>()
            .register_saveable::<LevelActionQueue>()
            .configure_sets(
                FixedUpdate,
                (
                    SimulationSet::PreSim,
                    SimulationSet::Simulation,
                    SimulationSet::PostSim,
                )
                    .chain(),
            )
            .add_systems(
                FixedUpdate,
                (advance_tick, finish_policy_load)
                    .chain()
                    .in_set(SimulationSet::PreSim),
            )
            .add_systems(
                FixedUpdate,
                suppress_abandonment.in_set(SimulationSet::Simulation),
            )
            .add_systems(
                FixedUpdate,
                (queue_district_enforcement, execute_level_actions)
                    .chain()
                    .in_set(SimulationSet::PostSim),
            );
    }
}

/// After a load: drop overrides for buildings that no longer exist or whose
/// values collapsed to defaults, then validate every loaded building's level.
///
/// Waits for a [`crate::host::SimHost`] if none is installed yet.
pub fn finish_policy_load(mut ctx: LevelContext) {
    if !ctx.policy.pending_prune {
        return;
    }
    let Some(mut engine) = ctx.engine() else {
        return;
    };

    let host: &dyn SimulationHost = &*engine.host;
    let dead = engine
        .policy
        .buildings
        .prune_dead(|id| building_exists(host, id));
    let noops = engine
        .policy
        .buildings
        .prune_noops(|id| absolute_max_level(host, id));
    engine.policy.pending_prune = false;
    info!(
        "Level overrides pruned after load: {} dead, {} redundant, {} kept",
        dead,
        noops,
        engine.policy.buildings.len()
    );

    let mut repaired = 0usize;
    for id in engine.host.building_ids() {
        if engine.building_loaded(id).is_some() {
            repaired += 1;
        }
    }
    if repaired > 0 {
        warn!("{} loaded buildings exceeded their class maximum", repaired);
    }
}

fn absolute_max_level(host: &dyn SimulationHost, id: BuildingId) -> Option<u8> {
    let building = live_building(host, id)?;
    let prefab = host.prefab(building.prefab)?;
    Some(host.max_level_for_class(prefab).saturating_sub(1))
}

/// Hold abandonment timers at zero for every building the settings cover.
pub fn suppress_abandonment(mut ctx: LevelContext) {
    if !ctx.settings.no_abandonment && !ctx.settings.no_abandonment_historical {
        return;
    }
    let Some(mut engine) = ctx.engine() else {
        return;
    };
    let mut reset = 0usize;
    for id in engine.host.building_ids() {
        if engine.simulation_step(id) {
            reset += 1;
        }
    }
    if reset > 0 {
        debug!("Abandonment suppressed on {} buildings", reset);
    }
}
