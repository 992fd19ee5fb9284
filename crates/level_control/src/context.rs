//! Bundles the resources a [`LevelEngine`] borrows, for systems and for host
//! hooks that run with `&mut World`.

use bevy::ecs::system::{SystemParam, SystemState};
use bevy::prelude::*;

use crate::actions::LevelActionQueue;
use crate::exemption::PopulationExemption;
use crate::host::SimHost;
use crate::policy::LevelPolicy;
use crate::prefab_select::PrefabTargetSelector;
use crate::settings::LevelSettings;
use crate::transition::LevelEngine;
use crate::TickCounter;

#[derive(SystemParam)]
pub struct LevelContext<'w> {
    pub policy: ResMut<'w, LevelPolicy>,
    pub settings: Res<'w, LevelSettings>,
    pub exemption: Res<'w, PopulationExemption>,
    pub selector: ResMut<'w, PrefabTargetSelector>,
    pub queue: ResMut<'w, LevelActionQueue>,
    pub host: Option<ResMut<'w, SimHost>>,
    pub tick: Res<'w, TickCounter>,
}

impl LevelContext<'_> {
    pub fn has_host(&self) -> bool {
        self.host.is_some()
    }

    /// `None` until the embedding game installs a [`SimHost`].
    pub fn engine(&mut self) -> Option<LevelEngine<'_>> {
        let host = self.host.as_mut()?;
        Some(LevelEngine {
            policy: &mut *self.policy,
            settings: &*self.settings,
            exemption: &*self.exemption,
            selector: &mut *self.selector,
            queue: &mut *self.queue,
            host: &mut *host.0,
            tick: self.tick.0,
        })
    }
}

/// Run `f` against an engine built from `world`'s resources.
///
/// This is how host hooks reach the engine outside of a system. Returns
/// `None` when no [`SimHost`] is installed.
pub fn with_engine<R>(world: &mut World, f: impl FnOnce(&mut LevelEngine<'_>) -> R) -> Option<R> {
    let mut state: SystemState<LevelContext> = SystemState::new(world);
    let mut ctx = state.get_mut(world);
    let result = ctx.engine().map(|mut engine| f(&mut engine));
    state.apply(world);
    result
}
