//! Optional "externally managed population" predicate.
//!
//! A collaborating mod can install a predicate that marks buildings whose
//! population it manages. Such buildings keep their prefab on level changes,
//! exactly like historical buildings. With no predicate installed nothing is
//! exempt.

use std::sync::Arc;

use bevy::prelude::*;

use crate::types::BuildingId;

pub type ExemptionFn = dyn Fn(BuildingId) -> bool + Send + Sync;

#[derive(Resource, Default, Clone)]
pub struct PopulationExemption {
    predicate: Option<Arc<ExemptionFn>>,
}

impl PopulationExemption {
    pub fn install(&mut self, predicate: impl Fn(BuildingId) -> bool + Send + Sync + 'static) {
        info!("Population exemption predicate installed");
        self.predicate = Some(Arc::new(predicate));
    }

    pub fn clear(&mut self) {
        self.predicate = None;
    }

    pub fn is_installed(&self) -> bool {
        self.predicate.is_some()
    }

    pub fn is_exempt(&self, id: BuildingId) -> bool {
        self.predicate.as_ref().is_some_and(|p| p(id))
    }
}
