use std::collections::VecDeque;

use bevy::prelude::*;
use bitcode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use super::LevelAction;
use crate::types::BuildingId;
use crate::Saveable;

/// Who asked for a queued action. Kept with the entry for the result log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub enum ActionSource {
    /// Player input from a panel.
    Player,
    /// Another mod or script through the public API.
    Api,
    /// The engine itself (floor enforcement, historical changes).
    Engine,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct QueuedLevelAction {
    pub tick: u64,
    pub source: ActionSource,
    pub action: LevelAction,
}

/// Level changes waiting for the next simulation step, in submission order.
///
/// Building records are only written from the step itself; everything else
/// goes through here.
#[derive(Resource, Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LevelActionQueue {
    pending: VecDeque<QueuedLevelAction>,
}

impl LevelActionQueue {
    pub fn push(&mut self, tick: u64, source: ActionSource, action: LevelAction) {
        self.pending.push_back(QueuedLevelAction {
            tick,
            source,
            action,
        });
    }

    /// Take everything queued so far. Actions pushed while the batch runs
    /// wait for the next step.
    pub fn drain(&mut self) -> Vec<QueuedLevelAction> {
        self.pending.drain(..).collect()
    }

    pub fn has_pending_upgrade(&self, building: BuildingId) -> bool {
        self.pending
            .iter()
            .any(|q| q.action == LevelAction::Upgrade { building })
    }

    /// Drop every action aimed at `building`. Returns how many went.
    pub fn discard_for(&mut self, building: BuildingId) -> usize {
        let before = self.pending.len();
        self.pending.retain(|q| q.action.building() != Some(building));
        before - self.pending.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &QueuedLevelAction> {
        self.pending.iter()
    }

    pub fn front(&self) -> Option<&QueuedLevelAction> {
        self.pending.front()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }
}

impl Saveable for LevelActionQueue {
    const SAVE_KEY: &'static str = "level_action_queue";

    fn save_to_bytes(&self) -> Option<Vec<u8>> {
        if self.pending.is_empty() {
            return None;
        }
        let pending: Vec<QueuedLevelAction> = self.pending.iter().cloned().collect();
        Some(bitcode::encode(&pending))
    }

    fn load_from_bytes(bytes: &[u8]) -> Self {
        let pending: Vec<QueuedLevelAction> = crate::decode_or_warn(Self::SAVE_KEY, bytes);
        Self {
            pending: pending.into(),
        }
    }
}
