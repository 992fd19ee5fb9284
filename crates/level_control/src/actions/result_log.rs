//! Ring buffer of recently executed level actions and their results.
//!
//! Panels read this to explain why a requested change did not happen; there
//! is no error dialog for per-building failures.

use std::collections::VecDeque;

use bevy::prelude::*;

use super::{ActionResult, ActionSource, LevelAction, QueuedLevelAction};
use crate::types::BuildingId;

const MAX_ENTRIES: usize = 64;

/// One executed action, stamped with the tick it was queued on.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggedAction {
    pub tick: u64,
    pub source: ActionSource,
    pub action: LevelAction,
    pub result: ActionResult,
}

#[derive(Resource, Debug, Clone, Default)]
pub struct ActionResultLog {
    entries: VecDeque<LoggedAction>,
}

impl ActionResultLog {
    pub fn push(&mut self, queued: QueuedLevelAction, result: ActionResult) {
        if self.entries.len() == MAX_ENTRIES {
            self.entries.pop_front();
        }
        self.entries.push_back(LoggedAction {
            tick: queued.tick,
            source: queued.source,
            action: queued.action,
            result,
        });
    }

    /// The last `n` entries, oldest first.
    pub fn recent(&self, n: usize) -> impl Iterator<Item = &LoggedAction> {
        self.entries.iter().skip(self.entries.len().saturating_sub(n))
    }

    pub fn last(&self) -> Option<&LoggedAction> {
        self.entries.back()
    }

    /// Most recent entry that targeted `building`.
    pub fn latest_for(&self, building: BuildingId) -> Option<&LoggedAction> {
        self.entries
            .iter()
            .rev()
            .find(|e| e.action.building() == Some(building))
    }

    pub fn failures(&self) -> impl Iterator<Item = &LoggedAction> {
        self.entries.iter().filter(|e| !e.result.is_success())
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::ActionError;

    fn queued(tick: u64, action: LevelAction) -> QueuedLevelAction {
        QueuedLevelAction {
            tick,
            source: ActionSource::Player,
            action,
        }
    }

    #[test]
    fn recent_and_per_building_lookup() {
        let mut log = ActionResultLog::default();
        let b1 = BuildingId(1);
        let b2 = BuildingId(2);
        log.push(queued(1, LevelAction::Upgrade { building: b1 }), ActionResult::Applied);
        log.push(
            queued(2, LevelAction::Downgrade { building: b2 }),
            ActionResult::Rejected(ActionError::NotFound),
        );
        log.push(
            queued(3, LevelAction::EnforceDistrict { district: 4 }),
            ActionResult::Applied,
        );

        let ticks: Vec<u64> = log.recent(2).map(|e| e.tick).collect();
        assert_eq!(ticks, vec![2, 3]);
        assert_eq!(log.recent(10).count(), 3);
        assert_eq!(log.latest_for(b1).map(|e| e.tick), Some(1));
        assert!(log.latest_for(BuildingId(9)).is_none());
        assert_eq!(log.failures().count(), 1);
    }

    #[test]
    fn evicts_oldest_when_full() {
        let mut log = ActionResultLog::default();
        for i in 0..(MAX_ENTRIES as u64 + 5) {
            log.push(
                queued(
                    i,
                    LevelAction::Upgrade {
                        building: BuildingId(i as u16),
                    },
                ),
                ActionResult::Applied,
            );
        }
        assert_eq!(log.len(), MAX_ENTRIES);
        assert_eq!(log.recent(MAX_ENTRIES).next().map(|e| e.tick), Some(5));
        log.clear();
        assert!(log.is_empty());
    }
}
