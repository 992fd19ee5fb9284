//! Action executor system. Drains the [`LevelActionQueue`] once per fixed
//! step, after natural processing, and applies every queued [`LevelAction`]
//! in submission order, recording results in the [`ActionResultLog`].
//!
//! Actions the engine enqueues while this runs (corrective upgrades, for
//! instance) stay in the queue for the next step.

use bevy::prelude::*;

use crate::context::LevelContext;
use crate::district_ops::enforce_district;
use crate::error::LevelError;
use crate::transition::LevelEngine;

use super::result_log::ActionResultLog;
use super::{ActionError, ActionResult, LevelAction};

// ---------------------------------------------------------------------------
// System
// ---------------------------------------------------------------------------

pub fn execute_level_actions(mut ctx: LevelContext, mut log: ResMut<ActionResultLog>) {
    if !ctx.has_host() || ctx.queue.is_empty() {
        return;
    }
    let actions = ctx.queue.drain();
    let Some(mut engine) = ctx.engine() else {
        return;
    };
    for queued in actions {
        let result = execute_single(&queued.action, &mut engine);
        if let Some(err) = result.error() {
            debug!("Level action {:?} failed: {:?}", queued.action, err);
        }
        log.push(queued, result);
    }
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

pub fn execute_single(action: &LevelAction, engine: &mut LevelEngine<'_>) -> ActionResult {
    match *action {
        LevelAction::ForceLevel { building, level } => {
            to_result(engine.force_level(building, level).map(|_| ()))
        }
        LevelAction::Upgrade { building } => to_result(engine.upgrade(building).map(|_| ())),
        LevelAction::Downgrade { building } => to_result(engine.downgrade(building).map(|_| ())),
        LevelAction::EnforceBuilding { building } => {
            to_result(engine.enforce_building(building).map(|_| ()))
        }
        LevelAction::EnforceDistrict { district } => {
            let report = enforce_district(engine, district);
            if report.failed == 0 {
                ActionResult::Applied
            } else {
                debug!(
                    "{} of {} buildings in district {} stayed out of range",
                    report.failed,
                    report.examined(),
                    district
                );
                ActionResult::PartiallyApplied {
                    stuck: report.failed as u32,
                    examined: report.examined() as u32,
                }
            }
        }
    }
}

fn to_result(outcome: Result<(), LevelError>) -> ActionResult {
    match outcome {
        Ok(()) => ActionResult::Applied,
        Err(ref err @ LevelError::BuildingNotFound(_)) => {
            // Released between enqueue and execution.
            ActionResult::Rejected(ActionError::from(err))
        }
        Err(err) => {
            warn!("{}", err);
            ActionResult::Rejected(ActionError::from(&err))
        }
    }
}
