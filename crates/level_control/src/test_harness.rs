//! # TestLevels: headless harness for the level engine
//!
//! [`TestHost`] is an in-memory [`SimulationHost`]: a building table, a
//! prefab catalog, a point-based district map and a deterministic occupancy
//! formula. [`TestLevels`] wraps a Bevy `App` with `LevelControlPlugin` and a
//! `TestHost` installed, and drives `FixedUpdate` directly.

use std::collections::HashMap;

use bevy::app::App;
use bevy::math::Vec2;
use bevy::prelude::*;

use crate::actions::{ActionResultLog, ActionSource, LevelAction, LevelActionQueue};
use crate::exemption::PopulationExemption;
use crate::host::{PrefabQuery, SimHost, SimulationHost};
use crate::plugin::LevelControlPlugin;
use crate::policy::LevelPolicy;
use crate::prefab_select::PrefabTargetSelector;
use crate::settings::LevelSettings;
use crate::transition::LevelEngine;
use crate::types::{
    AiKind, BuildingFlags, BuildingId, BuildingRecord, DistrictId, Occupancy, PrefabId,
    PrefabInfo, Service, StyleId, SubService, ZoningMode,
};
use crate::TickCounter;

/// Districts are painted as points; a position belongs to a district when
/// it lies within this distance of the painted point.
const DISTRICT_RADIUS: f32 = 0.5;

// ---------------------------------------------------------------------------
// TestHost
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct TestHost {
    buildings: Vec<BuildingRecord>,
    prefabs: Vec<PrefabInfo>,
    class_max: HashMap<PrefabId, u8>,
    districts: Vec<(Vec2, DistrictId)>,
    styles: HashMap<DistrictId, StyleId>,
    /// Every `commit_capacity` call, in order.
    pub commits: Vec<(BuildingId, Occupancy)>,
}

impl TestHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a zoned growable prefab to the catalog.
    pub fn add_prefab(&mut self, service: Service, level: u8, width: u8, length: u8) -> PrefabId {
        let id = PrefabId(self.prefabs.len() as u32);
        let ai = match service {
            Service::Other => AiKind::Other,
            _ => AiKind::PrivateZoned,
        };
        self.prefabs.push(PrefabInfo {
            id,
            service,
            sub_service: SubService(0),
            level,
            width,
            length,
            zoning_mode: ZoningMode::Straight,
            style: None,
            ai: Some(ai),
        });
        id
    }

    pub fn prefab_mut(&mut self, id: PrefabId) -> &mut PrefabInfo {
        &mut self.prefabs[id.0 as usize]
    }

    /// Override the 1-based class ceiling for one prefab.
    pub fn set_class_max(&mut self, prefab: PrefabId, max: u8) {
        self.class_max.insert(prefab, max);
    }

    pub fn set_district_at(&mut self, position: Vec2, district: DistrictId) {
        self.districts.retain(|(p, _)| p.distance(position) > DISTRICT_RADIUS);
        self.districts.push((position, district));
    }

    pub fn set_district_style(&mut self, district: DistrictId, style: StyleId) {
        self.styles.insert(district, style);
    }

    /// Place a live building and compute its initial occupancy.
    pub fn spawn_building(&mut self, prefab: PrefabId, level: u8, position: Vec2) -> BuildingId {
        let id = BuildingId(self.buildings.len() as u16);
        let info = self.prefabs[prefab.0 as usize].clone();
        let occupancy = self.compute_occupancy(&info, level, id.0 as u32, info.width, info.length);
        self.buildings.push(BuildingRecord {
            flags: BuildingFlags::CREATED,
            level,
            position,
            prefab,
            width: info.width,
            length: info.length,
            upgrade_progress: 0,
            problem_timer: 0,
            occupancy,
        });
        id
    }

    /// Empty the slot. The record stays so ids are not reused by accident.
    pub fn release_building(&mut self, id: BuildingId) {
        self.buildings[id.0 as usize].flags = BuildingFlags::empty();
    }

    pub fn building_record(&self, id: BuildingId) -> &BuildingRecord {
        &self.buildings[id.0 as usize]
    }

    pub fn building_record_mut(&mut self, id: BuildingId) -> &mut BuildingRecord {
        &mut self.buildings[id.0 as usize]
    }
}

impl SimulationHost for TestHost {
    fn building(&self, id: BuildingId) -> Option<&BuildingRecord> {
        self.buildings.get(id.0 as usize)
    }

    fn building_mut(&mut self, id: BuildingId) -> Option<&mut BuildingRecord> {
        self.buildings.get_mut(id.0 as usize)
    }

    fn building_ids(&self) -> Vec<BuildingId> {
        self.buildings
            .iter()
            .enumerate()
            .filter(|(_, b)| b.exists())
            .map(|(i, _)| BuildingId(i as u16))
            .collect()
    }

    fn district_at(&self, position: Vec2) -> DistrictId {
        self.districts
            .iter()
            .find(|(p, _)| p.distance(position) <= DISTRICT_RADIUS)
            .map(|&(_, d)| d)
            .unwrap_or(0)
    }

    fn district_style(&self, district: DistrictId) -> Option<StyleId> {
        self.styles.get(&district).copied()
    }

    fn prefab(&self, id: PrefabId) -> Option<&PrefabInfo> {
        self.prefabs.get(id.0 as usize)
    }

    fn random_prefab(&self, query: &PrefabQuery) -> Option<PrefabId> {
        let candidates: Vec<PrefabId> = self
            .prefabs
            .iter()
            .filter(|p| {
                p.service == query.service
                    && p.sub_service == query.sub_service
                    && p.level == query.level
                    && p.width == query.width
                    && p.length == query.length
                    && p.zoning_mode == query.zoning_mode
                    && (query.style.is_none() || p.style == query.style)
            })
            .map(|p| p.id)
            .collect();
        if candidates.is_empty() {
            return None;
        }
        Some(candidates[query.seed as usize % candidates.len()])
    }

    fn max_level_for_class(&self, prefab: &PrefabInfo) -> u8 {
        if let Some(&max) = self.class_max.get(&prefab.id) {
            return max;
        }
        match prefab.service {
            Service::Residential => 5,
            Service::Commercial | Service::Industrial | Service::Office => 3,
            Service::Other => 1,
        }
    }

    fn compute_occupancy(
        &self,
        prefab: &PrefabInfo,
        level: u8,
        seed: u32,
        width: u8,
        length: u8,
    ) -> Occupancy {
        let lot = width as u16 * length as u16;
        let step = level as u16 + 1;
        let mut occupancy = Occupancy::default();
        match prefab.service {
            Service::Residential => {
                occupancy.households = lot * step + (seed % 2) as u16;
            }
            Service::Commercial => {
                occupancy.workplaces = [lot * 2, lot * step, lot, 0];
                occupancy.visitors = lot * step * 3;
            }
            Service::Industrial | Service::Office => {
                occupancy.workplaces = [lot * 3, lot * step, lot * step, step - 1];
            }
            Service::Other => {}
        }
        occupancy
    }

    fn commit_capacity(&mut self, id: BuildingId, occupancy: &Occupancy) {
        self.commits.push((id, *occupancy));
    }
}

// ---------------------------------------------------------------------------
// Engine fixture for unit tests
// ---------------------------------------------------------------------------

/// Owned copies of every resource a [`LevelEngine`] borrows.
#[derive(Default)]
pub struct EngineFixture {
    pub host: TestHost,
    pub policy: LevelPolicy,
    pub settings: LevelSettings,
    pub exemption: PopulationExemption,
    pub selector: PrefabTargetSelector,
    pub queue: LevelActionQueue,
}

impl EngineFixture {
    pub fn new(host: TestHost) -> Self {
        Self {
            host,
            ..Default::default()
        }
    }

    pub fn engine(&mut self) -> LevelEngine<'_> {
        LevelEngine {
            policy: &mut self.policy,
            settings: &self.settings,
            exemption: &self.exemption,
            selector: &mut self.selector,
            queue: &mut self.queue,
            host: &mut self.host,
            tick: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// TestLevels
// ---------------------------------------------------------------------------

/// A headless Bevy App with `LevelControlPlugin` and a [`TestHost`].
pub struct TestLevels {
    app: App,
}

impl TestLevels {
    pub fn new(host: TestHost) -> Self {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins);
        app.add_plugins(LevelControlPlugin);
        app.insert_resource(SimHost::new(host));
        Self { app }
    }

    pub fn with_settings(mut self, settings: LevelSettings) -> Self {
        self.app.insert_resource(settings);
        self
    }

    /// Run N fixed-update steps.
    pub fn tick(&mut self, n: u32) {
        for _ in 0..n {
            self.app.world_mut().run_schedule(FixedUpdate);
        }
    }

    pub fn world_mut(&mut self) -> &mut World {
        self.app.world_mut()
    }

    pub fn resource<T: Resource>(&self) -> &T {
        self.app.world().resource::<T>()
    }

    pub fn resource_mut<T: Resource>(&mut self) -> Mut<'_, T> {
        self.app.world_mut().resource_mut::<T>()
    }

    /// Queue an action as if a player had requested it.
    pub fn enqueue(&mut self, action: LevelAction) {
        let tick = self.resource::<TickCounter>().0;
        self.resource_mut::<LevelActionQueue>()
            .push(tick, ActionSource::Player, action);
    }

    pub fn building(&self, id: BuildingId) -> BuildingRecord {
        self.resource::<SimHost>()
            .0
            .building(id)
            .cloned()
            .expect("building slot should exist")
    }

    pub fn building_mut(&mut self, id: BuildingId) -> &mut BuildingRecord {
        self.app
            .world_mut()
            .resource_mut::<SimHost>()
            .into_inner()
            .0
            .building_mut(id)
            .expect("building slot should exist")
    }

    pub fn policy(&self) -> &LevelPolicy {
        self.resource::<LevelPolicy>()
    }

    pub fn result_log(&self) -> &ActionResultLog {
        self.resource::<ActionResultLog>()
    }

    /// Run `f` against a [`LevelEngine`] built from the App's resources, as a
    /// host hook would.
    pub fn with_engine<R>(&mut self, f: impl FnOnce(&mut LevelEngine<'_>) -> R) -> R {
        crate::context::with_engine(self.app.world_mut(), f)
            .expect("SimHost should be installed")
    }

    pub fn assert_level(&self, id: BuildingId, expected: u8) {
        let actual = self.building(id).level;
        assert_eq!(
            actual, expected,
            "expected building {} at level {expected}, found {actual}",
            id.0
        );
    }
}
