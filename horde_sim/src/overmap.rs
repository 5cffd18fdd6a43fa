//! One overmap's share of the world: its horde index plus the passability
//! summaries of its terrain.

use std::{collections::BTreeSet, sync::Arc};

use bevy::prelude::Resource;
use thiserror::Error;
use tracing::{debug, info, trace};

use crate::coords::{
    project_combine,
    scale::{Ms, Om, Omt},
    squares_closer_to, trig_dist, PointAbsOm, PointOmtMsIb, PointRelMs, TripointAbsMs,
    TripointOmMs, TripointOmOmt, TripointOmSm, OVERMAP_DEPTH, OVERMAP_HEIGHT, SEEX, SEEY,
};
use crate::horde_config::{HordeConfig, HordeConfigError, MovementConfig, SignalConfig};
use crate::horde_entity::{HordeEntity, MonsterTypeId, MonsterTypeLookup};
use crate::horde_map::{HordeBucket, HordeCursor, HordeMap, HordeMapFlavors, HordeNode};
use crate::map_data::{
    MapDataCache, MapDataError, MapDataPlaceholders, MapDataSlot, MapDataSummary, PassableBits,
    TravelCostType,
};

#[derive(Debug, Error)]
pub enum OvermapError {
    #[error(transparent)]
    MapData(#[from] MapDataError),
    #[error(transparent)]
    Config(#[from] HordeConfigError),
    #[error("overmap terrain {omt} lies outside the overmap")]
    OutOfBounds { omt: TripointOmOmt },
}

/// What one active entity does this turn.
enum Step {
    Stay,
    Settle,
    Move(TripointAbsMs),
}

#[derive(Resource, Debug)]
pub struct Overmap {
    location: PointAbsOm,
    hordes: HordeMap,
    map_cache: MapDataCache,
    placeholders: Arc<MapDataPlaceholders>,
    movement: MovementConfig,
    signal: SignalConfig,
}

impl Overmap {
    /// An overmap with no summaries populated.
    pub fn new(location: PointAbsOm, placeholders: Arc<MapDataPlaceholders>) -> Self {
        Self {
            location,
            hordes: HordeMap::new(location),
            map_cache: MapDataCache::new(),
            placeholders,
            movement: MovementConfig::default(),
            signal: SignalConfig::default(),
        }
    }

    /// An overmap whose every OMT starts on the configured default placeholder.
    pub fn from_config(location: PointAbsOm, config: &HordeConfig) -> Result<Self, OvermapError> {
        let placeholders = Arc::new(config.placeholders()?);
        let default = placeholders.get(&config.default_placeholder)?;
        let mut overmap = Self::new(location, placeholders);
        overmap.movement = config.movement.clone();
        overmap.signal = config.signal.clone();
        overmap.map_cache.fill_with(&default);
        info!(
            target: "horde_sim::map_data",
            overmap = %location,
            placeholder = %config.default_placeholder,
            "map_data.populated=placeholder"
        );
        Ok(overmap)
    }

    pub fn location(&self) -> PointAbsOm {
        self.location
    }

    pub fn set_location(&mut self, location: PointAbsOm) {
        self.location = location;
        self.hordes.set_location(location);
    }

    pub fn hordes(&self) -> &HordeMap {
        &self.hordes
    }

    pub fn hordes_mut(&mut self) -> &mut HordeMap {
        &mut self.hordes
    }

    pub fn map_cache(&self) -> &MapDataCache {
        &self.map_cache
    }

    /// Overmap-relative position of an absolute tile, if it lies on this overmap.
    pub fn local_tile(&self, tile: TripointAbsMs) -> Option<TripointOmMs> {
        let (overmap, local) = tile.project_remain::<Om>();
        let z_ok = (-OVERMAP_DEPTH..=OVERMAP_HEIGHT).contains(&local.z());
        (overmap == self.location && z_ok).then_some(local)
    }

    pub fn inbounds(&self, tile: TripointAbsMs) -> bool {
        self.local_tile(tile).is_some()
    }

    fn split_tile(p: TripointOmMs) -> (TripointOmOmt, PointOmtMsIb) {
        let (omt, within) = p.project_remain::<Omt>();
        (
            omt.with_z(within.z()),
            PointOmtMsIb::from_remainder(within.xy()),
        )
    }

    /// Terrain allows the tile and no horde entity occupies it.
    pub fn passable(&self, p: TripointOmMs) -> bool {
        let (omt, within) = Self::split_tile(p);
        self.map_cache.passable(omt, within) && self.hordes.entity_at(p).is_none()
    }

    /// Overwrites one tile's terrain bit. Returns false when no summary covers it.
    pub fn set_passable(&mut self, p: TripointOmMs, passable: bool) -> bool {
        let (omt, within) = Self::split_tile(p);
        self.map_cache.set_passable(omt, within, passable)
    }

    fn replace_slot(&mut self, omt: TripointOmOmt, slot: MapDataSlot) -> Result<(), OvermapError> {
        if self.map_cache.replace(omt, slot) {
            Ok(())
        } else {
            Err(OvermapError::OutOfBounds { omt })
        }
    }

    pub fn set_omt_placeholder(
        &mut self,
        omt: TripointOmOmt,
        id: &str,
    ) -> Result<(), OvermapError> {
        let placeholder = self.placeholders.get(id)?;
        self.replace_slot(omt, MapDataSlot::Placeholder(placeholder))
    }

    pub fn set_omt_travel_cost(
        &mut self,
        omt: TripointOmOmt,
        travel_cost: TravelCostType,
    ) -> Result<(), OvermapError> {
        let placeholder = self.placeholders.for_travel_cost(travel_cost)?;
        self.replace_slot(omt, MapDataSlot::Placeholder(placeholder))
    }

    pub fn set_omt_summary_bits(
        &mut self,
        omt: TripointOmOmt,
        bits: PassableBits,
    ) -> Result<(), OvermapError> {
        let summary = MapDataSummary::owned(bits);
        self.replace_slot(omt, MapDataSlot::Owned(Box::new(summary)))
    }

    /// Installs a persisted base64 summary for one OMT.
    pub fn load_omt_summary(
        &mut self,
        omt: TripointOmOmt,
        encoded: &str,
    ) -> Result<(), OvermapError> {
        let bits = PassableBits::from_base64(encoded)?;
        self.set_omt_summary_bits(omt, bits)
    }

    pub fn omt_summary(&self, omt: TripointOmOmt) -> Option<&MapDataSummary> {
        self.map_cache.summary(omt)
    }

    pub fn spawn_monster(
        &mut self,
        tile: TripointAbsMs,
        type_id: MonsterTypeId,
        types: &impl MonsterTypeLookup,
    ) -> HordeCursor {
        debug_assert!(self.inbounds(tile), "spawn outside overmap at {tile}");
        self.hordes.spawn_entity(tile, type_id, types)
    }

    /// Scans a submap row by row from `cursor` for a passable tile.
    ///
    /// `cursor` is left on the tile found, so repeated calls resume where the
    /// previous one stopped once that tile is occupied.
    pub fn find_open_space_in_submap(
        &self,
        submap_origin: TripointOmMs,
        cursor: &mut PointRelMs,
    ) -> Option<TripointOmMs> {
        while cursor.y() < SEEY {
            while cursor.x() < SEEX {
                let candidate = submap_origin + *cursor;
                if self.passable(candidate) {
                    return Some(candidate);
                }
                *cursor = PointRelMs::new(cursor.x() + 1, cursor.y());
            }
            *cursor = PointRelMs::new(0, cursor.y() + 1);
        }
        None
    }

    /// Places entities on open tiles of one submap until it runs out of room.
    /// Returns how many were placed.
    pub fn spawn_monsters_in_submap(
        &mut self,
        submap: TripointOmSm,
        entities: impl IntoIterator<Item = HordeEntity>,
    ) -> usize {
        let origin = submap.project_to::<Ms>();
        let mut cursor = PointRelMs::zero();
        let mut placed = 0;
        for entity in entities {
            let Some(open) = self.find_open_space_in_submap(origin, &mut cursor) else {
                debug!(
                    target: "horde_sim::hordes",
                    %submap,
                    placed,
                    "horde.submap_full"
                );
                break;
            };
            let tile = project_combine(self.location, open);
            self.hordes.spawn(tile, entity);
            placed += 1;
        }
        placed
    }

    /// Spawns `count` fresh members of one type into a submap.
    pub fn spawn_group_in_submap(
        &mut self,
        submap: TripointOmSm,
        type_id: &MonsterTypeId,
        count: usize,
        types: &impl MonsterTypeLookup,
    ) -> usize {
        let entities = (0..count).map(|_| HordeEntity::spawn(type_id.clone(), types));
        self.spawn_monsters_in_submap(submap, entities)
    }

    pub fn entity_at(&self, p: TripointOmMs) -> Option<&HordeEntity> {
        self.hordes.entity_at(p)
    }

    pub fn hordes_at(&self, omt: TripointOmOmt) -> Vec<&HordeBucket> {
        self.hordes.entity_group_at(omt)
    }

    /// Points the entity at `location` toward `destination` if `intensity`
    /// beats its current tracking intensity. Returns whether it was alerted.
    pub fn alert_entity(
        &mut self,
        location: TripointOmMs,
        destination: TripointAbsMs,
        intensity: i32,
    ) -> bool {
        let cursor = self.hordes.find(location);
        self.alert_at(cursor, destination, intensity)
    }

    fn alert_at(
        &mut self,
        cursor: HordeCursor,
        destination: TripointAbsMs,
        intensity: i32,
    ) -> bool {
        let current = match self.hordes.get(cursor) {
            Some((_, entity)) => entity.tracking_intensity,
            None => return false,
        };
        if intensity <= current {
            return false;
        }
        let Some(mut node) = self.hordes.extract(cursor) else {
            return false;
        };
        node.entity_mut().wander_to(destination, intensity);
        node.reclassify();
        trace!(
            target: "horde_sim::hordes",
            tile = %node.key(),
            %destination,
            intensity,
            "horde.alerted"
        );
        self.hordes.insert(node);
        true
    }

    /// Draws every entity within earshot of a noise at `source`.
    ///
    /// The noise reaches `power * tiles_per_power` tiles on the same z-level;
    /// a listener at distance `d` is alerted with intensity `radius - d`.
    pub fn signal_entities(&mut self, source: TripointAbsMs, power: i32) -> usize {
        let radius = power.saturating_mul(self.signal.tiles_per_power);
        if radius <= 0 {
            return 0;
        }
        let listeners: Vec<(TripointAbsMs, i32)> = self
            .hordes
            .iter()
            .filter(|(tile, _)| tile.z() == source.z())
            .filter_map(|(tile, entity)| {
                let intensity = radius - trig_dist(*tile, source);
                (intensity > 0 && intensity > entity.tracking_intensity)
                    .then_some((*tile, intensity))
            })
            .collect();

        let alerted = listeners
            .into_iter()
            .filter(|(tile, intensity)| {
                let cursor = self.hordes.find_abs(*tile);
                self.alert_at(cursor, source, *intensity)
            })
            .count();
        debug!(
            target: "horde_sim::hordes",
            %source,
            power,
            radius,
            alerted,
            "horde.signal"
        );
        alerted
    }

    /// Steps are allowed off the overmap; the receiving side decides what happens.
    fn step_passable(&self, tile: TripointAbsMs, claimed: &BTreeSet<TripointAbsMs>) -> bool {
        if claimed.contains(&tile) {
            return false;
        }
        match self.local_tile(tile) {
            Some(local) => self.passable(local),
            None => true,
        }
    }

    fn plan_step(
        &mut self,
        cursor: HordeCursor,
        turn: u64,
        types: &impl MonsterTypeLookup,
        claimed: &BTreeSet<TripointAbsMs>,
    ) -> Step {
        let Some(tile) = cursor.key() else {
            return Step::Stay;
        };
        let Some(entity) = self.hordes.get_mut(cursor) else {
            return Step::Stay;
        };
        if entity.last_processed == turn {
            return Step::Stay;
        }
        entity.last_processed = turn;
        let destination = match entity.destination {
            Some(destination) if entity.tracking_intensity > 0 && destination != tile => {
                destination
            }
            _ => return Step::Settle,
        };
        entity.tracking_intensity -= 1;
        entity.moves += types.speed(&entity.type_id);
        if entity.moves <= 0 {
            return Step::Stay;
        }

        let target = squares_closer_to(tile, destination)
            .into_iter()
            .filter(|candidate| candidate.z() == tile.z())
            .find(|candidate| self.step_passable(*candidate, claimed));
        let Some(target) = target else {
            return Step::Stay;
        };
        let move_cost = self.movement.move_cost;
        if let Some(entity) = self.hordes.get_mut(cursor) {
            entity.moves -= move_cost;
            if target == destination {
                entity.tracking_intensity = 0;
            }
        }
        Step::Move(target)
    }

    /// Advances every active entity by at most one tile toward its destination.
    ///
    /// Entities that arrive or run out of tracking intensity settle back into
    /// the idle or dormant partition. Entities whose step leaves this overmap
    /// are removed and returned to the caller.
    pub fn move_hordes(&mut self, turn: u64, types: &impl MonsterTypeLookup) -> Vec<HordeNode> {
        let mut staying = Vec::new();
        let mut migrating = Vec::new();
        let mut claimed = BTreeSet::new();

        let mut cursor = self.hordes.begin(HordeMapFlavors::ACTIVE);
        while !cursor.is_end() {
            let next = self.hordes.advance(cursor);
            match self.plan_step(cursor, turn, types, &claimed) {
                Step::Stay => {}
                Step::Settle => {
                    if let Some(mut node) = self.hordes.extract(cursor) {
                        node.entity_mut().settle();
                        node.reclassify();
                        claimed.insert(node.key());
                        staying.push(node);
                    }
                }
                Step::Move(target) => {
                    if let Some(mut node) = self.hordes.extract(cursor) {
                        node.set_key(target);
                        if node.entity().tracking_intensity <= 0 {
                            node.entity_mut().settle();
                            node.reclassify();
                        }
                        claimed.insert(target);
                        if self.inbounds(target) {
                            staying.push(node);
                        } else {
                            migrating.push(node);
                        }
                    }
                }
            }
            cursor = next;
        }

        let moved = staying.len();
        for node in staying {
            self.hordes.insert(node);
        }
        debug!(
            target: "horde_sim::hordes",
            overmap = %self.location,
            turn,
            moved,
            migrating = migrating.len(),
            "horde.moved"
        );
        migrating
    }
}
