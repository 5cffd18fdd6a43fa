//! Overmap-scale horde simulation.
//!
//! Tracks wandering monsters that are too far from the player to simulate
//! tile by tile. Each [`Overmap`] owns a [`HordeMap`] spatial index and a
//! cache of per-OMT passability summaries; [`run_turn`] advances the active
//! hordes one step.

pub mod coords;
pub mod horde_config;
mod horde_entity;
mod horde_map;
pub mod map_data;
mod overmap;
mod resources;
mod systems;

use bevy::prelude::*;

pub use coords::{
    project_combine, squares_closer_to, PointAbsOm, PointRelMs, TripointAbsMs, TripointOmMs,
    TripointOmOmt, TripointOmSm,
};
pub use horde_config::{
    load_horde_config_from_env, HordeConfig, HordeConfigError, HordeConfigHandle,
    HordeConfigMetadata, MonsterTypeTable,
};
pub use horde_entity::{HordeEntity, MonsterTypeId, MonsterTypeLookup};
pub use horde_map::{
    HordeBucket, HordeCursor, HordeIter, HordeIterMut, HordeMap, HordeMapFlavor, HordeMapFlavors,
    HordeNode, HordeView,
};
pub use map_data::{
    MapDataCache, MapDataError, MapDataPlaceholders, MapDataSlot, MapDataSummary, PassableBits,
    TravelCostType,
};
pub use overmap::{Overmap, OvermapError};
pub use resources::{HordeMigrationQueue, SimulationTick};

/// Construct a Bevy [`App`] running the horde turn pipeline on the overmap at the world origin.
pub fn build_headless_app() -> App {
    build_headless_app_at(PointAbsOm::zero())
}

/// Construct a Bevy [`App`] running the horde turn pipeline on the overmap at `location`.
pub fn build_headless_app_at(location: PointAbsOm) -> App {
    let mut app = App::new();

    let (mut config, mut metadata) = load_horde_config_from_env();
    let overmap = match Overmap::from_config(location, &config) {
        Ok(overmap) => overmap,
        Err(err) => {
            tracing::warn!(
                target: "horde_sim::config",
                error = %err,
                "horde_config.overmap_rejected"
            );
            config = HordeConfig::builtin();
            metadata = HordeConfigMetadata::new(None);
            Overmap::from_config(location, &config)
                .expect("builtin horde config should build an overmap")
        }
    };
    let types = config.monster_type_table();

    app.insert_resource(HordeConfigHandle::new(config))
        .insert_resource(metadata)
        .insert_resource(types)
        .insert_resource(overmap)
        .insert_resource(SimulationTick::default())
        .insert_resource(HordeMigrationQueue::default())
        .add_plugins(MinimalPlugins)
        .add_systems(
            Update,
            (systems::advance_tick, systems::move_hordes).chain(),
        );

    app
}

/// Execute a single simulation turn.
///
/// Each call bumps [`SimulationTick`] and then moves the active hordes of the
/// [`Overmap`] resource; entities leaving the overmap land in
/// [`HordeMigrationQueue`].
pub fn run_turn(app: &mut App) {
    app.update();
}
