use bevy::prelude::*;
use tracing::info;

use crate::{
    horde_config::MonsterTypeTable,
    overmap::Overmap,
    resources::{HordeMigrationQueue, SimulationTick},
};

/// Increment global tick counter ahead of resolving the turn.
pub fn advance_tick(mut tick: ResMut<SimulationTick>) {
    tick.0 = tick.0.wrapping_add(1);
}

/// Step active hordes toward their destinations and queue the ones leaving the overmap.
pub fn move_hordes(
    tick: Res<SimulationTick>,
    types: Res<MonsterTypeTable>,
    mut overmap: ResMut<Overmap>,
    mut migrations: ResMut<HordeMigrationQueue>,
) {
    let migrating = overmap.move_hordes(tick.0, &*types);
    if migrating.is_empty() {
        return;
    }
    for node in &migrating {
        info!(
            target: "horde_sim::hordes",
            turn = tick.0,
            tile = %node.key(),
            type_id = %node.entity().type_id,
            "horde.left_overmap"
        );
    }
    migrations.extend(migrating);
}
