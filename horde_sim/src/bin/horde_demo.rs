use std::env;

use tracing::info;

use horde_sim::{
    build_headless_app, run_turn, HordeMapFlavors, HordeMigrationQueue, MonsterTypeTable, Overmap,
    SimulationTick, TripointAbsMs, TripointOmSm,
};

const DEFAULT_TURNS: u64 = 20;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let turns = env::args()
        .nth(1)
        .and_then(|arg| arg.parse::<u64>().ok())
        .unwrap_or(DEFAULT_TURNS);

    let mut app = build_headless_app();
    let types = app.world.resource::<MonsterTypeTable>().clone();
    {
        let mut overmap = app.world.resource_mut::<Overmap>();
        let walkers = overmap.spawn_group_in_submap(
            TripointOmSm::new(10, 10, 0),
            &"mon_zombie".into(),
            40,
            &types,
        );
        let sleepers = overmap.spawn_group_in_submap(
            TripointOmSm::new(12, 10, 0),
            &"mon_dormant_zombie".into(),
            20,
            &types,
        );
        let alerted = overmap.signal_entities(TripointAbsMs::new(150, 126, 0), 4);
        info!(walkers, sleepers, alerted, "horde_demo.seeded");
    }

    for _ in 0..turns {
        run_turn(&mut app);
        let tick = app.world.resource::<SimulationTick>().0;
        let hordes = app.world.resource::<Overmap>().hordes();
        info!(
            tick,
            active = hordes.count(HordeMapFlavors::ACTIVE),
            idle = hordes.count(HordeMapFlavors::IDLE),
            dormant = hordes.count(HordeMapFlavors::DORMANT),
            "horde_demo.turn"
        );
    }

    let migrated = app.world.resource::<HordeMigrationQueue>().len();
    info!(turns, migrated, "horde_demo.finished");
}
