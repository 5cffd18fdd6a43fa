use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use horde_sim::{
    HordeConfig, HordeMap, HordeMapFlavors, MonsterTypeTable, Overmap, PointAbsOm, TripointAbsMs,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

fn populated_map(count: usize, types: &MonsterTypeTable) -> HordeMap {
    let mut rng = ChaCha8Rng::seed_from_u64(0x0DE5_u64);
    let mut map = HordeMap::new(PointAbsOm::zero());
    for _ in 0..count {
        let tile = TripointAbsMs::new(rng.gen_range(0..4320), rng.gen_range(0..4320), 0);
        let type_id = if rng.gen_bool(0.3) {
            "mon_dormant_zombie"
        } else {
            "mon_zombie"
        };
        map.spawn_entity(tile, type_id.into(), types);
    }
    map
}

fn bench_views(c: &mut Criterion) {
    let types = HordeConfig::builtin().monster_type_table();
    let mut group = c.benchmark_group("horde_view");

    for count in [1_000usize, 10_000, 50_000] {
        let map = populated_map(count, &types);
        group.bench_with_input(BenchmarkId::new("idle_dormant", count), &map, |b, map| {
            b.iter(|| {
                map.get_view(HordeMapFlavors::IDLE | HordeMapFlavors::DORMANT)
                    .iter()
                    .map(|(_, entity)| entity.moves)
                    .sum::<i32>()
            })
        });
    }

    group.finish();
}

fn bench_migration(c: &mut Criterion) {
    let config = HordeConfig::builtin();
    let types = config.monster_type_table();
    let mut group = c.benchmark_group("horde_move");

    for count in [100usize, 1_000] {
        group.bench_with_input(BenchmarkId::new("alerted", count), &count, |b, &count| {
            b.iter_batched(
                || {
                    let mut overmap = Overmap::from_config(PointAbsOm::zero(), &config)
                        .expect("builtin config builds");
                    let mut rng = ChaCha8Rng::seed_from_u64(count as u64);
                    for _ in 0..count {
                        let tile = TripointAbsMs::new(
                            rng.gen_range(0..4320),
                            rng.gen_range(0..4320),
                            0,
                        );
                        overmap.spawn_monster(tile, "mon_zombie".into(), &types);
                    }
                    overmap.signal_entities(TripointAbsMs::new(2160, 2160, 0), 400);
                    overmap
                },
                |mut overmap| {
                    for turn in 1..=5 {
                        overmap.move_hordes(turn, &types);
                    }
                    overmap.hordes().len()
                },
                BatchSize::LargeInput,
            )
        });
    }

    group.finish();
}

criterion_group!(horde_benches, bench_views, bench_migration);
criterion_main!(horde_benches);
