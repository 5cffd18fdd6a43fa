use std::collections::BTreeMap;

use horde_sim::{
    HordeEntity, HordeMap, HordeMapFlavor, HordeMapFlavors, HordeNode, MonsterTypeId,
    MonsterTypeLookup, PointAbsOm, TripointAbsMs,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

struct Types;

impl MonsterTypeLookup for Types {
    fn is_dormant(&self, id: &MonsterTypeId) -> bool {
        id.as_str() == "mon_dormant_zombie"
    }

    fn speed(&self, _id: &MonsterTypeId) -> i32 {
        100
    }
}

fn flavor_sets() -> Vec<HordeMapFlavors> {
    (0..8u8).map(HordeMapFlavors::from_bits_truncate).collect()
}

fn assert_consistent(map: &HordeMap, model: &BTreeMap<TripointAbsMs, HordeMapFlavor>) {
    for flavor in HordeMapFlavor::ALL {
        for (submap, count) in map.submap_counts(flavor) {
            assert!(count > 0, "empty bucket at {submap:?}");
        }
    }
    for flavors in flavor_sets() {
        let expected = model
            .values()
            .filter(|flavor| flavors.contains(flavor.flag()))
            .count();
        assert_eq!(map.get_view(flavors).iter().count(), expected, "{flavors:?}");
        assert_eq!(map.count(flavors), expected, "{flavors:?}");
    }
    let mut cursor = map.begin(HordeMapFlavors::all());
    let mut walked = 0;
    while !cursor.is_end() {
        let key = cursor.key().expect("cursor not at end has a key");
        assert_eq!(model.get(&key).copied(), cursor.flavor());
        walked += 1;
        cursor = map.advance(cursor);
    }
    assert_eq!(walked, model.len());
}

fn random_tile(rng: &mut ChaCha8Rng) -> TripointAbsMs {
    TripointAbsMs::new(rng.gen_range(0..96), rng.gen_range(0..96), rng.gen_range(-1..=1))
}

#[test]
fn scripted_operations_keep_partitions_consistent() {
    for seed in 0..8u64 {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut map = HordeMap::new(PointAbsOm::zero());
        let mut model: BTreeMap<TripointAbsMs, HordeMapFlavor> = BTreeMap::new();

        for _ in 0..400 {
            match rng.gen_range(0..5) {
                0 | 1 => {
                    let tile = random_tile(&mut rng);
                    if model.contains_key(&tile) {
                        continue;
                    }
                    let type_id = if rng.gen_bool(0.4) {
                        "mon_dormant_zombie"
                    } else {
                        "mon_zombie"
                    };
                    let cursor = map.spawn_entity(tile, type_id.into(), &Types);
                    model.insert(tile, cursor.flavor().expect("spawn returns a live cursor"));
                }
                2 => {
                    let cursor = map.find_abs(random_tile(&mut rng));
                    if let Some(key) = cursor.key() {
                        map.erase(cursor);
                        model.remove(&key);
                    }
                }
                3 => {
                    // wake or settle whatever is under a random tile
                    let cursor = map.find_abs(random_tile(&mut rng));
                    if cursor.is_end() {
                        continue;
                    }
                    let Some(mut node) = map.extract(cursor) else {
                        continue;
                    };
                    let key = node.key();
                    if node.entity().is_active() {
                        node.entity_mut().settle();
                    } else {
                        node.entity_mut().wander_to(TripointAbsMs::new(0, 0, 0), 10);
                    }
                    node.reclassify();
                    model.insert(key, node.flavor());
                    map.insert(node);
                }
                _ => {
                    // sweep the active set, moving every entity one tile east
                    let mut moved = Vec::new();
                    let mut cursor = map.begin(HordeMapFlavors::ACTIVE);
                    while !cursor.is_end() {
                        let next = map.advance(cursor);
                        let target = cursor.key().map(|key| {
                            TripointAbsMs::new(key.x() + 1, key.y(), key.z())
                        });
                        match target {
                            Some(target) if !model.contains_key(&target) => {
                                if let Some(mut node) = map.extract(cursor) {
                                    model.remove(&node.key());
                                    node.set_key(target);
                                    model.insert(target, node.flavor());
                                    moved.push(node);
                                }
                            }
                            _ => {}
                        }
                        cursor = next;
                    }
                    for node in moved {
                        map.insert(node);
                    }
                }
            }
            assert_consistent(&map, &model);
        }
    }
}

#[test]
fn extract_and_insert_preserve_identity() {
    let mut map = HordeMap::new(PointAbsOm::new(1, 0));
    let tile = TripointAbsMs::new(4320 + 17, 40, 0);
    let mut entity = HordeEntity::new("mon_zombie".into(), false);
    entity.monster_data = Some(serde_json::json!({ "hp": 80, "faction": "zombie" }));
    entity.last_processed = 42;
    map.spawn(tile, entity.clone());

    let cursor = map.find_abs(tile);
    let mut node: HordeNode = map.extract(cursor).expect("entity present");
    assert!(map.is_empty());
    assert_eq!(node.key(), tile);
    assert_eq!(node.entity(), &entity);

    node.entity_mut().moves = 30;
    map.insert(node);
    let restored = map.get(map.find_abs(tile)).map(|(_, entity)| entity.clone());
    let mut expected = entity;
    expected.moves = 30;
    assert_eq!(restored, Some(expected));
}
