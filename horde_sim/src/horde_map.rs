//! Spatial index of horde entities for a single overmap.
//!
//! Entities live in one of three partitions (active, idle, dormant). Each
//! partition is a two-level ordered map: submap (relative to the overmap) to
//! absolute tile to entity. A submap entry is removed as soon as its last
//! entity leaves, so no partition ever holds an empty bucket; traversal code
//! relies on that.
//!
//! Two ways to walk the index:
//! - [`HordeView`] / [`HordeIter`] borrow the map and iterate a filtered set of
//!   partitions. The borrow rules out structural changes while iterating.
//! - [`HordeCursor`] is a plain key triple. Cursors survive [`HordeMap::erase`]
//!   and [`HordeMap::extract`] because [`HordeMap::advance`] re-locates the
//!   successor from the keys on every step.

use std::collections::btree_map::{self, BTreeMap};
use std::ops::Bound::{Excluded, Unbounded};

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::coords::{
    project_combine,
    scale::{Om, Sm},
    PointAbsOm, PointRelSm, TripointAbsMs, TripointOmMs, TripointOmOmt, TripointOmSm,
    OMT_SM_SIZE,
};
use crate::horde_entity::{HordeEntity, MonsterTypeId, MonsterTypeLookup};

/// Entities of one submap within one partition, keyed by absolute tile.
pub type HordeBucket = BTreeMap<TripointAbsMs, HordeEntity>;

type Partition = BTreeMap<TripointOmSm, HordeBucket>;

bitflags! {
    /// Set of partitions a view or cursor walks.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct HordeMapFlavors: u8 {
        const ACTIVE = 1 << 0;
        const IDLE = 1 << 1;
        const DORMANT = 1 << 2;
    }
}

impl Default for HordeMapFlavors {
    fn default() -> Self {
        Self::all()
    }
}

/// A single partition of the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HordeMapFlavor {
    Active,
    Idle,
    Dormant,
}

impl HordeMapFlavor {
    /// Traversal order.
    pub const ALL: [Self; 3] = [Self::Active, Self::Idle, Self::Dormant];

    pub fn flag(self) -> HordeMapFlavors {
        match self {
            Self::Active => HordeMapFlavors::ACTIVE,
            Self::Idle => HordeMapFlavors::IDLE,
            Self::Dormant => HordeMapFlavors::DORMANT,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Idle => "idle",
            Self::Dormant => "dormant",
        }
    }

    #[inline]
    fn index(self) -> usize {
        self as usize
    }

    /// Partitions visited after this one.
    fn following(self) -> &'static [Self] {
        &Self::ALL[self.index() + 1..]
    }
}

/// An entity removed from the index, owned by the caller until re-inserted.
///
/// `flavor` names the partition [`HordeMap::insert`] will place the node in.
/// Extraction records the partition the entity came from; callers that change
/// the entity's state pick the new partition explicitly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HordeNode {
    key: TripointAbsMs,
    flavor: HordeMapFlavor,
    entity: HordeEntity,
}

impl HordeNode {
    pub fn new(key: TripointAbsMs, flavor: HordeMapFlavor, entity: HordeEntity) -> Self {
        Self {
            key,
            flavor,
            entity,
        }
    }

    pub fn key(&self) -> TripointAbsMs {
        self.key
    }

    pub fn set_key(&mut self, key: TripointAbsMs) {
        self.key = key;
    }

    pub fn flavor(&self) -> HordeMapFlavor {
        self.flavor
    }

    pub fn set_flavor(&mut self, flavor: HordeMapFlavor) {
        self.flavor = flavor;
    }

    /// Targets the partition matching the entity's current state.
    pub fn reclassify(&mut self) {
        self.flavor = self.entity.preferred_flavor();
    }

    pub fn entity(&self) -> &HordeEntity {
        &self.entity
    }

    pub fn entity_mut(&mut self) -> &mut HordeEntity {
        &mut self.entity
    }

    pub fn into_entity(self) -> HordeEntity {
        self.entity
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CursorPosition {
    flavor: HordeMapFlavor,
    submap: TripointOmSm,
    tile: TripointAbsMs,
}

/// Key-based position in a [`HordeMap`] traversal.
///
/// A cursor is either at an entry or at the end. All end cursors compare
/// equal, whichever filter produced them.
#[derive(Debug, Clone, Copy)]
pub struct HordeCursor {
    flavors: HordeMapFlavors,
    position: Option<CursorPosition>,
}

impl HordeCursor {
    pub fn end() -> Self {
        Self {
            flavors: HordeMapFlavors::empty(),
            position: None,
        }
    }

    pub fn is_end(&self) -> bool {
        self.position.is_none()
    }

    pub fn flavors(&self) -> HordeMapFlavors {
        self.flavors
    }

    /// Partition of the entry under the cursor.
    pub fn flavor(&self) -> Option<HordeMapFlavor> {
        self.position.map(|position| position.flavor)
    }

    /// Tile of the entry under the cursor.
    pub fn key(&self) -> Option<TripointAbsMs> {
        self.position.map(|position| position.tile)
    }
}

impl PartialEq for HordeCursor {
    fn eq(&self, other: &Self) -> bool {
        self.position == other.position
    }
}

impl Eq for HordeCursor {}

/// The horde entities of one overmap, partitioned by behaviour.
#[derive(Debug, Clone, Default)]
pub struct HordeMap {
    location: PointAbsOm,
    partitions: [Partition; 3],
}

impl HordeMap {
    pub fn new(location: PointAbsOm) -> Self {
        Self {
            location,
            partitions: Default::default(),
        }
    }

    /// Rebuilds an index from saved nodes, each placed in its recorded partition.
    pub fn from_records(location: PointAbsOm, nodes: impl IntoIterator<Item = HordeNode>) -> Self {
        let mut map = Self::new(location);
        for node in nodes {
            map.insert(node);
        }
        map
    }

    pub fn set_location(&mut self, location: PointAbsOm) {
        self.location = location;
    }

    pub fn location(&self) -> PointAbsOm {
        self.location
    }

    #[inline]
    fn partition(&self, flavor: HordeMapFlavor) -> &Partition {
        &self.partitions[flavor.index()]
    }

    #[inline]
    fn partition_mut(&mut self, flavor: HordeMapFlavor) -> &mut Partition {
        &mut self.partitions[flavor.index()]
    }

    /// Bucket key of an absolute tile: its submap relative to the containing overmap.
    pub fn submap_key(tile: TripointAbsMs) -> TripointOmSm {
        let (_, submap) = tile.project_to::<Sm>().project_remain::<Om>();
        submap
    }

    fn contains_in(
        &self,
        flavor: HordeMapFlavor,
        submap: TripointOmSm,
        tile: TripointAbsMs,
    ) -> bool {
        self.partition(flavor)
            .get(&submap)
            .is_some_and(|bucket| bucket.contains_key(&tile))
    }

    /// Cursor at the entity on overmap tile `p`, or the end cursor.
    ///
    /// Partitions are probed active, idle, then dormant.
    pub fn find(&self, p: TripointOmMs) -> HordeCursor {
        let tile: TripointAbsMs = project_combine(self.location, p);
        self.find_abs(tile)
    }

    pub fn find_abs(&self, tile: TripointAbsMs) -> HordeCursor {
        let submap = Self::submap_key(tile);
        HordeMapFlavor::ALL
            .into_iter()
            .find(|flavor| self.contains_in(*flavor, submap, tile))
            .map(|flavor| HordeCursor {
                flavors: HordeMapFlavors::all(),
                position: Some(CursorPosition {
                    flavor,
                    submap,
                    tile,
                }),
            })
            .unwrap_or_else(HordeCursor::end)
    }

    /// Probes each partition in turn. Both index levels are ordered maps, so
    /// a lookup costs O(log n) rather than constant time.
    pub fn entity_at(&self, p: TripointOmMs) -> Option<&HordeEntity> {
        let cursor = self.find(p);
        self.get(cursor).map(|(_, entity)| entity)
    }

    pub fn entity_at_mut(&mut self, p: TripointOmMs) -> Option<&mut HordeEntity> {
        let cursor = self.find(p);
        self.get_mut(cursor)
    }

    /// Spawns a fresh entity of `type_id` at `tile`.
    ///
    /// Dormant types land in the dormant partition, everything else starts
    /// idle. Spawning onto an occupied tile replaces the occupant.
    pub fn spawn_entity(
        &mut self,
        tile: TripointAbsMs,
        type_id: MonsterTypeId,
        types: &impl MonsterTypeLookup,
    ) -> HordeCursor {
        self.spawn(tile, HordeEntity::spawn(type_id, types))
    }

    /// Adds a prepared entity at `tile` in the partition its state calls for.
    pub fn spawn(&mut self, tile: TripointAbsMs, entity: HordeEntity) -> HordeCursor {
        let flavor = entity.preferred_flavor();
        trace!(
            target: "horde_sim::hordes",
            %tile,
            type_id = %entity.type_id,
            flavor = flavor.label(),
            "horde.spawned"
        );
        self.insert(HordeNode::new(tile, flavor, entity));
        HordeCursor {
            flavors: HordeMapFlavors::all(),
            position: Some(CursorPosition {
                flavor,
                submap: Self::submap_key(tile),
                tile,
            }),
        }
    }

    /// Places a node in the partition it names. An entity already on the
    /// same tile of that partition is overwritten.
    pub fn insert(&mut self, node: HordeNode) {
        let HordeNode {
            key,
            flavor,
            entity,
        } = node;
        let submap = Self::submap_key(key);
        if let Some(other) = HordeMapFlavor::ALL
            .into_iter()
            .find(|other| *other != flavor && self.contains_in(*other, submap, key))
        {
            warn!(
                target: "horde_sim::hordes",
                tile = %key,
                flavor = flavor.label(),
                existing = other.label(),
                "horde.insert_duplicates_tile"
            );
        }
        let previous = self
            .partition_mut(flavor)
            .entry(submap)
            .or_default()
            .insert(key, entity);
        if previous.is_some() {
            warn!(
                target: "horde_sim::hordes",
                tile = %key,
                flavor = flavor.label(),
                "horde.insert_overwrote_entity"
            );
        }
    }

    fn remove_at(&mut self, position: CursorPosition) -> Option<HordeEntity> {
        let partition = self.partition_mut(position.flavor);
        let bucket = partition.get_mut(&position.submap)?;
        let removed = bucket.remove(&position.tile);
        if bucket.is_empty() {
            partition.remove(&position.submap);
        }
        removed
    }

    /// Removes the entry under `cursor` and returns the cursor that follows it.
    pub fn erase(&mut self, cursor: HordeCursor) -> HordeCursor {
        debug_assert!(!cursor.is_end(), "erase called with an end cursor");
        if let Some(position) = cursor.position {
            self.remove_at(position);
        }
        self.advance(cursor)
    }

    /// Detaches the entry under `cursor` without dropping it.
    ///
    /// Returns `None` for an end cursor or one whose entry is already gone.
    /// Take the successor with [`advance`](Self::advance) before extracting if
    /// the traversal continues.
    pub fn extract(&mut self, cursor: HordeCursor) -> Option<HordeNode> {
        debug_assert!(!cursor.is_end(), "extract called with an end cursor");
        let position = cursor.position?;
        let entity = self.remove_at(position)?;
        Some(HordeNode::new(position.tile, position.flavor, entity))
    }

    pub fn clear(&mut self) {
        for partition in &mut self.partitions {
            partition.clear();
        }
    }

    /// Drops every entity of one submap across all partitions.
    pub fn clear_chunk(&mut self, submap: TripointOmSm) -> usize {
        let removed: usize = self
            .partitions
            .iter_mut()
            .filter_map(|partition| partition.remove(&submap))
            .map(|bucket| bucket.len())
            .sum();
        debug!(
            target: "horde_sim::hordes",
            %submap,
            removed,
            "horde.chunk_cleared"
        );
        removed
    }

    /// Per-partition buckets for the submaps inside one overmap terrain unit.
    pub fn entity_group_at(&self, omt: TripointOmOmt) -> Vec<&HordeBucket> {
        let origin = omt.project_to::<Sm>();
        let mut groups = Vec::new();
        for flavor in HordeMapFlavor::ALL {
            let partition = self.partition(flavor);
            for dy in 0..OMT_SM_SIZE {
                for dx in 0..OMT_SM_SIZE {
                    if let Some(bucket) = partition.get(&(origin + PointRelSm::new(dx, dy))) {
                        groups.push(bucket);
                    }
                }
            }
        }
        groups
    }

    pub fn count(&self, flavors: HordeMapFlavors) -> usize {
        HordeMapFlavor::ALL
            .into_iter()
            .filter(|flavor| flavors.contains(flavor.flag()))
            .map(|flavor| self.count_entities(flavor))
            .sum()
    }

    pub fn count_entities(&self, flavor: HordeMapFlavor) -> usize {
        self.partition(flavor).values().map(BTreeMap::len).sum()
    }

    pub fn len(&self) -> usize {
        self.count(HordeMapFlavors::all())
    }

    pub fn is_empty(&self) -> bool {
        self.partitions.iter().all(BTreeMap::is_empty)
    }

    /// Occupied submaps of one partition with their entity counts.
    pub fn submap_counts(
        &self,
        flavor: HordeMapFlavor,
    ) -> impl Iterator<Item = (TripointOmSm, usize)> + '_ {
        self.partition(flavor)
            .iter()
            .map(|(submap, bucket)| (*submap, bucket.len()))
    }

    /// Copies every entry out as a node tagged with its partition.
    pub fn to_records(&self) -> Vec<HordeNode> {
        HordeMapFlavor::ALL
            .into_iter()
            .flat_map(|flavor| {
                self.partition(flavor)
                    .values()
                    .flat_map(move |bucket| {
                        bucket
                            .iter()
                            .map(move |(key, entity)| HordeNode::new(*key, flavor, entity.clone()))
                    })
            })
            .collect()
    }

    pub fn get_view(&self, flavors: HordeMapFlavors) -> HordeView<'_> {
        HordeView { map: self, flavors }
    }

    pub fn get_view_mut(&mut self, flavors: HordeMapFlavors) -> HordeIterMut<'_> {
        HordeIterMut::new(&mut self.partitions, flavors)
    }

    pub fn iter(&self) -> HordeIter<'_> {
        HordeIter::new(&self.partitions, HordeMapFlavors::all())
    }

    pub fn iter_mut(&mut self) -> HordeIterMut<'_> {
        self.get_view_mut(HordeMapFlavors::all())
    }

    /// First cursor of a traversal restricted to `flavors`.
    pub fn begin(&self, flavors: HordeMapFlavors) -> HordeCursor {
        self.first_from(flavors, &HordeMapFlavor::ALL)
    }

    fn first_from(&self, flavors: HordeMapFlavors, candidates: &[HordeMapFlavor]) -> HordeCursor {
        let position = candidates
            .iter()
            .copied()
            .filter(|flavor| flavors.contains(flavor.flag()))
            .find_map(|flavor| first_in(self.partition(flavor).iter(), flavor));
        HordeCursor { flavors, position }
    }

    /// Cursor following `cursor` under its filter.
    ///
    /// Works from keys alone, so the entry under `cursor` may already have
    /// been erased or extracted.
    pub fn advance(&self, cursor: HordeCursor) -> HordeCursor {
        let Some(position) = cursor.position else {
            return cursor;
        };
        let partition = self.partition(position.flavor);

        let next_tile = partition.get(&position.submap).and_then(|bucket| {
            bucket
                .range((Excluded(position.tile), Unbounded))
                .next()
                .map(|(tile, _)| *tile)
        });
        if let Some(tile) = next_tile {
            return HordeCursor {
                flavors: cursor.flavors,
                position: Some(CursorPosition { tile, ..position }),
            };
        }

        let later = partition.range((Excluded(position.submap), Unbounded));
        if let Some(next) = first_in(later, position.flavor) {
            return HordeCursor {
                flavors: cursor.flavors,
                position: Some(next),
            };
        }

        self.first_from(cursor.flavors, position.flavor.following())
    }

    pub fn get(&self, cursor: HordeCursor) -> Option<(&TripointAbsMs, &HordeEntity)> {
        let position = cursor.position?;
        self.partition(position.flavor)
            .get(&position.submap)?
            .get_key_value(&position.tile)
    }

    pub fn get_mut(&mut self, cursor: HordeCursor) -> Option<&mut HordeEntity> {
        let position = cursor.position?;
        self.partition_mut(position.flavor)
            .get_mut(&position.submap)?
            .get_mut(&position.tile)
    }
}

fn first_in<'a>(
    mut buckets: impl Iterator<Item = (&'a TripointOmSm, &'a HordeBucket)>,
    flavor: HordeMapFlavor,
) -> Option<CursorPosition> {
    buckets.find_map(|(submap, bucket)| {
        bucket.keys().next().map(|tile| CursorPosition {
            flavor,
            submap: *submap,
            tile: *tile,
        })
    })
}

/// Next partition after `state` that the filter allows and that holds entities.
fn next_flavor(
    state: IterState,
    flavors: HordeMapFlavors,
    has_entries: impl Fn(HordeMapFlavor) -> bool,
) -> Option<HordeMapFlavor> {
    let candidates: &[HordeMapFlavor] = match state {
        IterState::Start => &HordeMapFlavor::ALL,
        IterState::In(flavor) => flavor.following(),
        IterState::End => &[],
    };
    candidates
        .iter()
        .copied()
        .find(|flavor| flavors.contains(flavor.flag()) && has_entries(*flavor))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IterState {
    Start,
    In(HordeMapFlavor),
    End,
}

/// Filtered, borrowed view over a [`HordeMap`].
#[derive(Debug, Clone, Copy)]
pub struct HordeView<'a> {
    map: &'a HordeMap,
    flavors: HordeMapFlavors,
}

impl<'a> HordeView<'a> {
    pub fn iter(&self) -> HordeIter<'a> {
        HordeIter::new(&self.map.partitions, self.flavors)
    }

    pub fn begin(&self) -> HordeCursor {
        self.map.begin(self.flavors)
    }

    pub fn flavors(&self) -> HordeMapFlavors {
        self.flavors
    }

    pub fn len(&self) -> usize {
        self.map.count(self.flavors)
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }
}

impl<'a> IntoIterator for HordeView<'a> {
    type Item = (&'a TripointAbsMs, &'a HordeEntity);
    type IntoIter = HordeIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a> IntoIterator for &HordeView<'a> {
    type Item = (&'a TripointAbsMs, &'a HordeEntity);
    type IntoIter = HordeIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a> IntoIterator for &'a HordeMap {
    type Item = (&'a TripointAbsMs, &'a HordeEntity);
    type IntoIter = HordeIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Walks partition, then submap, then tile.
pub struct HordeIter<'a> {
    partitions: &'a [Partition; 3],
    flavors: HordeMapFlavors,
    state: IterState,
    outer: Option<btree_map::Iter<'a, TripointOmSm, HordeBucket>>,
    inner: Option<btree_map::Iter<'a, TripointAbsMs, HordeEntity>>,
}

impl<'a> HordeIter<'a> {
    fn new(partitions: &'a [Partition; 3], flavors: HordeMapFlavors) -> Self {
        Self {
            partitions,
            flavors,
            state: IterState::Start,
            outer: None,
            inner: None,
        }
    }
}

impl<'a> Iterator for HordeIter<'a> {
    type Item = (&'a TripointAbsMs, &'a HordeEntity);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(entry) = self.inner.as_mut().and_then(|inner| inner.next()) {
                return Some(entry);
            }
            if let Some((_, bucket)) = self.outer.as_mut().and_then(|outer| outer.next()) {
                self.inner = Some(bucket.iter());
                continue;
            }
            let partitions = self.partitions;
            match next_flavor(self.state, self.flavors, |flavor| {
                !partitions[flavor.index()].is_empty()
            }) {
                Some(flavor) => {
                    self.state = IterState::In(flavor);
                    self.outer = Some(partitions[flavor.index()].iter());
                    self.inner = None;
                }
                None => {
                    self.state = IterState::End;
                    self.outer = None;
                    self.inner = None;
                    return None;
                }
            }
        }
    }
}

/// Mutable counterpart of [`HordeIter`]; entities change in place, keys do not.
pub struct HordeIterMut<'a> {
    partitions: [Option<&'a mut Partition>; 3],
    flavors: HordeMapFlavors,
    state: IterState,
    outer: Option<btree_map::IterMut<'a, TripointOmSm, HordeBucket>>,
    inner: Option<btree_map::IterMut<'a, TripointAbsMs, HordeEntity>>,
}

impl<'a> HordeIterMut<'a> {
    fn new(partitions: &'a mut [Partition; 3], flavors: HordeMapFlavors) -> Self {
        let [active, idle, dormant] = partitions;
        Self {
            partitions: [Some(active), Some(idle), Some(dormant)],
            flavors,
            state: IterState::Start,
            outer: None,
            inner: None,
        }
    }
}

impl<'a> Iterator for HordeIterMut<'a> {
    type Item = (&'a TripointAbsMs, &'a mut HordeEntity);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(entry) = self.inner.as_mut().and_then(|inner| inner.next()) {
                return Some(entry);
            }
            if let Some((_, bucket)) = self.outer.as_mut().and_then(|outer| outer.next()) {
                self.inner = Some(bucket.iter_mut());
                continue;
            }
            let partitions = &self.partitions;
            let next = next_flavor(self.state, self.flavors, |flavor| {
                partitions[flavor.index()]
                    .as_ref()
                    .is_some_and(|partition| !partition.is_empty())
            });
            match next.and_then(|flavor| Some((flavor, self.partitions[flavor.index()].take()?))) {
                Some((flavor, partition)) => {
                    self.state = IterState::In(flavor);
                    self.outer = Some(partition.iter_mut());
                    self.inner = None;
                }
                None => {
                    self.state = IterState::End;
                    self.outer = None;
                    self.inner = None;
                    return None;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestTypes;

    impl MonsterTypeLookup for TestTypes {
        fn is_dormant(&self, id: &MonsterTypeId) -> bool {
            id.as_str().starts_with("mon_dormant")
        }

        fn speed(&self, _id: &MonsterTypeId) -> i32 {
            100
        }
    }

    fn tile(x: i32, y: i32) -> TripointAbsMs {
        TripointAbsMs::new(x, y, 0)
    }

    fn assert_no_empty_buckets(map: &HordeMap) {
        for flavor in HordeMapFlavor::ALL {
            for (submap, count) in map.submap_counts(flavor) {
                assert!(count > 0, "empty {} bucket left at {submap:?}", flavor.label());
            }
        }
    }

    /// One active, one idle and one dormant entity in distinct submaps.
    fn three_flavor_map() -> HordeMap {
        let mut map = HordeMap::new(PointAbsOm::new(0, 0));
        let runner = map.spawn_entity(tile(5, 5), "mon_zombie".into(), &TestTypes);
        let mut node = map.extract(runner).unwrap();
        node.entity_mut().wander_to(tile(40, 40), 20);
        node.set_flavor(HordeMapFlavor::Active);
        map.insert(node);

        map.spawn_entity(tile(30, 2), "mon_zombie".into(), &TestTypes);
        map.spawn_entity(tile(70, 70), "mon_dormant_zombie".into(), &TestTypes);
        map
    }

    #[test]
    fn spawn_places_by_type_dormancy() {
        let map = three_flavor_map();
        assert_eq!(map.count_entities(HordeMapFlavor::Active), 1);
        assert_eq!(map.count_entities(HordeMapFlavor::Idle), 1);
        assert_eq!(map.count_entities(HordeMapFlavor::Dormant), 1);
        assert_eq!(map.iter().count(), 3);
    }

    #[test]
    fn waking_a_dormant_entity_moves_it_to_active() {
        let mut map = three_flavor_map();
        let cursor = map.find(TripointOmMs::new(70, 70, 0));
        assert_eq!(cursor.flavor(), Some(HordeMapFlavor::Dormant));

        let mut node = map.extract(cursor).unwrap();
        node.entity_mut().wander_to(tile(0, 0), 15);
        node.set_flavor(HordeMapFlavor::Active);
        map.insert(node);

        assert_eq!(map.count_entities(HordeMapFlavor::Active), 2);
        assert_eq!(map.count_entities(HordeMapFlavor::Idle), 1);
        assert_eq!(map.count_entities(HordeMapFlavor::Dormant), 0);
        assert_eq!(map.iter().count(), 3);

        let woken = map.entity_at(TripointOmMs::new(70, 70, 0)).unwrap();
        assert_eq!(woken.destination, Some(tile(0, 0)));
        assert_eq!(woken.tracking_intensity, 15);
        assert_no_empty_buckets(&map);
    }

    #[test]
    fn filtered_views_count_their_partitions() {
        let mut map = HordeMap::new(PointAbsOm::new(0, 0));
        for i in 0..6 {
            map.spawn_entity(tile(i * 7, 3), "mon_zombie".into(), &TestTypes);
        }
        for i in 0..4 {
            map.spawn_entity(tile(i * 13, 50), "mon_dormant_zombie".into(), &TestTypes);
        }
        for i in 0..5 {
            let mut entity = HordeEntity::new("mon_zombie".into(), false);
            entity.wander_to(tile(100, 100), 5);
            map.spawn(tile(i * 11, 90), entity);
        }

        let active = HordeMapFlavors::ACTIVE;
        let idle = HordeMapFlavors::IDLE;
        let dormant = HordeMapFlavors::DORMANT;
        assert_eq!(map.get_view(active).iter().count(), 5);
        assert_eq!(map.get_view(idle).iter().count(), 6);
        assert_eq!(map.get_view(dormant).iter().count(), 4);
        assert_eq!(map.get_view(active | idle).iter().count(), 11);
        assert_eq!(map.get_view(idle | dormant).iter().count(), 10);
        assert_eq!(map.get_view(active | dormant).iter().count(), 9);
        assert_eq!(map.get_view(active | idle | dormant).iter().count(), 15);
        assert_eq!(map.iter().count(), 15);
        assert_eq!((&map).into_iter().count(), 15);
        assert_eq!(map.get_view(HordeMapFlavors::empty()).iter().count(), 0);
        assert_eq!(map.get_view(active | idle).len(), 11);

        let mut cursor = map.begin(active | dormant);
        let mut walked = 0;
        while !cursor.is_end() {
            walked += 1;
            cursor = map.advance(cursor);
        }
        assert_eq!(walked, 9);
    }

    #[test]
    fn empty_index_iterates_zero_times() {
        let map = HordeMap::new(PointAbsOm::new(3, -1));
        let mut bodies = 0;
        for _ in &map {
            bodies += 1;
        }
        for flavors in [
            HordeMapFlavors::ACTIVE,
            HordeMapFlavors::IDLE | HordeMapFlavors::DORMANT,
            HordeMapFlavors::all(),
            HordeMapFlavors::empty(),
        ] {
            for _ in map.get_view(flavors) {
                bodies += 1;
            }
            assert!(map.begin(flavors).is_end());
        }
        assert_eq!(bodies, 0);
        assert!(map.is_empty());
    }

    #[test]
    fn end_cursors_compare_equal() {
        let map = three_flavor_map();
        let mut cursor = map.begin(HordeMapFlavors::IDLE);
        cursor = map.advance(cursor);
        assert!(cursor.is_end());
        assert_eq!(cursor, HordeCursor::end());
        assert_eq!(map.begin(HordeMapFlavors::empty()), HordeCursor::end());
        assert_eq!(map.find(TripointOmMs::new(1, 1, 0)), HordeCursor::end());
    }

    #[test]
    fn erase_returns_successor_and_prunes_buckets() {
        let mut map = HordeMap::new(PointAbsOm::new(0, 0));
        map.spawn_entity(tile(1, 1), "mon_zombie".into(), &TestTypes);
        map.spawn_entity(tile(2, 1), "mon_zombie".into(), &TestTypes);
        map.spawn_entity(tile(30, 1), "mon_zombie".into(), &TestTypes);

        let first = map.begin(HordeMapFlavors::all());
        assert_eq!(first.key(), Some(tile(1, 1)));
        let second = map.erase(first);
        assert_eq!(second.key(), Some(tile(2, 1)));
        let third = map.erase(second);
        assert_eq!(third.key(), Some(tile(30, 1)));
        assert_eq!(map.submap_counts(HordeMapFlavor::Idle).count(), 1);
        let end = map.erase(third);
        assert!(end.is_end());
        assert!(map.is_empty());
    }

    #[test]
    fn extracting_during_traversal_visits_every_entry_once() {
        let mut map = HordeMap::new(PointAbsOm::new(0, 0));
        for x in 0..40 {
            let mut entity = HordeEntity::new("mon_zombie".into(), false);
            entity.wander_to(tile(500, 500), 3);
            map.spawn(tile(x * 5, x % 7), entity);
        }

        let mut moved = Vec::new();
        let mut cursor = map.begin(HordeMapFlavors::ACTIVE);
        let mut visited = 0;
        while !cursor.is_end() {
            visited += 1;
            let next = map.advance(cursor);
            if visited % 3 == 0 {
                cursor = map.erase(cursor);
                continue;
            }
            let mut node = map.extract(cursor).unwrap();
            node.entity_mut().settle();
            node.reclassify();
            moved.push(node);
            cursor = next;
        }
        assert_eq!(visited, 40);
        for node in moved {
            map.insert(node);
        }

        assert_eq!(map.count_entities(HordeMapFlavor::Active), 0);
        assert_eq!(map.count_entities(HordeMapFlavor::Idle), 27);
        assert_no_empty_buckets(&map);
    }

    #[test]
    fn entity_at_respects_location_offset() {
        let mut map = HordeMap::new(PointAbsOm::new(-1, 2));
        let abs = project_combine(map.location(), TripointOmMs::new(10, 20, 0));
        map.spawn_entity(abs, "mon_zombie".into(), &TestTypes);
        assert_eq!(abs, TripointAbsMs::new(-4320 + 10, 8640 + 20, 0));
        assert!(map.entity_at(TripointOmMs::new(10, 20, 0)).is_some());
        assert!(map.entity_at(TripointOmMs::new(11, 20, 0)).is_none());
        assert_eq!(
            HordeMap::submap_key(abs),
            TripointOmSm::new(0, 1, 0),
            "tile (10, 20) sits in the overmap's submap (0, 1)"
        );

        map.entity_at_mut(TripointOmMs::new(10, 20, 0))
            .unwrap()
            .tracking_intensity = 9;
        assert_eq!(
            map.entity_at(TripointOmMs::new(10, 20, 0))
                .unwrap()
                .tracking_intensity,
            9
        );
    }

    #[test]
    fn insert_collision_overwrites() {
        let mut map = HordeMap::new(PointAbsOm::new(0, 0));
        map.spawn_entity(tile(4, 4), "mon_zombie".into(), &TestTypes);
        let replacement = HordeEntity::new("mon_zombie_brute".into(), false);
        map.insert(HordeNode::new(tile(4, 4), HordeMapFlavor::Idle, replacement));
        assert_eq!(map.len(), 1);
        assert_eq!(
            map.entity_at(TripointOmMs::new(4, 4, 0)).unwrap().type_id,
            MonsterTypeId::new("mon_zombie_brute")
        );
    }

    #[test]
    fn clear_chunk_spans_partitions() {
        let mut map = three_flavor_map();
        map.spawn_entity(tile(6, 6), "mon_dormant_zombie".into(), &TestTypes);
        let removed = map.clear_chunk(TripointOmSm::new(0, 0, 0));
        assert_eq!(removed, 2);
        assert_eq!(map.len(), 2);
        assert_no_empty_buckets(&map);

        map.clear();
        assert!(map.is_empty());
    }

    #[test]
    fn entity_group_at_collects_submaps_of_an_omt() {
        let mut map = HordeMap::new(PointAbsOm::new(0, 0));
        map.spawn_entity(tile(1, 1), "mon_zombie".into(), &TestTypes);
        map.spawn_entity(tile(13, 1), "mon_zombie".into(), &TestTypes);
        map.spawn_entity(tile(23, 23), "mon_dormant_zombie".into(), &TestTypes);
        map.spawn_entity(tile(24, 0), "mon_zombie".into(), &TestTypes);

        let groups = map.entity_group_at(TripointOmOmt::new(0, 0, 0));
        assert_eq!(groups.len(), 3);
        assert_eq!(groups.iter().map(|bucket| bucket.len()).sum::<usize>(), 3);
    }

    #[test]
    fn iter_mut_updates_in_place() {
        let mut map = three_flavor_map();
        for (_, entity) in map.get_view_mut(HordeMapFlavors::IDLE | HordeMapFlavors::DORMANT) {
            entity.moves += 50;
        }
        let moves: Vec<i32> = map.iter().map(|(_, entity)| entity.moves).collect();
        assert_eq!(moves, vec![0, 50, 50]);
        assert_eq!(map.iter_mut().count(), 3);
    }

    #[test]
    fn nodes_survive_serialization() {
        let map = three_flavor_map();
        let json = serde_json::to_string(&map.to_records()).unwrap();
        let nodes: Vec<HordeNode> = serde_json::from_str(&json).unwrap();
        let restored = HordeMap::from_records(map.location(), nodes);
        assert_eq!(restored.to_records(), map.to_records());
        assert_eq!(restored.count_entities(HordeMapFlavor::Active), 1);
    }
}
