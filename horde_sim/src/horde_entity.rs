use std::fmt;

use serde::{Deserialize, Serialize};

use crate::coords::TripointAbsMs;
use crate::horde_map::HordeMapFlavor;

/// Identifier of a monster type in the type registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MonsterTypeId(String);

impl MonsterTypeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MonsterTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MonsterTypeId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Static per-type data the horde index needs from the type registry.
pub trait MonsterTypeLookup {
    /// Whether freshly spawned members of this type start dormant.
    fn is_dormant(&self, id: &MonsterTypeId) -> bool;

    /// Moves gained per turn.
    fn speed(&self, id: &MonsterTypeId) -> i32;
}

/// State of one horde member while it is tracked at overmap resolution.
///
/// The record's position is its key in the [`HordeMap`](crate::HordeMap);
/// it is not duplicated here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HordeEntity {
    pub type_id: MonsterTypeId,
    /// Where the entity is heading. `None` means it has no travel goal.
    pub destination: Option<TripointAbsMs>,
    /// How eagerly the entity keeps pursuing its destination; spent one per turn of travel.
    pub tracking_intensity: i32,
    pub dormant: bool,
    pub last_processed: u64,
    pub moves: i32,
    /// Opaque behaviour state owned by the monster simulation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monster_data: Option<serde_json::Value>,
}

impl HordeEntity {
    pub fn new(type_id: MonsterTypeId, dormant: bool) -> Self {
        Self {
            type_id,
            destination: None,
            tracking_intensity: 0,
            dormant,
            last_processed: 0,
            moves: 0,
            monster_data: None,
        }
    }

    pub fn spawn(type_id: MonsterTypeId, types: &impl MonsterTypeLookup) -> Self {
        let dormant = types.is_dormant(&type_id);
        Self::new(type_id, dormant)
    }

    pub fn is_active(&self) -> bool {
        self.destination.is_some()
    }

    /// Partition this entity belongs in given its current state.
    ///
    /// A destination wins over the dormant flag so that an alerted sleeper
    /// moves with the active set.
    pub fn preferred_flavor(&self) -> HordeMapFlavor {
        if self.destination.is_some() {
            HordeMapFlavor::Active
        } else if self.dormant {
            HordeMapFlavor::Dormant
        } else {
            HordeMapFlavor::Idle
        }
    }

    pub fn wander_to(&mut self, destination: TripointAbsMs, intensity: i32) {
        self.destination = Some(destination);
        self.tracking_intensity = intensity;
    }

    /// Drops the travel goal.
    pub fn settle(&mut self) {
        self.destination = None;
        self.tracking_intensity = 0;
    }
}
