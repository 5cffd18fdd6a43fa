//! Per-OMT passability summaries.
//!
//! Every overmap terrain unit of an overmap owns a slot that is either empty,
//! points at a shared immutable placeholder, or owns its own summary. Writes
//! through a placeholder promote the slot to an owned copy first.

use std::{collections::HashMap, fmt, sync::Arc};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::coords::{
    PointOmOmtIb, PointOmtMsIb, TripointOmOmt, OMAPX, OMAPY, OMT_MS_SIZE, OVERMAP_DEPTH,
    OVERMAP_HEIGHT, OVERMAP_LAYERS,
};

/// Tiles covered by one summary.
pub const SUMMARY_TILES: usize = (OMT_MS_SIZE * OMT_MS_SIZE) as usize;
/// Packed size of a summary bitset.
pub const SUMMARY_BYTES: usize = SUMMARY_TILES / 8;

pub const EMPTY_OMT: &str = "empty_omt";
pub const FULL_OMT: &str = "full_omt";
pub const SCATTERED_OBSTACLES_OMT: &str = "scattered_obstacles_omt";

const SLOTS_PER_LAYER: usize = (OMAPX * OMAPY) as usize;

#[derive(Debug, Error)]
pub enum MapDataError {
    #[error("invalid base64 in map data summary: {0}")]
    InvalidBase64(#[from] base64::DecodeError),
    #[error("map data summary must decode to {expected} bytes, found {found}")]
    WrongLength { expected: usize, found: usize },
    #[error("map data summary needs {expected} rows, found {found}")]
    RowCount { expected: usize, found: usize },
    #[error("map data summary row {row} needs {expected} cells, found {found}")]
    RowLength {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("unexpected cell '{cell}' at row {row}, column {column} (use '.' or '#')")]
    InvalidCell { row: usize, column: usize, cell: char },
    #[error("unknown map data placeholder `{0}`")]
    UnknownPlaceholder(String),
}

/// 24x24 passability bits, row-major, least significant bit first.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PassableBits([u8; SUMMARY_BYTES]);

impl PassableBits {
    pub fn all_passable() -> Self {
        Self([0xFF; SUMMARY_BYTES])
    }

    pub fn all_impassable() -> Self {
        Self([0; SUMMARY_BYTES])
    }

    pub fn filled(passable: bool) -> Self {
        if passable {
            Self::all_passable()
        } else {
            Self::all_impassable()
        }
    }

    /// Parses 24 rows of 24 cells, `.` for passable and `#` for blocked.
    pub fn from_rows<R: AsRef<str>>(rows: &[R]) -> Result<Self, MapDataError> {
        let size = OMT_MS_SIZE as usize;
        if rows.len() != size {
            return Err(MapDataError::RowCount {
                expected: size,
                found: rows.len(),
            });
        }
        let mut bits = Self::all_impassable();
        for (row, line) in rows.iter().enumerate() {
            let line = line.as_ref();
            let found = line.chars().count();
            if found != size {
                return Err(MapDataError::RowLength {
                    row,
                    expected: size,
                    found,
                });
            }
            for (column, cell) in line.chars().enumerate() {
                let passable = match cell {
                    '.' => true,
                    '#' => false,
                    other => {
                        return Err(MapDataError::InvalidCell {
                            row,
                            column,
                            cell: other,
                        })
                    }
                };
                bits.set_index(row * size + column, passable);
            }
        }
        Ok(bits)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, MapDataError> {
        let raw: [u8; SUMMARY_BYTES] =
            bytes.try_into().map_err(|_| MapDataError::WrongLength {
                expected: SUMMARY_BYTES,
                found: bytes.len(),
            })?;
        Ok(Self(raw))
    }

    pub fn as_bytes(&self) -> &[u8; SUMMARY_BYTES] {
        &self.0
    }

    pub fn from_base64(encoded: &str) -> Result<Self, MapDataError> {
        let bytes = STANDARD.decode(encoded)?;
        Self::from_bytes(&bytes)
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0)
    }

    #[inline]
    fn get_index(&self, index: usize) -> bool {
        self.0[index / 8] & (1 << (index % 8)) != 0
    }

    #[inline]
    fn set_index(&mut self, index: usize, passable: bool) {
        let mask = 1 << (index % 8);
        if passable {
            self.0[index / 8] |= mask;
        } else {
            self.0[index / 8] &= !mask;
        }
    }

    pub fn get(&self, tile: PointOmtMsIb) -> bool {
        self.get_index(tile.index())
    }

    pub fn set(&mut self, tile: PointOmtMsIb, passable: bool) {
        self.set_index(tile.index(), passable);
    }

    /// Number of passable tiles.
    pub fn count(&self) -> usize {
        self.0.iter().map(|byte| byte.count_ones() as usize).sum()
    }
}

impl Default for PassableBits {
    fn default() -> Self {
        Self::all_passable()
    }
}

impl fmt::Debug for PassableBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PassableBits").field(&self.to_base64()).finish()
    }
}

impl Serialize for PassableBits {
    fn serialize<Ser: serde::Serializer>(&self, serializer: Ser) -> Result<Ser::Ok, Ser::Error> {
        serializer.serialize_str(&self.to_base64())
    }
}

impl<'de> Deserialize<'de> for PassableBits {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        Self::from_base64(&encoded).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MapDataSummaryId(String);

impl MapDataSummaryId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MapDataSummaryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Passability of one overmap terrain unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapDataSummary {
    pub passable: PassableBits,
    /// Set on placeholders; owned copies drop it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<MapDataSummaryId>,
    #[serde(default)]
    pub placeholder: bool,
}

impl MapDataSummary {
    pub fn owned(passable: PassableBits) -> Self {
        Self {
            passable,
            id: None,
            placeholder: false,
        }
    }

    pub fn placeholder(id: MapDataSummaryId, passable: PassableBits) -> Self {
        Self {
            passable,
            id: Some(id),
            placeholder: true,
        }
    }

    pub fn is_passable(&self, tile: PointOmtMsIb) -> bool {
        self.passable.get(tile)
    }

    pub fn set_passable(&mut self, tile: PointOmtMsIb, passable: bool) {
        debug_assert!(!self.placeholder, "placeholder summaries are read-only");
        self.passable.set(tile, passable);
    }
}

/// Storage state of one OMT's summary.
#[derive(Debug, Clone, Default)]
pub enum MapDataSlot {
    #[default]
    Unpopulated,
    Placeholder(Arc<MapDataSummary>),
    Owned(Box<MapDataSummary>),
}

impl MapDataSlot {
    pub fn get(&self) -> Option<&MapDataSummary> {
        match self {
            Self::Unpopulated => None,
            Self::Placeholder(shared) => Some(&**shared),
            Self::Owned(owned) => Some(&**owned),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, Self::Placeholder(_))
    }

    /// Writable summary, promoting a placeholder to an owned copy first.
    pub fn make_mut(&mut self) -> Option<&mut MapDataSummary> {
        if let Self::Placeholder(shared) = self {
            let mut owned = MapDataSummary::clone(shared);
            owned.placeholder = false;
            owned.id = None;
            *self = Self::Owned(Box::new(owned));
        }
        match self {
            Self::Owned(owned) => Some(&mut **owned),
            _ => None,
        }
    }
}

/// Terrain travel classes used to pick a placeholder summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TravelCostType {
    Impassable,
    Water,
    Air,
    Road,
    Field,
    DirtRoad,
    Trail,
    Forest,
    Shore,
    Swamp,
    Other,
}

pub fn placeholder_for_travel_cost(travel_cost: TravelCostType) -> &'static str {
    match travel_cost {
        TravelCostType::Road | TravelCostType::Field | TravelCostType::DirtRoad => EMPTY_OMT,
        TravelCostType::Trail
        | TravelCostType::Forest
        | TravelCostType::Shore
        | TravelCostType::Swamp => SCATTERED_OBSTACLES_OMT,
        TravelCostType::Impassable
        | TravelCostType::Water
        | TravelCostType::Air
        | TravelCostType::Other => FULL_OMT,
    }
}

/// Shared placeholder summaries by id.
#[derive(Debug, Clone, Default)]
pub struct MapDataPlaceholders {
    by_id: HashMap<MapDataSummaryId, Arc<MapDataSummary>>,
}

impl MapDataPlaceholders {
    pub fn insert(&mut self, id: MapDataSummaryId, passable: PassableBits) {
        let summary = MapDataSummary::placeholder(id.clone(), passable);
        self.by_id.insert(id, Arc::new(summary));
    }

    pub fn get(&self, id: &str) -> Result<Arc<MapDataSummary>, MapDataError> {
        self.by_id
            .get(&MapDataSummaryId::new(id))
            .cloned()
            .ok_or_else(|| MapDataError::UnknownPlaceholder(id.to_string()))
    }

    pub fn for_travel_cost(
        &self,
        travel_cost: TravelCostType,
    ) -> Result<Arc<MapDataSummary>, MapDataError> {
        self.get(placeholder_for_travel_cost(travel_cost))
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

/// Summary slots for every OMT on every z-level of one overmap.
pub struct MapDataCache {
    slots: Vec<MapDataSlot>,
}

impl Default for MapDataCache {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MapDataCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapDataCache")
            .field("populated", &self.populated_count())
            .finish()
    }
}

impl MapDataCache {
    pub fn new() -> Self {
        let mut slots = Vec::new();
        slots.resize_with(OVERMAP_LAYERS * SLOTS_PER_LAYER, MapDataSlot::default);
        Self { slots }
    }

    fn slot_index(omt: TripointOmOmt) -> Option<usize> {
        if !(-OVERMAP_DEPTH..=OVERMAP_HEIGHT).contains(&omt.z()) {
            return None;
        }
        let layer = (omt.z() + OVERMAP_DEPTH) as usize;
        let column = PointOmOmtIb::new(omt.xy())?;
        Some(layer * SLOTS_PER_LAYER + column.index())
    }

    pub fn slot(&self, omt: TripointOmOmt) -> Option<&MapDataSlot> {
        self.slots.get(Self::slot_index(omt)?)
    }

    pub fn slot_mut(&mut self, omt: TripointOmOmt) -> Option<&mut MapDataSlot> {
        let index = Self::slot_index(omt)?;
        self.slots.get_mut(index)
    }

    pub fn summary(&self, omt: TripointOmOmt) -> Option<&MapDataSummary> {
        self.slot(omt)?.get()
    }

    /// False for OMTs off the overmap or without a summary.
    pub fn passable(&self, omt: TripointOmOmt, tile: PointOmtMsIb) -> bool {
        self.summary(omt)
            .is_some_and(|summary| summary.is_passable(tile))
    }

    /// Writes one bit, promoting a placeholder slot. Returns whether a
    /// summary was there to write.
    pub fn set_passable(&mut self, omt: TripointOmOmt, tile: PointOmtMsIb, passable: bool) -> bool {
        let Some(slot) = self.slot_mut(omt) else {
            return false;
        };
        if slot.is_placeholder() {
            debug!(
                target: "horde_sim::map_data",
                %omt,
                "map_data.placeholder_promoted"
            );
        }
        match slot.make_mut() {
            Some(summary) => {
                summary.set_passable(tile, passable);
                true
            }
            None => false,
        }
    }

    /// Points every slot at one shared summary.
    pub fn fill_with(&mut self, placeholder: &Arc<MapDataSummary>) {
        for slot in &mut self.slots {
            *slot = MapDataSlot::Placeholder(Arc::clone(placeholder));
        }
    }

    /// Replaces the slot contents. Returns false when `omt` is off the overmap.
    pub fn replace(&mut self, omt: TripointOmOmt, slot: MapDataSlot) -> bool {
        match self.slot_mut(omt) {
            Some(current) => {
                *current = slot;
                true
            }
            None => false,
        }
    }

    pub fn populated_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| !matches!(slot, MapDataSlot::Unpopulated))
            .count()
    }
}
