//! Type-tagged integer coordinates at every spatial scale of the world.
//!
//! A coordinate carries two compile-time tags: its **origin** (what the value
//! is measured from) and its **scale** (how big one unit is). Converting
//! between scales is explicit, and decomposing an absolute coordinate into a
//! coarse quotient plus an in-unit remainder always uses floor semantics so
//! remainders can index fixed-size per-unit buffers directly.
//!
//! Scales: `Ms` (map tile), `Sm` (submap, 12 tiles), `Omt` (overmap terrain,
//! 2 submaps), `Mmr` (map memory region, 8 submaps), `Seg` (segment, 32 omt)
//! and `Om` (overmap, 180 omt). The `z` axis is never scaled.

use std::cmp::Ordering;
use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;
use std::ops::{Add, AddAssign, Sub, SubAssign};

use bevy::math::{IVec2, IVec3};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Tiles per submap along x.
pub const SEEX: i32 = 12;
/// Tiles per submap along y.
pub const SEEY: i32 = 12;
/// Submaps per overmap terrain unit along each axis.
pub const OMT_SM_SIZE: i32 = 2;
/// Tiles per overmap terrain unit along each axis.
pub const OMT_MS_SIZE: i32 = SEEX * OMT_SM_SIZE;
/// Overmap terrain units per overmap along x.
pub const OMAPX: i32 = 180;
/// Overmap terrain units per overmap along y.
pub const OMAPY: i32 = 180;
/// Overmap terrain units per segment.
pub const SEG_SIZE: i32 = 32;
/// Submaps per map memory region.
pub const MM_REG_SIZE: i32 = 8;
/// Number of z-levels below ground level.
pub const OVERMAP_DEPTH: i32 = 10;
/// Number of z-levels above ground level.
pub const OVERMAP_HEIGHT: i32 = 10;
/// Total z-levels stored per overmap.
pub const OVERMAP_LAYERS: usize = (OVERMAP_DEPTH + 1 + OVERMAP_HEIGHT) as usize;

/// Size of one unit of a scale.
pub trait Scale: Copy + Eq + Hash + Default + fmt::Debug + Send + Sync + 'static {
    const MS_PER_UNIT: i32;
    const NAME: &'static str;
}

/// What a coordinate is measured from.
pub trait Origin: Copy + Eq + Hash + Default + fmt::Debug + Send + Sync + 'static {
    const NAME: &'static str;
}

/// A scale whose units contain finer units and can therefore act as an origin.
pub trait ContainerScale: Scale {
    type Origin: Origin;
}

/// `Self` is an exact multiple of the finer scale `S`.
pub trait Contains<S: Scale>: ContainerScale {
    const RATIO: i32 = Self::MS_PER_UNIT / S::MS_PER_UNIT;
}

pub mod scale {
    //! Scale tags.

    macro_rules! scales {
        ($($(#[$meta:meta])* $name:ident = $ms:expr, $label:literal;)+) => {
            $(
                $(#[$meta])*
                #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
                pub struct $name;

                impl super::Scale for $name {
                    const MS_PER_UNIT: i32 = $ms;
                    const NAME: &'static str = $label;
                }
            )+
        };
    }

    scales! {
        /// Single map tile.
        Ms = 1, "ms";
        /// Submap: 12x12 tiles.
        Sm = super::SEEX, "sm";
        /// Overmap terrain: 2x2 submaps.
        Omt = super::OMT_MS_SIZE, "omt";
        /// Map memory region: 8x8 submaps.
        Mmr = super::SEEX * super::MM_REG_SIZE, "mmr";
        /// Segment: 32x32 overmap terrain units.
        Seg = super::OMT_MS_SIZE * super::SEG_SIZE, "seg";
        /// Overmap: 180x180 overmap terrain units.
        Om = super::OMT_MS_SIZE * super::OMAPX, "om";
    }
}

pub mod origin {
    //! Origin tags.

    macro_rules! origins {
        ($($(#[$meta:meta])* $name:ident, $label:literal;)+) => {
            $(
                $(#[$meta])*
                #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
                pub struct $name;

                impl super::Origin for $name {
                    const NAME: &'static str = $label;
                }
            )+
        };
    }

    origins! {
        /// Plain offsets with no anchor.
        Rel, "rel";
        /// Measured from the world origin.
        Abs, "abs";
        /// Measured from the corner of the containing submap.
        Submap, "sm";
        /// Measured from the corner of the containing overmap terrain unit.
        OvermapTerrain, "omt";
        /// Measured from the corner of the containing map memory region.
        MapMemoryRegion, "mmr";
        /// Measured from the corner of the containing segment.
        Segment, "seg";
        /// Measured from the corner of the containing overmap.
        Overmap, "om";
    }
}

use origin::{Abs, MapMemoryRegion, Overmap, OvermapTerrain, Rel, Segment, Submap};
use scale::{Mmr, Ms, Om, Omt, Seg, Sm};

impl ContainerScale for Sm {
    type Origin = Submap;
}
impl ContainerScale for Omt {
    type Origin = OvermapTerrain;
}
impl ContainerScale for Mmr {
    type Origin = MapMemoryRegion;
}
impl ContainerScale for Seg {
    type Origin = Segment;
}
impl ContainerScale for Om {
    type Origin = Overmap;
}

macro_rules! contains {
    ($coarse:ty => $($fine:ty),+) => {
        $(impl Contains<$fine> for $coarse {})+
    };
}

contains!(Sm => Ms);
contains!(Omt => Ms, Sm);
contains!(Mmr => Ms, Sm);
contains!(Seg => Ms, Sm, Omt, Mmr);
contains!(Om => Ms, Sm, Omt, Mmr);

/// Floor division: rounds toward negative infinity for every sign of `v`.
#[inline]
pub const fn divide_floor(v: i32, m: i32) -> i32 {
    if v >= 0 {
        v / m
    } else {
        (v - m + 1) / m
    }
}

/// Floor quotient and the matching remainder, always in `[0, m)`.
#[inline]
pub const fn divide_remain(v: i32, m: i32) -> (i32, i32) {
    let quotient = divide_floor(v, m);
    (quotient, v - quotient * m)
}

#[inline]
fn rescale(v: i32, from: i32, to: i32) -> i32 {
    if from == to {
        return v;
    }
    (v as i64 * from as i64).div_euclid(to as i64) as i32
}

/// Two-dimensional coordinate tagged with origin `O` and scale `S`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Point<O, S> {
    raw: IVec2,
    _tag: PhantomData<(O, S)>,
}

/// Three-dimensional coordinate tagged with origin `O` and scale `S`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Tripoint<O, S> {
    raw: IVec3,
    _tag: PhantomData<(O, S)>,
}

impl<O: Origin, S: Scale> Point<O, S> {
    pub const fn new(x: i32, y: i32) -> Self {
        Self::from_raw(IVec2::new(x, y))
    }

    pub const fn from_raw(raw: IVec2) -> Self {
        Self {
            raw,
            _tag: PhantomData,
        }
    }

    pub fn zero() -> Self {
        Self::from_raw(IVec2::ZERO)
    }

    #[inline]
    pub fn raw(self) -> IVec2 {
        self.raw
    }

    #[inline]
    pub fn x(self) -> i32 {
        self.raw.x
    }

    #[inline]
    pub fn y(self) -> i32 {
        self.raw.y
    }

    pub fn with_z(self, z: i32) -> Tripoint<O, S> {
        Tripoint::new(self.raw.x, self.raw.y, z)
    }

    /// Offset that takes `self` to `other`.
    pub fn delta_to(self, other: Self) -> Point<Rel, S> {
        Point::from_raw(other.raw - self.raw)
    }

    /// Lossy conversion to another scale sharing the same origin.
    pub fn project_to<T: Scale>(self) -> Point<O, T> {
        Point::new(
            rescale(self.raw.x, S::MS_PER_UNIT, T::MS_PER_UNIT),
            rescale(self.raw.y, S::MS_PER_UNIT, T::MS_PER_UNIT),
        )
    }

    /// Exact decomposition into the containing `T` unit and the offset inside it.
    pub fn project_remain<T: Contains<S>>(self) -> (Point<O, T>, Point<T::Origin, S>) {
        let (qx, rx) = divide_remain(self.raw.x, T::RATIO);
        let (qy, ry) = divide_remain(self.raw.y, T::RATIO);
        (Point::new(qx, qy), Point::new(rx, ry))
    }
}

impl<O: Origin, S: Scale> Tripoint<O, S> {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self::from_raw(IVec3::new(x, y, z))
    }

    pub const fn from_raw(raw: IVec3) -> Self {
        Self {
            raw,
            _tag: PhantomData,
        }
    }

    pub fn zero() -> Self {
        Self::from_raw(IVec3::ZERO)
    }

    #[inline]
    pub fn raw(self) -> IVec3 {
        self.raw
    }

    #[inline]
    pub fn x(self) -> i32 {
        self.raw.x
    }

    #[inline]
    pub fn y(self) -> i32 {
        self.raw.y
    }

    #[inline]
    pub fn z(self) -> i32 {
        self.raw.z
    }

    pub fn xy(self) -> Point<O, S> {
        Point::new(self.raw.x, self.raw.y)
    }

    pub fn delta_to(self, other: Self) -> Tripoint<Rel, S> {
        Tripoint::from_raw(other.raw - self.raw)
    }

    /// Lossy conversion to another scale sharing the same origin; `z` is kept.
    pub fn project_to<T: Scale>(self) -> Tripoint<O, T> {
        self.xy().project_to::<T>().with_z(self.raw.z)
    }

    /// Exact decomposition; the quotient is planar and the remainder keeps `z`.
    pub fn project_remain<T: Contains<S>>(self) -> (Point<O, T>, Tripoint<T::Origin, S>) {
        let (quotient, remainder) = self.xy().project_remain::<T>();
        (quotient, remainder.with_z(self.raw.z))
    }
}

/// Recombines a coarse quotient with a remainder measured from it.
pub trait CombineWith<Fine> {
    type Output;

    fn combine_with(self, fine: Fine) -> Self::Output;
}

impl<O: Origin, C: Contains<S>, S: Scale> CombineWith<Point<C::Origin, S>> for Point<O, C> {
    type Output = Point<O, S>;

    fn combine_with(self, fine: Point<C::Origin, S>) -> Point<O, S> {
        Point::from_raw(self.raw * C::RATIO + fine.raw())
    }
}

impl<O: Origin, C: Contains<S>, S: Scale> CombineWith<Tripoint<C::Origin, S>> for Point<O, C> {
    type Output = Tripoint<O, S>;

    fn combine_with(self, fine: Tripoint<C::Origin, S>) -> Tripoint<O, S> {
        let planar = self.raw * C::RATIO + fine.xy().raw();
        Tripoint::new(planar.x, planar.y, fine.z())
    }
}

/// Inverse of `project_remain`: `project_combine(p.project_remain()) == p`.
pub fn project_combine<Coarse, Fine>(coarse: Coarse, fine: Fine) -> Coarse::Output
where
    Coarse: CombineWith<Fine>,
{
    coarse.combine_with(fine)
}

impl<O: Origin, S: Scale> Add<Point<Rel, S>> for Point<O, S> {
    type Output = Self;

    fn add(self, rhs: Point<Rel, S>) -> Self::Output {
        Self::from_raw(self.raw + rhs.raw)
    }
}

impl<O: Origin, S: Scale> AddAssign<Point<Rel, S>> for Point<O, S> {
    fn add_assign(&mut self, rhs: Point<Rel, S>) {
        self.raw += rhs.raw;
    }
}

impl<O: Origin, S: Scale> Sub<Point<Rel, S>> for Point<O, S> {
    type Output = Self;

    fn sub(self, rhs: Point<Rel, S>) -> Self::Output {
        Self::from_raw(self.raw - rhs.raw)
    }
}

impl<O: Origin, S: Scale> SubAssign<Point<Rel, S>> for Point<O, S> {
    fn sub_assign(&mut self, rhs: Point<Rel, S>) {
        self.raw -= rhs.raw;
    }
}

impl<O: Origin, S: Scale> Add<Point<Rel, S>> for Tripoint<O, S> {
    type Output = Self;

    fn add(self, rhs: Point<Rel, S>) -> Self::Output {
        Self::new(self.raw.x + rhs.x(), self.raw.y + rhs.y(), self.raw.z)
    }
}

impl<O: Origin, S: Scale> Add<Tripoint<Rel, S>> for Tripoint<O, S> {
    type Output = Self;

    fn add(self, rhs: Tripoint<Rel, S>) -> Self::Output {
        Self::from_raw(self.raw + rhs.raw)
    }
}

impl<O: Origin, S: Scale> Sub<Tripoint<Rel, S>> for Tripoint<O, S> {
    type Output = Self;

    fn sub(self, rhs: Tripoint<Rel, S>) -> Self::Output {
        Self::from_raw(self.raw - rhs.raw)
    }
}

// Row-major ordering (z, then y, then x) so ordered maps walk tiles the way
// buffers are laid out.
impl<O: Origin, S: Scale> Ord for Point<O, S> {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.raw.y, self.raw.x).cmp(&(other.raw.y, other.raw.x))
    }
}

impl<O: Origin, S: Scale> PartialOrd for Point<O, S> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<O: Origin, S: Scale> Ord for Tripoint<O, S> {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.raw.z, self.raw.y, self.raw.x).cmp(&(other.raw.z, other.raw.y, other.raw.x))
    }
}

impl<O: Origin, S: Scale> PartialOrd for Tripoint<O, S> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<O: Origin, S: Scale> fmt::Debug for Point<O, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "point_{}_{}({}, {})",
            O::NAME,
            S::NAME,
            self.raw.x,
            self.raw.y
        )
    }
}

impl<O: Origin, S: Scale> fmt::Display for Point<O, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.raw.x, self.raw.y)
    }
}

impl<O: Origin, S: Scale> fmt::Debug for Tripoint<O, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "tripoint_{}_{}({}, {}, {})",
            O::NAME,
            S::NAME,
            self.raw.x,
            self.raw.y,
            self.raw.z
        )
    }
}

impl<O: Origin, S: Scale> fmt::Display for Tripoint<O, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{},{})", self.raw.x, self.raw.y, self.raw.z)
    }
}

impl<O: Origin, S: Scale> Serialize for Point<O, S> {
    fn serialize<Ser: Serializer>(&self, serializer: Ser) -> Result<Ser::Ok, Ser::Error> {
        (self.raw.x, self.raw.y).serialize(serializer)
    }
}

impl<'de, O: Origin, S: Scale> Deserialize<'de> for Point<O, S> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (x, y) = <(i32, i32)>::deserialize(deserializer)?;
        Ok(Self::new(x, y))
    }
}

impl<O: Origin, S: Scale> Serialize for Tripoint<O, S> {
    fn serialize<Ser: Serializer>(&self, serializer: Ser) -> Result<Ser::Ok, Ser::Error> {
        (self.raw.x, self.raw.y, self.raw.z).serialize(serializer)
    }
}

impl<'de, O: Origin, S: Scale> Deserialize<'de> for Tripoint<O, S> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (x, y, z) = <(i32, i32, i32)>::deserialize(deserializer)?;
        Ok(Self::new(x, y, z))
    }
}

/// A point guaranteed to lie in `[0, W) x [0, H)`, usable as a buffer index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InBounds<O: Origin, S: Scale, const W: i32, const H: i32> {
    point: Point<O, S>,
}

impl<O: Origin, S: Scale, const W: i32, const H: i32> InBounds<O, S, W, H> {
    pub const WIDTH: i32 = W;
    pub const HEIGHT: i32 = H;
    pub const AREA: usize = (W * H) as usize;

    pub fn new(point: Point<O, S>) -> Option<Self> {
        let inside = (0..W).contains(&point.x()) && (0..H).contains(&point.y());
        inside.then_some(Self { point })
    }

    /// Wraps a remainder produced by `project_remain`, which is in bounds by construction.
    pub fn from_remainder(point: Point<O, S>) -> Self {
        debug_assert!(
            (0..W).contains(&point.x()) && (0..H).contains(&point.y()),
            "remainder {point:?} outside {W}x{H}"
        );
        Self { point }
    }

    pub fn point(self) -> Point<O, S> {
        self.point
    }

    /// Row-major buffer index.
    #[inline]
    pub fn index(self) -> usize {
        (self.point.y() * W + self.point.x()) as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        if index >= Self::AREA {
            return None;
        }
        let index = index as i32;
        Some(Self {
            point: Point::new(index % W, index / W),
        })
    }
}

/// Coordinates the distance helpers can measure.
pub trait Coord: Copy {
    fn raw3(self) -> IVec3;
}

impl<O: Origin, S: Scale> Coord for Point<O, S> {
    fn raw3(self) -> IVec3 {
        self.raw.extend(0)
    }
}

impl<O: Origin, S: Scale> Coord for Tripoint<O, S> {
    fn raw3(self) -> IVec3 {
        self.raw
    }
}

/// Euclidean distance truncated toward zero.
pub fn trig_dist<C: Coord>(a: C, b: C) -> i32 {
    let d = a.raw3() - b.raw3();
    let (dx, dy, dz) = (d.x as i64, d.y as i64, d.z as i64);
    ((dx * dx + dy * dy + dz * dz) as f64).sqrt() as i32
}

pub fn manhattan_dist<C: Coord>(a: C, b: C) -> i32 {
    let d = (a.raw3() - b.raw3()).abs();
    d.x + d.y + d.z
}

/// Chebyshev distance: the number of king moves between two tiles.
pub fn square_dist<C: Coord>(a: C, b: C) -> i32 {
    let d = (a.raw3() - b.raw3()).abs();
    d.x.max(d.y).max(d.z)
}

/// Planar neighbours of `from` that are strictly closer to `to`, best first.
///
/// The direct step comes first, followed by the two steps that still make
/// progress along one axis. Returns nothing when the points share x and y.
pub fn squares_closer_to<O: Origin, S: Scale>(
    from: Tripoint<O, S>,
    to: Tripoint<O, S>,
) -> Vec<Tripoint<O, S>> {
    let dx = (to.x() - from.x()).signum();
    let dy = (to.y() - from.y()).signum();
    let steps: [(i32, i32); 3] = match (dx, dy) {
        (0, 0) => return Vec::new(),
        (dx, 0) => [(dx, 0), (dx, 1), (dx, -1)],
        (0, dy) => [(0, dy), (1, dy), (-1, dy)],
        (dx, dy) => [(dx, dy), (dx, 0), (0, dy)],
    };
    let square = square_dist(from, to);
    let manhattan = manhattan_dist(from, to);
    steps
        .iter()
        .map(|&(sx, sy)| from + Point::<Rel, S>::new(sx, sy))
        .filter(|candidate| {
            square_dist(*candidate, to) < square || manhattan_dist(*candidate, to) < manhattan
        })
        .collect()
}

pub type PointRelMs = Point<Rel, Ms>;
pub type TripointRelMs = Tripoint<Rel, Ms>;
pub type PointRelSm = Point<Rel, Sm>;

pub type PointAbsMs = Point<Abs, Ms>;
pub type TripointAbsMs = Tripoint<Abs, Ms>;
pub type PointAbsSm = Point<Abs, Sm>;
pub type TripointAbsSm = Tripoint<Abs, Sm>;
pub type PointAbsOmt = Point<Abs, Omt>;
pub type TripointAbsOmt = Tripoint<Abs, Omt>;
pub type PointAbsMmr = Point<Abs, Mmr>;
pub type PointAbsSeg = Point<Abs, Seg>;
pub type PointAbsOm = Point<Abs, Om>;

pub type PointSmMs = Point<Submap, Ms>;
pub type TripointSmMs = Tripoint<Submap, Ms>;
pub type PointOmtMs = Point<OvermapTerrain, Ms>;
pub type TripointOmtMs = Tripoint<OvermapTerrain, Ms>;
pub type PointOmtSm = Point<OvermapTerrain, Sm>;
pub type PointMmrSm = Point<MapMemoryRegion, Sm>;
pub type PointSegOmt = Point<Segment, Omt>;

pub type PointOmMs = Point<Overmap, Ms>;
pub type TripointOmMs = Tripoint<Overmap, Ms>;
pub type PointOmSm = Point<Overmap, Sm>;
pub type TripointOmSm = Tripoint<Overmap, Sm>;
pub type PointOmOmt = Point<Overmap, Omt>;
pub type TripointOmOmt = Tripoint<Overmap, Omt>;

pub type PointSmMsIb = InBounds<Submap, Ms, SEEX, SEEY>;
pub type PointOmtMsIb = InBounds<OvermapTerrain, Ms, OMT_MS_SIZE, OMT_MS_SIZE>;
pub type PointOmOmtIb = InBounds<Overmap, Omt, OMAPX, OMAPY>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floor_division_handles_negative_tiles() {
        assert_eq!(divide_remain(-1, 12), (-1, 11));
        assert_eq!(divide_remain(-12, 12), (-1, 0));
        assert_eq!(divide_remain(-13, 12), (-2, 11));
        assert_eq!(divide_remain(0, 12), (0, 0));
        assert_eq!(divide_remain(11, 12), (0, 11));
        assert_eq!(divide_remain(12, 12), (1, 0));
    }

    #[test]
    fn tile_minus_one_belongs_to_submap_minus_one() {
        let tile = TripointAbsMs::new(-1, -1, 0);
        let (submap, within) = tile.project_remain::<Sm>();
        assert_eq!(submap, PointAbsSm::new(-1, -1));
        assert_eq!(within, TripointSmMs::new(11, 11, 0));
        assert_eq!(tile.project_to::<Sm>(), TripointAbsSm::new(-1, -1, 0));
    }

    #[test]
    fn remain_then_combine_round_trips_across_boundaries() {
        for x in -50..50 {
            for y in [-49, -25, -24, -13, -12, -1, 0, 1, 11, 12, 24, 48] {
                let p = TripointAbsMs::new(x, y, -2);
                let (sm, r) = p.project_remain::<Sm>();
                assert_eq!(project_combine(sm, r), p);
                let (omt, r) = p.project_remain::<Omt>();
                assert_eq!(project_combine(omt, r), p);
                let (mmr, r) = p.project_remain::<Mmr>();
                assert_eq!(project_combine(mmr, r), p);
            }
        }
    }

    #[test]
    fn overmap_and_segment_round_trip_with_large_negatives() {
        let samples = [
            -2 * OMAPX * OMT_MS_SIZE - 7,
            -OMAPX * OMT_MS_SIZE - 1,
            -OMAPX * OMT_MS_SIZE,
            -1,
            0,
            OMAPX * OMT_MS_SIZE - 1,
            OMAPX * OMT_MS_SIZE + 5,
        ];
        for &x in &samples {
            for &y in &samples {
                let p = TripointAbsMs::new(x, y, 3);
                let (om, r) = p.project_remain::<Om>();
                assert!((0..OMAPX * OMT_MS_SIZE).contains(&r.x()));
                assert!((0..OMAPY * OMT_MS_SIZE).contains(&r.y()));
                assert_eq!(project_combine(om, r), p);

                let omt = p.project_to::<Omt>();
                let (seg, r) = omt.project_remain::<Seg>();
                assert!((0..SEG_SIZE).contains(&r.x()));
                assert_eq!(project_combine(seg, r), omt);
            }
        }
    }

    #[test]
    fn remain_of_combine_returns_parts() {
        let quotient = PointAbsOm::new(-2, 1);
        let remainder = TripointOmSm::new(359, 0, 1);
        let combined: TripointAbsSm = project_combine(quotient, remainder);
        assert_eq!(combined, TripointAbsSm::new(-360 * 2 + 359, 360, 1));
        assert_eq!(combined.project_remain::<Om>(), (quotient, remainder));
    }

    #[test]
    fn project_to_scales_both_directions() {
        let omt = PointAbsOmt::new(-3, 4);
        assert_eq!(omt.project_to::<Sm>(), PointAbsSm::new(-6, 8));
        assert_eq!(omt.project_to::<Ms>(), PointAbsMs::new(-72, 96));
        assert_eq!(PointAbsMs::new(-25, 23).project_to::<Omt>(), PointAbsOmt::new(-2, 0));
        assert_eq!(PointAbsSeg::new(1, -1).project_to::<Om>(), PointAbsOm::new(0, -1));
        assert_eq!(PointAbsMmr::new(-1, 2).project_to::<Sm>(), PointAbsSm::new(-8, 16));
    }

    #[test]
    fn in_bounds_rejects_outside_values() {
        assert!(PointOmtMsIb::new(PointOmtMs::new(23, 0)).is_some());
        assert!(PointOmtMsIb::new(PointOmtMs::new(24, 0)).is_none());
        assert!(PointOmtMsIb::new(PointOmtMs::new(0, -1)).is_none());
        let ib = PointOmtMsIb::new(PointOmtMs::new(3, 2)).unwrap();
        assert_eq!(ib.index(), 2 * 24 + 3);
        assert_eq!(PointOmtMsIb::from_index(ib.index()), Some(ib));
        assert_eq!(PointOmtMsIb::from_index(576), None);
    }

    #[test]
    fn distance_helpers() {
        let a = TripointAbsMs::new(0, 0, 0);
        let b = TripointAbsMs::new(3, -4, 0);
        assert_eq!(trig_dist(a, b), 5);
        assert_eq!(manhattan_dist(a, b), 7);
        assert_eq!(square_dist(a, b), 4);
        assert_eq!(trig_dist(PointAbsSm::new(1, 1), PointAbsSm::new(2, 2)), 1);
    }

    #[test]
    fn squares_closer_to_prefers_the_diagonal() {
        let from = TripointAbsMs::new(0, 0, 0);
        let steps = squares_closer_to(from, TripointAbsMs::new(5, -5, 0));
        assert_eq!(steps[0], TripointAbsMs::new(1, -1, 0));
        assert_eq!(steps.len(), 3);
        let straight = squares_closer_to(from, TripointAbsMs::new(-4, 0, 0));
        assert_eq!(straight[0], TripointAbsMs::new(-1, 0, 0));
        assert!(squares_closer_to(from, TripointAbsMs::new(0, 0, 2)).is_empty());
    }

    #[test]
    fn tripoints_order_by_layer_then_row() {
        let mut points = vec![
            TripointAbsMs::new(5, 0, 1),
            TripointAbsMs::new(9, 1, 0),
            TripointAbsMs::new(2, 1, 0),
        ];
        points.sort();
        assert_eq!(
            points,
            vec![
                TripointAbsMs::new(2, 1, 0),
                TripointAbsMs::new(9, 1, 0),
                TripointAbsMs::new(5, 0, 1),
            ]
        );
    }
}
