use ahash::AHashSet;
use geo::Coord;

use crate::geom::{ConvexPolygon, sweep};
use crate::map::Collider;

/// Set of collidable ids excluded from trace queries.
pub type IdSet = AHashSet<u32>;

/// Query surface shared by all map implementations.
///
/// A trace asks whether a set of swept shapes placed at `from` is free of
/// eligible collidables; a collidable is eligible unless its id is excluded or
/// it carries an excluded flag bit. The `_moving` conveniences extrude a
/// polygon along `to - from` and run the same query.
pub trait Map {
    /// The element type stored in the map.
    type Element: Collider;

    /// World width.
    fn width(&self) -> f64;

    /// World height.
    fn height(&self) -> f64;

    /// Returns true if the polygon's bounding rectangle placed at `position`
    /// lies strictly inside `[0, width) x [0, height)`.
    fn contains(&self, polygon: &ConvexPolygon, position: Coord<f64>) -> bool {
        let bbox = polygon.bounding_rect();
        position.x + bbox.min().x >= 0.0
            && position.y + bbox.min().y >= 0.0
            && position.x + bbox.max().x < self.width()
            && position.y + bbox.max().y < self.height()
    }

    /// Returns true iff no eligible collidable overlaps any of the `traces`
    /// placed at `from`. Empty input is vacuously clear.
    fn trace(
        &self,
        traces: &[ConvexPolygon],
        from: Coord<f64>,
        exclude_ids: &IdSet,
        exclude_flags: u64,
    ) -> bool;

    /// Every eligible collidable overlapping at least one of the `traces`
    /// placed at `from`, each at most once.
    fn trace_exhaust(
        &self,
        traces: &[ConvexPolygon],
        from: Coord<f64>,
        exclude_ids: &IdSet,
        exclude_flags: u64,
    ) -> Vec<&Self::Element>;

    /// Trace a polygon moving in a straight line from `from` to `to`.
    fn trace_moving(
        &self,
        polygon: &ConvexPolygon,
        from: Coord<f64>,
        to: Coord<f64>,
        exclude_ids: &IdSet,
        exclude_flags: u64,
    ) -> bool {
        self.trace(&sweep(polygon, to - from), from, exclude_ids, exclude_flags)
    }

    /// Exhaustive variant of [`Map::trace_moving`].
    fn trace_exhaust_moving(
        &self,
        polygon: &ConvexPolygon,
        from: Coord<f64>,
        to: Coord<f64>,
        exclude_ids: &IdSet,
        exclude_flags: u64,
    ) -> Vec<&Self::Element> {
        self.trace_exhaust(&sweep(polygon, to - from), from, exclude_ids, exclude_flags)
    }
}

/// Eligibility filter shared by trace queries.
#[inline]
pub(crate) fn eligible<T: Collider>(collidable: &T, exclude_ids: &IdSet, exclude_flags: u64) -> bool {
    collidable.flags() & exclude_flags == 0 && !exclude_ids.contains(&collidable.id())
}

/// Returns true if any trace placed at `from` overlaps the collidable.
#[inline]
pub(crate) fn hits_any<T: Collider>(collidable: &T, traces: &[ConvexPolygon], from: Coord<f64>) -> bool {
    traces
        .iter()
        .any(|trace| trace.collides_at(from, collidable.bounds(), collidable.position()))
}
