use geo::Coord;

use crate::geom::ConvexPolygon;
use crate::map::{Collidable, Collider, IdSet, Map, eligible, hits_any};

/// A flat-list map: every query scans all collidables.
///
/// The reference implementation of the [`Map`] contract. Suitable on its own
/// for small worlds and used as the behavioral baseline for
/// [`PartitionedMap`](crate::PartitionedMap).
#[derive(Clone, Debug)]
pub struct SimpleMap<T: Collider = Collidable> {
    width: f64,
    height: f64,
    collidables: Vec<T>,
    id_counter: u32,
}

impl<T: Collider> SimpleMap<T> {
    /// Create an empty map spanning `[0, width) x [0, height)`.
    pub fn new(width: f64, height: f64) -> Self {
        assert!(width > 0.0 && height > 0.0, "map dimensions must be positive, got {width}x{height}");
        Self { width, height, collidables: Vec::new(), id_counter: 0 }
    }

    /// Number of registered collidables.
    #[inline] pub fn len(&self) -> usize { self.collidables.len() }

    /// Check if no collidables are registered.
    #[inline] pub fn is_empty(&self) -> bool { self.collidables.is_empty() }

    /// Iterate over the collidables in registration order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.collidables.iter()
    }

    /// Look up a collidable by id.
    pub fn collidable(&self, id: u32) -> Option<&T> {
        self.collidables.iter().find(|c| c.id() == id)
    }

    /// Register a collidable: assigns the next id, appends, returns the id.
    /// No geometric validation is performed.
    pub fn register(&mut self, mut collidable: T) -> u32 {
        let id = self.id_counter;
        self.id_counter += 1;
        collidable.set_id(id);
        self.collidables.push(collidable);
        id
    }

    /// Remove a collidable by id and hand it back.
    /// Panics if the id is unknown.
    pub fn unregister(&mut self, id: u32) -> T {
        let index = self
            .collidables
            .iter()
            .position(|c| c.id() == id)
            .unwrap_or_else(|| panic!("unregister of unknown collidable {id}"));
        self.collidables.remove(index)
    }

    /// Move a collidable to a new position.
    /// Panics if the id is unknown.
    pub fn move_to(&mut self, id: u32, position: Coord<f64>) {
        let collidable = self
            .collidables
            .iter_mut()
            .find(|c| c.id() == id)
            .unwrap_or_else(|| panic!("move of unknown collidable {id}"));
        collidable.set_position(position);
    }

    /// Get the id of the first collidable (in registration order) whose bounds
    /// contain `position`. Boundary points are outside.
    pub fn get_intersecting(&self, position: Coord<f64>) -> Option<u32> {
        self.collidables
            .iter()
            .find(|c| c.bounds().contains_point(position - c.position()))
            .map(|c| c.id())
    }
}

impl<T: Collider> Map for SimpleMap<T> {
    type Element = T;

    #[inline] fn width(&self) -> f64 { self.width }
    #[inline] fn height(&self) -> f64 { self.height }

    fn trace(
        &self,
        traces: &[ConvexPolygon],
        from: Coord<f64>,
        exclude_ids: &IdSet,
        exclude_flags: u64,
    ) -> bool {
        !self
            .collidables
            .iter()
            .any(|c| eligible(c, exclude_ids, exclude_flags) && hits_any(c, traces, from))
    }

    fn trace_exhaust(
        &self,
        traces: &[ConvexPolygon],
        from: Coord<f64>,
        exclude_ids: &IdSet,
        exclude_flags: u64,
    ) -> Vec<&T> {
        self.collidables
            .iter()
            .filter(|c| eligible(*c, exclude_ids, exclude_flags) && hits_any(*c, traces, from))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use geo::coord;

    use super::*;
    use crate::geom::sweep;

    fn square(side: f64) -> ConvexPolygon {
        let h = side / 2.0;
        ConvexPolygon::from_points([(-h, -h), (h, -h), (h, h), (-h, h)])
    }

    fn map_with_squares(positions: &[(f64, f64)]) -> SimpleMap {
        let mut map = SimpleMap::new(100.0, 100.0);
        for &(x, y) in positions {
            map.register(Collidable::at(x, y, square(2.0)));
        }
        map
    }

    #[test]
    fn register_assigns_sequential_ids() {
        let mut map = SimpleMap::new(100.0, 100.0);
        assert_eq!(map.register(Collidable::at(10.0, 10.0, square(2.0))), 0);
        assert_eq!(map.register(Collidable::at(20.0, 10.0, square(2.0))), 1);
        assert_eq!(map.len(), 2);
        assert_eq!(map.collidable(1).unwrap().position(), coord! { x: 20.0, y: 10.0 });
        assert!(map.collidable(7).is_none());
    }

    #[test]
    fn unregister_returns_the_collidable() {
        let mut map = map_with_squares(&[(10.0, 10.0), (20.0, 10.0)]);
        let removed = map.unregister(0);
        assert_eq!(removed.position(), coord! { x: 10.0, y: 10.0 });
        assert_eq!(map.len(), 1);
        assert!(map.collidable(0).is_none());
    }

    #[test]
    #[should_panic(expected = "unknown collidable")]
    fn unregister_unknown_id_panics() {
        let mut map = map_with_squares(&[(10.0, 10.0)]);
        map.unregister(3);
    }

    #[test]
    fn contains_respects_world_bounds() {
        let map = map_with_squares(&[]);
        let poly = square(2.0);
        assert!(map.contains(&poly, coord! { x: 50.0, y: 50.0 }));
        assert!(map.contains(&poly, coord! { x: 1.5, y: 1.5 }));
        // AABB pokes past the low edge.
        assert!(!map.contains(&poly, coord! { x: 0.5, y: 50.0 }));
        // Flush against the high edge is outside the half-open world.
        assert!(!map.contains(&poly, coord! { x: 99.0, y: 50.0 }));
    }

    #[test]
    fn get_intersecting_first_match_boundary_outside() {
        let mut map = SimpleMap::new(100.0, 100.0);
        map.register(Collidable::at(10.0, 10.0, square(4.0)));
        map.register(Collidable::at(12.0, 10.0, square(4.0))); // overlaps the first

        // Inside both: the first registered wins.
        assert_eq!(map.get_intersecting(coord! { x: 11.0, y: 10.0 }), Some(0));
        // Inside only the second.
        assert_eq!(map.get_intersecting(coord! { x: 13.5, y: 10.0 }), Some(1));
        // On the first square's boundary: outside it, but inside the second.
        assert_eq!(map.get_intersecting(coord! { x: 12.0, y: 10.0 }), Some(1));
        assert_eq!(map.get_intersecting(coord! { x: 50.0, y: 50.0 }), None);
    }

    #[test]
    fn trace_empty_input_is_vacuously_clear() {
        let map = map_with_squares(&[(10.0, 10.0)]);
        assert!(map.trace(&[], coord! { x: 0.0, y: 0.0 }, &IdSet::new(), 0));
        assert!(map.trace_exhaust(&[], coord! { x: 0.0, y: 0.0 }, &IdSet::new(), 0).is_empty());
    }

    #[test]
    fn trace_moving_reports_blockers_in_insertion_order() {
        let map = map_with_squares(&[(30.0, 50.0), (60.0, 50.0), (50.0, 90.0)]);
        let mover = square(2.0);
        let from = coord! { x: 10.0, y: 50.0 };
        let to = coord! { x: 90.0, y: 50.0 };

        assert!(!map.trace_moving(&mover, from, to, &IdSet::new(), 0));
        let hits = map.trace_exhaust_moving(&mover, from, to, &IdSet::new(), 0);
        let ids = hits.iter().map(|c| c.id()).collect::<Vec<_>>();
        assert_eq!(ids, vec![0, 1]);
    }

    #[test]
    fn trace_honours_id_and_flag_exclusions() {
        let mut map = SimpleMap::new(100.0, 100.0);
        let blocker = map.register(Collidable::at(50.0, 50.0, square(2.0)));
        map.register(Collidable::with_flags(coord! { x: 70.0, y: 50.0 }, square(2.0), 0b10));

        let mover = square(2.0);
        let from = coord! { x: 10.0, y: 50.0 };
        let to = coord! { x: 90.0, y: 50.0 };

        let mut exclude = IdSet::new();
        exclude.insert(blocker);
        let hits = map.trace_exhaust_moving(&mover, from, to, &exclude, 0);
        assert_eq!(hits.iter().map(|c| c.id()).collect::<Vec<_>>(), vec![1]);

        let hits = map.trace_exhaust_moving(&mover, from, to, &exclude, 0b10);
        assert!(hits.is_empty());
        assert!(map.trace_moving(&mover, from, to, &exclude, 0b10));
    }

    #[test]
    fn stationary_trace_uses_the_polygon_itself() {
        let map = map_with_squares(&[(50.0, 50.0)]);
        let mover = square(2.0);
        let traces = sweep(&mover, coord! { x: 0.0, y: 0.0 });

        assert!(!map.trace(&traces, coord! { x: 50.5, y: 50.0 }, &IdSet::new(), 0));
        assert!(map.trace(&traces, coord! { x: 55.0, y: 50.0 }, &IdSet::new(), 0));
    }
}
