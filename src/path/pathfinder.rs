use std::collections::BinaryHeap;

use ahash::AHashSet;
use geo::Coord;
use log::debug;

use crate::geom::{ConvexPolygon, distance, dot, parallel};
use crate::map::{Collider, IdSet, Map};
use crate::path::node::{PathNode, QueueEntry};

/// Weight applied to the heuristic term of a node's priority. Values above 1
/// bias the search toward depth-first progress over guaranteed shortness.
const HEURISTIC_WEIGHT: f64 = 1.5;
/// Initial capacity of the open queue.
const QUEUE_CAPACITY: usize = 256;

/// A single-query any-angle pathfinder for one moving convex polygon.
///
/// The search works on vertex snaps: candidate placements align one vertex of
/// the moving polygon with one vertex of an obstacle, the way a unit hugs a
/// corner when walking around a building. From a snapped placement the search
/// can slide to the neighbouring vertices of the same obstacle, so a path
/// wraps around an obstacle one contact at a time. Placements are explored
/// best-first by `g + 1.5 h`; each `(obstacle, obstacle vertex, our vertex)`
/// triple is attempted at most once, which bounds the search.
///
/// Paths are approximate and human-looking rather than optimal, and the
/// search does not thread narrow corridors: a placement is only reachable if
/// the straight sweep toward it is completely clear.
pub struct Pathfinder<'a, M: Map> {
    map: &'a M,
    moving: ConvexPolygon,
    start: Coord<f64>,
    end: Coord<f64>,
    exclude_ids: IdSet,
    exclude_flags: u64,
    nodes: Vec<PathNode>,
    queue: BinaryHeap<QueueEntry>,
    closed: AHashSet<(u32, u32, u32)>,
}

impl<'a, M: Map> Pathfinder<'a, M> {
    /// Bind a pathfinder to one query. Collidables whose id is in
    /// `exclude_ids` or whose flags intersect `exclude_flags` are invisible
    /// to the search.
    pub fn new(
        map: &'a M,
        moving: ConvexPolygon,
        start: Coord<f64>,
        end: Coord<f64>,
        exclude_ids: IdSet,
        exclude_flags: u64,
    ) -> Self {
        Self {
            map,
            moving,
            start,
            end,
            exclude_ids,
            exclude_flags,
            nodes: Vec::new(),
            queue: BinaryHeap::with_capacity(QUEUE_CAPACITY),
            closed: AHashSet::new(),
        }
    }

    /// Compute a path from `start` to `end`.
    ///
    /// Returns the waypoints with the start excluded and the end included; a
    /// single-element result means the straight line was already clear.
    /// Returns `None` when no path exists, including when the polygon cannot
    /// even stand at the destination.
    pub fn calculate_path(&mut self) -> Option<Vec<Coord<f64>>> {
        self.nodes.clear();
        self.queue.clear();
        self.closed.clear();

        let map = self.map;
        let initial =
            map.trace_exhaust_moving(&self.moving, self.start, self.end, &self.exclude_ids, self.exclude_flags);
        if initial.is_empty() {
            return Some(vec![self.end]);
        }
        if !map.trace(std::slice::from_ref(&self.moving), self.end, &self.exclude_ids, self.exclude_flags) {
            return None;
        }

        self.nodes.push(PathNode {
            parent: None,
            location: self.start,
            obstacle: None,
            their_vertex: 0,
            our_vertex: 0,
            g: 0.0,
        });
        self.queue_collidables(0, initial);

        while let Some(QueueEntry { node, .. }) = self.queue.pop() {
            let location = self.nodes[node as usize].location;
            let blocking =
                map.trace_exhaust_moving(&self.moving, location, self.end, &self.exclude_ids, self.exclude_flags);
            if blocking.is_empty() {
                debug!(
                    "path found after {} placements and {} closed snaps",
                    self.nodes.len(),
                    self.closed.len(),
                );
                return Some(self.reconstruct(node));
            }
            self.queue_collidables(node, blocking);
        }

        debug!("no path after {} closed snaps", self.closed.len());
        None
    }

    /// Generate snap candidates from a node against every reached obstacle.
    ///
    /// Obstacles discovered while tracing toward a candidate join the working
    /// set of the same pass, deduplicated by id, so the frontier widens until
    /// every obstacle in the way has been considered.
    fn queue_collidables(&mut self, from_index: u32, reached: Vec<&'a M::Element>) {
        let mut seen: AHashSet<u32> = reached.iter().map(|c| c.id()).collect();
        let mut obstacles = reached;

        let mut index = 0;
        while index < obstacles.len() {
            let obstacle = obstacles[index];
            index += 1;

            let from = self.nodes[from_index as usize];
            let ring = obstacle.bounds().len() as u32;
            for their_vertex in 0..ring {
                let our_vertex = self.natural_vertex(obstacle, their_vertex);

                if from.obstacle != Some(obstacle.id()) {
                    // Fresh approach: any vertex of the obstacle is fair game.
                    self.consider_target(from, from_index, obstacle, their_vertex, our_vertex, &mut obstacles, &mut seen);
                    continue;
                }

                // Sliding along the obstacle we are already snapped to: only
                // the ring neighbours of the current contact are workable.
                let next = (from.their_vertex + 1) % ring;
                let previous = (from.their_vertex + ring - 1) % ring;
                if their_vertex != next && their_vertex != previous {
                    continue;
                }

                if our_vertex == from.our_vertex {
                    self.consider_target(from, from_index, obstacle, their_vertex, our_vertex, &mut obstacles, &mut seen);
                    continue;
                }

                // Our contact vertex has to change too. Step one vertex along
                // the shorter way around our ring (ties walk forward).
                let ours = self.moving.len() as u32;
                let forward = (our_vertex + ours - from.our_vertex) % ours;
                let step_forward = forward <= ours - forward;
                let target_our = if step_forward {
                    (from.our_vertex + 1) % ours
                } else {
                    (from.our_vertex + ours - 1) % ours
                };

                if target_our == our_vertex {
                    let our_edge = if step_forward {
                        self.moving.edge(from.our_vertex)
                    } else {
                        self.moving.edge(target_our)
                    };
                    let their_edge = if their_vertex == next {
                        obstacle.bounds().edge(from.their_vertex)
                    } else {
                        obstacle.bounds().edge(their_vertex)
                    };
                    // Parallel contact edges make the intermediate placement
                    // collinear; take the combined step directly.
                    if parallel(our_edge, their_edge) {
                        self.consider_target(from, from_index, obstacle, their_vertex, our_vertex, &mut obstacles, &mut seen);
                        continue;
                    }
                }

                // Rotate one contact at a time: their vertex steps while ours
                // holds, or ours steps while theirs holds.
                self.consider_target(from, from_index, obstacle, from.their_vertex, target_our, &mut obstacles, &mut seen);
                self.consider_target(from, from_index, obstacle, their_vertex, from.our_vertex, &mut obstacles, &mut seen);
            }
        }
    }

    /// Attempt one snap placement; enqueue it if the sweep toward it is
    /// clear, otherwise report what was in the way back into the pass.
    fn consider_target(
        &mut self,
        from: PathNode,
        from_index: u32,
        obstacle: &'a M::Element,
        their_vertex: u32,
        our_vertex: u32,
        obstacles: &mut Vec<&'a M::Element>,
        seen: &mut AHashSet<u32>,
    ) {
        let key = (obstacle.id(), their_vertex, our_vertex);
        if self.closed.contains(&key) {
            return;
        }

        let target =
            obstacle.position() + obstacle.bounds().vertex(their_vertex) - self.moving.vertex(our_vertex);
        let map = self.map;
        if !map.contains(&self.moving, target) {
            self.closed.insert(key);
            return;
        }

        let blocking =
            map.trace_exhaust_moving(&self.moving, from.location, target, &self.exclude_ids, self.exclude_flags);
        if blocking.is_empty() {
            self.closed.insert(key);
            let g = from.g + distance(from.location, target);
            let node = self.nodes.len() as u32;
            self.nodes.push(PathNode {
                parent: Some(from_index),
                location: target,
                obstacle: Some(obstacle.id()),
                their_vertex,
                our_vertex,
                g,
            });
            self.queue.push(QueueEntry {
                priority: g + HEURISTIC_WEIGHT * distance(self.end, target),
                node,
            });
        } else {
            // Unreachable for now; the triple stays open and everything in
            // the way becomes another candidate obstacle of this pass.
            for hit in blocking {
                if seen.insert(hit.id()) {
                    obstacles.push(hit);
                }
            }
        }
    }

    /// The moving-polygon vertex that touches the obstacle vertex when the
    /// polygon is pressed against it from outside: the one furthest along the
    /// direction from the obstacle vertex toward its centroid.
    fn natural_vertex(&self, obstacle: &M::Element, their_vertex: u32) -> u32 {
        let bounds = obstacle.bounds();
        let direction = bounds.centroid() - bounds.vertex(their_vertex);

        let mut best = 0u32;
        let mut best_dot = f64::NEG_INFINITY;
        for (index, &vertex) in self.moving.vertices().iter().enumerate() {
            let d = dot(vertex, direction);
            if d > best_dot {
                best_dot = d;
                best = index as u32;
            }
        }
        best
    }

    /// Walk the parent chain back from `node`, yielding the waypoints with
    /// the start excluded and the end appended.
    fn reconstruct(&self, node: u32) -> Vec<Coord<f64>> {
        let mut path = vec![self.end];
        let mut cursor = node;
        loop {
            let current = self.nodes[cursor as usize];
            match current.parent {
                Some(parent) => {
                    path.push(current.location);
                    cursor = parent;
                }
                None => break,
            }
        }
        path.reverse();
        path
    }
}

#[cfg(test)]
mod tests {
    use geo::coord;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;
    use crate::map::{Collidable, SimpleMap};
    use crate::partition::PartitionedMap;

    fn square(side: f64) -> ConvexPolygon {
        let h = side / 2.0;
        ConvexPolygon::from_points([(-h, -h), (h, -h), (h, h), (-h, h)])
    }

    fn triangle() -> ConvexPolygon {
        ConvexPolygon::from_points([(-1.0, -1.0), (1.0, -1.0), (0.0, 1.0)])
    }

    fn assert_path_valid<M: Map>(
        map: &M,
        moving: &ConvexPolygon,
        start: Coord<f64>,
        path: &[Coord<f64>],
        exclude_ids: &IdSet,
        exclude_flags: u64,
    ) {
        assert!(!path.is_empty());
        let mut from = start;
        for &to in path {
            assert!(
                map.trace_exhaust_moving(moving, from, to, exclude_ids, exclude_flags).is_empty(),
                "segment {from:?} -> {to:?} is blocked",
            );
            from = to;
        }
    }

    #[test]
    fn s1_clear_line_yields_the_end_directly() {
        let mut map = SimpleMap::new(200.0, 100.0);
        map.register(Collidable::at(100.0, 10.0, square(2.0)));

        let start = coord! { x: 10.0, y: 70.0 };
        let end = coord! { x: 150.0, y: 70.0 };
        let mut finder = Pathfinder::new(&map, square(2.0), start, end, IdSet::new(), 0);
        assert_eq!(finder.calculate_path(), Some(vec![end]));
    }

    #[test]
    fn s2_goes_around_an_obstacle() {
        let mut map = SimpleMap::new(200.0, 100.0);
        map.register(Collidable::at(80.0, 70.0, ConvexPolygon::regular(7, 10.0)));

        let start = coord! { x: 10.0, y: 70.0 };
        let end = coord! { x: 150.0, y: 70.0 };
        let mover = triangle();
        let mut finder = Pathfinder::new(&map, mover.clone(), start, end, IdSet::new(), 0);
        let path = finder.calculate_path().expect("a path around the obstacle");

        assert_ne!(path, vec![end], "the straight line should have been blocked");
        assert!(path.len() >= 2);
        assert_eq!(*path.last().unwrap(), end);
        assert_path_valid(&map, &mover, start, &path, &IdSet::new(), 0);
    }

    #[test]
    fn s2_on_a_partitioned_map() {
        let mut map = PartitionedMap::new(200.0, 100.0);
        map.register(Collidable::at(80.0, 70.0, ConvexPolygon::regular(7, 10.0)));

        let start = coord! { x: 10.0, y: 70.0 };
        let end = coord! { x: 150.0, y: 70.0 };
        let mover = triangle();
        let mut finder = Pathfinder::new(&map, mover.clone(), start, end, IdSet::new(), 0);
        let path = finder.calculate_path().expect("a path around the obstacle");

        assert_ne!(path, vec![end]);
        assert_path_valid(&map, &mover, start, &path, &IdSet::new(), 0);
    }

    #[test]
    fn s3_flag_exclusion_clears_the_line() {
        let mut map = SimpleMap::new(200.0, 100.0);
        map.register(Collidable::with_flags(
            coord! { x: 100.0, y: 70.0 },
            ConvexPolygon::regular(7, 10.0),
            0b10,
        ));

        let start = coord! { x: 50.0, y: 70.0 };
        let end = coord! { x: 150.0, y: 70.0 };
        let mut finder = Pathfinder::new(&map, square(2.0), start, end, IdSet::new(), 0b10);
        assert_eq!(finder.calculate_path(), Some(vec![end]));
    }

    #[test]
    fn s4_id_exclusion_clears_the_line() {
        let mut map = SimpleMap::new(200.0, 100.0);
        let blocker = map.register(Collidable::at(80.0, 70.0, ConvexPolygon::regular(7, 10.0)));

        let start = coord! { x: 10.0, y: 70.0 };
        let end = coord! { x: 150.0, y: 70.0 };
        let mut exclude = IdSet::new();
        exclude.insert(blocker);
        let mut finder = Pathfinder::new(&map, triangle(), start, end, exclude, 0);
        assert_eq!(finder.calculate_path(), Some(vec![end]));
    }

    #[test]
    fn s5_destination_inside_an_obstacle_has_no_path() {
        let mut map = SimpleMap::new(200.0, 100.0);
        map.register(Collidable::at(150.0, 70.0, ConvexPolygon::regular(7, 10.0)));

        let start = coord! { x: 10.0, y: 70.0 };
        let end = coord! { x: 150.0, y: 70.0 };
        let mut finder = Pathfinder::new(&map, square(2.0), start, end, IdSet::new(), 0);
        assert_eq!(finder.calculate_path(), None);
    }

    #[test]
    fn random_fields_yield_valid_paths() {
        let mut rng = StdRng::seed_from_u64(0xfeed);
        let mover = square(2.0);

        for round in 0..10 {
            let mut map: PartitionedMap = PartitionedMap::new(300.0, 200.0);
            for _ in 0..12 {
                map.register(Collidable::new(
                    coord! {
                        x: rng.random_range(40.0..260.0),
                        y: rng.random_range(20.0..180.0),
                    },
                    ConvexPolygon::regular(rng.random_range(3..=8), rng.random_range(3.0..10.0)),
                ));
            }

            let start = coord! { x: 5.0, y: rng.random_range(10.0..190.0) };
            let end = coord! { x: 295.0, y: rng.random_range(10.0..190.0) };
            if !map.trace(std::slice::from_ref(&mover), start, &IdSet::new(), 0) {
                continue; // start buried in an obstacle, nothing to assert
            }

            let mut finder = Pathfinder::new(&map, mover.clone(), start, end, IdSet::new(), 0);
            // Either outcome is legitimate on a random field, but a returned
            // path must be segment-by-segment clear and finish at the end.
            if let Some(path) = finder.calculate_path() {
                assert_eq!(*path.last().unwrap(), end, "round {round}");
                assert_path_valid(&map, &mover, start, &path, &IdSet::new(), 0);
            }
        }
    }

    #[test]
    fn sealed_chamber_exhausts_the_search() {
        // Eight flush wall segments enclose the centre; the destination is
        // valid to stand on but unreachable, so the queue must run dry.
        let mut map = SimpleMap::new(40.0, 40.0);
        for (x, y) in [
            (10.0, 10.0), (20.0, 10.0), (30.0, 10.0),
            (10.0, 20.0),               (30.0, 20.0),
            (10.0, 30.0), (20.0, 30.0), (30.0, 30.0),
        ] {
            map.register(Collidable::at(x, y, square(10.0)));
        }

        let start = coord! { x: 3.0, y: 20.0 };
        let end = coord! { x: 20.0, y: 20.0 };
        let mut finder = Pathfinder::new(&map, square(2.0), start, end, IdSet::new(), 0);
        assert_eq!(finder.calculate_path(), None);
    }

    #[test]
    fn slides_along_a_parallel_wall() {
        // A long axis-aligned wall and an axis-aligned mover: the slide
        // candidates along the wall's edges are parallel to the mover's
        // edges, so the detour hops corner to corner around the box.
        let mut map = SimpleMap::new(200.0, 100.0);
        map.register(Collidable::at(
            100.0,
            50.0,
            ConvexPolygon::from_points([(-40.0, -6.0), (40.0, -6.0), (40.0, 6.0), (-40.0, 6.0)]),
        ));

        let start = coord! { x: 10.0, y: 50.0 };
        let end = coord! { x: 190.0, y: 50.0 };
        let mover = square(2.0);
        let mut finder = Pathfinder::new(&map, mover.clone(), start, end, IdSet::new(), 0);
        let path = finder.calculate_path().expect("a path around the wall");

        assert!(path.len() >= 2, "the wall forces at least one waypoint");
        assert_path_valid(&map, &mover, start, &path, &IdSet::new(), 0);
        // The detour has to clear the wall's long side.
        assert!(path.iter().any(|p| p.y <= 43.0 || p.y >= 57.0));
    }

    #[test]
    fn excluded_obstacle_in_the_detour_is_ignored() {
        let mut map = SimpleMap::new(200.0, 100.0);
        map.register(Collidable::at(80.0, 70.0, ConvexPolygon::regular(7, 10.0)));
        // A flagged obstacle parked above the blocker, in the way of the
        // likely detour.
        map.register(Collidable::with_flags(
            coord! { x: 80.0, y: 88.0 },
            square(6.0),
            0b100,
        ));

        let start = coord! { x: 10.0, y: 70.0 };
        let end = coord! { x: 150.0, y: 70.0 };
        let mover = triangle();
        let mut finder = Pathfinder::new(&map, mover.clone(), start, end, IdSet::new(), 0b100);
        let path = finder.calculate_path().expect("a path around the heptagon only");

        // Validity holds under the same exclusions; without them the flagged
        // box must not have influenced acceptance at all.
        assert_path_valid(&map, &mover, start, &path, &IdSet::new(), 0b100);
    }

    #[test]
    fn waypoints_walk_around_multiple_obstacles() {
        let mut map = SimpleMap::new(300.0, 100.0);
        map.register(Collidable::at(100.0, 50.0, ConvexPolygon::regular(6, 12.0)));
        map.register(Collidable::at(180.0, 50.0, ConvexPolygon::regular(5, 12.0)));

        let start = coord! { x: 10.0, y: 50.0 };
        let end = coord! { x: 280.0, y: 50.0 };
        let mover = square(3.0);
        let mut finder = Pathfinder::new(&map, mover.clone(), start, end, IdSet::new(), 0);
        let path = finder.calculate_path().expect("a path through the field");

        assert_eq!(*path.last().unwrap(), end);
        assert_path_valid(&map, &mover, start, &path, &IdSet::new(), 0);
    }
}
