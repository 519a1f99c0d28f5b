use geo::{BoundingRect, Centroid, Contains, Coord, LineString, Point, Polygon, Rect, Relate, Translate, coord};

use crate::geom::vector::{rects_overlap_strict, translate_rect};

/// A convex polygon in local coordinates with a stable, ordered vertex ring.
///
/// Vertex indices are stable for the lifetime of the polygon; the pathfinder
/// identifies snap targets by them. The closed shape, edge vectors, centroid
/// and bounding rectangle are precomputed on construction.
#[derive(Clone, Debug)]
pub struct ConvexPolygon {
    ring: Vec<Coord<f64>>,
    edges: Vec<Coord<f64>>,
    shape: Polygon<f64>,
    centroid: Coord<f64>,
    bbox: Rect<f64>,
}

impl ConvexPolygon {
    /// Construct a convex polygon from an open vertex ring in winding order.
    /// Convexity is not validated; callers must screen inputs.
    pub fn new(vertices: Vec<Coord<f64>>) -> Self {
        assert!(vertices.len() >= 3, "a polygon needs at least 3 vertices, got {}", vertices.len());

        let shape = Polygon::new(LineString::from(vertices.clone()), vec![]);
        let centroid = shape
            .centroid()
            .unwrap_or(Point::new(f64::NAN, f64::NAN));
        let bbox = shape.bounding_rect().unwrap();
        let edges = (0..vertices.len())
            .map(|i| vertices[(i + 1) % vertices.len()] - vertices[i])
            .collect();

        Self {
            ring: vertices,
            edges,
            shape,
            centroid: coord! { x: centroid.x(), y: centroid.y() },
            bbox,
        }
    }

    /// Construct from `(x, y)` pairs.
    pub fn from_points(points: impl IntoIterator<Item = (f64, f64)>) -> Self {
        Self::new(points.into_iter().map(|(x, y)| coord! { x: x, y: y }).collect())
    }

    /// A regular polygon with `sides` vertices on a circle of `radius`,
    /// starting at angle zero and winding counter-clockwise.
    pub fn regular(sides: u32, radius: f64) -> Self {
        Self::new(
            (0..sides)
                .map(|i| {
                    let angle = i as f64 * std::f64::consts::TAU / sides as f64;
                    coord! { x: radius * angle.cos(), y: radius * angle.sin() }
                })
                .collect(),
        )
    }

    /// Number of vertices.
    #[inline] pub fn len(&self) -> usize { self.ring.len() }

    /// Always false; a polygon carries at least 3 vertices.
    #[inline] pub fn is_empty(&self) -> bool { self.ring.is_empty() }

    /// The open vertex ring, in construction order.
    #[inline] pub fn vertices(&self) -> &[Coord<f64>] { &self.ring }

    /// Get a vertex by index.
    #[inline] pub fn vertex(&self, index: u32) -> Coord<f64> { self.ring[index as usize] }

    /// Get the edge vector leading out of the vertex at `index`.
    #[inline] pub fn edge(&self, index: u32) -> Coord<f64> { self.edges[index as usize] }

    /// Get the precomputed centroid.
    #[inline] pub fn centroid(&self) -> Coord<f64> { self.centroid }

    /// Get the precomputed axis-aligned bounding rectangle.
    #[inline] pub fn bounding_rect(&self) -> Rect<f64> { self.bbox }

    /// Point-in-polygon test. Points on the boundary are outside.
    pub fn contains_point(&self, point: Coord<f64>) -> bool {
        self.shape.contains(&Point::from(point))
    }

    /// Returns true if this polygon placed at `position` overlaps `other`
    /// placed at `other_position` in area. Pure boundary touches (shared edge
    /// or vertex) are not collisions.
    pub fn collides_at(
        &self,
        position: Coord<f64>,
        other: &ConvexPolygon,
        other_position: Coord<f64>,
    ) -> bool {
        let delta = other_position - position;
        if !rects_overlap_strict(&self.bbox, &translate_rect(other.bbox, delta)) {
            return false;
        }

        let moved = other.shape.translate(delta.x, delta.y);
        let im = self.shape.relate(&moved);
        im.is_intersects() && !im.is_touches()
    }
}
