use geo::{ConvexHull, Coord, MultiPoint, Point};

use crate::geom::ConvexPolygon;

/// Extrude a convex polygon along a displacement vector.
///
/// Returns the set of swept convex shapes covered by translating the polygon
/// from the origin to `displacement`; for a convex polygon this is the convex
/// hull of the original and the displaced vertex rings. A zero displacement
/// yields the polygon itself. The result stays in the polygon's local frame,
/// to be placed at the start of the motion.
pub fn sweep(polygon: &ConvexPolygon, displacement: Coord<f64>) -> Vec<ConvexPolygon> {
    if displacement.x == 0.0 && displacement.y == 0.0 {
        return vec![polygon.clone()];
    }

    let points = polygon
        .vertices()
        .iter()
        .map(|&v| Point::from(v))
        .chain(polygon.vertices().iter().map(|&v| Point::from(v + displacement)))
        .collect::<Vec<_>>();

    let hull = MultiPoint::new(points).convex_hull();
    let mut ring = hull.exterior().0.clone();
    ring.pop(); // drop the closing duplicate

    vec![ConvexPolygon::new(ring)]
}
