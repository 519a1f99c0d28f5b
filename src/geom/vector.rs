use geo::{Coord, Rect};

/// Relative tolerance for the parallel-edge test.
const PARALLEL_EPS: f64 = 1e-9;

/// Euclidean distance between two points.
#[inline]
pub(crate) fn distance(a: Coord<f64>, b: Coord<f64>) -> f64 {
    let d = b - a;
    d.x.hypot(d.y)
}

/// Dot product of two vectors.
#[inline]
pub(crate) fn dot(a: Coord<f64>, b: Coord<f64>) -> f64 {
    a.x * b.x + a.y * b.y
}

/// Z component of the cross product of two vectors.
#[inline]
pub(crate) fn cross(a: Coord<f64>, b: Coord<f64>) -> f64 {
    a.x * b.y - a.y * b.x
}

/// Returns true if the two direction vectors are parallel (either orientation).
#[inline]
pub(crate) fn parallel(a: Coord<f64>, b: Coord<f64>) -> bool {
    cross(a, b).abs() <= PARALLEL_EPS * a.x.hypot(a.y) * b.x.hypot(b.y)
}

/// Shift a rectangle by an offset.
#[inline]
pub(crate) fn translate_rect(rect: Rect<f64>, offset: Coord<f64>) -> Rect<f64> {
    Rect::new(rect.min() + offset, rect.max() + offset)
}

/// Inclusive rectangle overlap: rectangles sharing only an edge or corner count.
#[inline]
pub(crate) fn rects_overlap(a: &Rect<f64>, b: &Rect<f64>) -> bool {
    a.min().x <= b.max().x && b.min().x <= a.max().x && a.min().y <= b.max().y && b.min().y <= a.max().y
}

/// Strict rectangle overlap: the interiors must intersect.
#[inline]
pub(crate) fn rects_overlap_strict(a: &Rect<f64>, b: &Rect<f64>) -> bool {
    a.min().x < b.max().x && b.min().x < a.max().x && a.min().y < b.max().y && b.min().y < a.max().y
}

/// Returns true if `inner` lies strictly inside `outer` (no shared edges).
#[inline]
pub(crate) fn rect_contains_strict(outer: &Rect<f64>, inner: &Rect<f64>) -> bool {
    inner.min().x > outer.min().x
        && inner.min().y > outer.min().y
        && inner.max().x < outer.max().x
        && inner.max().y < outer.max().y
}
