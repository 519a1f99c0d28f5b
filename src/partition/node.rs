use geo::{Coord, Rect, coord};
use smallvec::SmallVec;

/// Leaf-index result set of a `find_maps` query.
pub(crate) type LeafSet = SmallVec<[u32; 8]>;

/// Orientation of a partition's dividing line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Axis {
    /// Horizontal line: `split` is a Y coordinate.
    Horizontal,
    /// Vertical line: `split` is an X coordinate.
    Vertical,
}

impl Axis {
    /// Project a point onto this axis's split coordinate.
    #[inline]
    pub(crate) fn of(self, point: Coord<f64>) -> f64 {
        match self {
            Axis::Horizontal => point.y,
            Axis::Vertical => point.x,
        }
    }
}

/// Which side of a partition a child occupies. `Left` is the low-coordinate
/// half; point lookups resolve ties onto it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Side {
    Left,
    Right,
}

/// A child slot of a partition: either another partition or a leaf.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ChildSlot {
    Partition(u32),
    Leaf(u32),
}

/// Inner node of the partition tree.
#[derive(Clone, Debug)]
pub(crate) struct PartitionNode {
    pub(crate) axis: Axis,
    pub(crate) split: f64,
    pub(crate) left: ChildSlot,
    pub(crate) right: ChildSlot,
    /// Parent partition and the side this node occupies there; `None` at the root.
    pub(crate) parent: Option<(u32, Side)>,
}

impl PartitionNode {
    /// Get the child slot on a side.
    #[inline]
    pub(crate) fn child(&self, side: Side) -> ChildSlot {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }

    /// Replace the child slot on a side.
    #[inline]
    pub(crate) fn set_child(&mut self, side: Side, slot: ChildSlot) {
        match side {
            Side::Left => self.left = slot,
            Side::Right => self.right = slot,
        }
    }
}

/// Leaf of the partition tree: a world rectangle and the entity ids inside it.
#[derive(Clone, Debug)]
pub(crate) struct LeafMap {
    pub(crate) parent: Option<(u32, Side)>,
    pub(crate) rect: Rect<f64>,
    pub(crate) entities: Vec<u32>,
}

/// Split a rectangle along an axis; the left half keeps the low coordinates.
pub(crate) fn split_rect(rect: Rect<f64>, axis: Axis, split: f64) -> (Rect<f64>, Rect<f64>) {
    match axis {
        Axis::Vertical => (
            Rect::new(rect.min(), coord! { x: split, y: rect.max().y }),
            Rect::new(coord! { x: split, y: rect.min().y }, rect.max()),
        ),
        Axis::Horizontal => (
            Rect::new(rect.min(), coord! { x: rect.max().x, y: split }),
            Rect::new(coord! { x: rect.min().x, y: split }, rect.max()),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_rect_tiles_the_original() {
        let rect = Rect::new(coord! { x: 0.0, y: 0.0 }, coord! { x: 10.0, y: 4.0 });

        let (left, right) = split_rect(rect, Axis::Vertical, 6.0);
        assert_eq!(left.max(), coord! { x: 6.0, y: 4.0 });
        assert_eq!(right.min(), coord! { x: 6.0, y: 0.0 });

        let (top, bottom) = split_rect(rect, Axis::Horizontal, 1.0);
        assert_eq!(top.max(), coord! { x: 10.0, y: 1.0 });
        assert_eq!(bottom.min(), coord! { x: 0.0, y: 1.0 });
    }
}
