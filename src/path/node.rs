use std::cmp::Ordering;

use geo::Coord;

/// A reached placement in the snap search. Nodes form a tree rooted at the
/// start; the final path is read off by walking `parent` links back.
#[derive(Clone, Copy, Debug)]
pub(super) struct PathNode {
    /// Arena index of the node this placement was reached from; `None` at the
    /// start node.
    pub(super) parent: Option<u32>,
    /// World location of the moving polygon's origin at this placement.
    pub(super) location: Coord<f64>,
    /// Obstacle this placement snaps against; unused at the start node.
    pub(super) obstacle: Option<u32>,
    /// Obstacle vertex the snap aligns to.
    pub(super) their_vertex: u32,
    /// Moving-polygon vertex the snap aligns with.
    pub(super) our_vertex: u32,
    /// Path cost accumulated from the start.
    pub(super) g: f64,
}

/// Min-order heap entry: the node index plus its frozen `g + w*h` priority.
#[derive(Clone, Copy, Debug)]
pub(super) struct QueueEntry {
    pub(super) priority: f64,
    pub(super) node: u32,
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.priority.total_cmp(&other.priority) == Ordering::Equal
    }
}

impl Eq for QueueEntry {}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// Reversed so the std max-heap pops the lowest priority first.
impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other.priority.total_cmp(&self.priority)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BinaryHeap;

    use super::*;

    #[test]
    fn heap_pops_lowest_priority_first() {
        let mut heap = BinaryHeap::new();
        for (priority, node) in [(3.5, 0), (1.25, 1), (2.0, 2)] {
            heap.push(QueueEntry { priority, node });
        }
        let order = std::iter::from_fn(|| heap.pop().map(|e| e.node)).collect::<Vec<_>>();
        assert_eq!(order, vec![1, 2, 0]);
    }
}
