use ahash::AHashSet;
use geo::{Rect, coord};
use log::debug;

use crate::map::Collider;
use crate::partition::node::{Axis, ChildSlot, LeafMap, Side};
use crate::partition::partitioned::PartitionedMap;

impl<T: Collider> PartitionedMap<T> {
    /// Collapse any subtree around the given leaves that has fallen to or
    /// below the destruction trigger.
    ///
    /// Each merge promotes as far up the tree as the threshold allows before
    /// collapsing, and the replacement leaf is attached at the candidate
    /// partition's own parent slot; the root partition has no parent slot and
    /// is therefore never pruned.
    pub(super) fn consider_prune(&mut self, leaves: impl IntoIterator<Item = u32>) {
        let mut pending: Vec<u32> = leaves.into_iter().collect();
        while let Some(leaf) = pending.pop() {
            let Some((parent, _)) = self.maps[leaf as usize].parent else {
                continue;
            };
            if self.count_partition(parent) > self.config.trigger_destroy_entities {
                continue;
            }

            let mut candidate = parent;
            while let Some((up, _)) = self.partitions[candidate as usize].parent {
                if self.count_partition(up) <= self.config.trigger_destroy_entities {
                    candidate = up;
                } else {
                    break;
                }
            }

            let Some((target, side)) = self.partitions[candidate as usize].parent else {
                continue;
            };
            self.merge_all_children(target, side, &mut pending);
        }
    }

    /// Total entity count of the subtree on one side of a partition,
    /// duplicates counted per leaf.
    pub(super) fn count_entities(&self, part: u32, side: Side) -> usize {
        match self.partitions[part as usize].child(side) {
            ChildSlot::Leaf(leaf) => self.maps[leaf as usize].entities.len(),
            ChildSlot::Partition(sub) => self.count_partition(sub),
        }
    }

    /// Total entity count under both sides of a partition.
    pub(super) fn count_partition(&self, part: u32) -> usize {
        self.count_entities(part, Side::Left) + self.count_entities(part, Side::Right)
    }

    /// World rectangle covered by one side of a partition, independent of the
    /// tree currently under it: walk up to the root recording sides, then
    /// tighten the world rectangle back down split by split.
    pub(super) fn find_map_location(&self, part: u32, side: Side) -> Rect<f64> {
        let mut hops = vec![(part, side)];
        let mut cursor = part;
        while let Some(link) = self.partitions[cursor as usize].parent {
            hops.push(link);
            cursor = link.0;
        }

        let mut min = coord! { x: 0.0, y: 0.0 };
        let mut max = coord! { x: self.width, y: self.height };
        for &(node, node_side) in hops.iter().rev() {
            let node = &self.partitions[node as usize];
            match (node.axis, node_side) {
                (Axis::Vertical, Side::Left) => max.x = node.split,
                (Axis::Vertical, Side::Right) => min.x = node.split,
                (Axis::Horizontal, Side::Left) => max.y = node.split,
                (Axis::Horizontal, Side::Right) => min.y = node.split,
            }
        }
        Rect::new(min, max)
    }

    /// Collapse the subtree on one side of `part` into a single fresh leaf
    /// holding every distinct entity of its descendant leaves.
    ///
    /// Removing subtree nodes left-shifts both arenas, so every surviving
    /// index is repaired through a rolling remap table, as are the leaf
    /// indices the caller is still tracking in `pending`.
    fn merge_all_children(&mut self, part: u32, side: Side, pending: &mut Vec<u32>) {
        let ChildSlot::Partition(sub) = self.partitions[part as usize].child(side) else {
            return;
        };

        let mut dead_parts = Vec::new();
        let mut dead_maps = Vec::new();
        self.collect_subtree(sub, &mut dead_parts, &mut dead_maps);

        let mut seen = AHashSet::new();
        let mut ids = Vec::new();
        for &leaf in &dead_maps {
            for &id in &self.maps[leaf as usize].entities {
                if seen.insert(id) {
                    ids.push(id);
                }
            }
        }

        let rect = self.find_map_location(part, side);
        debug!(
            "collapsing {} partitions and {} leaves into one leaf with {} entities",
            dead_parts.len(),
            dead_maps.len(),
            ids.len(),
        );

        let (part_gone, part_shift) = removal_tables(self.partitions.len(), &dead_parts);
        let (map_gone, map_shift) = removal_tables(self.maps.len(), &dead_maps);

        // Left-shift live entries over the holes.
        let live_partitions = std::mem::take(&mut self.partitions);
        self.partitions = live_partitions
            .into_iter()
            .enumerate()
            .filter_map(|(index, node)| (!part_gone[index]).then_some(node))
            .collect();
        let live_maps = std::mem::take(&mut self.maps);
        self.maps = live_maps
            .into_iter()
            .enumerate()
            .filter_map(|(index, leaf)| (!map_gone[index]).then_some(leaf))
            .collect();

        // Repair every surviving index through the rolling tables.
        let remap_part = |index: u32| index - part_shift[index as usize];
        let remap_map = |index: u32| index - map_shift[index as usize];
        let remap_slot = |slot: ChildSlot| match slot {
            ChildSlot::Partition(index) => ChildSlot::Partition(remap_part(index)),
            ChildSlot::Leaf(index) => ChildSlot::Leaf(remap_map(index)),
        };
        for node in &mut self.partitions {
            node.left = remap_slot(node.left);
            node.right = remap_slot(node.right);
            if let Some((up, _)) = &mut node.parent {
                *up = remap_part(*up);
            }
        }
        for leaf in &mut self.maps {
            if let Some((up, _)) = &mut leaf.parent {
                *up = remap_part(*up);
            }
        }
        self.root = remap_slot(self.root);
        pending.retain(|&leaf| !map_gone[leaf as usize]);
        for leaf in pending.iter_mut() {
            *leaf = remap_map(*leaf);
        }

        // Fresh leaf spanning the merged rectangle.
        let target = remap_part(part);
        let merged = self.maps.len() as u32;
        self.maps.push(LeafMap { parent: Some((target, side)), rect, entities: ids });
        self.partitions[target as usize].set_child(side, ChildSlot::Leaf(merged));
    }

    fn collect_subtree(&self, part: u32, parts: &mut Vec<u32>, leaves: &mut Vec<u32>) {
        parts.push(part);
        for side in [Side::Left, Side::Right] {
            match self.partitions[part as usize].child(side) {
                ChildSlot::Partition(sub) => self.collect_subtree(sub, parts, leaves),
                ChildSlot::Leaf(leaf) => leaves.push(leaf),
            }
        }
    }
}

/// Removal marks plus the rolling shift table: a surviving index `i` moves to
/// `i - shift[i]`, where `shift[i]` counts removed entries at or below `i`.
fn removal_tables(len: usize, removed: &[u32]) -> (Vec<bool>, Vec<u32>) {
    let mut gone = vec![false; len];
    for &index in removed {
        gone[index as usize] = true;
    }
    let mut shift = vec![0u32; len];
    let mut holes = 0u32;
    for (index, slot) in shift.iter_mut().enumerate() {
        if gone[index] {
            holes += 1;
        }
        *slot = holes;
    }
    (gone, shift)
}
