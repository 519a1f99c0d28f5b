use crate::geom::rects_overlap_strict;
use crate::map::Collider;
use crate::partition::node::{ChildSlot, Side};
use crate::partition::partitioned::{PartitionedMap, footprint, overlaps};

impl<T: Collider> PartitionedMap<T> {
    /// Re-verify the partition invariants, panicking on any divergence.
    ///
    /// Runs automatically after every mutation in debug builds; callers can
    /// invoke it directly when chasing a suspected bookkeeping bug.
    pub fn validate(&self) {
        self.validate_tree_links();
        self.validate_tiling();
        self.validate_occupancy();

        assert_eq!(
            self.order.len(),
            self.entities.len(),
            "registration order list diverges from the entity table",
        );
        for id in &self.order {
            assert!(self.entities.contains_key(id), "order list holds unknown entity {id}");
        }
    }

    fn validate_tree_links(&self) {
        match self.root {
            ChildSlot::Partition(part) => {
                assert!(
                    self.partitions[part as usize].parent.is_none(),
                    "root partition {part} has a parent",
                );
            }
            ChildSlot::Leaf(leaf) => {
                assert_eq!(self.maps.len(), 1, "a leaf root implies a single leaf");
                assert!(self.maps[leaf as usize].parent.is_none(), "root leaf {leaf} has a parent");
            }
        }

        for (index, node) in self.partitions.iter().enumerate() {
            for side in [Side::Left, Side::Right] {
                match node.child(side) {
                    ChildSlot::Partition(sub) => assert_eq!(
                        self.partitions[sub as usize].parent,
                        Some((index as u32, side)),
                        "partition {sub} has a stale parent link",
                    ),
                    ChildSlot::Leaf(leaf) => assert_eq!(
                        self.maps[leaf as usize].parent,
                        Some((index as u32, side)),
                        "leaf {leaf} has a stale parent link",
                    ),
                }
            }
        }

        // Both arenas are dense: everything is reachable from the root,
        // exactly once.
        let mut part_seen = vec![false; self.partitions.len()];
        let mut map_seen = vec![false; self.maps.len()];
        let mut stack = vec![self.root];
        while let Some(slot) = stack.pop() {
            match slot {
                ChildSlot::Partition(part) => {
                    assert!(!part_seen[part as usize], "partition {part} reached twice");
                    part_seen[part as usize] = true;
                    let node = &self.partitions[part as usize];
                    stack.push(node.left);
                    stack.push(node.right);
                }
                ChildSlot::Leaf(leaf) => {
                    assert!(!map_seen[leaf as usize], "leaf {leaf} reached twice");
                    map_seen[leaf as usize] = true;
                }
            }
        }
        assert!(part_seen.iter().all(|&seen| seen), "unreachable partition in the arena");
        assert!(map_seen.iter().all(|&seen| seen), "unreachable leaf in the arena");
    }

    fn validate_tiling(&self) {
        let mut area = 0.0;
        for (index, leaf) in self.maps.iter().enumerate() {
            let rect = leaf.rect;
            assert!(
                rect.min().x >= 0.0
                    && rect.min().y >= 0.0
                    && rect.max().x <= self.width
                    && rect.max().y <= self.height,
                "leaf {index} leaks outside the world",
            );
            area += rect.width() * rect.height();
            for (other_index, other) in self.maps.iter().enumerate().skip(index + 1) {
                assert!(
                    !rects_overlap_strict(&rect, &other.rect),
                    "leaves {index} and {other_index} overlap",
                );
            }
        }
        let world = self.width * self.height;
        assert!(
            (area - world).abs() <= world * 1e-9,
            "leaf rectangles do not tile the world: {area} != {world}",
        );
    }

    fn validate_occupancy(&self) {
        for (&id, entity) in &self.entities {
            let fp = footprint(entity);
            for (index, leaf) in self.maps.iter().enumerate() {
                let expected = overlaps(&fp, &leaf.rect);
                let held = leaf.entities.iter().filter(|&&e| e == id).count();
                assert!(held <= 1, "leaf {index} lists entity {id} more than once");
                assert_eq!(
                    held == 1,
                    expected,
                    "entity {id} occupancy of leaf {index} diverges from its footprint",
                );
            }
        }
        for (index, leaf) in self.maps.iter().enumerate() {
            for id in &leaf.entities {
                assert!(self.entities.contains_key(id), "leaf {index} lists unknown entity {id}");
            }
        }
    }
}
