use ahash::{AHashMap, AHashSet};
use anyhow::{Result, ensure};
use geo::{Coord, Rect, coord};
use smallvec::SmallVec;

use crate::geom::{ConvexPolygon, rect_contains_strict, translate_rect};
use crate::map::{Collidable, Collider, IdSet, Map, eligible, hits_any};
use crate::partition::PartitionConfig;
use crate::partition::node::{ChildSlot, LeafMap, LeafSet, PartitionNode};

/// World footprint of a collidable: its bounding rectangle at its position.
#[inline]
pub(super) fn footprint(collidable: &impl Collider) -> Rect<f64> {
    translate_rect(collidable.bounds().bounding_rect(), collidable.position())
}

/// Inclusive rectangle overlap used for leaf membership, so footprints that
/// only touch a dividing line are listed on both sides.
#[inline]
pub(super) fn overlaps(a: &Rect<f64>, b: &Rect<f64>) -> bool {
    crate::geom::rects_overlap(a, b)
}

/// An adaptive binary partition of the world into axis-aligned leaves.
///
/// Each leaf holds the ids of the collidables whose footprint intersects its
/// rectangle; a collidable spanning a dividing line is listed on both sides
/// and deduplicated at query time. Leaves split when they grow past
/// [`PartitionConfig::trigger_create_entities`] and under-full subtrees
/// collapse back into single leaves, so query cost follows local density
/// rather than world size.
///
/// Both tree arenas are dense vectors; collapsing left-shifts live entries
/// over the holes and repairs all indices through a remap table, so any index
/// held across an [`unregister`](Self::unregister) or
/// [`move_to`](Self::move_to) call is invalid.
#[derive(Clone, Debug)]
pub struct PartitionedMap<T: Collider = Collidable> {
    pub(super) width: f64,
    pub(super) height: f64,
    pub(super) config: PartitionConfig,
    pub(super) partitions: Vec<PartitionNode>,
    pub(super) maps: Vec<LeafMap>,
    pub(super) root: ChildSlot,
    pub(super) entities: AHashMap<u32, T>,
    pub(super) order: Vec<u32>,
    pub(super) id_counter: u32,
}

impl<T: Collider> PartitionedMap<T> {
    /// Create an empty map spanning `[0, width) x [0, height)` with the
    /// default tunables.
    pub fn new(width: f64, height: f64) -> Self {
        assert!(width > 0.0 && height > 0.0, "map dimensions must be positive, got {width}x{height}");
        Self::from_parts(width, height, PartitionConfig::default())
    }

    /// Create an empty map with custom tunables.
    pub fn with_config(width: f64, height: f64, config: PartitionConfig) -> Result<Self> {
        ensure!(width > 0.0 && height > 0.0, "map dimensions must be positive, got {width}x{height}");
        config.validate()?;
        Ok(Self::from_parts(width, height, config))
    }

    fn from_parts(width: f64, height: f64, config: PartitionConfig) -> Self {
        let world = Rect::new(coord! { x: 0.0, y: 0.0 }, coord! { x: width, y: height });
        Self {
            width,
            height,
            config,
            partitions: Vec::new(),
            maps: vec![LeafMap { parent: None, rect: world, entities: Vec::new() }],
            root: ChildSlot::Leaf(0),
            entities: AHashMap::new(),
            order: Vec::new(),
            id_counter: 0,
        }
    }

    /// Number of registered collidables.
    #[inline] pub fn len(&self) -> usize { self.entities.len() }

    /// Check if no collidables are registered.
    #[inline] pub fn is_empty(&self) -> bool { self.entities.is_empty() }

    /// Get the active tunables.
    #[inline] pub fn config(&self) -> &PartitionConfig { &self.config }

    /// Number of leaves in the tree.
    #[inline] pub fn leaf_count(&self) -> usize { self.maps.len() }

    /// Number of inner nodes in the tree.
    #[inline] pub fn partition_count(&self) -> usize { self.partitions.len() }

    /// Look up a collidable by id.
    #[inline]
    pub fn collidable(&self, id: u32) -> Option<&T> {
        self.entities.get(&id)
    }

    /// Iterate over the collidables in registration order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.order.iter().map(|id| &self.entities[id])
    }

    /// Register a collidable: assigns the next id, files it into every leaf
    /// its footprint intersects, and returns the id.
    pub fn register(&mut self, collidable: T) -> u32 {
        let id = self.id_counter;
        self.id_counter += 1;
        self.register_as(collidable, id)
    }

    /// Register a collidable under the id it already carries, for callers
    /// re-inserting an entity previously handed back by
    /// [`unregister`](Self::unregister). Panics if the id is already taken.
    pub fn register_with_id(&mut self, collidable: T) -> u32 {
        let id = collidable.id();
        assert!(!self.entities.contains_key(&id), "collidable id {id} is already registered");
        self.id_counter = self.id_counter.max(id + 1);
        self.register_as(collidable, id)
    }

    fn register_as(&mut self, mut collidable: T, id: u32) -> u32 {
        collidable.set_id(id);
        let fp = footprint(&collidable);
        let leaves = self.find_maps_rects(std::slice::from_ref(&fp));
        for &leaf in &leaves {
            self.maps[leaf as usize].entities.push(id);
        }
        self.entities.insert(id, collidable);
        self.order.push(id);
        for &leaf in &leaves {
            self.consider_split(leaf);
        }
        #[cfg(debug_assertions)]
        self.validate();
        id
    }

    /// Remove a collidable, collapse any subtrees left under-full, and hand
    /// the collidable back. Panics if the id is unknown.
    pub fn unregister(&mut self, id: u32) -> T {
        let Some(entity) = self.entities.remove(&id) else {
            panic!("unregister of unknown collidable {id}");
        };
        let fp = footprint(&entity);
        let leaves = self.find_maps_rects(std::slice::from_ref(&fp));
        for &leaf in &leaves {
            self.maps[leaf as usize].entities.retain(|&e| e != id);
        }
        self.order.retain(|&e| e != id);
        self.consider_prune(leaves);
        #[cfg(debug_assertions)]
        self.validate();
        entity
    }

    /// Move a collidable to a new position, refiling it between leaves as
    /// needed. Panics if the id is unknown.
    pub fn move_to(&mut self, id: u32, position: Coord<f64>) {
        let (old_fp, new_fp) = {
            let entity = self
                .entities
                .get(&id)
                .unwrap_or_else(|| panic!("move of unknown collidable {id}"));
            (footprint(entity), translate_rect(entity.bounds().bounding_rect(), position))
        };

        let old = self.find_maps_rects(std::slice::from_ref(&old_fp));

        // Fast path: a single occupied leaf that strictly contains the new
        // footprint; no refiling needed.
        if let [only] = old.as_slice() {
            if rect_contains_strict(&self.maps[*only as usize].rect, &new_fp) {
                self.set_position(id, position);
                #[cfg(debug_assertions)]
                self.validate();
                return;
            }
        }

        let new = self.find_maps_rects(std::slice::from_ref(&new_fp));
        let removed: LeafSet = old.iter().copied().filter(|leaf| !new.contains(leaf)).collect();
        let added: LeafSet = new.iter().copied().filter(|leaf| !old.contains(leaf)).collect();

        for &leaf in &removed {
            self.maps[leaf as usize].entities.retain(|&e| e != id);
        }
        for &leaf in &added {
            self.maps[leaf as usize].entities.push(id);
        }
        self.set_position(id, position);

        for &leaf in &added {
            self.consider_split(leaf);
        }
        self.consider_prune(removed);
        #[cfg(debug_assertions)]
        self.validate();
    }

    fn set_position(&mut self, id: u32, position: Coord<f64>) {
        match self.entities.get_mut(&id) {
            Some(entity) => entity.set_position(position),
            None => unreachable!("collidable {id} vanished mid-move"),
        }
    }

    /// Get the id of the first collidable in the leaf under `position` whose
    /// bounds contain it. Boundary points are outside; positions exactly on a
    /// dividing line resolve to the low-coordinate leaf.
    pub fn get_intersecting(&self, position: Coord<f64>) -> Option<u32> {
        let leaf = self.find_map(position);
        self.maps[leaf as usize]
            .entities
            .iter()
            .find(|id| {
                let collidable = &self.entities[*id];
                collidable.bounds().contains_point(position - collidable.position())
            })
            .copied()
    }

    /// Resolve the leaf whose rectangle holds `position`; ties on a dividing
    /// line go left.
    pub(super) fn find_map(&self, position: Coord<f64>) -> u32 {
        let mut slot = self.root;
        loop {
            match slot {
                ChildSlot::Leaf(leaf) => return leaf,
                ChildSlot::Partition(part) => {
                    let node = &self.partitions[part as usize];
                    slot = if node.axis.of(position) <= node.split { node.left } else { node.right };
                }
            }
        }
    }

    /// Every leaf whose rectangle intersects at least one of `rects`
    /// (inclusive on shared edges).
    pub(super) fn find_maps_rects(&self, rects: &[Rect<f64>]) -> LeafSet {
        let mut leaves = LeafSet::new();
        if !rects.is_empty() {
            self.collect_leaves(self.root, rects, &mut leaves);
        }
        leaves
    }

    fn collect_leaves(&self, slot: ChildSlot, rects: &[Rect<f64>], out: &mut LeafSet) {
        match slot {
            ChildSlot::Leaf(leaf) => {
                let rect = self.maps[leaf as usize].rect;
                if rects.iter().any(|r| overlaps(r, &rect)) {
                    out.push(leaf);
                }
            }
            ChildSlot::Partition(part) => {
                let node = &self.partitions[part as usize];
                if rects.iter().any(|r| node.axis.of(r.min()) <= node.split) {
                    self.collect_leaves(node.left, rects, out);
                }
                if rects.iter().any(|r| node.axis.of(r.max()) >= node.split) {
                    self.collect_leaves(node.right, rects, out);
                }
            }
        }
    }
}

impl<T: Collider> Map for PartitionedMap<T> {
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
        if traces.is_empty() {
            return true;
        }
        let rects: SmallVec<[Rect<f64>; 2]> =
            traces.iter().map(|t| translate_rect(t.bounding_rect(), from)).collect();
        for &leaf in &self.find_maps_rects(&rects) {
            for id in &self.maps[leaf as usize].entities {
                let collidable = &self.entities[id];
                if eligible(collidable, exclude_ids, exclude_flags)
                    && hits_any(collidable, traces, from)
                {
                    return false;
                }
            }
        }
        true
    }

    fn trace_exhaust(
        &self,
        traces: &[ConvexPolygon],
        from: Coord<f64>,
        exclude_ids: &IdSet,
        exclude_flags: u64,
    ) -> Vec<&T> {
        if traces.is_empty() {
            return Vec::new();
        }
        let rects: SmallVec<[Rect<f64>; 2]> =
            traces.iter().map(|t| translate_rect(t.bounding_rect(), from)).collect();
        let leaves = self.find_maps_rects(&rects);
        let mut results = Vec::new();

        // With a single leaf no duplicates are possible.
        if let [leaf] = leaves.as_slice() {
            for id in &self.maps[*leaf as usize].entities {
                let collidable = &self.entities[id];
                if eligible(collidable, exclude_ids, exclude_flags)
                    && hits_any(collidable, traces, from)
                {
                    results.push(collidable);
                }
            }
            return results;
        }

        let mut seen = AHashSet::new();
        for &leaf in &leaves {
            for id in &self.maps[leaf as usize].entities {
                if !seen.insert(*id) {
                    continue;
                }
                let collidable = &self.entities[id];
                if eligible(collidable, exclude_ids, exclude_flags)
                    && hits_any(collidable, traces, from)
                {
                    results.push(collidable);
                }
            }
        }
        results
    }
}
