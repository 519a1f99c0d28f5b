use geo::{Coord, Rect};
use log::debug;

use crate::map::Collider;
use crate::partition::PartitionConfig;
use crate::partition::node::{Axis, ChildSlot, LeafMap, PartitionNode, Side, split_rect};
use crate::partition::partitioned::{PartitionedMap, footprint, overlaps};

/// Quadratic coefficient of the punishment denominator.
const PUNISH_QUAD: f64 = 16.0;
/// Linear coefficient of the punishment denominator. Dominates derivative
/// behavior between consecutive points at the normalized scale.
const PUNISH_LIN: f64 = 25.0;
/// Constant term of the punishment denominator.
const PUNISH_BASE: f64 = 0.7;
/// Newton iteration cap per seed.
const NEWTON_STEPS: usize = 10;
/// Flatness / degeneracy tolerance for the Newton iteration.
const NEWTON_EPS: f64 = 1e-9;

impl<T: Collider> PartitionedMap<T> {
    /// Split the leaf if it has grown past the creation trigger and a
    /// dividing line with an acceptable punishment exists.
    pub(super) fn consider_split(&mut self, leaf: u32) {
        if self.maps[leaf as usize].entities.len() <= self.config.trigger_create_entities {
            return;
        }

        let rect = self.maps[leaf as usize].rect;
        let centers = self.maps[leaf as usize]
            .entities
            .iter()
            .map(|id| {
                let entity = &self.entities[id];
                entity.position() + entity.bounds().centroid()
            })
            .collect::<Vec<_>>();

        let Some((axis, split)) = choose_split(&centers, rect, &self.config) else {
            return;
        };
        self.split_leaf(leaf, axis, split);
    }

    /// Divide a leaf in two. The leaf keeps the low-coordinate half and its
    /// arena slot; a fresh partition takes the leaf's place in the tree.
    fn split_leaf(&mut self, leaf: u32, axis: Axis, split: f64) {
        let part = self.partitions.len() as u32;
        let new_leaf = self.maps.len() as u32;

        let (parent, rect, ids) = {
            let old = &mut self.maps[leaf as usize];
            (old.parent, old.rect, std::mem::take(&mut old.entities))
        };
        let (left_rect, right_rect) = split_rect(rect, axis, split);

        let mut left_ids = Vec::with_capacity(ids.len());
        let mut right_ids = Vec::new();
        for id in ids {
            let fp = footprint(&self.entities[&id]);
            if overlaps(&fp, &left_rect) {
                left_ids.push(id);
            }
            if overlaps(&fp, &right_rect) {
                right_ids.push(id);
            }
        }
        debug!(
            "split leaf {leaf} on {axis:?} at {split:.3}: {} | {} entities",
            left_ids.len(),
            right_ids.len(),
        );

        self.partitions.push(PartitionNode {
            axis,
            split,
            left: ChildSlot::Leaf(leaf),
            right: ChildSlot::Leaf(new_leaf),
            parent,
        });

        {
            let old = &mut self.maps[leaf as usize];
            old.parent = Some((part, Side::Left));
            old.rect = left_rect;
            old.entities = left_ids;
        }
        self.maps.push(LeafMap {
            parent: Some((part, Side::Right)),
            rect: right_rect,
            entities: right_ids,
        });

        match parent {
            None => self.root = ChildSlot::Partition(part),
            Some((up, side)) => self.partitions[up as usize].set_child(side, ChildSlot::Partition(part)),
        }
    }
}

/// Pick the axis and world coordinate whose dividing line sits furthest from
/// the entity centers, or `None` if no viable line exists.
fn choose_split(centers: &[Coord<f64>], rect: Rect<f64>, config: &PartitionConfig) -> Option<(Axis, f64)> {
    let longest = rect.width().max(rect.height());
    if !(longest > 0.0) {
        return None;
    }

    let mut best: Option<(Axis, f64, f64)> = None;
    for axis in [Axis::Vertical, Axis::Horizontal] {
        let (extent, low) = match axis {
            Axis::Vertical => (rect.width(), rect.min().x),
            Axis::Horizontal => (rect.height(), rect.min().y),
        };
        // Both axes are judged on the scale of the longer side; the shorter
        // one is centered in [0, 1], which compresses its points together and
        // makes a cut across the thin dimension score worse.
        let offset = (1.0 - extent / longest) / 2.0;
        let mut points = centers
            .iter()
            .map(|c| (axis.of(*c) - low) / longest + offset)
            .collect::<Vec<_>>();
        points.sort_unstable_by(f64::total_cmp);

        let Some((punishment, z)) = best_split_position(&points, config) else {
            continue;
        };
        let world = (z - offset) * longest + low;
        if !(world > low && world < low + extent) {
            continue;
        }
        if best.map_or(true, |(_, _, p)| punishment < p) {
            best = Some((axis, world, punishment));
        }
    }
    best.map(|(axis, world, _)| (axis, world))
}

/// Minimize the punishment over the viable band of sorted, normalized entity
/// positions. Returns `(punishment, position)` of the best candidate found.
fn best_split_position(points: &[f64], config: &PartitionConfig) -> Option<(f64, f64)> {
    let n = points.len();
    if n <= 2 * config.min_partition_entities {
        return None;
    }
    let viable = (n - 2 * config.min_partition_entities).min(2 * config.max_partition_entities);
    let edges = ((n - viable) / 2).max(config.min_partition_entities);
    if n < 2 * edges + 2 {
        return None;
    }

    let mut best: Option<(f64, f64)> = None;
    for seed in edges..(n - edges - 1) {
        let (low, high) = (points[seed], points[seed + 1]);
        if high - low <= NEWTON_EPS {
            continue;
        }

        let mut x = 0.5 * (low + high);
        for _ in 0..NEWTON_STEPS {
            let value = punishment(points, x);
            if best.map_or(true, |(p, _)| value < p) {
                best = Some((value, x));
            }

            let (first, second) = punishment_derivatives(points, x);
            if first.abs() < NEWTON_EPS || second.abs() < NEWTON_EPS {
                break;
            }
            let next = x - first / second;
            if !next.is_finite() || next < low || next > high {
                break;
            }
            x = next;
        }
    }
    best
}

/// `P(x) = sum 1 / (a d^2 + b |d| + c)` over `d = z_i - x`: large near entity
/// clusters, small in the gaps between them.
fn punishment(points: &[f64], x: f64) -> f64 {
    points
        .iter()
        .map(|&z| {
            let d = (z - x).abs();
            1.0 / (PUNISH_QUAD * d * d + PUNISH_LIN * d + PUNISH_BASE)
        })
        .sum()
}

/// Analytic first and second derivatives of [`punishment`] with respect to `x`.
fn punishment_derivatives(points: &[f64], x: f64) -> (f64, f64) {
    let mut first = 0.0;
    let mut second = 0.0;
    for &z in points {
        let d = z - x;
        let sign = if d >= 0.0 { 1.0 } else { -1.0 };
        let denom = PUNISH_QUAD * d * d + PUNISH_LIN * d.abs() + PUNISH_BASE;
        let slope = 2.0 * PUNISH_QUAD * d + PUNISH_LIN * sign;
        first += slope / (denom * denom);
        second += (2.0 * slope * slope - 2.0 * PUNISH_QUAD * denom) / (denom * denom * denom);
    }
    (first, second)
}
