use geo::{Coord, coord};

use crate::geom::ConvexPolygon;

/// Element contract for objects stored in a map.
///
/// Maps are generic over their element so callers can attach game state to a
/// collidable; `Collidable` is the plain record for callers that need nothing
/// extra.
pub trait Collider {
    /// Map-assigned identifier, unique and stable for the collidable's
    /// lifetime within its owning map.
    fn id(&self) -> u32;

    /// Called by the owning map on registration.
    fn set_id(&mut self, id: u32);

    /// Caller-chosen 64-bit flag mask. Bit 63 is reserved.
    fn flags(&self) -> u64;

    /// World position of the local origin.
    fn position(&self) -> Coord<f64>;

    /// Called by the owning map when the collidable moves. Mutating the
    /// position behind the map's back corrupts its spatial bookkeeping.
    fn set_position(&mut self, position: Coord<f64>);

    /// Collision bounds in local coordinates; the world footprint is
    /// `bounds + position`.
    fn bounds(&self) -> &ConvexPolygon;
}

/// A plain collidable record: id, flags, position and convex bounds.
#[derive(Clone, Debug)]
pub struct Collidable {
    id: u32,
    flags: u64,
    position: Coord<f64>,
    bounds: ConvexPolygon,
}

impl Collidable {
    /// Create an unregistered collidable with no flags set.
    pub fn new(position: Coord<f64>, bounds: ConvexPolygon) -> Self {
        Self::with_flags(position, bounds, 0)
    }

    /// Create an unregistered collidable with the given flag mask.
    pub fn with_flags(position: Coord<f64>, bounds: ConvexPolygon, flags: u64) -> Self {
        debug_assert!(flags & (1 << 63) == 0, "flag bit 63 is reserved");
        Self { id: 0, flags, position, bounds }
    }

    /// Create a collidable at `(x, y)`.
    pub fn at(x: f64, y: f64, bounds: ConvexPolygon) -> Self {
        Self::new(coord! { x: x, y: y }, bounds)
    }
}

impl Collider for Collidable {
    #[inline] fn id(&self) -> u32 { self.id }
    #[inline] fn set_id(&mut self, id: u32) { self.id = id }
    #[inline] fn flags(&self) -> u64 { self.flags }
    #[inline] fn position(&self) -> Coord<f64> { self.position }
    #[inline] fn set_position(&mut self, position: Coord<f64>) { self.position = position }
    #[inline] fn bounds(&self) -> &ConvexPolygon { &self.bounds }
}
