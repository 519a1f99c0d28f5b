#![doc = "Any-angle pathfinding for convex polygons over an adaptive rectangular space partition"]

mod geom;
mod map;
mod partition;
mod path;

#[doc(inline)]
pub use geom::{ConvexPolygon, sweep};

#[doc(inline)]
pub use map::{Collidable, Collider, IdSet, Map, SimpleMap};

#[doc(inline)]
pub use partition::{PartitionConfig, PartitionedMap};

#[doc(inline)]
pub use path::Pathfinder;
