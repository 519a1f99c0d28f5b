mod collidable;
mod map;
mod simple;

pub use collidable::{Collidable, Collider};
pub use map::{IdSet, Map};
pub use simple::SimpleMap;

pub(crate) use map::{eligible, hits_any};
