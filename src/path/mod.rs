mod node;
mod pathfinder;

pub use pathfinder::Pathfinder;
