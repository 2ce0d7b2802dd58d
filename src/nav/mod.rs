//! Navigation module
//!
//! Level layout, navigation graph construction and A* pathfinding.

mod graph;
mod pathfinding;
mod tilemap;

pub use graph::{
    GraphBuilder, NavGraph, Node, NodeId, OpenSpace, TileOccupancy, VisibilityOracle, ZoneId,
};
pub use pathfinding::{Path, PathResult, PathStatus, Pathfinder, find_path};
pub use tilemap::{LevelError, Tile, TileMap, ZoneLayer};
