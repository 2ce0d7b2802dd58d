//! Navigation graph construction
//!
//! Every walkable cell (or sub-cell) of every zone layer becomes a node. Two
//! nodes are linked when they are within the connection radius of each other
//! and the visibility oracle reports the segment between them as clear. The
//! graph is built once per level and is read-only afterwards, so it can be
//! shared between agents behind an `Arc` without locking.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use glam::{IVec2, Vec2};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Global counter for stamping graphs, so node handles from one level are
/// rejected by another.
static NEXT_GRAPH_ID: AtomicU64 = AtomicU64::new(1);

fn next_graph_id() -> u64 {
    NEXT_GRAPH_ID.fetch_add(1, Ordering::Relaxed)
}

// ============================================================================
// Identifiers
// ============================================================================

/// Handle to a node inside one specific [`NavGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    graph: u64,
    index: u32,
}

impl NodeId {
    /// Dense index of the node within its graph.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.index)
    }
}

/// A logical area of the level, such as a room. Named by the tile letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ZoneId(pub char);

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "zone '{}'", self.0)
    }
}

// ============================================================================
// External collaborators
// ============================================================================

/// Source of walkable cells for one zone.
pub trait TileOccupancy {
    /// Cell bounds as `(min inclusive, max exclusive)`.
    fn bounds(&self) -> (IVec2, IVec2);

    /// Whether the cell can hold a node.
    fn is_occupied(&self, cell: IVec2) -> bool;

    /// World position of the center of a cell.
    fn cell_to_world(&self, cell: IVec2) -> Vec2;

    /// Edge length of a cell in world units.
    fn cell_size(&self) -> f32;
}

/// Reports whether the straight segment between two points is unobstructed.
pub trait VisibilityOracle {
    fn is_visible(&self, from: Vec2, to: Vec2) -> bool;
}

impl<F> VisibilityOracle for F
where
    F: Fn(Vec2, Vec2) -> bool,
{
    fn is_visible(&self, from: Vec2, to: Vec2) -> bool {
        self(from, to)
    }
}

/// Oracle for levels with no occluders at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenSpace;

impl VisibilityOracle for OpenSpace {
    fn is_visible(&self, _from: Vec2, _to: Vec2) -> bool {
        true
    }
}

// ============================================================================
// Graph
// ============================================================================

/// A navigable point with its undirected connections.
#[derive(Debug, Clone)]
pub struct Node {
    id: NodeId,
    position: Vec2,
    neighbors: SmallVec<[NodeId; 8]>,
    zone: Option<ZoneId>,
}

impl Node {
    #[must_use]
    pub const fn id(&self) -> NodeId {
        self.id
    }

    #[must_use]
    pub const fn position(&self) -> Vec2 {
        self.position
    }

    #[must_use]
    pub fn neighbors(&self) -> &[NodeId] {
        &self.neighbors
    }

    #[must_use]
    pub const fn zone(&self) -> Option<ZoneId> {
        self.zone
    }
}

/// Immutable navigation graph for one level.
#[derive(Debug, Clone)]
pub struct NavGraph {
    id: u64,
    nodes: Vec<Node>,
    zones: FxHashMap<ZoneId, Vec<NodeId>>,
    /// Zone keys in sorted order, for deterministic iteration
    zone_order: Vec<ZoneId>,
    all_ids: Vec<NodeId>,
    edge_count: usize,
    connection_radius: f32,
}

impl NavGraph {
    /// A graph with no nodes. Every path request against it fails.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            id: next_graph_id(),
            nodes: Vec::new(),
            zones: FxHashMap::default(),
            zone_order: Vec::new(),
            all_ids: Vec::new(),
            edge_count: 0,
            connection_radius: 0.0,
        }
    }

    /// Number of nodes
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of undirected edges
    #[must_use]
    pub const fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Radius the graph was built with
    #[must_use]
    pub const fn connection_radius(&self) -> f32 {
        self.connection_radius
    }

    /// Whether the handle belongs to this graph and is in range.
    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        id.graph == self.id && id.index() < self.nodes.len()
    }

    /// Look up a node. Handles from other graphs resolve to `None`.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        if id.graph != self.id {
            return None;
        }
        self.nodes.get(id.index())
    }

    #[must_use]
    pub fn position(&self, id: NodeId) -> Option<Vec2> {
        self.node(id).map(Node::position)
    }

    /// Neighbors of a node; empty for unknown handles.
    #[must_use]
    pub fn neighbors(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(Node::neighbors).unwrap_or_default()
    }

    #[must_use]
    pub fn zone_of(&self, id: NodeId) -> Option<ZoneId> {
        self.node(id).and_then(Node::zone)
    }

    /// Iterate over all nodes in id order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    /// All node handles in id order
    #[must_use]
    pub fn node_ids(&self) -> &[NodeId] {
        &self.all_ids
    }

    /// Zones present in the graph, sorted
    #[must_use]
    pub fn zones(&self) -> &[ZoneId] {
        &self.zone_order
    }

    /// Nodes tagged with the given zone, in id order.
    #[must_use]
    pub fn zone_nodes(&self, zone: ZoneId) -> &[NodeId] {
        self.zones.get(&zone).map(Vec::as_slice).unwrap_or_default()
    }

    /// Each undirected edge once, as `(lower id, higher id)`.
    pub fn edges(&self) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
        self.nodes.iter().flat_map(|node| {
            node.neighbors
                .iter()
                .filter(move |other| other.index > node.id.index)
                .map(move |&other| (node.id, other))
        })
    }

    /// Node closest to a world position. Ties go to the lower id.
    #[must_use]
    pub fn nearest_node(&self, position: Vec2) -> Option<NodeId> {
        nearest(self.nodes.iter(), position)
    }

    /// Node of the given zone closest to a world position.
    #[must_use]
    pub fn nearest_node_in_zone(&self, position: Vec2, zone: ZoneId) -> Option<NodeId> {
        nearest(
            self.zone_nodes(zone).iter().filter_map(|&id| self.node(id)),
            position,
        )
    }
}

fn nearest<'a>(nodes: impl Iterator<Item = &'a Node>, position: Vec2) -> Option<NodeId> {
    let mut best: Option<(NodeId, f32)> = None;
    for node in nodes {
        let distance = node.position.distance_squared(position);
        if best.is_none_or(|(_, d)| distance < d) {
            best = Some((node.id, distance));
        }
    }
    best.map(|(id, _)| id)
}

// ============================================================================
// Builder
// ============================================================================

/// Builds a [`NavGraph`] from zone layers and a visibility oracle.
///
/// Construction compares every pair of nodes, which is quadratic in the node
/// count. That cost is paid once per level load.
pub struct GraphBuilder<'a> {
    connection_radius: f32,
    subdivisions: u32,
    layers: Vec<(Option<ZoneId>, &'a dyn TileOccupancy)>,
}

impl<'a> GraphBuilder<'a> {
    /// Create a builder that links nodes up to `connection_radius` apart.
    #[must_use]
    pub fn new(connection_radius: f32) -> Self {
        Self {
            connection_radius,
            subdivisions: 1,
            layers: Vec::new(),
        }
    }

    /// Place a `k`×`k` grid of nodes in every occupied cell. Zero is treated as one.
    #[must_use]
    pub fn with_subdivisions(mut self, subdivisions: u32) -> Self {
        self.subdivisions = subdivisions.max(1);
        self
    }

    /// Add the walkable cells of one zone. `None` leaves the nodes untagged.
    #[must_use]
    pub fn add_layer(mut self, zone: Option<ZoneId>, layer: &'a dyn TileOccupancy) -> Self {
        self.layers.push((zone, layer));
        self
    }

    /// Place nodes and connect them.
    #[must_use]
    pub fn build(self, oracle: &dyn VisibilityOracle) -> NavGraph {
        let mut graph = NavGraph::empty();
        graph.connection_radius = self.connection_radius;

        for &(zone, layer) in &self.layers {
            for position in sample_layer(layer, self.subdivisions) {
                let id = NodeId {
                    graph: graph.id,
                    index: graph.nodes.len() as u32,
                };
                graph.nodes.push(Node {
                    id,
                    position,
                    neighbors: SmallVec::new(),
                    zone,
                });
                graph.all_ids.push(id);
                if let Some(zone) = zone {
                    graph.zones.entry(zone).or_default().push(id);
                }
            }
        }

        if graph.nodes.is_empty() {
            log::warn!(
                "Navigation graph has no nodes ({} layers supplied); agents will not find paths",
                self.layers.len()
            );
            return graph;
        }

        graph.zone_order = graph.zones.keys().copied().collect();
        graph.zone_order.sort_unstable();

        // Pairs are visited once with i < j, so no self-edges or duplicates
        let radius_sq = self.connection_radius * self.connection_radius;
        let count = graph.nodes.len();
        for i in 0..count {
            for j in (i + 1)..count {
                let a = graph.nodes[i].position;
                let b = graph.nodes[j].position;
                if self.connection_radius < 0.0 || a.distance_squared(b) > radius_sq {
                    continue;
                }
                if !oracle.is_visible(a, b) {
                    continue;
                }
                let (id_a, id_b) = (graph.nodes[i].id, graph.nodes[j].id);
                graph.nodes[i].neighbors.push(id_b);
                graph.nodes[j].neighbors.push(id_a);
                graph.edge_count += 1;
            }
        }

        let isolated = graph.nodes.iter().filter(|n| n.neighbors.is_empty()).count();
        log::info!(
            "Built navigation graph: {} nodes, {} edges, {} zones, {} isolated",
            graph.nodes.len(),
            graph.edge_count,
            graph.zone_order.len(),
            isolated
        );

        graph
    }
}

/// World positions of every node a layer contributes, row by row.
fn sample_layer(layer: &dyn TileOccupancy, subdivisions: u32) -> Vec<Vec2> {
    let (min, max) = layer.bounds();
    let cell_size = layer.cell_size();
    let k = subdivisions.max(1);
    let mut positions = Vec::new();

    for y in min.y..max.y {
        for x in min.x..max.x {
            let cell = IVec2::new(x, y);
            if !layer.is_occupied(cell) {
                continue;
            }
            let center = layer.cell_to_world(cell);
            for sy in 0..k {
                for sx in 0..k {
                    let offset = Vec2::new(
                        (sx as f32 + 0.5) / k as f32 - 0.5,
                        (sy as f32 + 0.5) / k as f32 - 0.5,
                    ) * cell_size;
                    positions.push(center + offset);
                }
            }
        }
    }

    positions
}
