//! A* pathfinding over the navigation graph
//!
//! Edge cost and heuristic are both Euclidean distance, so returned paths are
//! optimal. Every call owns its scratch storage, which makes the pathfinder
//! safe to share between agents without synchronization.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};
use std::sync::Arc;

use glam::Vec2;
use rustc_hash::{FxHashMap, FxHashSet};

use super::graph::{NavGraph, NodeId};

/// An ordered list of nodes to visit, excluding the node the agent stands on.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Path {
    nodes: VecDeque<NodeId>,
    length: f32,
}

impl Path {
    #[must_use]
    pub fn new(nodes: impl IntoIterator<Item = NodeId>, length: f32) -> Self {
        Self {
            nodes: nodes.into_iter().collect(),
            length,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Next node to move towards
    #[must_use]
    pub fn head(&self) -> Option<NodeId> {
        self.nodes.front().copied()
    }

    /// Final node of the path
    #[must_use]
    pub fn goal(&self) -> Option<NodeId> {
        self.nodes.back().copied()
    }

    /// Total edge length from the start node to the goal, as computed by the search
    #[must_use]
    pub const fn length(&self) -> f32 {
        self.length
    }

    /// Remove and return the head node
    pub fn pop_front(&mut self) -> Option<NodeId> {
        self.nodes.pop_front()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.length = 0.0;
    }

    pub fn iter(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.iter().copied()
    }

    /// World positions of the remaining nodes, for debug overlays
    #[must_use]
    pub fn waypoints(&self, graph: &NavGraph) -> Vec<Vec2> {
        self.nodes.iter().filter_map(|&id| graph.position(id)).collect()
    }
}

/// Outcome of a path request
#[derive(Debug, Clone, PartialEq)]
pub enum PathResult {
    /// A path exists; it starts at the node after `start` and ends at `goal`
    Found(Path),
    /// No path connects the two nodes, or a handle was invalid
    Unreachable,
    /// `start` and `goal` are the same node
    AlreadyAtGoal,
}

impl PathResult {
    #[must_use]
    pub fn status(&self) -> PathStatus {
        match self {
            Self::Found(path) => PathStatus::Found {
                nodes: path.len(),
                length: path.length(),
            },
            Self::Unreachable => PathStatus::Unreachable,
            Self::AlreadyAtGoal => PathStatus::AlreadyAtGoal,
        }
    }

    /// The path, if one was found
    #[must_use]
    pub fn into_path(self) -> Option<Path> {
        match self {
            Self::Found(path) => Some(path),
            _ => None,
        }
    }
}

/// Summary of a [`PathResult`] without the node list, for events and logs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathStatus {
    Found { nodes: usize, length: f32 },
    Unreachable,
    AlreadyAtGoal,
}

impl PathStatus {
    #[must_use]
    pub const fn is_found(&self) -> bool {
        matches!(self, Self::Found { .. })
    }
}

/// Shared path service over one level's graph.
#[derive(Debug, Clone)]
pub struct Pathfinder {
    graph: Arc<NavGraph>,
}

impl Pathfinder {
    #[must_use]
    pub fn new(graph: Arc<NavGraph>) -> Self {
        Self { graph }
    }

    #[must_use]
    pub fn graph(&self) -> &Arc<NavGraph> {
        &self.graph
    }

    /// Shortest path between two nodes
    #[must_use]
    pub fn generate_path(&self, start: NodeId, goal: NodeId) -> PathResult {
        find_path(&self.graph, start, goal)
    }

    /// Shortest path from `start` to the node nearest a world position
    #[must_use]
    pub fn path_towards(&self, start: NodeId, position: Vec2) -> PathResult {
        match self.graph.nearest_node(position) {
            Some(goal) => find_path(&self.graph, start, goal),
            None => PathResult::Unreachable,
        }
    }
}

/// Entry in the open set
#[derive(Debug, Clone)]
struct OpenEntry {
    node: NodeId,
    f_cost: f32,
    /// Insertion order, used to break f-cost ties deterministically
    seq: u64,
}

impl PartialEq for OpenEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OpenEntry {}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed on both keys for a min-heap: lowest f first, then earliest push
        other
            .f_cost
            .partial_cmp(&self.f_cost)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Run A* between two nodes of a graph
#[must_use]
pub fn find_path(graph: &NavGraph, start: NodeId, goal: NodeId) -> PathResult {
    let (Some(start_pos), Some(goal_pos)) = (graph.position(start), graph.position(goal)) else {
        log::debug!("Path request with invalid handle: {start} -> {goal}");
        return PathResult::Unreachable;
    };

    if start == goal {
        return PathResult::AlreadyAtGoal;
    }

    let heuristic = |pos: Vec2| pos.distance(goal_pos);

    let mut open_set = BinaryHeap::new();
    let mut closed: FxHashSet<NodeId> = FxHashSet::default();
    let mut came_from: FxHashMap<NodeId, NodeId> = FxHashMap::default();
    let mut g_score: FxHashMap<NodeId, f32> = FxHashMap::default();
    let mut seq = 0_u64;

    g_score.insert(start, 0.0);
    open_set.push(OpenEntry {
        node: start,
        f_cost: heuristic(start_pos),
        seq,
    });

    while let Some(current) = open_set.pop() {
        if !closed.insert(current.node) {
            continue;
        }

        let current_g = g_score.get(&current.node).copied().unwrap_or(f32::MAX);

        if current.node == goal {
            let mut nodes = vec![goal];
            let mut cursor = goal;
            while let Some(&prev) = came_from.get(&cursor) {
                if prev == start {
                    break;
                }
                nodes.push(prev);
                cursor = prev;
            }
            nodes.reverse();
            return PathResult::Found(Path::new(nodes, current_g));
        }

        let Some(current_pos) = graph.position(current.node) else {
            continue;
        };

        for &neighbor in graph.neighbors(current.node) {
            if closed.contains(&neighbor) {
                continue;
            }
            let Some(neighbor_pos) = graph.position(neighbor) else {
                continue;
            };

            let tentative_g = current_g + current_pos.distance(neighbor_pos);
            if tentative_g < g_score.get(&neighbor).copied().unwrap_or(f32::MAX) {
                came_from.insert(neighbor, current.node);
                g_score.insert(neighbor, tentative_g);
                seq += 1;
                open_set.push(OpenEntry {
                    node: neighbor,
                    f_cost: tentative_g + heuristic(neighbor_pos),
                    seq,
                });
            }
        }
    }

    PathResult::Unreachable
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nav::graph::{GraphBuilder, OpenSpace, TileOccupancy, VisibilityOracle};
    use glam::IVec2;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    /// Layer with one walkable cell per listed position
    struct Points {
        cells: Vec<IVec2>,
    }

    impl TileOccupancy for Points {
        fn bounds(&self) -> (IVec2, IVec2) {
            (IVec2::ZERO, IVec2::splat(32))
        }

        fn is_occupied(&self, cell: IVec2) -> bool {
            self.cells.contains(&cell)
        }

        fn cell_to_world(&self, cell: IVec2) -> Vec2 {
            cell.as_vec2()
        }

        fn cell_size(&self) -> f32 {
            1.0
        }
    }

    fn build(cells: Vec<IVec2>, radius: f32, oracle: &dyn VisibilityOracle) -> NavGraph {
        let layer = Points { cells };
        GraphBuilder::new(radius).add_layer(None, &layer).build(oracle)
    }

    fn id_at(graph: &NavGraph, x: f32, y: f32) -> NodeId {
        graph.nearest_node(Vec2::new(x, y)).unwrap()
    }

    /// All-pairs shortest distances by exhaustive relaxation
    fn floyd_warshall(graph: &NavGraph) -> Vec<Vec<f32>> {
        let n = graph.len();
        let mut dist = vec![vec![f32::INFINITY; n]; n];
        for node in graph.nodes() {
            let i = node.id().index();
            dist[i][i] = 0.0;
            for &other in node.neighbors() {
                dist[i][other.index()] = node.position().distance(graph.position(other).unwrap());
            }
        }
        for k in 0..n {
            for i in 0..n {
                for j in 0..n {
                    let through = dist[i][k] + dist[k][j];
                    if through < dist[i][j] {
                        dist[i][j] = through;
                    }
                }
            }
        }
        dist
    }

    fn walked_length(graph: &NavGraph, start: NodeId, path: &Path) -> f32 {
        let mut total = 0.0;
        let mut prev = graph.position(start).unwrap();
        for id in path.iter() {
            let pos = graph.position(id).unwrap();
            total += prev.distance(pos);
            prev = pos;
        }
        total
    }

    #[test]
    fn test_straight_line_path() {
        let graph = build((0..5).map(|x| IVec2::new(x, 0)).collect(), 1.0, &OpenSpace);
        let start = id_at(&graph, 0.0, 0.0);
        let goal = id_at(&graph, 4.0, 0.0);

        let path = find_path(&graph, start, goal).into_path().unwrap();

        assert_eq!(path.len(), 4);
        assert_eq!(path.goal(), Some(goal));
        assert_ne!(path.head(), Some(start));
        assert!((path.length() - 4.0).abs() < 1e-5);
    }

    #[test]
    fn test_path_goes_around_wall() {
        // 5x5 block with a wall column at x=2 except the top row
        let mut cells = Vec::new();
        for y in 0..5 {
            for x in 0..5 {
                if x != 2 || y == 4 {
                    cells.push(IVec2::new(x, y));
                }
            }
        }
        let graph = build(cells, 1.0, &OpenSpace);
        let start = id_at(&graph, 0.0, 0.0);
        let goal = id_at(&graph, 4.0, 0.0);

        let path = find_path(&graph, start, goal).into_path().unwrap();
        assert!(path.waypoints(&graph).iter().any(|p| p.y >= 4.0));
        assert!((path.length() - 12.0).abs() < 1e-4);
    }

    #[test]
    fn test_same_node_is_already_at_goal() {
        let graph = build(vec![IVec2::ZERO, IVec2::X], 1.0, &OpenSpace);
        let a = id_at(&graph, 0.0, 0.0);

        let result = find_path(&graph, a, a);
        assert_eq!(result, PathResult::AlreadyAtGoal);
        assert_ne!(result, PathResult::Unreachable);
    }

    #[test]
    fn test_disconnected_components_unreachable() {
        let graph = build(
            vec![IVec2::new(0, 0), IVec2::new(1, 0), IVec2::new(5, 0), IVec2::new(6, 0)],
            1.0,
            &OpenSpace,
        );
        let a = id_at(&graph, 0.0, 0.0);
        let b = id_at(&graph, 6.0, 0.0);

        for _ in 0..3 {
            assert_eq!(find_path(&graph, a, b), PathResult::Unreachable);
        }
    }

    #[test]
    fn test_isolated_node_unreachable() {
        let graph = build(vec![IVec2::new(0, 0), IVec2::new(9, 9)], 1.0, &OpenSpace);
        let a = id_at(&graph, 0.0, 0.0);
        let lonely = id_at(&graph, 9.0, 9.0);

        assert!(graph.neighbors(lonely).is_empty());
        assert_eq!(find_path(&graph, a, lonely), PathResult::Unreachable);
        assert_eq!(find_path(&graph, lonely, a), PathResult::Unreachable);
    }

    #[test]
    fn test_foreign_handle_unreachable() {
        let first = build(vec![IVec2::ZERO, IVec2::X], 1.0, &OpenSpace);
        let second = build(vec![IVec2::ZERO, IVec2::X], 1.0, &OpenSpace);
        let foreign = first.node_ids()[0];
        let local = second.node_ids()[1];

        assert_eq!(find_path(&second, foreign, local), PathResult::Unreachable);
        assert_eq!(find_path(&second, local, foreign), PathResult::Unreachable);
    }

    #[test]
    fn test_equal_cost_paths_are_deterministic() {
        // Square: two equal routes from corner to corner
        let graph = build(
            vec![IVec2::new(0, 0), IVec2::new(1, 0), IVec2::new(0, 1), IVec2::new(1, 1)],
            1.0,
            &OpenSpace,
        );
        let start = id_at(&graph, 0.0, 0.0);
        let goal = id_at(&graph, 1.0, 1.0);

        let first = find_path(&graph, start, goal);
        for _ in 0..10 {
            assert_eq!(find_path(&graph, start, goal), first);
        }
    }

    #[test]
    fn test_matches_exhaustive_search_on_random_graphs() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        for _ in 0..40 {
            let count = rng.gen_range(2..=20);
            let mut cells = Vec::new();
            while cells.len() < count {
                let cell = IVec2::new(rng.gen_range(0..8), rng.gen_range(0..8));
                if !cells.contains(&cell) {
                    cells.push(cell);
                }
            }
            let radius = rng.gen_range(1.0..4.0);
            // Deterministic pseudo-occluder: blocks segments crossing x=3.5 at low y
            let oracle = |a: Vec2, b: Vec2| {
                let crosses = a.x.min(b.x) < 3.5 && a.x.max(b.x) > 3.5;
                !(crosses && a.y.min(b.y) < 3.0)
            };
            let graph = build(cells, radius, &oracle);
            let dist = floyd_warshall(&graph);

            for &start in graph.node_ids() {
                for &goal in graph.node_ids() {
                    let expected = dist[start.index()][goal.index()];
                    match find_path(&graph, start, goal) {
                        PathResult::AlreadyAtGoal => assert_eq!(start, goal),
                        PathResult::Unreachable => assert!(expected.is_infinite()),
                        PathResult::Found(path) => {
                            assert!((path.length() - expected).abs() < 1e-3);
                            assert!((walked_length(&graph, start, &path) - expected).abs() < 1e-3);
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_pathfinder_shared_between_callers() {
        let graph = Arc::new(build((0..4).map(|x| IVec2::new(x, 0)).collect(), 1.0, &OpenSpace));
        let pathfinder = Arc::new(Pathfinder::new(Arc::clone(&graph)));
        let start = id_at(&graph, 0.0, 0.0);

        let a = Arc::clone(&pathfinder);
        let b = Arc::clone(&pathfinder);
        let first = a.path_towards(start, Vec2::new(3.2, 0.0));
        let second = b.generate_path(start, id_at(&graph, 3.0, 0.0));

        assert_eq!(first, second);
        assert!(matches!(first.status(), PathStatus::Found { nodes: 3, .. }));
    }
}
