//! Tile-based level layout
//!
//! A level is a rectangle of tiles described by ASCII rows:
//!
//! - `#` wall: not walkable, blocks sight
//! - ` ` void: not walkable, does not block sight
//! - `.` walkable floor outside any zone
//! - a letter: walkable floor of the zone named by that letter
//!
//! Row `y` of the text is cell row `y`, so world `y` grows with the row index.

use std::fmt;

use glam::{IVec2, Vec2};

use super::graph::{GraphBuilder, NavGraph, TileOccupancy, VisibilityOracle, ZoneId};

/// Contents of one cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tile {
    Void,
    Wall,
    Floor,
    Zone(ZoneId),
}

impl Tile {
    fn from_char(c: char) -> Option<Self> {
        match c {
            ' ' => Some(Self::Void),
            '#' => Some(Self::Wall),
            '.' => Some(Self::Floor),
            c if c.is_ascii_alphabetic() => Some(Self::Zone(ZoneId(c))),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_walkable(self) -> bool {
        matches!(self, Self::Floor | Self::Zone(_))
    }
}

/// Errors that can occur while parsing a level
#[derive(Debug, Clone, PartialEq)]
pub enum LevelError {
    /// No rows, or only empty rows
    Empty,
    /// A character with no tile meaning
    UnknownTile { tile: char, x: usize, y: usize },
    /// Cell size must be a positive finite number
    InvalidCellSize(f32),
}

impl fmt::Display for LevelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "Level has no tiles"),
            Self::UnknownTile { tile, x, y } => {
                write!(f, "Unknown tile '{tile}' at column {x}, row {y}")
            }
            Self::InvalidCellSize(size) => write!(f, "Invalid cell size: {size}"),
        }
    }
}

impl std::error::Error for LevelError {}

/// A 2D tile map
#[derive(Debug, Clone)]
pub struct TileMap {
    /// Width in cells
    pub width: usize,
    /// Height in cells
    pub height: usize,
    /// Cell size in world units
    pub cell_size: f32,
    /// World position of the corner of cell (0, 0)
    pub origin: Vec2,
    tiles: Vec<Tile>,
}

impl TileMap {
    /// Parse ASCII rows. Short rows are padded with void.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty layout, an unknown character or a bad cell size
    pub fn from_rows<S: AsRef<str>>(
        rows: &[S],
        cell_size: f32,
        origin: Vec2,
    ) -> Result<Self, LevelError> {
        if !cell_size.is_finite() || cell_size <= 0.0 {
            return Err(LevelError::InvalidCellSize(cell_size));
        }

        let width = rows
            .iter()
            .map(|row| row.as_ref().chars().count())
            .max()
            .unwrap_or(0);
        if width == 0 {
            return Err(LevelError::Empty);
        }

        let height = rows.len();
        let mut tiles = vec![Tile::Void; width * height];
        for (y, row) in rows.iter().enumerate() {
            for (x, c) in row.as_ref().chars().enumerate() {
                let tile = Tile::from_char(c).ok_or(LevelError::UnknownTile { tile: c, x, y })?;
                tiles[y * width + x] = tile;
            }
        }

        Ok(Self {
            width,
            height,
            cell_size,
            origin,
            tiles,
        })
    }

    /// Tile at a cell; out-of-bounds cells are void
    #[must_use]
    pub fn tile(&self, cell: IVec2) -> Tile {
        if cell.x < 0 || cell.y < 0 {
            return Tile::Void;
        }
        let (x, y) = (cell.x as usize, cell.y as usize);
        if x >= self.width || y >= self.height {
            return Tile::Void;
        }
        self.tiles[y * self.width + x]
    }

    #[must_use]
    pub fn is_wall(&self, cell: IVec2) -> bool {
        self.tile(cell) == Tile::Wall
    }

    #[must_use]
    pub fn is_walkable(&self, cell: IVec2) -> bool {
        self.tile(cell).is_walkable()
    }

    /// Convert world position to grid coordinates
    #[must_use]
    pub fn world_to_cell(&self, pos: Vec2) -> IVec2 {
        let local = (pos - self.origin) / self.cell_size;
        IVec2::new(local.x.floor() as i32, local.y.floor() as i32)
    }

    /// Convert grid coordinates to world position (center of cell)
    #[must_use]
    pub fn cell_to_world(&self, cell: IVec2) -> Vec2 {
        self.origin + (cell.as_vec2() + Vec2::splat(0.5)) * self.cell_size
    }

    /// Zones present in the map, sorted
    #[must_use]
    pub fn zones(&self) -> Vec<ZoneId> {
        let mut zones: Vec<ZoneId> = self
            .tiles
            .iter()
            .filter_map(|tile| match tile {
                Tile::Zone(zone) => Some(*zone),
                _ => None,
            })
            .collect();
        zones.sort_unstable();
        zones.dedup();
        zones
    }

    /// Walkable cells of one zone; `None` selects untagged floor.
    #[must_use]
    pub fn layer(&self, zone: Option<ZoneId>) -> ZoneLayer<'_> {
        ZoneLayer { map: self, zone }
    }

    /// One layer per zone, plus the untagged floor when there is any.
    #[must_use]
    pub fn layers(&self) -> Vec<(Option<ZoneId>, ZoneLayer<'_>)> {
        let mut layers: Vec<_> = self
            .zones()
            .into_iter()
            .map(|zone| (Some(zone), self.layer(Some(zone))))
            .collect();
        if self.tiles.contains(&Tile::Floor) {
            layers.push((None, self.layer(None)));
        }
        layers
    }

    /// Build the navigation graph over every layer of this map
    #[must_use]
    pub fn build_graph(
        &self,
        connection_radius: f32,
        subdivisions: u32,
        oracle: &dyn VisibilityOracle,
    ) -> NavGraph {
        let layers = self.layers();
        let mut builder = GraphBuilder::new(connection_radius).with_subdivisions(subdivisions);
        for (zone, layer) in &layers {
            builder = builder.add_layer(*zone, layer);
        }
        builder.build(oracle)
    }

    /// Iterate over all wall cells
    pub fn wall_cells(&self) -> impl Iterator<Item = IVec2> + '_ {
        self.tiles.iter().enumerate().filter_map(|(i, tile)| {
            (*tile == Tile::Wall)
                .then(|| IVec2::new((i % self.width) as i32, (i / self.width) as i32))
        })
    }

    /// Whether a wall cell lies strictly between two points.
    ///
    /// Walks the cells the segment passes through. The cells holding the two
    /// end points are never considered blocking. A segment through a cell
    /// corner touches both cells beside it, so the answer is the same in
    /// either direction. Non-finite points are always blocked.
    #[must_use]
    pub fn segment_blocked(&self, from: Vec2, to: Vec2) -> bool {
        let p = (from - self.origin) / self.cell_size;
        let q = (to - self.origin) / self.cell_size;
        if !p.is_finite() || !q.is_finite() || !(q - p).is_finite() {
            return true;
        }

        // Cells outside the map are void, so only the part near it matters
        let size = Vec2::new(self.width as f32, self.height as f32);
        let Some((p, q)) = clip_segment(p, q, Vec2::splat(-CLIP_MARGIN), size + CLIP_MARGIN)
        else {
            return false;
        };

        let start = p.floor().as_ivec2();
        let end = q.floor().as_ivec2();
        if start == end {
            return false;
        }

        let d = q - p;
        let step = IVec2::new(d.x.signum() as i32, d.y.signum() as i32);
        let t_delta = Vec2::new(
            if d.x != 0.0 { 1.0 / d.x.abs() } else { f32::INFINITY },
            if d.y != 0.0 { 1.0 / d.y.abs() } else { f32::INFINITY },
        );
        let boundary = |cell: i32, dir: i32| if dir > 0 { (cell + 1) as f32 } else { cell as f32 };
        let mut t_max = Vec2::new(
            if d.x != 0.0 { (boundary(start.x, step.x) - p.x) / d.x } else { f32::INFINITY },
            if d.y != 0.0 { (boundary(start.y, step.y) - p.y) / d.y } else { f32::INFINITY },
        );

        let mut cell = start;
        let mut remaining = (end - start).abs().element_sum();
        while remaining > 0 {
            let gap = t_max.x - t_max.y;
            if gap.abs() <= CORNER_EPSILON {
                let beside = [cell + IVec2::new(step.x, 0), cell + IVec2::new(0, step.y)];
                if beside.iter().any(|&c| c != end && self.is_wall(c)) {
                    return true;
                }
                cell += step;
                t_max += t_delta;
                remaining -= 2;
            } else if gap < 0.0 {
                cell.x += step.x;
                t_max.x += t_delta.x;
                remaining -= 1;
            } else {
                cell.y += step.y;
                t_max.y += t_delta.y;
                remaining -= 1;
            }
            if cell == end {
                return false;
            }
            if self.is_wall(cell) {
                return true;
            }
        }

        false
    }
}

/// Cells of void kept around the map when clipping sight lines
const CLIP_MARGIN: f32 = 1.0;

/// Crossing-time difference under which a sight line passes through a corner
const CORNER_EPSILON: f32 = 1e-5;

/// Clip segment `p`-`q` to the box `min`..`max`. End points inside the box are kept exactly.
fn clip_segment(p: Vec2, q: Vec2, min: Vec2, max: Vec2) -> Option<(Vec2, Vec2)> {
    let d = q - p;
    let (mut t0, mut t1) = (0.0_f32, 1.0_f32);
    for (delta, lo, hi) in [(d.x, min.x - p.x, max.x - p.x), (d.y, min.y - p.y, max.y - p.y)] {
        if delta == 0.0 {
            if lo > 0.0 || hi < 0.0 {
                return None;
            }
            continue;
        }
        let (a, b) = (lo / delta, hi / delta);
        t0 = t0.max(a.min(b));
        t1 = t1.min(a.max(b));
        if t0 > t1 {
            return None;
        }
    }
    let clipped_p = if t0 > 0.0 { p + d * t0 } else { p };
    let clipped_q = if t1 < 1.0 { p + d * t1 } else { q };
    Some((clipped_p, clipped_q))
}

impl VisibilityOracle for TileMap {
    fn is_visible(&self, from: Vec2, to: Vec2) -> bool {
        !self.segment_blocked(from, to)
    }
}

/// View of the walkable cells belonging to one zone of a [`TileMap`]
#[derive(Debug, Clone, Copy)]
pub struct ZoneLayer<'a> {
    map: &'a TileMap,
    zone: Option<ZoneId>,
}

impl TileOccupancy for ZoneLayer<'_> {
    fn bounds(&self) -> (IVec2, IVec2) {
        (
            IVec2::ZERO,
            IVec2::new(self.map.width as i32, self.map.height as i32),
        )
    }

    fn is_occupied(&self, cell: IVec2) -> bool {
        match (self.map.tile(cell), self.zone) {
            (Tile::Zone(zone), Some(wanted)) => zone == wanted,
            (Tile::Floor, None) => true,
            _ => false,
        }
    }

    fn cell_to_world(&self, cell: IVec2) -> Vec2 {
        self.map.cell_to_world(cell)
    }

    fn cell_size(&self) -> f32 {
        self.map.cell_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(rows: &[&str]) -> TileMap {
        TileMap::from_rows(rows, 1.0, Vec2::ZERO).unwrap()
    }

    #[test]
    fn test_parse_tiles() {
        let map = map(&["#####", "#aa.b", "#"]);

        assert_eq!(map.width, 5);
        assert_eq!(map.height, 3);
        assert_eq!(map.tile(IVec2::new(1, 1)), Tile::Zone(ZoneId('a')));
        assert_eq!(map.tile(IVec2::new(3, 1)), Tile::Floor);
        assert_eq!(map.tile(IVec2::new(4, 2)), Tile::Void);
        assert_eq!(map.tile(IVec2::new(-1, 0)), Tile::Void);
        assert!(map.is_wall(IVec2::new(0, 2)));
        assert_eq!(map.zones(), vec![ZoneId('a'), ZoneId('b')]);
        assert_eq!(map.wall_cells().count(), 7);
    }

    #[test]
    fn test_parse_errors() {
        let empty: [&str; 0] = [];
        assert_eq!(
            TileMap::from_rows(&empty, 1.0, Vec2::ZERO).unwrap_err(),
            LevelError::Empty
        );
        assert_eq!(
            TileMap::from_rows(&["a?"], 1.0, Vec2::ZERO).unwrap_err(),
            LevelError::UnknownTile { tile: '?', x: 1, y: 0 }
        );
        assert!(matches!(
            TileMap::from_rows(&["a"], 0.0, Vec2::ZERO),
            Err(LevelError::InvalidCellSize(_))
        ));
    }

    #[test]
    fn test_cell_world_conversion() {
        let map = TileMap::from_rows(&["aaa"], 2.0, Vec2::new(10.0, 0.0)).unwrap();

        assert_eq!(map.cell_to_world(IVec2::new(1, 0)), Vec2::new(13.0, 1.0));
        assert_eq!(map.world_to_cell(Vec2::new(13.9, 1.9)), IVec2::new(1, 0));
        assert_eq!(map.world_to_cell(Vec2::new(9.0, 0.0)), IVec2::new(-1, 0));
    }

    #[test]
    fn test_layers_split_by_zone() {
        let map = map(&["aa#bb", "..#.."]);
        let layers = map.layers();

        assert_eq!(layers.len(), 3);
        let (zone, a) = layers[0];
        assert_eq!(zone, Some(ZoneId('a')));
        assert!(a.is_occupied(IVec2::new(1, 0)));
        assert!(!a.is_occupied(IVec2::new(3, 0)));
        assert!(!a.is_occupied(IVec2::new(0, 1)));

        let (zone, floor) = layers[2];
        assert_eq!(zone, None);
        assert!(floor.is_occupied(IVec2::new(0, 1)));
        assert!(!floor.is_occupied(IVec2::new(0, 0)));
    }

    #[test]
    fn test_wall_blocks_sight() {
        let map = map(&["a#a", "aaa"]);

        assert!(!map.is_visible(Vec2::new(0.5, 0.5), Vec2::new(2.5, 0.5)));
        assert!(map.is_visible(Vec2::new(0.5, 1.5), Vec2::new(2.5, 1.5)));
        assert!(map.is_visible(Vec2::new(0.5, 0.5), Vec2::new(0.5, 1.5)));
    }

    #[test]
    fn test_void_does_not_block_sight() {
        let map = map(&["a b"]);
        assert!(map.is_visible(Vec2::new(0.5, 0.5), Vec2::new(2.5, 0.5)));
    }

    #[test]
    fn test_wall_at_target_does_not_block() {
        let map = map(&["aa#"]);
        assert!(map.is_visible(Vec2::new(0.5, 0.5), Vec2::new(2.5, 0.5)));
        assert!(!map.is_visible(Vec2::new(0.5, 0.5), Vec2::new(3.5, 0.5)));
    }

    #[test]
    fn test_diagonal_sight() {
        let map = map(&["a#", "#a"]);
        // Passing exactly through the shared corner touches a wall cell
        assert!(!map.is_visible(Vec2::new(0.5, 0.5), Vec2::new(1.5, 1.5)));

        let open = self::map(&["aa", "aa"]);
        assert!(open.is_visible(Vec2::new(0.5, 0.5), Vec2::new(1.5, 1.5)));
    }

    #[test]
    fn test_corner_sight_is_symmetric() {
        let map = map(&["a#", "aa"]);
        let (a, b) = (Vec2::new(0.5, 0.5), Vec2::new(1.5, 1.5));

        assert!(!map.is_visible(a, b));
        assert!(!map.is_visible(b, a));

        let graph = map.build_graph(1.5, 1, &map);
        let from = graph.nearest_node(a).unwrap();
        let to = graph.nearest_node(b).unwrap();
        assert!(!graph.neighbors(from).contains(&to));
    }

    #[test]
    fn test_far_points_are_clipped() {
        let map = map(&["a#a"]);
        let inside = Vec2::new(0.5, 0.5);

        assert!(map.segment_blocked(inside, Vec2::new(1.0e30, 0.5)));
        assert!(!map.segment_blocked(inside, Vec2::new(-1.0e30, 0.5)));
        assert!(!map.segment_blocked(Vec2::new(-1.0e30, 9.0), Vec2::new(1.0e30, 9.0)));
        assert!(map.segment_blocked(inside, Vec2::new(f32::NAN, 0.5)));
        assert!(map.segment_blocked(Vec2::splat(-f32::MAX), Vec2::splat(f32::MAX)));
    }

    #[test]
    fn test_random_levels_have_symmetric_sight_and_visible_edges() {
        use rand::{Rng, SeedableRng};
        use rand_chacha::ChaCha8Rng;

        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..25 {
            let rows: Vec<String> = (0..5)
                .map(|_| {
                    (0..7)
                        .map(|_| match rng.gen_range(0..10) {
                            0..=2 => '#',
                            3 => ' ',
                            4 => '.',
                            5..=7 => 'a',
                            _ => 'b',
                        })
                        .collect()
                })
                .collect();
            let map = TileMap::from_rows(&rows, 1.0, Vec2::ZERO).unwrap();

            // Centres and corners line up on exact diagonals
            let points: Vec<Vec2> = (0..=14)
                .flat_map(|x| (0..=10).map(move |y| Vec2::new(x as f32, y as f32) * 0.5))
                .collect();
            for &a in &points {
                for &b in &points {
                    assert_eq!(map.is_visible(a, b), map.is_visible(b, a), "{rows:?}: {a} <-> {b}");
                }
            }

            for subdivisions in [1, 2] {
                let graph = map.build_graph(2.5, subdivisions, &map);
                for &id in graph.node_ids() {
                    let a = graph.position(id).unwrap();
                    for &other in graph.neighbors(id) {
                        let b = graph.position(other).unwrap();
                        assert!(map.is_visible(a, b), "{rows:?}: edge {a} -> {b}");
                        assert!(map.is_visible(b, a), "{rows:?}: edge {b} -> {a}");
                    }
                }
            }
        }
    }
}
