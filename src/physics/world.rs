//! Line-of-sight queries using rapier3d
//!
//! Walls become fixed cuboid colliders lying in the `z = 0` plane. Sight rays
//! are cast in that plane, so the third dimension only gives the walls some
//! thickness.

use glam::Vec2;
use rapier3d::prelude::*;

use crate::nav::{TileMap, VisibilityOracle};

/// Half thickness of wall colliders along z
const WALL_HALF_DEPTH: f32 = 1.0;

/// Fraction of the ray length near the end point where hits are ignored, so a
/// collider touching the target does not hide it
const END_TOLERANCE: f32 = 1e-4;

/// Handle to a collider in the physics world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColliderHandle(pub rapier3d::geometry::ColliderHandle);

/// Static collision world used as a visibility oracle
pub struct Physics {
    /// Rigid body set (walls have no bodies, but queries require the set)
    rigid_body_set: RigidBodySet,
    /// Collider set
    collider_set: ColliderSet,
    /// Query pipeline for raycasting
    query_pipeline: QueryPipeline,
    /// Whether colliders changed since the last pipeline update
    dirty: bool,
}

impl Physics {
    /// Create an empty collision world
    pub fn new() -> Self {
        Self {
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            query_pipeline: QueryPipeline::new(),
            dirty: false,
        }
    }

    /// Build colliders for every wall cell of a tile map
    pub fn from_tile_map(map: &TileMap) -> Self {
        let mut physics = Self::new();
        let half = Vec2::splat(map.cell_size * 0.5);
        for cell in map.wall_cells() {
            physics.add_wall(map.cell_to_world(cell), half);
        }
        physics.update_queries();
        log::debug!("Physics world built with {} wall colliders", physics.len());
        physics
    }

    /// Add a fixed box collider centered at `center`
    pub fn add_wall(&mut self, center: Vec2, half_extents: Vec2) -> ColliderHandle {
        let collider = ColliderBuilder::cuboid(half_extents.x, half_extents.y, WALL_HALF_DEPTH)
            .translation(vector![center.x, center.y, 0.0])
            .build();
        self.dirty = true;
        ColliderHandle(self.collider_set.insert(collider))
    }

    /// Rebuild the query acceleration structure after adding colliders
    pub fn update_queries(&mut self) {
        self.query_pipeline.update(&self.collider_set);
        self.dirty = false;
    }

    /// Number of colliders
    pub fn len(&self) -> usize {
        self.collider_set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collider_set.is_empty()
    }

    /// Cast a ray in the plane and return the first hit.
    ///
    /// `direction` need not be normalized; `max_toi` is measured in multiples of it.
    pub fn raycast(&self, origin: Vec2, direction: Vec2, max_toi: f32) -> Option<RaycastHit> {
        if self.dirty {
            log::warn!("Raycast against stale query pipeline; call update_queries() after adding walls");
        }

        let ray = Ray::new(
            point![origin.x, origin.y, 0.0],
            vector![direction.x, direction.y, 0.0],
        );

        self.query_pipeline
            .cast_ray(
                &self.rigid_body_set,
                &self.collider_set,
                &ray,
                max_toi,
                true,
                QueryFilter::default(),
            )
            .map(|(handle, toi)| {
                let point = ray.point_at(toi);
                RaycastHit {
                    collider: ColliderHandle(handle),
                    point: Vec2::new(point.x, point.y),
                    toi,
                }
            })
    }
}

impl Default for Physics {
    fn default() -> Self {
        Self::new()
    }
}

impl VisibilityOracle for Physics {
    fn is_visible(&self, from: Vec2, to: Vec2) -> bool {
        let direction = to - from;
        if direction.length_squared() <= f32::EPSILON {
            return true;
        }
        match self.raycast(from, direction, 1.0) {
            Some(hit) => hit.toi >= 1.0 - END_TOLERANCE,
            None => true,
        }
    }
}

/// Result of a raycast
#[derive(Debug, Clone)]
pub struct RaycastHit {
    /// The collider that was hit
    pub collider: ColliderHandle,
    /// The point of intersection
    pub point: Vec2,
    /// Time of impact in multiples of the ray direction
    pub toi: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wall_blocks_ray() {
        let mut physics = Physics::new();
        physics.add_wall(Vec2::new(2.0, 0.0), Vec2::new(0.5, 0.5));
        physics.update_queries();

        assert!(!physics.is_visible(Vec2::ZERO, Vec2::new(4.0, 0.0)));
        assert!(physics.is_visible(Vec2::ZERO, Vec2::new(0.0, 4.0)));

        let hit = physics.raycast(Vec2::ZERO, Vec2::X, 10.0).unwrap();
        assert!((hit.point.x - 1.5).abs() < 1e-4);
    }

    #[test]
    fn test_hit_at_target_is_visible() {
        let mut physics = Physics::new();
        physics.add_wall(Vec2::new(2.0, 0.0), Vec2::new(0.5, 0.5));
        physics.update_queries();

        // Ray ends exactly on the wall face
        assert!(physics.is_visible(Vec2::ZERO, Vec2::new(1.5, 0.0)));
        assert!(physics.is_visible(Vec2::ZERO, Vec2::new(1.0, 0.0)));
    }

    #[test]
    fn test_from_tile_map_matches_grid_oracle() {
        let map = TileMap::from_rows(&["a#a", "aaa"], 1.0, Vec2::ZERO).unwrap();
        let physics = Physics::from_tile_map(&map);

        assert_eq!(physics.len(), 1);
        let pairs = [
            (Vec2::new(0.5, 0.5), Vec2::new(2.5, 0.5)),
            (Vec2::new(0.5, 1.5), Vec2::new(2.5, 1.5)),
            (Vec2::new(0.5, 0.5), Vec2::new(0.5, 1.5)),
            // Through the wall's corner
            (Vec2::new(0.5, 0.5), Vec2::new(1.5, 1.5)),
        ];
        for (a, b) in pairs {
            assert_eq!(physics.is_visible(a, b), map.is_visible(a, b), "{a} -> {b}");
            assert_eq!(physics.is_visible(b, a), map.is_visible(b, a), "{b} -> {a}");
        }
        assert!(!map.is_visible(Vec2::new(1.5, 1.5), Vec2::new(0.5, 0.5)));
    }

    #[test]
    fn test_empty_world_sees_everything() {
        let physics = Physics::default();
        assert!(physics.is_empty());
        assert!(physics.is_visible(Vec2::ZERO, Vec2::new(100.0, -3.0)));
    }
}
