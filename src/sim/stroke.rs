//! Strokes: drawn polylines realized as physics bodies
//!
//! A stroke starts as a draft while the player drags, then either becomes a
//! simulated body, gets split into a rope of links, or is discarded.

use glam::{IVec2, Vec2};
use rapier2d::prelude::RigidBodyHandle;
use serde::{Deserialize, Serialize};

use crate::consts::{MIN_POINT_SPACING, ROPE_TOLERANCE, SIMPLIFY_THRESHOLD};
use crate::error::Error;
use crate::sim::path::Path;
use crate::sim::physics::{BodyKind, PhysicsWorld};

/// Stable stroke identity; assigned sequentially so replays regenerate the
/// same ids
pub type StrokeId = u32;

/// Stroke attribute bitmask
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes(pub u32);

impl Attributes {
    /// Immovable, level-authored scenery
    pub const GROUND: Attributes = Attributes(1 << 0);
    /// Body starts asleep until something wakes it
    pub const SLEEPING: Attributes = Attributes(1 << 1);
    /// Visual only, never collides
    pub const DECOR: Attributes = Attributes(1 << 2);
    /// Tapping it toggles its scripted behaviour
    pub const INTERACTIVE: Attributes = Attributes(1 << 3);
    /// Convert to a chain of jointed links at finalize time
    pub const ROPE: Attributes = Attributes(1 << 4);

    pub fn contains(self, other: Attributes) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn with(self, other: Attributes) -> Attributes {
        Attributes(self.0 | other.0)
    }

    pub fn without(self, other: Attributes) -> Attributes {
        Attributes(self.0 & !other.0)
    }
}

/// Stroke lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrokeState {
    /// Being drawn; invisible to the physics world
    Drafting,
    /// Simulated (or decor) body in the world
    Active,
    /// Erased; kept only as a tombstone until the scene drops it
    Deleted,
}

/// A drawn polyline plus the body realizing it
#[derive(Debug)]
pub struct Stroke {
    id: StrokeId,
    path: Path,
    color: usize,
    attributes: Attributes,
    state: StrokeState,
    body: Option<RigidBodyHandle>,
}

impl Stroke {
    pub fn new(id: StrokeId, path: Path, color: usize, attributes: Attributes) -> Self {
        Self {
            id,
            path,
            color,
            attributes,
            state: StrokeState::Drafting,
            body: None,
        }
    }

    pub fn id(&self) -> StrokeId {
        self.id
    }

    pub fn color(&self) -> usize {
        self.color
    }

    pub fn attributes(&self) -> Attributes {
        self.attributes
    }

    pub fn state(&self) -> StrokeState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == StrokeState::Active
    }

    pub fn is_drafting(&self) -> bool {
        self.state == StrokeState::Drafting
    }

    pub fn body(&self) -> Option<RigidBodyHandle> {
        self.body
    }

    /// The raw drawn path (body-local once active)
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a point while drafting; points closer than the minimum spacing
    /// to the previous vertex are dropped to avoid degenerate shapes
    pub fn extend(&mut self, p: IVec2) {
        debug_assert!(self.is_drafting());
        if let Some(last) = self.path.last() {
            if (p - last).as_vec2().length() < MIN_POINT_SPACING {
                return;
            }
        }
        self.path.push(p);
    }

    /// Reference point for move-gesture drag offsets: the first vertex, at
    /// its current world position
    pub fn origin(&self, physics: &PhysicsWorld) -> Vec2 {
        match self.body {
            Some(handle) => physics.translation(handle),
            None => self
                .path
                .first()
                .map(|p| p.as_vec2())
                .unwrap_or(Vec2::ZERO),
        }
    }

    /// Current world-space vertices (identical to the raw path until the
    /// body has moved)
    pub fn world_points(&self, physics: &PhysicsWorld) -> Vec<Vec2> {
        match self.body {
            Some(handle) => {
                let origin = self.path.first().map(|p| p.as_vec2()).unwrap_or(Vec2::ZERO);
                self.path
                    .points()
                    .iter()
                    .map(|&p| physics.transform_point(handle, p.as_vec2() - origin))
                    .collect()
            }
            None => self.path.points().iter().map(|p| p.as_vec2()).collect(),
        }
    }

    /// Distance from `p` to the stroke's current world polyline
    pub fn distance_to(&self, p: Vec2, physics: &PhysicsWorld) -> Option<f32> {
        let points = self.world_points(physics);
        if points.is_empty() {
            return None;
        }
        if points.len() == 1 {
            return Some((p - points[0]).length());
        }
        points
            .windows(2)
            .map(|w| crate::sim::path::segment_distance(p, w[0], w[1]))
            .min_by(|a, b| a.total_cmp(b))
    }

    /// Simplify the drawn path and build the physics body. Fails with
    /// `InvalidGeometry` when fewer than 2 distinct points remain; the
    /// caller discards the draft in that case.
    pub fn activate(&mut self, physics: &mut PhysicsWorld) -> Result<(), Error> {
        debug_assert!(self.is_drafting());
        self.path.simplify(SIMPLIFY_THRESHOLD);
        if !self.path.has_extent() {
            return Err(Error::InvalidGeometry);
        }

        let kind = if self.attributes.contains(Attributes::DECOR) {
            BodyKind::Decor
        } else if self.attributes.contains(Attributes::GROUND) {
            BodyKind::Fixed
        } else if self.attributes.contains(Attributes::SLEEPING) {
            BodyKind::Asleep
        } else {
            BodyKind::Dynamic
        };

        let points: Vec<Vec2> = self.path.points().iter().map(|p| p.as_vec2()).collect();
        self.body = Some(physics.add_stroke_body(&points, kind));
        self.state = StrokeState::Active;
        Ok(())
    }

    /// Release the body and tombstone the stroke
    pub fn erase(&mut self, physics: &mut PhysicsWorld) {
        if let Some(handle) = self.body.take() {
            physics.remove_body(handle);
        }
        self.state = StrokeState::Deleted;
    }

    /// Split the path into 2-point link paths for rope conversion. The path
    /// is coarsely simplified first so link count stays bounded; each edge
    /// of the result becomes one rigid link. Returns `InvalidGeometry` when
    /// the stroke is too short to form even one link.
    pub fn rope_links(&self) -> Result<Vec<Path>, Error> {
        let mut path = self.path.clone();
        path.simplify(ROPE_TOLERANCE);
        if !path.has_extent() {
            return Err(Error::InvalidGeometry);
        }
        Ok(path
            .points()
            .windows(2)
            .map(|w| Path::from_points(vec![w[0], w[1]]))
            .collect())
    }

    /// Attributes for the links produced by rope conversion: the chain is
    /// ordinary dynamic geometry, never itself a rope
    pub fn link_attributes(&self) -> Attributes {
        self.attributes.without(Attributes::ROPE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(id: StrokeId, points: &[(i32, i32)]) -> Stroke {
        let path = Path::from_points(points.iter().map(|&(x, y)| IVec2::new(x, y)).collect());
        Stroke::new(id, path, 2, Attributes::default())
    }

    #[test]
    fn test_extend_drops_near_points() {
        let mut s = draft(1, &[(0, 0)]);
        s.extend(IVec2::new(1, 0)); // under MIN_POINT_SPACING
        assert_eq!(s.path().len(), 1);
        s.extend(IVec2::new(5, 0));
        assert_eq!(s.path().len(), 2);
    }

    #[test]
    fn test_activate_rejects_degenerate() {
        let mut physics = PhysicsWorld::new();
        let mut s = draft(1, &[(10, 10)]);
        assert!(matches!(
            s.activate(&mut physics),
            Err(Error::InvalidGeometry)
        ));
        assert_eq!(physics.body_count(), 0);
        assert!(s.is_drafting());
    }

    #[test]
    fn test_activate_builds_body() {
        let mut physics = PhysicsWorld::new();
        let mut s = draft(1, &[(0, 0), (40, 0), (80, 0)]);
        s.activate(&mut physics).unwrap();
        assert!(s.is_active());
        assert_eq!(physics.body_count(), 1);
        assert!(physics.is_dynamic(s.body().unwrap()));
    }

    #[test]
    fn test_ground_stroke_is_fixed() {
        let mut physics = PhysicsWorld::new();
        let path = Path::from_points(vec![IVec2::new(0, 100), IVec2::new(300, 100)]);
        let mut s = Stroke::new(1, path, 0, Attributes::GROUND);
        s.activate(&mut physics).unwrap();
        assert!(!physics.is_dynamic(s.body().unwrap()));
    }

    #[test]
    fn test_erase_frees_body() {
        let mut physics = PhysicsWorld::new();
        let mut s = draft(1, &[(0, 0), (40, 0)]);
        s.activate(&mut physics).unwrap();
        s.erase(&mut physics);
        assert_eq!(physics.body_count(), 0);
        assert_eq!(s.state(), StrokeState::Deleted);
        assert!(s.body().is_none());
    }

    #[test]
    fn test_rope_links_cover_path() {
        let s = draft(1, &[(0, 0), (50, 60), (100, 0), (150, 60)]);
        let links = s.rope_links().unwrap();
        // Zigzag corners survive the coarse rope simplification
        assert_eq!(links.len(), 3);
        // Consecutive links share endpoints
        for w in links.windows(2) {
            assert_eq!(w[0].last(), w[1].first());
        }
        let total: f32 = links.iter().map(|l| l.length()).sum();
        assert!((total - s.path().length()).abs() < ROPE_TOLERANCE);
    }

    #[test]
    fn test_attribute_mask_ops() {
        let a = Attributes::GROUND.with(Attributes::ROPE);
        assert!(a.contains(Attributes::GROUND));
        assert!(a.contains(Attributes::ROPE));
        assert!(!a.contains(Attributes::DECOR));
        assert!(!a.without(Attributes::ROPE).contains(Attributes::ROPE));
    }
}
