//! rapier2d world wrapper
//!
//! One fixed-timestep world per scene. Strokes own body handles; everything
//! else (colliders, joints, islands) is managed here so that removing a body
//! atomically removes whatever hangs off it.

use glam::Vec2;
use rapier2d::prelude::*;

use crate::consts::{GRAVITY, SIM_DT, STROKE_RADIUS};

/// How a stroke's body participates in the simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    /// Immovable scenery (GROUND attribute)
    Fixed,
    /// Normal dynamic body
    Dynamic,
    /// Dynamic body created asleep (SLEEPING attribute)
    Asleep,
    /// Fixed body whose colliders are sensors: visible, never collides (DECOR)
    Decor,
}

/// Physics world state for one scene
pub struct PhysicsWorld {
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    islands: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    ccd: CCDSolver,
    pipeline: PhysicsPipeline,
    parameters: IntegrationParameters,
    gravity: Vector<Real>,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicsWorld {
    pub fn new() -> Self {
        let mut parameters = IntegrationParameters::default();
        parameters.dt = SIM_DT;
        Self {
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            islands: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            ccd: CCDSolver::new(),
            pipeline: PhysicsPipeline::new(),
            parameters,
            gravity: vector![0.0, GRAVITY],
        }
    }

    /// Advance the world by one fixed timestep
    pub fn step(&mut self) {
        self.pipeline.step(
            &self.gravity,
            &self.parameters,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd,
            None,
            &(),
            &(),
        );
    }

    /// Build a body for a stroke. `points` are world-space vertices; the body
    /// origin is placed at the first vertex and one capsule collider is added
    /// per edge.
    pub fn add_stroke_body(&mut self, points: &[Vec2], kind: BodyKind) -> RigidBodyHandle {
        let origin = points[0];
        let builder = match kind {
            BodyKind::Fixed | BodyKind::Decor => RigidBodyBuilder::fixed(),
            // thin capsules tunnel without CCD
            BodyKind::Dynamic => RigidBodyBuilder::dynamic().ccd_enabled(true),
            BodyKind::Asleep => RigidBodyBuilder::dynamic().ccd_enabled(true).sleeping(true),
        };
        let body = builder.translation(vector![origin.x, origin.y]).build();
        let handle = self.bodies.insert(body);

        for w in points.windows(2) {
            let a = w[0] - origin;
            let b = w[1] - origin;
            let mid = (a + b) * 0.5;
            let half_len = (b - a).length() * 0.5;
            if half_len < 1e-3 {
                continue;
            }
            let angle = (b.y - a.y).atan2(b.x - a.x);
            let collider = ColliderBuilder::capsule_x(half_len, STROKE_RADIUS)
                .position(Isometry::new(vector![mid.x, mid.y], angle))
                .sensor(kind == BodyKind::Decor)
                .friction(0.5)
                .restitution(0.2)
                .build();
            self.colliders
                .insert_with_parent(collider, handle, &mut self.bodies);
        }
        handle
    }

    /// Remove a body together with its colliders and any attached joints
    pub fn remove_body(&mut self, handle: RigidBodyHandle) {
        self.bodies.remove(
            handle,
            &mut self.islands,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            true,
        );
    }

    /// Pin two bodies together at a world-space point with a revolute joint
    pub fn add_pivot_joint(&mut self, a: RigidBodyHandle, b: RigidBodyHandle, at: Vec2) {
        let world = point![at.x, at.y];
        let anchor_a = self.bodies[a].position().inverse_transform_point(&world);
        let anchor_b = self.bodies[b].position().inverse_transform_point(&world);
        // jointed bodies overlap at the pivot; they must not also collide
        let joint = RevoluteJointBuilder::new()
            .local_anchor1(anchor_a)
            .local_anchor2(anchor_b)
            .contacts_enabled(false);
        self.impulse_joints.insert(a, b, joint, true);
    }

    pub fn joint_count(&self) -> usize {
        self.impulse_joints.len()
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn translation(&self, handle: RigidBodyHandle) -> Vec2 {
        let t = self.bodies[handle].translation();
        Vec2::new(t.x, t.y)
    }

    pub fn set_translation(&mut self, handle: RigidBodyHandle, to: Vec2) {
        self.bodies[handle].set_translation(vector![to.x, to.y], true);
    }

    /// Body-local to world transform of a point
    pub fn transform_point(&self, handle: RigidBodyHandle, local: Vec2) -> Vec2 {
        let p = self.bodies[handle].position() * point![local.x, local.y];
        Vec2::new(p.x, p.y)
    }

    pub fn is_sleeping(&self, handle: RigidBodyHandle) -> bool {
        self.bodies[handle].is_sleeping()
    }

    pub fn is_dynamic(&self, handle: RigidBodyHandle) -> bool {
        self.bodies[handle].is_dynamic()
    }

    pub fn wake(&mut self, handle: RigidBodyHandle) {
        self.bodies[handle].wake_up(true);
    }

    pub fn sleep(&mut self, handle: RigidBodyHandle) {
        self.bodies[handle].sleep();
    }

    pub fn linvel(&self, handle: RigidBodyHandle) -> Vec2 {
        let v = self.bodies[handle].linvel();
        Vec2::new(v.x, v.y)
    }

    /// Accumulate a continuous acceleration on a dynamic body for the next
    /// step (scaled by mass into a force; cleared by [`Self::clear_forces`])
    pub fn apply_acceleration(&mut self, handle: RigidBodyHandle, accel: Vec2) {
        let body = &mut self.bodies[handle];
        if body.is_dynamic() {
            let force = accel * body.mass();
            body.add_force(vector![force.x, force.y], true);
        }
    }

    /// Drop all accumulated forces after a step
    pub fn clear_forces(&mut self) {
        for (_, body) in self.bodies.iter_mut() {
            body.reset_forces(false);
        }
    }

    /// World AABB of a body, from the union of its collider bounds
    pub fn body_aabb(&self, handle: RigidBodyHandle) -> Option<(Vec2, Vec2)> {
        let mut bounds: Option<(Vec2, Vec2)> = None;
        for &ch in self.bodies[handle].colliders() {
            let aabb = self.colliders[ch].compute_aabb();
            let lo = Vec2::new(aabb.mins.x, aabb.mins.y);
            let hi = Vec2::new(aabb.maxs.x, aabb.maxs.y);
            bounds = Some(match bounds {
                Some((min, max)) => (min.min(lo), max.max(hi)),
                None => (lo, hi),
            });
        }
        bounds
    }

    /// Whether any collider of `a` is actively contacting any collider of `b`
    pub fn in_contact(&self, a: RigidBodyHandle, b: RigidBodyHandle) -> bool {
        for &ca in self.bodies[a].colliders() {
            for &cb in self.bodies[b].colliders() {
                if let Some(pair) = self.narrow_phase.contact_pair(ca, cb) {
                    if pair.has_any_active_contact {
                        return true;
                    }
                }
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_body_never_moves() {
        let mut world = PhysicsWorld::new();
        let h = world.add_stroke_body(
            &[Vec2::new(0.0, 100.0), Vec2::new(200.0, 100.0)],
            BodyKind::Fixed,
        );
        let before = world.translation(h);
        for _ in 0..120 {
            world.step();
        }
        assert_eq!(world.translation(h), before);
    }

    #[test]
    fn test_dynamic_body_falls() {
        let mut world = PhysicsWorld::new();
        let h = world.add_stroke_body(
            &[Vec2::new(0.0, 0.0), Vec2::new(50.0, 0.0)],
            BodyKind::Dynamic,
        );
        for _ in 0..60 {
            world.step();
        }
        // y grows downward under gravity
        assert!(world.translation(h).y > 10.0);
    }

    #[test]
    fn test_asleep_body_stays_put_until_woken() {
        let mut world = PhysicsWorld::new();
        let h = world.add_stroke_body(
            &[Vec2::new(0.0, 0.0), Vec2::new(50.0, 0.0)],
            BodyKind::Asleep,
        );
        for _ in 0..30 {
            world.step();
        }
        assert!(world.is_sleeping(h));
        assert!(world.translation(h).y.abs() < 1e-3);

        world.wake(h);
        for _ in 0..30 {
            world.step();
        }
        assert!(world.translation(h).y > 1.0);
    }

    #[test]
    fn test_remove_body_drops_joints() {
        let mut world = PhysicsWorld::new();
        let a = world.add_stroke_body(
            &[Vec2::new(0.0, 0.0), Vec2::new(50.0, 0.0)],
            BodyKind::Fixed,
        );
        let b = world.add_stroke_body(
            &[Vec2::new(50.0, 0.0), Vec2::new(100.0, 0.0)],
            BodyKind::Dynamic,
        );
        world.add_pivot_joint(a, b, Vec2::new(50.0, 0.0));
        assert_eq!(world.joint_count(), 1);

        world.remove_body(b);
        assert_eq!(world.body_count(), 1);
        assert_eq!(world.joint_count(), 0);
    }

    #[test]
    fn test_pivot_joint_anchors_swing() {
        let mut world = PhysicsWorld::new();
        let anchor = world.add_stroke_body(
            &[Vec2::new(100.0, 100.0), Vec2::new(100.0, 101.0)],
            BodyKind::Fixed,
        );
        let arm = world.add_stroke_body(
            &[Vec2::new(100.0, 100.0), Vec2::new(180.0, 100.0)],
            BodyKind::Dynamic,
        );
        world.add_pivot_joint(anchor, arm, Vec2::new(100.0, 100.0));

        for _ in 0..240 {
            world.step();
        }
        // The pinned end stays near the anchor while the arm swings down
        let pinned = world.transform_point(arm, Vec2::ZERO);
        assert!((pinned - Vec2::new(100.0, 100.0)).length() < 5.0);
        let tip = world.transform_point(arm, Vec2::new(80.0, 0.0));
        assert!(tip.y > 120.0);
    }
}
