//! Deterministic simulation module
//!
//! All gameplay state lives here. This module must stay deterministic:
//! - Fixed timestep only
//! - Seeded RNG only (and only for cosmetic particles)
//! - Stroke ids assigned sequentially, stable across replays
//! - No rendering or platform dependencies beyond the `Canvas` seam

pub mod force_field;
pub mod path;
pub mod physics;
pub mod replay;
pub mod scene;
pub mod stroke;

pub use force_field::{ForceField, JetStream, JetStreamId};
pub use path::{Path, Rect};
pub use physics::{BodyKind, PhysicsWorld};
pub use replay::{ReplayLog, SceneEvent, SceneOp};
pub use scene::{JointCandidate, Scene};
pub use stroke::{Attributes, Stroke, StrokeId, StrokeState};
