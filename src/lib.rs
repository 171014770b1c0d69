//! Scrawl - a drawing-based physics puzzle game core
//!
//! Core modules:
//! - `sim`: Deterministic simulation (paths, strokes, physics world, scene)
//! - `level`: Level and demo file model (JSON)
//! - `input`: Gesture events and the session-driven dispatcher
//! - `canvas`: Drawing seam for the presentation layer
//! - `error`: Recoverable error taxonomy

pub mod canvas;
pub mod error;
pub mod input;
pub mod level;
pub mod sim;

pub use error::Error;
pub use level::{Level, WinCondition};
pub use sim::path::{Path, Rect};
pub use sim::scene::Scene;
pub use sim::stroke::{Attributes, StrokeId};

/// Game tuning constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Downward gravity in pixels/s² (screen coordinates, y grows down)
    pub const GRAVITY: f32 = 240.0;

    /// Half-width of a drawn stroke, used as capsule radius for collision
    pub const STROKE_RADIUS: f32 = 2.0;
    /// Points closer than this to the previous vertex are dropped while drawing
    pub const MIN_POINT_SPACING: f32 = 2.0;
    /// Path simplification tolerance applied at activation
    pub const SIMPLIFY_THRESHOLD: f32 = 1.0;
    /// Coarser simplification for rope conversion, bounds the joint count
    pub const ROPE_TOLERANCE: f32 = 16.0;

    /// Snap radius for forming pivot joints between touching strokes
    pub const JOINT_TOLERANCE: f32 = 4.0;
    /// Hit-test radius for move/erase/select and interact taps
    pub const SELECT_TOLERANCE: f32 = 5.0;

    /// Fixed particle pool size per force field or jetstream
    pub const FIELD_PARTICLES: usize = 64;
    /// Force magnitude of an interactively drawn jetstream
    pub const JETSTREAM_STRENGTH: f32 = 40.0;

    /// Seed for levels that do not specify one
    pub const DEFAULT_SEED: u64 = 0x5c4a_11ed;
}
